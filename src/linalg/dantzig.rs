//! Dantzig-style active-set solvers for boxed LCPs.
//!
//! Both solvers find `x` such that `A * x = b + r` with:
//! - `x[i] = low[i]` if `r[i] >= 0`,
//! - `x[i] = high[i]` if `r[i] <= 0`,
//! - `low[i] <= x[i] <= high[i]` if `r[i] == 0`.
//!
//! `A` must be symmetric positive definite. A strict LCP is obtained with `low = 0` and
//! `high = +inf`.

use super::cholesky::{
    cholesky_factorization, cholesky_factorization_add_row, cholesky_update, solve_cholesky,
};
use super::dense::{dot, swap_columns, swap_rows};
use super::{LinalgError, LCP_MAX_VALUE};
use na::RealField;
use num::{One, Zero};

/// Scratch buffers reused by the Dantzig LCP solvers.
///
/// Keeping one workspace alive across solves avoids reallocating the intermediate matrices and
/// vectors at every call. Buffers only ever grow.
#[derive(Clone, Debug)]
pub struct LcpWorkspace<N> {
    dantzig: DantzigBuffers<N>,
    partition: PartitionBuffers<N>,
}

#[derive(Clone, Debug)]
struct DantzigBuffers<N> {
    matrix: Vec<N>,
    cholesky: Vec<N>,
    low: Vec<N>,
    high: Vec<N>,
    x0: Vec<N>,
    r0: Vec<N>,
    delta_x: Vec<N>,
    delta_r: Vec<N>,
    tmp: Vec<N>,
    reflexion: Vec<N>,
    permute: Vec<usize>,
    active_columns: Vec<usize>,
}

#[derive(Clone, Debug)]
struct PartitionBuffers<N> {
    matrix: Vec<N>,
    low: Vec<N>,
    high: Vec<N>,
    permute: Vec<usize>,
    a10: Vec<N>,
    a11: Vec<N>,
    u: Vec<N>,
    c: Vec<N>,
    l: Vec<N>,
    h: Vec<N>,
}

/// The factored active set of a Dantzig solve.
///
/// The rows of `matrix` and `cholesky` are kept in the order of the current partition
/// `[free | unprocessed | clamped]`; `permute` maps positions back to the caller's indices.
struct ActiveSet<'a, N> {
    size: usize,
    matrix: &'a mut [N],
    cholesky: &'a mut [N],
    x: &'a mut [N],
    r: &'a mut [N],
    low: &'a mut [N],
    high: &'a mut [N],
    permute: &'a mut [usize],
    tmp: &'a mut [N],
    reflexion: &'a mut [N],
    active_columns: &'a mut [usize],
}

fn grow<T: Clone>(buf: &mut Vec<T>, len: usize, value: T) {
    if buf.len() < len {
        buf.resize(len, value);
    }
}

impl<N: RealField + Copy> Default for LcpWorkspace<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: RealField + Copy> LcpWorkspace<N> {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self {
            dantzig: DantzigBuffers {
                matrix: Vec::new(),
                cholesky: Vec::new(),
                low: Vec::new(),
                high: Vec::new(),
                x0: Vec::new(),
                r0: Vec::new(),
                delta_x: Vec::new(),
                delta_r: Vec::new(),
                tmp: Vec::new(),
                reflexion: Vec::new(),
                permute: Vec::new(),
                active_columns: Vec::new(),
            },
            partition: PartitionBuffers {
                matrix: Vec::new(),
                low: Vec::new(),
                high: Vec::new(),
                permute: Vec::new(),
                a10: Vec::new(),
                a11: Vec::new(),
                u: Vec::new(),
                c: Vec::new(),
                l: Vec::new(),
                h: Vec::new(),
            },
        }
    }

    /// Solves the boxed LCP `A * x = b + r` with the Dantzig active-set method.
    ///
    /// On exit, `x` holds the solution (always within `[low, high]`) and `b` holds the
    /// complementary residual `r = A * x - b`. When every variable ends up strictly inside its
    /// bounds, `b` is zeroed.
    pub fn solve_dantzig_lcp(
        &mut self,
        size: usize,
        a: &[N],
        x: &mut [N],
        b: &mut [N],
        low: &[N],
        high: &[N],
    ) -> Result<(), LinalgError> {
        self.dantzig.solve(size, a, x, b, low, high)
    }

    /// Solves the boxed LCP `A * x = b + r`, eliminating the unbounded variables first.
    ///
    /// Variables with `low <= -LCP_MAX_VALUE` and `high >= LCP_MAX_VALUE` are solved with a
    /// Cholesky factorization of their block. The remaining bounded variables are solved with
    /// [`Self::solve_dantzig_lcp`] on the Schur complement, and the unbounded solution is then
    /// corrected by back-substitution. On exit `x` holds the solution and `b` is zeroed.
    ///
    /// On failure `x` is zeroed and the content of `b` is unspecified.
    pub fn solve_partition_dantzig_lcp(
        &mut self,
        size: usize,
        a: &[N],
        x: &mut [N],
        b: &mut [N],
        low: &[N],
        high: &[N],
    ) -> Result<(), LinalgError> {
        if size == 0 {
            return Ok(());
        }

        // `x` and `b` are permuted while solving.
        self.solve_partitioned(size, a, x, b, low, high).map_err(|err| {
            x[..size].fill(N::zero());
            err
        })
    }

    fn solve_partitioned(
        &mut self,
        size: usize,
        a: &[N],
        x: &mut [N],
        b: &mut [N],
        low: &[N],
        high: &[N],
    ) -> Result<(), LinalgError> {
        let PartitionBuffers {
            matrix,
            low: lo,
            high: hi,
            permute,
            a10,
            a11,
            u,
            c,
            l,
            h,
        } = &mut self.partition;

        grow(matrix, size * size, N::zero());
        grow(lo, size, N::zero());
        grow(hi, size, N::zero());
        grow(permute, size, 0);

        matrix[..size * size].copy_from_slice(&a[..size * size]);
        lo[..size].copy_from_slice(&low[..size]);
        hi[..size].copy_from_slice(&high[..size]);
        for i in 0..size {
            x[i] = b[i];
            permute[i] = i;
        }

        let max_value: N = na::convert(LCP_MAX_VALUE);
        let mut unbounded_size = size;
        let mut i = 0;
        while i < unbounded_size {
            if lo[i] <= -max_value && hi[i] >= max_value {
                cholesky_factorization_add_row(size, i, matrix)?;
                i += 1;
            } else {
                let j = unbounded_size - 1;
                if i != j {
                    swap_rows(size, matrix, i, j);
                    swap_columns(size, matrix, i, j);
                    x.swap(i, j);
                    b.swap(i, j);
                    lo.swap(i, j);
                    hi.swap(i, j);
                    permute.swap(i, j);
                }
                unbounded_size -= 1;
            }
        }

        if unbounded_size > 0 {
            solve_cholesky(size, unbounded_size, matrix, x);
            for i in unbounded_size..size {
                b[i] = dot(unbounded_size, &matrix[i * size..], x) - b[i];
            }

            let bounded_size = size - unbounded_size;
            if bounded_size > 0 {
                grow(a10, bounded_size * unbounded_size, N::zero());
                grow(a11, bounded_size * bounded_size, N::zero());
                grow(u, bounded_size, N::zero());
                grow(c, bounded_size, N::zero());
                grow(l, bounded_size, N::zero());
                grow(h, bounded_size, N::zero());

                for i in 0..bounded_size {
                    let g = &mut a10[i * unbounded_size..(i + 1) * unbounded_size];
                    let row = &matrix[(unbounded_size + i) * size..];
                    for j in 0..unbounded_size {
                        g[j] = -row[j];
                    }
                    solve_cholesky(size, unbounded_size, matrix, g);

                    a11[i * bounded_size + i] =
                        row[unbounded_size + i] + dot(unbounded_size, g, row);
                    for j in i + 1..bounded_size {
                        let row1 = &matrix[(unbounded_size + j) * size..];
                        let elem = row1[unbounded_size + i] + dot(unbounded_size, g, row1);
                        a11[i * bounded_size + j] = elem;
                        a11[j * bounded_size + i] = elem;
                    }

                    u[i] = N::zero();
                    c[i] = -b[unbounded_size + i];
                    l[i] = lo[unbounded_size + i];
                    h[i] = hi[unbounded_size + i];
                }

                self.dantzig.solve(
                    bounded_size,
                    &a11[..bounded_size * bounded_size],
                    &mut u[..bounded_size],
                    &mut c[..bounded_size],
                    &l[..bounded_size],
                    &h[..bounded_size],
                )?;

                for i in 0..bounded_size {
                    let s = u[i];
                    x[unbounded_size + i] = s;
                    let g = &a10[i * unbounded_size..(i + 1) * unbounded_size];
                    for j in 0..unbounded_size {
                        x[j] += g[j] * s;
                    }
                }
            }
        } else {
            x[..size].fill(N::zero());
            self.dantzig
                .solve(size, &matrix[..size * size], x, b, &lo[..size], &hi[..size])?;
        }

        b[..size].copy_from_slice(&x[..size]);
        for i in 0..size {
            x[permute[i]] = b[i];
            b[i] = N::zero();
        }

        Ok(())
    }
}

/// Solves the boxed LCP `A * x = b + r` with a temporary workspace.
///
/// See [`LcpWorkspace::solve_dantzig_lcp`].
pub fn solve_dantzig_lcp<N: RealField + Copy>(
    size: usize,
    a: &[N],
    x: &mut [N],
    b: &mut [N],
    low: &[N],
    high: &[N],
) -> Result<(), LinalgError> {
    LcpWorkspace::new().solve_dantzig_lcp(size, a, x, b, low, high)
}

/// Solves the boxed LCP `A * x = b + r` with a temporary workspace, eliminating the unbounded
/// variables first.
///
/// See [`LcpWorkspace::solve_partition_dantzig_lcp`].
pub fn solve_partition_dantzig_lcp<N: RealField + Copy>(
    size: usize,
    a: &[N],
    x: &mut [N],
    b: &mut [N],
    low: &[N],
    high: &[N],
) -> Result<(), LinalgError> {
    LcpWorkspace::new().solve_partition_dantzig_lcp(size, a, x, b, low, high)
}

impl<N: RealField + Copy> DantzigBuffers<N> {
    fn solve(
        &mut self,
        size: usize,
        a: &[N],
        x: &mut [N],
        b: &mut [N],
        low: &[N],
        high: &[N],
    ) -> Result<(), LinalgError> {
        if size == 0 {
            return Ok(());
        }

        grow(&mut self.matrix, size * size, N::zero());
        grow(&mut self.cholesky, size * size, N::zero());
        for buf in [
            &mut self.low,
            &mut self.high,
            &mut self.x0,
            &mut self.r0,
            &mut self.delta_x,
            &mut self.delta_r,
            &mut self.tmp,
            &mut self.reflexion,
        ] {
            grow(buf, size, N::zero());
        }
        grow(&mut self.permute, size, 0);
        grow(&mut self.active_columns, size, 0);

        self.matrix[..size * size].copy_from_slice(&a[..size * size]);
        self.cholesky[..size * size].copy_from_slice(&a[..size * size]);
        cholesky_factorization(size, &mut self.cholesky[..size * size])?;
        for i in 0..size {
            for j in i + 1..size {
                self.cholesky[i * size + j] = N::zero();
            }
        }
        self.low[..size].copy_from_slice(&low[..size]);
        self.high[..size].copy_from_slice(&high[..size]);

        let mut set = ActiveSet {
            size,
            matrix: &mut self.matrix[..size * size],
            cholesky: &mut self.cholesky[..size * size],
            x: &mut self.x0[..size],
            r: &mut self.r0[..size],
            low: &mut self.low[..size],
            high: &mut self.high[..size],
            permute: &mut self.permute[..size],
            tmp: &mut self.tmp[..size],
            reflexion: &mut self.reflexion[..size],
            active_columns: &mut self.active_columns[..size],
        };

        let all_free = set.solve(b, &mut self.delta_x[..size], &mut self.delta_r[..size]);

        if all_free {
            x[..size].copy_from_slice(&set.x[..size]);
            b[..size].fill(N::zero());
        } else {
            for i in 0..size {
                let j = set.permute[i];
                x[j] = set.x[i].clamp(set.low[i], set.high[i]);
                b[j] = set.r[i];
            }
        }

        Ok(())
    }
}

impl<'a, N: RealField + Copy> ActiveSet<'a, N> {
    /// Exchanges the variables at positions `i` and `j`.
    ///
    /// Rows and columns of the matrix are swapped, but only the rows of the Cholesky factor:
    /// [`Self::update`] must be called afterward to make the factor triangular again.
    fn swap(&mut self, i: usize, j: usize) {
        if i != j {
            swap_rows(self.size, self.matrix, i, j);
            swap_rows(self.size, self.cholesky, i, j);
            swap_columns(self.size, self.matrix, i, j);
            self.x.swap(i, j);
            self.r.swap(i, j);
            self.low.swap(i, j);
            self.high.swap(i, j);
            self.permute.swap(i, j);
        }
    }

    fn update(&mut self, row: usize, column: usize) {
        cholesky_update(
            self.size,
            row,
            column,
            self.cholesky,
            self.tmp,
            self.reflexion,
            self.active_columns,
        );
    }

    /// Direction in which the free variables move when variable `n` increases by one.
    fn calculate_delta_x(&self, n: usize, delta_x: &mut [N]) {
        let row = &self.matrix[self.size * n..];
        for i in 0..n {
            delta_x[i] = -row[i];
        }
        solve_cholesky(self.size, n, &self.cholesky[..], delta_x);
        delta_x[n] = N::one();
    }

    /// `delta_r = A * delta_x` for the rows at and past `n`.
    fn calculate_delta_r(&self, n: usize, delta_x: &[N], delta_r: &mut [N]) {
        for i in n..self.size {
            delta_r[i] = dot(n + 1, &self.matrix[i * self.size..], delta_x);
        }
    }

    /// Runs the active-set iterations.
    ///
    /// Returns `true` if the unconstrained solution was feasible, in which case no permutation
    /// took place and `r` is not meaningful.
    fn solve(&mut self, b: &[N], delta_x: &mut [N], delta_r: &mut [N]) -> bool {
        let size = self.size;
        let eps: N = na::convert(1.0e-12);

        for i in 0..size {
            self.permute[i] = i;
            self.r[i] = b[i];
            self.x[i] = N::zero();
            delta_x[i] = b[i];
            delta_r[i] = b[i];
        }

        // Initial guess: solve the free system, evicting the variable that leaves its box first
        // and repeating on the remaining ones.
        let mut initial_guess_count = size;
        let mut error2 = N::one();
        while initial_guess_count > 0 && error2 > eps {
            solve_cholesky(size, initial_guess_count, &self.cholesky[..], delta_x);

            let mut alpha = N::one();
            let mut evicted = None;
            for i in 0..initial_guess_count {
                let x1 = self.x[i] + alpha * delta_x[i];
                if x1 < self.low[i] {
                    evicted = Some(i);
                    alpha = (self.low[i] - self.x[i]) / delta_x[i];
                } else if x1 > self.high[i] {
                    evicted = Some(i);
                    alpha = (self.high[i] - self.x[i]) / delta_x[i];
                }
            }

            error2 = N::zero();
            for i in 0..initial_guess_count {
                self.x[i] += alpha * delta_x[i];
                self.r[i] -= alpha * delta_r[i];
                delta_x[i] = self.r[i];
                delta_r[i] = self.r[i];
                error2 += self.r[i] * self.r[i];
            }

            if let Some(index) = evicted {
                initial_guess_count -= 1;
                delta_x[index] = N::zero();
                delta_x.swap(index, initial_guess_count);
                delta_r.swap(index, initial_guess_count);
                self.swap(index, initial_guess_count);
                self.update(index, initial_guess_count);
            }
        }

        if initial_guess_count == size {
            return true;
        }

        for i in 0..size {
            self.r[i] = N::zero();
            delta_x[i] = N::zero();
            delta_r[i] = N::zero();
        }

        let mut clamped_index = size;
        let mut index = initial_guess_count;
        let mut count = size - initial_guess_count;

        for i in index..size {
            let j = self.permute[i];
            self.r[i] = dot(size, &self.matrix[i * size..], &self.x[..]) - b[j];
        }

        while count > 0 {
            let mut repeat = true;

            while repeat {
                repeat = false;
                let mut clamp_x = N::zero();
                let mut swap_index = None;

                if self.r[index].abs() > eps {
                    self.calculate_delta_x(index, delta_x);
                    self.calculate_delta_r(index, delta_x, delta_r);

                    if delta_r[index] == N::zero() {
                        delta_r[index] = eps;
                    }

                    let mut s = -self.r[index] / delta_r[index];

                    for i in 0..=index {
                        let x1 = self.x[i] + s * delta_x[i];
                        if x1 > self.high[i] {
                            swap_index = Some(i);
                            clamp_x = self.high[i];
                            s = (self.high[i] - self.x[i]) / delta_x[i];
                        } else if x1 < self.low[i] {
                            swap_index = Some(i);
                            clamp_x = self.low[i];
                            s = (self.low[i] - self.x[i]) / delta_x[i];
                        }
                    }

                    let mut i = clamped_index;
                    while i < size && s > eps {
                        let r1 = self.r[i] + s * delta_r[i];
                        if r1 * self.r[i] < N::zero() {
                            let s1 = -self.r[i] / delta_r[i];
                            if s1.abs() < s.abs() {
                                s = s1;
                                swap_index = Some(i);
                            }
                        }
                        i += 1;
                    }

                    for i in 0..size {
                        self.x[i] += s * delta_x[i];
                        self.r[i] += s * delta_r[i];
                    }
                }

                match swap_index {
                    None => {
                        // The current variable reached zero residual inside its box.
                        self.r[index] = N::zero();
                        delta_r[index] = N::zero();
                        index += 1;
                        count -= 1;
                    }
                    Some(swap) if swap == index => {
                        // The current variable hit a bound: move it to the clamped set.
                        count -= 1;
                        clamped_index -= 1;
                        self.x[index] = clamp_x;
                        self.swap(index, clamped_index);
                        self.update(index, clamped_index);
                        repeat = count > 0;
                    }
                    Some(swap) if swap > index => {
                        // A clamped variable's residual changed sign: release it.
                        repeat = true;
                        self.r[swap] = N::zero();
                        if swap < clamped_index {
                            count -= 1;
                            clamped_index -= 1;
                            self.swap(clamped_index, swap);
                            self.update(swap, clamped_index);
                        } else {
                            count += 1;
                            self.swap(clamped_index, swap);
                            self.update(clamped_index, swap);
                            clamped_index += 1;
                        }
                    }
                    Some(swap) => {
                        // A free variable hit a bound: clamp it and back up one position.
                        self.x[swap] = clamp_x;
                        delta_x[index] = N::zero();
                        self.swap(swap, index - 1);
                        self.swap(index - 1, index);
                        self.swap(clamped_index - 1, index);
                        self.update(swap, clamped_index - 1);
                        clamped_index -= 1;
                        index -= 1;
                        repeat = true;
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linalg::cholesky::test::random_spd;
    use crate::linalg::{gauss_seidel_lcp, solve_cholesky};
    use approx::assert_relative_eq;

    fn random_bounds(rng: &mut oorandom::Rand64, size: usize) -> (Vec<f64>, Vec<f64>) {
        let mut low = Vec::with_capacity(size);
        let mut high = Vec::with_capacity(size);
        for _ in 0..size {
            match rng.rand_range(0..4) {
                0 => {
                    low.push(-1.0e15);
                    high.push(1.0e15);
                }
                1 => {
                    low.push(0.0);
                    high.push(1.0e15);
                }
                _ => {
                    low.push(-rng.rand_float() * 2.0);
                    high.push(rng.rand_float() * 2.0);
                }
            }
        }
        (low, high)
    }

    fn assert_lcp_solution(size: usize, a: &[f64], b: &[f64], x: &[f64], low: &[f64], high: &[f64]) {
        let tol = 1.0e-6;
        for i in 0..size {
            assert!(x[i] >= low[i] && x[i] <= high[i], "x[{}] out of its box", i);

            let r: f64 = (0..size).map(|j| a[i * size + j] * x[j]).sum::<f64>() - b[i];
            if x[i] - low[i] <= tol {
                assert!(r >= -tol, "residual {} at the lower bound of {}", r, i);
            } else if high[i] - x[i] <= tol {
                assert!(r <= tol, "residual {} at the upper bound of {}", r, i);
            } else {
                assert!(r.abs() <= tol, "residual {} of free variable {}", r, i);
            }
        }
    }

    #[test]
    fn unbounded_system_matches_cholesky_solve() {
        let mut rng = oorandom::Rand64::new(1);
        let size = 8;
        let a = random_spd(&mut rng, size);
        let b0: Vec<f64> = (0..size).map(|_| rng.rand_float() * 10.0 - 5.0).collect();

        let mut x = vec![0.0; size];
        let mut b = b0.clone();
        solve_dantzig_lcp(size, &a, &mut x, &mut b, &[-1.0e15; 8], &[1.0e15; 8]).unwrap();

        let mut l = a.clone();
        cholesky_factorization(size, &mut l).unwrap();
        let mut expected = b0.clone();
        solve_cholesky(size, size, &l, &mut expected);

        for i in 0..size {
            assert_relative_eq!(x[i], expected[i], epsilon = 1.0e-9);
            assert_eq!(b[i], 0.0);
        }
    }

    #[test]
    fn random_boxed_problems_are_complementary() {
        let mut rng = oorandom::Rand64::new(1234);
        let mut workspace = LcpWorkspace::new();

        for size in 1..=24 {
            for _ in 0..4 {
                let a = random_spd(&mut rng, size);
                let b0: Vec<f64> = (0..size).map(|_| rng.rand_float() * 40.0 - 20.0).collect();
                let (low, high) = random_bounds(&mut rng, size);

                let mut x = vec![0.0; size];
                let mut b = b0.clone();
                workspace
                    .solve_dantzig_lcp(size, &a, &mut x, &mut b, &low, &high)
                    .unwrap();
                assert_lcp_solution(size, &a, &b0, &x, &low, &high);

                let mut gs = vec![0.0; size];
                gauss_seidel_lcp(size, &a, &mut gs, &b0, &low, &high);
                for i in 0..size {
                    assert_relative_eq!(x[i], gs[i], epsilon = 1.0e-4);
                }
            }
        }
    }

    #[test]
    fn strict_lcp() {
        // x >= 0, r >= 0, x.r = 0.
        let a = [2.0, 1.0, 1.0, 2.0];
        let b0 = [1.0, -4.0];
        let mut x = [0.0; 2];
        let mut b = b0;
        solve_dantzig_lcp(2, &a, &mut x, &mut b, &[0.0; 2], &[1.0e15; 2]).unwrap();

        assert_relative_eq!(x[0], 0.5, epsilon = 1.0e-12);
        assert_eq!(x[1], 0.0);
        // Residual of the clamped variable: 1 * 0.5 + 2 * 0 + 4.
        assert_relative_eq!(b[1], 4.5, epsilon = 1.0e-12);
    }

    #[test]
    fn partition_matches_plain_solver() {
        let mut rng = oorandom::Rand64::new(99);
        let mut workspace = LcpWorkspace::new();

        for size in 1..=20 {
            let a = random_spd(&mut rng, size);
            let b0: Vec<f64> = (0..size).map(|_| rng.rand_float() * 40.0 - 20.0).collect();
            let (low, high) = random_bounds(&mut rng, size);

            let mut x_plain = vec![0.0; size];
            let mut b_plain = b0.clone();
            workspace
                .solve_dantzig_lcp(size, &a, &mut x_plain, &mut b_plain, &low, &high)
                .unwrap();

            let mut x_part = vec![0.0; size];
            let mut b_part = b0.clone();
            workspace
                .solve_partition_dantzig_lcp(size, &a, &mut x_part, &mut b_part, &low, &high)
                .unwrap();

            assert_lcp_solution(size, &a, &b0, &x_part, &low, &high);
            for i in 0..size {
                assert_relative_eq!(x_plain[i], x_part[i], epsilon = 1.0e-7);
                assert_eq!(b_part[i], 0.0);
            }
        }
    }

    #[test]
    fn degenerate_matrix_is_reported() {
        let a = [1.0, 1.0, 1.0, 1.0];
        let mut x = [0.0; 2];
        let mut b = [1.0, 1.0];
        assert!(solve_dantzig_lcp(2, &a, &mut x, &mut b, &[0.0; 2], &[1.0; 2]).is_err());
    }

    #[test]
    fn failed_partition_zeroes_the_solution() {
        // The bounded first variable is moved behind the singular unbounded block.
        let a = [
            2.0, 0.0, 0.0, //
            0.0, 1.0, 1.0, //
            0.0, 1.0, 1.0,
        ];
        let mut x = [5.0; 3];
        let mut b = [1.0, 2.0, 3.0];
        let low = [0.0, -1.0e15, -1.0e15];
        let high = [1.0, 1.0e15, 1.0e15];

        let mut workspace = LcpWorkspace::new();
        let result = workspace.solve_partition_dantzig_lcp(3, &a, &mut x, &mut b, &low, &high);
        assert_eq!(result, Err(LinalgError::NotPositiveDefinite { row: 1 }));
        assert_eq!(x, [0.0; 3]);
    }
}
