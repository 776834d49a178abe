use super::LinalgError;
use na::RealField;
use num::Zero;

/// Factorizes row `n` of a matrix whose rows `0..n` already hold a Cholesky factor.
///
/// On success, the lower-triangular part of row `n` is overwritten with the corresponding row
/// of the factor `L` such that `L * L^T` equals the leading `(n + 1) x (n + 1)` block of the
/// original matrix. The upper-triangular part of the row is left untouched.
pub fn cholesky_factorization_add_row<N: RealField + Copy>(
    size: usize,
    n: usize,
    matrix: &mut [N],
) -> Result<(), LinalgError> {
    let min_pivot: N = na::convert(1.0e-6);
    let (head, tail) = matrix.split_at_mut(n * size);
    let row_n = &mut tail[..size];

    for j in 0..=n {
        let row_j: &[N] = if j == n {
            &row_n[..]
        } else {
            &head[j * size..(j + 1) * size]
        };

        let mut s = N::zero();
        for k in 0..j {
            s += row_n[k] * row_j[k];
        }

        if j == n {
            let diag = row_n[n] - s;
            if diag < min_pivot {
                return Err(LinalgError::NotPositiveDefinite { row: n });
            }
            row_n[n] = diag.sqrt();
        } else {
            let pivot = row_j[j];
            row_n[j] = (row_n[j] - s) / pivot;
        }
    }

    Ok(())
}

/// In-place Cholesky factorization of a symmetric positive-definite matrix.
///
/// Only the lower triangle of the result is meaningful.
pub fn cholesky_factorization<N: RealField + Copy>(
    size: usize,
    matrix: &mut [N],
) -> Result<(), LinalgError> {
    for i in 0..size {
        cholesky_factorization_add_row(size, i, matrix)?;
    }
    Ok(())
}

/// Solves `L * L^T * x = b` restricted to the leading `n x n` block of the factor.
///
/// `x` contains `b` on entry and the solution on exit. Entries of `x` past `n` are not read.
pub fn solve_cholesky<N: RealField + Copy>(size: usize, n: usize, cholesky: &[N], x: &mut [N]) {
    for i in 0..n {
        let row = &cholesky[i * size..];
        let mut acc = N::zero();
        for j in 0..i {
            acc += row[j] * x[j];
        }
        x[i] = (x[i] - acc) / row[i];
    }

    for i in (0..n).rev() {
        let mut acc = N::zero();
        for j in i + 1..n {
            acc += cholesky[size * j + i] * x[j];
        }
        x[i] = (x[i] - acc) / cholesky[size * i + i];
    }
}

/// Restores the triangular shape of a Cholesky factor whose rows `row` and `column` have been
/// swapped.
///
/// Householder reflections are applied from row `row` downward so that the factor becomes lower
/// triangular again while `L * L^T` is preserved. `tmp` and `reflexion` must hold at least
/// `size` elements each, `active_columns` too.
pub fn cholesky_update<N: RealField + Copy>(
    size: usize,
    row: usize,
    column: usize,
    cholesky: &mut [N],
    tmp: &mut [N],
    reflexion: &mut [N],
    active_columns: &mut [usize],
) {
    if row == column {
        return;
    }
    debug_assert!(row < column);

    let sparse_eps: N = na::convert(1.0e-14);
    let two: N = na::convert(2.0);

    for i in row..size {
        active_columns[0] = i;
        let mut width = 1;
        for j in i + 1..size {
            active_columns[width] = j;
            if cholesky[size * i + j].abs() > sparse_eps {
                width += 1;
            }
        }

        if width > 1 {
            let mut mag = N::zero();
            for &index in &active_columns[1..width] {
                let elem = cholesky[size * i + index];
                mag += elem * elem;
                reflexion[index] = elem;
            }
            let diag = cholesky[size * i + i];
            reflexion[i] = diag - (mag + diag * diag).sqrt();

            let v_mag2 = mag + reflexion[i] * reflexion[i];
            let den = two / v_mag2;

            for j in i..size {
                let row_j = &cholesky[size * j..size * (j + 1)];
                let mut acc = N::zero();
                for &index in &active_columns[..width] {
                    acc += row_j[index] * reflexion[index];
                }
                tmp[j] = acc;
            }

            for j in i + 1..size {
                let a = tmp[j] * den;
                let row_j = &mut cholesky[size * j..size * (j + 1)];
                for &index in &active_columns[..width] {
                    row_j[index] -= a * reflexion[index];
                }
            }

            cholesky[size * i + i] -= tmp[i] * reflexion[i] * den;
        }

        for k in i + 1..size {
            cholesky[size * i + k] = N::zero();
        }

        if cholesky[size * i + i] < N::zero() {
            for k in i..size {
                cholesky[size * k + i] = -cholesky[size * k + i];
            }
        }
    }

    let min_diag: N = na::convert(1.0e-6);
    for i in row..size {
        let diag = &mut cholesky[size * i + i];
        *diag = diag.max(min_diag);
    }
}
