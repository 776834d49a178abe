use super::dense::dot;
use na::RealField;
use num::Zero;

/// A symmetric positive-definite operator solved with preconditioned conjugate gradients.
///
/// Implementors only describe how to apply the matrix and the inverse of the preconditioner;
/// the iteration itself is provided by [`SymmetricBiconjugateGradient::solve`]. This makes it
/// possible to solve systems whose matrix is never assembled explicitly.
pub trait SymmetricBiconjugateGradient<N: RealField + Copy> {
    /// Computes `out = A * v`.
    fn matrix_times_vector(&self, out: &mut [N], v: &[N]);

    /// Computes `out = M^-1 * v` where `M` is the preconditioner.
    ///
    /// Returns `false` if the preconditioner could not be applied, in which case `out` is
    /// ignored and `v` is used unpreconditioned.
    fn inverse_preconditioner_times_vector(&self, out: &mut [N], v: &[N]) -> bool;

    /// Solves `A * x = b`, using `x` as the initial guess.
    ///
    /// Iterates at most `size` times and stops once the preconditioned residual norm `r^T z`
    /// drops below `tolerance`. Returns that residual norm.
    fn solve(&self, size: usize, tolerance: N, x: &mut [N], b: &[N]) -> N {
        let mut r = vec![N::zero(); size];
        let mut z = vec![N::zero(); size];
        let mut p = vec![N::zero(); size];
        let mut q = vec![N::zero(); size];

        self.matrix_times_vector(&mut q, x);
        for i in 0..size {
            r[i] = b[i] - q[i];
        }
        if !self.inverse_preconditioner_times_vector(&mut z, &r) {
            z.copy_from_slice(&r);
        }
        p.copy_from_slice(&z);

        let mut num = dot(size, &r, &z);
        let mut iter = 0;
        while iter < size && num > tolerance {
            self.matrix_times_vector(&mut q, &p);
            let den = dot(size, &p, &q);
            if den == N::zero() {
                break;
            }

            let alpha = num / den;
            for i in 0..size {
                x[i] += alpha * p[i];
                r[i] -= alpha * q[i];
            }

            if !self.inverse_preconditioner_times_vector(&mut z, &r) {
                z.copy_from_slice(&r);
            }

            let num1 = dot(size, &r, &z);
            let beta = num1 / num;
            for i in 0..size {
                p[i] = z[i] + beta * p[i];
            }
            num = num1;
            iter += 1;
        }

        num
    }
}
