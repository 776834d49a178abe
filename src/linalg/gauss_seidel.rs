use super::dense::dot;
use na::RealField;
use num::{One, Zero};

/// Solves the boxed LCP `A * x = b + r` with projected Gauss-Seidel iterations.
///
/// On exit every `x[i]` lies in `[low[i], high[i]]`, and the squared residual of the unclamped
/// variables is below `1.0e-12` unless the iteration limit was reached. `x` is used as the
/// initial guess (after clamping).
pub fn gauss_seidel_lcp<N: RealField + Copy>(
    size: usize,
    matrix: &[N],
    x: &mut [N],
    b: &[N],
    low: &[N],
    high: &[N],
) {
    let mut inv_diag = Vec::with_capacity(size);
    for i in 0..size {
        x[i] = x[i].clamp(low[i], high[i]);
        inv_diag.push(N::one() / matrix[i * size + i]);
    }

    let tol: N = na::convert(1.0e-6);
    let tol2 = tol * tol;
    let mut residual2: N = na::convert(1.0e6);
    let max_iterations = size.pow(4) + 100_000;

    let mut iteration = 0;
    while iteration < max_iterations && residual2 > tol2 {
        residual2 = N::zero();
        for j in 0..size {
            let row = &matrix[j * size..];
            let r = b[j] - dot(size, row, x);
            let mut f = (r + row[j] * x[j]) * inv_diag[j];
            if f > high[j] {
                f = high[j];
            } else if f < low[j] {
                f = low[j];
            } else {
                residual2 += r * r;
            }
            x[j] = f;
        }
        iteration += 1;
    }

    log::trace!(
        "Gauss-Seidel LCP of size {} stopped after {} iterations.",
        size,
        iteration
    );
}
