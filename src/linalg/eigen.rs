use super::LinalgError;
use na::RealField;
use num::{One, Zero};

const MAX_QL_ITERATIONS: usize = 10;

/// Computes the eigenvalues of a symmetric matrix.
///
/// Only the lower triangle of `matrix` is read. The matrix is reduced to tridiagonal form with
/// Householder reflections, then the eigenvalues are isolated with implicit-shift QL iterations.
/// The eigenvalues are written unsorted into `eigen_values`.
pub fn eigen_values<N: RealField + Copy>(
    size: usize,
    matrix: &[N],
    eigen_values: &mut [N],
) -> Result<(), LinalgError> {
    if size == 0 {
        return Ok(());
    }

    let mut a = matrix[..size * size].to_vec();
    let mut off_diag = vec![N::zero(); size];
    let two: N = na::convert(2.0);

    for i in (1..size).rev() {
        let mut h = N::zero();

        if i > 1 {
            let mut scale = N::zero();
            for k in 0..i {
                scale += a[i * size + k].abs();
            }

            if scale == N::zero() {
                off_diag[i] = a[i * size + i - 1];
            } else {
                for k in 0..i {
                    a[i * size + k] /= scale;
                    h += a[i * size + k] * a[i * size + k];
                }

                let f = a[i * size + i - 1];
                let g = if f >= N::zero() { -h.sqrt() } else { h.sqrt() };
                off_diag[i] = scale * g;
                h -= f * g;
                a[i * size + i - 1] = f - g;

                let mut f = N::zero();
                for j in 0..i {
                    let mut g = N::zero();
                    for k in 0..=j {
                        g += a[j * size + k] * a[i * size + k];
                    }
                    for k in j + 1..i {
                        g += a[k * size + j] * a[i * size + k];
                    }
                    off_diag[j] = g / h;
                    f += off_diag[j] * a[i * size + j];
                }

                let hh = f / (h + h);
                for j in 0..i {
                    let f = a[i * size + j];
                    let g = off_diag[j] - hh * f;
                    off_diag[j] = g;
                    for k in 0..=j {
                        let delta = f * off_diag[k] + g * a[i * size + k];
                        a[j * size + k] -= delta;
                    }
                }
            }
        } else {
            off_diag[i] = a[i * size + i - 1];
        }
        eigen_values[i] = h;
    }

    eigen_values[0] = a[0];
    for i in 1..size {
        eigen_values[i] = a[i * size + i];
        off_diag[i - 1] = off_diag[i];
    }
    off_diag[size - 1] = N::zero();

    let eps: N = na::convert(1.0e-6);
    let d = eigen_values;
    let e = &mut off_diag;

    for i in 0..size {
        let mut iter = 0;
        loop {
            let mut j = i;
            while j < size - 1 {
                let dd = d[j].abs() + d[j + 1].abs();
                if e[j].abs() <= eps * dd {
                    break;
                }
                j += 1;
            }

            if j == i {
                break;
            }

            iter += 1;
            if iter == MAX_QL_ITERATIONS {
                return Err(LinalgError::NoConvergence { index: i });
            }

            let mut g = (d[i + 1] - d[i]) / (two * e[i]);
            let mut r = g.hypot(N::one());
            let signed_r = if g >= N::zero() { r.abs() } else { -r.abs() };
            g = d[j] - d[i] + e[i] / (g + signed_r);
            let mut s = N::one();
            let mut c = N::one();
            let mut p = N::zero();

            let mut k = j as isize - 1;
            while k >= i as isize {
                let ku = k as usize;
                let f = s * e[ku];
                let b = c * e[ku];
                r = f.hypot(g);
                e[ku + 1] = r;
                if r == N::zero() {
                    d[ku + 1] -= p;
                    e[j] = N::zero();
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[ku + 1] - p;
                r = (d[ku] - g) * s + two * c * b;
                p = s * r;
                d[ku + 1] = g + p;
                g = c * r - b;
                k -= 1;
            }

            if r == N::zero() && k >= i as isize {
                continue;
            }
            d[i] -= p;
            e[i] = g;
            e[j] = N::zero();
        }
    }

    Ok(())
}
