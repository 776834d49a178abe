use super::dense::swap_rows;
use super::LinalgError;
use na::RealField;
use num::{One, Zero};

/// Solves `matrix * x = b` by Gaussian elimination with partial pivoting.
///
/// The matrix is destroyed and `b` holds the solution on exit.
pub fn solve_gaussian<N: RealField + Copy>(
    size: usize,
    matrix: &mut [N],
    b: &mut [N],
) -> Result<(), LinalgError> {
    let min_pivot: N = na::convert(1.0e-12);

    for i in 0..size {
        let mut k = i;
        let mut max_val = matrix[i * size + i].abs();
        for j in i + 1..size {
            let val = matrix[j * size + i].abs();
            if val > max_val {
                k = j;
                max_val = val;
            }
        }

        if max_val < min_pivot {
            return Err(LinalgError::Singular { column: i });
        }

        if k != i {
            swap_rows(size, matrix, i, k);
            b.swap(i, k);
        }

        let den = N::one() / matrix[i * size + i];
        for k in i + 1..size {
            let factor = -matrix[k * size + i] * den;
            for j in i + 1..size {
                let elem = matrix[i * size + j];
                matrix[k * size + j] += elem * factor;
            }
            matrix[k * size + i] = N::zero();
            let bi = b[i];
            b[k] += bi * factor;
        }
    }

    for i in (0..size).rev() {
        let row = &matrix[i * size..(i + 1) * size];
        let mut acc = N::zero();
        for j in i + 1..size {
            acc += row[j] * b[j];
        }
        b[i] = (b[i] - acc) / row[i];
    }

    Ok(())
}
