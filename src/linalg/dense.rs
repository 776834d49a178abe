use na::RealField;
use num::Zero;

/// Dot product of the first `size` components of `a` and `b`.
#[inline]
pub fn dot<N: RealField + Copy>(size: usize, a: &[N], b: &[N]) -> N {
    a[..size]
        .iter()
        .zip(&b[..size])
        .fold(N::zero(), |acc, (a, b)| acc + *a * *b)
}

/// Computes `out = matrix * v`.
pub fn matrix_times_vector<N: RealField + Copy>(size: usize, matrix: &[N], v: &[N], out: &mut [N]) {
    for i in 0..size {
        out[i] = dot(size, &matrix[i * size..], v);
    }
}

/// Computes `out = a * b`.
pub fn matrix_times_matrix<N: RealField + Copy>(size: usize, a: &[N], b: &[N], out: &mut [N]) {
    for i in 0..size {
        let row_a = &a[i * size..(i + 1) * size];
        for j in 0..size {
            let mut acc = N::zero();
            for k in 0..size {
                acc += row_a[k] * b[k * size + j];
            }
            out[i * size + j] = acc;
        }
    }
}

/// Swaps the rows `i` and `j` of a flat square matrix.
#[inline]
pub(crate) fn swap_rows<N: Copy>(size: usize, matrix: &mut [N], i: usize, j: usize) {
    if i != j {
        let (lo, hi) = (i.min(j), i.max(j));
        let (head, tail) = matrix.split_at_mut(hi * size);
        head[lo * size..(lo + 1) * size].swap_with_slice(&mut tail[..size]);
    }
}

/// Swaps the columns `i` and `j` of a flat square matrix.
#[inline]
pub(crate) fn swap_columns<N: Copy>(size: usize, matrix: &mut [N], i: usize, j: usize) {
    if i != j {
        for k in 0..size {
            matrix.swap(k * size + i, k * size + j);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_products() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [0.0, 1.0, 1.0, 0.0];
        let mut out = [0.0; 4];
        matrix_times_matrix(2, &a, &b, &mut out);
        assert_eq!(out, [2.0, 1.0, 4.0, 3.0]);

        let mut v = [0.0; 2];
        matrix_times_vector(2, &a, &[1.0, -1.0], &mut v);
        assert_relative_eq!(v[0], -1.0);
        assert_relative_eq!(v[1], -1.0);
    }

    #[test]
    fn row_and_column_swaps() {
        let mut m = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        swap_rows(3, &mut m, 2, 0);
        assert_eq!(m, [7, 8, 9, 4, 5, 6, 1, 2, 3]);
        swap_columns(3, &mut m, 0, 1);
        assert_eq!(m, [8, 7, 9, 5, 4, 6, 2, 1, 3]);
    }
}
