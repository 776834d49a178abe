//! Dense linear algebra on flat, row-major square matrices.
//!
//! Every kernel here takes the matrix dimension `size` explicitly and indexes element `(i, j)`
//! at `i * size + j`. All the kernels are generic over the scalar type so they can be run in
//! single or double precision independently of the precision of the dynamics layer.

pub use self::cholesky::{
    cholesky_factorization, cholesky_factorization_add_row, cholesky_update, solve_cholesky,
};
pub use self::conjugate_gradient::SymmetricBiconjugateGradient;
pub use self::dantzig::{solve_dantzig_lcp, solve_partition_dantzig_lcp, LcpWorkspace};
pub use self::dense::{dot, matrix_times_matrix, matrix_times_vector};
pub use self::eigen::eigen_values;
pub use self::gauss_seidel::gauss_seidel_lcp;
pub use self::gaussian::solve_gaussian;

mod cholesky;
mod conjugate_gradient;
mod dantzig;
mod dense;
mod eigen;
mod gauss_seidel;
mod gaussian;

/// Bound magnitude above which an LCP variable is considered unbounded.
pub const LCP_MAX_VALUE: f64 = 1.0e10;

/// Errors raised by the dense solvers when a system is numerically degenerate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinalgError {
    /// A pivot of the Cholesky factorization fell below the positive-definiteness tolerance.
    #[error("matrix is not positive definite: pivot of row {row} is below tolerance")]
    NotPositiveDefinite {
        /// The row at which the factorization stopped.
        row: usize,
    },
    /// No usable pivot was found while eliminating a column.
    #[error("matrix is singular: no usable pivot in column {column}")]
    Singular {
        /// The column that could not be eliminated.
        column: usize,
    },
    /// The QL iteration did not converge.
    #[error("eigenvalue iteration did not converge for eigenvalue {index}")]
    NoConvergence {
        /// The eigenvalue being isolated when the iteration limit was reached.
        index: usize,
    },
}
