//! # island_dynamics
//!
//! A force-based rigid-body constraint solver working on islands of interacting bodies.
//!
//! Each step, the bodies and joints of every island are turned into a set of Jacobian rows.
//! The rows are then solved either with an iterative, warm-started Gauss-Seidel scheme
//! ("game mode") or with a joint-by-joint Dantzig refinement followed by a global
//! conjugate-gradient style pass ("simulation mode"). Articulated chains flagged as skeletons
//! are solved exactly with a dense, partitioned Dantzig LCP.
//!
//! The dense kernels used by the solver (Cholesky factorization and update, Dantzig and
//! Gauss-Seidel LCP solvers, eigenvalues, Gaussian elimination) are exposed by the [`linalg`]
//! module and are generic over the scalar type.

#![deny(bare_trait_objects)]
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)] // Index loops read better in the dense matrix code.
#![allow(clippy::module_inception)]

pub extern crate nalgebra as na;
#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
extern crate num_traits as num;

#[cfg(feature = "parallel")]
pub use rayon;

macro_rules! par_iter_mut {
    ($t: expr) => {{
        #[cfg(not(feature = "parallel"))]
        let it = $t.iter_mut();

        #[cfg(feature = "parallel")]
        let it = $t.par_iter_mut();
        it
    }};
}

/// The string version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod counters;
pub mod dynamics;
pub mod linalg;
pub mod pipeline;
pub mod utils;

/// Elementary mathematical entities (vectors, matrices, isometries, etc).
pub mod math {
    /// The scalar type used throughout the dynamics layer.
    #[cfg(not(feature = "f64"))]
    pub type Real = f32;
    /// The scalar type used throughout the dynamics layer.
    #[cfg(feature = "f64")]
    pub type Real = f64;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The maximum number of Jacobian rows a single joint may emit.
    ///
    /// This allows up to 16 contact points per contact joint (one normal row and two friction
    /// rows each).
    pub const CONSTRAINT_MAX_ROWS: usize = 3 * 16;

    /// Upper force bound of a row that is not limited.
    pub const MAX_BOUND: Real = 1.0e15;
    /// Lower force bound of a row that is not limited.
    pub const MIN_BOUND: Real = -1.0e15;

    /// The vector type.
    pub type Vector<N> = na::Vector3<N>;
    /// The angular vector type.
    pub type AngVector<N> = na::Vector3<N>;
    /// The point type.
    pub type Point<N> = na::Point3<N>;
    /// The matrix type.
    pub type Matrix<N> = na::Matrix3<N>;
    /// The angular inertia of a rigid body, expressed in world-space.
    pub type AngularInertia<N> = na::Matrix3<N>;
    /// The transformation matrix type.
    pub type Isometry<N> = na::Isometry3<N>;
    /// The rotation type.
    pub type Rotation<N> = na::UnitQuaternion<N>;
    /// The translation type.
    pub type Translation<N> = na::Translation3<N>;
}

/// Prelude containing the common types defined by this crate.
pub mod prelude {
    pub use crate::dynamics::*;
    pub use crate::math::*;
    pub use crate::pipeline::*;
    pub use na::{point, vector, DMatrix, DVector};
    pub extern crate nalgebra;
}
