use crate::math::{AngVector, Real, Vector, MAX_BOUND, MIN_BOUND};
use std::ops::{Add, AddAssign, Mul};

/// The linear and angular parts of a Jacobian block, or of a force and torque pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Jacobian {
    /// The linear part.
    pub linear: Vector<Real>,
    /// The angular part.
    pub angular: AngVector<Real>,
}

impl Jacobian {
    /// A Jacobian with all its components set to zero.
    #[inline]
    pub fn zero() -> Self {
        Self {
            linear: Vector::zeros(),
            angular: AngVector::zeros(),
        }
    }

    /// Creates a Jacobian from its linear and angular parts.
    #[inline]
    pub fn new(linear: Vector<Real>, angular: AngVector<Real>) -> Self {
        Self { linear, angular }
    }

    /// The generalized dot product `self.linear . other.linear + self.angular . other.angular`.
    #[inline]
    pub fn dot(&self, other: &Jacobian) -> Real {
        self.linear.dot(&other.linear) + self.angular.dot(&other.angular)
    }
}

impl Default for Jacobian {
    fn default() -> Self {
        Self::zero()
    }
}

impl Mul<Real> for Jacobian {
    type Output = Jacobian;

    #[inline]
    fn mul(self, rhs: Real) -> Jacobian {
        Jacobian::new(self.linear * rhs, self.angular * rhs)
    }
}

impl Add for Jacobian {
    type Output = Jacobian;

    #[inline]
    fn add(self, rhs: Jacobian) -> Jacobian {
        Jacobian::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl AddAssign for Jacobian {
    #[inline]
    fn add_assign(&mut self, rhs: Jacobian) {
        self.linear += rhs.linear;
        self.angular += rhs.angular;
    }
}

/// The Jacobian blocks of a row relative to each of its two bodies.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct JacobianPair {
    /// The block relative to the first body.
    pub body0: Jacobian,
    /// The block relative to the second body.
    pub body1: Jacobian,
}

impl JacobianPair {
    /// Creates a Jacobian pair.
    #[inline]
    pub fn new(body0: Jacobian, body1: Jacobian) -> Self {
        Self { body0, body1 }
    }

    /// Applies this row to the generalized vectors of both bodies.
    #[inline]
    pub fn dot(&self, v0: &Jacobian, v1: &Jacobian) -> Real {
        self.body0.dot(v0) + self.body1.dot(v1)
    }

    /// Adds `scale` times this row to the force accumulators of both bodies.
    #[inline]
    pub fn accumulate(&self, scale: Real, f0: &mut Jacobian, f1: &mut Jacobian) {
        *f0 += self.body0 * scale;
        *f1 += self.body1 * scale;
    }
}

/// A scalar constraint equation between two bodies, and its solver state.
///
/// Rows are generated from scratch at every step. Only their solved `force` survives the step,
/// through the feedback slot of their joint.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JacobianRow {
    /// The constraint Jacobian.
    pub jt: JacobianPair,
    /// The constraint Jacobian premultiplied by the inverse mass matrix of each body.
    pub jminv: JacobianPair,
    /// The current force along this row.
    pub force: Real,
    /// Residual acceleration of this row (simulation mode).
    pub accel: Real,
    /// External acceleration along this row, folded in by the Jacobian builder.
    pub delta_accel: Real,
    /// Search direction of the conjugate-gradient passes (simulation mode).
    pub delta_force: Real,
    /// Desired relative acceleration along this row.
    pub coordinate_accel: Real,
    /// Diagonal regularization of this row.
    pub diag_damp: Real,
    /// Relative regularization scale of this row, `1.0` by default.
    pub stiffness: Real,
    /// Inverse of the regularized diagonal of `J M^-1 J^T`.
    pub inv_jminv_jt: Real,
    /// Lower force bound, or lower friction coefficient if `normal_force_index` is set.
    pub lower_bound_friction_coefficient: Real,
    /// Upper force bound, or upper friction coefficient if `normal_force_index` is set.
    pub upper_bound_friction_coefficient: Real,
    /// Index, within the same joint, of the row whose force scales this row's bounds.
    ///
    /// The referenced row always comes before this one.
    pub normal_force_index: Option<usize>,
    /// The largest force magnitude reached by this row during the step.
    pub max_impact: Real,
    /// Position error along this row.
    pub penetration: Real,
    /// Fraction of the position error corrected at each step.
    pub penetration_stiffness: Real,
    /// Target relative acceleration if this row is driven by a motor.
    pub motor_accel: Option<Real>,
    /// Index of this row's feedback entry in its joint.
    pub feedback_slot: usize,
}

impl JacobianRow {
    /// Default fraction of the position error corrected at each step.
    pub const DEFAULT_PENETRATION_STIFFNESS: Real = 0.25;

    /// Creates an unbounded row with the given Jacobian.
    pub fn new(jt: JacobianPair) -> Self {
        Self {
            jt,
            jminv: JacobianPair::default(),
            force: 0.0,
            accel: 0.0,
            delta_accel: 0.0,
            delta_force: 0.0,
            coordinate_accel: 0.0,
            diag_damp: 0.0,
            stiffness: 1.0,
            inv_jminv_jt: 0.0,
            lower_bound_friction_coefficient: MIN_BOUND,
            upper_bound_friction_coefficient: MAX_BOUND,
            normal_force_index: None,
            max_impact: 0.0,
            penetration: 0.0,
            penetration_stiffness: Self::DEFAULT_PENETRATION_STIFFNESS,
            motor_accel: None,
            feedback_slot: 0,
        }
    }

    /// The relative velocity of the bodies along this row.
    #[inline]
    pub fn relative_velocity(&self, v0: &Jacobian, v1: &Jacobian) -> Real {
        self.jt.dot(v0, v1)
    }
}

/// Where the rows of a joint are stored in the island's row arena.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JointInfo {
    /// Index of the first row of the joint.
    pub pair_start: usize,
    /// Number of rows of the joint.
    pub pair_count: usize,
    /// Number of leading rows not clamped by the simulation-mode solver.
    pub pair_active_count: usize,
    /// Island-local index of the first body.
    pub m0: usize,
    /// Island-local index of the second body.
    pub m1: usize,
}

impl JointInfo {
    /// The range of the joint's rows in the row arena.
    #[inline]
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.pair_start..self.pair_start + self.pair_count
    }

    /// The range of the joint's active rows in the row arena.
    #[inline]
    pub fn active_rows(&self) -> std::ops::Range<usize> {
        self.pair_start..self.pair_start + self.pair_active_count
    }
}
