use crate::dynamics::joint::{ConstraintRows, Joint};
use crate::dynamics::RigidBody;
use crate::math::{Isometry, Point, Real, MAX_BOUND, MIN_BOUND};
use crate::utils::basis;

bitflags::bitflags! {
    /// A bit mask identifying multiple degrees of freedom of a joint.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    pub struct JointAxesMask: u8 {
        /// No degree of freedom.
        const FREE = 0;
        /// The translation along the `x` axis of the joint frame.
        const LIN_X = 1 << 0;
        /// The translation along the `y` axis of the joint frame.
        const LIN_Y = 1 << 1;
        /// The translation along the `z` axis of the joint frame.
        const LIN_Z = 1 << 2;
        /// The rotation around the `x` axis of the joint frame.
        const ANG_X = 1 << 3;
        /// The rotation around the `y` axis of the joint frame.
        const ANG_Y = 1 << 4;
        /// The rotation around the `z` axis of the joint frame.
        const ANG_Z = 1 << 5;
        /// All the translational degrees of freedom.
        const LIN_AXES = Self::LIN_X.bits() | Self::LIN_Y.bits() | Self::LIN_Z.bits();
        /// All the rotational degrees of freedom.
        const ANG_AXES = Self::ANG_X.bits() | Self::ANG_Y.bits() | Self::ANG_Z.bits();
    }
}

/// The range allowed for one degree of freedom of a joint.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct JointLimits {
    /// The lower limit.
    pub min: Real,
    /// The upper limit.
    pub max: Real,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            min: -Real::MAX,
            max: Real::MAX,
        }
    }
}

/// A joint locking any subset of the six relative degrees of freedom of two bodies, and
/// limiting any subset of the others.
///
/// Angular errors are measured with the rotation vector of the relative orientation of the
/// two joint frames, so this joint is accurate for small angular deviations on the limited
/// axes.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SixDofJoint {
    /// The joint frame, expressed in the local space of the first body.
    pub local_frame0: Isometry<Real>,
    /// The joint frame, expressed in the local space of the second body.
    pub local_frame1: Isometry<Real>,
    /// The locked degrees of freedom.
    pub locked_axes: JointAxesMask,
    /// The limited degrees of freedom.
    pub limit_axes: JointAxesMask,
    /// The limits of each degree of freedom, in the order of [`JointAxesMask`].
    pub limits: [JointLimits; 6],
}

impl SixDofJoint {
    /// Creates a joint locking the given degrees of freedom.
    pub fn new(
        local_frame0: Isometry<Real>,
        local_frame1: Isometry<Real>,
        locked_axes: JointAxesMask,
    ) -> Self {
        Self {
            local_frame0,
            local_frame1,
            locked_axes,
            limit_axes: JointAxesMask::FREE,
            limits: [JointLimits::default(); 6],
        }
    }

    /// A joint preventing any relative motion.
    pub fn fixed(local_frame0: Isometry<Real>, local_frame1: Isometry<Real>) -> Self {
        Self::new(local_frame0, local_frame1, JointAxesMask::all())
    }

    /// A joint preventing any relative translation of the joint origins.
    pub fn spherical(local_frame0: Isometry<Real>, local_frame1: Isometry<Real>) -> Self {
        Self::new(local_frame0, local_frame1, JointAxesMask::LIN_AXES)
    }

    /// Limits the given free degree of freedom to `[min, max]`.
    ///
    /// `axis` must contain a single degree of freedom.
    #[must_use]
    pub fn limit(mut self, axis: JointAxesMask, min: Real, max: Real) -> Self {
        let i = axis.bits().trailing_zeros() as usize;
        debug_assert_eq!(axis.bits().count_ones(), 1);
        self.limit_axes |= axis;
        self.limits[i] = JointLimits { min, max };
        self
    }
}

impl Joint for SixDofJoint {
    fn jacobian_derivatives(
        &mut self,
        body0: &RigidBody,
        body1: &RigidBody,
        _timestep: Real,
        rows: &mut ConstraintRows,
    ) {
        let frame0 = body0.position * self.local_frame0;
        let frame1 = body1.position * self.local_frame1;
        let p0 = Point::from(frame0.translation.vector);
        let p1 = Point::from(frame1.translation.vector);
        let axes = basis(&frame1.rotation);
        let rotation_error = (frame0.rotation * frame1.rotation.inverse()).scaled_axis();

        for (k, axis) in axes.iter().enumerate() {
            let flag = JointAxesMask::from_bits_truncate(1 << k);

            if self.locked_axes.contains(flag) {
                rows.add_linear_row(&p0, &p1, axis);
            } else if self.limit_axes.contains(flag) {
                let limits = self.limits[k];
                let coord = (p0 - p1).dot(axis);
                if coord < limits.min {
                    let i = rows.add_linear_row(&p0, &p1, axis);
                    rows.set_row_penetration(i, coord - limits.min);
                    rows.set_row_limits(i, 0.0, MAX_BOUND);
                } else if coord > limits.max {
                    let i = rows.add_linear_row(&p0, &p1, axis);
                    rows.set_row_penetration(i, coord - limits.max);
                    rows.set_row_limits(i, MIN_BOUND, 0.0);
                }
            }
        }

        for (k, axis) in axes.iter().enumerate() {
            let flag = JointAxesMask::from_bits_truncate(1 << (k + 3));
            let angle = rotation_error.dot(axis);

            if self.locked_axes.contains(flag) {
                rows.add_angular_row(angle, axis);
            } else if self.limit_axes.contains(flag) {
                let limits = self.limits[k + 3];
                if angle < limits.min {
                    let i = rows.add_angular_row(angle - limits.min, axis);
                    rows.set_row_limits(i, 0.0, MAX_BOUND);
                } else if angle > limits.max {
                    let i = rows.add_angular_row(angle - limits.max, axis);
                    rows.set_row_limits(i, MIN_BOUND, 0.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::Vector;
    use approx::assert_relative_eq;

    #[test]
    fn row_counts_follow_the_locked_axes() {
        let b0 = RigidBodyBuilder::dynamic().build();
        let b1 = RigidBody::sentinel();

        for (joint, expected) in [
            (SixDofJoint::fixed(Isometry::identity(), Isometry::identity()), 6),
            (SixDofJoint::spherical(Isometry::identity(), Isometry::identity()), 3),
        ] {
            let mut joint = joint;
            let mut rows = Vec::new();
            let mut sink = ConstraintRows::new(&mut rows, &b0, &b1);
            joint.jacobian_derivatives(&b0, &b1, 1.0 / 60.0, &mut sink);
            assert_eq!(rows.len(), expected);
        }
    }

    #[test]
    fn linear_limit_only_emits_a_row_when_violated() {
        let mut b0 = RigidBodyBuilder::dynamic().build();
        let b1 = RigidBody::sentinel();
        let mut joint = SixDofJoint::new(
            Isometry::identity(),
            Isometry::identity(),
            JointAxesMask::LIN_Y | JointAxesMask::LIN_Z | JointAxesMask::ANG_AXES,
        )
        .limit(JointAxesMask::LIN_X, -1.0, 1.0);

        let mut rows = Vec::new();
        let mut sink = ConstraintRows::new(&mut rows, &b0, &b1);
        joint.jacobian_derivatives(&b0, &b1, 1.0 / 60.0, &mut sink);
        assert_eq!(rows.len(), 5);

        b0.position.translation.vector = Vector::new(1.5, 0.0, 0.0);
        let mut rows = Vec::new();
        let mut sink = ConstraintRows::new(&mut rows, &b0, &b1);
        joint.jacobian_derivatives(&b0, &b1, 1.0 / 60.0, &mut sink);
        assert_eq!(rows.len(), 6);
        assert_relative_eq!(rows[0].penetration, 0.5, epsilon = 1.0e-6);
        assert_eq!(rows[0].upper_bound_friction_coefficient, 0.0);
    }
}
