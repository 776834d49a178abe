use crate::dynamics::joint::{
    ConstraintRows, ContactPoint, Joint, JointAccelerationDescriptor, JointKind,
};
use crate::dynamics::solver::{Jacobian, JacobianRow};
use crate::dynamics::RigidBody;
use crate::math::{Real, CONSTRAINT_MAX_ROWS, MAX_BOUND};
use crate::utils::orthonormal_basis;
use arrayvec::ArrayVec;

/// Maximum number of points of a contact joint.
pub const MAX_CONTACT_POINTS: usize = CONSTRAINT_MAX_ROWS / 3;

/// The contact between two bodies, as produced by collision detection.
///
/// Each point emits one unilateral normal row followed by two Coulomb friction rows bounded by
/// the force of that normal row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ContactJoint {
    /// The contact points.
    pub points: ArrayVec<ContactPoint, MAX_CONTACT_POINTS>,
    /// The Coulomb friction coefficient.
    pub friction: Real,
    /// The restitution coefficient.
    pub restitution: Real,
    /// Normal approach speed below which restitution is ignored.
    pub restitution_velocity_threshold: Real,
    /// Penetration depth left uncorrected.
    pub allowed_penetration: Real,
}

impl Default for ContactJoint {
    fn default() -> Self {
        Self::new(0.5, 0.0)
    }
}

impl ContactJoint {
    /// Creates a contact joint without contact points.
    pub fn new(friction: Real, restitution: Real) -> Self {
        Self {
            points: ArrayVec::new(),
            friction,
            restitution,
            restitution_velocity_threshold: 0.5,
            allowed_penetration: 0.005,
        }
    }

    /// Adds a contact point.
    ///
    /// Returns `false` if this joint already holds the maximum number of points.
    pub fn push_point(&mut self, point: ContactPoint) -> bool {
        self.points.try_push(point).is_ok()
    }

    /// Replaces all the contact points of this joint.
    pub fn set_points(&mut self, points: impl IntoIterator<Item = ContactPoint>) {
        self.points.clear();
        for pt in points {
            if !self.push_point(pt) {
                break;
            }
        }
    }
}

impl Joint for ContactJoint {
    fn kind(&self) -> JointKind {
        JointKind::Contact
    }

    fn jacobian_derivatives(
        &mut self,
        _body0: &RigidBody,
        _body1: &RigidBody,
        _timestep: Real,
        rows: &mut ConstraintRows,
    ) {
        for contact in &self.points {
            let normal_row = rows.add_linear_row(&contact.point, &contact.point, &contact.normal);
            rows.set_row_limits(normal_row, 0.0, MAX_BOUND);
            rows.set_row_penetration(
                normal_row,
                -(contact.depth - self.allowed_penetration).max(0.0),
            );

            for tangent in orthonormal_basis(&contact.normal) {
                let i = rows.add_linear_row(&contact.point, &contact.point, &tangent);
                rows.set_row_friction(i, normal_row, -self.friction, self.friction);
            }
        }
    }

    fn joint_accelerations(
        &self,
        desc: &JointAccelerationDescriptor,
        rows: &mut [JacobianRow],
        body0: &RigidBody,
        body1: &RigidBody,
    ) {
        let v0 = Jacobian::new(body0.linvel, body0.angvel);
        let v1 = Jacobian::new(body1.linvel, body1.angvel);
        let scale = desc.velocity_scale();

        for row in rows {
            let vrel = row.relative_velocity(&v0, &v1);
            let mut accel = -vrel * scale;

            if row.normal_force_index.is_none() && desc.first_pass {
                if vrel < -self.restitution_velocity_threshold {
                    accel -= self.restitution * vrel * scale;
                }
                if desc.timestep > 0.0 {
                    accel -= row.penetration
                        * row.penetration_stiffness
                        * desc.inv_timestep
                        * desc.inv_timestep;
                }
            }

            row.coordinate_accel = row.delta_accel + accel;
        }
    }

    fn contact_points(&self) -> Option<&[ContactPoint]> {
        Some(&self.points)
    }
}
