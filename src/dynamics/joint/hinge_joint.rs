use crate::dynamics::joint::{ConstraintRows, Joint};
use crate::dynamics::RigidBody;
use crate::math::{Isometry, Point, Real, MAX_BOUND, MIN_BOUND};
use crate::utils::{angle_around, basis};

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// A joint that removes all relative motion between two bodies, except for the rotations along
/// one axis.
///
/// The rotation axis (the pin) is the `x` axis of the joint frames.
pub struct HingeJoint {
    /// The joint frame, expressed in the local space of the first body.
    pub local_frame0: Isometry<Real>,
    /// The joint frame, expressed in the local space of the second body.
    pub local_frame1: Isometry<Real>,
    /// Whether the hinge angle is limited to `[min_angle, max_angle]`.
    pub limits_enabled: bool,
    /// The lower angle limit.
    pub min_angle: Real,
    /// The upper angle limit.
    pub max_angle: Real,
    /// Maximum dry friction torque around the pin. Zero disables friction.
    pub friction: Real,
    /// Whether the spring-damper around the pin is enabled.
    pub spring_enabled: bool,
    /// Angular acceleration per radian of the spring.
    pub spring_stiffness: Real,
    /// Angular acceleration per radian per second of the damper.
    pub spring_damping: Real,
    angle: Real,
    omega: Real,
}

impl HingeJoint {
    /// Creates a hinge joint from its frames, expressed in the local space of each body.
    pub fn new(local_frame0: Isometry<Real>, local_frame1: Isometry<Real>) -> Self {
        Self {
            local_frame0,
            local_frame1,
            limits_enabled: false,
            min_angle: -Real::MAX,
            max_angle: Real::MAX,
            friction: 0.0,
            spring_enabled: false,
            spring_stiffness: 0.0,
            spring_damping: 0.0,
            angle: 0.0,
            omega: 0.0,
        }
    }

    /// Creates a hinge joint with the given world-space pivot and frame, for two bodies at
    /// their current positions.
    pub fn from_world_frame(frame: &Isometry<Real>, body0: &RigidBody, body1: &RigidBody) -> Self {
        Self::new(
            body0.position.inv_mul(frame),
            body1.position.inv_mul(frame),
        )
    }

    /// Limits the hinge angle to `[min, max]`.
    #[must_use]
    pub fn limits(mut self, min: Real, max: Real) -> Self {
        self.limits_enabled = true;
        self.min_angle = min;
        self.max_angle = max;
        self
    }

    /// Sets the maximum dry friction torque around the pin.
    #[must_use]
    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    /// Enables the spring-damper around the pin.
    #[must_use]
    pub fn spring_damper(mut self, stiffness: Real, damping: Real) -> Self {
        self.spring_enabled = true;
        self.spring_stiffness = stiffness;
        self.spring_damping = damping;
        self
    }

    /// The hinge angle measured when the rows were last generated.
    pub fn angle(&self) -> Real {
        self.angle
    }

    /// The relative angular velocity around the pin measured when the rows were last generated.
    pub fn omega(&self) -> Real {
        self.omega
    }
}

impl Joint for HingeJoint {
    fn jacobian_derivatives(
        &mut self,
        body0: &RigidBody,
        body1: &RigidBody,
        timestep: Real,
        rows: &mut ConstraintRows,
    ) {
        let frame0 = body0.position * self.local_frame0;
        let frame1 = body1.position * self.local_frame1;
        let p0 = Point::from(frame0.translation.vector);
        let p1 = Point::from(frame1.translation.vector);
        let [pin0, side0, _] = basis(&frame0.rotation);
        let [pin1, side1, up1] = basis(&frame1.rotation);

        for dir in [pin1, side1, up1] {
            rows.add_linear_row(&p0, &p1, &dir);
        }

        rows.add_angular_row(angle_around(&pin1, &pin0, &side1), &side1);
        rows.add_angular_row(angle_around(&pin1, &pin0, &up1), &up1);

        self.angle = angle_around(&side1, &side0, &pin1);
        self.omega = (body0.angvel - body1.angvel).dot(&pin1);

        let mut limited = false;
        if self.limits_enabled {
            if self.angle < self.min_angle {
                let i = rows.add_angular_row(self.angle - self.min_angle, &pin1);
                rows.set_row_limits(i, 0.0, MAX_BOUND);
                limited = true;
            } else if self.angle > self.max_angle {
                let i = rows.add_angular_row(self.angle - self.max_angle, &pin1);
                rows.set_row_limits(i, MIN_BOUND, 0.0);
                limited = true;
            }
        }

        if !limited && timestep > 0.0 {
            if self.spring_enabled {
                let i = rows.add_angular_row(0.0, &pin1);
                let accel = -self.spring_stiffness * self.angle - self.spring_damping * self.omega;
                rows.set_row_acceleration(i, accel);
            } else if self.friction > 0.0 {
                let i = rows.add_angular_row(0.0, &pin1);
                rows.set_row_acceleration(i, -self.omega / timestep);
                rows.set_row_limits(i, -self.friction, self.friction);
            }
        }
    }
}
