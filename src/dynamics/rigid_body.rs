use crate::math::{AngVector, AngularInertia, Isometry, Point, Real, Rotation, Vector};
use crate::utils::{self, rotate_principal_inertia};

#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// A rigid body.
///
/// The origin of the body's local frame is its center of mass, and its angular inertia is
/// expressed along the principal axes of that frame. To create a new rigid-body, use the
/// [`RigidBodyBuilder`] structure.
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// World-space position of the center of mass and orientation of the principal axes.
    pub position: Isometry<Real>,
    /// Linear velocity.
    pub linvel: Vector<Real>,
    /// Angular velocity, in world-space.
    pub angvel: AngVector<Real>,
    /// The mass. Zero for bodies that are not affected by forces.
    pub mass: Real,
    /// The inverse mass. Zero for bodies that are not affected by forces.
    pub inv_mass: Real,
    /// Principal angular inertia, in local-space.
    pub local_inertia: AngVector<Real>,
    /// Inverse of the principal angular inertia, in local-space.
    pub local_inv_inertia: AngVector<Real>,
    /// Inverse angular inertia, in world-space.
    pub world_inv_inertia: AngularInertia<Real>,
    /// External force accumulated for the current step.
    ///
    /// After a solve, holds the net linear acceleration of the body until the end of the step.
    pub accel: Vector<Real>,
    /// External torque accumulated for the current step.
    ///
    /// After a solve, holds the net angular acceleration of the body until the end of the step.
    pub alpha: AngVector<Real>,
    /// Net force (external and constraint) applied by the last step.
    pub net_force: Vector<Real>,
    /// Net torque (external and constraint) applied by the last step.
    pub net_torque: AngVector<Real>,
    /// User force applied at every step until [`RigidBody::reset_forces`] is called.
    pub user_force: Vector<Real>,
    /// User torque applied at every step until [`RigidBody::reset_forces`] is called.
    pub user_torque: AngVector<Real>,
    /// Multiplier of the gravity applied to this body.
    pub gravity_scale: Real,
    /// Linear velocity damping coefficient.
    pub linear_damping: Real,
    /// Angular velocity damping coefficient.
    pub angular_damping: Real,
    /// Whether the body's accelerations and velocities were below the freeze thresholds at the
    /// end of the last step.
    pub equilibrium: bool,
    /// Whether the game-mode solver may skip the joints attached to this body.
    pub resting: bool,
    /// Whether the island of this body is asleep.
    pub sleeping: bool,
    /// Whether the island of this body is allowed to fall asleep.
    pub auto_sleep: bool,
    /// Number of consecutive slow steps counted by the sleep logic.
    pub sleeping_counter: u32,
    /// Whether the body's island is integrated with continuous collision sub-steps.
    pub ccd_enabled: bool,
}

impl RigidBody {
    fn new() -> Self {
        Self {
            position: Isometry::identity(),
            linvel: Vector::zeros(),
            angvel: AngVector::zeros(),
            mass: 0.0,
            inv_mass: 0.0,
            local_inertia: AngVector::zeros(),
            local_inv_inertia: AngVector::zeros(),
            world_inv_inertia: AngularInertia::zeros(),
            accel: Vector::zeros(),
            alpha: AngVector::zeros(),
            net_force: Vector::zeros(),
            net_torque: AngVector::zeros(),
            user_force: Vector::zeros(),
            user_torque: AngVector::zeros(),
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            equilibrium: false,
            resting: false,
            sleeping: false,
            auto_sleep: true,
            sleeping_counter: 0,
            ccd_enabled: false,
        }
    }

    /// The immovable body occupying index 0 of every island.
    ///
    /// It stands for the world (and any static body): joints attached to it act as if attached
    /// to an infinitely heavy body.
    pub fn sentinel() -> Self {
        Self {
            equilibrium: true,
            resting: true,
            ..Self::new()
        }
    }

    /// Is this body affected by forces?
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.inv_mass != 0.0
    }

    /// The world-space center of mass.
    #[inline]
    pub fn center_of_mass(&self) -> Point<Real> {
        self.position.translation.vector.into()
    }

    /// The velocity of the material point of this body located at `point` in world-space.
    pub fn velocity_at_point(&self, point: &Point<Real>) -> Vector<Real> {
        let dpt = point - self.center_of_mass();
        self.linvel + self.angvel.cross(&dpt)
    }

    /// Applies a force at the center-of-mass of this rigid-body at every subsequent step.
    ///
    /// This does nothing on non-dynamic bodies.
    pub fn add_force(&mut self, force: Vector<Real>, wake_up: bool) {
        if self.is_dynamic() {
            self.user_force += force;
            if wake_up {
                self.wake_up();
            }
        }
    }

    /// Applies a torque to this rigid-body at every subsequent step.
    ///
    /// This does nothing on non-dynamic bodies.
    pub fn add_torque(&mut self, torque: AngVector<Real>, wake_up: bool) {
        if self.is_dynamic() {
            self.user_torque += torque;
            if wake_up {
                self.wake_up();
            }
        }
    }

    /// Removes all the user forces and torques applied to this body.
    pub fn reset_forces(&mut self) {
        self.user_force = Vector::zeros();
        self.user_torque = AngVector::zeros();
    }

    /// Sets the linear velocity of this body.
    pub fn set_linvel(&mut self, linvel: Vector<Real>, wake_up: bool) {
        self.linvel = linvel;
        if wake_up {
            self.wake_up();
        }
    }

    /// Sets the angular velocity of this body.
    pub fn set_angvel(&mut self, angvel: AngVector<Real>, wake_up: bool) {
        self.angvel = angvel;
        if wake_up {
            self.wake_up();
        }
    }

    /// Wakes up this body, and resets its sleep counter.
    pub fn wake_up(&mut self) {
        if self.is_dynamic() {
            self.sleeping = false;
            self.equilibrium = false;
            self.sleeping_counter = 0;
        }
    }

    /// Recomputes the world-space inverse angular inertia from the current orientation.
    pub fn update_world_inertia(&mut self) {
        self.world_inv_inertia =
            rotate_principal_inertia(&self.position.rotation, &self.local_inv_inertia);
    }

    /// The world-space torque producing the angular acceleration `alpha`.
    pub fn torque_for_angular_acceleration(&self, alpha: &AngVector<Real>) -> AngVector<Real> {
        let rot = &self.position.rotation;
        let local_alpha = rot.inverse_transform_vector(alpha);
        rot * local_alpha.component_mul(&self.local_inertia)
    }

    /// Attenuates the velocities of this body according to its damping coefficients.
    pub fn apply_damping(&mut self, dt: Real) {
        self.linvel *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angvel *= 1.0 / (1.0 + dt * self.angular_damping);
    }

    /// Integrates the position of this body over `dt` with its current velocities.
    ///
    /// The world-space inverse inertia is refreshed afterward.
    pub fn integrate_velocity(&mut self, dt: Real) {
        self.position.translation.vector += self.linvel * dt;
        let rot = Rotation::from_scaled_axis(self.angvel * dt);
        self.position.rotation = rot * self.position.rotation;
        self.position.rotation.renormalize_fast();
        self.update_world_inertia();
    }
}

/// A builder for rigid-bodies.
#[derive(Clone, Debug, PartialEq)]
#[must_use = "Builder functions return the updated builder"]
pub struct RigidBodyBuilder {
    position: Isometry<Real>,
    linvel: Vector<Real>,
    angvel: AngVector<Real>,
    mass: Real,
    principal_inertia: AngVector<Real>,
    gravity_scale: Real,
    linear_damping: Real,
    angular_damping: Real,
    can_sleep: bool,
    ccd_enabled: bool,
}

impl RigidBodyBuilder {
    /// Initialize a new builder for a dynamic rigid body with unit mass and unit inertia.
    pub fn dynamic() -> Self {
        Self {
            position: Isometry::identity(),
            linvel: Vector::zeros(),
            angvel: AngVector::zeros(),
            mass: 1.0,
            principal_inertia: AngVector::repeat(1.0),
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
            ccd_enabled: false,
        }
    }

    /// Initialize a new builder for a body that is not affected by forces.
    pub fn fixed() -> Self {
        Self {
            mass: 0.0,
            principal_inertia: AngVector::zeros(),
            ..Self::dynamic()
        }
    }

    /// Sets the initial translation of the rigid-body to be created.
    pub fn translation(mut self, translation: Vector<Real>) -> Self {
        self.position.translation.vector = translation;
        self
    }

    /// Sets the initial orientation of the rigid-body to be created.
    pub fn rotation(mut self, angle: AngVector<Real>) -> Self {
        self.position.rotation = Rotation::new(angle);
        self
    }

    /// Sets the initial position (translation and orientation) of the rigid-body to be created.
    pub fn position(mut self, pos: Isometry<Real>) -> Self {
        self.position = pos;
        self
    }

    /// Sets the mass of the rigid-body being built.
    pub fn mass(mut self, mass: Real) -> Self {
        self.mass = mass;
        self
    }

    /// Sets the principal angular inertia of the rigid-body being built.
    pub fn principal_inertia(mut self, inertia: AngVector<Real>) -> Self {
        self.principal_inertia = inertia;
        self
    }

    /// Sets the scale applied to the gravity force affecting the rigid-body to be built.
    pub fn gravity_scale(mut self, scale: Real) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Sets the damping factor for the linear part of the rigid-body motion.
    pub fn linear_damping(mut self, factor: Real) -> Self {
        self.linear_damping = factor;
        self
    }

    /// Sets the damping factor for the angular part of the rigid-body motion.
    pub fn angular_damping(mut self, factor: Real) -> Self {
        self.angular_damping = factor;
        self
    }

    /// Sets the initial linear velocity of the rigid-body to be created.
    pub fn linvel(mut self, linvel: Vector<Real>) -> Self {
        self.linvel = linvel;
        self
    }

    /// Sets the initial angular velocity of the rigid-body to be created.
    pub fn angvel(mut self, angvel: AngVector<Real>) -> Self {
        self.angvel = angvel;
        self
    }

    /// Sets whether or not the island of the rigid-body to be created can sleep.
    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    /// Enables continuous collision sub-stepping for the island of this rigid-body.
    pub fn ccd_enabled(mut self, enabled: bool) -> Self {
        self.ccd_enabled = enabled;
        self
    }

    /// Build a new rigid-body with the parameters configured with this builder.
    pub fn build(&self) -> RigidBody {
        let mut rb = RigidBody::new();
        rb.position = self.position;
        rb.linvel = self.linvel;
        rb.angvel = self.angvel;
        rb.mass = self.mass;
        rb.inv_mass = utils::inv(self.mass);
        rb.local_inertia = self.principal_inertia;
        rb.local_inv_inertia = self.principal_inertia.map(utils::inv);
        rb.gravity_scale = self.gravity_scale;
        rb.linear_damping = self.linear_damping;
        rb.angular_damping = self.angular_damping;
        rb.auto_sleep = self.can_sleep;
        rb.ccd_enabled = self.ccd_enabled;
        rb.update_world_inertia();

        if !rb.is_dynamic() {
            rb.equilibrium = true;
            rb.resting = true;
        }

        rb
    }
}

impl From<RigidBodyBuilder> for RigidBody {
    fn from(val: RigidBodyBuilder) -> RigidBody {
        val.build()
    }
}
