use crate::dynamics::joint::ConstraintRows;
use crate::dynamics::solver::{Jacobian, JacobianRow};
use crate::dynamics::RigidBody;
use crate::math::{Point, Real, Vector, CONSTRAINT_MAX_ROWS};
use arrayvec::ArrayVec;
use downcast_rs::{impl_downcast, DowncastSync};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// The family of a joint.
pub enum JointKind {
    /// A permanent constraint (hinge, ball, fixed, etc.)
    Bilateral,
    /// A set of contact points produced by collision detection.
    Contact,
}

/// A contact point between the two bodies of a contact joint.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// The world-space contact point.
    pub point: Point<Real>,
    /// The world-space contact normal, pointing from the second body toward the first.
    pub normal: Vector<Real>,
    /// The penetration depth, positive when the bodies overlap.
    pub depth: Real,
}

/// The force applied by one row of a joint during the last step.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct JointForce {
    /// The solved force.
    ///
    /// It is also the initial guess of the next step.
    pub force: Real,
    /// The largest force magnitude reached during the step, times the solver sub-step length.
    pub impact: Real,
}

/// The time-stepping information given to [`Joint::joint_accelerations`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointAccelerationDescriptor {
    /// The length of the (sub-)step being solved. Zero for impulsive solves.
    pub timestep: Real,
    /// The inverse of `timestep`, or zero.
    pub inv_timestep: Real,
    /// Whether this is the first sub-step of the step.
    ///
    /// Position errors are only corrected during the first sub-step.
    pub first_pass: bool,
}

impl JointAccelerationDescriptor {
    /// Scale turning a relative velocity into the acceleration cancelling it.
    ///
    /// Impulsive solves work directly on velocity changes.
    #[inline]
    pub fn velocity_scale(&self) -> Real {
        if self.timestep > 0.0 {
            self.inv_timestep
        } else {
            1.0
        }
    }
}

/// A constraint between two rigid bodies.
///
/// A joint is a generator of Jacobian rows: it emits rows describing the relative motions it
/// prevents, then computes the relative acceleration each row must reach.
pub trait Joint: DowncastSync {
    /// The family of this joint.
    fn kind(&self) -> JointKind {
        JointKind::Bilateral
    }

    /// Emits the Jacobian rows of this joint for the current positions of its bodies.
    fn jacobian_derivatives(
        &mut self,
        body0: &RigidBody,
        body1: &RigidBody,
        timestep: Real,
        rows: &mut ConstraintRows,
    );

    /// Sets the `coordinate_accel` of every row of this joint.
    ///
    /// The default implementation drives the relative velocity along each row to zero, and
    /// corrects the position error of each row during the first sub-step. Motor rows use
    /// their target acceleration.
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
            if let Some(motor_accel) = row.motor_accel {
                let motor_accel = if desc.timestep > 0.0 { motor_accel } else { 0.0 };
                row.coordinate_accel = motor_accel + row.delta_accel;
                continue;
            }

            let vrel = row.relative_velocity(&v0, &v1);
            let mut accel = -vrel * scale;
            if desc.first_pass && desc.timestep > 0.0 {
                accel -= row.penetration
                    * row.penetration_stiffness
                    * desc.inv_timestep
                    * desc.inv_timestep;
            }
            row.coordinate_accel = row.delta_accel + accel;
        }
    }

    /// Called once the forces of this joint have been solved and written to its feedback.
    fn on_solved(&mut self, _feedback: &[JointForce], _timestep: Real, _thread_index: usize) {}

    /// The contact points of this joint, if it is a contact joint.
    fn contact_points(&self) -> Option<&[ContactPoint]> {
        None
    }
}

impl_downcast!(sync Joint);

/// Callback invoked after the forces of a constraint have been solved.
///
/// It receives the constraint, the timestep, and the index of the thread that solved the island.
pub type FeedbackCallback = dyn Fn(&Constraint, Real, usize) + Send + Sync;

/// A joint attached to two bodies of an island.
pub struct Constraint {
    /// Island-local index of the first body.
    pub body0: usize,
    /// Island-local index of the second body. Index 0 is the immovable sentinel.
    pub body1: usize,
    /// The joint model.
    pub joint: Box<dyn Joint>,
    /// Inactive constraints emit no rows.
    pub solver_active: bool,
    /// The force of each row of the joint after the last step.
    pub feedback: ArrayVec<JointForce, CONSTRAINT_MAX_ROWS>,
    /// Callback invoked after each solve.
    pub feedback_callback: Option<Box<FeedbackCallback>>,
}

impl Constraint {
    /// Attaches a joint between two island-local bodies.
    pub fn new(body0: usize, body1: usize, joint: impl Joint) -> Self {
        assert_ne!(body0, body1, "A joint cannot attach a body to itself.");
        Self {
            body0,
            body1,
            joint: Box::new(joint),
            solver_active: true,
            feedback: ArrayVec::new(),
            feedback_callback: None,
        }
    }

    /// Sets the callback invoked after each solve of this constraint.
    #[must_use]
    pub fn with_feedback_callback(
        mut self,
        callback: impl Fn(&Constraint, Real, usize) + Send + Sync + 'static,
    ) -> Self {
        self.feedback_callback = Some(Box::new(callback));
        self
    }

    /// The joint model, if it has the type `J`.
    pub fn joint_as<J: Joint>(&self) -> Option<&J> {
        self.joint.downcast_ref()
    }

    /// The joint model, if it has the type `J`.
    pub fn joint_as_mut<J: Joint>(&mut self) -> Option<&mut J> {
        self.joint.downcast_mut()
    }

    /// Is this a contact constraint?
    pub fn is_contact(&self) -> bool {
        self.joint.kind() == JointKind::Contact
    }

    /// Resizes the feedback to `num_rows` rows, forgetting the previous forces if the row
    /// count changed.
    pub(crate) fn resize_feedback(&mut self, num_rows: usize) {
        if self.feedback.len() != num_rows {
            self.feedback.clear();
            self.feedback
                .extend(std::iter::repeat(JointForce::default()).take(num_rows));
        }
    }

    /// Runs the post-solve notifications of this constraint.
    pub(crate) fn notify_solved(&mut self, timestep: Real, thread_index: usize) {
        self.joint
            .on_solved(&self.feedback, timestep, thread_index);

        if let Some(callback) = &self.feedback_callback {
            callback(&*self, timestep, thread_index);
        }
    }
}
