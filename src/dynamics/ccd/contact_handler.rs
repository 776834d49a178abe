use crate::dynamics::joint::Constraint;
use crate::dynamics::RigidBody;
use crate::math::Real;

/// The collision-detection services needed by the continuous integration of an island.
///
/// Islands containing a body with CCD enabled are integrated in sub-steps: the handler is asked
/// when the next impact will happen, and to refresh the contact points when it does.
pub trait ContactHandler: Send + Sync {
    /// The time, in `[0, max_time]`, after which the bodies of `contact` will touch if they keep
    /// moving with their current velocities.
    ///
    /// Returns `max_time` if they do not collide before.
    fn time_to_impact(
        &self,
        contact: &Constraint,
        body0: &RigidBody,
        body1: &RigidBody,
        max_time: Real,
    ) -> Real;

    /// Recomputes the contact points of `contact` for the current positions of its bodies.
    fn calculate_contacts(
        &self,
        contact: &mut Constraint,
        body0: &RigidBody,
        body1: &RigidBody,
        timestep: Real,
    );
}

/// A contact handler never reporting any impact.
impl ContactHandler for () {
    fn time_to_impact(&self, _: &Constraint, _: &RigidBody, _: &RigidBody, max_time: Real) -> Real {
        max_time
    }

    fn calculate_contacts(&self, _: &mut Constraint, _: &RigidBody, _: &RigidBody, _: Real) {}
}
