//! Structures related to dynamics: bodies, joints, islands, and the constraint solver.

pub use self::ccd::ContactHandler;
pub use self::integration_parameters::{
    IntegrationParameters, SleepEntry, SleepTable, SolverMode, SLEEP_ENTRIES,
};
pub use self::island_set::{Island, IslandHandle, IslandSet, IslandView};
pub use self::joint::{
    Constraint, ConstraintRows, ContactJoint, ContactPoint, FeedbackCallback, HingeJoint, Joint,
    JointAccelerationDescriptor, JointAxesMask, JointForce, JointKind, JointLimits, SixDofJoint,
    MAX_CONTACT_POINTS,
};
pub use self::rigid_body::{RigidBody, RigidBodyBuilder};
pub use self::solver::IslandSolver;

mod ccd;
mod integration_parameters;
mod island_set;
pub mod joint;
mod rigid_body;
pub mod solver;
