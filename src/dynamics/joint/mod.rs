pub use self::constraint_rows::ConstraintRows;
pub use self::contact_joint::{ContactJoint, MAX_CONTACT_POINTS};
pub use self::hinge_joint::HingeJoint;
pub use self::joint::{
    Constraint, ContactPoint, FeedbackCallback, Joint, JointAccelerationDescriptor, JointForce,
    JointKind,
};
pub use self::six_dof_joint::{JointAxesMask, JointLimits, SixDofJoint};

mod constraint_rows;
mod contact_joint;
mod hinge_joint;
mod joint;
mod six_dof_joint;
