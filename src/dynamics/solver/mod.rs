//! The island constraint solver.

pub use self::island_solver::{integrate_array, IslandSolver};
pub use self::jacobian::{Jacobian, JacobianPair, JacobianRow, JointInfo};
pub use self::jacobian_builder::build_jacobian_matrix;
pub use self::joint_force::{calculate_joint_force, calculate_joint_forces, init_joint_force};
pub use self::skeleton::SkeletonContainer;
pub use self::solver_memory::SolverMemory;

mod game_mode;
mod island_solver;
mod jacobian;
mod jacobian_builder;
mod joint_force;
mod simulation_mode;
mod skeleton;
mod solver_memory;
