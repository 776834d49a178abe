use super::joint_force::accumulate_row_forces;
use super::{Jacobian, JacobianRow, JointInfo, SkeletonContainer};
use crate::linalg::LcpWorkspace;
use crate::math::Real;

/// Scratch buffers used to solve one island.
///
/// The buffers are cleared, never shrunk, between solves: once warmed up on the largest island
/// they are assigned to, solving does not allocate anymore.
#[derive(Default)]
pub struct SolverMemory {
    /// The Jacobian rows of all the joints of the island.
    pub rows: Vec<JacobianRow>,
    /// Force and torque accumulated on each body by the constraint rows.
    pub internal_forces: Vec<Jacobian>,
    /// The row range and bodies of each joint of the island.
    pub joint_infos: Vec<JointInfo>,
    /// Velocities of the bodies at the beginning of the step.
    pub initial_velocities: Vec<Jacobian>,
    /// Dense solvers of the skeleton chains of the island.
    pub skeletons: Vec<SkeletonContainer>,
    /// Workspace of the dense LCP solves.
    pub lcp: LcpWorkspace<Real>,
}

impl SolverMemory {
    /// Creates empty solver buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-body buffers and resizes them for `body_count` bodies.
    pub fn reset_bodies(&mut self, body_count: usize) {
        self.internal_forces.clear();
        self.internal_forces.resize(body_count, Jacobian::zero());
        self.initial_velocities.clear();
        self.initial_velocities.resize(body_count, Jacobian::zero());
    }

    /// Recomputes the force accumulators from the current row forces.
    ///
    /// Only the active rows of each joint are taken into account if `active_only` is set.
    pub fn accumulate_row_forces(&mut self, active_only: bool) {
        accumulate_row_forces(
            &self.rows,
            &self.joint_infos,
            &mut self.internal_forces,
            active_only,
            |row| row.force,
        );
    }
}
