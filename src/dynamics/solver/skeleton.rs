use super::{Jacobian, JacobianRow, JointInfo};
use crate::counters::SolverCounters;
use crate::linalg::LcpWorkspace;
use crate::math::Real;
use std::ops::Range;

/// Dense solver for an articulated chain of joints.
///
/// The rows of all the joints of the chain are solved together as a single boxed LCP on their
/// exact `J M^-1 J^T` matrix, instead of one joint at a time. This removes the slow convergence
/// of Gauss-Seidel iterations on long chains with large mass ratios.
///
/// The rows of a chain must be contiguous in the row arena, which is the case when its joints
/// are consecutive in the island.
#[derive(Clone, Debug, Default)]
pub struct SkeletonContainer {
    joints: Range<usize>,
    first_row: usize,
    size: usize,
    mass_matrix: Vec<Real>,
    row_bodies: Vec<(usize, usize)>,
    normal_rows: Vec<Option<usize>>,
    accel: Vec<Real>,
    delta_force: Vec<Real>,
    low: Vec<Real>,
    high: Vec<Real>,
}

impl SkeletonContainer {
    /// The range of the chain's joints in the island.
    pub fn joints(&self) -> Range<usize> {
        self.joints.clone()
    }

    /// The number of rows of the chain.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Assembles the regularized mass matrix of the rows of the given joints.
    ///
    /// Must be called after the rows have been built and before any call to
    /// [`Self::calculate_joint_force`].
    pub fn init_mass_matrix(
        &mut self,
        joints: Range<usize>,
        joint_infos: &[JointInfo],
        rows: &[JacobianRow],
    ) {
        self.joints = joints.clone();
        self.row_bodies.clear();
        self.normal_rows.clear();

        let infos = &joint_infos[joints];
        self.first_row = infos.first().map_or(0, |info| info.pair_start);

        for info in infos {
            debug_assert_eq!(info.pair_start, self.first_row + self.row_bodies.len());
            let joint_offset = info.pair_start - self.first_row;

            for row in &rows[info.rows()] {
                self.row_bodies.push((info.m0, info.m1));
                self.normal_rows
                    .push(row.normal_force_index.map(|i| joint_offset + i));
            }
        }

        let size = self.row_bodies.len();
        self.size = size;
        self.mass_matrix.clear();
        self.mass_matrix.resize(size * size, 0.0);
        self.accel.resize(size, 0.0);
        self.delta_force.resize(size, 0.0);
        self.low.resize(size, 0.0);
        self.high.resize(size, 0.0);

        let rows = &rows[self.first_row..self.first_row + size];

        for i in 0..size {
            let (i0, i1) = self.row_bodies[i];
            let row_i = &rows[i];

            for j in i..size {
                let (j0, j1) = self.row_bodies[j];
                let row_j = &rows[j];
                let mut coupling = 0.0;

                // Index 0 is the sentinel: it does not couple anything.
                for (bi, jminv) in [(i0, &row_i.jminv.body0), (i1, &row_i.jminv.body1)] {
                    if bi == 0 {
                        continue;
                    }
                    if bi == j0 {
                        coupling += jminv.dot(&row_j.jt.body0);
                    }
                    if bi == j1 {
                        coupling += jminv.dot(&row_j.jt.body1);
                    }
                }

                self.mass_matrix[i * size + j] = coupling;
                self.mass_matrix[j * size + i] = coupling;
            }

            self.mass_matrix[i * size + i] += row_i.diag_damp;
        }
    }

    /// Runs one exact solve of the chain's rows given the current forces of all the other rows.
    ///
    /// The residual accelerations are computed from the body force accumulators, then a
    /// partitioned Dantzig LCP is solved for the force corrections. If the dense solve fails,
    /// the forces are left unchanged and the failure is counted.
    ///
    /// Returns the largest residual acceleration before the solve.
    pub fn calculate_joint_force(
        &mut self,
        internal_forces: &mut [Jacobian],
        rows: &mut [JacobianRow],
        lcp: &mut LcpWorkspace<Real>,
        counters: &mut SolverCounters,
    ) -> Real {
        let size = self.size;
        if size == 0 {
            return 0.0;
        }

        let rows = &mut rows[self.first_row..self.first_row + size];
        let mut acc_norm: Real = 0.0;

        for k in 0..size {
            let (m0, m1) = self.row_bodies[k];
            let normal = self.normal_rows[k].map_or(1.0, |n| rows[n].force);
            let row = &rows[k];

            let a = row.coordinate_accel
                - row.force * row.diag_damp
                - row.jminv.dot(&internal_forces[m0], &internal_forces[m1]);
            acc_norm = acc_norm.max(a.abs());

            self.accel[k] = a;
            self.delta_force[k] = 0.0;
            self.low[k] = normal * row.lower_bound_friction_coefficient - row.force;
            self.high[k] = normal * row.upper_bound_friction_coefficient - row.force;
        }

        let result = lcp.solve_partition_dantzig_lcp(
            size,
            &self.mass_matrix,
            &mut self.delta_force,
            &mut self.accel,
            &self.low,
            &self.high,
        );

        if let Err(err) = result {
            log::warn!(
                "skeleton of {} rows left unsolved for this pass: {}",
                size,
                err
            );
            counters.lcp_failures += 1;
            return acc_norm;
        }

        for k in 0..size {
            let (m0, m1) = self.row_bodies[k];
            let row = &mut rows[k];
            let delta = self.delta_force[k];

            row.force += delta;
            row.max_impact = row.max_impact.max(row.force.abs());

            let (f0, f1) = (row.jt.body0 * delta, row.jt.body1 * delta);
            internal_forces[m0] += f0;
            internal_forces[m1] += f1;
        }

        acc_norm
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::solver::JacobianPair;
    use crate::math::Vector;
    use approx::assert_relative_eq;

    // Row along `y` between two unit-mass bodies (or one body and the sentinel).
    fn vertical_row(coordinate_accel: Real, sentinel_side: bool) -> JacobianRow {
        let up = Jacobian::new(Vector::y(), Vector::zeros());
        let down = Jacobian::new(-Vector::y(), Vector::zeros());
        let mut row = JacobianRow::new(JacobianPair::new(up, down));
        row.jminv = JacobianPair::new(
            up,
            if sentinel_side {
                Jacobian::zero()
            } else {
                down
            },
        );
        row.coordinate_accel = coordinate_accel;
        row
    }

    fn chain() -> (Vec<JointInfo>, Vec<JacobianRow>) {
        // Body 2 hangs from body 1, which hangs from the world.
        let infos = vec![
            JointInfo {
                pair_start: 0,
                pair_count: 1,
                pair_active_count: 1,
                m0: 1,
                m1: 0,
            },
            JointInfo {
                pair_start: 1,
                pair_count: 1,
                pair_active_count: 1,
                m0: 2,
                m1: 1,
            },
        ];
        let rows = vec![vertical_row(9.8, true), vertical_row(0.0, false)];
        (infos, rows)
    }

    #[test]
    fn mass_matrix_couples_rows_sharing_a_body() {
        let (infos, rows) = chain();
        let mut skeleton = SkeletonContainer::default();
        skeleton.init_mass_matrix(0..2, &infos, &rows);

        assert_eq!(skeleton.size(), 2);
        assert_relative_eq!(skeleton.mass_matrix[0], 1.0);
        assert_relative_eq!(skeleton.mass_matrix[1], -1.0);
        assert_relative_eq!(skeleton.mass_matrix[2], -1.0);
        assert_relative_eq!(skeleton.mass_matrix[3], 2.0);
    }

    #[test]
    fn chain_is_solved_in_a_single_pass() {
        let (infos, mut rows) = chain();
        let mut skeleton = SkeletonContainer::default();
        skeleton.init_mass_matrix(0..2, &infos, &rows);

        let mut internal_forces = vec![Jacobian::zero(); 3];
        let mut lcp = LcpWorkspace::new();
        let mut counters = SolverCounters::new();

        let acc = skeleton.calculate_joint_force(
            &mut internal_forces,
            &mut rows,
            &mut lcp,
            &mut counters,
        );
        assert_relative_eq!(acc, 9.8, epsilon = 1.0e-5);
        assert_eq!(counters.lcp_failures, 0);

        // Both rows now reach their target accelerations exactly.
        let acc = skeleton.calculate_joint_force(
            &mut internal_forces,
            &mut rows,
            &mut lcp,
            &mut counters,
        );
        assert!(acc < 1.0e-3);
        assert_relative_eq!(rows[0].force, 19.6, epsilon = 1.0e-3);
        assert_relative_eq!(rows[1].force, 9.8, epsilon = 1.0e-3);
    }
}
