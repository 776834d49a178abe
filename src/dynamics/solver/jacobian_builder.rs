use super::{Jacobian, JacobianRow, JointInfo, SolverMemory};
use crate::dynamics::joint::{Constraint, ConstraintRows};
use crate::dynamics::{IntegrationParameters, RigidBody};
use crate::math::Real;
use crate::utils::inv;

/// Prepares the bodies of an island for a solve.
///
/// Bodies not in equilibrium get their damping applied and their world-space inertia refreshed.
/// Every body starts the solve resting if it was in equilibrium at the end of the last step.
fn init_bodies(bodies: &mut [RigidBody], memory: &mut SolverMemory, timestep: Real) {
    memory.reset_bodies(bodies.len());

    for (i, body) in bodies.iter_mut().enumerate().skip(1) {
        if !body.equilibrium {
            if timestep != 0.0 {
                body.apply_damping(timestep);
            }
            body.update_world_inertia();
        }

        body.resting = body.equilibrium;
        memory.initial_velocities[i] = Jacobian::new(body.linvel, body.angvel);
    }
}

/// Completes the rows of one joint with the mass properties of its bodies.
fn init_rows(
    rows: &mut [JacobianRow],
    constraint: &Constraint,
    body0: &RigidBody,
    body1: &RigidBody,
    psd_damp_tolerance: Real,
    force_scale: Real,
) {
    let ext0 = Jacobian::new(body0.accel, body0.alpha);
    let ext1 = Jacobian::new(body1.accel, body1.alpha);

    for row in rows {
        row.jminv.body0 = Jacobian::new(
            row.jt.body0.linear * body0.inv_mass,
            body0.world_inv_inertia * row.jt.body0.angular,
        );
        row.jminv.body1 = Jacobian::new(
            row.jt.body1.linear * body1.inv_mass,
            body1.world_inv_inertia * row.jt.body1.angular,
        );

        let diag = row.jminv.dot(&row.jt.body0, &row.jt.body1);
        let ext_accel = -row.jminv.dot(&ext0, &ext1) * force_scale;
        row.delta_accel = ext_accel;
        row.coordinate_accel += ext_accel;

        // Warm start from the force solved at the last step.
        row.force = constraint.feedback[row.feedback_slot].force * force_scale;
        row.max_impact = 0.0;

        let damp = psd_damp_tolerance * row.stiffness;
        row.diag_damp = diag * damp;
        row.inv_jminv_jt = inv(diag * (1.0 + damp));
        debug_assert!(row.inv_jminv_jt.is_finite());
    }
}

/// Builds the Jacobian rows of every joint of an island.
///
/// Body 0 must be the immovable sentinel. On exit, `memory.rows` holds the rows of all the
/// active joints, `memory.joint_infos` their layout, and `memory.initial_velocities` the body
/// velocities after damping. Impulsive solves (zero `timestep`) ignore the external forces and
/// do not warm start.
#[profiling::function]
pub fn build_jacobian_matrix(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    memory: &mut SolverMemory,
    timestep: Real,
) {
    debug_assert!(bodies.first().map_or(true, |b| !b.is_dynamic()));
    init_bodies(bodies, memory, timestep);

    let force_scale = if timestep > 0.0 { 1.0 } else { 0.0 };
    let bodies = &*bodies;
    memory.rows.clear();
    memory.joint_infos.clear();

    for constraint in constraints.iter_mut() {
        let (m0, m1) = (constraint.body0, constraint.body1);
        debug_assert!(m0 < bodies.len() && m1 < bodies.len());
        let (body0, body1) = (&bodies[m0], &bodies[m1]);
        let pair_start = memory.rows.len();

        if constraint.solver_active {
            let mut sink = ConstraintRows::new(&mut memory.rows, body0, body1);
            constraint
                .joint
                .jacobian_derivatives(body0, body1, timestep, &mut sink);
        }

        let pair_count = memory.rows.len() - pair_start;
        constraint.resize_feedback(pair_count);
        init_rows(
            &mut memory.rows[pair_start..],
            constraint,
            body0,
            body1,
            params.psd_damp_tolerance,
            force_scale,
        );

        memory.joint_infos.push(JointInfo {
            pair_start,
            pair_count,
            pair_active_count: pair_count,
            m0,
            m1,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::joint::{HingeJoint, JointForce};
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::{Isometry, Vector};
    use approx::assert_relative_eq;

    #[test]
    fn rows_are_regularized_and_warm_started() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic().mass(2.0).build(),
        ];
        bodies[1].accel = Vector::new(0.0, -19.6, 0.0);

        let hinge = HingeJoint::new(Isometry::identity(), Isometry::identity());
        let mut constraints = vec![Constraint::new(1, 0, hinge)];
        constraints[0].resize_feedback(5);
        constraints[0].feedback[1] = JointForce {
            force: 3.0,
            impact: 0.0,
        };

        let mut memory = SolverMemory::new();
        build_jacobian_matrix(
            &params,
            &mut bodies,
            &mut constraints,
            &mut memory,
            params.dt,
        );

        assert_eq!(memory.rows.len(), 5);
        assert_eq!(memory.joint_infos[0].pair_count, 5);
        assert_eq!(memory.rows[1].force, 3.0);

        // Second linear row is along `y`: the gravity of body 1 shows up in its acceleration.
        let row = &memory.rows[1];
        assert_relative_eq!(row.jt.body0.linear, Vector::y(), epsilon = 1.0e-6);
        assert_relative_eq!(row.coordinate_accel, 9.8, epsilon = 1.0e-4);
        assert_relative_eq!(row.diag_damp, 0.5 * params.psd_damp_tolerance, epsilon = 1.0e-8);
        assert_relative_eq!(
            row.inv_jminv_jt,
            1.0 / (0.5 * (1.0 + params.psd_damp_tolerance)),
            epsilon = 1.0e-4
        );
    }

    #[test]
    fn inactive_constraints_emit_no_rows() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![RigidBody::sentinel(), RigidBodyBuilder::dynamic().build()];
        let hinge = HingeJoint::new(Isometry::identity(), Isometry::identity());
        let mut constraints = vec![Constraint::new(1, 0, hinge)];
        constraints[0].solver_active = false;

        let mut memory = SolverMemory::new();
        build_jacobian_matrix(&params, &mut bodies, &mut constraints, &mut memory, 0.0);
        assert!(memory.rows.is_empty());
        assert_eq!(memory.joint_infos.len(), 1);
        assert!(constraints[0].feedback.is_empty());
    }
}
