use super::joint_force::calculate_joint_force;
use super::{Jacobian, SolverMemory};
use crate::counters::SolverCounters;
use crate::dynamics::joint::{Constraint, JointAccelerationDescriptor, JointForce};
use crate::dynamics::{IntegrationParameters, RigidBody};
use crate::math::{Real, Vector};

const RK_ORDER: usize = 4;

/// Solves the forces of an island with warm-started Gauss-Seidel passes, integrating the body
/// velocities over four Runge-Kutta sub-steps.
///
/// `skeletons` holds the joint count of each chain solved by a dense [`super::SkeletonContainer`].
/// Chains occupy the tail of `constraints`, in order. The rows must have been built for
/// `timestep` beforehand.
///
/// A zero `timestep` solves impulses instead: the sub-steps only add solver passes, and the
/// impulses are applied as velocity changes once they are all done.
#[profiling::function]
pub(crate) fn calculate_forces_game_mode(
    params: &IntegrationParameters,
    passes: usize,
    skeletons: &[usize],
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    memory: &mut SolverMemory,
    timestep: Real,
    counters: &mut SolverCounters,
) {
    memory.accumulate_row_forces(false);

    let SolverMemory {
        rows,
        internal_forces,
        joint_infos,
        initial_velocities,
        skeletons: containers,
        lcp,
    } = memory;

    let chained: usize = skeletons.iter().sum();
    let base_count = joint_infos.len().saturating_sub(chained);
    containers.resize_with(skeletons.len(), Default::default);

    let mut start = base_count;
    for (container, count) in containers.iter_mut().zip(skeletons.iter()) {
        container.init_mass_matrix(start..start + count, joint_infos, rows);
        start += count;
    }

    let timestep_rk = timestep / RK_ORDER as Real;
    let inv_timestep_rk = if timestep_rk != 0.0 {
        1.0 / timestep_rk
    } else {
        0.0
    };
    let speed_freeze2 = params.freeze_speed2 * 0.1;
    let force_active = joint_infos.len() <= params.small_island_count;
    let max_accel_error = params.max_acceleration_error;

    for step in 0..RK_ORDER {
        let desc = JointAccelerationDescriptor {
            timestep: timestep_rk,
            inv_timestep: inv_timestep_rk,
            first_pass: step == 0,
        };

        // Impulsive sub-steps do not move the bodies, their rows are built once.
        let refresh = desc.first_pass || timestep_rk != 0.0;
        for (constraint, info) in constraints.iter().zip(joint_infos.iter()) {
            let (b0, b1) = (&bodies[info.m0], &bodies[info.m1]);
            if !refresh || info.pair_count == 0 || (!desc.first_pass && b0.resting && b1.resting)
            {
                continue;
            }
            constraint
                .joint
                .joint_accelerations(&desc, &mut rows[info.rows()], b0, b1);
        }

        let mut acc_norm = max_accel_error * 2.0;
        let mut pass = 0;
        while pass < passes && acc_norm > max_accel_error {
            acc_norm = 0.0;
            for info in &joint_infos[..base_count] {
                let acc = calculate_joint_force(info, bodies, internal_forces, rows);
                acc_norm = acc_norm.max(acc);
            }
            for container in containers.iter_mut() {
                let acc = container.calculate_joint_force(internal_forces, rows, lcp, counters);
                acc_norm = acc_norm.max(acc);
            }
            pass += 1;
        }
        counters.solver_passes += pass;
        log::trace!(
            "sub-step {}: {} solver passes, residual acceleration {}",
            step,
            pass,
            acc_norm
        );

        // `internal_forces` holds the total impulse, applied once after the last sub-step.
        if timestep_rk != 0.0 {
            apply_net_velocity(
                bodies,
                internal_forces,
                timestep_rk,
                speed_freeze2,
                force_active,
            );
        }
    }

    if timestep != 0.0 {
        for (constraint, info) in constraints.iter_mut().zip(joint_infos.iter()) {
            for row in &rows[info.rows()] {
                constraint.feedback[row.feedback_slot] = JointForce {
                    force: row.force,
                    impact: row.max_impact * timestep_rk,
                };
            }
        }

        apply_net_torque_and_force(
            params,
            bodies,
            initial_velocities,
            timestep,
            force_active,
        );
    } else {
        for (body, impulse) in bodies.iter_mut().zip(internal_forces.iter()).skip(1) {
            body.linvel += impulse.linear * body.inv_mass;
            body.angvel += body.world_inv_inertia * impulse.angular;
            body.net_force = Vector::zeros();
            body.net_torque = Vector::zeros();
        }
    }
}

/// Integrates the body velocities over one sub-step from the external and constraint forces.
///
/// Resting bodies are not moved, but are woken up if the sub-step would change their velocity
/// noticeably.
fn apply_net_velocity(
    bodies: &mut [RigidBody],
    internal_forces: &[Jacobian],
    timestep: Real,
    speed_freeze2: Real,
    force_active: bool,
) {
    for (body, internal) in bodies.iter_mut().zip(internal_forces.iter()).skip(1) {
        let force = internal.linear + body.accel;
        let torque = internal.angular + body.alpha;
        let vel_step = force * (body.inv_mass * timestep);
        let omega_step = body.world_inv_inertia * torque * timestep;

        if !body.resting {
            body.linvel += vel_step;
            body.angvel += omega_step;
        } else if vel_step.norm_squared() > speed_freeze2
            || omega_step.norm_squared() > speed_freeze2
            || force_active
        {
            body.resting = false;
        }
    }
}

/// Recovers the net accelerations of the bodies from their velocity change over the step.
fn apply_net_torque_and_force(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    initial_velocities: &[Jacobian],
    timestep: Real,
    force_active: bool,
) {
    let inv_timestep = 1.0 / timestep;
    let max_accel2 = params.max_acceleration_error * params.max_acceleration_error;

    for (body, v0) in bodies.iter_mut().zip(initial_velocities.iter()).skip(1) {
        let mut accel = (body.linvel - v0.linear) * inv_timestep;
        let mut alpha = (body.angvel - v0.angular) * inv_timestep;

        if accel.norm_squared() <= max_accel2
            && alpha.norm_squared() <= max_accel2
            && !force_active
        {
            accel = Vector::zeros();
            alpha = Vector::zeros();
        }

        if body.is_dynamic() {
            body.accel = accel;
            body.alpha = alpha;
        }
        body.net_force = accel * body.mass;
        body.net_torque = body.torque_for_angular_acceleration(&alpha);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::joint::{ContactJoint, ContactPoint, HingeJoint};
    use crate::dynamics::solver::build_jacobian_matrix;
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::{Isometry, Point};
    use approx::assert_relative_eq;

    // A unit mass body pinned to the sentinel at its center, pulled down by gravity.
    fn pinned_body() -> (Vec<RigidBody>, Vec<Constraint>) {
        let mut bodies = vec![RigidBody::sentinel(), RigidBodyBuilder::dynamic().build()];
        bodies[1].accel = Vector::new(0.0, -9.8, 0.0);
        let hinge = HingeJoint::new(Isometry::identity(), Isometry::identity());
        (bodies, vec![Constraint::new(1, 0, hinge)])
    }

    fn solve(
        params: &IntegrationParameters,
        passes: usize,
        bodies: &mut [RigidBody],
        constraints: &mut [Constraint],
        timestep: Real,
    ) -> (SolverMemory, SolverCounters) {
        let mut memory = SolverMemory::new();
        let mut counters = SolverCounters::default();
        build_jacobian_matrix(params, bodies, constraints, &mut memory, timestep);
        calculate_forces_game_mode(
            params,
            passes,
            &[],
            bodies,
            constraints,
            &mut memory,
            timestep,
            &mut counters,
        );
        (memory, counters)
    }

    #[test]
    fn pinned_body_holds_still_with_early_exit() {
        let params = IntegrationParameters::default();
        let passes = 8;
        let (mut bodies, mut constraints) = pinned_body();
        let (_, counters) = solve(&params, passes, &mut bodies, &mut constraints, params.dt);

        assert_relative_eq!(bodies[1].linvel, Vector::zeros(), epsilon = 1.0e-2);
        // At least one pass per sub-step, and the residual converges before the pass budget.
        assert!(counters.solver_passes >= RK_ORDER);
        assert!(counters.solver_passes < RK_ORDER * passes);
    }

    #[test]
    fn feedback_impact_covers_one_sub_step() {
        let params = IntegrationParameters::default();
        let (mut bodies, mut constraints) = pinned_body();
        let (memory, _) = solve(&params, 4, &mut bodies, &mut constraints, params.dt);

        let feedback = &constraints[0].feedback;
        assert_eq!(feedback.len(), memory.rows.len());
        for row in &memory.rows {
            let slot = &feedback[row.feedback_slot];
            assert_eq!(slot.force, row.force);
            assert_relative_eq!(
                slot.impact,
                row.max_impact * params.dt / 4.0,
                max_relative = 1.0e-6
            );
        }
        // The vertical row carries the weight of the body.
        assert_relative_eq!(feedback[1].force, 9.8, epsilon = 0.1);
    }

    #[test]
    fn impulses_use_every_sub_step_and_apply_once() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(0.0, -1.0, 0.0))
                .build(),
        ];
        let mut contact = ContactJoint::new(0.5, 0.0);
        contact.push_point(ContactPoint {
            point: Point::new(0.0, -0.5, 0.0),
            normal: Vector::y(),
            depth: 0.0,
        });
        let mut constraints = vec![Constraint::new(1, 0, contact)];

        let (_, counters) = solve(&params, 4, &mut bodies, &mut constraints, 0.0);

        assert!(counters.solver_passes >= RK_ORDER);
        // The approach speed is cancelled, not reversed.
        assert_relative_eq!(bodies[1].linvel, Vector::zeros(), epsilon = 1.0e-3);
        assert_eq!(bodies[1].net_force, Vector::zeros());
        // Impulsive solves leave the feedback untouched.
        assert!(constraints[0].feedback.iter().all(|f| f.force == 0.0));
    }
}
