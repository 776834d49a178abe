use super::joint_force::{accumulate_row_forces, calculate_joint_forces};
use super::{Jacobian, JacobianRow, JointInfo, SolverMemory};
use crate::counters::SolverCounters;
use crate::dynamics::joint::{Constraint, JointAccelerationDescriptor, JointForce};
use crate::dynamics::{IntegrationParameters, RigidBody};
use crate::math::{Real, Vector, CONSTRAINT_MAX_ROWS};

const LOCAL_PASSES: usize = 4;
const CLAMP_TOLERANCE: Real = 1.0e-5;

/// Solves the forces of an island with the exact, slower solver.
///
/// The forces are first refined joint by joint with [`calculate_joint_forces`]. The bounds of
/// friction rows are then frozen to the normal forces found, clamped rows are moved out of the
/// active set, and the remaining rows are solved together with projected conjugate-gradient
/// iterations. Finally the net forces are applied to the bodies over the whole `timestep`.
#[profiling::function]
pub(crate) fn calculate_forces_simulation_mode(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    memory: &mut SolverMemory,
    timestep: Real,
    counters: &mut SolverCounters,
) {
    let max_accel_norm = params.max_acceleration_error;
    let desc = JointAccelerationDescriptor {
        timestep,
        inv_timestep: if timestep != 0.0 { 1.0 / timestep } else { 0.0 },
        first_pass: true,
    };

    {
        let SolverMemory {
            rows, joint_infos, ..
        } = &mut *memory;
        for (constraint, info) in constraints.iter().zip(joint_infos.iter_mut()) {
            info.pair_active_count = info.pair_count;
            if info.pair_count > 0 {
                constraint.joint.joint_accelerations(
                    &desc,
                    &mut rows[info.rows()],
                    &bodies[info.m0],
                    &bodies[info.m1],
                );
            }
        }
    }

    memory.accumulate_row_forces(true);

    let SolverMemory {
        rows,
        internal_forces,
        joint_infos,
        ..
    } = &mut *memory;

    local_joint_passes(rows, joint_infos, internal_forces, max_accel_norm);
    freeze_friction_bounds(rows, joint_infos);
    accumulate_row_forces(rows, joint_infos, internal_forces, true, |row| row.force);
    let passes = global_passes(rows, joint_infos, internal_forces, max_accel_norm);
    counters.solver_passes += passes;

    apply_external_forces_and_acceleration(
        params,
        bodies,
        constraints,
        memory,
        timestep,
        max_accel_norm,
    );
}

/// Gauss-Seidel sweeps where each joint is solved exactly given the others.
///
/// The force change of each joint is only pushed to the body accumulators right before the
/// next joint is solved.
fn local_joint_passes(
    rows: &mut [JacobianRow],
    joint_infos: &[JointInfo],
    internal_forces: &mut [Jacobian],
    max_accel_norm: Real,
) {
    let mut force_step = [0.0; CONSTRAINT_MAX_ROWS];
    let mut prev_joint = 0;
    let mut acc_norm = max_accel_norm * 2.0;
    let mut pass = 0;

    while pass < LOCAL_PASSES && acc_norm > max_accel_norm {
        acc_norm = 0.0;

        for (curr_joint, info) in joint_infos.iter().enumerate() {
            let prev = &joint_infos[prev_joint];
            let mut y0 = Jacobian::zero();
            let mut y1 = Jacobian::zero();
            for (row, step) in rows[prev.rows()].iter().zip(force_step.iter()) {
                row.jt.accumulate(*step, &mut y0, &mut y1);
            }
            internal_forces[prev.m0] += y0;
            internal_forces[prev.m1] += y1;

            let f0 = internal_forces[info.m0];
            let f1 = internal_forces[info.m1];
            let joint_rows = &mut rows[info.rows()];
            for row in joint_rows.iter_mut() {
                row.accel =
                    row.coordinate_accel - row.force * row.diag_damp - row.jminv.dot(&f0, &f1);
            }

            let acc = calculate_joint_forces(joint_rows, &mut force_step, max_accel_norm);
            acc_norm = acc_norm.max(acc);
            prev_joint = curr_joint;
        }

        pass += 1;
    }
}

/// Turns friction coefficients into absolute bounds using the current normal forces, and
/// clamps every force into its bounds.
fn freeze_friction_bounds(rows: &mut [JacobianRow], joint_infos: &[JointInfo]) {
    for info in joint_infos {
        for k in info.rows() {
            let normal = rows[k]
                .normal_force_index
                .map_or(1.0, |i| rows[info.pair_start + i].force);
            let row = &mut rows[k];
            row.lower_bound_friction_coefficient *= normal;
            row.upper_bound_friction_coefficient *= normal;
            row.force = row
                .force
                .max(row.lower_bound_friction_coefficient)
                .min(row.upper_bound_friction_coefficient);
            row.normal_force_index = None;
        }
    }
}

/// Moves the rows flagged in `clamped` to the end of `rows`, and returns the number of rows
/// left in front.
fn partition_clamped_rows(rows: &mut [JacobianRow], clamped: &mut [bool]) -> usize {
    let mut i0 = 0;
    let mut i1 = rows.len();

    loop {
        while i0 < i1 && !clamped[i0] {
            i0 += 1;
        }
        while i0 < i1 && clamped[i1 - 1] {
            i1 -= 1;
        }
        if i0 + 1 < i1 {
            rows.swap(i0, i1 - 1);
            clamped.swap(i0, i1 - 1);
            i0 += 1;
            i1 -= 1;
        } else {
            return i0;
        }
    }
}

/// Residual acceleration of a row given the body force accumulators.
#[inline]
fn row_residual(row: &JacobianRow, internal_forces: &[Jacobian], info: &JointInfo) -> Real {
    row.coordinate_accel
        - row.force * row.diag_damp
        - row
            .jminv
            .dot(&internal_forces[info.m0], &internal_forces[info.m1])
}

/// Projected conjugate-gradient iterations over the active rows of every joint.
///
/// Returns the number of iterations performed.
fn global_passes(
    rows: &mut [JacobianRow],
    joint_infos: &mut [JointInfo],
    internal_forces: &mut [Jacobian],
    max_accel_norm: Real,
) -> usize {
    let mut clamped = [false; CONSTRAINT_MAX_ROWS];
    let mut force_rows = 0;
    let mut ak_num: Real = 0.0;
    let mut acc_norm: Real = 0.0;

    for info in joint_infos.iter_mut() {
        let joint_rows = &mut rows[info.rows()];
        let mut active_count = 0;

        for (k, row) in joint_rows.iter_mut().enumerate() {
            row.accel = row_residual(row, internal_forces, info);
            let at_lower = (row.lower_bound_friction_coefficient - row.force).abs()
                < CLAMP_TOLERANCE
                && row.accel < 0.0;
            let at_upper = (row.upper_bound_friction_coefficient - row.force).abs()
                < CLAMP_TOLERANCE
                && row.accel > 0.0;
            clamped[k] = at_lower || at_upper;
            if !clamped[k] {
                active_count += 1;
            }
        }

        if active_count < info.pair_count {
            let active = partition_clamped_rows(joint_rows, &mut clamped[..info.pair_count]);
            debug_assert_eq!(active, active_count);
        }
        info.pair_active_count = active_count;
        force_rows += active_count;

        for row in &mut rows[info.active_rows()] {
            row.delta_force = row.accel * row.inv_jminv_jt;
            ak_num += row.accel * row.delta_force;
            acc_norm = acc_norm.max(row.accel.abs());
        }
    }

    let mut max_passes = force_rows;
    let mut pass = 0;
    let mut total_passes = 0;

    while pass < max_passes && acc_norm > max_accel_norm {
        total_passes += 1;

        // The body accumulators are reused for the forces of the search direction.
        let mut ak_den: Real = 0.0;
        accumulate_row_forces(rows, joint_infos, internal_forces, true, |row| {
            row.delta_force
        });

        for info in joint_infos.iter() {
            let (f0, f1) = (internal_forces[info.m0], internal_forces[info.m1]);
            for row in &mut rows[info.active_rows()] {
                row.delta_accel = row.jminv.dot(&f0, &f1) + row.delta_force * row.diag_damp;
                ak_den += row.delta_accel * row.delta_force;
            }
        }

        let ak_den = ak_den.max(1.0e-16);
        let mut ak = ak_num / ak_den;
        let mut clamp = None;
        let mut clamped_value = 0.0;

        for (joint, info) in joint_infos.iter().enumerate() {
            if ak <= 1.0e-8 {
                break;
            }
            for k in info.active_rows() {
                let row = &rows[k];
                let val = row.force + ak * row.delta_force;
                if row.delta_force < -1.0e-16 && val < row.lower_bound_friction_coefficient {
                    ak = ((row.lower_bound_friction_coefficient - row.force) / row.delta_force)
                        .max(0.0);
                    clamp = Some((joint, k - info.pair_start));
                    clamped_value = row.lower_bound_friction_coefficient;
                } else if row.delta_force > 1.0e-16 && val > row.upper_bound_friction_coefficient
                {
                    ak = ((row.upper_bound_friction_coefficient - row.force) / row.delta_force)
                        .max(0.0);
                    clamp = Some((joint, k - info.pair_start));
                    clamped_value = row.upper_bound_friction_coefficient;
                }
            }
        }

        if let Some((joint, local_row)) = clamp {
            // Step up to the first bound hit, then remove the clamped row from the active set.
            for info in joint_infos.iter() {
                for row in &mut rows[info.active_rows()] {
                    row.force += ak * row.delta_force;
                    row.accel -= ak * row.delta_accel;
                }
            }

            let info = &mut joint_infos[joint];
            let last = info.pair_active_count - 1;
            let joint_rows = &mut rows[info.rows()];
            joint_rows[local_row].force = clamped_value;
            joint_rows.swap(local_row, last);

            let mut active_count = 0;
            for (k, row) in joint_rows[..last].iter().enumerate() {
                let at_lower = row.lower_bound_friction_coefficient - row.force > -CLAMP_TOLERANCE
                    && row.accel < 0.0;
                let at_upper = row.upper_bound_friction_coefficient - row.force < CLAMP_TOLERANCE
                    && row.accel > 0.0;
                clamped[k] = at_lower || at_upper;
                if !clamped[k] {
                    active_count += 1;
                }
            }
            let active = partition_clamped_rows(&mut joint_rows[..last], &mut clamped[..last]);
            debug_assert_eq!(active, active_count);
            info.pair_active_count = active_count;

            force_rows = 0;
            ak_num = 0.0;
            acc_norm = 0.0;
            for info in joint_infos.iter() {
                force_rows += info.pair_active_count;
                for row in &mut rows[info.active_rows()] {
                    row.delta_force = row.accel * row.inv_jminv_jt;
                    ak_num += row.delta_force * row.accel;
                    acc_norm = acc_norm.max(row.accel.abs());
                }
            }

            pass = 0;
            max_passes = force_rows;
        } else {
            acc_norm = 0.0;
            for info in joint_infos.iter() {
                for row in &mut rows[info.active_rows()] {
                    row.force += ak * row.delta_force;
                    row.accel -= ak * row.delta_accel;
                    acc_norm = acc_norm.max(row.accel.abs());
                    debug_assert!(row.force.is_finite() && row.accel.is_finite());
                }
            }

            if acc_norm > max_accel_norm {
                let ak_den = ak_num.max(1.0e-17);
                ak_num = 0.0;
                for info in joint_infos.iter() {
                    for row in &mut rows[info.active_rows()] {
                        row.delta_accel = row.accel * row.inv_jminv_jt;
                        ak_num += row.accel * row.delta_accel;
                    }
                }

                let beta = ak_num / ak_den;
                for info in joint_infos.iter() {
                    for row in &mut rows[info.active_rows()] {
                        row.delta_force = row.delta_accel + beta * row.delta_force;
                    }
                }
            }

            pass += 1;
        }
    }

    total_passes
}

/// Applies the external and constraint forces of an island to its bodies over `timestep`.
///
/// The constraint forces of every row are written to the feedback of their joint. Net body
/// accelerations with a squared norm below `max_accel_norm^2` are discarded. With a zero
/// `timestep`, the constraint forces are applied as impulses instead.
pub(crate) fn apply_external_forces_and_acceleration(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    constraints: &mut [Constraint],
    memory: &mut SolverMemory,
    timestep: Real,
    max_accel_norm: Real,
) {
    let SolverMemory {
        rows,
        internal_forces,
        joint_infos,
        ..
    } = memory;

    internal_forces.resize(bodies.len(), Jacobian::zero());
    accumulate_row_forces(rows, joint_infos, internal_forces, false, |row| row.force);

    for (constraint, info) in constraints.iter_mut().zip(joint_infos.iter()) {
        for row in &rows[info.rows()] {
            constraint.feedback[row.feedback_slot] = JointForce {
                force: row.force,
                impact: row.force.abs() * timestep,
            };
        }
    }

    let max_accel2 = max_accel_norm * max_accel_norm;

    if timestep > 0.0 {
        let dt2 = timestep * timestep;

        for (body, internal) in bodies.iter_mut().zip(internal_forces.iter()).skip(1) {
            if !body.is_dynamic() {
                continue;
            }

            let force = body.accel + internal.linear;
            let torque = body.alpha + internal.angular;

            let mut accel = force * body.inv_mass;
            let mut net_force = force;
            if accel.norm_squared() < max_accel2 {
                accel = Vector::zeros();
                net_force = Vector::zeros();
            }

            let mut alpha = body.world_inv_inertia * torque;
            let mut net_torque = torque;
            if alpha.norm_squared() < max_accel2 {
                alpha = Vector::zeros();
                net_torque = Vector::zeros();
            }

            body.net_force = net_force;
            body.net_torque = net_torque;
            body.accel = accel;
            body.alpha = alpha;

            body.linvel += accel * timestep;
            // Full-step angular update plus the second order gyroscopic term.
            let correction = alpha.cross(&body.angvel) * (dt2 * params.euler_taylor_correction);
            body.angvel += alpha * timestep + correction;
        }
    } else {
        for (body, internal) in bodies.iter_mut().zip(internal_forces.iter()).skip(1) {
            body.linvel += internal.linear * body.inv_mass;
            body.angvel += body.world_inv_inertia * internal.angular;
            body.net_force = Vector::zeros();
            body.net_torque = Vector::zeros();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::joint::{ContactJoint, ContactPoint};
    use crate::dynamics::solver::{build_jacobian_matrix, JacobianPair};
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::{Point, MAX_BOUND};
    use approx::assert_relative_eq;

    fn bounded_row(force: Real, lower: Real, upper: Real) -> JacobianRow {
        let mut row = JacobianRow::new(JacobianPair::default());
        row.force = force;
        row.lower_bound_friction_coefficient = lower;
        row.upper_bound_friction_coefficient = upper;
        row
    }

    #[test]
    fn friction_bounds_are_frozen_to_the_normal_force() {
        // A single-row joint, then a contact whose friction row refers to its normal row.
        let mut rows = vec![
            bounded_row(3.0, -1.0, 1.0),
            bounded_row(10.0, 0.0, MAX_BOUND),
            bounded_row(7.0, -0.5, 0.5),
        ];
        rows[2].normal_force_index = Some(0);
        let joint_infos = [
            JointInfo {
                pair_start: 0,
                pair_count: 1,
                pair_active_count: 1,
                m0: 1,
                m1: 0,
            },
            JointInfo {
                pair_start: 1,
                pair_count: 2,
                pair_active_count: 2,
                m0: 1,
                m1: 0,
            },
        ];

        freeze_friction_bounds(&mut rows, &joint_infos);

        assert_eq!(rows[0].force, 1.0);
        assert_eq!(rows[1].force, 10.0);
        assert_eq!(rows[1].upper_bound_friction_coefficient, MAX_BOUND);
        assert_eq!(rows[2].lower_bound_friction_coefficient, -5.0);
        assert_eq!(rows[2].upper_bound_friction_coefficient, 5.0);
        assert_eq!(rows[2].force, 5.0);
        assert!(rows.iter().all(|r| r.normal_force_index.is_none()));
    }

    #[test]
    fn sliding_contact_respects_the_friction_cone() {
        let params = IntegrationParameters::simulation();
        let friction = 0.5;
        let mut bodies = vec![RigidBody::sentinel(), RigidBodyBuilder::dynamic().build()];
        // Weight, and a sideways push stronger than the friction can hold.
        bodies[1].accel = Vector::new(20.0, -9.8, 0.0);

        let mut contact = ContactJoint::new(friction, 0.0);
        contact.push_point(ContactPoint {
            point: Point::new(0.0, -0.5, 0.0),
            normal: Vector::y(),
            depth: 0.0,
        });
        let mut constraints = vec![Constraint::new(1, 0, contact)];

        let mut memory = SolverMemory::new();
        let mut counters = SolverCounters::default();
        build_jacobian_matrix(
            &params,
            &mut bodies,
            &mut constraints,
            &mut memory,
            params.dt,
        );
        calculate_forces_simulation_mode(
            &params,
            &mut bodies,
            &mut constraints,
            &mut memory,
            params.dt,
            &mut counters,
        );

        let feedback = &constraints[0].feedback;
        let normal = feedback[0].force;
        assert_relative_eq!(normal, 9.8, epsilon = 0.1);
        for tangent in &feedback[1..] {
            assert!(tangent.force.abs() <= friction * normal + 1.0e-3);
        }

        // The clamped friction rows sit at the tail of the joint block, on one of their bounds.
        let info = &memory.joint_infos[0];
        assert!(info.pair_active_count < info.pair_count);
        for row in &memory.rows[info.active_rows().end..info.rows().end] {
            let at_lower = (row.force - row.lower_bound_friction_coefficient).abs() < 1.0e-4;
            let at_upper = (row.force - row.upper_bound_friction_coefficient).abs() < 1.0e-4;
            assert!(at_lower || at_upper);
        }

        // The contact holds within the acceleration tolerance while the body slides.
        assert!(bodies[1].linvel.y.abs() <= params.max_acceleration_error * params.dt + 1.0e-4);
        assert!(bodies[1].linvel.x > 0.0);
    }

    #[test]
    fn angular_update_covers_the_full_step() {
        let params = IntegrationParameters::simulation();
        let dt = params.dt;
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .angvel(Vector::new(0.0, 0.0, 1.0))
                .build(),
        ];
        bodies[1].alpha = Vector::new(1.0, 0.0, 0.0);

        let mut memory = SolverMemory::new();
        apply_external_forces_and_acceleration(
            &params,
            &mut bodies,
            &mut [],
            &mut memory,
            dt,
            0.0,
        );

        // alpha * dt, plus (alpha x omega) * dt^2 / 12.
        let expected = Vector::new(dt, -dt * dt / 12.0, 1.0);
        assert_relative_eq!(bodies[1].angvel, expected, epsilon = 1.0e-7);
        assert_eq!(bodies[1].net_torque, Vector::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn clamped_rows_are_moved_to_the_tail() {
        let mut rows: Vec<_> = (0..5)
            .map(|i| {
                let mut row = JacobianRow::new(JacobianPair::default());
                row.feedback_slot = i;
                row
            })
            .collect();
        let mut clamped = [true, false, true, false, false];

        let active = partition_clamped_rows(&mut rows, &mut clamped);
        assert_eq!(active, 3);
        assert_eq!(clamped, [false, false, false, true, true]);

        let mut front: Vec<_> = rows[..3].iter().map(|r| r.feedback_slot).collect();
        front.sort_unstable();
        assert_eq!(front, vec![1, 3, 4]);
    }

    #[test]
    fn partition_without_clamped_rows_keeps_everything() {
        let mut rows = vec![JacobianRow::new(JacobianPair::default()); 3];
        let mut clamped = [false; 3];
        assert_eq!(partition_clamped_rows(&mut rows, &mut clamped), 3);
        let mut clamped = [true; 3];
        assert_eq!(partition_clamped_rows(&mut rows, &mut clamped), 0);
    }
}
