use super::{Jacobian, JacobianRow, JointInfo};
use crate::dynamics::RigidBody;
use crate::math::{Real, CONSTRAINT_MAX_ROWS};

/// The force and torque applied on each body of a joint by the current forces of its rows.
pub fn init_joint_force(rows: &[JacobianRow]) -> (Jacobian, Jacobian) {
    let mut force0 = Jacobian::zero();
    let mut force1 = Jacobian::zero();

    for row in rows {
        debug_assert!(row.force.is_finite());
        row.jt.accumulate(row.force, &mut force0, &mut force1);
    }

    (force0, force1)
}

/// Adds the force applied by the given rows on each body to the body force accumulators.
///
/// The force of each row is read with `force`.
pub(crate) fn accumulate_row_forces(
    rows: &[JacobianRow],
    joint_infos: &[JointInfo],
    internal_forces: &mut [Jacobian],
    active_only: bool,
    force: impl Fn(&JacobianRow) -> Real,
) {
    internal_forces
        .iter_mut()
        .for_each(|f| *f = Jacobian::zero());

    for info in joint_infos {
        let range = if active_only {
            info.active_rows()
        } else {
            info.rows()
        };
        let mut y0 = Jacobian::zero();
        let mut y1 = Jacobian::zero();

        for row in &rows[range] {
            row.jt.accumulate(force(row), &mut y0, &mut y1);
        }

        internal_forces[info.m0] += y0;
        internal_forces[info.m1] += y1;
    }
}

/// Projected Gauss-Seidel iterations on the rows of a single joint.
///
/// Each row force is corrected from the residual acceleration implied by the current body
/// force accumulators, then clamped to its bounds. Friction bounds are scaled by the force
/// solved for their normal row during the same sweep. At most four sweeps are performed, until
/// no row moves by more than a unit acceleration.
///
/// Joints whose two bodies are resting are skipped. Returns the largest residual acceleration
/// of the first sweep.
pub fn calculate_joint_force(
    info: &JointInfo,
    bodies: &[RigidBody],
    internal_forces: &mut [Jacobian],
    rows: &mut [JacobianRow],
) -> Real {
    let (m0, m1) = (info.m0, info.m1);
    if info.pair_count == 0 || (bodies[m0].resting && bodies[m1].resting) {
        return 0.0;
    }

    let rows = &mut rows[info.rows()];
    let mut force0 = internal_forces[m0];
    let mut force1 = internal_forces[m1];
    let mut normal_force = [0.0; CONSTRAINT_MAX_ROWS];

    let mut acc_norm: Real = 0.0;
    let mut max_accel: Real = 3.0;
    let mut first_sweep = true;
    let mut sweep = 0;

    while sweep < 4 && max_accel > 1.0 {
        max_accel = 0.0;

        for (k, row) in rows.iter_mut().enumerate() {
            let mut a = row.coordinate_accel
                - row.force * row.diag_damp
                - row.jminv.dot(&force0, &force1);
            let f = row.force + row.inv_jminv_jt * a;

            let normal = row.normal_force_index.map_or(1.0, |i| {
                debug_assert!(i < k && normal_force[i] >= 0.0);
                normal_force[i]
            });
            let lower = normal * row.lower_bound_friction_coefficient;
            let upper = normal * row.upper_bound_friction_coefficient;

            if f > upper || f < lower {
                a = 0.0;
            }
            let f = f.max(lower).min(upper);

            max_accel = max_accel.max(a.abs());
            if first_sweep {
                acc_norm = acc_norm.max(max_accel);
            }

            let delta = f - row.force;
            row.force = f;
            normal_force[k] = f;
            row.max_impact = row.max_impact.max(f.abs());
            row.jt.accumulate(delta, &mut force0, &mut force1);
        }

        first_sweep = false;
        sweep += 1;
    }

    internal_forces[m0] = force0;
    internal_forces[m1] = force1;
    acc_norm
}

/// Exact refinement of the forces of a single joint, with the other joints held fixed.
///
/// This is a projected conjugate-gradient iteration on the joint's rows, using `row.accel` as
/// the initial residual. Whenever a step would push a row past one of its bounds, the step is
/// shortened, the row is clamped and removed from the search, and the iteration restarts.
///
/// On exit, `force_step` holds the change of force of each row. Returns the largest residual
/// acceleration of the free rows on entry.
pub fn calculate_joint_forces(
    rows: &mut [JacobianRow],
    force_step: &mut [Real],
    max_acc_norm: Real,
) -> Real {
    let count = rows.len();
    let mut delta_accel = [0.0; CONSTRAINT_MAX_ROWS];
    let mut delta_force = [0.0; CONSTRAINT_MAX_ROWS];
    let mut active: [Real; CONSTRAINT_MAX_ROWS] = [0.0; CONSTRAINT_MAX_ROWS];
    let mut low = [0.0; CONSTRAINT_MAX_ROWS];
    let mut high = [0.0; CONSTRAINT_MAX_ROWS];

    let mut max_passes = count;
    let mut ak_num: Real = 0.0;
    let mut acc_norm: Real = 0.0;

    for j in 0..count {
        let normal = rows[j].normal_force_index.map_or(1.0, |i| rows[i].force);
        let row = &mut rows[j];
        low[j] = normal * row.lower_bound_friction_coefficient;
        high[j] = normal * row.upper_bound_friction_coefficient;

        active[j] = 1.0;
        force_step[j] = row.force;
        if row.force < low[j] {
            max_passes -= 1;
            row.force = low[j];
            active[j] = 0.0;
        } else if row.force > high[j] {
            max_passes -= 1;
            row.force = high[j];
            active[j] = 0.0;
        }

        delta_force[j] = row.accel * row.inv_jminv_jt * active[j];
        ak_num += row.accel * delta_force[j];
        acc_norm = acc_norm.max((row.accel * active[j]).abs());
    }

    let ret_accel = acc_norm;
    let mut clamped_value = 0.0;
    let mut pass = 0;

    while pass < max_passes && acc_norm > max_acc_norm {
        let mut y0 = Jacobian::zero();
        let mut y1 = Jacobian::zero();
        for j in 0..count {
            rows[j].jt.accumulate(delta_force[j], &mut y0, &mut y1);
        }

        let mut ak_den: Real = 0.0;
        for j in 0..count {
            let row = &rows[j];
            delta_accel[j] = row.jminv.dot(&y0, &y1) + delta_force[j] * row.diag_damp;
            ak_den += delta_accel[j] * delta_force[j];
        }
        let ak_den = ak_den.max(1.0e-16);
        let mut ak = ak_num / ak_den;

        let mut clamped = None;
        for j in 0..count {
            if active[j] == 0.0 {
                continue;
            }

            let force = rows[j].force;
            let bound = if delta_force[j] < -1.0e-16 {
                Some(low[j]).filter(|lo| force + ak * delta_force[j] < *lo)
            } else if delta_force[j] > 1.0e-16 {
                Some(high[j]).filter(|hi| force + ak * delta_force[j] > *hi)
            } else {
                None
            };

            if let Some(bound) = bound {
                ak = ((bound - force) / delta_force[j]).max(0.0);
                clamped = Some(j);
                clamped_value = bound;
                if ak < 1.0e-8 {
                    ak = 0.0;
                    break;
                }
            }
        }

        match clamped {
            Some(c) if ak == 0.0 => {
                // The clamped row cannot move at all: freeze it and restart from the current
                // forces.
                ak_num = 0.0;
                acc_norm = 0.0;
                active[c] = 0.0;
                delta_force[c] = 0.0;
                rows[c].force = clamped_value;

                for j in 0..count {
                    if active[j] == 0.0 {
                        continue;
                    }

                    let row = &mut rows[j];
                    if (low[j] - row.force).abs() < 1.0e-5 && row.accel < 0.0 {
                        row.force = low[j];
                        active[j] = 0.0;
                        delta_force[j] = 0.0;
                    } else if (high[j] - row.force).abs() < 1.0e-5 && row.accel > 0.0 {
                        row.force = high[j];
                        active[j] = 0.0;
                        delta_force[j] = 0.0;
                    } else {
                        delta_force[j] = row.accel * row.inv_jminv_jt;
                        ak_num += row.accel * delta_force[j];
                        acc_norm = acc_norm.max(row.accel.abs());
                    }
                }

                pass = 0;
                max_passes = max_passes.saturating_sub(1).max(1);
            }
            Some(c) => {
                // Partial step up to the bound of the clamped row.
                ak_num = 0.0;
                acc_norm = 0.0;
                active[c] = 0.0;

                for j in 0..count {
                    let row = &mut rows[j];
                    row.force += ak * delta_force[j];
                    row.accel -= ak * delta_accel[j];
                    acc_norm = acc_norm.max((row.accel * active[j]).abs());
                    debug_assert!(row.force.is_finite() && row.accel.is_finite());

                    delta_force[j] = row.accel * row.inv_jminv_jt * active[j];
                    ak_num += delta_force[j] * row.accel;
                }
                rows[c].force = clamped_value;

                pass = 0;
                max_passes = max_passes.saturating_sub(1).max(1);
            }
            None => {
                acc_norm = 0.0;
                for j in 0..count {
                    let row = &mut rows[j];
                    row.force += ak * delta_force[j];
                    row.accel -= ak * delta_accel[j];
                    acc_norm = acc_norm.max((row.accel * active[j]).abs());
                    debug_assert!(row.force.is_finite() && row.accel.is_finite());
                }

                if acc_norm > max_acc_norm {
                    let ak_den = ak_num.max(1.0e-17);
                    ak_num = 0.0;
                    for j in 0..count {
                        let row = &rows[j];
                        delta_accel[j] = row.accel * row.inv_jminv_jt * active[j];
                        ak_num += row.accel * delta_accel[j];
                    }

                    let beta = ak_num / ak_den;
                    for j in 0..count {
                        delta_force[j] = delta_accel[j] + beta * delta_force[j];
                    }
                }

                pass += 1;
            }
        }
    }

    for j in 0..count {
        force_step[j] = rows[j].force - force_step[j];
    }

    ret_accel
}
