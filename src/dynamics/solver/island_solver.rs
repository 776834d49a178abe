use super::game_mode::calculate_forces_game_mode;
use super::jacobian_builder::build_jacobian_matrix;
use super::simulation_mode::{
    apply_external_forces_and_acceleration, calculate_forces_simulation_mode,
};
use super::SolverMemory;
use crate::counters::{CCDCounters, SolverCounters};
use crate::dynamics::ccd::{self, ContactHandler};
use crate::dynamics::joint::Constraint;
use crate::dynamics::{IntegrationParameters, IslandView, RigidBody, SolverMode};
use crate::math::{Real, Vector};

/// Number of passes of the impulsive solves.
const IMPULSE_PASSES: usize = 4;

/// Solves the constraint forces of islands and integrates their bodies.
///
/// One solver is used per thread: it keeps its scratch buffers from one island to the next.
#[derive(Default)]
pub struct IslandSolver {
    memory: SolverMemory,
    pub(crate) counters: SolverCounters,
    pub(crate) ccd_counters: CCDCounters,
}

impl IslandSolver {
    /// Creates a solver with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The counters accumulated by this solver since they were last reset.
    pub fn counters(&self) -> (&SolverCounters, &CCDCounters) {
        (&self.counters, &self.ccd_counters)
    }

    pub(crate) fn reset_counters(&mut self) {
        self.counters.reset();
        self.ccd_counters.reset();
    }

    /// Solves one island over `params.dt` and integrates its bodies.
    ///
    /// Islands containing a body with CCD enabled and at least one joint are integrated in
    /// sub-steps ending at each predicted impact. The sleep state of the island is updated.
    #[profiling::function]
    pub fn calculate_island_reaction_forces(
        &mut self,
        params: &IntegrationParameters,
        view: &mut IslandView,
        contacts: &dyn ContactHandler,
        thread_index: usize,
    ) {
        let island = &mut *view.island;
        let bodies = &mut *view.bodies;
        let constraints = &mut *view.constraints;
        let dt = params.dt;

        self.counters.nislands += 1;
        self.counters.njoints += constraints.len();

        if !ccd::island_needs_ccd(bodies, constraints) {
            self.calculate_reactions_forces(
                params,
                island.skeletons(),
                bodies,
                constraints,
                dt,
                thread_index,
            );

            self.counters.integration_time.resume();
            island.sleeping = integrate_array(params, bodies, dt);
            self.counters.integration_time.pause();
        } else {
            self.ccd_counters.num_islands += 1;
            self.calculate_reactions_forces(
                params,
                island.skeletons(),
                bodies,
                constraints,
                dt,
                thread_index,
            );

            self.counters.integration_time.resume();
            island.sleeping = update_sleep_state(params, bodies, dt);
            self.counters.integration_time.pause();

            if !island.sleeping {
                self.integrate_with_ccd(
                    params,
                    island.skeletons(),
                    bodies,
                    constraints,
                    contacts,
                    thread_index,
                );
            }
            clear_accelerations(bodies);
        }
    }

    /// Builds the rows of an island and solves their forces over `timestep`.
    ///
    /// The body velocities are updated, but their positions are not. A zero `timestep` solves
    /// impulses instead of forces, and leaves the joint feedback untouched.
    pub fn calculate_reactions_forces(
        &mut self,
        params: &IntegrationParameters,
        skeletons: &[usize],
        bodies: &mut [RigidBody],
        constraints: &mut [Constraint],
        timestep: Real,
        thread_index: usize,
    ) {
        let memory = &mut self.memory;
        let counters = &mut self.counters;

        counters.jacobian_assembly_time.resume();
        build_jacobian_matrix(params, bodies, constraints, memory, timestep);
        counters.nrows += memory.rows.len();
        counters.jacobian_assembly_time.pause();

        counters.force_resolution_time.resume();
        if constraints.is_empty() {
            apply_external_forces_and_acceleration(
                params,
                bodies,
                constraints,
                memory,
                timestep,
                0.0,
            );
        } else {
            match params.solver_mode {
                SolverMode::Game { passes } => calculate_forces_game_mode(
                    params,
                    passes.get(),
                    skeletons,
                    bodies,
                    constraints,
                    memory,
                    timestep,
                    counters,
                ),
                SolverMode::Simulation if timestep == 0.0 => calculate_forces_game_mode(
                    params,
                    IMPULSE_PASSES,
                    skeletons,
                    bodies,
                    constraints,
                    memory,
                    timestep,
                    counters,
                ),
                SolverMode::Simulation => calculate_forces_simulation_mode(
                    params,
                    bodies,
                    constraints,
                    memory,
                    timestep,
                    counters,
                ),
            }
        }
        counters.force_resolution_time.pause();

        if timestep > 0.0 {
            for constraint in constraints.iter_mut() {
                constraint.notify_solved(timestep, thread_index);
            }
        }
    }

    /// Integrates the positions of an island over `params.dt`, stopping at each impact between
    /// a body with CCD enabled and another body to resolve it with an impulse.
    fn integrate_with_ccd(
        &mut self,
        params: &IntegrationParameters,
        skeletons: &[usize],
        bodies: &mut [RigidBody],
        constraints: &mut [Constraint],
        contacts: &dyn ContactHandler,
        thread_index: usize,
    ) {
        let dt = params.dt;
        let tolerance = dt * 0.01;
        let mut time_remaining = dt;
        let mut steps = 0;

        while steps < params.max_continuous_collision_steps && time_remaining > tolerance {
            steps += 1;
            self.ccd_counters.num_substeps += 1;

            self.ccd_counters.toi_computation_time.resume();
            let toi = ccd::find_first_impact(bodies, constraints, contacts, time_remaining);
            self.ccd_counters.toi_computation_time.pause();

            if toi > tolerance {
                integrate_bodies(bodies, toi);
                time_remaining -= toi;
                continue;
            }

            log::trace!(
                "impact detected with {} of the step remaining",
                time_remaining
            );
            ccd::update_contacts(bodies, constraints, contacts, time_remaining);
            self.calculate_reactions_forces(
                params,
                skeletons,
                bodies,
                constraints,
                0.0,
                thread_index,
            );

            // Small sub-steps until the impacting bodies separate.
            loop {
                let sub_step = (dt / 8.0).min(time_remaining);
                integrate_bodies(bodies, sub_step);
                time_remaining -= sub_step;
                if time_remaining <= tolerance || steps >= params.max_continuous_collision_steps {
                    break;
                }

                ccd::update_contacts(bodies, constraints, contacts, time_remaining);
                // Approach speeds below the impulse convergence threshold count as resting.
                if !ccd::is_colliding(bodies, constraints, params.max_acceleration_error) {
                    break;
                }
                steps += 1;
                self.ccd_counters.num_substeps += 1;
            }
        }

        if time_remaining > 0.0 {
            integrate_bodies(bodies, time_remaining);
        }
    }
}

fn integrate_bodies(bodies: &mut [RigidBody], dt: Real) {
    for body in bodies.iter_mut().skip(1) {
        if body.is_dynamic() {
            body.integrate_velocity(dt);
        }
    }
}

fn clear_accelerations(bodies: &mut [RigidBody]) {
    for body in bodies.iter_mut().skip(1) {
        body.accel = Vector::zeros();
        body.alpha = Vector::zeros();
    }
}

/// Updates the equilibrium and sleep state of the bodies of an island.
///
/// Bodies below the freeze thresholds are in equilibrium and have their velocities damped. The
/// island falls asleep if all its bodies are in equilibrium, or if its largest accelerations and
/// velocities stay within one entry of the sleep table for longer than that entry allows.
/// Islands containing a body that cannot sleep never sleep.
///
/// Returns whether the island is now sleeping.
pub(crate) fn update_sleep_state(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    timestep: Real,
) -> bool {
    let mut max_accel: Real = 0.0;
    let mut max_alpha: Real = 0.0;
    let mut max_speed: Real = 0.0;
    let mut max_omega: Real = 0.0;
    let mut stack_sleeping = true;
    let mut auto_sleep = true;
    let mut sleep_counter = u32::MAX;

    for body in bodies.iter_mut().skip(1) {
        if !body.is_dynamic() {
            continue;
        }

        let accel2 = body.accel.norm_squared();
        let alpha2 = body.alpha.norm_squared();
        let speed2 = body.linvel.norm_squared();
        let omega2 = body.angvel.norm_squared();

        max_accel = max_accel.max(accel2);
        max_alpha = max_alpha.max(alpha2);
        max_speed = max_speed.max(speed2);
        max_omega = max_omega.max(omega2);

        let equilibrium = accel2 < params.freeze_accel2
            && alpha2 < params.freeze_alpha2
            && speed2 < params.freeze_speed2
            && omega2 < params.freeze_omega2;

        if equilibrium {
            body.linvel *= params.freezing_velocity_drag;
            body.angvel *= params.freezing_velocity_drag;
            if body.linvel.norm_squared() <= params.velocity_tolerance2 {
                body.linvel = Vector::zeros();
            }
            if body.angvel.norm_squared() <= params.velocity_tolerance2 {
                body.angvel = Vector::zeros();
            }
        }

        body.equilibrium = equilibrium;
        stack_sleeping &= equilibrium;
        auto_sleep &= body.auto_sleep;
        sleep_counter = sleep_counter.min(body.sleeping_counter);
    }

    if auto_sleep {
        if stack_sleeping {
            for body in bodies.iter_mut().skip(1).filter(|b| b.is_dynamic()) {
                put_to_rest(body);
            }
        } else {
            let table = &params.sleep_table;
            let last = table.last();

            if max_accel > last.max_accel
                || max_alpha > last.max_alpha
                || max_speed > last.max_veloc
                || max_omega > last.max_omega
            {
                for body in bodies.iter_mut().skip(1) {
                    body.sleeping_counter = 0;
                }
            } else {
                let entry = table
                    .entry_for(max_accel, max_alpha, max_speed, max_omega)
                    .unwrap_or(&table.entries[0]);
                let scaled_count = (60.0 * sleep_counter as Real * timestep) as u32;

                if scaled_count > entry.steps {
                    for body in bodies.iter_mut().skip(1).filter(|b| b.is_dynamic()) {
                        put_to_rest(body);
                        body.equilibrium = true;
                    }
                    stack_sleeping = true;
                } else {
                    let next = sleep_counter.saturating_add(1);
                    for body in bodies.iter_mut().skip(1).filter(|b| b.is_dynamic()) {
                        body.sleeping_counter = next;
                    }
                }
            }
        }
    }

    let sleeping = auto_sleep && stack_sleeping;
    if sleeping {
        for body in bodies.iter_mut().skip(1).filter(|b| b.is_dynamic()) {
            body.sleeping = true;
        }
        log::debug!("island of {} bodies fell asleep", bodies.len() - 1);
    }

    sleeping
}

fn put_to_rest(body: &mut RigidBody) {
    body.linvel = Vector::zeros();
    body.angvel = Vector::zeros();
    body.net_force = Vector::zeros();
    body.net_torque = Vector::zeros();
}

/// Updates the sleep state of an island, then integrates the positions of its bodies over
/// `timestep` unless it fell asleep.
///
/// Returns whether the island is now sleeping.
pub fn integrate_array(
    params: &IntegrationParameters,
    bodies: &mut [RigidBody],
    timestep: Real,
) -> bool {
    let sleeping = update_sleep_state(params, bodies, timestep);

    if !sleeping && timestep != 0.0 {
        integrate_bodies(bodies, timestep);
    }

    clear_accelerations(bodies);
    sleeping
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::joint::{ContactJoint, ContactPoint};
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::Point;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports an impact at 30% of the remaining time, then immediate impacts.
    #[derive(Default)]
    struct ImpactThenTouching {
        calls: AtomicUsize,
    }

    impl ContactHandler for ImpactThenTouching {
        fn time_to_impact(&self, _: &Constraint, _: &RigidBody, _: &RigidBody, max: Real) -> Real {
            if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
                0.3 * max
            } else {
                0.0
            }
        }

        fn calculate_contacts(&self, _: &mut Constraint, _: &RigidBody, _: &RigidBody, _: Real) {}
    }

    fn sliding_on_the_ground(active: bool) -> (Vec<RigidBody>, Vec<Constraint>) {
        let bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(-1.0, 0.0, 0.0))
                .ccd_enabled(true)
                .build(),
        ];
        let mut contact = ContactJoint::new(0.0, 0.0);
        contact.push_point(ContactPoint {
            point: Point::new(0.0, -0.5, 0.0),
            normal: Vector::y(),
            depth: 0.0,
        });
        let mut constraint = Constraint::new(1, 0, contact);
        constraint.solver_active = active;
        (bodies, vec![constraint])
    }

    #[test]
    fn continuous_integration_covers_exactly_one_step() {
        let params = IntegrationParameters::simulation();
        let (mut bodies, mut constraints) = sliding_on_the_ground(true);
        let handler = ImpactThenTouching::default();
        let mut solver = IslandSolver::new();

        solver.integrate_with_ccd(&params, &[], &mut bodies, &mut constraints, &handler, 0);

        // The frictionless contact leaves the sliding velocity untouched.
        assert_relative_eq!(bodies[1].linvel.x, -1.0, epsilon = 1.0e-5);
        assert_relative_eq!(
            bodies[1].position.translation.vector.x,
            -params.dt,
            epsilon = 1.0e-6
        );
        assert!(handler.calls.load(Ordering::Relaxed) >= 2);
        assert!(solver.ccd_counters.num_substeps <= params.max_continuous_collision_steps);
    }

    #[test]
    fn inactive_contacts_do_not_split_the_step() {
        let params = IntegrationParameters::simulation();
        let (mut bodies, mut constraints) = sliding_on_the_ground(false);
        let handler = ImpactThenTouching::default();
        let mut solver = IslandSolver::new();

        solver.integrate_with_ccd(&params, &[], &mut bodies, &mut constraints, &handler, 0);

        assert_eq!(handler.calls.load(Ordering::Relaxed), 0);
        assert_eq!(solver.ccd_counters.num_substeps, 1);
        assert_relative_eq!(
            bodies[1].position.translation.vector.x,
            -params.dt,
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn bodies_in_equilibrium_sleep_immediately() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(0.01, 0.0, 0.0))
                .build(),
        ];

        assert!(integrate_array(&params, &mut bodies, params.dt));
        assert!(bodies[1].sleeping && bodies[1].equilibrium);
        assert_eq!(bodies[1].linvel, Vector::zeros());
        assert_eq!(bodies[1].position.translation.vector, Vector::zeros());
    }

    #[test]
    fn bodies_that_cannot_sleep_keep_moving() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(0.01, 0.0, 0.0))
                .can_sleep(false)
                .build(),
        ];

        assert!(!integrate_array(&params, &mut bodies, params.dt));
        assert!(!bodies[1].sleeping);
        assert!(bodies[1].equilibrium);
        // Damped by the freezing drag, then integrated.
        assert_relative_eq!(bodies[1].linvel.x, 0.009, epsilon = 1.0e-7);
        assert_relative_eq!(
            bodies[1].position.translation.vector.x,
            0.009 * params.dt,
            epsilon = 1.0e-7
        );
    }

    #[test]
    fn fast_bodies_reset_the_sleep_counter() {
        let params = IntegrationParameters::default();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(10.0, 0.0, 0.0))
                .build(),
        ];
        bodies[1].sleeping_counter = 5;

        assert!(!integrate_array(&params, &mut bodies, params.dt));
        assert_eq!(bodies[1].sleeping_counter, 0);
        assert_relative_eq!(
            bodies[1].position.translation.vector.x,
            10.0 * params.dt,
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn slow_bodies_sleep_after_the_table_delay() {
        let mut params = IntegrationParameters::default();
        params.dt = 1.0 / 64.0;
        let speed = (params.freeze_speed2 * 1.2).sqrt();
        let mut bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(speed, 0.0, 0.0))
                .build(),
        ];

        // Second entry of the table: 32 steps at 60Hz.
        let entry = params.sleep_table.entries[1];
        assert_eq!(entry.steps, 32);

        let mut steps = 0;
        while !integrate_array(&params, &mut bodies, params.dt) {
            steps += 1;
            assert!(steps < 100);
        }

        // The counter must reach a value `c` with `60 * c * dt > 32`, i.e. `c = 36`.
        assert_eq!(steps, 36);
        assert!(bodies[1].sleeping);
        assert_eq!(bodies[1].linvel, Vector::zeros());
    }
}
