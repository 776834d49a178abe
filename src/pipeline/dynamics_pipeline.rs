//! Dynamics pipeline structures.

use crate::counters::Counters;
use crate::dynamics::{ContactHandler, IntegrationParameters, IslandSet, IslandSolver, IslandView};
use crate::math::{Real, Vector};

/// The dynamics pipeline, responsible for stepping all the islands of a simulation.
///
/// This structure only contains temporary data buffers. It can be dropped and replaced by a fresh
/// copy at any time. For performance reasons it is recommended to reuse the same pipeline
/// instance to benefit from the cached data.
///
/// Each awake island is solved independently by its own [`IslandSolver`], concurrently if the
/// `parallel` feature is enabled. Islands are expected to be rebuilt by the application (from
/// its collision detection and joint graph) whenever their connectivity changes.
// NOTE: this contains only workspace data, so there is no point in making this serializable.
pub struct DynamicsPipeline {
    /// Counters used for benchmarking only.
    pub counters: Counters,
    solvers: Vec<IslandSolver>,
}

impl Default for DynamicsPipeline {
    fn default() -> Self {
        DynamicsPipeline::new()
    }
}

#[allow(dead_code)]
fn check_pipeline_send_sync() {
    fn do_test<T: Sync + Send>() {}
    do_test::<DynamicsPipeline>();
}

/// Wakes up the island if one of its bodies was woken up by the user, and loads the external
/// forces of its bodies.
///
/// Returns `false` if the island is asleep.
fn prepare_island(view: &mut IslandView, gravity: &Vector<Real>) -> bool {
    let awake = view
        .bodies
        .iter()
        .skip(1)
        .any(|b| b.is_dynamic() && !b.sleeping);

    if !awake {
        view.island.sleeping = true;
        return false;
    }

    if view.island.sleeping {
        log::debug!("waking up island of {} bodies", view.bodies.len() - 1);
        view.island.sleeping = false;
    }

    for body in view.bodies.iter_mut().skip(1) {
        body.sleeping = false;
        if body.is_dynamic() {
            body.accel = body.user_force + gravity * (body.mass * body.gravity_scale);
            body.alpha = body.user_torque;
        }
    }

    true
}

impl DynamicsPipeline {
    /// Initializes a new dynamics pipeline.
    pub fn new() -> DynamicsPipeline {
        DynamicsPipeline {
            counters: Counters::new(false),
            solvers: Vec::new(),
        }
    }

    /// Executes one timestep of the simulation.
    ///
    /// Sleeping islands are skipped, unless one of their bodies has been woken up. The contact
    /// handler is only used by islands containing a body with CCD enabled.
    pub fn step(
        &mut self,
        gravity: &Vector<Real>,
        integration_parameters: &IntegrationParameters,
        islands: &mut IslandSet,
        contacts: &dyn ContactHandler,
    ) {
        self.counters.reset();
        self.counters.step_started();

        let mut views: Vec<_> = islands
            .views_mut()
            .into_iter()
            .filter_map(|mut view| prepare_island(&mut view, gravity).then_some(view))
            .collect();

        if self.solvers.len() < views.len() {
            self.solvers.resize_with(views.len(), IslandSolver::new);
        }

        let solvers = &mut self.solvers[..views.len()];
        solvers.iter_mut().for_each(|s| s.reset_counters());

        {
            #[cfg(feature = "parallel")]
            use rayon::prelude::*;

            par_iter_mut!(views)
                .zip(par_iter_mut!(solvers))
                .for_each(|(view, solver)| {
                    #[cfg(feature = "parallel")]
                    let thread_index = rayon::current_thread_index().unwrap_or(0);
                    #[cfg(not(feature = "parallel"))]
                    let thread_index = 0;

                    solver.calculate_island_reaction_forces(
                        integration_parameters,
                        view,
                        contacts,
                        thread_index,
                    );
                });
        }

        if self.counters.enabled() {
            for solver in solvers.iter() {
                let (solver_counters, ccd_counters) = solver.counters();
                self.counters.solver.accumulate(solver_counters);
                self.counters.ccd.accumulate(ccd_counters);
            }
        }

        self.counters.step_completed();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::{
        Constraint, ContactJoint, ContactPoint, HingeJoint, IslandHandle, JointAxesMask,
        RigidBody, RigidBodyBuilder, SixDofJoint, SolverMode,
    };
    use crate::math::{Isometry, Point};
    use approx::assert_relative_eq;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn gravity() -> Vector<Real> {
        Vector::new(0.0, -9.8, 0.0)
    }

    fn unit_box_contact(friction: Real) -> ContactJoint {
        let mut contact = ContactJoint::new(friction, 0.0);
        for (x, z) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            contact.push_point(ContactPoint {
                point: Point::new(x, -0.5, z),
                normal: Vector::y(),
                depth: 0.0,
            });
        }
        contact
    }

    fn box_on_ground(friction: Real) -> (IslandSet, IslandHandle) {
        let mut islands = IslandSet::new();
        let handle = islands.add_island(
            vec![RigidBodyBuilder::dynamic().can_sleep(false).build()],
            vec![Constraint::new(1, 0, unit_box_contact(friction))],
        );
        (islands, handle)
    }

    #[test]
    fn bodies_connected_by_a_hinge_fall_together() {
        let mut params = IntegrationParameters::default();
        params.max_acceleration_error = 1.0e-4;
        let b1 = RigidBodyBuilder::dynamic().build();
        let b2 = RigidBodyBuilder::dynamic()
            .translation(Vector::new(1.0, 0.0, 0.0))
            .build();
        let pivot = Isometry::translation(0.5, 0.0, 0.0);
        let hinge = HingeJoint::from_world_frame(&pivot, &b1, &b2);

        let mut islands = IslandSet::new();
        let handle = islands.add_island(vec![b1, b2], vec![Constraint::new(1, 2, hinge)]);
        let mut pipeline = DynamicsPipeline::new();
        pipeline.step(&gravity(), &params, &mut islands, &());

        let bodies = islands.bodies(handle);
        for body in &bodies[1..] {
            assert_relative_eq!(body.linvel, gravity() * params.dt, epsilon = 1.0e-4);
            assert_relative_eq!(body.angvel, Vector::zeros(), epsilon = 1.0e-4);
        }
        for feedback in &islands.constraints(handle)[0].feedback {
            assert!(feedback.force.abs() < 1.0e-3);
        }
    }

    #[test]
    fn pendulum_accelerates_around_its_pin() {
        // Unit mass and inertia, pivot at one unit from the center of mass, pin along `z`.
        // The angular acceleration is `9.8 / (1 + 1)`.
        let mut params = IntegrationParameters::simulation();
        params.max_acceleration_error = 1.0e-4;
        params.psd_damp_tolerance = 1.0e-5;

        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(1.0, 0.0, 0.0))
            .build();
        let half_pi = std::f64::consts::FRAC_PI_2 as Real;
        let frame = Isometry::rotation(Vector::y() * -half_pi);
        let hinge = HingeJoint::from_world_frame(&frame, &body, &RigidBody::sentinel());

        let mut islands = IslandSet::new();
        let handle = islands.add_island(vec![body], vec![Constraint::new(1, 0, hinge)]);
        let mut pipeline = DynamicsPipeline::new();
        pipeline.step(&gravity(), &params, &mut islands, &());

        let dt = params.dt;
        let body = &islands.bodies(handle)[1];
        assert_relative_eq!(body.linvel.y, -4.9 * dt, epsilon = 1.0e-3);
        assert_relative_eq!(body.linvel.x, 0.0, epsilon = 1.0e-3);
        assert_relative_eq!(body.angvel.z, -4.9 * dt, epsilon = 1.0e-3);
        assert_relative_eq!(body.angvel.x, 0.0, epsilon = 1.0e-3);
        assert_relative_eq!(body.angvel.y, 0.0, epsilon = 1.0e-3);

        // The hinge carries half of the weight.
        assert_relative_eq!(body.net_force.y, -4.9, epsilon = 1.0e-2);
    }

    #[test]
    fn box_rests_on_the_ground_in_both_modes() {
        let game = IntegrationParameters {
            solver_mode: SolverMode::Game {
                passes: NonZeroUsize::new(8).unwrap(),
            },
            ..IntegrationParameters::default()
        };

        for (params, tolerance) in [(game, 2.0e-2), (IntegrationParameters::simulation(), 5.0e-3)]
        {
            let (mut islands, handle) = box_on_ground(0.5);
            let mut pipeline = DynamicsPipeline::new();

            pipeline.step(&gravity(), &params, &mut islands, &());
            let body = &islands.bodies(handle)[1];
            assert!(body.linvel.y.abs() < tolerance, "{:?}", body.linvel);

            let total_normal: Real = islands.constraints(handle)[0]
                .feedback
                .iter()
                .step_by(3)
                .map(|f| f.force)
                .sum();
            assert_relative_eq!(total_normal, 9.8, epsilon = 9.8 * 0.1);
        }
    }

    #[test]
    fn friction_never_exceeds_the_coulomb_bound() {
        let params = IntegrationParameters::default();
        let (mut islands, handle) = box_on_ground(0.3);
        islands.bodies_mut(handle)[1].add_force(Vector::new(1000.0, 0.0, 0.0), true);

        let mut pipeline = DynamicsPipeline::new();
        for _ in 0..3 {
            pipeline.step(&gravity(), &params, &mut islands, &());

            let feedback = &islands.constraints(handle)[0].feedback;
            for point in feedback.chunks(3) {
                let normal = point[0].force;
                assert!(normal >= 0.0);
                for tangent in &point[1..] {
                    assert!(tangent.force.abs() <= 0.3 * normal + 1.0e-4);
                }
            }
        }

        // Pushed hard enough to slide.
        assert!(islands.bodies(handle)[1].linvel.x > 0.0);
    }

    #[test]
    fn skeleton_chain_holds_its_weight() {
        let params = IntegrationParameters::default();
        let mut bodies = Vec::new();
        let mut constraints = Vec::new();

        for i in 1..=3 {
            bodies.push(
                RigidBodyBuilder::dynamic()
                    .translation(Vector::new(0.0, -(i as Real), 0.0))
                    .build(),
            );
            // Hangs body `i` from body `i - 1`, or from the world, half a unit above it.
            let joint = SixDofJoint::spherical(
                Isometry::translation(0.0, 0.5, 0.0),
                Isometry::translation(0.0, -0.5, 0.0),
            );
            constraints.push(Constraint::new(i, i - 1, joint));
        }

        let mut islands = IslandSet::new();
        let handle = islands.add_island_with_skeletons(bodies, constraints, vec![3]);
        let mut pipeline = DynamicsPipeline::new();
        pipeline.counters.enable();
        pipeline.step(&gravity(), &params, &mut islands, &());

        for body in &islands.bodies(handle)[1..] {
            assert!(body.linvel.norm() < 1.0e-3, "{:?}", body.linvel);
        }
        let top = &islands.constraints(handle)[0].feedback;
        assert_relative_eq!(top[1].force, 3.0 * 9.8, epsilon = 1.0e-2);
        assert_eq!(pipeline.counters.solver.lcp_failures, 0);
        assert_eq!(pipeline.counters.solver.nrows, 9);
    }

    #[test]
    fn feedback_callbacks_run_after_each_step() {
        let params = IntegrationParameters::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let body = RigidBodyBuilder::dynamic().can_sleep(false).build();
        let joint = SixDofJoint::new(
            Isometry::identity(),
            Isometry::identity(),
            JointAxesMask::LIN_AXES,
        );
        let constraint = Constraint::new(1, 0, joint).with_feedback_callback(move |c, dt, _| {
            assert_eq!(c.feedback.len(), 3);
            assert!(dt > 0.0);
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        let mut islands = IslandSet::new();
        islands.add_island(vec![body], vec![constraint]);
        let mut pipeline = DynamicsPipeline::new();
        for _ in 0..3 {
            pipeline.step(&gravity(), &params, &mut islands, &());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn sleeping_islands_are_skipped_until_woken_up() {
        let params = IntegrationParameters::default();
        let mut islands = IslandSet::new();
        let resting = islands.add_island(vec![RigidBodyBuilder::dynamic().build()], vec![]);
        let falling = islands.add_island(
            vec![RigidBodyBuilder::dynamic().can_sleep(false).build()],
            vec![],
        );

        let mut pipeline = DynamicsPipeline::new();
        pipeline.step(&Vector::zeros(), &params, &mut islands, &());
        assert!(islands.get(resting).unwrap().is_sleeping());
        assert!(!islands.get(falling).unwrap().is_sleeping());

        pipeline.step(&gravity(), &params, &mut islands, &());
        assert_eq!(islands.bodies(resting)[1].linvel, Vector::zeros());
        assert_relative_eq!(
            islands.bodies(falling)[1].linvel.y,
            -9.8 * params.dt,
            epsilon = 1.0e-5
        );

        islands.bodies_mut(resting)[1].add_force(Vector::new(0.0, 10.0, 0.0), true);
        pipeline.step(&Vector::zeros(), &params, &mut islands, &());
        assert!(!islands.get(resting).unwrap().is_sleeping());
        assert_relative_eq!(
            islands.bodies(resting)[1].linvel.y,
            10.0 * params.dt,
            epsilon = 1.0e-5
        );
    }

    #[derive(Default)]
    struct ImpactOnce {
        toi_calls: AtomicUsize,
        contact_calls: AtomicUsize,
    }

    impl ContactHandler for ImpactOnce {
        fn time_to_impact(&self, _: &Constraint, _: &RigidBody, _: &RigidBody, max: Real) -> Real {
            if self.toi_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                0.0
            } else {
                max
            }
        }

        fn calculate_contacts(&self, _: &mut Constraint, _: &RigidBody, _: &RigidBody, _: Real) {
            self.contact_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn continuous_integration_stops_at_impacts() {
        let params = IntegrationParameters::simulation();
        let mut islands = IslandSet::new();
        let handle = islands.add_island(
            vec![RigidBodyBuilder::dynamic()
                .linvel(Vector::new(0.0, -50.0, 0.0))
                .ccd_enabled(true)
                .build()],
            vec![Constraint::new(1, 0, unit_box_contact(0.5))],
        );

        let handler = ImpactOnce::default();
        let mut pipeline = DynamicsPipeline::new();
        pipeline.counters.enable();
        pipeline.step(&Vector::zeros(), &params, &mut islands, &handler);

        assert!(handler.toi_calls.load(Ordering::SeqCst) >= 1);
        // At the impact, then before checking that the bodies separate.
        assert_eq!(handler.contact_calls.load(Ordering::SeqCst), 2);
        assert!(pipeline.counters.ccd.num_substeps >= 1);
        assert_eq!(pipeline.counters.ccd.num_islands, 1);

        // The approach velocity has been cancelled before moving.
        let body = &islands.bodies(handle)[1];
        assert!(body.linvel.y > -0.5, "{:?}", body.linvel);
        assert!(body.position.translation.y > -1.0e-2);
    }
}
