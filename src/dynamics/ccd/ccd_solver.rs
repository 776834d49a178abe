use super::ContactHandler;
use crate::dynamics::joint::Constraint;
use crate::dynamics::RigidBody;
use crate::math::Real;

fn needs_ccd(constraint: &Constraint, bodies: &[RigidBody]) -> bool {
    constraint.solver_active
        && constraint.is_contact()
        && (bodies[constraint.body0].ccd_enabled || bodies[constraint.body1].ccd_enabled)
}

/// Does this island need continuous integration?
pub(crate) fn island_needs_ccd(bodies: &[RigidBody], constraints: &[Constraint]) -> bool {
    !constraints.is_empty() && bodies.iter().any(|b| b.ccd_enabled)
}

/// The earliest time of impact, in `[0, max_time]`, among the contacts involving a body with
/// CCD enabled.
pub(crate) fn find_first_impact(
    bodies: &[RigidBody],
    constraints: &[Constraint],
    contacts: &dyn ContactHandler,
    max_time: Real,
) -> Real {
    constraints
        .iter()
        .filter(|c| needs_ccd(c, bodies))
        .map(|c| {
            contacts
                .time_to_impact(c, &bodies[c.body0], &bodies[c.body1], max_time)
                .max(0.0)
        })
        .fold(max_time, Real::min)
}

/// Refreshes the contact points of every contact involving a body with CCD enabled.
pub(crate) fn update_contacts(
    bodies: &[RigidBody],
    constraints: &mut [Constraint],
    contacts: &dyn ContactHandler,
    timestep: Real,
) {
    for constraint in constraints.iter_mut() {
        if needs_ccd(constraint, bodies) {
            let (b0, b1) = (&bodies[constraint.body0], &bodies[constraint.body1]);
            contacts.calculate_contacts(constraint, b0, b1, timestep);
        }
    }
}

/// Whether the bodies of some contact point are still moving toward each other faster than
/// `speed_tolerance`.
pub(crate) fn is_colliding(
    bodies: &[RigidBody],
    constraints: &[Constraint],
    speed_tolerance: Real,
) -> bool {
    constraints.iter().filter(|c| needs_ccd(c, bodies)).any(|c| {
        let (b0, b1) = (&bodies[c.body0], &bodies[c.body1]);
        c.joint.contact_points().map_or(false, |points| {
            points.iter().any(|pt| {
                let vrel = b0.velocity_at_point(&pt.point) - b1.velocity_at_point(&pt.point);
                vrel.dot(&pt.normal) < -speed_tolerance
            })
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::joint::{ContactJoint, ContactPoint};
    use crate::dynamics::RigidBodyBuilder;
    use crate::math::{Point, Vector};

    struct FixedToi(Real);

    impl ContactHandler for FixedToi {
        fn time_to_impact(&self, _: &Constraint, _: &RigidBody, _: &RigidBody, _: Real) -> Real {
            self.0
        }

        fn calculate_contacts(&self, _: &mut Constraint, _: &RigidBody, _: &RigidBody, _: Real) {}
    }

    fn falling_island(ccd: bool) -> (Vec<RigidBody>, Vec<Constraint>) {
        let bodies = vec![
            RigidBody::sentinel(),
            RigidBodyBuilder::dynamic()
                .linvel(Vector::new(0.0, -10.0, 0.0))
                .ccd_enabled(ccd)
                .build(),
        ];
        let mut contact = ContactJoint::default();
        contact.push_point(ContactPoint {
            point: Point::new(0.0, -0.5, 0.0),
            normal: Vector::y(),
            depth: 0.0,
        });
        (bodies, vec![Constraint::new(1, 0, contact)])
    }

    #[test]
    fn first_impact_only_considers_ccd_bodies() {
        let (bodies, constraints) = falling_island(true);
        assert!(island_needs_ccd(&bodies, &constraints));
        assert_eq!(
            find_first_impact(&bodies, &constraints, &FixedToi(0.25), 1.0),
            0.25
        );
        assert_eq!(find_first_impact(&bodies, &constraints, &(), 1.0), 1.0);

        let (bodies, constraints) = falling_island(false);
        assert!(!island_needs_ccd(&bodies, &constraints));
        assert_eq!(
            find_first_impact(&bodies, &constraints, &FixedToi(0.25), 1.0),
            1.0
        );
    }

    #[test]
    fn inactive_contacts_are_ignored() {
        let (bodies, mut constraints) = falling_island(true);
        constraints[0].solver_active = false;
        assert!(!is_colliding(&bodies, &constraints, 0.0));
        assert_eq!(
            find_first_impact(&bodies, &constraints, &FixedToi(0.25), 1.0),
            1.0
        );
    }

    #[test]
    fn approaching_contacts_are_colliding() {
        let (mut bodies, constraints) = falling_island(true);
        assert!(is_colliding(&bodies, &constraints, 0.0));
        bodies[1].linvel = Vector::new(0.0, 1.0, 0.0);
        assert!(!is_colliding(&bodies, &constraints, 0.0));
    }

    #[test]
    fn slow_approach_within_tolerance_is_resting() {
        let (mut bodies, constraints) = falling_island(true);
        bodies[1].linvel = Vector::new(0.0, -1.0e-3, 0.0);
        assert!(is_colliding(&bodies, &constraints, 0.0));
        assert!(!is_colliding(&bodies, &constraints, 0.05));
        assert!(is_colliding(&bodies, &constraints, 1.0e-4));
    }
}
