use crate::dynamics::solver::{Jacobian, JacobianPair, JacobianRow};
use crate::dynamics::RigidBody;
use crate::math::{Point, Real, Vector, CONSTRAINT_MAX_ROWS};

/// The sink receiving the Jacobian rows emitted by a joint.
///
/// Row indices returned by the `add_*` methods are local to the joint and start at 0.
pub struct ConstraintRows<'a> {
    rows: &'a mut Vec<JacobianRow>,
    first: usize,
    com0: Point<Real>,
    com1: Point<Real>,
}

impl<'a> ConstraintRows<'a> {
    pub(crate) fn new(
        rows: &'a mut Vec<JacobianRow>,
        body0: &RigidBody,
        body1: &RigidBody,
    ) -> Self {
        let first = rows.len();
        Self {
            rows,
            first,
            com0: body0.center_of_mass(),
            com1: body1.center_of_mass(),
        }
    }

    /// Number of rows emitted so far.
    pub fn len(&self) -> usize {
        self.rows.len() - self.first
    }

    /// Whether no row has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, mut row: JacobianRow) -> usize {
        let index = self.len();
        assert!(
            index < CONSTRAINT_MAX_ROWS,
            "A joint cannot emit more than {} rows.",
            CONSTRAINT_MAX_ROWS
        );
        row.feedback_slot = index;
        self.rows.push(row);
        index
    }

    /// Adds a row preventing the relative motion of the points `p0` of the first body and `p1`
    /// of the second body along `dir`.
    ///
    /// The position error of the row is the distance `(p0 - p1) . dir`.
    pub fn add_linear_row(&mut self, p0: &Point<Real>, p1: &Point<Real>, dir: &Vector<Real>) -> usize {
        let r0 = p0 - self.com0;
        let r1 = p1 - self.com1;
        let jt = JacobianPair::new(
            Jacobian::new(*dir, r0.cross(dir)),
            Jacobian::new(-dir, -r1.cross(dir)),
        );
        let mut row = JacobianRow::new(jt);
        row.penetration = (p0 - p1).dot(dir);
        self.push(row)
    }

    /// Adds a row preventing the relative rotation of both bodies around `dir`.
    ///
    /// `angle` is the current angular error around `dir`, measured from the second body to
    /// the first.
    pub fn add_angular_row(&mut self, angle: Real, dir: &Vector<Real>) -> usize {
        let jt = JacobianPair::new(
            Jacobian::new(Vector::zeros(), *dir),
            Jacobian::new(Vector::zeros(), -dir),
        );
        let mut row = JacobianRow::new(jt);
        row.penetration = angle;
        self.push(row)
    }

    /// Adds a row with an arbitrary Jacobian.
    pub fn add_general_row(&mut self, jt: JacobianPair) -> usize {
        self.push(JacobianRow::new(jt))
    }

    /// The row with the given joint-local index.
    pub fn row_mut(&mut self, index: usize) -> &mut JacobianRow {
        &mut self.rows[self.first + index]
    }

    /// Sets the force bounds of a row.
    pub fn set_row_limits(&mut self, index: usize, lower: Real, upper: Real) {
        debug_assert!(lower <= upper);
        let row = self.row_mut(index);
        row.lower_bound_friction_coefficient = lower;
        row.upper_bound_friction_coefficient = upper;
        row.normal_force_index = None;
    }

    /// Bounds the force of a row by the force of the row `normal_index` times the given
    /// friction coefficients.
    ///
    /// The normal row must have been emitted before this one.
    pub fn set_row_friction(
        &mut self,
        index: usize,
        normal_index: usize,
        lower_coefficient: Real,
        upper_coefficient: Real,
    ) {
        assert!(
            normal_index < index,
            "A friction row must come after its normal row."
        );
        let row = self.row_mut(index);
        row.lower_bound_friction_coefficient = lower_coefficient;
        row.upper_bound_friction_coefficient = upper_coefficient;
        row.normal_force_index = Some(normal_index);
    }

    /// Drives a row toward the given relative acceleration instead of locking it.
    pub fn set_row_acceleration(&mut self, index: usize, accel: Real) {
        let row = self.row_mut(index);
        row.motor_accel = Some(accel);
        row.coordinate_accel = accel;
    }

    /// Scales the regularization of a row. Larger values make the row softer.
    pub fn set_row_stiffness(&mut self, index: usize, stiffness: Real) {
        self.row_mut(index).stiffness = stiffness;
    }

    /// Overrides the position error of a row.
    pub fn set_row_penetration(&mut self, index: usize, penetration: Real) {
        self.row_mut(index).penetration = penetration;
    }
}
