//! Miscellaneous utilities.

use crate::math::{AngularInertia, Real, Rotation, Vector};

const INV_EPSILON: Real = 1.0e-20;

/// The inverse of `val`, or zero if `val` is too close to zero.
pub(crate) fn inv(val: Real) -> Real {
    if (-INV_EPSILON..=INV_EPSILON).contains(&val) {
        0.0
    } else {
        1.0 / val
    }
}

/// The world-space matrix `R * diag(principal) * R^T`.
pub(crate) fn rotate_principal_inertia(
    rotation: &Rotation<Real>,
    principal: &Vector<Real>,
) -> AngularInertia<Real> {
    let rot = rotation.to_rotation_matrix();
    rot.matrix() * AngularInertia::from_diagonal(principal) * rot.matrix().transpose()
}

/// The signed angle of the rotation bringing `from` onto `to`, measured around `axis`.
///
/// `axis` is expected to be orthogonal to both vectors.
pub(crate) fn angle_around(from: &Vector<Real>, to: &Vector<Real>, axis: &Vector<Real>) -> Real {
    from.cross(to).dot(axis).atan2(from.dot(to))
}

/// The three columns of a rotation matrix.
pub(crate) fn basis(rotation: &Rotation<Real>) -> [Vector<Real>; 3] {
    [
        rotation * Vector::x(),
        rotation * Vector::y(),
        rotation * Vector::z(),
    ]
}

/// Two unit vectors completing `n` into an orthonormal basis.
///
/// `n` must be normalized.
// Branchless construction from Pixar: https://graphics.pixar.com/library/OrthonormalB/paper.pdf
pub(crate) fn orthonormal_basis(n: &Vector<Real>) -> [Vector<Real>; 2] {
    let sign = (1.0 as Real).copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    [
        Vector::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
        Vector::new(b, sign + n.y * n.y * a, -n.y),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn signed_angle_around_axis() {
        let angle = angle_around(&Vector::x(), &Vector::y(), &Vector::z());
        assert_relative_eq!(angle, std::f32::consts::FRAC_PI_2 as Real, epsilon = 1.0e-6);
        let angle = angle_around(&Vector::y(), &Vector::x(), &Vector::z());
        assert_relative_eq!(angle, -std::f32::consts::FRAC_PI_2 as Real, epsilon = 1.0e-6);
    }

    #[test]
    fn orthonormal_basis_is_orthonormal() {
        for n in [Vector::y(), -Vector::z(), Vector::new(1.0, -2.0, 0.5).normalize()] {
            let [t1, t2] = orthonormal_basis(&n);
            assert_relative_eq!(t1.norm(), 1.0, epsilon = 1.0e-5);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = 1.0e-5);
            assert_relative_eq!(t1.dot(&n), 0.0, epsilon = 1.0e-5);
            assert_relative_eq!(t2.dot(&n), 0.0, epsilon = 1.0e-5);
            assert_relative_eq!(t1.dot(&t2), 0.0, epsilon = 1.0e-5);
        }
    }

    #[test]
    fn principal_inertia_rotation() {
        let rot = Rotation::from_axis_angle(&Vector::z_axis(), 0.5);
        let inertia = rotate_principal_inertia(&rot, &Vector::new(1.0, 2.0, 3.0));
        assert_relative_eq!(inertia, inertia.transpose(), epsilon = 1.0e-6);
        assert_relative_eq!(inertia.trace(), 6.0, epsilon = 1.0e-5);
        assert_relative_eq!(inertia[(2, 2)], 3.0, epsilon = 1.0e-6);
    }
}
