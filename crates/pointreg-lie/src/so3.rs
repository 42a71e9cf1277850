use glam::{DMat3, DQuat, DVec3};
use rand::Rng;

/// A spatial rotation stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    /// Unit quaternion.
    pub q: DQuat,
}

impl SO3 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: DQuat::IDENTITY };

    /// Create a rotation from a quaternion, renormalizing it.
    ///
    /// A degenerate quaternion yields the identity.
    pub fn from_quaternion(q: DQuat) -> Self {
        let norm = q.length();
        if norm < 1e-12 || !norm.is_finite() {
            return Self::IDENTITY;
        }
        Self { q: q / norm }
    }

    /// Create a rotation from a proper 3x3 rotation matrix.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self::from_quaternion(DQuat::from_mat3(mat))
    }

    /// Create a rotation of `angle` radians about `axis`. The axis does not need to be unit.
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        match axis.try_normalize() {
            Some(axis) => Self {
                q: DQuat::from_axis_angle(axis, angle),
            },
            None => Self::IDENTITY,
        }
    }

    /// Sample a rotation uniformly over SO(3) (Shoemake's method).
    pub fn from_random() -> Self {
        let mut rng = rand::rng();

        let r1: f64 = rng.random();
        let r2: f64 = rng.random();
        let r3: f64 = rng.random();

        let two_pi = 2.0 * std::f64::consts::PI;
        let w = (1.0 - r1).sqrt() * (two_pi * r2).sin();
        let x = (1.0 - r1).sqrt() * (two_pi * r2).cos();
        let y = r1.sqrt() * (two_pi * r3).sin();
        let z = r1.sqrt() * (two_pi * r3).cos();

        Self::from_quaternion(DQuat::from_xyzw(x, y, z, w))
    }

    /// Lie algebra -> Lie group
    pub fn exp(v: DVec3) -> Self {
        let theta = v.length();
        if theta < 1e-12 {
            return Self::IDENTITY;
        }
        Self {
            q: DQuat::from_axis_angle(v / theta, theta),
        }
    }

    /// Lie group -> Lie algebra
    pub fn log(&self) -> DVec3 {
        let (axis, angle) = self.q.to_axis_angle();
        // keep the rotation vector in the ball of radius π
        if angle > std::f64::consts::PI {
            axis * (angle - 2.0 * std::f64::consts::PI)
        } else {
            axis * angle
        }
    }

    /// The rotation angle in radians, in `[0, π]`.
    pub fn angle(&self) -> f64 {
        self.log().length()
    }

    /// The 3x3 rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// The inverse rotation.
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }
}

impl std::ops::Mul<SO3> for SO3 {
    type Output = SO3;

    fn mul(self, rhs: SO3) -> Self::Output {
        Self::from_quaternion(self.q * rhs.q)
    }
}

impl std::ops::Mul<DVec3> for SO3 {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> Self::Output {
        self.q * rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_identity() {
        assert_eq!(SO3::IDENTITY.matrix(), DMat3::IDENTITY);
        assert_eq!(SO3::exp(DVec3::ZERO), SO3::IDENTITY);
    }

    #[test]
    fn test_from_matrix() {
        // 90 degrees about x: y -> z, z -> -y
        let mat = DMat3::from_cols(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, -1.0, 0.0),
        );
        let so3 = SO3::from_matrix(&mat);
        let log = so3.log();
        assert_relative_eq!(log.x, std::f64::consts::FRAC_PI_2, epsilon = EPSILON);
        assert_relative_eq!(log.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(log.z, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_exp_log() {
        let v = DVec3::new(0.1, -0.4, 0.25);
        let log = SO3::exp(v).log();
        assert_relative_eq!(log.x, v.x, epsilon = EPSILON);
        assert_relative_eq!(log.y, v.y, epsilon = EPSILON);
        assert_relative_eq!(log.z, v.z, epsilon = EPSILON);
    }

    #[test]
    fn test_inverse() {
        let so3 = SO3::from_random();
        let identity = so3.matrix() * so3.inverse().matrix();
        let max_diff = (identity - DMat3::IDENTITY)
            .to_cols_array()
            .iter()
            .map(|x| x.abs())
            .fold(0.0, f64::max);
        assert!(max_diff < EPSILON);
    }

    #[test]
    fn test_matrix_is_proper() {
        for _ in 0..10 {
            let so3 = SO3::from_random() * SO3::from_random();
            assert_relative_eq!(so3.matrix().determinant(), 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_mul_vec3() {
        let so3 = SO3::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2);
        let v = so3 * DVec3::X;
        assert_relative_eq!(v.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(v.y, 1.0, epsilon = EPSILON);
        assert_relative_eq!(v.z, 0.0, epsilon = EPSILON);
    }
}
