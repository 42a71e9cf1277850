use glam::{DMat2, DVec2};
use rand::Rng;

/// A planar rotation stored as the unit complex number `z = cos θ + i sin θ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO2 {
    /// Unit complex number `(cos θ, sin θ)`.
    pub z: DVec2,
}

impl SO2 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        z: DVec2::new(1.0, 0.0),
    };

    /// Create a rotation from its cosine and sine, renormalizing to unit length.
    ///
    /// A zero vector yields the identity.
    pub fn from_cos_sin(cos_theta: f64, sin_theta: f64) -> Self {
        let z = DVec2::new(cos_theta, sin_theta);
        match z.try_normalize() {
            Some(z) => Self { z },
            None => Self::IDENTITY,
        }
    }

    /// Create a rotation from an angle in radians.
    pub fn exp(theta: f64) -> Self {
        Self {
            z: DVec2::new(theta.cos(), theta.sin()),
        }
    }

    /// The rotation angle in radians, in `(-π, π]`.
    pub fn log(&self) -> f64 {
        self.z.y.atan2(self.z.x)
    }

    /// Create a rotation from a 2x2 rotation matrix.
    ///
    /// Only the first column is read; it is renormalized so the result is always a proper
    /// rotation.
    pub fn from_matrix(mat: DMat2) -> Self {
        Self::from_cos_sin(mat.x_axis.x, mat.x_axis.y)
    }

    /// Sample a rotation with a uniformly distributed angle.
    pub fn from_random() -> Self {
        let mut rng = rand::rng();
        let theta: f64 = rng.random_range(-std::f64::consts::PI..std::f64::consts::PI);
        Self::exp(theta)
    }

    /// The 2x2 rotation matrix.
    pub fn matrix(&self) -> DMat2 {
        DMat2::from_cols_array(&[self.z.x, self.z.y, -self.z.y, self.z.x])
    }

    /// The inverse rotation (complex conjugate).
    pub fn inverse(&self) -> Self {
        Self {
            z: DVec2::new(self.z.x, -self.z.y),
        }
    }
}

impl std::ops::Mul<SO2> for SO2 {
    type Output = SO2;

    fn mul(self, rhs: SO2) -> Self::Output {
        // complex multiplication, renormalized to keep |z| = 1 under long compositions
        Self::from_cos_sin(
            self.z.x * rhs.z.x - self.z.y * rhs.z.y,
            self.z.x * rhs.z.y + self.z.y * rhs.z.x,
        )
    }
}

impl std::ops::Mul<DVec2> for SO2 {
    type Output = DVec2;

    fn mul(self, rhs: DVec2) -> Self::Output {
        DVec2::new(
            self.z.x * rhs.x - self.z.y * rhs.y,
            self.z.y * rhs.x + self.z.x * rhs.y,
        )
    }
}
