use crate::so2::SO2;
use glam::{DMat3, DVec2, DVec3};
use rand::Rng;

/// A planar rigid transform `p ↦ R p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE2 {
    /// Rotation part.
    pub r: SO2,
    /// Translation part.
    pub t: DVec2,
}

impl SE2 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        r: SO2::IDENTITY,
        t: DVec2::ZERO,
    };

    /// Create a transform from a rotation and a translation.
    pub fn new(r: SO2, t: DVec2) -> Self {
        Self { r, t }
    }

    /// Create a transform from a 3x3 homogeneous matrix.
    pub fn from_matrix(mat: DMat3) -> Self {
        Self {
            r: SO2::from_cos_sin(mat.x_axis.x, mat.x_axis.y),
            t: DVec2::new(mat.z_axis.x, mat.z_axis.y),
        }
    }

    /// Sample a transform with a uniform angle and a translation in `[0, 1)²`.
    pub fn from_random() -> Self {
        let mut rng = rand::rng();
        Self {
            r: SO2::from_random(),
            t: DVec2::new(rng.random(), rng.random()),
        }
    }

    /// The 3x3 homogeneous matrix.
    pub fn matrix(&self) -> DMat3 {
        let r = self.r.matrix();
        DMat3::from_cols(
            r.x_axis.extend(0.0),
            r.y_axis.extend(0.0),
            DVec3::new(self.t.x, self.t.y, 1.0),
        )
    }

    /// The inverse transform `p ↦ Rᵀ (p - t)`.
    pub fn inverse(&self) -> Self {
        let r_inv = self.r.inverse();
        Self {
            r: r_inv,
            t: r_inv * (-self.t),
        }
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform(&self, p: DVec2) -> DVec2 {
        self.r * p + self.t
    }
}

impl std::ops::Mul<SE2> for SE2 {
    type Output = SE2;

    fn mul(self, other: SE2) -> SE2 {
        SE2::new(self.r * other.r, self.r * other.t + self.t)
    }
}

impl std::ops::Mul<DVec2> for SE2 {
    type Output = DVec2;

    fn mul(self, rhs: DVec2) -> Self::Output {
        self.transform(rhs)
    }
}
