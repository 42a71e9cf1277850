use crate::so3::SO3;
use glam::{DMat4, DVec3, DVec4};
use rand::Rng;

/// A spatial rigid transform `p ↦ R p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    /// Rotation part.
    pub r: SO3,
    /// Translation part.
    pub t: DVec3,
}

impl SE3 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        r: SO3::IDENTITY,
        t: DVec3::ZERO,
    };

    /// Create a transform from a rotation and a translation.
    pub fn new(r: SO3, t: DVec3) -> Self {
        Self { r, t }
    }

    /// Create a transform from an axis, an angle and a translation.
    pub fn from_axis_angle(axis: DVec3, angle: f64, t: DVec3) -> Self {
        Self {
            r: SO3::from_axis_angle(axis, angle),
            t,
        }
    }

    /// Sample a transform with a uniform rotation and a translation in `[0, 1)³`.
    pub fn from_random() -> Self {
        let mut rng = rand::rng();
        Self {
            r: SO3::from_random(),
            t: DVec3::new(rng.random(), rng.random(), rng.random()),
        }
    }

    /// The 4x4 homogeneous matrix.
    pub fn matrix(&self) -> DMat4 {
        let mut mat = DMat4::from_quat(self.r.q);
        mat.w_axis = DVec4::new(self.t.x, self.t.y, self.t.z, 1.0);
        mat
    }

    /// The inverse transform `p ↦ Rᵀ (p - t)`.
    pub fn inverse(&self) -> Self {
        let r_inv = self.r.inverse();
        Self {
            r: r_inv,
            t: -(r_inv * self.t),
        }
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform(&self, p: DVec3) -> DVec3 {
        self.r * p + self.t
    }
}

impl std::ops::Mul<SE3> for SE3 {
    type Output = SE3;

    fn mul(self, other: SE3) -> SE3 {
        SE3::new(self.r * other.r, self.r * other.t + self.t)
    }
}

impl std::ops::Mul<DVec3> for SE3 {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> Self::Output {
        self.transform(rhs)
    }
}
