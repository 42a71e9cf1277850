use std::fmt::Debug;
use std::str::FromStr;

use faer::{ColRef, MatRef};
use glam::{DMat2, DMat3, DVec2, DVec3};
use pointreg_lie::{se2::SE2, se3::SE3, so2::SO2, so3::SO3};
use serde::{Deserialize, Serialize};

use crate::point::Point;

/// Spatial dimension of a registration problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// Planar registration with SE(2) transforms.
    Two,
    /// Spatial registration with SE(3) transforms.
    Three,
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2" | "2d" | "two" => Ok(Dimension::Two),
            "3" | "3d" | "three" => Ok(Dimension::Three),
            _ => Err(format!("unsupported dimension `{s}`, expected 2 or 3")),
        }
    }
}

/// A rigid transform acting on points of a fixed dimension.
///
/// `a.compose(&b)` is the transform that applies `b` first and `a` second, so
/// `a.compose(&b).transform_point(p) == a.transform_point(&b.transform_point(p))`.
pub trait RigidTransform: Copy + Debug + Send + Sync + 'static {
    /// The point type the transform acts on.
    type Point: Point;

    /// The dimension of the transform.
    const DIMENSION: Dimension;

    /// The identity transform.
    fn identity() -> Self;

    /// The transform applying `other` first and `self` second.
    fn compose(&self, other: &Self) -> Self;

    /// The inverse transform.
    fn inverse(&self) -> Self;

    /// Apply the transform to a point.
    fn transform_point(&self, point: &Self::Point) -> Self::Point;

    /// Build a transform from a `d x d` proper rotation matrix and a translation.
    ///
    /// PRECONDITION: `rotation` is `d x d` and `translation` has `d` rows.
    fn from_rotation_translation(rotation: MatRef<'_, f64>, translation: ColRef<'_, f64>) -> Self;

    /// Apply the transform in place to every point of a slice.
    fn transform_points_inplace(&self, points: &mut [Self::Point]) {
        for p in points.iter_mut() {
            *p = self.transform_point(p);
        }
    }
}

impl RigidTransform for SE2 {
    type Point = [f64; 2];

    const DIMENSION: Dimension = Dimension::Two;

    fn identity() -> Self {
        SE2::IDENTITY
    }

    fn compose(&self, other: &Self) -> Self {
        *self * *other
    }

    fn inverse(&self) -> Self {
        SE2::inverse(self)
    }

    #[inline]
    fn transform_point(&self, point: &[f64; 2]) -> [f64; 2] {
        self.transform(DVec2::from_array(*point)).to_array()
    }

    fn from_rotation_translation(rotation: MatRef<'_, f64>, translation: ColRef<'_, f64>) -> Self {
        let r = DMat2::from_cols(
            DVec2::new(rotation.read(0, 0), rotation.read(1, 0)),
            DVec2::new(rotation.read(0, 1), rotation.read(1, 1)),
        );
        SE2::new(
            SO2::from_matrix(r),
            DVec2::new(translation.read(0), translation.read(1)),
        )
    }
}

impl RigidTransform for SE3 {
    type Point = [f64; 3];

    const DIMENSION: Dimension = Dimension::Three;

    fn identity() -> Self {
        SE3::IDENTITY
    }

    fn compose(&self, other: &Self) -> Self {
        *self * *other
    }

    fn inverse(&self) -> Self {
        SE3::inverse(self)
    }

    #[inline]
    fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        self.transform(DVec3::from_array(*point)).to_array()
    }

    fn from_rotation_translation(rotation: MatRef<'_, f64>, translation: ColRef<'_, f64>) -> Self {
        let column = |j: usize| DVec3::new(rotation.read(0, j), rotation.read(1, j), rotation.read(2, j));
        let r = DMat3::from_cols(column(0), column(1), column(2));
        SE3::new(
            SO3::from_matrix(&r),
            DVec3::new(translation.read(0), translation.read(1), translation.read(2)),
        )
    }
}
