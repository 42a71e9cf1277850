use std::fmt::Debug;

/// A fixed dimension point with `f64` coordinates.
///
/// Implemented for `[f64; D]`, which is the point representation used throughout the crate.
pub trait Point: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Number of coordinates.
    const DIM: usize;

    /// The coordinates as a slice of length [`Point::DIM`].
    fn coords(&self) -> &[f64];

    /// Squared euclidean distance to `other`.
    #[inline]
    fn squared_distance(&self, other: &Self) -> f64 {
        self.coords()
            .iter()
            .zip(other.coords())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl<const D: usize> Point for [f64; D] {
    const DIM: usize = D;

    #[inline]
    fn coords(&self) -> &[f64] {
        self
    }
}

/// Compute the centroid of a set of points as a column vector of length `P::DIM`.
///
/// Returns a zero vector for an empty set.
pub fn centroid<P: Point>(points: &[P]) -> faer::Col<f64> {
    if points.is_empty() {
        return faer::Col::zeros(P::DIM);
    }
    let n = points.len() as f64;
    faer::Col::from_fn(P::DIM, |i| {
        points.iter().map(|p| p.coords()[i]).sum::<f64>() / n
    })
}
