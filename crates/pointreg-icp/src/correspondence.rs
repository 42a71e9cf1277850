use std::str::FromStr;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::point::Point;

/// Result of a nearest point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Match<P> {
    /// The nearest reference point within the threshold.
    Found {
        /// Copy of the matched reference point.
        point: P,
        /// Squared distance between the query and `point`.
        distance_squared: f64,
    },
    /// No reference point lies within the threshold.
    NotFound,
}

impl<P> Match<P> {
    /// The matched point, if any.
    pub fn point(&self) -> Option<&P> {
        match self {
            Match::Found { point, .. } => Some(point),
            Match::NotFound => None,
        }
    }

    /// Whether the query found a match.
    pub fn is_found(&self) -> bool {
        matches!(self, Match::Found { .. })
    }
}

/// Nearest point queries against a fixed reference cloud.
///
/// Implementations must be safe to query from several threads at once once the reference
/// is set, since correspondence search may run in parallel.
pub trait CorrespondenceModel<P: Point>: Send + Sync {
    /// Replace the reference cloud and rebuild any index over it.
    fn set_reference(&mut self, points: &[P]);

    /// Find the reference point nearest to `query` whose squared distance is strictly
    /// below `max_distance_squared`.
    fn find_nearest(&self, query: &P, max_distance_squared: f64) -> Match<P>;

    /// Number of reference points.
    fn len(&self) -> usize;

    /// Whether the reference cloud is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Point, M: CorrespondenceModel<P> + ?Sized> CorrespondenceModel<P> for Box<M> {
    fn set_reference(&mut self, points: &[P]) {
        (**self).set_reference(points)
    }

    fn find_nearest(&self, query: &P, max_distance_squared: f64) -> Match<P> {
        (**self).find_nearest(query, max_distance_squared)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Linear scan over the reference cloud.
///
/// Ties are resolved in favour of the first point in storage order.
#[derive(Debug, Clone, Default)]
pub struct BruteForce<P> {
    points: Vec<P>,
}

impl<P: Point> BruteForce<P> {
    /// Create a model over the given reference points.
    pub fn new(points: &[P]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl<P: Point> CorrespondenceModel<P> for BruteForce<P> {
    fn set_reference(&mut self, points: &[P]) {
        self.points.clear();
        self.points.extend_from_slice(points);
    }

    fn find_nearest(&self, query: &P, max_distance_squared: f64) -> Match<P> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d = query.squared_distance(p);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        match best {
            Some((i, d)) if d < max_distance_squared => Match::Found {
                point: self.points[i],
                distance_squared: d,
            },
            _ => Match::NotFound,
        }
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// Kd-tree index over the reference cloud.
///
/// The index is built once per [`CorrespondenceModel::set_reference`] call in `O(n log n)`;
/// each query costs `O(log n)` on average. Among equidistant candidates the returned point
/// is unspecified.
pub struct KdTreeIndex<const K: usize> {
    points: Vec<[f64; K]>,
    tree: Option<ImmutableKdTree<f64, u32, K, 32>>,
}

impl<const K: usize> Default for KdTreeIndex<K> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            tree: None,
        }
    }
}

impl<const K: usize> std::fmt::Debug for KdTreeIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTreeIndex")
            .field("num_points", &self.points.len())
            .finish()
    }
}

macro_rules! impl_kdtree_model {
    ($($k:literal),+) => {$(
        impl KdTreeIndex<$k> {
            /// Build an index over the given reference points.
            pub fn new(points: &[[f64; $k]]) -> Self {
                let mut index = Self::default();
                index.set_reference(points);
                index
            }
        }

        impl CorrespondenceModel<[f64; $k]> for KdTreeIndex<$k> {
            fn set_reference(&mut self, points: &[[f64; $k]]) {
                self.points = points.to_vec();
                self.tree = if points.is_empty() {
                    None
                } else {
                    Some(ImmutableKdTree::new_from_slice(points))
                };
            }

            fn find_nearest(&self, query: &[f64; $k], max_distance_squared: f64) -> Match<[f64; $k]> {
                let Some(tree) = &self.tree else {
                    return Match::NotFound;
                };
                let nn = tree.nearest_one::<kiddo::SquaredEuclidean>(query);
                match self.points.get(nn.item as usize) {
                    Some(point) if nn.distance < max_distance_squared => Match::Found {
                        point: *point,
                        distance_squared: nn.distance,
                    },
                    _ => Match::NotFound,
                }
            }

            fn len(&self) -> usize {
                self.points.len()
            }
        }
    )+};
}

impl_kdtree_model!(2, 3);

/// Backend used to answer nearest point queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrespondenceBackend {
    /// [`BruteForce`] linear scan.
    BruteForce,
    /// [`KdTreeIndex`] spatial index.
    #[default]
    KdTree,
}

impl FromStr for CorrespondenceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brute-force" | "brute_force" | "bruteforce" => Ok(CorrespondenceBackend::BruteForce),
            "kdtree" | "kd-tree" | "kd_tree" => Ok(CorrespondenceBackend::KdTree),
            _ => Err(format!(
                "unknown correspondence backend `{s}`, expected `brute-force` or `kdtree`"
            )),
        }
    }
}

impl CorrespondenceBackend {
    /// Build a model of this backend over the given reference points.
    pub fn build<const K: usize>(self, points: &[[f64; K]]) -> Box<dyn CorrespondenceModel<[f64; K]>>
    where
        KdTreeIndex<K>: CorrespondenceModel<[f64; K]>,
    {
        match self {
            CorrespondenceBackend::BruteForce => Box::new(BruteForce::new(points)),
            CorrespondenceBackend::KdTree => {
                let mut index = KdTreeIndex::<K>::default();
                index.set_reference(points);
                Box::new(index)
            }
        }
    }
}

/// Matched pairs of one iteration.
#[derive(Debug, Clone)]
pub struct Correspondences<P> {
    /// Matched source points.
    pub source: Vec<P>,
    /// Matched reference points, paired by index with `source`.
    pub target: Vec<P>,
    /// Squared distance of each pair.
    pub distances_squared: Vec<f64>,
}

impl<P> Default for Correspondences<P> {
    fn default() -> Self {
        Self {
            source: Vec::new(),
            target: Vec::new(),
            distances_squared: Vec::new(),
        }
    }
}

impl<P> Correspondences<P> {
    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether no pair was matched.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    fn clear(&mut self) {
        self.source.clear();
        self.target.clear();
        self.distances_squared.clear();
    }
}

/// Query every source point against `model` and collect the accepted pairs.
///
/// # Arguments
///
/// * `source` - The points to match.
/// * `model` - The reference model.
/// * `max_distance_squared` - Pairs at or beyond this squared distance are rejected.
/// * `parallel` - Run the queries on the rayon thread pool.
/// * `matches` - Scratch buffer with one slot per source point; resized as needed.
/// * `out` - Receives the accepted pairs in source order.
pub fn find_correspondences<P, M>(
    source: &[P],
    model: &M,
    max_distance_squared: f64,
    parallel: bool,
    matches: &mut Vec<Match<P>>,
    out: &mut Correspondences<P>,
) where
    P: Point,
    M: CorrespondenceModel<P> + ?Sized,
{
    matches.clear();
    matches.resize(source.len(), Match::NotFound);

    // each query writes its own slot; the reference index is read-only here
    if parallel {
        matches
            .par_iter_mut()
            .zip(source.par_iter())
            .for_each(|(slot, p)| *slot = model.find_nearest(p, max_distance_squared));
    } else {
        matches
            .iter_mut()
            .zip(source.iter())
            .for_each(|(slot, p)| *slot = model.find_nearest(p, max_distance_squared));
    }

    out.clear();
    for (p, m) in source.iter().zip(matches.iter()) {
        if let Match::Found {
            point,
            distance_squared,
        } = m
        {
            out.source.push(*p);
            out.target.push(*point);
            out.distances_squared.push(*distance_squared);
        }
    }
}
