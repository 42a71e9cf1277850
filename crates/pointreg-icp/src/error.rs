/// Errors returned by the motion estimator and the registration engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IcpError {
    /// The source cloud handed to the engine is empty.
    #[error("Source point cloud is empty")]
    EmptySource,

    /// The correspondence model holds no reference points.
    #[error("Reference point cloud is empty")]
    EmptyReference,

    /// No correspondence model was supplied before processing.
    #[error("No correspondence model was set")]
    MissingModel,

    /// The two correspondence lists have different lengths.
    #[error("Mismatched correspondence lists: source ({source_len}) != destination ({destination_len})")]
    MismatchedLengths {
        /// Length of the source list.
        source_len: usize,
        /// Length of the destination list.
        destination_len: usize,
    },

    /// Too few point pairs to determine a rigid transform.
    #[error("Motion estimation requires at least {required} point pairs, got {actual}")]
    NotEnoughPoints {
        /// Minimum number of pairs.
        required: usize,
        /// Number of pairs provided.
        actual: usize,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cross-covariance is rank deficient and the rotation is not unique.
    #[error("Degenerate geometry: rotation is undetermined (smallest singular value {smallest_singular_value:e})")]
    DegenerateGeometry {
        /// Smallest singular value of the cross-covariance matrix.
        smallest_singular_value: f64,
    },

    /// An iteration found no point within the distance threshold.
    #[error("No correspondences found at iteration {iteration}")]
    NoCorrespondence {
        /// Zero based iteration index.
        iteration: usize,
    },

    /// The decomposition produced non-finite values.
    #[error("Numerical failure: {0}")]
    Numerical(String),

    /// The run was cancelled between iterations.
    #[error("Registration cancelled before iteration {iteration}")]
    Cancelled {
        /// Zero based index of the iteration that did not start.
        iteration: usize,
    },

    /// The hard iteration bound was reached before the stopping condition finished.
    #[error("Registration did not finish within {limit} iterations")]
    IterationLimit {
        /// The configured hard bound.
        limit: usize,
    },
}
