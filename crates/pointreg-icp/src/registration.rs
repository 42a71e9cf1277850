use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    config::RegistrationConfig,
    correspondence::{find_correspondences, CorrespondenceModel, Correspondences, KdTreeIndex, Match},
    error::IcpError,
    estimator::fit_transformation,
    point::Point,
    stopping::StoppingCondition,
    transform::RigidTransform,
};

/// Lifecycle of a [`Registration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// No run has started yet.
    Initialized,
    /// A run is in progress.
    Iterating,
    /// The last run stopped because the stopping condition finished.
    Converged,
    /// The last run returned an error.
    Failed,
}

/// Outcome of a registration run.
///
/// The transformation maps the original source points onto the destination frame.
#[derive(Debug, Clone, Copy)]
pub struct IcpResult<T> {
    /// Accumulated source to destination transform.
    pub transform: T,
    /// Mean squared distance of the matched pairs of the last iteration, after its update.
    pub mean_squared_error: f64,
    /// Number of source points matched in the last iteration.
    pub matched_count: usize,
    /// Number of completed iterations.
    pub num_iterations: usize,
}

/// Iterative Closest Point registration engine using point to point distance.
///
/// The engine owns a [`CorrespondenceModel`] over the destination cloud and a
/// [`StoppingCondition`] template. Each call to [`Registration::process`] runs on a fresh copy
/// of the stopping condition, so the same engine can be reused for many source clouds.
///
/// If a run fails, the accessors keep reporting the values of the last completed iteration
/// of that run, or the initial values when no iteration completed.
pub struct Registration<T: RigidTransform, M> {
    config: RegistrationConfig,
    model: Option<M>,
    stopping: Box<dyn StoppingCondition>,
    initial_transform: T,
    cancel: Option<Arc<AtomicBool>>,

    state: RegistrationState,
    transform: T,
    mean_squared_error: f64,
    matched_count: usize,
    num_iterations: usize,

    // scratch buffers reused across iterations and runs
    matches: Vec<Match<T::Point>>,
    correspondences: Correspondences<T::Point>,
}

impl<T, M> Registration<T, M>
where
    T: RigidTransform,
    M: CorrespondenceModel<T::Point>,
{
    /// Create an engine with the stopping policy of `config` and no model.
    pub fn new(config: RegistrationConfig) -> Self {
        let stopping = config.stopping.build();
        Self {
            config,
            model: None,
            stopping,
            initial_transform: T::identity(),
            cancel: None,
            state: RegistrationState::Initialized,
            transform: T::identity(),
            mean_squared_error: f64::INFINITY,
            matched_count: 0,
            num_iterations: 0,
            matches: Vec::new(),
            correspondences: Correspondences::default(),
        }
    }

    /// Replace the stopping condition built from the configuration with a custom one.
    pub fn with_stopping_condition(mut self, stopping: Box<dyn StoppingCondition>) -> Self {
        self.stopping = stopping;
        self
    }

    /// Set the correspondence model backed by the destination cloud.
    pub fn set_model(&mut self, model: M) {
        self.model = Some(model);
    }

    /// The correspondence model, if set.
    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Mutable access to the correspondence model, e.g. to replace its reference cloud.
    pub fn model_mut(&mut self) -> Option<&mut M> {
        self.model.as_mut()
    }

    /// Set the transform applied to the source cloud before the first iteration.
    ///
    /// ICP only converges from a reasonable initial alignment; the reported transform
    /// includes this initial guess.
    pub fn set_initial_transform(&mut self, initial_transform: T) {
        self.initial_transform = initial_transform;
    }

    /// Install a flag checked at the top of every iteration. Setting it to `true` makes the
    /// run stop with [`IcpError::Cancelled`] before the next iteration starts.
    pub fn set_cancel_flag(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    /// The configuration.
    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Accumulated transform mapping the original source points onto the destination.
    pub fn transform(&self) -> T {
        self.transform
    }

    /// Mean squared error of the last completed iteration.
    pub fn mean_squared_error(&self) -> f64 {
        self.mean_squared_error
    }

    /// Number of source points matched in the last completed iteration.
    pub fn matched_count(&self) -> usize {
        self.matched_count
    }

    /// Number of completed iterations of the last run.
    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    /// Correspondences found by the last iteration that started, before its update.
    pub fn correspondences(&self) -> &Correspondences<T::Point> {
        &self.correspondences
    }

    /// Snapshot of the outputs.
    pub fn result(&self) -> IcpResult<T> {
        IcpResult {
            transform: self.transform,
            mean_squared_error: self.mean_squared_error,
            matched_count: self.matched_count,
            num_iterations: self.num_iterations,
        }
    }

    /// Register `source` onto the destination cloud held by the model.
    ///
    /// The source points are transformed in place; on return they sit at
    /// `self.transform()` applied to their original positions. Points without a match in
    /// an iteration do not take part in the estimation but still move with the cloud.
    ///
    /// # Errors
    ///
    /// * [`IcpError::InvalidConfig`], [`IcpError::EmptySource`], [`IcpError::MissingModel`],
    ///   [`IcpError::EmptyReference`] before any iteration.
    /// * [`IcpError::NoCorrespondence`] when an iteration matches no point.
    /// * Any estimator error for the matched pairs.
    /// * [`IcpError::Cancelled`] when the cancel flag is raised.
    /// * [`IcpError::IterationLimit`] when `max_iterations_hard` iterations completed
    ///   without the stopping condition finishing.
    pub fn process(&mut self, source: &mut [T::Point]) -> Result<(), IcpError> {
        let result = self.run(source);
        if let Err(err) = &result {
            self.state = RegistrationState::Failed;
            log::warn!(
                "ICP failed after {} iterations: {}",
                self.num_iterations,
                err
            );
        }
        result
    }

    fn run(&mut self, source: &mut [T::Point]) -> Result<(), IcpError> {
        self.config.validate()?;
        if source.is_empty() {
            return Err(IcpError::EmptySource);
        }
        let model = self.model.as_ref().ok_or(IcpError::MissingModel)?;
        if model.is_empty() {
            return Err(IcpError::EmptyReference);
        }

        // private copy of the policy so the template is never mutated
        let mut stopping = self.stopping.box_clone();
        stopping.reset();

        self.state = RegistrationState::Iterating;
        self.transform = self.initial_transform;
        self.mean_squared_error = f64::INFINITY;
        self.matched_count = 0;
        self.num_iterations = 0;

        self.initial_transform.transform_points_inplace(source);

        let max_distance_squared = self.config.max_distance_squared;
        for iteration in 0..self.config.max_iterations_hard {
            if self
                .cancel
                .as_ref()
                .is_some_and(|cancel| cancel.load(Ordering::Relaxed))
            {
                return Err(IcpError::Cancelled { iteration });
            }

            // NOTE: for debugging purposes, we measure the time taken for each iteration
            log::debug!("Iteration: {}", iteration);
            let now = std::time::Instant::now();

            // find closest points between current source and target
            find_correspondences(
                source,
                model,
                max_distance_squared,
                self.config.parallel,
                &mut self.matches,
                &mut self.correspondences,
            );
            let corr = &self.correspondences;
            log::debug!("Num correspondences: {}/{}", corr.len(), source.len());

            if corr.is_empty() {
                return Err(IcpError::NoCorrespondence { iteration });
            }

            // compute the incremental transformation between the matched pairs
            let delta: T = fit_transformation(&corr.source, &corr.target)?;

            // move the whole cloud, matched or not
            delta.transform_points_inplace(source);

            // T_total <- T_delta * T_total
            self.transform = delta.compose(&self.transform);

            let mse = corr
                .source
                .iter()
                .zip(corr.target.iter())
                .map(|(p_src, p_dst)| delta.transform_point(p_src).squared_distance(p_dst))
                .sum::<f64>()
                / corr.len() as f64;

            self.mean_squared_error = mse;
            self.matched_count = corr.len();
            self.num_iterations += 1;

            log::debug!("mse: {:e} elapsed: {:?}", mse, now.elapsed());

            if stopping.is_finished(mse) {
                log::debug!("ICP converged in {} iterations with error {:e}", iteration + 1, mse);
                self.state = RegistrationState::Converged;
                return Ok(());
            }
        }

        Err(IcpError::IterationLimit {
            limit: self.config.max_iterations_hard,
        })
    }
}

/// Register a source cloud onto a destination cloud.
///
/// Builds the correspondence backend selected by `config` over `destination`, applies
/// `initial_transform` to `source` and iterates until the stopping policy finishes.
///
/// # Arguments
///
/// * `source` - Source points, transformed in place.
/// * `destination` - Destination points.
/// * `initial_transform` - Initial guess of the source to destination transform.
/// * `config` - Registration parameters.
///
/// # Returns
///
/// The accumulated transform, final error, matched count and number of iterations.
///
/// Example:
///
/// ```
/// use pointreg_icp::{register, RegistrationConfig, RigidTransform};
/// use pointreg_lie::se3::SE3;
///
/// let destination = vec![
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ];
/// let mut source = destination
///     .iter()
///     .map(|p| [p[0] + 0.1, p[1] - 0.05, p[2]])
///     .collect::<Vec<_>>();
///
/// let result = register(&mut source, &destination, SE3::identity(), &Default::default()).unwrap();
/// assert!((result.transform.t.x + 0.1).abs() < 1e-9);
/// assert!(result.mean_squared_error < 1e-12);
/// ```
pub fn register<T, const K: usize>(
    source: &mut [[f64; K]],
    destination: &[[f64; K]],
    initial_transform: T,
    config: &RegistrationConfig,
) -> Result<IcpResult<T>, IcpError>
where
    T: RigidTransform<Point = [f64; K]>,
    KdTreeIndex<K>: CorrespondenceModel<[f64; K]>,
{
    let mut registration = Registration::<T, _>::new(config.clone());
    registration.set_model(config.backend.build(destination));
    registration.set_initial_transform(initial_transform);
    registration.process(source)?;
    Ok(registration.result())
}
