use serde::{Deserialize, Serialize};

use crate::error::IcpError;

/// Convergence policy consulted once per registration iteration.
///
/// A condition carries configuration (thresholds, caps) plus private per-run state. The
/// engine never mutates the caller's instance: it calls [`StoppingCondition::box_clone`] at
/// the start of every run and [`StoppingCondition::reset`]s the copy.
pub trait StoppingCondition: Send + std::fmt::Debug {
    /// Clear the per-run state.
    fn reset(&mut self);

    /// Record the error of the iteration that just completed and decide whether to stop.
    fn is_finished(&mut self, error: f64) -> bool;

    /// An independent copy with the same configuration and fresh state.
    fn box_clone(&self) -> Box<dyn StoppingCondition>;
}

impl Clone for Box<dyn StoppingCondition> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Stop after a fixed number of iterations.
#[derive(Debug, Clone)]
pub struct MaxIterations {
    max_iterations: usize,
    count: usize,
}

impl MaxIterations {
    /// Stop once `max_iterations` iterations have completed.
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            count: 0,
        }
    }
}

impl StoppingCondition for MaxIterations {
    fn reset(&mut self) {
        self.count = 0;
    }

    fn is_finished(&mut self, _error: f64) -> bool {
        self.count += 1;
        self.count >= self.max_iterations
    }

    fn box_clone(&self) -> Box<dyn StoppingCondition> {
        Box::new(Self::new(self.max_iterations))
    }
}

/// Stop once the error drops to or below an absolute threshold.
#[derive(Debug, Clone)]
pub struct ErrorThreshold {
    threshold: f64,
}

impl ErrorThreshold {
    /// Stop once `error <= threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl StoppingCondition for ErrorThreshold {
    fn reset(&mut self) {}

    fn is_finished(&mut self, error: f64) -> bool {
        error <= self.threshold
    }

    fn box_clone(&self) -> Box<dyn StoppingCondition> {
        Box::new(self.clone())
    }
}

/// Stop once the error changes by less than `tolerance` between consecutive iterations.
///
/// Never finishes on the first iteration of a run.
#[derive(Debug, Clone)]
pub struct ErrorDelta {
    tolerance: f64,
    previous: Option<f64>,
}

impl ErrorDelta {
    /// Stop once `|previous - error| < tolerance`.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            previous: None,
        }
    }
}

impl StoppingCondition for ErrorDelta {
    fn reset(&mut self) {
        self.previous = None;
    }

    fn is_finished(&mut self, error: f64) -> bool {
        let finished = self
            .previous
            .is_some_and(|previous| (previous - error).abs() < self.tolerance);
        self.previous = Some(error);
        finished
    }

    fn box_clone(&self) -> Box<dyn StoppingCondition> {
        Box::new(Self::new(self.tolerance))
    }
}

/// Stop once the relative error improvement `|previous - error| / previous` drops below
/// `tolerance`. A previous error of zero finishes immediately.
#[derive(Debug, Clone)]
pub struct RelativeErrorDelta {
    tolerance: f64,
    previous: Option<f64>,
}

impl RelativeErrorDelta {
    /// Stop once the relative change is below `tolerance`.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            previous: None,
        }
    }
}

impl StoppingCondition for RelativeErrorDelta {
    fn reset(&mut self) {
        self.previous = None;
    }

    fn is_finished(&mut self, error: f64) -> bool {
        let finished = match self.previous {
            None => false,
            Some(previous) if previous <= f64::EPSILON => true,
            Some(previous) => (previous - error).abs() / previous < self.tolerance,
        };
        self.previous = Some(error);
        finished
    }

    fn box_clone(&self) -> Box<dyn StoppingCondition> {
        Box::new(Self::new(self.tolerance))
    }
}

/// Stop as soon as any member condition finishes.
///
/// Every member sees every error value, so counters and histories stay in step.
#[derive(Debug, Clone)]
pub struct AnyOf {
    conditions: Vec<Box<dyn StoppingCondition>>,
}

impl AnyOf {
    /// Combine the given conditions.
    pub fn new(conditions: Vec<Box<dyn StoppingCondition>>) -> Self {
        Self { conditions }
    }
}

impl StoppingCondition for AnyOf {
    fn reset(&mut self) {
        self.conditions.iter_mut().for_each(|c| c.reset());
    }

    fn is_finished(&mut self, error: f64) -> bool {
        self.conditions
            .iter_mut()
            .fold(false, |finished, c| c.is_finished(error) || finished)
    }

    fn box_clone(&self) -> Box<dyn StoppingCondition> {
        Box::new(self.clone())
    }
}

/// Serializable description of a stopping condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoppingPolicy {
    /// See [`MaxIterations`].
    MaxIterations(usize),
    /// See [`ErrorThreshold`].
    ErrorThreshold(f64),
    /// See [`ErrorDelta`].
    ErrorDelta(f64),
    /// See [`RelativeErrorDelta`].
    RelativeErrorDelta(f64),
    /// See [`AnyOf`].
    AnyOf(Vec<StoppingPolicy>),
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        StoppingPolicy::AnyOf(vec![
            StoppingPolicy::MaxIterations(100),
            StoppingPolicy::ErrorDelta(1e-6),
        ])
    }
}

impl StoppingPolicy {
    /// Check that every parameter is in range and that the policy can terminate on its own.
    pub fn validate(&self) -> Result<(), IcpError> {
        match self {
            StoppingPolicy::MaxIterations(0) => Err(IcpError::InvalidConfig(
                "max iterations must be positive".to_string(),
            )),
            StoppingPolicy::MaxIterations(_) => Ok(()),
            StoppingPolicy::ErrorThreshold(v)
            | StoppingPolicy::ErrorDelta(v)
            | StoppingPolicy::RelativeErrorDelta(v) => {
                if v.is_finite() && *v >= 0.0 {
                    Ok(())
                } else {
                    Err(IcpError::InvalidConfig(format!(
                        "stopping tolerance must be finite and non-negative, got {v}"
                    )))
                }
            }
            StoppingPolicy::AnyOf(policies) if policies.is_empty() => Err(
                IcpError::InvalidConfig("empty combined stopping policy".to_string()),
            ),
            StoppingPolicy::AnyOf(policies) => policies.iter().try_for_each(|p| p.validate()),
        }
    }

    /// Build the condition described by this policy.
    pub fn build(&self) -> Box<dyn StoppingCondition> {
        match self {
            StoppingPolicy::MaxIterations(n) => Box::new(MaxIterations::new(*n)),
            StoppingPolicy::ErrorThreshold(v) => Box::new(ErrorThreshold::new(*v)),
            StoppingPolicy::ErrorDelta(v) => Box::new(ErrorDelta::new(*v)),
            StoppingPolicy::RelativeErrorDelta(v) => Box::new(RelativeErrorDelta::new(*v)),
            StoppingPolicy::AnyOf(policies) => Box::new(AnyOf::new(
                policies.iter().map(StoppingPolicy::build).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_iterations() {
        let mut c = MaxIterations::new(3);
        assert!(!c.is_finished(1.0));
        assert!(!c.is_finished(1.0));
        assert!(c.is_finished(1.0));
        c.reset();
        assert!(!c.is_finished(1.0));
    }

    #[test]
    fn test_error_threshold() {
        let mut c = ErrorThreshold::new(0.5);
        assert!(!c.is_finished(0.6));
        assert!(c.is_finished(0.5));
        assert!(c.is_finished(0.1));
    }

    #[test]
    fn test_error_delta() {
        let mut c = ErrorDelta::new(0.01);
        // the first value has nothing to compare against
        assert!(!c.is_finished(0.0));
        assert!(!c.is_finished(1.0));
        assert!(!c.is_finished(0.5));
        assert!(c.is_finished(0.495));
        c.reset();
        assert!(!c.is_finished(0.495));
    }

    #[test]
    fn test_relative_error_delta() {
        let mut c = RelativeErrorDelta::new(0.1);
        assert!(!c.is_finished(10.0));
        assert!(!c.is_finished(5.0));
        assert!(c.is_finished(4.8));

        let mut c = RelativeErrorDelta::new(0.1);
        assert!(!c.is_finished(0.0));
        assert!(c.is_finished(0.0));
    }

    #[test]
    fn test_any_of_keeps_members_in_step() {
        let mut c = AnyOf::new(vec![
            Box::new(ErrorThreshold::new(0.0)),
            Box::new(MaxIterations::new(2)),
        ]);
        assert!(!c.is_finished(1.0));
        assert!(c.is_finished(1.0));

        // the threshold fires first but the counter still advances
        let mut c = AnyOf::new(vec![
            Box::new(ErrorThreshold::new(0.5)),
            Box::new(MaxIterations::new(2)),
        ]);
        assert!(c.is_finished(0.1));
        assert!(c.is_finished(9.0));
    }

    #[test]
    fn test_box_clone_has_fresh_state() {
        let mut original: Box<dyn StoppingCondition> = Box::new(MaxIterations::new(2));
        assert!(!original.is_finished(1.0));

        let mut copy = original.clone();
        assert!(!copy.is_finished(1.0));
        assert!(copy.is_finished(1.0));

        // the original keeps its own counter
        assert!(original.is_finished(1.0));
    }

    #[test]
    fn test_policy_validate() {
        assert!(StoppingPolicy::default().validate().is_ok());
        assert!(StoppingPolicy::MaxIterations(0).validate().is_err());
        assert!(StoppingPolicy::ErrorDelta(f64::NAN).validate().is_err());
        assert!(StoppingPolicy::ErrorThreshold(-1.0).validate().is_err());
        assert!(StoppingPolicy::AnyOf(vec![]).validate().is_err());
        assert!(StoppingPolicy::AnyOf(vec![StoppingPolicy::MaxIterations(0)])
            .validate()
            .is_err());
    }

    #[test]
    fn test_policy_build() {
        let mut c = StoppingPolicy::AnyOf(vec![
            StoppingPolicy::MaxIterations(10),
            StoppingPolicy::ErrorThreshold(1e-3),
        ])
        .build();
        assert!(!c.is_finished(1.0));
        assert!(c.is_finished(1e-4));
    }
}
