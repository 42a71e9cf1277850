use serde::{Deserialize, Serialize};

use crate::{correspondence::CorrespondenceBackend, error::IcpError, stopping::StoppingPolicy};

/// Parameters of a registration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Correspondences at or beyond this squared distance are rejected.
    pub max_distance_squared: f64,
    /// When to stop iterating.
    pub stopping: StoppingPolicy,
    /// Backend answering nearest point queries, used by [`crate::register`].
    pub backend: CorrespondenceBackend,
    /// Run the correspondence queries of an iteration on the rayon thread pool.
    pub parallel: bool,
    /// Upper bound on iterations, enforced whatever the stopping policy says.
    pub max_iterations_hard: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_distance_squared: 1.0,
            stopping: StoppingPolicy::default(),
            backend: CorrespondenceBackend::default(),
            parallel: false,
            max_iterations_hard: 1000,
        }
    }
}

impl RegistrationConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), IcpError> {
        if self.max_distance_squared.is_nan() || self.max_distance_squared <= 0.0 {
            return Err(IcpError::InvalidConfig(format!(
                "max_distance_squared must be positive, got {}",
                self.max_distance_squared
            )));
        }
        if self.max_iterations_hard == 0 {
            return Err(IcpError::InvalidConfig(
                "max_iterations_hard must be positive".to_string(),
            ));
        }
        self.stopping.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RegistrationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = RegistrationConfig {
            max_distance_squared: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(IcpError::InvalidConfig(_))));

        let config = RegistrationConfig {
            max_iterations_hard: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RegistrationConfig {
            max_distance_squared: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let config = RegistrationConfig {
            max_distance_squared: 0.25,
            stopping: StoppingPolicy::AnyOf(vec![
                StoppingPolicy::MaxIterations(20),
                StoppingPolicy::RelativeErrorDelta(1e-4),
            ]),
            backend: CorrespondenceBackend::BruteForce,
            parallel: true,
            max_iterations_hard: 50,
        };
        let json = serde_json::to_string(&config)?;
        let decoded: RegistrationConfig = serde_json::from_str(&json)?;
        assert_eq!(decoded, config);

        // missing fields fall back to the defaults
        let partial: RegistrationConfig = serde_json::from_str(r#"{"parallel": true}"#)?;
        assert!(partial.parallel);
        assert_eq!(partial.max_iterations_hard, 1000);
        Ok(())
    }
}
