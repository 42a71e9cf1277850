#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The crate aligns a source point cloud onto a destination point cloud by alternating
//! nearest point matching and closed-form rigid motion estimation.
//!
//! ```rust
//! use glam::DVec2;
//! use pointreg_icp::{BruteForce, Registration, RegistrationConfig, RegistrationState};
//! use pointreg_lie::se2::SE2;
//!
//! let destination = vec![[0.0, 0.0], [2.0, 0.0], [0.0, 1.0], [1.0, 3.0]];
//! let mut source = destination
//!     .iter()
//!     .map(|p| [p[0] - 0.1, p[1] + 0.05])
//!     .collect::<Vec<_>>();
//!
//! let mut registration = Registration::<SE2, _>::new(RegistrationConfig::default());
//! registration.set_model(BruteForce::new(&destination));
//! registration.process(&mut source).unwrap();
//!
//! assert_eq!(registration.state(), RegistrationState::Converged);
//! assert!((registration.transform().t - DVec2::new(0.1, -0.05)).length() < 1e-9);
//! assert!(registration.transform().r.log().abs() < 1e-9);
//! ```

mod config;
pub use config::RegistrationConfig;

mod correspondence;
pub use correspondence::{
    find_correspondences, BruteForce, CorrespondenceBackend, CorrespondenceModel,
    Correspondences, KdTreeIndex, Match,
};

mod error;
pub use error::IcpError;

mod estimator;
pub use estimator::fit_transformation;

mod point;
pub use point::{centroid, Point};

mod registration;
pub use registration::{register, IcpResult, Registration, RegistrationState};

/// Stopping conditions consulted once per registration iteration.
pub mod stopping;
pub use stopping::{StoppingCondition, StoppingPolicy};

mod transform;
pub use transform::{Dimension, RigidTransform};
