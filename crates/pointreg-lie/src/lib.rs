#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Rigid body groups used to represent the alignment between two point clouds.
//!
//! ## Supported Groups
//!
//! - **SO(2)**: planar rotations, stored as a unit complex number.
//! - **SE(2)**: planar rigid transforms.
//! - **SO(3)**: spatial rotations, stored as a unit quaternion.
//! - **SE(3)**: spatial rigid transforms.
//!
//! Every constructor and composition renormalizes the rotation part, so a value of these
//! types is always a proper rotation (determinant +1).
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use pointreg_lie::se3::SE3;
//!
//! let a = SE3::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2, DVec3::X);
//! let p = a * DVec3::X;
//! assert!((p - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-12);
//! ```

/// Special Euclidean group SE(2) for 2D rigid transformations.
pub mod se2;

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(2) for 2D rotations.
pub mod so2;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;
