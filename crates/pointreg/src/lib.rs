//! Rigid registration of 2D and 3D point clouds.
//!
//! - [`lie`]: rigid body groups used to express alignments.
//! - [`icp`]: motion estimation, correspondence search and the ICP engine.

#[doc(inline)]
pub use pointreg_lie as lie;

#[doc(inline)]
pub use pointreg_icp as icp;
