//! Converts triangle meshes into point clouds, either as dense area-weighted random samples or as
//! a blue-noise (Poisson disk) subset whose size is calibrated to a requested point count.
//!
//! All randomness flows through a caller-owned [`SampleRng`], so a fixed seed reproduces every
//! output exactly.

use std::error::Error;

pub mod common;
pub mod errors;
pub mod geom3;

pub use common::random::{DrawSource, SampleRng, shuffle};
pub use common::spatial_hash::SpatialHashGrid;
pub use errors::{BracketSide, SamplingError};
pub use geom3::mesh::{Calibration, Mesh, PoissonParams};
pub use geom3::point_cloud::{PointCloud, PointCloudFeatures};
pub use geom3::{Aabb, Point3, Vector3};

pub type Result<T> = std::result::Result<T, Box<dyn Error>>;
