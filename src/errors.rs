use thiserror::Error;

/// Which side of the radius bracket a calibration search was trying to establish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketSide {
    /// The small radius which produces at least the target count
    Lower,

    /// The large radius which produces at most the target count
    Upper,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("The mesh has no faces")]
    EmptyMesh,

    #[error("The total area of the sampled faces is zero")]
    ZeroArea,

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Grid occupancy stayed above the ceiling after {rebuilds} rebuilds")]
    GridOccupancy { rebuilds: usize },

    #[error(
        "No {side:?} radius bracket found after {iterations} trials (last count was {count})"
    )]
    BracketNotFound {
        side: BracketSide,
        iterations: usize,
        count: usize,
    },
}
