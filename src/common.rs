pub mod points;
pub mod random;
pub mod spatial_hash;
