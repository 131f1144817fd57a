//! Poisson disk pruning of dense surface samples, and the radius search which calibrates the
//! pruning so that it yields a requested number of points.

use super::Mesh;
use crate::common::random::DrawSource;
use crate::common::spatial_hash::{Cell, SpatialHashGrid};
use crate::errors::{BracketSide, SamplingError};
use crate::geom3::point_cloud::{PointCloud, PointCloudFeatures};
use parry3d_f64::bounding_volume::BoundingVolume;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The fraction of the surface covered by disks of the sampling radius in a typical Poisson disk
/// set, used to estimate a radius from a point count.
const PACKING_DENSITY: f64 = 0.7;

/// The starting radius of both bracket searches is the bounding box diagonal over this value.
const REFERENCE_SCALE_DIVISOR: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoissonParams {
    /// The accepted relative error in the final point count
    pub tolerance: f64,

    /// The maximum number of candidates in a cell which are compared when choosing the sample
    /// that removes the fewest neighbors
    pub pool_size: usize,

    /// The maximum number of bisection steps after the radius has been bracketed
    pub max_iter: usize,

    /// How many dense random candidates are drawn for every requested point on each trial
    pub candidate_rate: usize,

    /// The maximum number of halvings or doublings in each of the bracket searches
    pub max_bracket_iter: usize,
}

impl Default for PoissonParams {
    fn default() -> Self {
        Self {
            tolerance: 0.005,
            pool_size: 10,
            max_iter: 20,
            candidate_rate: 20,
            max_bracket_iter: 64,
        }
    }
}

impl PoissonParams {
    /// Creates a new set of calibration parameters, leaving the candidate rate and the bracket
    /// search limit at their defaults.
    ///
    /// # Arguments
    ///
    /// * `tolerance`: the accepted relative error in the final count, `0.005` means the count must
    ///   land within half a percent of the target
    /// * `pool_size`: the number of candidates per cell compared when picking each sample. Larger
    ///   values give a slightly more even distribution at the cost of more sphere counts.
    /// * `max_iter`: the bisection budget once the radius has been bracketed
    ///
    /// returns: PoissonParams
    pub fn new(tolerance: f64, pool_size: usize, max_iter: usize) -> Self {
        Self {
            tolerance,
            pool_size,
            max_iter,
            ..Self::default()
        }
    }

    /// Read parameters from a JSON document. Fields which are missing take their default values.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SamplingError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SamplingError::InvalidParameter(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.pool_size == 0 {
            return Err(SamplingError::InvalidParameter(
                "candidate pool size must be at least one".to_string(),
            ));
        }
        if self.candidate_rate == 0 {
            return Err(SamplingError::InvalidParameter(
                "candidate rate must be at least one".to_string(),
            ));
        }
        if self.max_bracket_iter == 0 {
            return Err(SamplingError::InvalidParameter(
                "bracket search limit must be at least one".to_string(),
            ));
        }
        Ok(())
    }
}

/// The outcome of a radius calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// The radius of the last trial, which produced the returned cloud
    pub radius: f64,

    /// The number of points in the returned cloud
    pub count: usize,

    /// The number of bisection steps taken
    pub iterations: usize,

    /// True if the count is within tolerance of the target. When this is false the bisection
    /// budget was used up.
    pub converged: bool,
}

impl Mesh {
    /// Estimate the radius which gives `count` samples in a Poisson disk distribution over the
    /// surface, assuming the disks cover about 70% of the area.
    pub fn estimate_poisson_radius(&self, count: usize) -> Result<f64, SamplingError> {
        if count == 0 {
            return Err(SamplingError::InvalidParameter(
                "cannot estimate a radius for zero samples".to_string(),
            ));
        }
        if self.total_area() <= 0.0 {
            return Err(SamplingError::ZeroArea);
        }
        Ok((self.total_area() / (PACKING_DENSITY * PI * count as f64)).sqrt())
    }

    /// Prune a dense set of candidate points down to a Poisson disk set with the given radius,
    /// appending the result to `out` and returning how many points were appended.
    ///
    /// Every mesh vertex is appended first as a seed, without checking seeds against each other,
    /// and removes the candidates within `radius` of it. Then the candidates' grid cells are
    /// visited in random order, and from each non-empty cell the candidate (among the first
    /// `pool_size`) whose sphere holds the fewest remaining candidates is accepted, after which
    /// every candidate within `radius` of it is removed. Sweeps repeat until no candidates remain,
    /// so accepted points are always more than `radius` apart from each other and from the seeds.
    ///
    /// The list of non-empty cells comes back from the grid in sorted order, so it is shuffled
    /// again after every sweep, not only before the first one.
    ///
    /// # Arguments
    ///
    /// * `out`: the cloud receiving the seeds and the accepted samples
    /// * `candidates`: the dense candidate points, usually from `sample_by_area`
    /// * `radius`: the minimum separation between accepted samples
    /// * `pool_size`: the number of candidates compared per cell, at least one
    /// * `rng`: the random draw source, used to shuffle the cell visiting order
    ///
    /// returns: Result<usize, SamplingError>
    pub fn prune_to_poisson_disk(
        &self,
        out: &mut PointCloud,
        candidates: &PointCloud,
        radius: f64,
        pool_size: usize,
        rng: &mut impl DrawSource,
    ) -> Result<usize, SamplingError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SamplingError::InvalidParameter(format!(
                "disk radius must be positive and finite, got {radius}"
            )));
        }
        if pool_size == 0 {
            return Err(SamplingError::InvalidParameter(
                "candidate pool size must be at least one".to_string(),
            ));
        }

        let points = candidates.points();
        let bbox = match candidates.aabb() {
            Some(c) => self.aabb().merged(&c),
            None => *self.aabb(),
        };
        let mut grid = SpatialHashGrid::for_disk_radius(points, &bbox, radius)?;
        let mut sample_count = 0;

        for v in self.vertices() {
            out.append(*v);
            sample_count += 1;
            grid.remove_in_sphere(v, radius);
        }
        grid.update_allocated_cells();
        grid.shuffle_allocated_cells(rng);

        let mut sweeps = 0;
        while !grid.allocated_cells().is_empty() {
            let cells = grid.allocated_cells().to_vec();
            for cell in &cells {
                if grid.empty_cell(cell) {
                    continue;
                }
                let Some(best) = best_candidate_in_cell(&grid, cell, radius, pool_size) else {
                    continue;
                };

                let p = points[best];
                out.append(p);
                sample_count += 1;
                grid.remove_in_sphere(&p, radius);
            }

            grid.update_allocated_cells();
            grid.shuffle_allocated_cells(rng);
            sweeps += 1;
        }

        log::trace!(
            "pruned {} candidates to {sample_count} samples at radius {radius:.6}, {sweeps} sweeps",
            points.len()
        );
        Ok(sample_count)
    }

    /// Search for the Poisson disk radius which gives `target` samples, within the relative
    /// tolerance of `params`. Each trial draws a fresh set of `target * candidate_rate` dense
    /// candidates and prunes them, replacing the contents of `out`.
    ///
    /// Starting from a radius of the bounding box diagonal over 50, the radius is halved until a
    /// trial gives at least `target` samples and, separately, doubled from the same start until a
    /// trial gives at most `target`. The bracket is then bisected until the count is within
    /// tolerance or `max_iter` steps have been taken. On return `out` holds the cloud of the last
    /// trial.
    ///
    /// # Arguments
    ///
    /// * `out`: the cloud which receives the final samples, any previous content is discarded
    /// * `target`: the requested number of samples, must be positive
    /// * `params`: the tolerance, pool size, and iteration limits
    /// * `rng`: the random draw source
    ///
    /// returns: Result<Calibration, SamplingError>
    pub fn calibrate_to_count(
        &self,
        out: &mut PointCloud,
        target: usize,
        params: &PoissonParams,
        rng: &mut impl DrawSource,
    ) -> Result<Calibration, SamplingError> {
        params.validate()?;
        if target == 0 {
            return Err(SamplingError::InvalidParameter(
                "target count must be positive".to_string(),
            ));
        }
        if self.total_area() <= 0.0 {
            return Err(SamplingError::ZeroArea);
        }

        let dense_count = target.checked_mul(params.candidate_rate).ok_or_else(|| {
            SamplingError::InvalidParameter(format!(
                "{target} targets at a candidate rate of {} overflows",
                params.candidate_rate
            ))
        })?;

        let min_count = target as f64 * (1.0 - params.tolerance);
        let max_count = target as f64 * (1.0 + params.tolerance);
        let in_tolerance = |count: usize| (min_count..=max_count).contains(&(count as f64));

        let mut trial = Trial {
            mesh: self,
            candidates: PointCloud::with_capacity(dense_count),
            dense_count,
            pool_size: params.pool_size,
            target,
        };

        // A smaller radius gives more points, so the radius of the lower bracket gives a count
        // above the target and the radius of the upper bracket gives a count below it.
        let start = self.diagonal() / REFERENCE_SCALE_DIVISOR;

        let mut min_rad = start;
        let mut count = 0;
        for i in 1..=params.max_bracket_iter {
            min_rad /= 2.0;
            count = trial.run(out, min_rad, "lower bracket", rng)?;
            if count >= target {
                break;
            }
            if i == params.max_bracket_iter {
                return Err(SamplingError::BracketNotFound {
                    side: BracketSide::Lower,
                    iterations: i,
                    count,
                });
            }
        }

        let mut max_rad = start;
        for i in 1..=params.max_bracket_iter {
            max_rad *= 2.0;
            count = trial.run(out, max_rad, "upper bracket", rng)?;
            if count <= target {
                break;
            }
            if i == params.max_bracket_iter {
                return Err(SamplingError::BracketNotFound {
                    side: BracketSide::Upper,
                    iterations: i,
                    count,
                });
            }
        }

        let mut radius = max_rad;
        let mut iterations = 0;
        while iterations < params.max_iter && !in_tolerance(count) {
            iterations += 1;
            radius = (min_rad + max_rad) / 2.0;
            count = trial.run(out, radius, "bisection", rng)?;
            if count > target {
                min_rad = radius;
            }
            if count < target {
                max_rad = radius;
            }
        }

        let converged = in_tolerance(count);
        debug_assert!(converged || iterations == params.max_iter);
        if !converged {
            log::warn!(
                "calibration used all {} iterations, {count} samples for a target of {target}",
                params.max_iter
            );
        }

        Ok(Calibration {
            radius,
            count,
            iterations,
            converged,
        })
    }

    /// Generate a Poisson disk point cloud with approximately `target` points, returning the cloud
    /// along with the calibration that produced it.
    pub fn sample_poisson_count(
        &self,
        target: usize,
        params: &PoissonParams,
        rng: &mut impl DrawSource,
    ) -> Result<(PointCloud, Calibration), SamplingError> {
        let mut cloud = PointCloud::with_capacity(target + self.vertices().len());
        let calibration = self.calibrate_to_count(&mut cloud, target, params, rng)?;
        Ok((cloud, calibration))
    }
}

/// The state shared by every trial of a calibration. The dense candidate cloud is kept only to
/// reuse its allocation; it is cleared and redrawn on each run.
struct Trial<'a> {
    mesh: &'a Mesh,
    candidates: PointCloud,
    dense_count: usize,
    pool_size: usize,
    target: usize,
}

impl Trial<'_> {
    fn run(
        &mut self,
        out: &mut PointCloud,
        radius: f64,
        phase: &str,
        rng: &mut impl DrawSource,
    ) -> Result<usize, SamplingError> {
        out.clear();
        self.candidates.clear();
        let mesh = self.mesh;
        mesh.sample_by_area(&mut self.candidates, self.dense_count, rng)?;
        let count =
            mesh.prune_to_poisson_disk(out, &self.candidates, radius, self.pool_size, rng)?;

        log::debug!(
            "{phase} trial: radius {radius:.6} gave {count} samples (target {})",
            self.target
        );
        Ok(count)
    }
}

/// Find the candidate in a cell whose sphere of `radius` holds the fewest remaining candidates,
/// looking at no more than `pool_size` of them. Ties go to the earliest candidate. Returns `None`
/// if the cell is empty.
fn best_candidate_in_cell(
    grid: &SpatialHashGrid,
    cell: &Cell,
    radius: f64,
    pool_size: usize,
) -> Option<usize> {
    let points = grid.points();
    grid.cell(cell)
        .iter()
        .take(pool_size)
        .min_by_key(|&&h| grid.count_in_sphere(&points[h], radius))
        .copied()
}
