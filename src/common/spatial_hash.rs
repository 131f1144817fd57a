//! A uniform spatial hash grid over a borrowed slice of points, used to find and eliminate
//! candidates around accepted Poisson disk samples.
//!
//! The grid never owns or copies points. Each cell holds integer handles (indices into the
//! borrowed slice), so removing a handle from a cell leaves the underlying point untouched.

use crate::common::points::dist_sq;
use crate::common::random::{DrawSource, shuffle};
use crate::errors::SamplingError;
use crate::{Aabb, Point3, Vector3};
use itertools::Itertools;
use parry3d_f64::bounding_volume::BoundingVolume;
use parry3d_f64::utils::hashmap::HashMap;

/// Integer coordinates of a grid cell
pub type Cell = [i32; 3];

/// The rebuild loop halves the cell size until the mean number of points per allocated cell is
/// at or below this value.
pub const MAX_OCCUPANCY: f64 = 100.0;

/// Number of rebuilds allowed before the occupancy loop gives up.
pub const MAX_GRID_REBUILDS: usize = 16;

/// Cell counts past this would overflow the integer cell coordinates during box queries.
const MAX_CELLS_PER_AXIS: f64 = (i32::MAX / 4) as f64;

pub struct SpatialHashGrid<'a> {
    points: &'a [Point3],
    bbox: Aabb,
    size: [i32; 3],
    voxel: Vector3,
    cells: HashMap<Cell, Vec<usize>>,
    allocated: Vec<Cell>,
}

impl<'a> SpatialHashGrid<'a> {
    /// Create an empty grid which divides `bbox` into `cell_counts` cells along each axis. The
    /// handles added later refer to entries of `points`.
    ///
    /// # Arguments
    ///
    /// * `points`: the arena of points that handles will index into
    /// * `bbox`: the region covered by the grid, points outside it are clamped to the border cells
    /// * `cell_counts`: the number of cells along x, y, and z, each must be at least one
    ///
    /// returns: SpatialHashGrid
    pub fn init_empty(points: &'a [Point3], bbox: Aabb, cell_counts: [usize; 3]) -> Self {
        let size = cell_counts.map(|c| c.max(1) as i32);
        let extents = bbox.extents();
        let voxel = Vector3::new(
            extents.x / size[0] as f64,
            extents.y / size[1] as f64,
            extents.z / size[2] as f64,
        );

        Self {
            points,
            bbox,
            size,
            voxel,
            cells: HashMap::default(),
            allocated: Vec::new(),
        }
    }

    /// Create an empty grid with cells of roughly `cell_size` covering `bbox` inflated by one cell
    /// on every side.
    pub fn with_cell_size(
        points: &'a [Point3],
        bbox: &Aabb,
        cell_size: f64,
    ) -> Result<Self, SamplingError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SamplingError::InvalidParameter(format!(
                "grid cell size must be positive and finite, got {cell_size}"
            )));
        }

        let inflated = bbox.loosened(cell_size);
        let extents = inflated.extents();
        let mut counts = [1usize; 3];
        for (i, count) in counts.iter_mut().enumerate() {
            let c = extents[i] / cell_size;
            if !c.is_finite() || c > MAX_CELLS_PER_AXIS {
                return Err(SamplingError::InvalidParameter(format!(
                    "cell size {cell_size} is too small for a bounding box extent of {}",
                    extents[i]
                )));
            }
            *count = (c as usize).max(1);
        }

        Ok(Self::init_empty(points, inflated, counts))
    }

    /// Build a grid holding every point of `points`, sized for eliminating samples within
    /// `radius` of each other. The starting cell edge is `2 * radius / sqrt(3)`, so that a cell's
    /// diagonal equals the disk diameter. If the mean occupancy of the allocated cells exceeds
    /// `MAX_OCCUPANCY` the cell size is halved and the grid rebuilt.
    ///
    /// # Arguments
    ///
    /// * `points`: the candidate points, all of which are added to the grid
    /// * `bbox`: the region the points lie in
    /// * `radius`: the disk radius that sphere queries will mostly be made with
    ///
    /// returns: Result<SpatialHashGrid, SamplingError>
    pub fn for_disk_radius(
        points: &'a [Point3],
        bbox: &Aabb,
        radius: f64,
    ) -> Result<Self, SamplingError> {
        let mut cell_size = 2.0 * radius / 3.0_f64.sqrt();

        for rebuild in 0..MAX_GRID_REBUILDS {
            let mut grid = Self::with_cell_size(points, bbox, cell_size)?;
            for handle in 0..points.len() {
                grid.add(handle);
            }
            grid.update_allocated_cells();

            if grid.allocated.is_empty() {
                return Ok(grid);
            }

            let occupancy = points.len() as f64 / grid.allocated.len() as f64;
            log::trace!(
                "grid rebuild {rebuild}: cell {cell_size:.6}, {} cells, occupancy {occupancy:.2}",
                grid.allocated.len()
            );
            if occupancy <= MAX_OCCUPANCY {
                return Ok(grid);
            }

            cell_size /= 2.0;
        }

        Err(SamplingError::GridOccupancy {
            rebuilds: MAX_GRID_REBUILDS,
        })
    }

    /// The arena of points that the grid's handles refer to
    pub fn points(&self) -> &'a [Point3] {
        self.points
    }

    /// The number of cells along each axis
    pub fn size(&self) -> [i32; 3] {
        self.size
    }

    /// The region covered by the grid
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// Insert the handle of a point into the cell which contains it.
    pub fn add(&mut self, handle: usize) {
        let cell = self.cell_of(&self.points[handle]);
        self.cells.entry(cell).or_default().push(handle);
    }

    /// Recompute the list of non-empty cells. This must be called after a batch of insertions or
    /// removals and before iterating over `allocated_cells`. The list comes back in sorted order.
    pub fn update_allocated_cells(&mut self) {
        self.cells.retain(|_, handles| !handles.is_empty());
        self.allocated = self.cells.keys().copied().sorted().collect();
    }

    /// The cells which held at least one handle at the last `update_allocated_cells`
    pub fn allocated_cells(&self) -> &[Cell] {
        &self.allocated
    }

    /// Randomly permute the allocated cell list.
    pub fn shuffle_allocated_cells<D: DrawSource + ?Sized>(&mut self, draw: &mut D) {
        shuffle(&mut self.allocated, draw);
    }

    /// The handles currently stored in a cell
    pub fn cell(&self, cell: &Cell) -> &[usize] {
        self.cells.get(cell).map(|h| h.as_slice()).unwrap_or(&[])
    }

    /// True if the cell currently holds no handles
    pub fn empty_cell(&self, cell: &Cell) -> bool {
        self.cell(cell).is_empty()
    }

    /// The total number of handles currently stored in the grid
    pub fn handle_count(&self) -> usize {
        self.cells.values().map(|h| h.len()).sum()
    }

    /// Count the stored points whose distance to `center` is at most `radius`.
    pub fn count_in_sphere(&self, center: &Point3, radius: f64) -> usize {
        let r2 = radius * radius;
        let mut count = 0;
        for cell in self.sphere_cells(center, radius) {
            if let Some(handles) = self.cells.get(&cell) {
                count += handles
                    .iter()
                    .filter(|&&h| dist_sq(center, &self.points[h]) <= r2)
                    .count();
            }
        }
        count
    }

    /// Remove every stored handle whose point lies at most `radius` from `center`, returning how
    /// many were removed. Only the grid's handle lists are changed.
    pub fn remove_in_sphere(&mut self, center: &Point3, radius: f64) -> usize {
        let r2 = radius * radius;
        let points = self.points;
        let mut removed = 0;
        for cell in self.sphere_cells(center, radius) {
            if let Some(handles) = self.cells.get_mut(&cell) {
                let before = handles.len();
                handles.retain(|&h| dist_sq(center, &points[h]) > r2);
                removed += before - handles.len();
                if handles.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        removed
    }

    /// Return the handles of all stored points inside the box (boundary included), searching only
    /// the cells which overlap it. A box entirely outside the grid gives an empty result.
    pub fn get_in_box(&self, query: &Aabb) -> Vec<usize> {
        let Some((lo, hi)) = self.box_to_ibox(query) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for cell in cell_range(lo, hi) {
            if let Some(handles) = self.cells.get(&cell) {
                found.extend(
                    handles
                        .iter()
                        .filter(|&&h| query.contains_local_point(&self.points[h])),
                );
            }
        }
        found
    }

    /// Check whether `point` could be added as a Poisson disk sample, meaning that no stored
    /// point lies strictly closer to it than `radius`.
    pub fn check_poisson_disk(&self, point: &Point3, radius: f64) -> bool {
        let r2 = radius * radius;
        let query = sphere_box(point, radius);
        self.get_in_box(&query)
            .iter()
            .all(|&h| dist_sq(point, &self.points[h]) >= r2)
    }

    fn cell_of(&self, p: &Point3) -> Cell {
        let mut cell = [0; 3];
        for (i, c) in cell.iter_mut().enumerate() {
            let v = ((p[i] - self.bbox.mins[i]) / self.voxel[i]).floor() as i32;
            *c = v.clamp(0, self.size[i] - 1);
        }
        cell
    }

    /// Convert a box to the inclusive range of cells it overlaps, clipped to the grid. Returns
    /// `None` when nothing is left after clipping.
    fn box_to_ibox(&self, query: &Aabb) -> Option<(Cell, Cell)> {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for i in 0..3 {
            let a = ((query.mins[i] - self.bbox.mins[i]) / self.voxel[i]).floor();
            let b = ((query.maxs[i] - self.bbox.mins[i]) / self.voxel[i]).floor();
            let top = (self.size[i] - 1) as f64;
            if a > top || b < 0.0 || a > b {
                return None;
            }
            lo[i] = a.max(0.0) as i32;
            hi[i] = b.min(top) as i32;
        }
        Some((lo, hi))
    }

    fn sphere_cells(&self, center: &Point3, radius: f64) -> Vec<Cell> {
        match self.box_to_ibox(&sphere_box(center, radius)) {
            Some((lo, hi)) => cell_range(lo, hi).collect(),
            None => Vec::new(),
        }
    }
}

fn sphere_box(center: &Point3, radius: f64) -> Aabb {
    let r = Vector3::new(radius, radius, radius);
    Aabb::new(center - r, center + r)
}

fn cell_range(lo: Cell, hi: Cell) -> impl Iterator<Item = Cell> {
    (lo[0]..=hi[0])
        .cartesian_product(lo[1]..=hi[1])
        .cartesian_product(lo[2]..=hi[2])
        .map(|((x, y), z)| [x, y, z])
}
