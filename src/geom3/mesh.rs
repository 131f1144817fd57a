//! A triangle mesh with precomputed face areas, the surface that all sampling operates on.

mod poisson;
mod sampling;

pub use poisson::{Calibration, PoissonParams};

use crate::errors::SamplingError;
use crate::{Aabb, Point3};
use parry3d_f64::shape::{TriMesh, Triangle};

#[derive(Clone)]
pub struct Mesh {
    shape: TriMesh,
    areas: Vec<f64>,
    total_area: f64,
    aabb: Aabb,
}

impl Mesh {
    /// Create a new mesh from a list of vertices and a list of faces. Each face is three indices
    /// into the vertex list, and the order of the indices is kept as given.
    ///
    /// # Arguments
    ///
    /// * `vertices`: the vertex coordinates, which must all be finite
    /// * `faces`: the triangles, at least one is required and every index must refer to an
    ///   existing vertex
    ///
    /// returns: Result<Mesh, SamplingError>
    ///
    /// # Examples
    ///
    /// ```
    /// use mesh_poisson::{Mesh, Point3};
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = Mesh::try_new(vertices, vec![[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.total_area(), 0.5);
    /// ```
    pub fn try_new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Result<Self, SamplingError> {
        if faces.is_empty() {
            return Err(SamplingError::EmptyMesh);
        }

        if let Some(p) = vertices.iter().find(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(SamplingError::InvalidMesh(format!(
                "vertex {p} has a non-finite coordinate"
            )));
        }

        let n = vertices.len() as u32;
        if let Some((i, f)) = faces.iter().enumerate().find(|(_, f)| f.iter().any(|&v| v >= n)) {
            return Err(SamplingError::InvalidMesh(format!(
                "face {i} ({f:?}) refers to a vertex outside of the {n} vertices"
            )));
        }

        let aabb = Aabb::from_points(&vertices);
        let shape = TriMesh::new(vertices, faces)
            .map_err(|e| SamplingError::InvalidMesh(format!("{e:?}")))?;
        let areas = shape.triangles().map(|t| t.area()).collect::<Vec<_>>();
        let total_area = areas.iter().sum();

        Ok(Self {
            shape,
            areas,
            total_area,
            aabb,
        })
    }

    pub fn vertices(&self) -> &[Point3] {
        self.shape.vertices()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        self.shape.indices()
    }

    pub fn face_count(&self) -> usize {
        self.areas.len()
    }

    /// The area of each face, in face order
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    pub fn total_area(&self) -> f64 {
        self.total_area
    }

    /// The bounding box of the mesh vertices
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The length of the bounding box diagonal
    pub fn diagonal(&self) -> f64 {
        (self.aabb.maxs - self.aabb.mins).norm()
    }

    /// The triangle of a face, with its corners in the stored vertex order
    pub fn triangle(&self, face: usize) -> Triangle {
        self.shape.triangle(face as u32)
    }

    /// Check a face id, for operations which take one from the caller
    fn check_face(&self, face: usize) -> Result<(), SamplingError> {
        if face >= self.face_count() {
            return Err(SamplingError::InvalidParameter(format!(
                "face {face} is out of range for a mesh with {} faces",
                self.face_count()
            )));
        }
        Ok(())
    }
}
