use super::Mesh;
use crate::common::points::{barycentric_point, mean_point};
use crate::common::random::DrawSource;
use crate::errors::SamplingError;
use crate::geom3::point_cloud::PointCloud;

impl Mesh {
    /// Draw `count` independent random points from the surface of the mesh and append them to
    /// `cloud`. Faces are chosen with probability proportional to their area and each point is
    /// placed uniformly inside its face, so the result is uniform over the whole surface.
    ///
    /// # Arguments
    ///
    /// * `cloud`: the cloud to append the samples to
    /// * `count`: the number of samples to draw, zero is allowed and draws nothing
    /// * `rng`: the random draw source
    ///
    /// returns: Result<(), SamplingError>
    pub fn sample_by_area(
        &self,
        cloud: &mut PointCloud,
        count: usize,
        rng: &mut impl DrawSource,
    ) -> Result<(), SamplingError> {
        if self.total_area() <= 0.0 {
            return Err(SamplingError::ZeroArea);
        }

        let cumulative = cumulative_areas(self.areas().iter().copied());
        cloud.reserve(count);
        for _ in 0..count {
            let face = pick_face(&cumulative, rng.uniform_01());
            cloud.append(self.sample_in_face(face, rng));
        }

        Ok(())
    }

    /// Append `count` uniform random points from inside a single face.
    pub fn sample_face(
        &self,
        face: usize,
        cloud: &mut PointCloud,
        count: usize,
        rng: &mut impl DrawSource,
    ) -> Result<(), SamplingError> {
        self.check_face(face)?;
        cloud.reserve(count);
        for _ in 0..count {
            cloud.append(self.sample_in_face(face, rng));
        }
        Ok(())
    }

    /// Randomly sample a subset of the faces at a given density. The number of points drawn is
    /// the combined area of the selected faces times `density`, rounded up, and the points are
    /// distributed over the selected faces by area.
    ///
    /// # Arguments
    ///
    /// * `faces`: the ids of the faces to sample, repeats are counted as many times as they appear
    /// * `cloud`: the cloud to append the samples to
    /// * `density`: the number of points per unit area, must be positive and finite
    /// * `rng`: the random draw source
    ///
    /// returns: Result<(), SamplingError>
    pub fn sample_faces(
        &self,
        faces: &[usize],
        cloud: &mut PointCloud,
        density: f64,
        rng: &mut impl DrawSource,
    ) -> Result<(), SamplingError> {
        if !density.is_finite() || density <= 0.0 {
            return Err(SamplingError::InvalidParameter(format!(
                "sampling density must be positive and finite, got {density}"
            )));
        }
        if faces.is_empty() {
            return Err(SamplingError::InvalidParameter("no faces selected".to_string()));
        }
        for &f in faces {
            self.check_face(f)?;
        }

        let cumulative = cumulative_areas(faces.iter().map(|&f| self.areas()[f]));
        let area = cumulative[faces.len()];
        if area <= 0.0 {
            return Err(SamplingError::ZeroArea);
        }

        let count = (area * density).ceil() as usize;
        cloud.reserve(count);
        for _ in 0..count {
            let i = pick_face(&cumulative, rng.uniform_01());
            cloud.append(self.sample_in_face(faces[i], rng));
        }

        Ok(())
    }

    /// A cloud with the centroid of every face, in face order.
    pub fn face_centers(&self) -> PointCloud {
        let mut cloud = PointCloud::with_capacity(self.face_count());
        for face in 0..self.face_count() {
            let t = self.triangle(face);
            cloud.append(mean_point(&[t.a, t.b, t.c]));
        }
        cloud
    }

    fn sample_in_face(&self, face: usize, rng: &mut impl DrawSource) -> crate::Point3 {
        let t = self.triangle(face);
        barycentric_point(&t.a, &t.b, &t.c, rng.uniform_barycentric())
    }
}

/// Build the running sum of the areas, starting at zero, so the result has one more entry than
/// there are areas and its last entry is the total.
fn cumulative_areas(areas: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut cumulative = vec![0.0];
    let mut total = 0.0;
    for a in areas {
        total += a;
        cumulative.push(total);
    }
    cumulative
}

/// Map a uniform draw in [0, 1) to a face. The chosen face is the first one whose upper
/// cumulative bound is not less than `u * total`. A zero area face is only returned when `u` is
/// exactly zero and it comes before every face with positive area.
fn pick_face(cumulative: &[f64], u: f64) -> usize {
    let total = cumulative[cumulative.len() - 1];
    let val = total * u;
    let upper = &cumulative[1..];
    upper
        .partition_point(|&c| c < val)
        .min(upper.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom3::mesh::fixtures::*;
    use crate::geom3::point_cloud::PointCloudFeatures;
    use crate::{Point3, SampleRng};
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case(0.0, 0; "zero goes to the first face")]
    #[test_case(0.25, 0; "inside the first face")]
    #[test_case(1.0 / 3.0, 0; "upper bound of the first face is inclusive")]
    #[test_case(0.5, 2; "skips the zero area face")]
    #[test_case(0.999, 2; "inside the last face")]
    fn face_lookup(u: f64, expected: usize) {
        // Areas 1, 0, 2
        let cumulative = cumulative_areas([1.0, 0.0, 2.0].into_iter());
        assert_eq!(cumulative, vec![0.0, 1.0, 1.0, 3.0]);
        assert_eq!(pick_face(&cumulative, u), expected);
    }

    #[test]
    fn leading_zero_area_face_only_takes_a_zero_draw() {
        let cumulative = cumulative_areas([0.0, 1.0].into_iter());
        assert_eq!(pick_face(&cumulative, 0.0), 0);
        assert_eq!(pick_face(&cumulative, 1.0e-12), 1);
        assert_eq!(pick_face(&cumulative, 0.5), 1);
    }

    #[test]
    fn zero_count_is_empty() {
        let mesh = unit_square();
        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::default();
        mesh.sample_by_area(&mut cloud, 0, &mut rng).unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn hundred_points_on_one_triangle() {
        let mesh = unit_area_triangle();
        assert_relative_eq!(mesh.total_area(), 1.0);

        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::from_seed(4);
        mesh.sample_by_area(&mut cloud, 100, &mut rng).unwrap();

        assert_eq!(cloud.len(), 100);
        for p in cloud.points() {
            // Inside x >= 0, y >= 0, x / 2 + y <= 1 in the z = 0 plane
            assert_eq!(p.z, 0.0);
            assert!(p.x >= 0.0 && p.y >= 0.0);
            assert!(p.x / 2.0 + p.y <= 1.0 + 1.0e-12);
        }
    }

    #[test]
    fn appends_to_existing_points() {
        let mesh = unit_square();
        let mut cloud = PointCloud::new(vec![Point3::new(5.0, 5.0, 5.0)]);
        let mut rng = SampleRng::default();
        mesh.sample_by_area(&mut cloud, 10, &mut rng).unwrap();
        assert_eq!(cloud.len(), 11);
        assert_eq!(cloud.points()[0], Point3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn faces_are_chosen_by_area() {
        // Two disjoint triangles with areas 1 and 3
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(16.0, 0.0, 0.0),
            Point3::new(10.0, 1.0, 0.0),
        ];
        let mesh = Mesh::try_new(vertices, vec![[0, 1, 2], [3, 4, 5]]).unwrap();
        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::from_seed(8);
        mesh.sample_by_area(&mut cloud, 20_000, &mut rng).unwrap();

        let on_first = cloud.points().iter().filter(|p| p.x < 5.0).count();
        assert_relative_eq!(on_first as f64 / 20_000.0, 0.25, epsilon = 0.02);
    }

    #[test]
    fn points_are_convex_combinations() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 2.0),
        ];
        let mesh = Mesh::try_new(vertices.clone(), vec![[0, 1, 2]]).unwrap();
        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::from_seed(21);
        mesh.sample_by_area(&mut cloud, 500, &mut rng).unwrap();

        // In this triangle x and y are the weights of the second and third vertex
        for p in cloud.points() {
            let (b1, b2) = (p.x, p.y);
            let b0 = 1.0 - b1 - b2;
            assert!(b0 >= -1.0e-12 && b1 >= 0.0 && b2 >= 0.0);
            assert_relative_eq!(p.z, b1 * 1.0 + b2 * 2.0, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn seeded_sampling_is_repeatable() {
        let mesh = square_grid(3);
        let mut a = PointCloud::empty();
        let mut b = PointCloud::empty();
        mesh.sample_by_area(&mut a, 200, &mut SampleRng::from_seed(99)).unwrap();
        mesh.sample_by_area(&mut b, 200, &mut SampleRng::from_seed(99)).unwrap();

        let bits = |c: &PointCloud| {
            c.points()
                .iter()
                .flat_map(|p| p.coords.iter().map(|x| x.to_bits()).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn zero_area_mesh_is_rejected() {
        let vertices = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mesh = Mesh::try_new(vertices, vec![[0, 1, 2]]).unwrap();
        let mut rng = SampleRng::default();
        let result = mesh.sample_by_area(&mut PointCloud::empty(), 10, &mut rng);
        assert_eq!(result, Err(SamplingError::ZeroArea));
    }

    #[test]
    fn single_face_sampling() {
        let mesh = unit_square();
        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::default();
        mesh.sample_face(0, &mut cloud, 50, &mut rng).unwrap();

        // Face 0 is the triangle below the diagonal
        assert_eq!(cloud.len(), 50);
        assert!(cloud.points().iter().all(|p| p.y <= p.x + 1.0e-12));

        let result = mesh.sample_face(2, &mut cloud, 1, &mut SampleRng::default());
        assert!(matches!(result, Err(SamplingError::InvalidParameter(_))));
    }

    #[test]
    fn selected_faces_at_density() {
        let mesh = square_grid(2);
        let mut cloud = PointCloud::empty();

        // Faces 0 and 1 make up the bottom left quarter of the square
        let mut rng = SampleRng::from_seed(6);
        mesh.sample_faces(&[0, 1], &mut cloud, 100.0, &mut rng).unwrap();

        assert_eq!(cloud.len(), 25);
        assert!(cloud.points().iter().all(|p| p.x <= 0.5 && p.y <= 0.5));
    }

    #[test]
    fn selected_faces_errors() {
        let mesh = square_grid(2);
        let mut cloud = PointCloud::empty();
        let mut rng = SampleRng::default();

        assert!(mesh.sample_faces(&[], &mut cloud, 1.0, &mut rng).is_err());
        assert!(mesh.sample_faces(&[0], &mut cloud, 0.0, &mut rng).is_err());
        assert!(mesh.sample_faces(&[8], &mut cloud, 1.0, &mut rng).is_err());
        assert!(cloud.is_empty());
    }

    #[test]
    fn centers_of_faces() {
        let mesh = unit_square();
        let centers = mesh.face_centers();
        assert_eq!(centers.len(), 2);
        assert_relative_eq!(centers.points()[0], Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0));
        assert_relative_eq!(centers.points()[1], Point3::new(1.0 / 3.0, 2.0 / 3.0, 0.0));
    }
}
