use crate::errors::SamplingError;
use crate::{Aabb, Point3};
use rand::Rng;
use rand::seq::index;

pub trait PointCloudFeatures {
    fn points(&self) -> &[Point3];

    fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    fn len(&self) -> usize {
        self.points().len()
    }

    /// The bounding box of the points, or `None` for an empty cloud
    fn aabb(&self) -> Option<Aabb> {
        if self.is_empty() {
            None
        } else {
            Some(Aabb::from_points(self.points()))
        }
    }

    fn create_from_indices(&self, indices: &[usize]) -> Result<PointCloud, SamplingError> {
        if let Some(i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(SamplingError::InvalidParameter(format!(
                "index {i} is out of bounds for a cloud of {} points",
                self.len()
            )));
        }

        let points = self.points();
        Ok(PointCloud::new(indices.iter().map(|i| points[*i]).collect()))
    }
}

/// An ordered, append-only collection of points which can be cleared and refilled wholesale.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point3>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Add a single point to the end of the cloud.
    pub fn append(&mut self, point: Point3) {
        self.points.push(point);
    }

    /// Remove every point, keeping the allocation for the next fill.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.points.reserve(additional);
    }

    /// Create a new cloud from a uniformly random subset of `count` points, drawn without
    /// replacement. The selected points keep their original relative order. If `count` is at
    /// least the size of the cloud, the whole cloud is returned.
    ///
    /// # Arguments
    ///
    /// * `count`: the number of points to keep
    /// * `rng`: the random generator, such as a `SampleRng`
    ///
    /// returns: PointCloud
    pub fn subsample_uniform<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> PointCloud {
        if count >= self.len() {
            return self.clone();
        }

        let mut indices = index::sample(rng, self.len(), count).into_vec();
        indices.sort_unstable();

        PointCloud::new(indices.iter().map(|&i| self.points[i]).collect())
    }
}

impl From<Vec<Point3>> for PointCloud {
    fn from(points: Vec<Point3>) -> Self {
        Self::new(points)
    }
}

impl PointCloudFeatures for PointCloud {
    fn points(&self) -> &[Point3] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleRng;
    use approx::assert_relative_eq;

    fn line(n: usize) -> PointCloud {
        (0..n)
            .map(|i| Point3::new(i as f64, 0.0, 0.0))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn append_and_clear() {
        let mut cloud = PointCloud::empty();
        assert!(cloud.is_empty());

        cloud.append(Point3::new(1.0, 2.0, 3.0));
        cloud.append(Point3::new(4.0, 5.0, 6.0));
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[1], Point3::new(4.0, 5.0, 6.0));

        cloud.clear();
        assert!(cloud.is_empty());
    }

    #[test]
    fn aabb_of_points() {
        let cloud = line(5);
        let aabb = cloud.aabb().unwrap();
        assert_eq!(aabb.mins, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.maxs, Point3::new(4.0, 0.0, 0.0));
        assert!(PointCloud::empty().aabb().is_none());
    }

    #[test]
    fn from_indices() {
        let cloud = line(5);
        let picked = cloud.create_from_indices(&[4, 1]).unwrap();
        assert_eq!(
            picked.points(),
            &[Point3::new(4.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]
        );
        assert!(cloud.create_from_indices(&[5]).is_err());
    }

    #[test]
    fn subsample_keeps_order_without_repeats() {
        let cloud = line(100);
        let mut rng = SampleRng::from_seed(9);
        let sub = cloud.subsample_uniform(30, &mut rng);

        assert_eq!(sub.len(), 30);
        assert!(sub.points().windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn subsample_larger_than_cloud() {
        let cloud = line(10);
        let mut rng = SampleRng::default();
        assert_eq!(cloud.subsample_uniform(20, &mut rng), cloud);
        assert!(cloud.subsample_uniform(0, &mut rng).is_empty());
    }

    #[test]
    fn subsample_picks_every_point_equally() {
        let cloud = line(4);
        let mut rng = SampleRng::from_seed(17);
        let mut hits = [0usize; 4];
        for _ in 0..8000 {
            let sub = cloud.subsample_uniform(1, &mut rng);
            hits[sub.points()[0].x as usize] += 1;
        }

        for h in hits {
            assert_relative_eq!(h as f64 / 8000.0, 0.25, epsilon = 0.03);
        }
    }

    #[test]
    fn subsample_is_seeded() {
        let cloud = line(50);
        let a = cloud.subsample_uniform(10, &mut SampleRng::from_seed(2));
        let b = cloud.subsample_uniform(10, &mut SampleRng::from_seed(2));
        assert_eq!(a, b);
    }
}
