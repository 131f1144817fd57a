//! Common operations on f64 points in D-dimensional space.

use parry3d_f64::na::{Point, SVector};

/// Returns the distance between two points in D-dimensional space.
///
/// # Arguments
///
/// * `a`: the first point
/// * `b`: the second point
///
/// returns: f64
///
/// # Examples
///
/// ```
/// use mesh_poisson::common::points::dist;
/// use mesh_poisson::Point3;
/// let a = Point3::new(1.0, 2.0, 0.0);
/// let b = Point3::new(3.0, 2.0, 0.0);
/// assert_eq!(dist(&a, &b), 2.0);
/// ```
pub fn dist<const D: usize>(a: &Point<f64, D>, b: &Point<f64, D>) -> f64 {
    (a - b).norm()
}

/// Returns the squared distance between two points, for comparisons which don't need the root.
pub fn dist_sq<const D: usize>(a: &Point<f64, D>, b: &Point<f64, D>) -> f64 {
    (a - b).norm_squared()
}

/// Returns the unweighted mean of a set of points in D-dimensional space. The slice must not be
/// empty.
///
/// # Arguments
///
/// * `points`: a slice of points to compute the mean of
///
/// returns: OPoint<f64, Const<{ D }>>
///
/// # Examples
///
/// ```
/// use mesh_poisson::common::points::mean_point;
/// use mesh_poisson::Point3;
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(3.0, 0.0, 0.0),
///     Point3::new(0.0, 3.0, 0.0),
/// ];
/// assert_eq!(mean_point(&points), Point3::new(1.0, 1.0, 0.0));
/// ```
pub fn mean_point<const D: usize>(points: &[Point<f64, D>]) -> Point<f64, D> {
    let mut sum = SVector::<f64, D>::zeros();
    for p in points {
        sum += p.coords;
    }
    Point::<f64, D>::from(sum / points.len() as f64)
}

/// Combines three points with barycentric weights, `w[0] * a + w[1] * b + w[2] * c`.
pub fn barycentric_point<const D: usize>(
    a: &Point<f64, D>,
    b: &Point<f64, D>,
    c: &Point<f64, D>,
    w: [f64; 3],
) -> Point<f64, D> {
    Point::<f64, D>::from(a.coords * w[0] + b.coords * w[1] + c.coords * w[2])
}
