pub mod mesh;
pub mod point_cloud;

pub type Point3 = parry3d_f64::na::Point3<f64>;
pub type Vector3 = parry3d_f64::na::Vector3<f64>;
pub type Aabb = parry3d_f64::bounding_volume::Aabb;
