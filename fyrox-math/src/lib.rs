//! Geometry primitives shared by the Fyrox shadow subsystem: planes, bounding boxes, view
//! frustums, convex hulls and line segments.

pub mod aabb;
pub mod frustum;
pub mod hull;
pub mod plane;
pub mod segment;

use nalgebra::{Matrix3, Matrix4, Vector3};

pub mod prelude {
    pub use crate::{
        aabb::AxisAlignedBoundingBox,
        frustum::Frustum,
        hull::ConvexHull,
        plane::Plane,
        segment::{LineSegment, LineSegment3},
        Matrix4Ext,
    };
}

pub trait Matrix4Ext<T: nalgebra::Scalar> {
    fn side(&self) -> Vector3<T>;
    fn up(&self) -> Vector3<T>;
    fn look(&self) -> Vector3<T>;
    fn position(&self) -> Vector3<T>;
    fn basis(&self) -> Matrix3<T>;
}

impl<T: nalgebra::Scalar + Copy> Matrix4Ext<T> for Matrix4<T> {
    #[inline]
    fn side(&self) -> Vector3<T> {
        Vector3::new(self[0], self[1], self[2])
    }

    #[inline]
    fn up(&self) -> Vector3<T> {
        Vector3::new(self[4], self[5], self[6])
    }

    #[inline]
    fn look(&self) -> Vector3<T> {
        Vector3::new(self[8], self[9], self[10])
    }

    #[inline]
    fn position(&self) -> Vector3<T> {
        Vector3::new(self[12], self[13], self[14])
    }

    #[inline]
    fn basis(&self) -> Matrix3<T> {
        self.fixed_view::<3, 3>(0, 0).into_owned()
    }
}

/// Picks a vector that is guaranteed not to be parallel to `direction`, usable as an "up" hint
/// when building an orthonormal basis around `direction`.
#[inline]
pub fn non_parallel_up(direction: &Vector3<f32>, preferred_up: &Vector3<f32>) -> Vector3<f32> {
    if direction.cross(preferred_up).norm_squared() > 1.0e-8 {
        *preferred_up
    } else if direction.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    }
}

/// Rounds a positive integer down to the nearest power of two. Zero stays zero.
#[inline]
pub fn floor_power_of_two(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        1 << (31 - value.leading_zeros())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_floor_power_of_two() {
        assert_eq!(floor_power_of_two(0), 0);
        assert_eq!(floor_power_of_two(1), 1);
        assert_eq!(floor_power_of_two(255), 128);
        assert_eq!(floor_power_of_two(256), 256);
        assert_eq!(floor_power_of_two(1500), 1024);
    }

    #[test]
    fn test_non_parallel_up() {
        let z = Vector3::z();
        assert_eq!(non_parallel_up(&Vector3::y(), &z), z);
        assert_eq!(non_parallel_up(&-Vector3::z(), &z), Vector3::x());
        assert_eq!(non_parallel_up(&Vector3::x(), &Vector3::x()), Vector3::y());
    }

    #[test]
    fn test_matrix4_ext() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(m.position(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(m.basis(), Matrix3::identity());
        assert_eq!(m.side(), Vector3::x());
        assert_eq!(m.up(), Vector3::y());
        assert_eq!(m.look(), Vector3::z());
    }
}
