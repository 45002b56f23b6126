use crate::{aabb::AxisAlignedBoundingBox, plane::Plane};
use arrayvec::ArrayVec;
use nalgebra::Vector3;

/// Maximum amount of planes a hull can store.
pub const MAX_HULL_PLANES: usize = 16;

/// Convex polyhedron described by the planes that bound it. Every plane faces inside, so a point
/// belongs to the hull when it is in front of all of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexHull {
    planes: ArrayVec<Plane, MAX_HULL_PLANES>,
}

impl ConvexHull {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plane. Returns `false` if the hull is full.
    #[inline]
    pub fn push(&mut self, plane: Plane) -> bool {
        self.planes.try_push(plane).is_ok()
    }

    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.planes.clear()
    }

    #[inline]
    pub fn is_contains_point(&self, point: &Vector3<f32>) -> bool {
        self.planes.iter().all(|plane| plane.dot(point) >= 0.0)
    }

    /// Conservative box test: the box is rejected only if it is completely behind one of the
    /// planes.
    #[inline]
    pub fn is_intersects_aabb(&self, aabb: &AxisAlignedBoundingBox) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.dot(&aabb.support_point(&plane.normal)) > 0.0)
    }

    #[inline]
    pub fn is_intersects_sphere(&self, center: &Vector3<f32>, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.dot(center) >= -radius)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_cube() -> ConvexHull {
        let mut hull = ConvexHull::new();
        for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
            assert!(hull.push(Plane::from_normal_and_point(&axis, &-axis).unwrap()));
            assert!(hull.push(Plane::from_normal_and_point(&-axis, &axis).unwrap()));
        }
        hull
    }

    #[test]
    fn test_hull_point() {
        let hull = unit_cube();
        assert_eq!(hull.len(), 6);
        assert!(hull.is_contains_point(&Vector3::new(0.5, -0.5, 0.9)));
        assert!(!hull.is_contains_point(&Vector3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn test_hull_aabb() {
        let hull = unit_cube();
        assert!(hull.is_intersects_aabb(&AxisAlignedBoundingBox::from_min_max(
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(3.0, 3.0, 3.0)
        )));
        assert!(!hull.is_intersects_aabb(&AxisAlignedBoundingBox::from_min_max(
            Vector3::new(2.0, -0.5, -0.5),
            Vector3::new(3.0, 0.5, 0.5)
        )));
    }

    #[test]
    fn test_hull_sphere() {
        let hull = unit_cube();
        assert!(hull.is_intersects_sphere(&Vector3::new(1.5, 0.0, 0.0), 0.6));
        assert!(!hull.is_intersects_sphere(&Vector3::new(1.5, 0.0, 0.0), 0.4));
    }

    #[test]
    fn test_hull_capacity() {
        let mut hull = ConvexHull::new();
        for _ in 0..MAX_HULL_PLANES {
            assert!(hull.push(Plane::default()));
        }
        assert!(!hull.push(Plane::default()));
        hull.clear();
        assert!(hull.is_empty());
    }
}
