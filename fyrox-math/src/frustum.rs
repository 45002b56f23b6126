use crate::{aabb::AxisAlignedBoundingBox, plane::Plane, segment::LineSegment3};
use nalgebra::{Matrix4, Vector3};

/// Convex volume bounded by six planes whose normals point inside.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    /// 0 - left, 1 - right, 2 - top, 3 - bottom, 4 - far, 5 - near
    pub planes: [Plane; 6],
    /// 0..4 - far face (left-top, left-bottom, right-bottom, right-top), 4..8 - near face in the
    /// same order.
    pub corners: [Vector3<f32>; 8],
}

impl Default for Frustum {
    #[inline]
    fn default() -> Self {
        Self::from_perspective(
            Vector3::zeros(),
            Vector3::y(),
            Vector3::z(),
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.01,
            1024.0,
        )
        .unwrap_or(Self {
            planes: Default::default(),
            corners: Default::default(),
        })
    }
}

/// Parameters of a line segment that survived clipping: the part between `entering` and
/// `leaving` (both in `[0; 1]`) lies inside the convex volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipRange {
    pub entering: f32,
    pub leaving: f32,
}

impl Frustum {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const TOP: usize = 2;
    pub const BOTTOM: usize = 3;
    pub const FAR: usize = 4;
    pub const NEAR: usize = 5;

    #[inline]
    pub fn from_view_projection_matrix(m: Matrix4<f32>) -> Option<Self> {
        let planes = [
            // Left
            Plane::from_abcd(m[3] + m[0], m[7] + m[4], m[11] + m[8], m[15] + m[12])?,
            // Right
            Plane::from_abcd(m[3] - m[0], m[7] - m[4], m[11] - m[8], m[15] - m[12])?,
            // Top
            Plane::from_abcd(m[3] - m[1], m[7] - m[5], m[11] - m[9], m[15] - m[13])?,
            // Bottom
            Plane::from_abcd(m[3] + m[1], m[7] + m[5], m[11] + m[9], m[15] + m[13])?,
            // Far
            Plane::from_abcd(m[3] - m[2], m[7] - m[6], m[11] - m[10], m[15] - m[14])?,
            // Near
            Plane::from_abcd(m[3] + m[2], m[7] + m[6], m[11] + m[10], m[15] + m[14])?,
        ];

        Some(Self {
            corners: Self::corners_from_planes(&planes),
            planes,
        })
    }

    /// Builds a perspective frustum directly from its apex, viewing direction and optics. Side
    /// planes are computed from unit directions and pass through the apex, which keeps them
    /// precise even when the apex is very far away (as for sun frustums).
    ///
    /// `fov` is the vertical field of view in radians, `aspect` is width / height.
    pub fn from_perspective(
        position: Vector3<f32>,
        forward: Vector3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Option<Self> {
        let forward = forward.try_normalize(f32::EPSILON)?;
        let right = forward.cross(&up).try_normalize(f32::EPSILON)?;
        let up = right.cross(&forward);

        let tan_y = (fov * 0.5).tan();
        let tan_x = tan_y * aspect;

        // Directions of the four corner rays at unit depth.
        let left_top = forward - right.scale(tan_x) + up.scale(tan_y);
        let left_bottom = forward - right.scale(tan_x) - up.scale(tan_y);
        let right_bottom = forward + right.scale(tan_x) - up.scale(tan_y);
        let right_top = forward + right.scale(tan_x) + up.scale(tan_y);

        // Side normals come straight from the basis to stay precise for narrow projections.
        let side = |normal: Vector3<f32>| Plane::from_normal_and_point(&normal, &position);

        let planes = [
            side(right + forward.scale(tan_x))?,
            side(-right + forward.scale(tan_x))?,
            side(-up + forward.scale(tan_y))?,
            side(up + forward.scale(tan_y))?,
            Plane::from_normal_and_point(&-forward, &(position + forward.scale(z_far)))?,
            Plane::from_normal_and_point(&forward, &(position + forward.scale(z_near)))?,
        ];

        let corners = [
            position + left_top.scale(z_far),
            position + left_bottom.scale(z_far),
            position + right_bottom.scale(z_far),
            position + right_top.scale(z_far),
            position + left_top.scale(z_near),
            position + left_bottom.scale(z_near),
            position + right_bottom.scale(z_near),
            position + right_top.scale(z_near),
        ];

        Some(Self { planes, corners })
    }

    fn corners_from_planes(planes: &[Plane; 6]) -> [Vector3<f32>; 8] {
        [
            planes[Self::LEFT].intersection_point(&planes[Self::TOP], &planes[Self::FAR]),
            planes[Self::LEFT].intersection_point(&planes[Self::BOTTOM], &planes[Self::FAR]),
            planes[Self::RIGHT].intersection_point(&planes[Self::BOTTOM], &planes[Self::FAR]),
            planes[Self::RIGHT].intersection_point(&planes[Self::TOP], &planes[Self::FAR]),
            planes[Self::LEFT].intersection_point(&planes[Self::TOP], &planes[Self::NEAR]),
            planes[Self::LEFT].intersection_point(&planes[Self::BOTTOM], &planes[Self::NEAR]),
            planes[Self::RIGHT].intersection_point(&planes[Self::BOTTOM], &planes[Self::NEAR]),
            planes[Self::RIGHT].intersection_point(&planes[Self::TOP], &planes[Self::NEAR]),
        ]
    }

    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[inline]
    pub fn corners(&self) -> &[Vector3<f32>; 8] {
        &self.corners
    }

    #[inline]
    pub fn far_plane_center(&self) -> Vector3<f32> {
        (self.corners[0] + self.corners[1] + self.corners[2] + self.corners[3]).scale(0.25)
    }

    #[inline]
    pub fn near_plane_center(&self) -> Vector3<f32> {
        (self.corners[4] + self.corners[5] + self.corners[6] + self.corners[7]).scale(0.25)
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        self.corners
            .iter()
            .fold(Vector3::default(), |acc, corner| acc + *corner)
            .scale(1.0 / 8.0)
    }

    /// The twelve edges of the frustum box: far face, near face, then the four side edges.
    pub fn edges(&self) -> [LineSegment3<f32>; 12] {
        let c = &self.corners;
        std::array::from_fn(|n| {
            let i = n % 4;
            let next = (i + 1) % 4;
            match n / 4 {
                0 => LineSegment3::new(&c[i], &c[next]),
                1 => LineSegment3::new(&c[i + 4], &c[next + 4]),
                _ => LineSegment3::new(&c[i], &c[i + 4]),
            }
        })
    }

    #[inline]
    pub fn is_intersects_point_cloud(&self, points: &[Vector3<f32>]) -> bool {
        for plane in self.planes.iter() {
            if points.iter().all(|point| plane.dot(point) <= 0.0) {
                return false;
            }
        }
        true
    }

    #[inline]
    pub fn is_intersects_aabb(&self, aabb: &AxisAlignedBoundingBox) -> bool {
        if self.is_intersects_point_cloud(&aabb.corners()) {
            return true;
        }

        self.corners
            .iter()
            .any(|corner| aabb.is_contains_point(*corner))
    }

    #[inline]
    pub fn is_contains_point(&self, pt: Vector3<f32>) -> bool {
        self.planes.iter().all(|plane| plane.dot(&pt) > 0.0)
    }

    #[inline]
    pub fn is_intersects_sphere(&self, p: Vector3<f32>, r: f32) -> bool {
        for plane in self.planes.iter() {
            let d = plane.dot(&p);
            if d < -r {
                return false;
            }
            if d.abs() < r {
                return true;
            }
        }
        true
    }

    /// Clips a segment against the frustum planes using the parametric entering/leaving sweep.
    /// Returns `None` if no part of the segment is inside. A degenerate (zero-length) segment
    /// is reduced to a point-visibility test.
    pub fn clip_segment(&self, segment: &LineSegment3<f32>) -> Option<ClipRange> {
        if segment.is_degenerate() {
            return if self.is_contains_point(segment.start) {
                Some(ClipRange {
                    entering: 0.0,
                    leaving: 0.0,
                })
            } else {
                None
            };
        }

        let direction = segment.vector();
        let mut entering = 0.0f32;
        let mut leaving = 1.0f32;

        for plane in self.planes.iter() {
            // Inside means `numerator <= t * denominator`.
            let numerator = -plane.dot(&segment.start);
            let denominator = plane.normal.dot(&direction);

            if denominator == 0.0 {
                if numerator > 0.0 {
                    // Parallel to the plane and behind it.
                    return None;
                }
                continue;
            }

            let t = numerator / denominator;
            if denominator > 0.0 {
                entering = entering.max(t);
                if entering > leaving {
                    return None;
                }
            } else {
                leaving = leaving.min(t);
                if leaving < entering {
                    return None;
                }
            }
        }

        Some(ClipRange { entering, leaving })
    }

    #[inline]
    pub fn is_intersects_segment(&self, segment: &LineSegment3<f32>) -> bool {
        self.clip_segment(segment).is_some()
    }

    /// Tests two frustums for overlap: any corner of one inside the other, or any edge of one
    /// crossing the other. The test is symmetric.
    pub fn is_intersects_frustum(&self, other: &Frustum) -> bool {
        if other.corners.iter().any(|c| self.is_contains_point(*c))
            || self.corners.iter().any(|c| other.is_contains_point(*c))
        {
            return true;
        }

        other
            .edges()
            .iter()
            .any(|edge| self.is_intersects_segment(edge))
            || self
                .edges()
                .iter()
                .any(|edge| other.is_intersects_segment(edge))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segment::LineSegment3;
    use std::f32::consts::FRAC_PI_2;

    fn identity_frustum() -> Frustum {
        Frustum::from_view_projection_matrix(Matrix4::identity()).unwrap()
    }

    fn looking_along_y(position: Vector3<f32>, far: f32) -> Frustum {
        Frustum::from_perspective(position, Vector3::y(), Vector3::z(), FRAC_PI_2, 1.0, 0.1, far)
            .unwrap()
    }

    #[test]
    fn test_frustum_from_view_projection_matrix() {
        let f = identity_frustum();
        assert_eq!(f.planes[Frustum::LEFT], Plane::from_abcd(1.0, 0.0, 0.0, 1.0).unwrap());
        assert_eq!(f.planes[Frustum::FAR], Plane::from_abcd(0.0, 0.0, -1.0, 1.0).unwrap());
        assert_eq!(f.corners[0], Vector3::new(-1.0, 1.0, 1.0));
        assert_eq!(f.corners[6], Vector3::new(1.0, -1.0, -1.0));
        assert_eq!(f.center(), Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_frustum_from_perspective() {
        let f = looking_along_y(Vector3::zeros(), 10.0);

        assert!(f.is_contains_point(Vector3::new(0.0, 5.0, 0.0)));
        assert!(f.is_contains_point(Vector3::new(4.0, 5.0, -4.0)));
        assert!(!f.is_contains_point(Vector3::new(6.0, 5.0, 0.0)));
        assert!(!f.is_contains_point(Vector3::new(0.0, -1.0, 0.0)));
        assert!(!f.is_contains_point(Vector3::new(0.0, 11.0, 0.0)));
        assert!(!f.is_contains_point(Vector3::new(0.0, 0.05, 0.0)));

        // 90 degrees, aspect 1: far corners sit at +-far on both side axes.
        assert!((f.corners[0] - Vector3::new(-10.0, 10.0, 10.0)).norm() < 1.0e-4);
        assert!((f.corners[6] - Vector3::new(0.1, 0.1, -0.1)).norm() < 1.0e-4);
        assert!((f.far_plane_center() - Vector3::new(0.0, 10.0, 0.0)).norm() < 1.0e-4);
        assert!((f.near_plane_center() - Vector3::new(0.0, 0.1, 0.0)).norm() < 1.0e-4);

        for corner in f.corners() {
            for plane in f.planes() {
                assert!(plane.dot(corner) > -1.0e-3);
            }
        }

        assert!(Frustum::from_perspective(
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::z(),
            1.0,
            1.0,
            0.1,
            1.0
        )
        .is_none());
    }

    #[test]
    fn test_frustum_is_intersects_aabb() {
        let f = identity_frustum();
        assert!(f.is_intersects_aabb(&AxisAlignedBoundingBox::from_radius(0.5)));
        assert!(!f.is_intersects_aabb(&AxisAlignedBoundingBox::from_min_max(
            Vector3::new(5.0, 5.0, 5.0),
            Vector3::new(15.0, 15.0, 15.0)
        )));
    }

    #[test]
    fn test_frustum_is_intersects_sphere() {
        let f = identity_frustum();
        assert!(f.is_intersects_sphere(Vector3::new(0.0, 0.0, 0.0), 1.0));
        assert!(!f.is_intersects_sphere(Vector3::new(10.0, 10.0, 10.0), 1.0));
    }

    #[test]
    fn test_frustum_clip_segment() {
        let f = looking_along_y(Vector3::zeros(), 10.0);

        let through = LineSegment3::new(&Vector3::new(0.0, -10.0, 0.0), &Vector3::new(0.0, 20.0, 0.0));
        let range = f.clip_segment(&through).unwrap();
        assert!((range.entering - 10.1 / 30.0).abs() < 1.0e-4);
        assert!((range.leaving - 20.0 / 30.0).abs() < 1.0e-4);

        let outside = LineSegment3::new(&Vector3::new(50.0, 1.0, 0.0), &Vector3::new(50.0, 9.0, 0.0));
        assert!(f.clip_segment(&outside).is_none());

        let inside_point = LineSegment3::new(&Vector3::new(0.0, 5.0, 0.0), &Vector3::new(0.0, 5.0, 0.0));
        assert!(f.is_intersects_segment(&inside_point));
        let outside_point =
            LineSegment3::new(&Vector3::new(0.0, -5.0, 0.0), &Vector3::new(0.0, -5.0, 0.0));
        assert!(!f.is_intersects_segment(&outside_point));
    }

    #[test]
    fn test_frustum_intersection() {
        let a = looking_along_y(Vector3::zeros(), 10.0);
        let overlapping = looking_along_y(Vector3::new(0.0, 5.0, 0.0), 10.0);
        let far_away = looking_along_y(Vector3::new(100.0, 0.0, 0.0), 10.0);

        assert!(a.is_intersects_frustum(&overlapping));
        assert!(overlapping.is_intersects_frustum(&a));
        assert!(!a.is_intersects_frustum(&far_away));
        assert!(!far_away.is_intersects_frustum(&a));

        // Two thin frustums crossing each other without any corner inside the other one.
        let thin_x = Frustum::from_perspective(
            Vector3::new(-20.0, 5.0, 0.0),
            Vector3::x(),
            Vector3::z(),
            0.01,
            1.0,
            1.0,
            40.0,
        )
        .unwrap();
        let thin_y = Frustum::from_perspective(
            Vector3::new(0.0, -15.0, 0.0),
            Vector3::y(),
            Vector3::z(),
            0.01,
            1.0,
            1.0,
            40.0,
        )
        .unwrap();
        assert!(thin_x.is_intersects_frustum(&thin_y));
        assert!(thin_y.is_intersects_frustum(&thin_x));
    }

    #[test]
    fn test_frustum_edges() {
        let f = looking_along_y(Vector3::zeros(), 10.0);
        let edges = f.edges();
        assert_eq!(edges[0].start, f.corners[0]);
        assert_eq!(edges[3].end, f.corners[0]);
        assert_eq!(edges[4].start, f.corners[4]);
        assert_eq!(edges[11].end, f.corners[7]);
    }
}
