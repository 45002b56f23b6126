// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Cascade placement math of directional lights.
//!
//! Every cascade is a sphere of growing radius whose center lies on the view axis. The center of
//! the next cascade is chosen so that the sphere just touches the point where the previous one
//! leaves the screen, which keeps cascades overlapping without gaps.

use crate::{camera::ViewFrustum, settings::ShadowSettings, DRAW_NEAREST_MIN};
use fyrox_math::aabb::AxisAlignedBoundingBox;
use nalgebra::Vector3;

/// Distance along the view axis at which a sphere of `radius` just touches the camera-space
/// edge point `edge` (x - half-width, y - depth, z - half-height).
#[inline]
pub fn lod_projection_center(edge: &Vector3<f32>, radius: f32) -> f32 {
    let screen_edge_sq = edge.z * edge.z + edge.x * edge.x;
    let radius_sq = (radius * radius).max(2.0 * screen_edge_sq);
    (radius_sq - screen_edge_sq).sqrt() + edge.y
}

/// Camera-space point where the sphere of the previous cascade (centered on the view axis at
/// `prev_distance`) leaves the edge line of the view frustum.
pub fn next_screen_edge(camera: &ViewFrustum, prev_radius: f32, prev_distance: f32) -> Vector3<f32> {
    let edge_near = camera.edge_near();
    let edge_far = camera.edge_far();
    let center = Vector3::new(0.0, prev_distance, 0.0);

    let edge = edge_far - edge_near;
    let Some(edge_dir) = edge.try_normalize(f32::EPSILON) else {
        return edge_near;
    };
    let distance = (center - edge_near).cross(&edge).norm() / edge.norm();
    let half_chord = (prev_radius * prev_radius - distance * distance)
        .max(0.0)
        .sqrt();

    edge_near + edge_dir.scale(2.0 * half_chord)
}

/// Near edge of the first cascade. Its depth is clamped so that cascade 0 starts close to the
/// camera even with a large near plane.
#[inline]
pub fn first_cascade_edge(camera: &ViewFrustum) -> Vector3<f32> {
    let mut edge = camera.edge_near();
    edge.y = edge.y.min(DRAW_NEAREST_MIN);
    edge
}

/// Share of a cascade that is not blended with the next one.
#[inline]
pub fn blend_value(settings: &ShadowSettings, cascade: usize) -> f32 {
    let radius = settings.cascade_radius(cascade);
    if radius <= 0.0 {
        return 0.0;
    }
    (radius - settings.blend_cascades_value * (cascade + 1) as f32) / radius
}

/// Box a sun cascade is focused on: the camera moved along the horizontal (light-orthogonal)
/// part of the view direction by the cascade size.
pub fn cascade_focus_box(
    camera: &ViewFrustum,
    sun_vector: &Vector3<f32>,
    cascade_size: f32,
) -> AxisAlignedBoundingBox {
    let view_dir = camera.forward();
    let view_dir_no_depth = view_dir - sun_vector.scale(view_dir.dot(sun_vector));
    let focus = camera.position() + view_dir_no_depth.scale(cascade_size);
    AxisAlignedBoundingBox::from_center_half_extents(
        focus,
        Vector3::new(cascade_size, cascade_size, cascade_size),
    )
}

/// Radius and projection distance of a cascade. Advancing the cursor walks the cascade
/// sequence from the camera outwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CascadeCursor {
    pub radius: f32,
    pub distance: f32,
}

impl CascadeCursor {
    /// Cursor at the first cascade.
    pub fn first(camera: &ViewFrustum, settings: &ShadowSettings) -> Self {
        let radius = settings.cascade_range;
        Self {
            radius,
            distance: lod_projection_center(&first_cascade_edge(camera), radius),
        }
    }

    /// Moves to the next cascade.
    pub fn advance(&mut self, camera: &ViewFrustum, step: f32) {
        let edge = next_screen_edge(camera, self.radius, self.distance);
        self.radius *= step;
        self.distance = lod_projection_center(&edge, self.radius);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> ViewFrustum {
        ViewFrustum::new(
            Vector3::zeros(),
            Vector3::y(),
            Vector3::z(),
            60.0f32.to_radians(),
            16.0 / 9.0,
            0.1,
            1000.0,
        )
        .unwrap()
    }

    #[test]
    fn test_projection_center() {
        // Sphere touching a point on the axis.
        assert_relative_eq!(
            lod_projection_center(&Vector3::new(0.0, 2.0, 0.0), 3.0),
            5.0
        );
        // Radius too small for the edge: falls back to the edge distance.
        let edge = Vector3::new(3.0, 1.0, 4.0);
        assert_relative_eq!(lod_projection_center(&edge, 1.0), 5.0 + 1.0);
        // Regular case.
        let edge = Vector3::new(0.3, 0.0, 0.4);
        assert_relative_eq!(
            lod_projection_center(&edge, 1.0),
            (1.0f32 - 0.25).sqrt(),
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn test_screen_edge_is_near_sphere() {
        let camera = camera();
        let radius = 10.0;
        let distance = lod_projection_center(&first_cascade_edge(&camera), radius);
        let edge = next_screen_edge(&camera, radius, distance);
        let center = Vector3::new(0.0, distance, 0.0);
        assert!(((edge - center).norm() - radius).abs() < radius * 0.02);
        assert!(edge.y > camera.z_near());
        // The point stays on the edge line of the view frustum.
        let far = camera.edge_far();
        assert_relative_eq!(edge.x / edge.y, far.x / far.y, epsilon = 1.0e-3);
    }

    #[test]
    fn test_cursor_grows_monotonically() {
        let camera = camera();
        let settings = ShadowSettings::default();
        let mut cursor = CascadeCursor::first(&camera, &settings);
        assert_eq!(cursor.radius, settings.cascade_range);
        for _ in 0..5 {
            let previous = cursor;
            cursor.advance(&camera, settings.cascade_range_step);
            assert_relative_eq!(cursor.radius, previous.radius * settings.cascade_range_step);
            assert!(cursor.distance > previous.distance);
        }
    }

    #[test]
    fn test_blend_value() {
        let settings = ShadowSettings::default();
        let value = blend_value(&settings, 0);
        assert_relative_eq!(value, (3.0 - 0.75) / 3.0);
        assert!(blend_value(&settings, 3) > value);
    }

    #[test]
    fn test_focus_box_ignores_vertical_view_component() {
        let camera = ViewFrustum::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 1.0, -1.0),
            Vector3::z(),
            1.0,
            1.0,
            0.1,
            100.0,
        )
        .unwrap();
        let aabb = cascade_focus_box(&camera, &Vector3::z(), 4.0);
        let center = aabb.center();
        assert_relative_eq!(center.z, 3.0, epsilon = 1.0e-5);
        assert!(center.y > 2.0);
        assert_relative_eq!(aabb.half_extents(), Vector3::new(4.0, 4.0, 4.0));
    }
}
