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

//! Cube-face frustums of point lights.

use crate::{
    camera::ViewFrustum,
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{CubeFaceMask, ShadowFrustum},
    init::projector::init_projector,
    light::ShadowLight,
};
use arrayvec::ArrayVec;
use nalgebra::Vector3;

/// Forward and up vectors of the cube faces, in the order of [`CubeFaceMask`] bits.
pub const CUBE_FACES: [(Vector3<f32>, Vector3<f32>); 6] = [
    (Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, -1.0)),
    (Vector3::new(0.0, -1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 1.0, 0.0)),
    (Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 1.0, 0.0)),
];

const FACE_FOV: f32 = std::f32::consts::FRAC_PI_2;

/// Builds the six face views of an omni frustum centered at `position`.
pub fn cube_face_views(
    position: Vector3<f32>,
    z_near: f32,
    z_far: f32,
) -> Result<ArrayVec<ViewFrustum, 6>, ShadowError> {
    let mut views = ArrayVec::new();
    for (forward, up) in CUBE_FACES.iter() {
        views.push(ViewFrustum::new(
            position, *forward, *up, FACE_FOV, 1.0, z_near, z_far,
        )?);
    }
    Ok(views)
}

/// Marks the faces that intersect the camera.
pub fn visible_faces(camera: &ViewFrustum, views: &[ViewFrustum]) -> CubeFaceMask {
    views
        .iter()
        .enumerate()
        .filter(|(_, view)| camera.is_intersects(view))
        .fold(CubeFaceMask::empty(), |mask, (i, _)| {
            mask | CubeFaceMask::face(i)
        })
}

/// Initializes the omni frustum of a point light: projector optics, then the face views and
/// their visibility.
pub fn init_omni(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
) -> Result<(), ShadowError> {
    frustum.omni = true;
    init_projector(frustum, light, ctx)?;

    let views = cube_face_views(frustum.view_position(), frustum.z_near, frustum.z_far)?;
    frustum.face_mask = visible_faces(ctx.camera, &views);
    frustum.views = views;
    frustum.reset_caster_lists();
    frustum.request_update();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{caster::EmptyScene, renderer::RendererCaps, settings::ShadowSettings};

    #[test]
    fn test_faces_are_orthonormal() {
        for (forward, up) in CUBE_FACES.iter() {
            assert_eq!(forward.dot(up), 0.0);
            assert_eq!(forward.norm(), 1.0);
        }
    }

    #[test]
    fn test_single_visible_face() {
        let camera = ViewFrustum::new(
            Vector3::zeros(),
            Vector3::y(),
            Vector3::z(),
            10.0f32.to_radians(),
            1.0,
            0.1,
            10.0,
        )
        .unwrap();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let light = ShadowLight::point(Vector3::new(0.0, -20.0, 0.0), 50.0);

        let mut frustum = ShadowFrustum::default();
        init_omni(&mut frustum, &light, &ctx).unwrap();
        assert!(frustum.omni);
        assert_eq!(frustum.views.len(), 6);
        assert_eq!(frustum.face_mask, CubeFaceMask::POSITIVE_Y);
        assert_eq!(frustum.face_mask.bits().count_ones(), 1);
        assert_eq!(frustum.visible_views().count(), 1);
        assert!(frustum.texture_size <= settings.max_texture_resolution / 2);
    }

    #[test]
    fn test_point_light_needs_no_direction() {
        let camera = ViewFrustum::new(
            Vector3::zeros(),
            Vector3::y(),
            Vector3::z(),
            60.0f32.to_radians(),
            1.0,
            0.1,
            100.0,
        )
        .unwrap();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let mut light = ShadowLight::point(Vector3::new(0.0, 20.0, 0.0), 15.0);
        light.direction = Vector3::zeros();

        let mut frustum = ShadowFrustum::default();
        init_omni(&mut frustum, &light, &ctx).unwrap();
        assert_eq!(frustum.views.len(), 6);
        assert!((frustum.view_position() - light.origin).norm() < 1.0e-4);
        assert!(!frustum.face_mask.is_empty());
    }

    #[test]
    fn test_camera_inside_light_sees_several_faces() {
        let camera = ViewFrustum::new(
            Vector3::zeros(),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::z(),
            90.0f32.to_radians(),
            1.0,
            0.1,
            100.0,
        )
        .unwrap();
        let views = cube_face_views(Vector3::zeros(), 0.01, 50.0).unwrap();
        let mask = visible_faces(&camera, &views);
        assert!(mask.contains(CubeFaceMask::POSITIVE_X | CubeFaceMask::POSITIVE_Y));
        assert!(!mask.contains(CubeFaceMask::NEGATIVE_Y));
    }
}
