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

//! Cascades of directional lights.

use crate::{
    camera::ViewFrustum,
    cascade::{blend_value, cascade_focus_box, CascadeCursor},
    caster::CasterFlags,
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{CascadeBlend, CubeFaceMask, FrustumKind, ShadowFrustum},
    light::ShadowLight,
    CASCADE_JITTER, MAX_PROJECTOR_FOV, SUN_DISTANCE,
};
use nalgebra::{Vector2, Vector3};

/// Safety margin applied to the largest on-screen extent of a cascade.
const FRUSTUM_EDGE_MARGIN: f32 = 1.37;
/// Smallest near plane relative to the far plane.
const MIN_NEAR_TO_FAR_RATIO: f32 = 0.005;

/// Fills the numeric fields of a sun cascade. `cursor` holds the half-size of the cascade box
/// and the distance of its projection center along the view axis.
pub fn init_sun_cascade(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
    cascade: usize,
    cursor: CascadeCursor,
) -> Result<(), ShadowError> {
    let settings = ctx.settings;
    let camera = ctx.camera;
    let sun_vector = light.sun_vector().ok_or(ShadowError::ZeroDirection)?;
    let box_size = cursor.radius;
    let distance = if settings.cascades_centered {
        0.0
    } else {
        cursor.distance
    };

    frustum.request_update();
    frustum.cascade = Some(cascade);
    frustum.owner = Some(light.id);
    frustum.omni = false;
    frustum.face_mask = CubeFaceMask::POSITIVE_X;
    frustum.incremental = false;
    frustum.use_shadow_pool = false;
    frustum.mgpu_copy = false;
    frustum.light_radius = light.radius;
    frustum.light_relative_position = sun_vector.scale(SUN_DISTANCE);
    frustum.cascade_size = box_size;
    frustum.caster_box = cascade_focus_box(camera, &sun_vector, box_size);

    frustum.fov = (2.0 * (box_size / SUN_DISTANCE).atan()).min(MAX_PROJECTOR_FOV);
    frustum.aspect = 1.0;

    let jitter = CASCADE_JITTER[cascade.min(CASCADE_JITTER.len() - 1)];
    frustum.jitter = Vector2::new(jitter, jitter);

    let light_distance = frustum.light_relative_position.norm();
    let edge_near = camera.edge_near();
    let edge_scale = (distance + box_size) / edge_near.y * edge_near.norm();
    let max_frustum_edge = (edge_near
        .try_normalize(f32::EPSILON)
        .ok_or(ShadowError::ZeroDirection)?
        .scale(edge_scale)
        - Vector3::new(0.0, distance, 0.0))
    .norm()
        * FRUSTUM_EDGE_MARGIN;

    let depth_range = 2.0 * settings.sun_clip_plane_range.max(max_frustum_edge);
    let shift = settings.sun_clip_plane_range_shift.clamp(0.0, 1.0);
    let near_adjust = (depth_range - max_frustum_edge) * (1.0 - shift) + max_frustum_edge * shift;

    let z_far = (light_distance + depth_range - near_adjust).min(light.radius);
    let z_near = (light_distance - near_adjust).max(z_far * MIN_NEAR_TO_FAR_RATIO);
    ShadowError::check_depth_range(Some(cascade), z_near, z_far)?;
    frustum.z_near = z_near;
    frustum.z_far = z_far;

    frustum.texture_size = settings.max_texture_resolution;
    frustum.projection_translation = camera.position() + camera.forward().scale(distance);
    frustum.frustum_size = 1.0 / (box_size * settings.cascade_range);
    frustum.update_frame = ctx.frame_id;
    frustum.blend = None;

    Ok(())
}

/// Orients a sun cascade initialized by [`init_sun_cascade`] and builds its views.
pub fn setup_sun_view(
    frustum: &mut ShadowFrustum,
    ctx: &ShadowFrameContext,
    cascade: usize,
) -> Result<(), ShadowError> {
    let settings = ctx.settings;
    let forward = -frustum.light_relative_position;
    let view = ViewFrustum::new(
        frustum.view_position(),
        forward,
        Vector3::z(),
        frustum.fov,
        frustum.aspect,
        frustum.z_near,
        frustum.z_far,
    )?;

    frustum.blend = if settings.blend_cascades {
        Some(CascadeBlend {
            value: blend_value(settings, cascade),
            view: view.with_projection(
                frustum.fov * settings.blend_cascades_value,
                frustum.aspect,
                frustum.z_near,
                frustum.z_far,
            )?,
        })
    } else {
        None
    };

    frustum.views.clear();
    frustum.views.push(view);

    frustum.caster_filter = if frustum.kind == FrustumKind::GsmDynamicDistance {
        CasterFlags::DYNAMIC_DISTANCE_SHADOWS
    } else {
        CasterFlags::empty()
    };

    if frustum.update_requested {
        frustum.reset_caster_lists();
    }

    Ok(())
}

/// Initializes and orients a sun cascade.
pub fn init_directional(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
    cascade: usize,
    cursor: CascadeCursor,
) -> Result<(), ShadowError> {
    init_sun_cascade(frustum, light, ctx, cascade, cursor)?;
    setup_sun_view(frustum, ctx, cascade)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{caster::EmptyScene, renderer::RendererCaps, settings::ShadowSettings};

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

    fn sun() -> ShadowLight {
        ShadowLight::directional(Vector3::new(0.3, 0.4, -1.0))
    }

    #[test]
    fn test_cascade_fields() {
        let camera = camera();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene).with_frame_id(7);
        let light = sun();

        let mut frustum = ShadowFrustum::default();
        let cursor = CascadeCursor::first(&camera, &settings);
        init_directional(&mut frustum, &light, &ctx, 0, cursor).unwrap();

        assert_eq!(frustum.cascade, Some(0));
        assert_eq!(frustum.owner, Some(light.id));
        assert_eq!(frustum.update_frame, 7);
        assert_eq!(frustum.texture_size, settings.max_texture_resolution);
        assert_eq!(frustum.jitter, Vector2::new(CASCADE_JITTER[0], CASCADE_JITTER[0]));
        assert!(frustum.z_near > 0.0 && frustum.z_near < frustum.z_far);
        assert!(frustum.z_far <= light.radius);
        assert!(frustum.fov > 0.0 && frustum.fov < MAX_PROJECTOR_FOV);
        assert_eq!(frustum.views.len(), 1);
        assert!(frustum.blend.is_some());

        // The view looks along the light and sees the cascade focus.
        let view = frustum.main_view().unwrap();
        let travel = light.direction.normalize();
        assert!((view.forward() - travel).norm() < 1.0e-4);
        let focus = frustum.projection_translation;
        let depth = (focus - view.position()).dot(&view.forward());
        assert!(depth > frustum.z_near && depth < frustum.z_far);
    }

    #[test]
    fn test_reinit_is_bit_identical() {
        let camera = camera();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let light = sun();
        let cursor = CascadeCursor {
            radius: 27.0,
            distance: 31.5,
        };

        let mut a = ShadowFrustum::default();
        init_directional(&mut a, &light, &ctx, 2, cursor).unwrap();
        let mut b = a.clone();
        init_directional(&mut b, &light, &ctx, 2, cursor).unwrap();

        for (x, y) in [
            (a.fov, b.fov),
            (a.z_near, b.z_near),
            (a.z_far, b.z_far),
            (a.frustum_size, b.frustum_size),
            (a.cascade_size, b.cascade_size),
        ] {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(a.projection_translation, b.projection_translation);
        assert_eq!(a.light_relative_position, b.light_relative_position);
        assert_eq!(a.views, b.views);
        assert_eq!(a.blend, b.blend);
    }

    #[test]
    fn test_centered_cascades() {
        let camera = camera();
        let settings = ShadowSettings {
            cascades_centered: true,
            blend_cascades: false,
            ..Default::default()
        };
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let mut frustum = ShadowFrustum::default();
        init_directional(
            &mut frustum,
            &sun(),
            &ctx,
            1,
            CascadeCursor {
                radius: 9.0,
                distance: 12.0,
            },
        )
        .unwrap();
        assert_eq!(frustum.projection_translation, camera.position());
        assert!(frustum.blend.is_none());
    }

    #[test]
    fn test_zero_direction_is_rejected() {
        let camera = camera();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let light = ShadowLight::directional(Vector3::zeros());
        let mut frustum = ShadowFrustum::default();
        assert_eq!(
            init_directional(
                &mut frustum,
                &light,
                &ctx,
                0,
                CascadeCursor::first(&camera, &settings)
            ),
            Err(ShadowError::ZeroDirection)
        );
    }

    #[test]
    fn test_distance_cascade_filters_casters() {
        let camera = camera();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let mut frustum = ShadowFrustum::new(FrustumKind::GsmDynamicDistance);
        init_directional(
            &mut frustum,
            &sun(),
            &ctx,
            3,
            CascadeCursor {
                radius: 81.0,
                distance: 100.0,
            },
        )
        .unwrap();
        assert_eq!(frustum.caster_filter, CasterFlags::DYNAMIC_DISTANCE_SHADOWS);
    }
}
