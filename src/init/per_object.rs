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

//! Frustum fitted around a single object, used for objects that need sharper shadows than the
//! cascades provide.

use crate::{
    camera::ViewFrustum,
    caster::CasterId,
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{CubeFaceMask, FrustumKind, ShadowFrustum},
    light::ShadowLight,
    MIN_SHADOW_RES_OMNI, SUN_DISTANCE,
};
use fyrox_math::{aabb::AxisAlignedBoundingBox, floor_power_of_two};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Shadow parameters of an object with its own shadow map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerObjectShadow {
    pub caster: CasterId,
    /// World bounds of the object.
    pub bounds: AxisAlignedBoundingBox,
    /// Scale of the bounds used to fit the frustum.
    pub bounds_scale: Vector3<f32>,
    pub texture_size: u32,
    pub const_bias: f32,
    pub slope_bias: f32,
    pub jitter: f32,
}

impl Default for PerObjectShadow {
    fn default() -> Self {
        Self {
            caster: Default::default(),
            bounds: Default::default(),
            bounds_scale: Vector3::new(1.0, 1.0, 1.0),
            texture_size: 1024,
            const_bias: 0.0001,
            slope_bias: 1.0,
            jitter: 1.0,
        }
    }
}

/// Fits `frustum` around the object as seen from the light.
pub fn init_per_object(
    frustum: &mut ShadowFrustum,
    object: &PerObjectShadow,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
) -> Result<(), ShadowError> {
    let half_extents = object
        .bounds
        .half_extents()
        .component_mul(&object.bounds_scale);
    let caster_box =
        AxisAlignedBoundingBox::from_center_half_extents(object.bounds.center(), half_extents);

    // Position of the light relative to the object.
    let light_relative_position = if light.is_directional() {
        light
            .sun_vector()
            .ok_or(ShadowError::ZeroDirection)?
            .scale(SUN_DISTANCE)
    } else {
        light.origin - caster_box.center()
    };
    let box_radius = caster_box.radius();
    let light_distance = light_relative_position.norm();

    let z_far = light_distance + box_radius;
    let z_near = (light_distance - box_radius).max(z_far * 0.005);
    ShadowError::check_depth_range(None, z_near, z_far)?;

    let texture_size = ((object.texture_size as f32 * ctx.settings.per_object_resolution_scale)
        as u32)
        .clamp(MIN_SHADOW_RES_OMNI, ctx.renderer.max_texture_size().max(MIN_SHADOW_RES_OMNI));

    frustum.kind = FrustumKind::PerObject;
    frustum.cascade = None;
    frustum.owner = Some(light.id);
    frustum.omni = false;
    frustum.blend = None;
    frustum.incremental = false;
    frustum.use_shadow_pool = false;
    frustum.face_mask = CubeFaceMask::POSITIVE_X;
    frustum.light_radius = light.radius;
    frustum.caster_box = caster_box;
    frustum.cascade_size = box_radius;
    frustum.texture_size = floor_power_of_two(texture_size);
    frustum.projection_translation = caster_box.center();
    frustum.light_relative_position = light_relative_position;
    frustum.fov = 2.0 * (box_radius / light_distance).atan();
    frustum.aspect = 1.0;
    frustum.z_near = z_near;
    frustum.z_far = z_far;
    frustum.bias.constant = object.const_bias;
    frustum.bias.slope = object.slope_bias;
    frustum.jitter = Vector2::new(object.jitter, object.jitter);
    frustum.frustum_size = 1.0 / box_radius.max(f32::EPSILON);
    frustum.update_frame = ctx.frame_id;

    let view = ViewFrustum::new(
        frustum.view_position(),
        -light_relative_position,
        Vector3::z(),
        frustum.fov,
        frustum.aspect,
        z_near,
        z_far,
    )?;
    frustum.views.clear();
    frustum.views.push(view);

    frustum.reset_caster_lists();
    frustum.casters.push(object.caster);
    frustum.request_update();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{caster::EmptyScene, renderer::RendererCaps, settings::ShadowSettings};

    #[test]
    fn test_frustum_encloses_object() {
        let camera = ViewFrustum::default();
        let settings = ShadowSettings::default();
        let caps = RendererCaps {
            max_texture_size: 512,
            ..Default::default()
        };
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let light = ShadowLight::point(Vector3::new(0.0, 0.0, 20.0), 100.0);
        let object = PerObjectShadow {
            caster: CasterId(42),
            bounds: AxisAlignedBoundingBox::from_min_max(
                Vector3::new(-1.0, -1.0, 0.0),
                Vector3::new(1.0, 1.0, 2.0),
            ),
            ..Default::default()
        };

        let mut frustum = ShadowFrustum::default();
        init_per_object(&mut frustum, &object, &light, &ctx).unwrap();
        assert_eq!(frustum.kind, FrustumKind::PerObject);
        assert_eq!(frustum.casters, vec![CasterId(42)]);
        assert_eq!(frustum.texture_size, 512);
        assert!(frustum.z_near > 0.0 && frustum.z_near < frustum.z_far);

        let view = frustum.main_view().unwrap();
        for corner in object.bounds.corners() {
            assert!(view.is_point_visible(&corner), "{corner:?}");
        }
    }

    #[test]
    fn test_object_at_light_position_is_rejected() {
        let camera = ViewFrustum::default();
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &EmptyScene);
        let light = ShadowLight::point(Vector3::zeros(), 10.0);
        let object = PerObjectShadow {
            bounds: AxisAlignedBoundingBox::from_radius(1.0),
            ..Default::default()
        };
        let mut frustum = ShadowFrustum::default();
        assert!(init_per_object(&mut frustum, &object, &light, &ctx).is_err());
    }
}
