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

//! Single perspective frustum of spot and area lights. Omni lights reuse it for their optics.

use crate::{
    camera::ViewFrustum,
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{CubeFaceMask, ShadowFrustum},
    light::{FrustumStrategy, ShadowLight},
    log::once,
    warn_once, MAX_PROJECTOR_FOV, MIN_SHADOW_RES_OMNI, MIN_SHADOW_RES_PROJECTOR,
};
use fyrox_math::floor_power_of_two;
use nalgebra::{Vector2, Vector3};

const PROJECTOR_NEAR: f32 = 0.01;
/// Smallest far plane of a projector frustum.
const MIN_PROJECTOR_FAR: f32 = 0.001;
/// Near plane of lights with a tiny radius, relative to the far plane.
const MIN_NEAR_TO_FAR_RATIO: f32 = 0.01;
/// Axis used by lights without a direction.
const FALLBACK_DIRECTION: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);
const MIN_PROJECTOR_FOV: f32 = 0.0001 * std::f32::consts::PI / 180.0;
/// Distance under which the footprint of a projector stops growing.
const MIN_FOOTPRINT_DISTANCE: f32 = 5.0;
/// Screen-size constant of the adaptive resolution loop.
const FOOTPRINT_SCALE: f32 = 800.0;
/// Coverage divisor of omni lights in the deferred resolution estimate.
const OMNI_COVERAGE_DIVISOR: f32 = 3.5;

/// Texture resolution of a projector halved while its projected footprint stays below the
/// resolution. The loop never goes under `floor`.
pub fn adaptive_resolution(
    max_resolution: u32,
    floor: u32,
    distance: f32,
    radius: f32,
    luminance: f32,
    fov_degrees: f32,
) -> u32 {
    let adjusted_distance = (distance - radius).max(MIN_FOOTPRINT_DISTANCE);
    let footprint = FOOTPRINT_SCALE / adjusted_distance * radius * luminance * (fov_degrees / 90.0);
    let mut resolution = max_resolution;
    while resolution as f32 > footprint && resolution > floor {
        resolution /= 2;
    }
    resolution
}

/// Inputs of the deferred light resolution estimate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeferredResolutionParams {
    pub distance: f32,
    pub radius: f32,
    pub resolution_scale: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub adapt_scale: f32,
    pub coverage_scale: f32,
    pub max_resolution: u32,
    pub pool_size: u32,
    pub projector: bool,
    /// Minimal resolution as a fraction of the pool, see [`ShadowLight::shadow_min_resolution`].
    pub min_resolution: u8,
}

/// Resolution of a map in the shadow pool, proportional to the share of the logarithmic depth
/// range of the camera covered by the light. Returns the resolution and whether the requested
/// resolution exceeded the physical size of the pool.
pub fn deferred_resolution(params: &DeferredResolutionParams) -> (u32, bool) {
    let scaled_radius = params.radius * params.resolution_scale;
    let (z0, z1) = if params.distance <= params.radius {
        (params.camera_near, 2.0 * scaled_radius)
    } else {
        (
            params.camera_near.max(params.distance - scaled_radius),
            params.distance + scaled_radius,
        )
    };

    let camera_factor = (params.camera_far / params.camera_near).ln();
    let adapt = params.adapt_scale.ln();
    let slice = |z: f32| (z / params.camera_near).ln() / adapt / camera_factor;

    let mut coverage = params.coverage_scale;
    if !params.projector {
        coverage /= OMNI_COVERAGE_DIVISOR;
    }
    let estimate = (slice(z1) - slice(z0)) * params.max_resolution as f32 * coverage;
    let estimate = if estimate.is_finite() {
        estimate.max(0.0) as u32
    } else {
        0
    };

    let (mut min, mut max, physical) = if params.projector {
        (MIN_SHADOW_RES_PROJECTOR, params.max_resolution, params.pool_size)
    } else {
        (
            MIN_SHADOW_RES_OMNI,
            params.max_resolution >> 1,
            params.pool_size >> 2,
        )
    };
    if params.min_resolution > 0 {
        min = params.pool_size >> (4 - params.min_resolution.min(4));
        if min > max {
            max = physical.min(min);
        }
    }

    let requested = estimate.max(min);
    let resolution = requested.min(max).min(physical);
    (floor_power_of_two(resolution), requested > physical)
}

/// Frames between two updates of a map in the shadow pool.
pub fn pool_update_rate(light: &ShadowLight, distance: f32, zoom: f32, view_dist_ratio: f32) -> u8 {
    let ratio = light.shadow_update_ratio * view_dist_ratio;
    if ratio <= 0.0 {
        return u8::MAX;
    }
    let update_distance = (distance - light.shadow_update_min_radius).max(0.0);
    (update_distance * zoom / ratio).min(u8::MAX as f32) as u8
}

/// Fills the numeric fields of a projector frustum. `frustum.omni` selects the omni variant:
/// omni lights reuse these optics with a 90 degree face.
///
/// Lights with a tiny radius keep their shadow: the far plane is clamped to a small minimum and
/// the near plane is pulled in to a fraction of it. A light without a direction looks down.
pub fn init_projector(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
) -> Result<(), ShadowError> {
    let settings = ctx.settings;
    let camera = ctx.camera;
    let direction = light
        .direction
        .try_normalize(f32::EPSILON)
        .unwrap_or(FALLBACK_DIRECTION);
    let radius = light.radius.max(MIN_PROJECTOR_FAR);
    let z_near = PROJECTOR_NEAR.min(radius * MIN_NEAR_TO_FAR_RATIO);
    ShadowError::check_depth_range(None, z_near, radius)?;

    if frustum.light_radius != radius {
        frustum.request_update();
    }

    frustum.cascade = None;
    frustum.owner = Some(light.id);
    frustum.blend = None;
    frustum.incremental = false;
    frustum.mgpu_copy = false;
    frustum.light_radius = radius;
    frustum.light_relative_position = -direction.scale(radius);
    frustum.projection_translation = light.origin - frustum.light_relative_position;
    frustum.cascade_size = light.effective_radius();
    frustum.caster_box = light.bounds();
    frustum.fov = light.cone_angle().clamp(MIN_PROJECTOR_FOV, MAX_PROJECTOR_FOV);
    frustum.aspect = 1.0;
    frustum.z_near = z_near;
    frustum.z_far = radius;
    frustum.face_mask = CubeFaceMask::POSITIVE_X;
    frustum.jitter = Vector2::new(1.0, 1.0);
    frustum.use_shadow_pool = light.deferred;

    let max_resolution = if frustum.omni {
        settings.max_texture_resolution / 2
    } else {
        settings.max_texture_resolution
    };
    let distance = (camera.position() - light.origin).norm();

    let texture_size = if light.deferred {
        let (resolution, limited) = deferred_resolution(&DeferredResolutionParams {
            distance,
            radius,
            resolution_scale: light.shadow_resolution_scale,
            camera_near: camera.z_near(),
            camera_far: camera.z_far(),
            adapt_scale: settings.shadows_adapt_scale,
            coverage_scale: settings.shadows_res_scale,
            max_resolution: settings.max_texture_resolution,
            pool_size: settings.shadow_pool_size,
            projector: light.strategy() == FrustumStrategy::Projector,
            min_resolution: light.shadow_min_resolution,
        });
        if limited {
            warn_once!(
                once::POOL_CAPACITY,
                "Shadow map resolution of light {} is limited by the shadow pool size {}.",
                light.id,
                settings.shadow_pool_size
            );
        }
        resolution
    } else {
        adaptive_resolution(
            max_resolution,
            settings.adaptive_resolution_floor,
            distance,
            radius,
            light.luminance(),
            frustum.fov.to_degrees(),
        )
    };

    if frustum.texture_size != texture_size {
        frustum.request_update();
    }
    frustum.texture_size = texture_size;
    frustum.frustum_size = 20.0 * texture_size as f32 / 64.0;
    frustum.update_frame = ctx.frame_id;
    frustum.pool_update_rate = pool_update_rate(
        light,
        distance,
        camera.zoom_factor(),
        settings.update_view_dist_ratio,
    );

    Ok(())
}

/// Orients a projector frustum initialized by [`init_projector`].
pub fn setup_projector_view(frustum: &mut ShadowFrustum) -> Result<(), ShadowError> {
    let view = ViewFrustum::new(
        frustum.view_position(),
        -frustum.light_relative_position,
        Vector3::z(),
        frustum.fov,
        frustum.aspect,
        frustum.z_near,
        frustum.z_far,
    )?;
    frustum.views.clear();
    frustum.views.push(view);
    frustum.reset_caster_lists();
    frustum.request_update();
    Ok(())
}

/// Initializes and orients the frustum of a spot or area light.
pub fn init_spot(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    ctx: &ShadowFrameContext,
) -> Result<(), ShadowError> {
    frustum.omni = false;
    init_projector(frustum, light, ctx)?;
    setup_projector_view(frustum)
}
