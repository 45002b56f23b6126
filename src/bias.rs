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

//! Depth bias of shadow maps.

use crate::{
    frustum::{DepthBias, FrustumKind, ShadowFrustum},
    light::ShadowLight,
    settings::ShadowSettings,
};

const DEFAULT_BIAS_CLAMP: f32 = 0.001;
const AUTO_BIAS_CLAMP: f32 = 1000.0;
const MAX_CACHED_CONST_BIAS: f32 = 0.005;
const MAX_TEST_BIAS: f32 = 0.005;
const MIN_NEAR_FIELD_TEST_BIAS: f32 = 0.0005;
const NEAR_FIELD_DISTANCE: f32 = 1000.0;
const NEAREST_SLOPE_SCALE: f32 = 7.0;

/// Inputs of the bias calculation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BiasParams {
    pub cascade: usize,
    /// Half-size of the cascade box.
    pub cascade_size: f32,
    pub directional: bool,
    pub kind: FrustumKind,
    pub z_near: f32,
    pub z_far: f32,
    pub fov: f32,
    pub texture_size: u32,
    /// Constant bias multiplier of a local light.
    pub light_bias: f32,
    /// Slope bias multiplier of a local light.
    pub light_slope_bias: f32,
}

impl BiasParams {
    /// Collects the inputs from an initialized frustum.
    pub fn new(
        frustum: &ShadowFrustum,
        light: &ShadowLight,
        cascade: usize,
        cascade_size: f32,
    ) -> Self {
        Self {
            cascade,
            cascade_size,
            directional: light.is_directional(),
            kind: frustum.kind,
            z_near: frustum.z_near,
            z_far: frustum.z_far,
            fov: frustum.fov,
            texture_size: frustum.texture_size,
            light_bias: light.shadow_bias,
            light_slope_bias: light.shadow_slope_bias,
        }
    }
}

/// Computes the depth bias of a shadow map.
///
/// Sun cascades scale per-cascade tables by the depth span of the cascade, cached ones have
/// their constant part capped. With auto bias enabled the constant part follows the texel
/// footprint instead. Local lights scale their own multipliers by the far distance.
pub fn shadow_bias(params: &BiasParams, settings: &ShadowSettings) -> DepthBias {
    let bias = &settings.bias;
    let depth_span = params.z_far - params.z_near;
    let lod = params.cascade.min(bias.cascade_const_bias.len() - 1);

    let mut result = DepthBias {
        clamp: DEFAULT_BIAS_CLAMP,
        ..Default::default()
    };

    if params.directional {
        let size = params.cascade_size;
        let ratio = (size * 0.5).min(1.0);
        let const_ratio = bias.cascade_const_bias[lod] * bias.const_bias_scale * ratio;
        let slope_ratio = bias.cascade_slope_bias[lod] * bias.slope_bias_scale * ratio;

        result.constant = const_ratio * depth_span / (872727.27 * 2.0);
        result.test = ratio * depth_span * (size * 0.25 + 0.5) * 0.0000005;
        result.slope = slope_ratio * (size / settings.cascade_range.max(0.00001)) * 0.1;

        if params.kind == FrustumKind::Nearest {
            result.slope *= NEAREST_SLOPE_SCALE;
        }

        if params.kind.is_cached() {
            result.constant = result.constant.min(MAX_CACHED_CONST_BIAS);
        }

        if bias.auto_bias > 0.0 && params.texture_size > 0 && depth_span > 0.0 {
            let texel_size = (params.fov * 0.5).tan() / (params.texture_size as f32 * 0.5);
            result.constant = 0.6 * texel_size / depth_span;
            result.slope = 2.5 * bias.auto_bias;
            result.clamp = AUTO_BIAS_CLAMP;
        }
    } else {
        result.constant = params.light_bias * 0.000003 * params.z_far;
        result.test = 0.00028 * params.z_far;
        result.slope = params.light_slope_bias * bias.slope_bias_scale;
    }

    result.test = result.test.min(MAX_TEST_BIAS);
    if params.z_near < NEAR_FIELD_DISTANCE {
        result.test = result.test.max(MIN_NEAR_FIELD_TEST_BIAS);
    }

    result
}

/// Computes and stores the bias of an initialized frustum.
pub fn apply_shadow_bias(
    frustum: &mut ShadowFrustum,
    light: &ShadowLight,
    cascade: usize,
    cascade_size: f32,
    settings: &ShadowSettings,
) {
    frustum.bias = shadow_bias(
        &BiasParams::new(frustum, light, cascade, cascade_size),
        settings,
    );
}
