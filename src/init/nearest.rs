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

//! Overlay frustum for geometry in front of the main near plane.

use crate::{
    bias::apply_shadow_bias,
    frustum::{FrustumKind, ShadowFrustum},
    light::ShadowLight,
    settings::ShadowSettings,
};

const NEAREST_CONST_BIAS: f32 = 0.0001;

/// Copies the first cascade of a sun into `frustum` and turns it into the nearest overlay.
///
/// The overlay gets the bias of a first-level cascade of its own kind, with a fixed constant part.
pub fn init_nearest(
    frustum: &mut ShadowFrustum,
    first_cascade: &ShadowFrustum,
    light: &ShadowLight,
    settings: &ShadowSettings,
) {
    frustum.clone_from(first_cascade);
    frustum.kind = FrustumKind::Nearest;
    frustum.use_shadow_pool = false;
    frustum.fade_distance = 1.0;
    frustum.cache = None;
    apply_shadow_bias(frustum, light, 0, first_cascade.cascade_size, settings);
    frustum.bias.constant = NEAREST_CONST_BIAS;
}
