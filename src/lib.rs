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

//! Shadow frustum management of the Fyrox renderer.
//!
//! Once per frame every shadow casting light decides how many shadow frustums it needs, where
//! they are placed, how they are projected and how they are refreshed. Directional lights are
//! covered by a sequence of cascades: dynamic cascades are rendered every frame, cached cascades
//! keep static casters across frames and are refreshed fully, time-sliced or incrementally. Spot
//! lights use a single projector frustum, point lights use six cube faces. The renderer, the
//! scene and the configuration are collaborators accessed through [`context::ShadowFrameContext`].
//!
//! The entry point is [`light_source::LightShadowMaps::update`].

pub mod log;

pub mod bias;
pub mod cache;
pub mod camera;
pub mod cascade;
pub mod caster;
pub mod context;
pub mod error;
pub mod frustum;
pub mod hull;
pub mod init;
pub mod light;
pub mod light_source;
pub mod renderer;
pub mod settings;

pub use fyrox_math as math;

/// Maximum amount of cascades of a directional light, the last entry is reserved.
pub const MAX_CASCADES: usize = 8;
/// Maximum amount of cached cascades of a directional light.
pub const MAX_CACHED_CASCADES: usize = 3;
/// Amount of frustum slots of a light.
pub const MAX_FRUSTUM_SLOTS: usize = 16;
/// Distance from the projection center to the virtual position of the sun.
pub const SUN_DISTANCE: f32 = 1.0e6;
/// Widest field of view of a projector frustum.
pub const MAX_PROJECTOR_FOV: f32 = 175.0 * std::f32::consts::PI / 180.0;
/// Depth of the near edge of the first cascade. Foreground geometry may be placed in front of
/// the camera near plane.
pub const DRAW_NEAREST_MIN: f32 = 0.03;
/// Smallest shadow map of a deferred projector light.
pub const MIN_SHADOW_RES_PROJECTOR: u32 = 128;
/// Smallest shadow map of a deferred omni light, also the smallest per-object map.
pub const MIN_SHADOW_RES_OMNI: u32 = 64;
/// Sampling kernel widths of sun cascades.
pub const CASCADE_JITTER: [f32; MAX_CASCADES] = [1.94, 1.0, 0.8, 0.5, 0.3, 0.3, 0.3, 0.3];

pub mod prelude {
    pub use crate::{
        cache::{mgpu::MultiGpuFrustumCache, CacheUpdateStrategy},
        camera::ViewFrustum,
        caster::{CasterFlags, CasterId, CasterQuery, ShadowCasterSource, TraversalJob},
        context::ShadowFrameContext,
        error::ShadowError,
        frustum::{FrustumKind, ShadowFrustum},
        init::per_object::PerObjectShadow,
        light::{LightKind, ShadowLight},
        light_source::{LightShadowMaps, ShadowUpdateSummary},
        renderer::{RendererCaps, ShadowRendererInfo},
        settings::{ShadowCastingMode, ShadowSettings},
    };
}
