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

//! Tunables of the shadow subsystem. Settings are polled once per light update and never
//! modified by it, so a single instance can be shared between all lights of a scene.

use crate::MAX_CASCADES;
use fyrox_math::aabb::AxisAlignedBoundingBox;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Restricts which light categories are allowed to cast shadows.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum ShadowCastingMode {
    /// Every light casts shadows.
    #[default]
    All,
    /// Only directional (sun) lights cast shadows.
    SunOnly,
    /// Only local lights (spot, point, area) cast shadows.
    LocalOnly,
}

impl ShadowCastingMode {
    /// Returns `true` if a light of the given category is allowed to cast shadows.
    pub fn allows(self, directional: bool) -> bool {
        match self {
            ShadowCastingMode::All => true,
            ShadowCastingMode::SunOnly => directional,
            ShadowCastingMode::LocalOnly => !directional,
        }
    }
}

/// Depth bias tuning.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasSettings {
    /// Global multiplier of the constant bias of directional cascades.
    pub const_bias_scale: f32,
    /// Global multiplier of the slope bias of every light.
    pub slope_bias_scale: f32,
    /// Per-cascade constant bias factors.
    pub cascade_const_bias: [f32; MAX_CASCADES],
    /// Per-cascade slope bias factors.
    pub cascade_slope_bias: [f32; MAX_CASCADES],
    /// When positive, constant bias of directional cascades is derived from the texel footprint
    /// and slope bias becomes `2.5 * auto_bias`.
    pub auto_bias: f32,
}

impl Default for BiasSettings {
    fn default() -> Self {
        Self {
            const_bias_scale: 1.0,
            slope_bias_scale: 1.0,
            cascade_const_bias: [1.0; MAX_CASCADES],
            cascade_slope_bias: [1.0; MAX_CASCADES],
            auto_bias: 0.0,
        }
    }
}

/// Settings of the cached (static) cascades of directional lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedShadowSettings {
    /// Index of the first cascade that is served from the cache. `None` disables caching.
    pub first_cached_cascade: Option<usize>,
    /// World bounds of the cached region. When set, the cache covers exactly these bounds
    /// (scaled by [`Self::cascade_scale`] per level) and never moves with the camera.
    pub manual_bounds: Option<AxisAlignedBoundingBox>,
    /// Exponential scale applied to the bounds of each subsequent cached cascade.
    pub cascade_scale: f32,
    /// Desired world size of a single texel of the first cached cascade. Together with the
    /// texture resolution it defines the size of the cached region around the camera.
    pub texel_world_size: f32,
    /// Maximum amount of scene nodes visited per frame by a time-sliced rebuild.
    pub max_nodes_per_frame: usize,
    /// Forces a full rebuild of the cache every frame.
    pub always_rebuild: bool,
    /// Culls the last cached cascade with its own (widened) frustum instead of the matching
    /// distance cascade.
    pub extend_last_cascade: bool,
    /// Whether the height-map ambient occlusion volume is produced next to the cached cascades.
    pub height_map_ao: bool,
    /// Half-size of the region covered by the height-map ambient occlusion volume.
    pub height_map_ao_range: f32,
    /// Texture size of the height-map ambient occlusion volume.
    pub height_map_ao_resolution: u32,
}

impl Default for CachedShadowSettings {
    fn default() -> Self {
        Self {
            first_cached_cascade: None,
            manual_bounds: None,
            cascade_scale: 3.0,
            texel_world_size: 2.0,
            max_nodes_per_frame: 50,
            always_rebuild: false,
            extend_last_cascade: false,
            height_map_ao: false,
            height_map_ao_range: 1000.0,
            height_map_ao_resolution: 1024,
        }
    }
}

/// Shadow settings allows you to find optimal balance between performance and shadows quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    /// Restricts which lights may cast shadows.
    pub shadow_casting: ShadowCastingMode,

    /// Directional lights
    /// Maximum amount of cascades of a directional light (dynamic and cached together).
    pub max_cascade_count: usize,
    /// Half-size of the first cascade box.
    pub cascade_range: f32,
    /// Growth factor of the box size between two subsequent cascades.
    pub cascade_range_step: f32,
    /// Centers every cascade on the camera instead of pushing it forward along the view.
    pub cascades_centered: bool,
    /// Whether to blend between subsequent cascades.
    pub blend_cascades: bool,
    /// Width of the blend band between cascades.
    pub blend_cascades_value: f32,
    /// Minimal depth range around the focus point of a sun cascade.
    pub sun_clip_plane_range: f32,
    /// Moves the near plane of sun cascades towards the focus point, in `[0; 1]`.
    pub sun_clip_plane_range_shift: f32,
    /// Maximum distance covered by the caster hull. `None` means that the reach of the last
    /// cascade (`cascade_range * cascade_range_step ^ max_cascade_count`) is used.
    pub caster_hull_max_distance: Option<f32>,

    /// Local lights
    /// Maximum texture resolution of a single shadow map.
    pub max_texture_resolution: u32,
    /// Size of the shadow pool texture that stores maps of deferred lights.
    pub shadow_pool_size: u32,
    /// Resolution below which the adaptive halving of projector maps stops.
    pub adaptive_resolution_floor: u32,
    /// Logarithm base of the depth-slice coverage used for deferred light resolution.
    pub shadows_adapt_scale: f32,
    /// Coverage scale of the deferred light resolution.
    pub shadows_res_scale: f32,
    /// Distance ratio of the shadow pool update rate. Zero disables rate limiting.
    pub update_view_dist_ratio: f32,
    /// Resolution multiplier of per-object shadow maps.
    pub per_object_resolution_scale: f32,

    /// Whether to produce a nearest-overlay frustum for directional lights.
    pub draw_near_shadows: bool,

    /// Depth bias tuning.
    pub bias: BiasSettings,

    /// Cached cascades of directional lights.
    pub cache: CachedShadowSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self::high()
    }
}

impl ShadowSettings {
    /// Highest possible shadows quality. Requires very powerful GPU.
    pub fn ultra() -> Self {
        Self {
            max_cascade_count: 7,
            cascade_range: 2.0,
            max_texture_resolution: 2048,
            shadow_pool_size: 4096,
            blend_cascades: true,
            draw_near_shadows: true,
            cache: CachedShadowSettings {
                first_cached_cascade: Some(5),
                ..Default::default()
            },
            ..Self::high()
        }
    }

    /// High shadows quality.
    pub fn high() -> Self {
        Self {
            shadow_casting: ShadowCastingMode::All,
            max_cascade_count: 5,
            cascade_range: 3.0,
            cascade_range_step: 3.0,
            cascades_centered: false,
            blend_cascades: true,
            blend_cascades_value: 0.75,
            sun_clip_plane_range: 256.0,
            sun_clip_plane_range_shift: 0.0,
            caster_hull_max_distance: None,
            max_texture_resolution: 1024,
            shadow_pool_size: 2048,
            adaptive_resolution_floor: 256,
            shadows_adapt_scale: 2.72,
            shadows_res_scale: 2.8,
            update_view_dist_ratio: 0.5,
            per_object_resolution_scale: 1.0,
            draw_near_shadows: false,
            bias: Default::default(),
            cache: Default::default(),
        }
    }

    /// Medium shadows quality, cascades do not blend.
    pub fn medium() -> Self {
        Self {
            max_cascade_count: 4,
            cascade_range: 4.0,
            blend_cascades: false,
            max_texture_resolution: 512,
            shadow_pool_size: 1024,
            ..Self::high()
        }
    }

    /// Lowest shadows quality, only two coarse cascades.
    pub fn low() -> Self {
        Self {
            max_cascade_count: 2,
            cascade_range: 8.0,
            cascade_range_step: 4.0,
            blend_cascades: false,
            max_texture_resolution: 256,
            shadow_pool_size: 512,
            adaptive_resolution_floor: 128,
            ..Self::high()
        }
    }

    /// Maximum distance reached by directional cascades.
    pub fn max_shadow_distance(&self) -> f32 {
        self.caster_hull_max_distance.unwrap_or_else(|| {
            self.cascade_range * self.cascade_range_step.powi(self.max_cascade_count as i32)
        })
    }

    /// Half-size of the box of the cascade at the given level.
    pub fn cascade_radius(&self, cascade: usize) -> f32 {
        self.cascade_range * self.cascade_range_step.powi(cascade as i32)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_settings_ron_round_trip() {
        let mut settings = ShadowSettings::ultra();
        settings.cache.manual_bounds = Some(AxisAlignedBoundingBox::from_min_max(
            nalgebra::Vector3::new(-100.0, -100.0, -10.0),
            nalgebra::Vector3::new(100.0, 100.0, 50.0),
        ));
        settings.shadow_casting = ShadowCastingMode::SunOnly;

        let text = ron::to_string(&settings).unwrap();
        let restored: ShadowSettings = ron::from_str(&text).unwrap();
        assert_eq!(settings, restored);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ShadowSettings::default(), ShadowSettings::high());
        assert!(ShadowSettings::ultra().max_cascade_count > ShadowSettings::low().max_cascade_count);
        assert!(ShadowSettings::low().max_texture_resolution < ShadowSettings::high().max_texture_resolution);
        assert_eq!(ShadowSettings::high().cache.max_nodes_per_frame, 50);
    }

    #[test]
    fn test_max_shadow_distance() {
        let mut settings = ShadowSettings::high();
        assert!((settings.max_shadow_distance() - 3.0 * 3.0f32.powi(5)).abs() < 1.0e-3);
        settings.caster_hull_max_distance = Some(100.0);
        assert_eq!(settings.max_shadow_distance(), 100.0);
        assert_eq!(settings.cascade_radius(0), 3.0);
        assert_eq!(settings.cascade_radius(2), 27.0);
    }

    #[test]
    fn test_casting_mode() {
        assert!(ShadowCastingMode::All.allows(true));
        assert!(!ShadowCastingMode::SunOnly.allows(false));
        assert!(!ShadowCastingMode::LocalOnly.allows(true));
        assert_eq!(ShadowCastingMode::iter().count(), 3);
        assert_eq!(
            ShadowCastingMode::from_str("LocalOnly").unwrap(),
            ShadowCastingMode::LocalOnly
        );
        assert_eq!(ShadowCastingMode::SunOnly.to_string(), "SunOnly");
    }
}
