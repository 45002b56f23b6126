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

//! Cached cascades of directional lights.
//!
//! A cached cascade covers a large box around the camera and renders static casters only. It is
//! rebuilt rarely: a full rebuild starts a new generation and enumerates every static caster,
//! a time-sliced rebuild spreads the enumeration over several frames, and an incremental update
//! only reports casters whose rendered-generation stamp differs from the current generation
//! (new or modified casters).

pub mod cursor;
pub mod mgpu;

use crate::{
    cache::cursor::TraversalCursor,
    camera::ViewFrustum,
    caster::{CasterFlags, CasterQuery, TraversalJob},
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{CubeFaceMask, FrustumKind, ShadowFrustum},
    light::ShadowLight,
    log::{once, Log},
    warn_once, CASCADE_JITTER, MAX_CACHED_CASCADES, MAX_PROJECTOR_FOV, SUN_DISTANCE,
};
use fyrox_math::{aabb::AxisAlignedBoundingBox, hull::ConvexHull, non_parallel_up};
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Smallest depth range of a cached frustum.
const MIN_CACHE_DEPTH: f32 = 1.0;

/// How a cached frustum is refreshed.
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
pub enum CacheUpdateStrategy {
    /// New generation, every static caster is enumerated this frame.
    #[default]
    FullUpdate,
    /// New generation, the enumeration is spread over several frames.
    FullUpdateTimesliced,
    /// Same generation, only casters missing in the cache are enumerated.
    IncrementalUpdate,
}

/// Advances a generation id. Zero is reserved for casters that were never rendered.
#[inline]
pub fn next_generation(generation: u8) -> u8 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

/// Cross-frame bookkeeping of a cached frustum.
#[derive(Debug, Default)]
pub struct CachedFrustumState {
    /// Current generation, zero until the first rebuild.
    pub generation: u8,
    /// Position of the static caster enumeration.
    pub cursor: TraversalCursor,
    /// Enumeration that has not been collected yet.
    pub job: Option<TraversalJob>,
    /// The next refresh must be a full rebuild.
    pub invalidated: bool,
}

/// Cached frustum state shared by the frustum and its snapshots.
pub type SharedCacheState = Arc<Mutex<CachedFrustumState>>;

pub fn new_shared_state() -> SharedCacheState {
    Arc::new(Mutex::new(CachedFrustumState::default()))
}

/// Checks whether a cached box still covers everything the camera may see within `reach`.
pub fn is_covering_view(
    caster_box: &AxisAlignedBoundingBox,
    camera_position: &Vector3<f32>,
    reach: f32,
) -> bool {
    if !caster_box.is_valid() {
        return false;
    }
    let half_extents = caster_box.half_extents();
    let coverage = half_extents.x.min(half_extents.y);
    let distance = (camera_position - caster_box.center()).norm();
    coverage >= distance + reach
}

/// Description of the volume of a cached frustum.
#[derive(Debug, Clone)]
struct CachedVolume {
    kind: FrustumKind,
    cascade: usize,
    /// Caster stamps of the volume.
    cache_level: usize,
    /// Direction towards the light.
    light_vector: Vector3<f32>,
    texture_size: u32,
    /// Box the frustum covers after a rebuild.
    world_box: AxisAlignedBoundingBox,
    /// Distance from the camera the cache has to cover.
    reach: f32,
    /// The box comes from the settings and must not be tightened.
    manual: bool,
}

/// Initializes cached frustums of a light for the current frame.
pub struct ShadowCacheGenerator<'a> {
    ctx: ShadowFrameContext<'a>,
    light: &'a ShadowLight,
    strategy: CacheUpdateStrategy,
    hull: Option<&'a ConvexHull>,
}

impl<'a> ShadowCacheGenerator<'a> {
    /// Creates a generator that refreshes caches with `strategy` unless a cache has to be
    /// rebuilt. The hull, if any, culls casters of cached cascades.
    pub fn new(
        ctx: ShadowFrameContext<'a>,
        light: &'a ShadowLight,
        strategy: CacheUpdateStrategy,
        hull: Option<&'a ConvexHull>,
    ) -> Self {
        let strategy = if ctx.settings.cache.always_rebuild || ctx.force_cache_rebuild {
            CacheUpdateStrategy::FullUpdate
        } else {
            strategy
        };
        Self {
            ctx,
            light,
            strategy,
            hull,
        }
    }

    #[inline]
    pub fn strategy(&self) -> CacheUpdateStrategy {
        self.strategy
    }

    /// Box of a cached cascade: manual bounds scaled per cascade, or a box around the camera
    /// sized from the world size of a texel.
    pub fn cascade_world_box(&self, cache_index: usize, texture_size: u32) -> AxisAlignedBoundingBox {
        let cache = &self.ctx.settings.cache;
        let scale = cache.cascade_scale.powi(cache_index as i32);
        match cache.manual_bounds {
            Some(bounds) => bounds.scaled(scale),
            None => {
                let half = 0.5 * texture_size as f32 * cache.texel_world_size * scale;
                AxisAlignedBoundingBox::from_center_half_extents(
                    self.ctx.camera.position(),
                    Vector3::new(half, half, half),
                )
            }
        }
    }

    /// Initializes a cached cascade and starts the enumeration of its casters.
    ///
    /// `cache_index` is the index among cached cascades, `culling` is the view casters are
    /// enumerated with (the view of the cascade itself when `None`), `reach` is the distance
    /// from the camera the cascade has to cover. Returns the strategy that was actually used.
    pub fn init_cached_cascade(
        &self,
        frustum: &mut ShadowFrustum,
        cascade: usize,
        cache_index: usize,
        culling: Option<&ViewFrustum>,
        reach: f32,
    ) -> Result<CacheUpdateStrategy, ShadowError> {
        let light_vector = self.light.sun_vector().ok_or(ShadowError::ZeroDirection)?;
        let texture_size = self
            .ctx
            .renderer
            .cached_shadow_resolutions()
            .get(cache_index)
            .copied()
            .filter(|size| *size > 0)
            .unwrap_or(self.ctx.settings.max_texture_resolution);

        let volume = CachedVolume {
            kind: FrustumKind::GsmCached,
            cascade,
            cache_level: cache_index,
            light_vector,
            texture_size,
            world_box: self.cascade_world_box(cache_index, texture_size),
            reach,
            manual: self.ctx.settings.cache.manual_bounds.is_some(),
        };

        self.init_cached(frustum, &volume, culling, self.hull)
    }

    /// Initializes the top-down height map frustum around the camera.
    pub fn init_height_map_ao(
        &self,
        frustum: &mut ShadowFrustum,
        cascade: usize,
    ) -> Result<CacheUpdateStrategy, ShadowError> {
        let cache = &self.ctx.settings.cache;
        let range = cache.height_map_ao_range;
        let volume = CachedVolume {
            kind: FrustumKind::HeightMapAo,
            cascade,
            cache_level: MAX_CACHED_CASCADES - 1,
            light_vector: Vector3::z(),
            texture_size: cache.height_map_ao_resolution,
            world_box: AxisAlignedBoundingBox::from_center_half_extents(
                self.ctx.camera.position(),
                Vector3::new(range, range, range),
            ),
            reach: 0.5 * range,
            manual: false,
        };

        self.init_cached(frustum, &volume, None, None)
    }

    fn init_cached(
        &self,
        frustum: &mut ShadowFrustum,
        volume: &CachedVolume,
        culling: Option<&ViewFrustum>,
        hull: Option<&ConvexHull>,
    ) -> Result<CacheUpdateStrategy, ShadowError> {
        let settings = self.ctx.settings;
        let shared = frustum.cache.get_or_insert_with(new_shared_state).clone();
        let mut state = shared.lock();

        let mut strategy = self.strategy;
        if state.generation == 0
            || state.invalidated
            || frustum.kind != volume.kind
            || frustum.views.is_empty()
        {
            strategy = CacheUpdateStrategy::FullUpdate;
        }
        if strategy != CacheUpdateStrategy::FullUpdate
            && !volume.manual
            && !is_covering_view(
                &frustum.caster_box,
                &self.ctx.camera.position(),
                volume.reach,
            )
        {
            warn_once!(
                once::CACHE_OUT_OF_RANGE,
                "{} frustum {} no longer covers the view, it will be rebuilt.",
                volume.kind,
                volume.cascade
            );
            strategy = CacheUpdateStrategy::FullUpdate;
        }

        frustum.kind = volume.kind;
        frustum.cascade = Some(volume.cascade);
        frustum.owner = Some(self.light.id);
        frustum.omni = false;
        frustum.blend = None;
        frustum.use_shadow_pool = false;
        frustum.face_mask = CubeFaceMask::POSITIVE_X;
        frustum.mgpu_copy = false;
        frustum.light_radius = self.light.radius;
        frustum.caster_filter = CasterFlags::STATIC;
        frustum.reset_caster_lists();

        if strategy == CacheUpdateStrategy::IncrementalUpdate {
            frustum.incremental = true;
            if state.cursor.is_finished() {
                state.cursor.reset();
            }
        } else {
            // Casters of an unfinished enumeration belong to the previous generation.
            if let Some(job) = state.job.take() {
                Log::verify_message(job.wait(), "Stale static caster traversal failed");
            }
            state.generation = next_generation(state.generation);
            state.cursor.reset();
            state.invalidated = false;

            self.fit_volume(frustum, volume)?;
            frustum.incremental = false;
            frustum.request_update();
        }

        frustum.generation = state.generation;
        frustum.update_frame = self.ctx.frame_id;

        let view = culling.or_else(|| frustum.main_view());
        if let Some(view) = view {
            let node_budget = match strategy {
                CacheUpdateStrategy::FullUpdate => None,
                _ => Some(settings.cache.max_nodes_per_frame * self.ctx.gpu_count() as usize),
            };
            let query = CasterQuery {
                frustum: *view.frustum(),
                hull: hull.cloned(),
                required: CasterFlags::CAST_SHADOWS | CasterFlags::STATIC,
                excluded: CasterFlags::DYNAMIC_DISTANCE_SHADOWS,
                generation: state.generation,
                cache_level: volume.cache_level,
                node_budget,
            };
            let cursor = std::mem::take(&mut state.cursor);
            state.job = Some(self.ctx.scene.enumerate_static_casters(query, cursor));
        }

        Ok(strategy)
    }

    /// Places the frustum around the box of the volume, tightening its depth range to the
    /// casters inside of the box.
    fn fit_volume(
        &self,
        frustum: &mut ShadowFrustum,
        volume: &CachedVolume,
    ) -> Result<(), ShadowError> {
        let center = volume.world_box.center();
        let up = non_parallel_up(&volume.light_vector, &Vector3::z());
        let light_view = Matrix4::look_at_rh(
            &Point3::from(center),
            &Point3::from(center - volume.light_vector),
            &up,
        );

        let light_space_box = volume.world_box.transform(&light_view);
        let half_extents = light_space_box.half_extents();
        let half_width = half_extents.x.max(half_extents.y);

        // +Z of the light space points towards the light.
        let (mut depth_min, mut depth_max) = (light_space_box.min.z, light_space_box.max.z);
        if !volume.manual {
            if let Some(casters) = self
                .ctx
                .scene
                .collect_casters_in_box(&volume.world_box, &light_view)
            {
                depth_min = casters.min.z;
                depth_max = casters.max.z;
            }
        }
        if depth_max - depth_min < MIN_CACHE_DEPTH {
            let middle = 0.5 * (depth_min + depth_max);
            depth_min = middle - 0.5 * MIN_CACHE_DEPTH;
            depth_max = middle + 0.5 * MIN_CACHE_DEPTH;
        }

        let z_near = SUN_DISTANCE - depth_max;
        let z_far = SUN_DISTANCE - depth_min;
        ShadowError::check_depth_range(Some(volume.cascade), z_near, z_far)?;

        frustum.light_relative_position = volume.light_vector.scale(SUN_DISTANCE);
        frustum.projection_translation = center;
        frustum.fov = (2.0 * (half_width / SUN_DISTANCE).atan()).min(MAX_PROJECTOR_FOV);
        frustum.aspect = 1.0;
        frustum.z_near = z_near;
        frustum.z_far = z_far;
        frustum.texture_size = volume.texture_size;
        frustum.cascade_size = half_width;
        frustum.caster_box = volume.world_box;
        frustum.frustum_size =
            1.0 / (half_width * self.ctx.settings.cascade_range).max(f32::EPSILON);
        let jitter = CASCADE_JITTER[volume.cascade.min(CASCADE_JITTER.len() - 1)];
        frustum.jitter = Vector2::new(jitter, jitter);

        let view = ViewFrustum::new(
            frustum.view_position(),
            -volume.light_vector,
            Vector3::z(),
            frustum.fov,
            frustum.aspect,
            z_near,
            z_far,
        )?;
        frustum.views.clear();
        frustum.views.push(view);

        Ok(())
    }

    /// Waits for the caster enumeration started by the last init call and publishes its
    /// casters. Returns the amount of visited scene nodes.
    pub fn collect(frustum: &mut ShadowFrustum) -> Result<usize, ShadowError> {
        let Some(shared) = frustum.cache.clone() else {
            return Ok(0);
        };
        let mut state = shared.lock();
        let Some(job) = state.job.take() else {
            return Ok(0);
        };
        match job.wait() {
            Ok(output) => {
                state.cursor = output.cursor;
                if !output.casters.is_empty() {
                    frustum.request_update();
                }
                frustum.casters = output.casters;
                Ok(output.nodes_visited)
            }
            Err(err) => {
                // Part of the casters may be missing in the map.
                state.invalidated = true;
                frustum.reset_caster_lists();
                Err(err)
            }
        }
    }

    /// Checks whether the static caster enumeration of a frustum went through the whole scene.
    pub fn is_enumeration_finished(frustum: &ShadowFrustum) -> bool {
        frustum.cache.as_ref().is_some_and(|shared| {
            let state = shared.lock();
            state.job.is_none() && state.cursor.is_finished()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        caster::{
            octree::{CasterEntry, CasterOctree},
            CasterId,
        },
        renderer::RendererCaps,
        settings::ShadowSettings,
    };
    use strum::IntoEnumIterator;

    fn camera_at(position: Vector3<f32>) -> ViewFrustum {
        ViewFrustum::new(
            position,
            Vector3::y(),
            Vector3::z(),
            60.0f32.to_radians(),
            1.0,
            0.1,
            1000.0,
        )
        .unwrap()
    }

    fn scene() -> CasterOctree {
        let mut casters = Vec::new();
        for x in -10..10 {
            for y in -10..10 {
                casters.push(CasterEntry {
                    bounds: AxisAlignedBoundingBox::from_center_half_extents(
                        Vector3::new(x as f32 * 10.0, y as f32 * 10.0, 2.0),
                        Vector3::new(1.0, 1.0, 2.0),
                    ),
                    flags: CasterFlags::CAST_SHADOWS | CasterFlags::STATIC,
                });
            }
        }
        CasterOctree::new(casters, 4)
    }

    fn sun() -> ShadowLight {
        ShadowLight::directional(Vector3::new(0.2, 0.1, -1.0))
    }

    #[test]
    fn test_generation_skips_zero() {
        assert_eq!(next_generation(0), 1);
        assert_eq!(next_generation(1), 2);
        assert_eq!(next_generation(254), 255);
        assert_eq!(next_generation(255), 1);
    }

    #[test]
    fn test_strategy_names() {
        let names = CacheUpdateStrategy::iter()
            .map(|strategy| strategy.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            ["FullUpdate", "FullUpdateTimesliced", "IncrementalUpdate"]
        );
        assert_eq!(
            "IncrementalUpdate".parse::<CacheUpdateStrategy>(),
            Ok(CacheUpdateStrategy::IncrementalUpdate)
        );
    }

    #[test]
    fn test_coverage() {
        let aabb = AxisAlignedBoundingBox::from_radius(500.0);
        assert!(is_covering_view(&aabb, &Vector3::zeros(), 100.0));
        assert!(!is_covering_view(&aabb, &Vector3::new(600.0, 0.0, 0.0), 0.0));
        assert!(!is_covering_view(
            &AxisAlignedBoundingBox::default(),
            &Vector3::zeros(),
            0.0
        ));
    }

    #[test]
    fn test_full_then_incremental() {
        let camera = camera_at(Vector3::zeros());
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let scene = scene();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        let light = sun();

        let mut frustum = ShadowFrustum::default();
        let generator = ShadowCacheGenerator::new(
            ctx,
            &light,
            CacheUpdateStrategy::IncrementalUpdate,
            None,
        );
        let strategy = generator
            .init_cached_cascade(&mut frustum, 2, 0, None, 50.0)
            .unwrap();
        assert_eq!(strategy, CacheUpdateStrategy::FullUpdate);
        assert_eq!(frustum.kind, FrustumKind::GsmCached);
        assert_eq!(frustum.generation, 1);
        assert_eq!(frustum.texture_size, 2048);
        assert!(!frustum.incremental);
        assert!(frustum.z_near > 0.0 && frustum.z_near < frustum.z_far);

        ShadowCacheGenerator::collect(&mut frustum).unwrap();
        assert!(!frustum.casters.is_empty());
        assert!(ShadowCacheGenerator::is_enumeration_finished(&frustum));
        for id in frustum.casters.iter() {
            assert_eq!(scene.rendered_generation(*id, 0), 1);
        }

        // Nothing changed: the incremental update keeps the generation and reports nothing.
        let reported = incremental_pass(&generator, &mut frustum);
        assert_eq!(frustum.generation, 1);
        assert!(frustum.incremental);
        assert!(reported.is_empty());

        // A modified caster is reported again without a new generation.
        let modified = CasterId(5);
        scene.invalidate_caster(modified);
        let reported = incremental_pass(&generator, &mut frustum);
        assert_eq!(frustum.generation, 1);
        assert_eq!(reported, vec![modified]);
    }

    // Runs incremental updates until the enumeration goes through the whole scene.
    fn incremental_pass(
        generator: &ShadowCacheGenerator,
        frustum: &mut ShadowFrustum,
    ) -> Vec<CasterId> {
        let mut reported = Vec::new();
        for _ in 0..10_000 {
            let strategy = generator
                .init_cached_cascade(frustum, 2, 0, None, 50.0)
                .unwrap();
            assert_eq!(strategy, CacheUpdateStrategy::IncrementalUpdate);
            ShadowCacheGenerator::collect(frustum).unwrap();
            reported.extend_from_slice(&frustum.casters);
            if ShadowCacheGenerator::is_enumeration_finished(frustum) {
                break;
            }
        }
        reported
    }

    #[test]
    fn test_timesliced_rebuild_spreads_enumeration() {
        let camera = camera_at(Vector3::zeros());
        let mut settings = ShadowSettings::default();
        settings.cache.max_nodes_per_frame = 3;
        let caps = RendererCaps::default();
        let scene = scene();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        let light = sun();

        let mut frustum = ShadowFrustum::default();
        ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::FullUpdate, None)
            .init_cached_cascade(&mut frustum, 2, 0, None, 50.0)
            .unwrap();
        ShadowCacheGenerator::collect(&mut frustum).unwrap();
        let total = frustum.casters.len();

        let timesliced = ShadowCacheGenerator::new(
            ctx,
            &light,
            CacheUpdateStrategy::FullUpdateTimesliced,
            None,
        );
        let strategy = timesliced
            .init_cached_cascade(&mut frustum, 2, 0, None, 50.0)
            .unwrap();
        assert_eq!(strategy, CacheUpdateStrategy::FullUpdateTimesliced);
        assert_eq!(frustum.generation, 2);
        let visited = ShadowCacheGenerator::collect(&mut frustum).unwrap();
        assert_eq!(visited, 3);
        let mut reported = frustum.casters.len();
        assert!(!ShadowCacheGenerator::is_enumeration_finished(&frustum));

        let incremental = ShadowCacheGenerator::new(
            ctx,
            &light,
            CacheUpdateStrategy::IncrementalUpdate,
            None,
        );
        let mut frames = 0;
        while !ShadowCacheGenerator::is_enumeration_finished(&frustum) {
            incremental
                .init_cached_cascade(&mut frustum, 2, 0, None, 50.0)
                .unwrap();
            ShadowCacheGenerator::collect(&mut frustum).unwrap();
            assert_eq!(frustum.generation, 2);
            reported += frustum.casters.len();
            frames += 1;
            assert!(frames < 10_000);
        }
        assert!(frames > 0);
        assert_eq!(reported, total);
    }

    #[test]
    fn test_camera_motion_escalates_to_full_update() {
        let mut settings = ShadowSettings::default();
        settings.cache.texel_world_size = 1.0;
        let caps = RendererCaps {
            cached_shadow_resolutions: vec![1000],
            ..Default::default()
        };
        let scene = scene();
        let light = sun();
        let mut frustum = ShadowFrustum::default();

        let camera = camera_at(Vector3::zeros());
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::FullUpdate, None)
            .init_cached_cascade(&mut frustum, 0, 0, None, 10.0)
            .unwrap();
        ShadowCacheGenerator::collect(&mut frustum).unwrap();
        assert_eq!(frustum.caster_box.half_extents().x, 500.0);
        let generation = frustum.generation;

        let moved = camera_at(Vector3::new(600.0, 0.0, 0.0));
        let ctx = ShadowFrameContext::new(&moved, &settings, &caps, &scene);
        let strategy =
            ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::IncrementalUpdate, None)
                .init_cached_cascade(&mut frustum, 0, 0, None, 10.0)
                .unwrap();
        assert_eq!(strategy, CacheUpdateStrategy::FullUpdate);
        assert_eq!(frustum.generation, next_generation(generation));
        assert_eq!(frustum.caster_box.center(), moved.position());
    }

    #[test]
    fn test_manual_bounds_are_scaled_per_cascade() {
        let camera = camera_at(Vector3::new(5000.0, 0.0, 0.0));
        let mut settings = ShadowSettings::default();
        settings.cache.manual_bounds = Some(AxisAlignedBoundingBox::from_radius(100.0));
        settings.cache.cascade_scale = 2.0;
        let caps = RendererCaps::default();
        let scene = scene();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        let light = sun();

        let generator =
            ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::IncrementalUpdate, None);
        let mut frustum = ShadowFrustum::default();
        generator
            .init_cached_cascade(&mut frustum, 3, 1, None, 10.0)
            .unwrap();
        assert_eq!(frustum.caster_box.half_extents(), Vector3::new(200.0, 200.0, 200.0));

        // Manual bounds never escalate, even with the camera far away.
        let strategy = generator
            .init_cached_cascade(&mut frustum, 3, 1, None, 10.0)
            .unwrap();
        assert_eq!(strategy, CacheUpdateStrategy::IncrementalUpdate);
    }

    #[test]
    fn test_forced_rebuild_and_invalidation() {
        let camera = camera_at(Vector3::zeros());
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let scene = scene();
        let light = sun();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        let mut frustum = ShadowFrustum::default();

        let generator =
            ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::IncrementalUpdate, None);
        generator
            .init_cached_cascade(&mut frustum, 2, 0, None, 10.0)
            .unwrap();
        ShadowCacheGenerator::collect(&mut frustum).unwrap();

        let forced = ShadowCacheGenerator::new(
            ctx.with_forced_cache_rebuild(true),
            &light,
            CacheUpdateStrategy::IncrementalUpdate,
            None,
        );
        assert_eq!(forced.strategy(), CacheUpdateStrategy::FullUpdate);
        forced
            .init_cached_cascade(&mut frustum, 2, 0, None, 10.0)
            .unwrap();
        ShadowCacheGenerator::collect(&mut frustum).unwrap();
        assert_eq!(frustum.generation, 2);

        frustum.invalidate();
        let strategy = generator
            .init_cached_cascade(&mut frustum, 2, 0, None, 10.0)
            .unwrap();
        assert_eq!(strategy, CacheUpdateStrategy::FullUpdate);
        assert_eq!(frustum.generation, 3);
    }

    #[test]
    fn test_height_map_ao_frustum_looks_down() {
        let camera = camera_at(Vector3::new(10.0, 20.0, 5.0));
        let settings = ShadowSettings::default();
        let caps = RendererCaps::default();
        let scene = scene();
        let ctx = ShadowFrameContext::new(&camera, &settings, &caps, &scene);
        let light = sun();

        let mut frustum = ShadowFrustum::default();
        ShadowCacheGenerator::new(ctx, &light, CacheUpdateStrategy::IncrementalUpdate, None)
            .init_height_map_ao(&mut frustum, 4)
            .unwrap();
        assert_eq!(frustum.kind, FrustumKind::HeightMapAo);
        assert_eq!(frustum.texture_size, settings.cache.height_map_ao_resolution);
        let view = frustum.main_view().unwrap();
        assert!((view.forward() + Vector3::z()).norm() < 1.0e-5);
        ShadowCacheGenerator::collect(&mut frustum).unwrap();
        assert!(!frustum.casters.is_empty());
    }
}
