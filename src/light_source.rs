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

//! Per-frame entry point of a shadow casting light. [`LightShadowMaps`] owns the frustum slots
//! of a light, decides how many cascades the light needs and fills the slots in order: dynamic
//! and distance cascades, cached cascades with the height map volume, then the nearest overlay.
//!
//! Slot layout: `[dynamic][distance][cached][height map AO][nearest]`. Unused slots are reset,
//! never freed, so frustums live as long as the light.

use crate::{
    bias::apply_shadow_bias,
    cache::{CacheUpdateStrategy, ShadowCacheGenerator},
    cascade::CascadeCursor,
    context::ShadowFrameContext,
    error::ShadowError,
    frustum::{FrustumKind, ShadowFrustum},
    hull::build_caster_hull,
    info,
    init::{
        directional::init_directional,
        nearest::init_nearest,
        omni::init_omni,
        per_object::{init_per_object, PerObjectShadow},
        projector::init_spot,
    },
    light::{FrustumStrategy, ShadowLight},
    log::Log,
    renderer::{available_cache_levels, ShadowRendererInfo},
    settings::ShadowSettings,
    warn, MAX_CACHED_CASCADES, MAX_CASCADES, MAX_FRUSTUM_SLOTS,
};
use arrayvec::ArrayVec;
use fyrox_math::hull::ConvexHull;

/// Amount of cascades a light needs this frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ShadowCascadeCounts {
    /// Dynamic cascades, rendered every frame.
    pub dynamic: usize,
    /// Cached cascades. The same amount of distance cascades follows the dynamic ones.
    pub cached: usize,
    /// Whether the height map AO volume follows the cached cascades.
    pub height_map_ao: bool,
}

impl ShadowCascadeCounts {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dynamic == 0 && self.cached == 0 && !self.height_map_ao
    }

    /// Index of the first cached cascade slot.
    #[inline]
    pub fn first_cached_slot(&self) -> usize {
        self.dynamic + self.cached
    }
}

/// Computes the cascade counts of a light.
///
/// Local lights always use a single frustum. Directional lights get up to `MAX_CASCADES - 1`
/// cascades; when caching is enabled, the cascades starting at the first cached one are served
/// from the cache as long as the renderer provides a cache resolution for them.
pub fn cascade_counts(
    light: &ShadowLight,
    settings: &ShadowSettings,
    renderer: &dyn ShadowRendererInfo,
) -> ShadowCascadeCounts {
    let directional = light.is_directional();
    if !settings.shadow_casting.allows(directional) {
        return ShadowCascadeCounts::default();
    }

    let max_cascades = settings.max_cascade_count.min(MAX_CASCADES - 1);
    if !directional {
        return ShadowCascadeCounts {
            dynamic: max_cascades.min(1),
            ..Default::default()
        };
    }

    let mut dynamic = max_cascades;
    let mut cached = 0;
    let height_map_ao = settings.cache.height_map_ao;
    if let Some(first_cached) = settings.cache.first_cached_cascade {
        dynamic = first_cached.min(max_cascades);
        cached = available_cache_levels(renderer).min(max_cascades - dynamic);
    }
    let cache_levels = if height_map_ao {
        MAX_CACHED_CASCADES - 1
    } else {
        MAX_CACHED_CASCADES
    };

    ShadowCascadeCounts {
        dynamic,
        cached: cached.min(cache_levels),
        height_map_ao,
    }
}

/// What a light update produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShadowUpdateSummary {
    /// Requested cascade counts.
    pub counts: ShadowCascadeCounts,
    /// Produced dynamic frustums (cascades of directional lights, the single frustum of local
    /// lights).
    pub dynamic: usize,
    /// Produced distance cascades.
    pub distance: usize,
    /// Produced cached cascades.
    pub cached: usize,
    pub height_map_ao: bool,
    pub nearest: bool,
    /// Amount of leading slots in use, every slot after them is reset.
    pub used_slots: usize,
    /// Slots whose casters are gathered by the one-pass scene traversal.
    pub one_pass_slots: ArrayVec<usize, MAX_FRUSTUM_SLOTS>,
    /// Strategy the cached frustums were refreshed with, if any.
    pub cache_strategy: Option<CacheUpdateStrategy>,
    /// Cached frustums were restored from the snapshots of another GPU.
    pub restored_from_gpu_cache: bool,
}

/// Frustum slots of a shadow casting light.
#[derive(Debug, Default)]
pub struct LightShadowMaps {
    slots: [Option<Box<ShadowFrustum>>; MAX_FRUSTUM_SLOTS],
    per_object: Vec<ShadowFrustum>,
    cache_strategy: CacheUpdateStrategy,
    caster_hull: Option<ConvexHull>,
}

impl LightShadowMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frustum in the given slot, if the slot was ever used.
    #[inline]
    pub fn frustum(&self, slot: usize) -> Option<&ShadowFrustum> {
        self.slots.get(slot).and_then(|s| s.as_deref())
    }

    /// Frustums of the leading `count` slots.
    pub fn frustums(&self, count: usize) -> impl Iterator<Item = &ShadowFrustum> {
        self.slots
            .iter()
            .take(count)
            .filter_map(|slot| slot.as_deref())
    }

    /// Per-object frustums produced by the last [`Self::update_per_object`] call.
    #[inline]
    pub fn per_object_frustums(&self) -> &[ShadowFrustum] {
        &self.per_object
    }

    /// Caster hull built by the last update of a directional light.
    #[inline]
    pub fn caster_hull(&self) -> Option<&ConvexHull> {
        self.caster_hull.as_ref()
    }

    /// Strategy the next cached pass starts with.
    #[inline]
    pub fn cache_strategy(&self) -> CacheUpdateStrategy {
        self.cache_strategy
    }

    /// Sets the strategy of the next cached pass.
    pub fn request_cache_update(&mut self, strategy: CacheUpdateStrategy) {
        self.cache_strategy = strategy;
    }

    /// Called when the light moved or changed: every frustum is re-rendered and every cache is
    /// rebuilt from scratch.
    pub fn invalidate(&mut self) {
        for frustum in self.slots.iter_mut().flatten() {
            frustum.invalidate();
        }
        for frustum in self.per_object.iter_mut() {
            frustum.request_update();
        }
        self.cache_strategy = CacheUpdateStrategy::FullUpdate;
    }

    /// Checks whether the main frustums of two lights overlap.
    pub fn is_intersects(&self, other: &LightShadowMaps) -> bool {
        match (self.frustum(0), other.frustum(0)) {
            (Some(a), Some(b)) => a.is_intersects(b),
            _ => false,
        }
    }

    fn slot(&mut self, index: usize) -> &mut ShadowFrustum {
        self.slots[index].get_or_insert_with(Default::default)
    }

    fn reset_slots_from(&mut self, first: usize) {
        for frustum in self.slots.iter_mut().skip(first).flatten() {
            frustum.reset();
        }
    }

    /// Produces the shadow frustums of a light for the current frame.
    pub fn update(&mut self, light: &ShadowLight, ctx: &ShadowFrameContext) -> ShadowUpdateSummary {
        let counts = cascade_counts(light, ctx.settings, ctx.renderer);
        let mut summary = ShadowUpdateSummary {
            counts,
            ..Default::default()
        };

        self.caster_hull = None;
        if counts.is_empty() {
            self.reset_slots_from(0);
            return summary;
        }

        let mut next = match light.strategy() {
            FrustumStrategy::Directional => {
                let (produced, cursor) = self.update_dynamic_cascades(light, ctx, &counts);
                summary.dynamic = produced.min(counts.dynamic);
                summary.distance = produced - summary.dynamic;

                let mut next = produced;
                if produced == counts.first_cached_slot()
                    && (counts.cached > 0 || counts.height_map_ao)
                {
                    next += self.update_cached_cascades(light, ctx, &counts, cursor, &mut summary);
                }
                next
            }
            strategy => self.update_local_light(light, ctx, strategy, &mut summary),
        };

        if ctx.settings.draw_near_shadows
            && light.is_directional()
            && summary.dynamic > 0
            && next < MAX_FRUSTUM_SLOTS
        {
            let first = self.slots[0].as_deref().cloned();
            if let Some(first) = first {
                init_nearest(self.slot(next), &first, light, ctx.settings);
                next += 1;
                summary.nearest = true;
            }
        }

        self.reset_slots_from(next);

        summary.used_slots = next;
        for (index, frustum) in self.frustums(next).enumerate() {
            if frustum.is_one_pass_traversal() {
                summary.one_pass_slots.push(index);
            }
        }

        summary
    }

    /// Fills dynamic and distance cascades. Returns the amount of produced cascades and the
    /// cursor of the cascade that follows the last dynamic one.
    fn update_dynamic_cascades(
        &mut self,
        light: &ShadowLight,
        ctx: &ShadowFrameContext,
        counts: &ShadowCascadeCounts,
    ) -> (usize, CascadeCursor) {
        let settings = ctx.settings;
        let camera = ctx.camera;

        if let Some(sun_vector) = light.sun_vector() {
            self.caster_hull = Some(build_caster_hull(
                camera,
                &sun_vector,
                settings.max_shadow_distance(),
                settings.sun_clip_plane_range,
            ));
        }

        let total = counts.dynamic + counts.cached;
        let fade_last = counts.cached == 0;
        let mut cursor = CascadeCursor::first(camera, settings);
        let mut next_dynamic = cursor;

        for cascade in 0..total {
            let frustum = self.slot(cascade);
            frustum.kind = if cascade < counts.dynamic {
                FrustumKind::GsmDynamic
            } else {
                FrustumKind::GsmDynamicDistance
            };
            frustum.cache = None;
            frustum.fade_distance = if fade_last && cascade + 1 == counts.dynamic {
                1.0
            } else {
                0.0
            };

            if let Err(err) = init_directional(frustum, light, ctx, cascade, cursor) {
                warn!(
                    "Shadow cascade {} of light {} was not produced: {}",
                    cascade, light.id, err
                );
                frustum.reset();
                return (cascade, next_dynamic);
            }
            apply_shadow_bias(frustum, light, cascade, cursor.radius, settings);

            cursor.advance(camera, settings.cascade_range_step);
            if cascade < counts.dynamic {
                next_dynamic = cursor;
            }
        }

        (total, next_dynamic)
    }

    /// Fills cached cascades and the height map volume. Returns the amount of used slots.
    fn update_cached_cascades(
        &mut self,
        light: &ShadowLight,
        ctx: &ShadowFrameContext,
        counts: &ShadowCascadeCounts,
        mut cursor: CascadeCursor,
        summary: &mut ShadowUpdateSummary,
    ) -> usize {
        let first_slot = counts.first_cached_slot();
        let gpu_count = ctx.gpu_count();

        if let Some(gpu_cache) = ctx.gpu_cache {
            if gpu_count > 1 && gpu_cache.has_pending_gpus() && self.slots[first_slot].is_some() {
                let snapshots = (0..counts.cached)
                    .map(|i| gpu_cache.cascade(i))
                    .chain(counts.height_map_ao.then(|| gpu_cache.height_map_ao()))
                    .collect::<Option<Vec<_>>>();
                if let Some(snapshots) = snapshots {
                    let restored = snapshots.len();
                    for (i, snapshot) in snapshots.into_iter().enumerate() {
                        *self.slot(first_slot + i) = snapshot;
                    }
                    summary.cached = counts.cached;
                    summary.height_map_ao = counts.height_map_ao;
                    summary.restored_from_gpu_cache = true;
                    return restored;
                }
            }
        }

        let settings = ctx.settings;
        let generator =
            ShadowCacheGenerator::new(*ctx, light, self.cache_strategy, self.caster_hull.as_ref());
        let mut strategy = None;
        let mut produced = 0;

        for i in 0..counts.cached {
            let cascade = counts.dynamic + i;
            let culling = if settings.cache.extend_last_cascade && i + 1 == counts.cached {
                None
            } else {
                self.slots[cascade]
                    .as_deref()
                    .and_then(|distance| distance.main_view())
                    .cloned()
            };
            let reach = cursor.distance + cursor.radius;

            let frustum = self.slots[first_slot + i].get_or_insert_with(Default::default);
            match generator.init_cached_cascade(frustum, cascade, i, culling.as_ref(), reach) {
                Ok(used) => {
                    strategy = Some(most_thorough(strategy, used));
                    apply_shadow_bias(frustum, light, cascade, cursor.radius, settings);
                    produced += 1;
                }
                Err(err) => {
                    warn!(
                        "Cached shadow cascade {} of light {} was not produced: {}",
                        cascade, light.id, err
                    );
                    frustum.reset();
                    break;
                }
            }

            cursor.advance(ctx.camera, settings.cascade_range_step);
        }
        summary.cached = produced;

        let mut used = produced;
        if produced == counts.cached && counts.height_map_ao {
            let cascade = counts.dynamic + counts.cached;
            let frustum = self.slots[first_slot + used].get_or_insert_with(Default::default);
            match generator.init_height_map_ao(frustum, cascade) {
                Ok(used_strategy) => {
                    strategy = Some(most_thorough(strategy, used_strategy));
                    summary.height_map_ao = true;
                    used += 1;
                }
                Err(err) => {
                    warn!("Height map AO volume of light {} was not produced: {}", light.id, err);
                    frustum.reset();
                }
            }
        }

        for frustum in self.slots[first_slot..first_slot + used].iter_mut().flatten() {
            Log::verify_message(
                ShadowCacheGenerator::collect(frustum),
                "Failed to collect static shadow casters",
            );
        }

        if gpu_count > 1 {
            if let Some(gpu_cache) = ctx.gpu_cache {
                for i in 0..produced {
                    if let Some(frustum) = self.frustum(first_slot + i) {
                        gpu_cache.store_cascade(i, frustum);
                    }
                }
                if summary.height_map_ao {
                    if let Some(frustum) = self.frustum(first_slot + produced) {
                        gpu_cache.store_height_map_ao(frustum);
                    }
                }
                gpu_cache.mark_rebuilt(gpu_count);
            }
        }

        if strategy.is_some_and(|s| s != CacheUpdateStrategy::IncrementalUpdate) {
            info!(
                "Shadow cache of light {} was rebuilt with {} strategy.",
                light.id, generator.strategy()
            );
        }
        summary.cache_strategy = strategy;
        self.cache_strategy = CacheUpdateStrategy::IncrementalUpdate;

        used
    }

    /// Fills the single frustum of a spot or point light.
    fn update_local_light(
        &mut self,
        light: &ShadowLight,
        ctx: &ShadowFrameContext,
        strategy: FrustumStrategy,
        summary: &mut ShadowUpdateSummary,
    ) -> usize {
        let frustum = self.slot(0);
        frustum.kind = FrustumKind::GsmDynamic;
        frustum.cache = None;
        frustum.fade_distance = 0.0;

        let result = match strategy {
            FrustumStrategy::Omni => init_omni(frustum, light, ctx),
            FrustumStrategy::Projector => init_spot(frustum, light, ctx),
            FrustumStrategy::Directional => Err(ShadowError::ZeroDirection),
        };

        match result {
            Ok(()) => {
                apply_shadow_bias(frustum, light, 0, 0.0, ctx.settings);
                summary.dynamic = 1;
                1
            }
            Err(err) => {
                warn!("Shadow frustum of light {} was not produced: {}", light.id, err);
                frustum.reset();
                0
            }
        }
    }

    /// Produces the per-object frustums of a light. Frustums are reused in place, the ones of
    /// objects that failed to initialize are skipped. Returns the amount of produced frustums.
    pub fn update_per_object(
        &mut self,
        objects: &[PerObjectShadow],
        light: &ShadowLight,
        ctx: &ShadowFrameContext,
    ) -> usize {
        let mut produced = 0;
        for object in objects {
            if self.per_object.len() <= produced {
                self.per_object.push(Default::default());
            }
            let frustum = &mut self.per_object[produced];
            match init_per_object(frustum, object, light, ctx) {
                Ok(()) => produced += 1,
                Err(err) => {
                    warn!(
                        "Per-object shadow of caster {:?} was not produced: {}",
                        object.caster, err
                    );
                    frustum.reset();
                }
            }
        }
        self.per_object.truncate(produced);
        produced
    }
}

/// Picks the strategy that does more work.
fn most_thorough(
    current: Option<CacheUpdateStrategy>,
    other: CacheUpdateStrategy,
) -> CacheUpdateStrategy {
    let rank = |strategy: CacheUpdateStrategy| match strategy {
        CacheUpdateStrategy::FullUpdate => 2,
        CacheUpdateStrategy::FullUpdateTimesliced => 1,
        CacheUpdateStrategy::IncrementalUpdate => 0,
    };
    match current {
        Some(current) if rank(current) >= rank(other) => current,
        _ => other,
    }
}
