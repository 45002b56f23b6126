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

//! Shadow frustum: the placement, optics and update bookkeeping of one shadow map.

use crate::{
    cache::SharedCacheState,
    camera::ViewFrustum,
    caster::{CasterFlags, CasterId},
};
use arrayvec::ArrayVec;
use bitflags::bitflags;
use fyrox_math::aabb::AxisAlignedBoundingBox;
use nalgebra::{Vector2, Vector3};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// Update policy of a frustum.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum FrustumKind {
    /// Cascade that is re-rendered every frame.
    #[default]
    GsmDynamic,
    /// Dynamic cascade that covers the range of a cached one and renders only casters that
    /// must not be baked into the cache.
    GsmDynamicDistance,
    /// Cascade with static casters that is rebuilt occasionally.
    GsmCached,
    /// Top-down cached frustum used to render a height map for ambient occlusion.
    HeightMapAo,
    /// Copy of the first cascade for foreground geometry.
    Nearest,
    /// Frustum fitted around a single object.
    PerObject,
}

impl FrustumKind {
    /// Returns `true` for frustums whose casters come from the cache machinery.
    #[inline]
    pub fn is_cached(self) -> bool {
        matches!(self, Self::GsmCached | Self::HeightMapAo)
    }

    /// Returns `true` for frustums that are gathered together in a single scene traversal.
    #[inline]
    pub fn is_one_pass_traversal(self) -> bool {
        !matches!(self, Self::Nearest)
    }
}

bitflags! {
    /// Faces of a shadow frustum that can contribute to the current view. Non-omni frustums
    /// use the first bit only.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CubeFaceMask: u8 {
        const POSITIVE_X = 1 << 0;
        const NEGATIVE_X = 1 << 1;
        const POSITIVE_Y = 1 << 2;
        const NEGATIVE_Y = 1 << 3;
        const POSITIVE_Z = 1 << 4;
        const NEGATIVE_Z = 1 << 5;
    }
}

impl CubeFaceMask {
    /// Mask of the face with the given index. Indices past the sixth face give an empty mask.
    #[inline]
    pub fn face(index: usize) -> Self {
        if index < 6 {
            Self::from_bits_truncate(1 << index)
        } else {
            Self::empty()
        }
    }
}

/// Depth bias applied when rendering a shadow map and when testing against it.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct DepthBias {
    /// Constant offset in normalized depth.
    pub constant: f32,
    /// Slope-scaled offset.
    pub slope: f32,
    /// Maximum offset that rasterization may apply.
    pub clamp: f32,
    /// Offset used when comparing against the map.
    pub test: f32,
}

/// Narrower copy of a cascade used to fade between adjacent cascades.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeBlend {
    /// Share of the cascade radius that is not blended.
    pub value: f32,
    pub view: ViewFrustum,
}

/// Farthest visible point of a shadow frustum.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewBounds {
    pub point: Vector3<f32>,
    /// Distance from the camera to the point.
    pub distance: f32,
}

/// See module docs.
#[derive(Debug, Clone)]
pub struct ShadowFrustum {
    pub kind: FrustumKind,
    /// Cascade level for cascaded frustums.
    pub cascade: Option<usize>,
    /// Light that produced the frustum. The frustum never keeps the light alive.
    pub owner: Option<Uuid>,
    /// Position of the light relative to `projection_translation`.
    pub light_relative_position: Vector3<f32>,
    /// Point the projection is centered on.
    pub projection_translation: Vector3<f32>,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub light_radius: f32,
    /// Half-size of the cascade box.
    pub cascade_size: f32,
    pub texture_size: u32,
    /// Sub-frustums the map is rendered with: one for cascades and projectors, six cube faces
    /// for omni lights.
    pub views: ArrayVec<ViewFrustum, 6>,
    pub face_mask: CubeFaceMask,
    pub omni: bool,
    pub blend: Option<CascadeBlend>,
    /// World bounds of the casters rendered into the map.
    pub caster_box: AxisAlignedBoundingBox,
    pub bias: DepthBias,
    /// Widths of the sampling kernel.
    pub jitter: Vector2<f32>,
    /// Inverse world size of the map, used to scale filtering.
    pub frustum_size: f32,
    /// Weight of the fade into the next cascade.
    pub fade_distance: f32,
    /// The map lives in the shared pool of local light shadows.
    pub use_shadow_pool: bool,
    /// Amount of frames between two pool updates.
    pub pool_update_rate: u8,
    /// Only casters missing in the cache have to be rendered this frame.
    pub incremental: bool,
    /// Generation of the cache the caster list was enumerated for.
    pub generation: u8,
    pub update_frame: u64,
    pub update_requested: bool,
    /// The frustum was restored from a snapshot of another GPU.
    pub mgpu_copy: bool,
    pub casters: Vec<CasterId>,
    /// Casters rendered into the map must have these flags.
    pub caster_filter: CasterFlags,
    /// Bookkeeping of cached frustums. Snapshots of the frustum share it.
    pub cache: Option<SharedCacheState>,
}

impl Default for ShadowFrustum {
    fn default() -> Self {
        Self {
            kind: FrustumKind::GsmDynamic,
            cascade: None,
            owner: None,
            light_relative_position: Vector3::zeros(),
            projection_translation: Vector3::zeros(),
            fov: 0.0,
            aspect: 1.0,
            z_near: 0.0,
            z_far: 0.0,
            light_radius: 0.0,
            cascade_size: 0.0,
            texture_size: 0,
            views: Default::default(),
            face_mask: CubeFaceMask::empty(),
            omni: false,
            blend: None,
            caster_box: Default::default(),
            bias: Default::default(),
            jitter: Vector2::new(1.0, 1.0),
            frustum_size: 1.0,
            fade_distance: 0.0,
            use_shadow_pool: false,
            pool_update_rate: 0,
            incremental: false,
            generation: 0,
            update_frame: 0,
            update_requested: false,
            mgpu_copy: false,
            casters: Default::default(),
            caster_filter: CasterFlags::empty(),
            cache: None,
        }
    }
}

impl ShadowFrustum {
    pub fn new(kind: FrustumKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Returns an unused slot to the clean dynamic cascade state. Cache bookkeeping is dropped.
    pub fn reset(&mut self) {
        self.reset_caster_lists();
        self.kind = FrustumKind::GsmDynamic;
        self.cache = None;
        self.blend = None;
        self.views.clear();
        self.face_mask = CubeFaceMask::empty();
        self.incremental = false;
        self.mgpu_copy = false;
    }

    #[inline]
    pub fn reset_caster_lists(&mut self) {
        self.casters.clear();
    }

    /// Asks the renderer to re-render the map.
    #[inline]
    pub fn request_update(&mut self) {
        self.update_requested = true;
    }

    /// Requests an update and forces a full rebuild of the cache, if any.
    pub fn invalidate(&mut self) {
        self.request_update();
        if let Some(cache) = self.cache.as_ref() {
            cache.lock().invalidated = true;
        }
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.kind.is_cached()
    }

    #[inline]
    pub fn is_one_pass_traversal(&self) -> bool {
        self.kind.is_one_pass_traversal()
    }

    /// World position the maps are rendered from.
    #[inline]
    pub fn view_position(&self) -> Vector3<f32> {
        self.light_relative_position + self.projection_translation
    }

    /// The main sub-frustum.
    #[inline]
    pub fn main_view(&self) -> Option<&ViewFrustum> {
        self.views.first()
    }

    /// Sub-frustums that are rendered this frame.
    pub fn visible_views(&self) -> impl Iterator<Item = &ViewFrustum> {
        self.views
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.omni || self.face_mask.contains(CubeFaceMask::face(*i)))
            .map(|(_, view)| view)
    }

    /// Checks whether any sub-frustum of this frustum intersects any sub-frustum of another.
    pub fn is_intersects(&self, other: &ShadowFrustum) -> bool {
        self.views
            .iter()
            .any(|a| other.views.iter().any(|b| a.is_intersects(b)))
    }

    /// Clips the edges of the main sub-frustum with the camera and returns the clipped point
    /// that is the farthest from the camera.
    pub fn bounds_in_view(&self, camera: &ViewFrustum) -> Option<ViewBounds> {
        let view = self.main_view()?;
        let origin = camera.position();
        let mut result: Option<ViewBounds> = None;
        for edge in view.frustum().edges() {
            let Some(range) = camera.frustum().clip_segment(&edge) else {
                continue;
            };
            for t in [range.entering, range.leaving] {
                let point = edge.interpolate(t);
                let distance = (point - origin).norm();
                if result.map_or(true, |bounds| distance > bounds.distance) {
                    result = Some(ViewBounds { point, distance });
                }
            }
        }
        result
    }
}
