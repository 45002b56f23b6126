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

//! Interface of the scene that provides shadow casters. The shadow subsystem never owns
//! geometry: it asks the scene to tighten light-space bounds and to enumerate static casters
//! for cached frustums.

pub mod octree;

use crate::{cache::cursor::TraversalCursor, error::ShadowError};
use bitflags::bitflags;
use fyrox_math::{aabb::AxisAlignedBoundingBox, frustum::Frustum, hull::ConvexHull};
use futures::channel::oneshot;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Handle of a shadow caster inside of the scene.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CasterId(pub u32);

bitflags! {
    /// Shadow-related render flags of a caster.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CasterFlags: u32 {
        /// The caster casts shadows at all.
        const CAST_SHADOWS = 1 << 0;
        /// The caster never moves and may be rendered into cached maps.
        const STATIC = 1 << 1;
        /// The caster is rendered into distance cascades that extend dynamic ones.
        const DYNAMIC_DISTANCE_SHADOWS = 1 << 2;
        /// Animated character.
        const CHARACTER = 1 << 3;
    }
}

/// Parameters of a static caster enumeration.
#[derive(Clone, Debug, PartialEq)]
pub struct CasterQuery {
    /// Volume in which casters are collected.
    pub frustum: Frustum,
    /// Optional hull that culls casters which cannot shadow anything visible.
    pub hull: Option<ConvexHull>,
    /// Flags that a caster must have.
    pub required: CasterFlags,
    /// Flags that exclude a caster.
    pub excluded: CasterFlags,
    /// Generation of the cache the casters are enumerated for. Casters stamped with this
    /// generation are already represented in the cache and are skipped; every reported caster
    /// gets stamped with it.
    pub generation: u8,
    /// Cached map the casters are enumerated for. Every cached map keeps its own stamps.
    pub cache_level: usize,
    /// Maximum amount of scene nodes visited by the call. `None` means no limit.
    pub node_budget: Option<usize>,
}

impl CasterQuery {
    /// Checks whether a caster with the given flags passes the filter.
    #[inline]
    pub fn accepts(&self, flags: CasterFlags) -> bool {
        flags.contains(self.required) && !flags.intersects(self.excluded)
    }

    /// Checks whether a box lies inside of the query volume.
    #[inline]
    pub fn is_intersects_aabb(&self, aabb: &AxisAlignedBoundingBox) -> bool {
        self.frustum.is_intersects_aabb(aabb)
            && self
                .hull
                .as_ref()
                .map_or(true, |hull| hull.is_intersects_aabb(aabb))
    }
}

/// Result of a static caster enumeration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraversalOutput {
    /// Casters that have to be rendered into the cached map.
    pub casters: Vec<CasterId>,
    /// Traversal position to continue from next time.
    pub cursor: TraversalCursor,
    /// Amount of nodes visited by the call.
    pub nodes_visited: usize,
}

impl TraversalOutput {
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }
}

/// Handle of a static caster enumeration that may still be running.
#[derive(Debug)]
pub enum TraversalJob {
    /// The scene finished the enumeration synchronously.
    Ready(TraversalOutput),
    /// The enumeration runs elsewhere and delivers its results through the channel.
    Pending(oneshot::Receiver<TraversalOutput>),
}

impl TraversalJob {
    /// Creates a handle of an asynchronous enumeration together with the sender that the
    /// worker uses to deliver results.
    pub fn pending() -> (oneshot::Sender<TraversalOutput>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self::Pending(receiver))
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Blocks until the enumeration finishes. There is no timeout: a stalled job stalls the
    /// caller.
    pub fn wait(self) -> Result<TraversalOutput, ShadowError> {
        match self {
            Self::Ready(output) => Ok(output),
            Self::Pending(receiver) => {
                futures::executor::block_on(receiver).map_err(|_| ShadowError::TraversalCanceled)
            }
        }
    }
}

/// Scene collaborator of the shadow subsystem.
pub trait ShadowCasterSource {
    /// Collects casters inside of `world_box` and returns their bounds in the space defined by
    /// `light_view`. Returns `None` if there are no casters.
    fn collect_casters_in_box(
        &self,
        world_box: &AxisAlignedBoundingBox,
        light_view: &Matrix4<f32>,
    ) -> Option<AxisAlignedBoundingBox>;

    /// Enumerates static casters that pass the query, continuing from `cursor`. A fresh cursor
    /// starts a new traversal.
    fn enumerate_static_casters(&self, query: CasterQuery, cursor: TraversalCursor)
        -> TraversalJob;
}

/// A scene without any casters.
#[derive(Debug, Default, Copy, Clone)]
pub struct EmptyScene;

impl ShadowCasterSource for EmptyScene {
    fn collect_casters_in_box(
        &self,
        _world_box: &AxisAlignedBoundingBox,
        _light_view: &Matrix4<f32>,
    ) -> Option<AxisAlignedBoundingBox> {
        None
    }

    fn enumerate_static_casters(
        &self,
        _query: CasterQuery,
        mut cursor: TraversalCursor,
    ) -> TraversalJob {
        if !cursor.is_started() {
            cursor.begin(0);
        }
        while cursor.pop().is_some() {}
        TraversalJob::Ready(TraversalOutput {
            casters: Default::default(),
            cursor,
            nodes_visited: 0,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::ThreadPool;

    #[test]
    fn test_query_filter() {
        let query = CasterQuery {
            frustum: Default::default(),
            hull: None,
            required: CasterFlags::CAST_SHADOWS | CasterFlags::STATIC,
            excluded: CasterFlags::CHARACTER,
            generation: 1,
            cache_level: 0,
            node_budget: None,
        };
        assert!(query.accepts(CasterFlags::CAST_SHADOWS | CasterFlags::STATIC));
        assert!(!query.accepts(CasterFlags::CAST_SHADOWS));
        assert!(!query.accepts(
            CasterFlags::CAST_SHADOWS | CasterFlags::STATIC | CasterFlags::CHARACTER
        ));
    }

    #[test]
    fn test_pending_job_delivers_output() {
        let pool = ThreadPool::new().unwrap();
        let (sender, job) = TraversalJob::pending();
        assert!(!job.is_ready());
        pool.spawn_ok(async move {
            let _ = sender.send(TraversalOutput {
                casters: vec![CasterId(7)],
                ..Default::default()
            });
        });
        let output = job.wait().unwrap();
        assert_eq!(output.casters, vec![CasterId(7)]);
    }

    #[test]
    fn test_dropped_job_is_canceled() {
        let (sender, job) = TraversalJob::pending();
        drop(sender);
        assert_eq!(job.wait(), Err(ShadowError::TraversalCanceled));
    }

    #[test]
    fn test_empty_scene_finishes_immediately() {
        let output = EmptyScene
            .enumerate_static_casters(
                CasterQuery {
                    frustum: Default::default(),
                    hull: None,
                    required: CasterFlags::empty(),
                    excluded: CasterFlags::empty(),
                    generation: 1,
                    cache_level: 0,
                    node_budget: Some(1),
                },
                TraversalCursor::new(),
            )
            .wait()
            .unwrap();
        assert!(output.is_finished());
        assert!(output.casters.is_empty());
    }
}
