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

//! In-memory caster scene organized as an octree. It implements [`ShadowCasterSource`] and keeps
//! a rendered-generation stamp per caster and cache level, so it can answer whether a caster is
//! already represented in a cached shadow map.

use crate::caster::{
    CasterFlags, CasterId, CasterQuery, ShadowCasterSource, TraversalJob, TraversalOutput,
};
use crate::{cache::cursor::TraversalCursor, MAX_CACHED_CASCADES};
use fyrox_math::aabb::AxisAlignedBoundingBox;
use futures::executor::ThreadPool;
use nalgebra::{Matrix4, Vector3};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

/// Maximum depth of the tree. Casters that overlap every child of a node would otherwise make
/// the splitting endless.
pub const MAX_OCTREE_DEPTH: usize = 8;

/// A single shadow caster of the scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CasterEntry {
    pub bounds: AxisAlignedBoundingBox,
    pub flags: CasterFlags,
}

#[derive(Clone, Debug)]
pub enum OctreeNode {
    Leaf {
        indices: Vec<u32>,
        bounds: AxisAlignedBoundingBox,
    },
    Branch {
        bounds: AxisAlignedBoundingBox,
        leaves: [usize; 8],
    },
}

impl OctreeNode {
    #[inline]
    pub fn bounds(&self) -> &AxisAlignedBoundingBox {
        match self {
            OctreeNode::Leaf { bounds, .. } | OctreeNode::Branch { bounds, .. } => bounds,
        }
    }
}

/// See module docs.
#[derive(Debug)]
pub struct CasterOctree {
    casters: Vec<CasterEntry>,
    stamps: Vec<[AtomicU8; MAX_CACHED_CASCADES]>,
    nodes: Vec<OctreeNode>,
    root: usize,
}

impl Default for CasterOctree {
    fn default() -> Self {
        Self::new(Vec::new(), 8)
    }
}

impl CasterOctree {
    pub fn new(casters: Vec<CasterEntry>, split_threshold: usize) -> Self {
        let mut bounds = AxisAlignedBoundingBox::default();
        for caster in casters.iter() {
            bounds.add_box(caster.bounds);
        }

        // Inflate initial bounds by very low value to fix floating-point calculation
        // issues when splitting and checking intersection later on.
        let inflation = 2.0 * f32::EPSILON;
        bounds.inflate(Vector3::new(inflation, inflation, inflation));

        let indices = (0..casters.len() as u32).collect();

        let mut nodes = Vec::new();
        let root = build_recursive(
            &mut nodes,
            &casters,
            bounds,
            indices,
            split_threshold.max(1),
            0,
        );

        Self {
            stamps: casters.iter().map(|_| Default::default()).collect(),
            casters,
            nodes,
            root,
        }
    }

    #[inline]
    pub fn casters(&self) -> &[CasterEntry] {
        &self.casters
    }

    #[inline]
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Generation of the cached map of the given level the caster was last rendered into, zero
    /// if it never was.
    #[inline]
    pub fn rendered_generation(&self, id: CasterId, cache_level: usize) -> u8 {
        self.stamps
            .get(id.0 as usize)
            .and_then(|stamps| stamps.get(cache_level))
            .map(|stamp| stamp.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    /// Marks a caster as modified, so that the next enumeration of every level reports it again.
    pub fn invalidate_caster(&self, id: CasterId) {
        if let Some(stamps) = self.stamps.get(id.0 as usize) {
            for stamp in stamps {
                stamp.store(0, Ordering::Release);
            }
        }
    }

    /// Marks every caster as modified.
    pub fn invalidate_all(&self) {
        for stamp in self.stamps.iter().flatten() {
            stamp.store(0, Ordering::Release);
        }
    }

    pub fn aabb_query(&self, aabb: &AxisAlignedBoundingBox, buffer: &mut Vec<u32>) {
        buffer.clear();
        if !self.nodes.is_empty() {
            self.aabb_recursive_query(self.root, aabb, buffer);
        }
    }

    fn aabb_recursive_query(
        &self,
        node: usize,
        aabb: &AxisAlignedBoundingBox,
        buffer: &mut Vec<u32>,
    ) {
        match &self.nodes[node] {
            OctreeNode::Leaf { indices, bounds } => {
                if bounds.is_intersects_aabb(aabb) {
                    buffer.extend_from_slice(indices)
                }
            }
            OctreeNode::Branch { bounds, leaves } => {
                if bounds.is_intersects_aabb(aabb) {
                    for leaf in leaves {
                        self.aabb_recursive_query(*leaf, aabb, buffer)
                    }
                }
            }
        }
    }

    /// Visits nodes in depth-first order starting from `cursor` until the budget of the query
    /// is exhausted or the tree is fully traversed.
    pub fn enumerate(&self, query: &CasterQuery, mut cursor: TraversalCursor) -> TraversalOutput {
        if !cursor.is_started() {
            cursor.begin(self.root as u32);
        }

        let mut casters = Vec::new();
        let mut nodes_visited = 0;

        while query.node_budget.map_or(true, |budget| nodes_visited < budget) {
            let Some(node) = cursor.pop() else {
                break;
            };
            cursor.mark_processed(node);
            nodes_visited += 1;

            match self.nodes.get(node as usize) {
                Some(OctreeNode::Leaf { indices, bounds }) => {
                    if !query.is_intersects_aabb(bounds) {
                        continue;
                    }
                    for &index in indices {
                        let caster = &self.casters[index as usize];
                        if !query.accepts(caster.flags)
                            || !query.is_intersects_aabb(&caster.bounds)
                        {
                            continue;
                        }
                        let Some(stamp) = self.stamps[index as usize].get(query.cache_level)
                        else {
                            continue;
                        };
                        if stamp.swap(query.generation, Ordering::AcqRel) != query.generation {
                            casters.push(CasterId(index));
                        }
                    }
                }
                Some(OctreeNode::Branch { bounds, leaves }) => {
                    if query.is_intersects_aabb(bounds) {
                        // Reversed, so the first child is visited first.
                        for leaf in leaves.iter().rev() {
                            cursor.push(*leaf as u32);
                        }
                    }
                }
                None => (),
            }
        }

        TraversalOutput {
            casters,
            cursor,
            nodes_visited,
        }
    }

    fn collect_bounds(
        &self,
        world_box: &AxisAlignedBoundingBox,
        light_view: &Matrix4<f32>,
    ) -> Option<AxisAlignedBoundingBox> {
        let mut indices = Vec::new();
        self.aabb_query(world_box, &mut indices);

        let mut light_space_bounds = AxisAlignedBoundingBox::default();
        for index in indices {
            let caster = &self.casters[index as usize];
            if caster.flags.contains(CasterFlags::CAST_SHADOWS)
                && caster.bounds.is_intersects_aabb(world_box)
            {
                light_space_bounds.add_box(caster.bounds.transform(light_view));
            }
        }

        if light_space_bounds.is_valid() {
            Some(light_space_bounds)
        } else {
            None
        }
    }
}

impl ShadowCasterSource for CasterOctree {
    fn collect_casters_in_box(
        &self,
        world_box: &AxisAlignedBoundingBox,
        light_view: &Matrix4<f32>,
    ) -> Option<AxisAlignedBoundingBox> {
        self.collect_bounds(world_box, light_view)
    }

    fn enumerate_static_casters(
        &self,
        query: CasterQuery,
        cursor: TraversalCursor,
    ) -> TraversalJob {
        TraversalJob::Ready(self.enumerate(&query, cursor))
    }
}

/// Caster octree that enumerates static casters on a thread pool.
pub struct ThreadedCasterOctree {
    tree: Arc<CasterOctree>,
    pool: ThreadPool,
}

impl ThreadedCasterOctree {
    pub fn new(tree: Arc<CasterOctree>, pool: ThreadPool) -> Self {
        Self { tree, pool }
    }

    #[inline]
    pub fn tree(&self) -> &Arc<CasterOctree> {
        &self.tree
    }
}

impl ShadowCasterSource for ThreadedCasterOctree {
    fn collect_casters_in_box(
        &self,
        world_box: &AxisAlignedBoundingBox,
        light_view: &Matrix4<f32>,
    ) -> Option<AxisAlignedBoundingBox> {
        self.tree.collect_bounds(world_box, light_view)
    }

    fn enumerate_static_casters(
        &self,
        query: CasterQuery,
        cursor: TraversalCursor,
    ) -> TraversalJob {
        let (sender, job) = TraversalJob::pending();
        let tree = self.tree.clone();
        self.pool.spawn_ok(async move {
            let _ = sender.send(tree.enumerate(&query, cursor));
        });
        job
    }
}

fn build_recursive(
    nodes: &mut Vec<OctreeNode>,
    casters: &[CasterEntry],
    bounds: AxisAlignedBoundingBox,
    indices: Vec<u32>,
    split_threshold: usize,
    depth: usize,
) -> usize {
    if indices.len() <= split_threshold || depth >= MAX_OCTREE_DEPTH {
        let index = nodes.len();
        nodes.push(OctreeNode::Leaf { bounds, indices });
        index
    } else {
        let mut leaves = [0; 8];
        let leaf_bounds = bounds.split();

        for (leaf, leaf_bounds) in leaves.iter_mut().zip(leaf_bounds) {
            let leaf_indices = indices
                .iter()
                .copied()
                .filter(|index| casters[*index as usize].bounds.is_intersects_aabb(&leaf_bounds))
                .collect();

            *leaf = build_recursive(
                nodes,
                casters,
                leaf_bounds,
                leaf_indices,
                split_threshold,
                depth + 1,
            );
        }

        let index = nodes.len();
        nodes.push(OctreeNode::Branch { leaves, bounds });
        index
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fyrox_math::frustum::Frustum;

    fn grid_of_casters(count: usize, spacing: f32) -> Vec<CasterEntry> {
        let mut casters = Vec::new();
        for x in 0..count {
            for y in 0..count {
                let center = Vector3::new(x as f32 * spacing, y as f32 * spacing, 0.0);
                casters.push(CasterEntry {
                    bounds: AxisAlignedBoundingBox::from_center_half_extents(
                        center,
                        Vector3::new(0.5, 0.5, 0.5),
                    ),
                    flags: CasterFlags::CAST_SHADOWS | CasterFlags::STATIC,
                });
            }
        }
        casters
    }

    fn top_down_query(generation: u8, node_budget: Option<usize>) -> CasterQuery {
        CasterQuery {
            frustum: Frustum::from_perspective(
                Vector3::new(20.0, 20.0, 100.0),
                -Vector3::z(),
                Vector3::y(),
                90.0f32.to_radians(),
                1.0,
                1.0,
                200.0,
            )
            .unwrap(),
            hull: None,
            required: CasterFlags::CAST_SHADOWS | CasterFlags::STATIC,
            excluded: CasterFlags::empty(),
            generation,
            cache_level: 0,
            node_budget,
        }
    }

    #[test]
    fn test_octree_new() {
        let tree = CasterOctree::new(grid_of_casters(8, 5.0), 4);
        assert_eq!(tree.casters().len(), 64);
        assert!(matches!(tree.nodes()[tree.root], OctreeNode::Branch { .. }));
        assert!(tree.nodes().len() > 8);
    }

    #[test]
    fn test_overlapping_casters_terminate() {
        let casters = vec![
            CasterEntry {
                bounds: AxisAlignedBoundingBox::from_center_half_extents(
                    Vector3::zeros(),
                    Vector3::new(10.0, 10.0, 10.0),
                ),
                flags: CasterFlags::CAST_SHADOWS,
            };
            16
        ];
        let tree = CasterOctree::new(casters, 1);
        assert!(!tree.nodes().is_empty());
    }

    #[test]
    fn test_default_octree() {
        let tree = CasterOctree::default();
        let output = tree.enumerate(&top_down_query(1, None), TraversalCursor::new());
        assert!(output.is_finished());
        assert!(output.casters.is_empty());
    }

    #[test]
    fn test_enumeration_reports_each_caster_once_per_generation() {
        let tree = CasterOctree::new(grid_of_casters(8, 5.0), 4);

        let output = tree.enumerate(&top_down_query(1, None), TraversalCursor::new());
        assert!(output.is_finished());
        assert_eq!(output.casters.len(), 64);
        assert_eq!(tree.rendered_generation(CasterId(10), 0), 1);
        assert_eq!(tree.rendered_generation(CasterId(10), 1), 0);

        // Same generation: everything is already represented.
        let output = tree.enumerate(&top_down_query(1, None), TraversalCursor::new());
        assert!(output.casters.is_empty());

        tree.invalidate_caster(CasterId(10));
        let output = tree.enumerate(&top_down_query(1, None), TraversalCursor::new());
        assert_eq!(output.casters, vec![CasterId(10)]);

        // New generation: everything has to be rendered again.
        let output = tree.enumerate(&top_down_query(2, None), TraversalCursor::new());
        assert_eq!(output.casters.len(), 64);

        // Other cache levels keep their own stamps.
        let mut query = top_down_query(2, None);
        query.cache_level = 1;
        let output = tree.enumerate(&query, TraversalCursor::new());
        assert_eq!(output.casters.len(), 64);
    }

    #[test]
    fn test_budgeted_enumeration_resumes() {
        let tree = CasterOctree::new(grid_of_casters(8, 5.0), 2);

        let mut cursor = TraversalCursor::new();
        let mut total = 0;
        let mut frames = 0;
        loop {
            let output = tree.enumerate(&top_down_query(3, Some(4)), cursor);
            assert!(output.nodes_visited <= 4);
            total += output.casters.len();
            frames += 1;
            if output.is_finished() {
                break;
            }
            cursor = output.cursor;
            assert!(frames < 1000);
        }
        assert!(frames > 1);
        assert_eq!(total, 64);
    }

    #[test]
    fn test_excluded_flags() {
        let mut casters = grid_of_casters(2, 5.0);
        casters[0].flags |= CasterFlags::CHARACTER;
        let tree = CasterOctree::new(casters, 4);
        let mut query = top_down_query(1, None);
        query.excluded = CasterFlags::CHARACTER;
        let output = tree.enumerate(&query, TraversalCursor::new());
        assert_eq!(output.casters.len(), 3);
        assert!(!output.casters.contains(&CasterId(0)));
    }

    #[test]
    fn test_collect_casters_in_box() {
        let tree = CasterOctree::new(grid_of_casters(4, 5.0), 2);
        let world_box = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(6.0, 1.0, 1.0),
        );
        let bounds = tree
            .collect_casters_in_box(&world_box, &Matrix4::identity())
            .unwrap();
        assert_eq!(bounds.min, Vector3::new(-0.5, -0.5, -0.5));
        assert_eq!(bounds.max, Vector3::new(5.5, 0.5, 0.5));

        let empty = AxisAlignedBoundingBox::from_min_max(
            Vector3::new(100.0, 100.0, 100.0),
            Vector3::new(101.0, 101.0, 101.0),
        );
        assert!(tree
            .collect_casters_in_box(&empty, &Matrix4::identity())
            .is_none());
    }

    #[test]
    fn test_threaded_enumeration() {
        let tree = Arc::new(CasterOctree::new(grid_of_casters(4, 5.0), 2));
        let scene = ThreadedCasterOctree::new(tree.clone(), ThreadPool::new().unwrap());
        let job = scene.enumerate_static_casters(top_down_query(5, None), TraversalCursor::new());
        let output = job.wait().unwrap();
        assert_eq!(output.casters.len(), 16);
        assert_eq!(tree.rendered_generation(CasterId(3), 0), 5);
    }
}
