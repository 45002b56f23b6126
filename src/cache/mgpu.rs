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

//! Snapshots of cached frustums shared between GPUs.
//!
//! With alternate frame rendering every GPU keeps its own copy of the cached maps. When the
//! caches are refreshed on one GPU, the remaining GPUs must re-render the very same frustums,
//! so the refreshed frustums are stored here together with a mask of GPUs that still have to
//! catch up.

use crate::{frustum::ShadowFrustum, MAX_CACHED_CASCADES};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct MultiGpuFrustumCache {
    update_mask: AtomicU32,
    cascades: Mutex<[Option<ShadowFrustum>; MAX_CACHED_CASCADES]>,
    height_map_ao: Mutex<Option<ShadowFrustum>>,
}

/// Mask with a bit set for every GPU.
#[inline]
pub fn all_gpus_mask(gpu_count: u32) -> u32 {
    match gpu_count {
        0 => 0,
        32.. => u32::MAX,
        count => (1 << count) - 1,
    }
}

impl MultiGpuFrustumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask of GPUs that still have to render the stored snapshots.
    #[inline]
    pub fn update_mask(&self) -> u32 {
        self.update_mask.load(Ordering::Acquire)
    }

    /// Whether some GPU still has to render the stored snapshots.
    #[inline]
    pub fn has_pending_gpus(&self) -> bool {
        self.update_mask() != 0
    }

    /// Marks the stored snapshots as pending for every GPU.
    pub fn mark_rebuilt(&self, gpu_count: u32) {
        self.update_mask
            .store(all_gpus_mask(gpu_count), Ordering::Release);
    }

    /// Called by the renderer when a GPU rendered the snapshots.
    pub fn on_gpu_frame_rendered(&self, gpu_index: u32) {
        if gpu_index < u32::BITS {
            self.update_mask
                .fetch_and(!(1 << gpu_index), Ordering::AcqRel);
        }
    }

    pub fn store_cascade(&self, cache_index: usize, frustum: &ShadowFrustum) {
        if let Some(slot) = self.cascades.lock().get_mut(cache_index) {
            *slot = Some(frustum.clone());
        }
    }

    /// Returns a copy of the snapshot of a cached cascade, marked as restored.
    pub fn cascade(&self, cache_index: usize) -> Option<ShadowFrustum> {
        self.cascades
            .lock()
            .get(cache_index)
            .and_then(|slot| slot.clone())
            .map(restored)
    }

    pub fn store_height_map_ao(&self, frustum: &ShadowFrustum) {
        *self.height_map_ao.lock() = Some(frustum.clone());
    }

    pub fn height_map_ao(&self) -> Option<ShadowFrustum> {
        self.height_map_ao.lock().clone().map(restored)
    }

    /// Drops every snapshot.
    pub fn clear(&self) {
        self.update_mask.store(0, Ordering::Release);
        *self.cascades.lock() = Default::default();
        *self.height_map_ao.lock() = None;
    }
}

fn restored(mut frustum: ShadowFrustum) -> ShadowFrustum {
    frustum.mgpu_copy = true;
    frustum.request_update();
    frustum
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frustum::FrustumKind;

    #[test]
    fn test_mask() {
        assert_eq!(all_gpus_mask(0), 0);
        assert_eq!(all_gpus_mask(1), 0b1);
        assert_eq!(all_gpus_mask(3), 0b111);
        assert_eq!(all_gpus_mask(32), u32::MAX);
        assert_eq!(all_gpus_mask(40), u32::MAX);

        let cache = MultiGpuFrustumCache::new();
        assert!(!cache.has_pending_gpus());
        cache.mark_rebuilt(2);
        assert_eq!(cache.update_mask(), 0b11);
        cache.on_gpu_frame_rendered(0);
        assert_eq!(cache.update_mask(), 0b10);
        cache.on_gpu_frame_rendered(40);
        assert_eq!(cache.update_mask(), 0b10);
        cache.on_gpu_frame_rendered(1);
        assert!(!cache.has_pending_gpus());
    }

    #[test]
    fn test_snapshots() {
        let cache = MultiGpuFrustumCache::new();
        let mut frustum = ShadowFrustum::new(FrustumKind::GsmCached);
        frustum.cascade = Some(3);
        frustum.generation = 7;

        cache.store_cascade(1, &frustum);
        cache.store_cascade(MAX_CACHED_CASCADES, &frustum);
        assert!(cache.cascade(0).is_none());
        let copy = cache.cascade(1).unwrap();
        assert!(copy.mgpu_copy);
        assert!(copy.update_requested);
        assert_eq!(copy.cascade, Some(3));
        assert_eq!(copy.generation, 7);

        frustum.kind = FrustumKind::HeightMapAo;
        cache.store_height_map_ao(&frustum);
        assert_eq!(cache.height_map_ao().unwrap().kind, FrustumKind::HeightMapAo);

        cache.mark_rebuilt(2);
        cache.clear();
        assert!(cache.cascade(1).is_none());
        assert!(cache.height_map_ao().is_none());
        assert!(!cache.has_pending_gpus());
    }
}
