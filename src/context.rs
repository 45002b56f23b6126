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

//! Per-frame inputs of a light update.

use crate::{
    cache::mgpu::MultiGpuFrustumCache, camera::ViewFrustum, caster::ShadowCasterSource,
    renderer::ShadowRendererInfo, settings::ShadowSettings,
};

/// Everything a light needs to produce its shadow frustums for one frame. The context is
/// immutable: settings and collaborators are polled, never modified.
#[derive(Copy, Clone)]
pub struct ShadowFrameContext<'a> {
    /// Observer camera.
    pub camera: &'a ViewFrustum,
    /// Id of the current frame.
    pub frame_id: u64,
    pub settings: &'a ShadowSettings,
    pub renderer: &'a dyn ShadowRendererInfo,
    pub scene: &'a dyn ShadowCasterSource,
    /// Snapshots of cached frustums shared between GPUs.
    pub gpu_cache: Option<&'a MultiGpuFrustumCache>,
    /// Forces a full rebuild of every cached frustum this frame.
    pub force_cache_rebuild: bool,
}

impl<'a> ShadowFrameContext<'a> {
    pub fn new(
        camera: &'a ViewFrustum,
        settings: &'a ShadowSettings,
        renderer: &'a dyn ShadowRendererInfo,
        scene: &'a dyn ShadowCasterSource,
    ) -> Self {
        Self {
            camera,
            frame_id: 0,
            settings,
            renderer,
            scene,
            gpu_cache: None,
            force_cache_rebuild: false,
        }
    }

    pub fn with_frame_id(mut self, frame_id: u64) -> Self {
        self.frame_id = frame_id;
        self
    }

    pub fn with_gpu_cache(mut self, gpu_cache: &'a MultiGpuFrustumCache) -> Self {
        self.gpu_cache = Some(gpu_cache);
        self
    }

    pub fn with_forced_cache_rebuild(mut self, force: bool) -> Self {
        self.force_cache_rebuild = force;
        self
    }

    #[inline]
    pub fn gpu_count(&self) -> u32 {
        self.renderer.active_gpu_count().max(1)
    }
}
