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

//! Renderer capabilities the shadow subsystem depends on.

use crate::MAX_CACHED_CASCADES;
use serde::{Deserialize, Serialize};

/// Read-only view of the renderer.
pub trait ShadowRendererInfo {
    /// Texture sizes of the cached cascades, one per cache level. Zero means that the level has
    /// no texture and cannot be used.
    fn cached_shadow_resolutions(&self) -> &[u32];

    /// Amount of GPUs rendering frames in turns.
    fn active_gpu_count(&self) -> u32;

    /// Largest texture side the renderer can allocate.
    fn max_texture_size(&self) -> u32;
}

/// Plain description of renderer capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererCaps {
    pub cached_shadow_resolutions: Vec<u32>,
    pub active_gpu_count: u32,
    pub max_texture_size: u32,
}

impl Default for RendererCaps {
    fn default() -> Self {
        Self {
            cached_shadow_resolutions: vec![2048; MAX_CACHED_CASCADES],
            active_gpu_count: 1,
            max_texture_size: 16384,
        }
    }
}

impl ShadowRendererInfo for RendererCaps {
    fn cached_shadow_resolutions(&self) -> &[u32] {
        &self.cached_shadow_resolutions
    }

    fn active_gpu_count(&self) -> u32 {
        self.active_gpu_count.max(1)
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

/// Amount of leading cache levels that have a texture.
pub fn available_cache_levels(renderer: &dyn ShadowRendererInfo) -> usize {
    renderer
        .cached_shadow_resolutions()
        .iter()
        .take_while(|resolution| **resolution > 0)
        .count()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_available_cache_levels() {
        let caps = RendererCaps {
            cached_shadow_resolutions: vec![4096, 2048, 0],
            ..Default::default()
        };
        assert_eq!(available_cache_levels(&caps), 2);
        assert_eq!(available_cache_levels(&RendererCaps::default()), 3);
    }

    #[test]
    fn test_gpu_count_is_never_zero() {
        let caps = RendererCaps {
            active_gpu_count: 0,
            ..Default::default()
        };
        assert_eq!(caps.active_gpu_count(), 1);
    }
}
