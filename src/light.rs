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

//! Read-only description of a light source as seen by the shadow subsystem.

use fyrox_math::aabb::AxisAlignedBoundingBox;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};
use uuid::Uuid;

/// Type of a light and its type-specific geometric parameters.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
pub enum LightKind {
    /// Infinitely distant light (sun).
    Directional,
    /// Projector light.
    Spot {
        /// Full cone angle in radians.
        cone_angle: f32,
    },
    /// Omnidirectional light.
    #[default]
    Point,
    /// Rectangular area light. Shadows are projected the same way as for spot lights.
    Area {
        /// Full cone angle of the shadow projector in radians.
        cone_angle: f32,
        width: f32,
        height: f32,
    },
}

/// Shadow frustum initialization strategy of a light type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum FrustumStrategy {
    /// Cascades aligned with the light direction.
    Directional,
    /// A single perspective frustum along the light direction.
    Projector,
    /// Six cube faces around the light origin.
    Omni,
}

impl FrustumStrategy {
    pub fn for_light(kind: &LightKind) -> Self {
        match kind {
            LightKind::Directional => Self::Directional,
            LightKind::Spot { .. } | LightKind::Area { .. } => Self::Projector,
            LightKind::Point => Self::Omni,
        }
    }
}

/// See module docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowLight {
    pub id: Uuid,
    pub kind: LightKind,
    /// World position of the light. Directional lights ignore it.
    pub origin: Vector3<f32>,
    /// Direction in which the light travels (projector axis for spot and area lights).
    pub direction: Vector3<f32>,
    pub radius: f32,
    pub color: Vector3<f32>,
    /// Constant depth bias multiplier of local lights.
    pub shadow_bias: f32,
    /// Slope depth bias multiplier of local lights.
    pub shadow_slope_bias: f32,
    /// Shadow update ratio relative to the global view distance ratio, 1.0 is neutral.
    pub shadow_update_ratio: f32,
    /// Distance to the camera under which shadows of the light update every frame.
    pub shadow_update_min_radius: f32,
    /// Scale of the area used by the deferred resolution estimate.
    pub shadow_resolution_scale: f32,
    /// Minimal resolution as a fraction of the shadow pool: 0 - none, 1 - 1/8, 2 - 1/4,
    /// 3 - 1/2, 4 - full pool.
    pub shadow_min_resolution: u8,
    /// Deferred lights live in the shared shadow pool.
    pub deferred: bool,
}

impl Default for ShadowLight {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: LightKind::Point,
            origin: Vector3::zeros(),
            direction: -Vector3::z(),
            radius: 10.0,
            color: Vector3::new(1.0, 1.0, 1.0),
            shadow_bias: 1.0,
            shadow_slope_bias: 1.0,
            shadow_update_ratio: 1.0,
            shadow_update_min_radius: 4.0,
            shadow_resolution_scale: 1.0,
            shadow_min_resolution: 0,
            deferred: false,
        }
    }
}

impl ShadowLight {
    /// Creates a sun light travelling along `direction`.
    pub fn directional(direction: Vector3<f32>) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            radius: 1.0e8,
            ..Default::default()
        }
    }

    /// Creates a spot light at `origin` looking along `direction`.
    pub fn spot(origin: Vector3<f32>, direction: Vector3<f32>, cone_angle: f32, radius: f32) -> Self {
        Self {
            kind: LightKind::Spot { cone_angle },
            origin,
            direction,
            radius,
            ..Default::default()
        }
    }

    /// Creates a point light.
    pub fn point(origin: Vector3<f32>, radius: f32) -> Self {
        Self {
            kind: LightKind::Point,
            origin,
            radius,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional)
    }

    #[inline]
    pub fn strategy(&self) -> FrustumStrategy {
        FrustumStrategy::for_light(&self.kind)
    }

    /// Perceived brightness of the light color.
    #[inline]
    pub fn luminance(&self) -> f32 {
        self.color.x * 0.30 + self.color.y * 0.59 + self.color.z * 0.11
    }

    /// Full cone angle of projector-like lights in radians. Point lights use a 90 degree face.
    pub fn cone_angle(&self) -> f32 {
        match self.kind {
            LightKind::Spot { cone_angle } | LightKind::Area { cone_angle, .. } => cone_angle,
            LightKind::Point => std::f32::consts::FRAC_PI_2,
            LightKind::Directional => 0.0,
        }
    }

    /// Radius of the region lit by the light. Area lights grow by their largest side.
    pub fn effective_radius(&self) -> f32 {
        match self.kind {
            LightKind::Area { width, height, .. } => self.radius + width.max(height),
            _ => self.radius,
        }
    }

    /// Bounding box of the lit region of a local light.
    pub fn bounds(&self) -> AxisAlignedBoundingBox {
        let radius = self.effective_radius();
        AxisAlignedBoundingBox::from_center_half_extents(
            self.origin,
            Vector3::new(radius, radius, radius),
        )
    }

    /// Normalized direction pointing from the scene towards the sun.
    pub fn sun_vector(&self) -> Option<Vector3<f32>> {
        self.direction.try_normalize(f32::EPSILON).map(|d| -d)
    }
}
