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

//! Perspective view volume used both for the observer camera and for every shadow view.

use crate::error::ShadowError;
use fyrox_math::{frustum::Frustum, Matrix4Ext};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// A perspective view: position, orientation, vertical field of view, aspect ratio and depth
/// range. The orientation basis stores (right, forward, up) in its columns, world is Z-up.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewFrustum {
    position: Vector3<f32>,
    basis: Matrix3<f32>,
    fov: f32,
    aspect: f32,
    z_near: f32,
    z_far: f32,
    frustum: Frustum,
}

impl Default for ViewFrustum {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            basis: Matrix3::identity(),
            fov: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
            z_near: 0.025,
            z_far: 1024.0,
            frustum: Default::default(),
        }
    }
}

impl ViewFrustum {
    /// Creates a new view looking along `forward`. `up` is only a hint, it is re-orthogonalized
    /// against `forward`. `fov` is the vertical field of view in radians.
    pub fn new(
        position: Vector3<f32>,
        forward: Vector3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Result<Self, ShadowError> {
        ShadowError::check_depth_range(None, z_near, z_far)?;

        let forward = forward
            .try_normalize(f32::EPSILON)
            .ok_or(ShadowError::ZeroDirection)?;
        let up = fyrox_math::non_parallel_up(&forward, &up);
        let right = forward
            .cross(&up)
            .try_normalize(f32::EPSILON)
            .ok_or(ShadowError::ZeroDirection)?;
        let up = right.cross(&forward);

        let frustum =
            Frustum::from_perspective(position, forward, up, fov, aspect, z_near, z_far)
                .ok_or(ShadowError::ZeroDirection)?;

        Ok(Self {
            position,
            basis: Matrix3::from_columns(&[right, forward, up]),
            fov,
            aspect,
            z_near,
            z_far,
            frustum,
        })
    }

    /// Creates a view from a world transform whose columns are (right, forward, up, position).
    pub fn from_transform(
        transform: &Matrix4<f32>,
        fov: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Result<Self, ShadowError> {
        Self::new(
            transform.position(),
            transform.up(),
            transform.look(),
            fov,
            aspect,
            z_near,
            z_far,
        )
    }

    /// Returns the same view with different optics.
    pub fn with_projection(
        &self,
        fov: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Result<Self, ShadowError> {
        Self::new(
            self.position,
            self.forward(),
            self.up(),
            fov,
            aspect,
            z_near,
            z_far,
        )
    }

    #[inline]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    #[inline]
    pub fn right(&self) -> Vector3<f32> {
        self.basis.column(0).into_owned()
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.basis.column(1).into_owned()
    }

    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.basis.column(2).into_owned()
    }

    #[inline]
    pub fn basis(&self) -> &Matrix3<f32> {
        &self.basis
    }

    /// Vertical field of view in radians.
    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    #[inline]
    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    #[inline]
    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Planes and corners of the view volume.
    #[inline]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Corner of the near plane in camera space: x is the half-width, y is the near distance and
    /// z is the half-height.
    #[inline]
    pub fn edge_near(&self) -> Vector3<f32> {
        self.edge_at(self.z_near)
    }

    /// Same as [`Self::edge_near`], but for the far plane.
    #[inline]
    pub fn edge_far(&self) -> Vector3<f32> {
        self.edge_at(self.z_far)
    }

    fn edge_at(&self, depth: f32) -> Vector3<f32> {
        let tan_y = (self.fov * 0.5).tan();
        Vector3::new(tan_y * self.aspect * depth, depth, tan_y * depth)
    }

    /// Level-of-detail scale of the view: narrow fields of view (zoomed in) give smaller values.
    #[inline]
    pub fn zoom_factor(&self) -> f32 {
        0.4 + 0.6 * (self.fov.to_degrees() / 60.0)
    }

    #[inline]
    pub fn is_point_visible(&self, point: &Vector3<f32>) -> bool {
        self.frustum.is_contains_point(*point)
    }

    /// Right-handed view matrix that transforms world space into the view space.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.position + self.forward()),
            &self.up(),
        )
    }

    /// Checks whether two view volumes share at least one point.
    #[inline]
    pub fn is_intersects(&self, other: &ViewFrustum) -> bool {
        self.frustum.is_intersects_frustum(&other.frustum)
    }
}
