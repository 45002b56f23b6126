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

//! Convex hull of the region that may contain casters of sun shadows visible to the camera.
//!
//! The hull is the camera pyramid swept towards the sun: every face of the pyramid is taken
//! either as is or moved by the sweep, and silhouette edges of the sweep get junction planes.

use crate::camera::ViewFrustum;
use fyrox_math::{hull::ConvexHull, plane::Plane};
use nalgebra::Vector3;

/// Side faces of the pyramid (apex, far corner, far corner) followed by the far face.
const FACES: [[usize; 3]; 5] = [[4, 1, 0], [4, 0, 3], [4, 3, 2], [4, 2, 1], [0, 1, 2]];
const FAR_FACE: usize = 4;
/// Far distance multiplier of the hull pyramid.
const FAR_SCALE: f32 = 1.3;
/// Smallest depth and sweep of the hull. Shorter ones collapse the junction planes.
const MIN_HULL_EXTENT: f32 = 1.0;

/// Builds the caster hull.
///
/// `sun_vector` points towards the sun, `max_distance` is the shadow distance of the camera and
/// `clip_range` is how far towards the sun the casters are collected. Both distances are clamped
/// to [`MIN_HULL_EXTENT`]. The result always has 9 or 10 planes, all of them facing inside.
pub fn build_caster_hull(
    camera: &ViewFrustum,
    sun_vector: &Vector3<f32>,
    max_distance: f32,
    clip_range: f32,
) -> ConvexHull {
    let max_distance = max_distance.max(MIN_HULL_EXTENT);
    let clip_range = clip_range.max(MIN_HULL_EXTENT);
    let origin = camera.position();
    let corners = camera.frustum().corners();

    let mut vertices = [Vector3::zeros(); 10];
    for (vertex, corner) in vertices.iter_mut().zip(corners.iter().take(4)) {
        let dir = (corner - origin)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| camera.forward());
        *vertex = origin + dir.scale(max_distance * FAR_SCALE);
    }
    vertices[4] = origin;
    let sweep = sun_vector.scale(clip_range);
    for i in 0..5 {
        vertices[i + 5] = vertices[i] + sweep;
    }

    let base_centroid = vertices[..5].iter().sum::<Vector3<f32>>().scale(1.0 / 5.0);
    let centroid = vertices.iter().sum::<Vector3<f32>>().scale(1.0 / 10.0);

    // A face that looks at the sun (its inner normal points towards the sun) stays in place,
    // otherwise its swept copy bounds the hull.
    let mut planes: [Option<Plane>; 5] = [None; 5];
    let mut keep_base = [false; 5];
    for (i, face) in FACES.iter().enumerate() {
        let plane = Plane::from_three_points(
            &vertices[face[0]],
            &vertices[face[1]],
            &vertices[face[2]],
        )
        .map(|plane| plane.facing(&base_centroid));
        if let Some(plane) = plane {
            let facing = plane.normal.dot(sun_vector);
            keep_base[i] = if i == FAR_FACE {
                facing >= 0.0
            } else {
                facing > 0.0
            };
        }
        planes[i] = plane;
    }

    let offset = |keep: bool| if keep { (0, 5) } else { (5, 0) };
    let mut hull = ConvexHull::new();
    let mut push = |plane: Option<Plane>| {
        if let Some(plane) = plane {
            hull.push(plane.facing(&centroid));
        }
    };
    let junction = |a: usize, b: usize, c: usize| {
        Plane::from_three_points(&vertices[a], &vertices[b], &vertices[c])
    };

    push(planes[FAR_FACE].map(|plane| {
        if keep_base[FAR_FACE] {
            plane
        } else {
            plane.translated(&sweep)
        }
    }));

    for i in 0..4 {
        let face = FACES[i];
        let (own, other) = offset(keep_base[i]);

        push(planes[i].map(|plane| {
            if keep_base[i] {
                plane
            } else {
                plane.translated(&sweep)
            }
        }));

        if keep_base[FAR_FACE] != keep_base[i] {
            push(junction(face[1] + own, face[1] + other, face[2] + own));
        }

        let next = (i + 1) % 4;
        if keep_base[next] != keep_base[i] {
            push(junction(face[0] + own, face[2] + own, face[2] + other));
        }
    }

    hull
}
