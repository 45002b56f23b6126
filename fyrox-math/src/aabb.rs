use crate::Matrix4Ext;
use nalgebra::{Matrix4, Vector3};

/// Axis-aligned box used for caster bounds and cascade volumes.
///
/// The default box is inverted (`min > max`) so that merging anything into it yields that thing.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisAlignedBoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for AxisAlignedBoundingBox {
    #[inline]
    fn default() -> Self {
        Self {
            min: Vector3::repeat(f32::MAX),
            max: Vector3::repeat(-f32::MAX),
        }
    }
}

impl AxisAlignedBoundingBox {
    #[inline]
    pub fn from_radius(radius: f32) -> Self {
        Self {
            min: Vector3::repeat(-radius),
            max: Vector3::repeat(radius),
        }
    }

    #[inline]
    pub const fn from_min_max(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_center_half_extents(center: Vector3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Grows the box by `delta`, half of it on each side.
    #[inline]
    pub fn inflate(&mut self, delta: Vector3<f32>) {
        self.min -= delta.scale(0.5);
        self.max += delta.scale(0.5);
    }

    /// Extends the box so it encloses `other`.
    #[inline]
    pub fn add_box(&mut self, other: Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    #[inline]
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
        ]
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.max + self.min).scale(0.5)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min).scale(0.5)
    }

    /// Returns a copy of the box scaled around its center.
    #[inline]
    #[must_use]
    pub fn scaled(&self, scale: f32) -> Self {
        Self::from_center_half_extents(self.center(), self.half_extents().scale(scale))
    }

    /// Radius of the bounding sphere of the box.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.half_extents().norm()
    }

    /// Corner of the box that is the farthest along the given direction ("positive vertex").
    #[inline]
    pub fn support_point(&self, direction: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            if direction.x >= 0.0 { self.max.x } else { self.min.x },
            if direction.y >= 0.0 { self.max.y } else { self.min.y },
            if direction.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }

    #[inline]
    pub fn invalidate(&mut self) {
        *self = Default::default();
    }

    /// An inverted or non-finite box is invalid. A flat or point-like box is still valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|e| e.is_finite())
            && self.max.x >= self.min.x
            && self.max.y >= self.min.y
            && self.max.z >= self.min.z
    }

    #[inline]
    pub fn is_contains_point(&self, point: Vector3<f32>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    #[inline]
    pub fn is_intersects_aabb(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Transforms axis-aligned bounding box using given affine transformation matrix.
    ///
    /// # References
    ///
    /// Transforming Axis-Aligned Bounding Boxes by Jim Arvo, "Graphics Gems", Academic Press, 1990
    #[inline]
    #[must_use]
    pub fn transform(&self, m: &Matrix4<f32>) -> AxisAlignedBoundingBox {
        let basis = m.basis();

        let mut transformed = Self {
            min: m.position(),
            max: m.position(),
        };

        for i in 0..3 {
            for j in 0..3 {
                let a = basis[(i, j)] * self.min[j];
                let b = basis[(i, j)] * self.max[j];
                transformed.min[i] += a.min(b);
                transformed.max[i] += a.max(b);
            }
        }

        transformed
    }

    /// Splits the box into eight octants. Bit 0 of the index picks the upper x half, bit 1
    /// the upper z half and bit 2 the upper y half.
    #[inline]
    pub fn split(&self) -> [AxisAlignedBoundingBox; 8] {
        let center = self.center();
        std::array::from_fn(|octant| {
            let pick = |upper: bool, axis: usize| {
                if upper {
                    (center[axis], self.max[axis])
                } else {
                    (self.min[axis], center[axis])
                }
            };
            let (min_x, max_x) = pick(octant & 1 != 0, 0);
            let (min_z, max_z) = pick(octant & 2 != 0, 2);
            let (min_y, max_y) = pick(octant & 4 != 0, 1);
            AxisAlignedBoundingBox::from_min_max(
                Vector3::new(min_x, min_y, min_z),
                Vector3::new(max_x, max_y, max_z),
            )
        })
    }
}
