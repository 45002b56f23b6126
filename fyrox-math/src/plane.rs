use nalgebra::Vector3;

/// Plane in Hessian normal form: `normal · p + d = 0`. Points with a positive signed distance are
/// "in front" of the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Default for Plane {
    #[inline]
    fn default() -> Self {
        Plane {
            normal: Vector3::new(0.0, 1.0, 0.0),
            d: 0.0,
        }
    }
}

impl Plane {
    /// Creates plane from a point and normal vector at that point.
    /// May fail if normal is degenerated vector.
    #[inline]
    pub fn from_normal_and_point(normal: &Vector3<f32>, point: &Vector3<f32>) -> Option<Self> {
        normal.try_normalize(f32::EPSILON).map(|normalized_normal| Self {
            normal: normalized_normal,
            d: -point.dot(&normalized_normal),
        })
    }

    /// Creates plane using coefficients of plane equation Ax + By + Cz + D = 0
    /// May fail if length of normal vector is zero (normal is degenerated vector).
    #[inline]
    pub fn from_abcd(a: f32, b: f32, c: f32, d: f32) -> Option<Self> {
        let normal = Vector3::new(a, b, c);
        let len = normal.norm();
        if len == 0.0 {
            None
        } else {
            let k = 1.0 / len;
            Some(Self {
                normal: normal.scale(k),
                d: d * k,
            })
        }
    }

    /// Creates a plane passing through three points. The normal is `(b - a) × (c - a)`, so the
    /// winding of the points decides which side is the front. Fails for collinear points.
    #[inline]
    pub fn from_three_points(a: &Vector3<f32>, b: &Vector3<f32>, c: &Vector3<f32>) -> Option<Self> {
        Self::from_normal_and_point(&(b - a).cross(&(c - a)), a)
    }

    /// Returns the same plane facing the opposite direction.
    #[inline]
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// Returns the plane moved along `offset`.
    #[inline]
    #[must_use]
    pub fn translated(&self, offset: &Vector3<f32>) -> Self {
        Self {
            normal: self.normal,
            d: self.d - self.normal.dot(offset),
        }
    }

    /// Flips the plane if needed so that `point` lies in front of it.
    #[inline]
    #[must_use]
    pub fn facing(&self, point: &Vector3<f32>) -> Self {
        if self.dot(point) < 0.0 {
            self.flipped()
        } else {
            *self
        }
    }

    /// Signed distance from the plane to the point.
    #[inline]
    pub fn dot(&self, point: &Vector3<f32>) -> f32 {
        self.normal.dot(point) + self.d
    }

    #[inline]
    pub fn distance(&self, point: &Vector3<f32>) -> f32 {
        self.dot(point).abs()
    }

    /// Point where three planes meet.
    ///
    /// # References
    ///
    /// http://geomalgorithms.com/a05-_intersect-1.html
    pub fn intersection_point(&self, b: &Plane, c: &Plane) -> Vector3<f32> {
        let f = -1.0 / self.normal.dot(&b.normal.cross(&c.normal));

        let v1 = b.normal.cross(&c.normal).scale(self.d);
        let v2 = c.normal.cross(&self.normal).scale(b.d);
        let v3 = self.normal.cross(&b.normal).scale(c.d);

        (v1 + v2 + v3).scale(f)
    }
}
