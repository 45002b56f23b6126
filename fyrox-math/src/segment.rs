use nalgebra::{
    allocator::Allocator, ClosedAddAssign, ClosedMulAssign, ClosedSubAssign, DefaultAllocator,
    Dim, OVector, RealField, Scalar, Storage, Vector, U3,
};
use num_traits::{One, Zero};

/// Line segment in three dimensions
pub type LineSegment3<T> = LineSegment<T, U3>;

/// Line segment in any number of dimensions
#[derive(Clone, Debug)]
pub struct LineSegment<T, D>
where
    DefaultAllocator: Allocator<D>,
    D: Dim,
    T: Scalar,
{
    /// One end of the line segment, the point returned when interpolating at t = 0.0
    pub start: OVector<T, D>,
    /// One end of the line segment, the point returned when interpolating at t = 1.0
    pub end: OVector<T, D>,
}

impl<T, D> LineSegment<T, D>
where
    T: Zero + One + Scalar + ClosedAddAssign + ClosedSubAssign + ClosedMulAssign + RealField,
    D: Dim,
    DefaultAllocator: Allocator<D>,
{
    /// Create a new line segment with the given points.
    pub fn new<S1, S2>(start: &Vector<T, D, S1>, end: &Vector<T, D, S2>) -> Self
    where
        S1: Storage<T, D>,
        S2: Storage<T, D>,
    {
        Self {
            start: start.clone_owned(),
            end: end.clone_owned(),
        }
    }
    /// The two end-points of the line segment are equal.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
    /// Create a point somewhere between `start` and `end`.
    /// When t = 0.0, `start` is returned.
    /// When t = 1.0, `end` is returned.
    pub fn interpolate(&self, t: T) -> OVector<T, D> {
        self.start.lerp(&self.end, t)
    }
    /// The vector from `start` to `end`
    pub fn vector(&self) -> OVector<T, D> {
        self.end.clone() - self.start.clone()
    }
    /// The distance between `start` and `end`
    pub fn length(&self) -> T {
        self.vector().norm()
    }
}
