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

//! All possible errors that can happen while producing shadow frustums. None of them reach the
//! caller of a light update: they stop cascade generation at the failing level and get logged.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// See module docs.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowError {
    /// Near and far planes of a frustum do not form a valid depth range.
    DegenerateDepthRange {
        /// Index of the cascade being initialized, if any.
        cascade: Option<usize>,
        /// Near plane distance.
        z_near: f32,
        /// Far plane distance.
        z_far: f32,
    },
    /// A direction required to orient a frustum has zero length.
    ZeroDirection,
    /// Asynchronous caster traversal was dropped before delivering its results.
    TraversalCanceled,
}

impl Display for ShadowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShadowError::DegenerateDepthRange {
                cascade,
                z_near,
                z_far,
            } => {
                write!(f, "Degenerate depth range [{z_near}; {z_far}]")?;
                if let Some(cascade) = cascade {
                    write!(f, " for cascade {cascade}")?;
                }
                Ok(())
            }
            ShadowError::ZeroDirection => {
                write!(f, "Frustum direction has zero length")
            }
            ShadowError::TraversalCanceled => {
                write!(f, "Static caster traversal was canceled")
            }
        }
    }
}

impl Error for ShadowError {}

impl ShadowError {
    /// Checks that `0 < z_near < z_far` and both values are finite.
    pub fn check_depth_range(
        cascade: Option<usize>,
        z_near: f32,
        z_far: f32,
    ) -> Result<(), ShadowError> {
        if z_near.is_finite() && z_far.is_finite() && z_near > 0.0 && z_near < z_far {
            Ok(())
        } else {
            Err(ShadowError::DegenerateDepthRange {
                cascade,
                z_near,
                z_far,
            })
        }
    }
}
