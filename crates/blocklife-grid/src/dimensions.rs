//! Validated grid bounds.

use blocklife_types::Position;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Largest accepted width or height. Bounds memory for a single grid.
pub const MAX_GRID_DIMENSION: u32 = 1000;

/// Width and height of a grid, each in `1..=MAX_GRID_DIMENSION`.
///
/// Valid cells are `0 <= x < width` and `0 <= y < height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    width: u32,
    height: u32,
}

impl GridDimensions {
    /// Validate and build grid dimensions. Oversized or empty grids are
    /// rejected, never clamped.
    pub const fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 || width > MAX_GRID_DIMENSION || height > MAX_GRID_DIMENSION
        {
            return Err(GridError::InvalidDimensions {
                width,
                height,
                max: MAX_GRID_DIMENSION,
            });
        }
        Ok(Self { width, height })
    }

    /// Number of columns.
    pub const fn width(self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(self) -> u32 {
        self.height
    }

    /// Whether `position` is a cell of this grid.
    pub fn contains(self, position: Position) -> bool {
        let x_ok = u32::try_from(position.x).is_ok_and(|x| x < self.width);
        let y_ok = u32::try_from(position.y).is_ok_and(|y| y < self.height);
        x_ok && y_ok
    }

    /// Return `OutOfBounds` unless `position` is a cell of this grid.
    pub fn check(self, position: Position) -> Result<(), GridError> {
        if self.contains(position) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }
}
