//! Borrowed views over raw detector output.
//!
//! `PredictionView` wraps a flat `f32` buffer laid out row-major as
//! `(grid_height, grid_width, num_anchors, depth)`, where `depth` is
//! `5 + num_classes`. Construction checks that the buffer length matches the
//! declared dimensions; whether those dimensions match a detector head is
//! checked later by the decoder.

use crate::util::{DetSiftError, DetSiftResult, Stage};

/// Borrowed 4-D prediction tensor.
#[derive(Copy, Clone, Debug)]
pub struct PredictionView<'a> {
    data: &'a [f32],
    dims: [usize; 4],
}

impl<'a> PredictionView<'a> {
    /// Creates a view over `data` with dimensions
    /// `[grid_height, grid_width, num_anchors, depth]`.
    pub fn new(data: &'a [f32], dims: [usize; 4]) -> DetSiftResult<Self> {
        const AXES: [&str; 4] = ["grid_height", "grid_width", "num_anchors", "depth"];
        for (&name, &dim) in AXES.iter().zip(dims.iter()) {
            if dim == 0 {
                return Err(DetSiftError::InvalidParameter {
                    stage: Stage::Tensor,
                    name,
                    value: 0.0,
                    reason: "tensor dimensions must be non-zero",
                });
            }
        }
        let needed = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(DetSiftError::ShapeMismatch {
                stage: Stage::Tensor,
                what: "buffer length",
                expected: usize::MAX,
                got: data.len(),
            })?;
        if data.len() != needed {
            return Err(DetSiftError::ShapeMismatch {
                stage: Stage::Tensor,
                what: "buffer length",
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self { data, dims })
    }

    /// Returns the dimensions `[grid_height, grid_width, num_anchors, depth]`.
    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    pub fn grid_height(&self) -> usize {
        self.dims[0]
    }

    pub fn grid_width(&self) -> usize {
        self.dims[1]
    }

    pub fn num_anchors(&self) -> usize {
        self.dims[2]
    }

    /// Values per anchor: 5 box/objectness values plus class scores.
    pub fn depth(&self) -> usize {
        self.dims[3]
    }

    /// Number of (cell, anchor) pairs.
    pub fn num_candidates(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the `depth`-long entry for one anchor of one cell.
    pub fn entry(&self, row: usize, col: usize, anchor: usize) -> Option<&'a [f32]> {
        if row >= self.grid_height() || col >= self.grid_width() || anchor >= self.num_anchors()
        {
            return None;
        }
        let flat = (row * self.grid_width() + col) * self.num_anchors() + anchor;
        self.entry_at(flat)
    }

    /// Returns the entry at a flattened candidate index.
    pub fn entry_at(&self, index: usize) -> Option<&'a [f32]> {
        let start = index.checked_mul(self.depth())?;
        let end = start.checked_add(self.depth())?;
        self.data.get(start..end)
    }

    /// Splits a flattened candidate index into `(row, col, anchor)`.
    pub fn unflatten(&self, index: usize) -> (usize, usize, usize) {
        let anchor = index % self.num_anchors();
        let cell = index / self.num_anchors();
        (cell / self.grid_width(), cell % self.grid_width(), anchor)
    }
}
