//! Decoding raw detector output into candidates.
//!
//! A [`Decoder`] turns every `(row, col, anchor)` entry of a
//! [`PredictionView`] into one [`Candidate`], in row-major order. Two
//! decoders are provided: [`BoxDecoder`] reads the first five values as
//! `(objectness, cx, cy, h, w)` directly, and [`AnchorDecoder`] applies the
//! YOLOv2 activations and anchor priors to raw logits.

use crate::geometry::{BBox, CenterBox};
use crate::tensor::PredictionView;
use crate::trace::{stage_count, stage_span};
use crate::util::{DetSiftError, DetSiftResult, Stage};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

mod anchors;

pub use anchors::{Anchor, AnchorDecoder};

/// Number of leading per-anchor values before the class scores.
pub const BOX_FIELDS: usize = 5;

/// One predicted box for a single (cell, anchor) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Box in corner form, in the decoder's coordinate space.
    pub bbox: BBox,
    /// Confidence that the anchor contains any object.
    pub objectness: f32,
    /// Per-class probabilities, `num_classes` long.
    pub class_probs: Vec<f32>,
}

impl Candidate {
    /// Builds a candidate from a center-form box.
    pub fn new(center: CenterBox, objectness: f32, class_probs: Vec<f32>) -> Self {
        Self {
            bbox: center.to_corners(),
            objectness,
            class_probs,
        }
    }
}

/// Fixed head configuration: output grid, anchors per cell and classes per
/// anchor.
///
/// The grid extent is part of the model, so it is fixed here and every
/// tensor handed to a decoder must match it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadLayout {
    grid_height: usize,
    grid_width: usize,
    num_anchors: usize,
    num_classes: usize,
}

impl HeadLayout {
    /// Creates a layout; every count must be at least 1.
    pub fn new(
        grid_height: usize,
        grid_width: usize,
        num_anchors: usize,
        num_classes: usize,
    ) -> DetSiftResult<Self> {
        let counts = [
            ("grid_height", grid_height),
            ("grid_width", grid_width),
            ("num_anchors", num_anchors),
            ("num_classes", num_classes),
        ];
        for (name, count) in counts {
            if count == 0 {
                return Err(DetSiftError::InvalidParameter {
                    stage: Stage::Decode,
                    name,
                    value: 0.0,
                    reason: "must be at least 1",
                });
            }
        }
        Ok(Self {
            grid_height,
            grid_width,
            num_anchors,
            num_classes,
        })
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Expected trailing dimension, `5 + num_classes`.
    pub fn depth(&self) -> usize {
        BOX_FIELDS + self.num_classes
    }

    /// Tensor dimensions `[grid_height, grid_width, num_anchors, depth]`.
    pub fn dims(&self) -> [usize; 4] {
        [
            self.grid_height,
            self.grid_width,
            self.num_anchors,
            self.depth(),
        ]
    }

    /// Verifies that `view` was produced by a head with this layout.
    pub fn check(&self, view: &PredictionView<'_>) -> DetSiftResult<()> {
        const AXES: [&str; 4] = ["grid height", "grid width", "anchor axis", "trailing axis"];
        for ((&what, expected), got) in AXES.iter().zip(self.dims()).zip(view.dims()) {
            if expected != got {
                return Err(DetSiftError::ShapeMismatch {
                    stage: Stage::Decode,
                    what,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}

/// Converts prediction entries into candidates.
pub trait Decoder {
    /// Head layout this decoder accepts.
    fn layout(&self) -> HeadLayout;

    /// Decodes one `depth`-long entry located at `(row, col, anchor)`.
    ///
    /// `entry` always has `layout().depth()` values and the position lies
    /// within `layout()`'s grid.
    fn decode_entry(&self, entry: &[f32], row: usize, col: usize, anchor: usize) -> Candidate;

    /// Decodes every entry of `view`, one candidate per (cell, anchor).
    fn decode(&self, view: PredictionView<'_>) -> DetSiftResult<Vec<Candidate>> {
        self.layout().check(&view)?;
        let _span =
            stage_span!(Stage::Decode, "decode", candidates = view.num_candidates()).entered();

        let mut out = Vec::with_capacity(view.num_candidates());
        for (index, entry) in view.as_slice().chunks_exact(view.depth()).enumerate() {
            let (row, col, anchor) = view.unflatten(index);
            out.push(self.decode_entry(entry, row, col, anchor));
        }

        stage_count!(Stage::Decode, decoded = out.len());
        Ok(out)
    }

    /// Parallel [`Decoder::decode`]; produces the identical sequence.
    #[cfg(feature = "rayon")]
    fn decode_par(&self, view: PredictionView<'_>) -> DetSiftResult<Vec<Candidate>>
    where
        Self: Sync,
    {
        self.layout().check(&view)?;
        let _span =
            stage_span!(Stage::Decode, "decode_par", candidates = view.num_candidates()).entered();

        let out: Vec<Candidate> = view
            .as_slice()
            .par_chunks_exact(view.depth())
            .enumerate()
            .map(|(index, entry)| {
                let (row, col, anchor) = view.unflatten(index);
                self.decode_entry(entry, row, col, anchor)
            })
            .collect();

        stage_count!(Stage::Decode, decoded = out.len());
        Ok(out)
    }
}

/// Decoder for heads that already emit probabilities and box geometry.
///
/// Reads `(objectness, cx, cy, h, w)` followed by `num_classes` class
/// probabilities, taken as-is, and converts the box to corner form.
#[derive(Clone, Copy, Debug)]
pub struct BoxDecoder {
    layout: HeadLayout,
}

impl BoxDecoder {
    pub fn new(layout: HeadLayout) -> Self {
        Self { layout }
    }
}

impl Decoder for BoxDecoder {
    fn layout(&self) -> HeadLayout {
        self.layout
    }

    fn decode_entry(&self, entry: &[f32], _row: usize, _col: usize, _anchor: usize) -> Candidate {
        let center = CenterBox::new(entry[1], entry[2], entry[3], entry[4]);
        Candidate::new(center, entry[0], entry[BOX_FIELDS..].to_vec())
    }
}
