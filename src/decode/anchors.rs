//! Anchor-relative decoding of raw YOLOv2-style logits.

use crate::decode::{Candidate, Decoder, HeadLayout, BOX_FIELDS};
use crate::geometry::CenterBox;
use crate::util::error::check_positive;
use crate::util::math::{sigmoid, softmax};
use crate::util::{DetSiftError, DetSiftResult, Stage};

/// Anchor prior size, in grid-cell units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub width: f32,
    pub height: f32,
}

impl Anchor {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Decoder for raw logits parameterized relative to anchor priors.
///
/// For an entry `(t_o, t_x, t_y, t_h, t_w, logits..)` at `(row, col)` on a
/// `grid_height x grid_width` grid fixed by the layout:
///
/// - objectness is `sigmoid(t_o)`;
/// - the center is `((sigmoid(t_x) + col) / grid_width, (sigmoid(t_y) + row) / grid_height)`;
/// - the size is `anchor * exp(t)` divided by the grid extent on each axis;
/// - class probabilities are `softmax(logits)`.
///
/// Boxes therefore come out in normalized `[0, 1]` image coordinates.
#[derive(Clone, Debug)]
pub struct AnchorDecoder {
    layout: HeadLayout,
    anchors: Vec<Anchor>,
}

impl AnchorDecoder {
    /// Creates a decoder; one anchor per `layout.num_anchors()`.
    pub fn new(layout: HeadLayout, anchors: Vec<Anchor>) -> DetSiftResult<Self> {
        if anchors.len() != layout.num_anchors() {
            return Err(DetSiftError::ShapeMismatch {
                stage: Stage::Decode,
                what: "anchor count",
                expected: layout.num_anchors(),
                got: anchors.len(),
            });
        }
        for anchor in &anchors {
            check_positive(Stage::Decode, "anchor.width", anchor.width)?;
            check_positive(Stage::Decode, "anchor.height", anchor.height)?;
        }
        Ok(Self { layout, anchors })
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }
}

impl Decoder for AnchorDecoder {
    fn layout(&self) -> HeadLayout {
        self.layout
    }

    fn decode_entry(&self, entry: &[f32], row: usize, col: usize, anchor: usize) -> Candidate {
        let grid_w = self.layout.grid_width() as f32;
        let grid_h = self.layout.grid_height() as f32;
        let prior = self.anchors[anchor];

        let center = CenterBox {
            cx: (sigmoid(entry[1]) + col as f32) / grid_w,
            cy: (sigmoid(entry[2]) + row as f32) / grid_h,
            h: prior.height * entry[3].exp() / grid_h,
            w: prior.width * entry[4].exp() / grid_w,
        };
        Candidate::new(center, sigmoid(entry[0]), softmax(&entry[BOX_FIELDS..]))
    }
}

#[cfg(test)]
mod tests {
    use super::{Anchor, AnchorDecoder};
    use crate::decode::{Decoder, HeadLayout};
    use crate::tensor::PredictionView;

    #[test]
    fn zero_logits_center_in_cell_with_anchor_size() {
        let layout = HeadLayout::new(2, 2, 1, 2).unwrap();
        let decoder = AnchorDecoder::new(layout, vec![Anchor::new(2.0, 1.0)]).unwrap();
        let data = [0.0f32; 2 * 2 * 7];
        let view = PredictionView::new(&data, [2, 2, 1, 7]).unwrap();
        let candidates = decoder.decode(view).unwrap();

        // Cell (row 1, col 0) is the third candidate.
        let c = &candidates[2];
        let center = c.bbox.to_center();
        assert!((center.cx - 0.25).abs() < 1e-6);
        assert!((center.cy - 0.75).abs() < 1e-6);
        assert!((center.w - 1.0).abs() < 1e-6);
        assert!((center.h - 0.5).abs() < 1e-6);
        assert!((c.objectness - 0.5).abs() < 1e-6);
        assert!((c.class_probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_wrong_anchor_count_and_bad_sizes() {
        let layout = HeadLayout::new(1, 1, 2, 1).unwrap();
        assert!(AnchorDecoder::new(layout, vec![Anchor::new(1.0, 1.0)]).is_err());
        assert!(
            AnchorDecoder::new(layout, vec![Anchor::new(1.0, 1.0), Anchor::new(0.0, 1.0)])
                .is_err()
        );
    }
}
