//! Greedy non-maximum suppression over scored boxes.
//!
//! Boxes are visited in descending score order (stable, so ties keep input
//! order). Each unsuppressed box is kept and suppresses every later box whose
//! IoU with it reaches the threshold. Selection stops at `max_boxes`. The
//! output order is the selection order, which is what callers must rely on;
//! the result is not merely a set.

use crate::filter::ScoredBox;
use crate::geometry::iou;
use crate::trace::{stage_count, stage_span};
use crate::util::error::check_unit_interval;
use crate::util::{DetSiftResult, Stage};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

mod order;

/// Which boxes are allowed to suppress each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NmsMode {
    /// Any kept box suppresses overlapping boxes of every class.
    #[default]
    ClassAgnostic,
    /// Only boxes with the same `class_index` suppress each other.
    ///
    /// Equivalent to running class-agnostic suppression per class and
    /// merging the survivors by the same stable score order.
    PerClass,
}

/// Greedy IoU-based suppressor.
#[derive(Clone, Copy, Debug)]
pub struct NonMaxSuppressor {
    iou_threshold: f32,
    max_boxes: usize,
    mode: NmsMode,
    parallel: bool,
}

impl NonMaxSuppressor {
    /// Creates a suppressor. `iou_threshold` must lie in `[0, 1]`;
    /// `max_boxes == 0` is valid and yields empty output.
    pub fn new(iou_threshold: f32, max_boxes: usize, mode: NmsMode) -> DetSiftResult<Self> {
        check_unit_interval(Stage::Suppress, "iou_threshold", iou_threshold)?;
        Ok(Self {
            iou_threshold,
            max_boxes,
            mode,
            parallel: false,
        })
    }

    /// Evaluates the overlaps of each round in parallel when the `rayon`
    /// feature is enabled. Output is unchanged.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn max_boxes(&self) -> usize {
        self.max_boxes
    }

    pub fn mode(&self) -> NmsMode {
        self.mode
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Returns the kept boxes in selection order.
    pub fn suppress(&self, boxes: &[ScoredBox]) -> Vec<ScoredBox> {
        self.suppress_indices(boxes)
            .into_iter()
            .map(|idx| boxes[idx])
            .collect()
    }

    /// Returns indices into `boxes` of the kept boxes, in selection order.
    pub fn suppress_indices(&self, boxes: &[ScoredBox]) -> Vec<usize> {
        if self.max_boxes == 0 || boxes.is_empty() {
            return Vec::new();
        }
        let _span = stage_span!(
            Stage::Suppress,
            "nms",
            boxes = boxes.len(),
            max_boxes = self.max_boxes
        )
        .entered();

        let order = order::sort_indices_desc(boxes);
        let mut suppressed = vec![false; boxes.len()];
        let mut kept = Vec::with_capacity(self.max_boxes.min(boxes.len()));

        for (pos, &current) in order.iter().enumerate() {
            if suppressed[current] {
                continue;
            }
            kept.push(current);
            if kept.len() == self.max_boxes {
                break;
            }
            self.mark_overlaps(boxes, current, &order[pos + 1..], &mut suppressed);
        }

        stage_count!(Stage::Suppress, kept = kept.len());
        kept
    }

    fn overlaps(&self, a: &ScoredBox, b: &ScoredBox) -> bool {
        if self.mode == NmsMode::PerClass && a.class_index != b.class_index {
            return false;
        }
        iou(&a.bbox, &b.bbox) >= self.iou_threshold
    }

    fn mark_overlaps(
        &self,
        boxes: &[ScoredBox],
        current: usize,
        rest: &[usize],
        suppressed: &mut [bool],
    ) {
        let kept_box = &boxes[current];

        #[cfg(feature = "rayon")]
        if self.parallel {
            let flags: &[bool] = suppressed;
            let hits: Vec<usize> = rest
                .par_iter()
                .copied()
                .filter(|&j| !flags[j] && self.overlaps(kept_box, &boxes[j]))
                .collect();
            for j in hits {
                suppressed[j] = true;
            }
            return;
        }

        for &j in rest {
            if !suppressed[j] && self.overlaps(kept_box, &boxes[j]) {
                suppressed[j] = true;
            }
        }
    }
}

/// Class-agnostic suppression with a one-off suppressor.
pub fn non_max_suppression(
    boxes: &[ScoredBox],
    iou_threshold: f32,
    max_boxes: usize,
) -> DetSiftResult<Vec<ScoredBox>> {
    let nms = NonMaxSuppressor::new(iou_threshold, max_boxes, NmsMode::ClassAgnostic)?;
    Ok(nms.suppress(boxes))
}

#[cfg(test)]
mod tests {
    use super::{non_max_suppression, NmsMode, NonMaxSuppressor};
    use crate::filter::ScoredBox;
    use crate::geometry::BBox;

    fn scored(score: f32, bbox: BBox, class_index: usize) -> ScoredBox {
        ScoredBox {
            score,
            bbox,
            class_index,
        }
    }

    #[test]
    fn identical_boxes_keep_highest() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let kept = non_max_suppression(&[scored(0.8, b, 0), scored(0.9, b, 0)], 0.5, 10).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn equal_scores_resolve_by_input_order() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let nms = NonMaxSuppressor::new(0.5, 10, NmsMode::ClassAgnostic).unwrap();
        let kept = nms.suppress_indices(&[scored(0.7, b, 0), scored(0.7, b, 1)]);
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn stops_at_max_boxes() {
        let boxes: Vec<_> = (0..5)
            .map(|i| {
                let x = i as f32 * 20.0;
                scored(0.5 + i as f32 * 0.1, BBox::new(x, 0.0, x + 10.0, 10.0), 0)
            })
            .collect();
        let kept = non_max_suppression(&boxes, 0.5, 2).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].bbox.x1, 80.0);
        assert_eq!(kept[1].bbox.x1, 60.0);
        assert!(non_max_suppression(&boxes, 0.5, 0).unwrap().is_empty());
    }

    #[test]
    fn per_class_mode_spares_other_classes() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let boxes = [scored(0.9, b, 0), scored(0.8, b, 1), scored(0.7, b, 0)];
        let agnostic = NonMaxSuppressor::new(0.5, 10, NmsMode::ClassAgnostic).unwrap();
        let per_class = NonMaxSuppressor::new(0.5, 10, NmsMode::PerClass).unwrap();
        assert_eq!(agnostic.suppress_indices(&boxes), vec![0]);
        assert_eq!(per_class.suppress_indices(&boxes), vec![0, 1]);
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        assert!(NonMaxSuppressor::new(1.01, 1, NmsMode::ClassAgnostic).is_err());
        assert!(NonMaxSuppressor::new(f32::NAN, 1, NmsMode::ClassAgnostic).is_err());
    }
}
