//! Deterministic score ordering for suppression.

use crate::filter::ScoredBox;
use std::cmp::Ordering;

/// Returns indices of `boxes` sorted by descending score.
///
/// The sort is stable, so equal scores keep their input order; `-0.0` and
/// `0.0` are equal. NaN scores rank below every number.
pub(crate) fn sort_indices_desc(boxes: &[ScoredBox]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| score_desc(boxes[a].score, boxes[b].score));
    order
}

fn score_desc(a: f32, b: f32) -> Ordering {
    a.is_nan()
        .cmp(&b.is_nan())
        .then_with(|| b.partial_cmp(&a).unwrap_or(Ordering::Equal))
}
