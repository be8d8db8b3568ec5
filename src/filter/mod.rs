//! Score thresholding of decoded candidates.
//!
//! Each candidate is scored per class as `objectness * class_probs[i]`; the
//! best class (first maximum) and its score are kept when the score clears
//! the threshold. Output preserves input order.

use crate::decode::Candidate;
use crate::geometry::BBox;
use crate::trace::{stage_count, stage_span};
use crate::util::error::check_unit_interval;
use crate::util::{DetSiftError, DetSiftResult, Stage};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A candidate that survived score filtering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    /// `objectness * class_probs[class_index]` of the source candidate.
    pub score: f32,
    /// Box in corner form.
    pub bbox: BBox,
    /// Index of the winning class.
    pub class_index: usize,
}

/// How strictly the score threshold is validated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Threshold must lie in `[0, 1]`.
    #[default]
    Strict,
    /// Any non-NaN threshold is accepted. Values below 0 keep every
    /// candidate with a finite score; values above 1 keep none.
    Relaxed,
}

/// Keeps candidates whose best class score reaches a threshold.
#[derive(Clone, Copy, Debug)]
pub struct ScoreFilter {
    threshold: f32,
}

impl ScoreFilter {
    pub fn new(threshold: f32, mode: ThresholdMode) -> DetSiftResult<Self> {
        match mode {
            ThresholdMode::Strict => {
                check_unit_interval(Stage::Filter, "score_threshold", threshold)?
            }
            ThresholdMode::Relaxed => {
                if threshold.is_nan() {
                    return Err(DetSiftError::InvalidParameter {
                        stage: Stage::Filter,
                        name: "score_threshold",
                        value: f64::NAN,
                        reason: "must not be NaN",
                    });
                }
            }
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Returns `(class_index, score)` of the highest-scoring class.
    ///
    /// Ties resolve to the lowest class index; NaN products never win.
    /// Returns `None` when the candidate has no classes or every product is
    /// NaN.
    pub fn best_class(candidate: &Candidate) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &prob) in candidate.class_probs.iter().enumerate() {
            let score = candidate.objectness * prob;
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best
    }

    /// Scores one candidate; `None` when it falls below the threshold.
    pub fn score(&self, candidate: &Candidate) -> Option<ScoredBox> {
        let (class_index, score) = Self::best_class(candidate)?;
        if score >= self.threshold {
            Some(ScoredBox {
                score,
                bbox: candidate.bbox,
                class_index,
            })
        } else {
            None
        }
    }

    /// Filters candidates, preserving input order.
    pub fn filter(&self, candidates: &[Candidate]) -> Vec<ScoredBox> {
        let _span =
            stage_span!(Stage::Filter, "score_filter", candidates = candidates.len()).entered();
        let kept: Vec<ScoredBox> = candidates.iter().filter_map(|c| self.score(c)).collect();
        stage_count!(Stage::Filter, kept = kept.len());
        kept
    }

    /// Parallel [`ScoreFilter::filter`]; produces the identical sequence.
    #[cfg(feature = "rayon")]
    pub fn filter_par(&self, candidates: &[Candidate]) -> Vec<ScoredBox> {
        let _span =
            stage_span!(Stage::Filter, "score_filter_par", candidates = candidates.len()).entered();
        let kept: Vec<ScoredBox> = candidates
            .par_iter()
            .filter_map(|c| self.score(c))
            .collect();
        stage_count!(Stage::Filter, kept = kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::{ScoreFilter, ThresholdMode};
    use crate::decode::Candidate;
    use crate::geometry::BBox;

    fn candidate(objectness: f32, probs: &[f32]) -> Candidate {
        Candidate {
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            objectness,
            class_probs: probs.to_vec(),
        }
    }

    #[test]
    fn best_class_prefers_first_maximum() {
        let c = candidate(0.5, &[0.2, 0.8, 0.8]);
        assert_eq!(ScoreFilter::best_class(&c), Some((1, 0.4)));
    }

    #[test]
    fn best_class_skips_nan() {
        let c = candidate(1.0, &[f32::NAN, 0.3]);
        assert_eq!(ScoreFilter::best_class(&c), Some((1, 0.3)));
        assert_eq!(ScoreFilter::best_class(&candidate(1.0, &[])), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let filter = ScoreFilter::new(0.5, ThresholdMode::Strict).unwrap();
        let kept = filter.filter(&[candidate(1.0, &[0.5]), candidate(1.0, &[0.49])]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.5);
    }

    #[test]
    fn strict_mode_rejects_out_of_range() {
        assert!(ScoreFilter::new(1.5, ThresholdMode::Strict).is_err());
        assert!(ScoreFilter::new(-0.1, ThresholdMode::Strict).is_err());
        assert!(ScoreFilter::new(1.5, ThresholdMode::Relaxed).is_ok());
        assert!(ScoreFilter::new(f32::NAN, ThresholdMode::Relaxed).is_err());
    }
}
