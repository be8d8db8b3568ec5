//! End-to-end evaluation: decode, filter, rescale, suppress.

use crate::decode::{BoxDecoder, Candidate, Decoder};
use crate::filter::{ScoreFilter, ScoredBox, ThresholdMode};
use crate::nms::{NmsMode, NonMaxSuppressor};
use crate::tensor::PredictionView;
use crate::trace::{stage_count, stage_span};
use crate::util::error::check_positive;
use crate::util::{DetSiftResult, Stage};

/// Final detections in suppression order (descending score).
pub type DetectionSet = Vec<ScoredBox>;

/// Configuration for [`Evaluator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalConfig {
    /// Minimum best-class score for a candidate to survive filtering.
    pub score_threshold: f32,
    /// IoU at or above which a lower-scoring box is suppressed.
    pub iou_threshold: f32,
    /// Maximum number of detections returned.
    pub max_boxes: usize,
    /// Target image width that detections are rescaled to.
    pub image_width: f32,
    /// Target image height that detections are rescaled to.
    pub image_height: f32,
    /// Width of the decoder's coordinate space (1.0 for normalized boxes).
    pub coord_width: f32,
    /// Height of the decoder's coordinate space (1.0 for normalized boxes).
    pub coord_height: f32,
    pub threshold_mode: ThresholdMode,
    pub nms_mode: NmsMode,
    /// Run decoding, scoring and suppression rounds on the rayon pool.
    /// Ignored without the `rayon` feature.
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            iou_threshold: 0.5,
            max_boxes: 10,
            image_width: 1280.0,
            image_height: 720.0,
            coord_width: 1.0,
            coord_height: 1.0,
            threshold_mode: ThresholdMode::Strict,
            nms_mode: NmsMode::ClassAgnostic,
            parallel: false,
        }
    }
}

impl EvalConfig {
    /// Checks every parameter, reporting the first violation.
    pub fn validate(&self) -> DetSiftResult<()> {
        self.score_filter()?;
        self.suppressor()?;
        self.scale_factors()?;
        Ok(())
    }

    /// Per-axis factors mapping decoder coordinates to image coordinates.
    pub fn scale_factors(&self) -> DetSiftResult<(f32, f32)> {
        check_positive(Stage::Evaluate, "image_width", self.image_width)?;
        check_positive(Stage::Evaluate, "image_height", self.image_height)?;
        check_positive(Stage::Evaluate, "coord_width", self.coord_width)?;
        check_positive(Stage::Evaluate, "coord_height", self.coord_height)?;
        Ok((
            self.image_width / self.coord_width,
            self.image_height / self.coord_height,
        ))
    }

    fn score_filter(&self) -> DetSiftResult<ScoreFilter> {
        ScoreFilter::new(self.score_threshold, self.threshold_mode)
    }

    fn suppressor(&self) -> DetSiftResult<NonMaxSuppressor> {
        Ok(
            NonMaxSuppressor::new(self.iou_threshold, self.max_boxes, self.nms_mode)?
                .with_parallel(self.parallel),
        )
    }
}

/// Rescales boxes in place; scores and classes are untouched.
pub fn rescale(boxes: &mut [ScoredBox], sx: f32, sy: f32) {
    for b in boxes.iter_mut() {
        b.bbox = b.bbox.scale(sx, sy);
    }
}

/// Composes a decoder with score filtering, rescaling and suppression.
pub struct Evaluator<D = BoxDecoder> {
    decoder: D,
    cfg: EvalConfig,
    filter: ScoreFilter,
    nms: NonMaxSuppressor,
    scale: (f32, f32),
}

impl<D: Decoder + Sync> Evaluator<D> {
    /// Creates an evaluator, validating `cfg` up front.
    pub fn new(decoder: D, cfg: EvalConfig) -> DetSiftResult<Self> {
        let filter = cfg.score_filter()?;
        let nms = cfg.suppressor()?;
        let scale = cfg.scale_factors()?;
        Ok(Self {
            decoder,
            cfg,
            filter,
            nms,
            scale,
        })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.cfg
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Runs the full pipeline over one prediction tensor.
    pub fn evaluate(&self, view: PredictionView<'_>) -> DetSiftResult<DetectionSet> {
        let _span =
            stage_span!(Stage::Evaluate, "evaluate", candidates = view.num_candidates()).entered();

        #[cfg(feature = "rayon")]
        let candidates = if self.cfg.parallel {
            self.decoder.decode_par(view)?
        } else {
            self.decoder.decode(view)?
        };
        #[cfg(not(feature = "rayon"))]
        let candidates = self.decoder.decode(view)?;

        Ok(self.evaluate_candidates(&candidates))
    }

    /// Runs filter, rescale and suppression over decoded candidates.
    pub fn evaluate_candidates(&self, candidates: &[Candidate]) -> DetectionSet {
        #[cfg(feature = "rayon")]
        let mut scored = if self.cfg.parallel {
            self.filter.filter_par(candidates)
        } else {
            self.filter.filter(candidates)
        };
        #[cfg(not(feature = "rayon"))]
        let mut scored = self.filter.filter(candidates);

        let (sx, sy) = self.scale;
        rescale(&mut scored, sx, sy);

        let detections = self.nms.suppress(&scored);
        stage_count!(
            Stage::Evaluate,
            scored = scored.len(),
            detections = detections.len()
        );
        detections
    }
}
