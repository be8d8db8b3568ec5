//! detsift turns a dense grid of detector predictions into a small set of
//! confident, non-overlapping bounding boxes.
//!
//! The pipeline decodes a raw `(grid_height, grid_width, num_anchors,
//! 5 + num_classes)` tensor into candidates, keeps those whose best class
//! score clears a threshold, rescales them to the target image and applies
//! greedy IoU non-maximum suppression. Decoding, scoring and suppression
//! rounds can run in parallel via the `rayon` feature.

pub mod decode;
pub mod eval;
pub mod filter;
pub mod geometry;
pub mod lowlevel;
pub mod nms;
pub mod tensor;
mod trace;
pub mod util;

pub use decode::{Anchor, AnchorDecoder, BoxDecoder, Candidate, Decoder, HeadLayout};
pub use eval::{DetectionSet, EvalConfig, Evaluator};
pub use filter::{ScoreFilter, ScoredBox, ThresholdMode};
pub use geometry::{iou, BBox, CenterBox};
pub use nms::{non_max_suppression, NmsMode, NonMaxSuppressor};
pub use tensor::PredictionView;
pub use util::{DetSiftError, DetSiftResult, Stage};
