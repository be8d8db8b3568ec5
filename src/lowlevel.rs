//! Low-level building blocks for custom post-processing pipelines.
//!
//! Most users should prefer [`Evaluator`](crate::Evaluator); these items let
//! callers run individual stages, for example to suppress boxes coming from
//! a different decoder.

pub use crate::decode::BOX_FIELDS;
pub use crate::eval::rescale;
pub use crate::geometry::{intersection_area, union_area};
