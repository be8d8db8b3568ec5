//! Python bindings for detsift.
//!
//! Exposes the evaluator and the standalone geometry/NMS helpers over numpy
//! arrays via PyO3.

use numpy::{PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray4, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use detsift::{
    Anchor, AnchorDecoder, BBox, BoxDecoder, DetSiftError, DetectionSet,
    EvalConfig as RustEvalConfig, Evaluator as RustEvaluator, HeadLayout, NmsMode,
    PredictionView, ScoredBox, ThresholdMode,
};

/// Convert a DetSiftError to a Python exception.
fn to_py_err(err: DetSiftError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Negative counts from Python mean "no detections".
fn clamp_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

/// A single detection: score, corner box and class index.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub score: f32,
    #[pyo3(get)]
    pub x1: f32,
    #[pyo3(get)]
    pub y1: f32,
    #[pyo3(get)]
    pub x2: f32,
    #[pyo3(get)]
    pub y2: f32,
    #[pyo3(get)]
    pub class_index: usize,
}

#[pymethods]
impl Detection {
    /// Box as an `(x1, y1, x2, y2)` tuple.
    #[getter]
    fn bbox(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(score={:.4}, bbox=({:.2}, {:.2}, {:.2}, {:.2}), class_index={})",
            self.score, self.x1, self.y1, self.x2, self.y2, self.class_index
        )
    }
}

impl From<ScoredBox> for Detection {
    fn from(d: ScoredBox) -> Self {
        Self {
            score: d.score,
            x1: d.bbox.x1,
            y1: d.bbox.y1,
            x2: d.bbox.x2,
            y2: d.bbox.y2,
            class_index: d.class_index,
        }
    }
}

/// Evaluation parameters.
#[pyclass]
#[derive(Clone)]
pub struct EvalConfig {
    inner: RustEvalConfig,
}

#[pymethods]
impl EvalConfig {
    /// Create a new EvalConfig.
    ///
    /// Args:
    ///     score_threshold: Minimum best-class score (default: 0.6)
    ///     iou_threshold: Suppression IoU threshold (default: 0.5)
    ///     max_boxes: Maximum detections; negative means none (default: 10)
    ///     image_width: Target image width (default: 1280.0)
    ///     image_height: Target image height (default: 720.0)
    ///     coord_width: Width of the decoder coordinate space (default: 1.0)
    ///     coord_height: Height of the decoder coordinate space (default: 1.0)
    ///     threshold_mode: "strict" or "relaxed" (default: "strict")
    ///     nms_mode: "class_agnostic" or "per_class" (default: "class_agnostic")
    ///     parallel: Enable parallel execution (default: False)
    #[new]
    #[pyo3(signature = (
        score_threshold = 0.6,
        iou_threshold = 0.5,
        max_boxes = 10,
        image_width = 1280.0,
        image_height = 720.0,
        coord_width = 1.0,
        coord_height = 1.0,
        threshold_mode = "strict",
        nms_mode = "class_agnostic",
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        score_threshold: f32,
        iou_threshold: f32,
        max_boxes: i64,
        image_width: f32,
        image_height: f32,
        coord_width: f32,
        coord_height: f32,
        threshold_mode: &str,
        nms_mode: &str,
        parallel: bool,
    ) -> PyResult<Self> {
        let threshold_mode = match threshold_mode.to_lowercase().as_str() {
            "strict" => ThresholdMode::Strict,
            "relaxed" => ThresholdMode::Relaxed,
            _ => {
                return Err(PyValueError::new_err(
                    "threshold_mode must be 'strict' or 'relaxed'",
                ))
            }
        };
        let nms_mode = match nms_mode.to_lowercase().as_str() {
            "class_agnostic" => NmsMode::ClassAgnostic,
            "per_class" => NmsMode::PerClass,
            _ => {
                return Err(PyValueError::new_err(
                    "nms_mode must be 'class_agnostic' or 'per_class'",
                ))
            }
        };
        let inner = RustEvalConfig {
            score_threshold,
            iou_threshold,
            max_boxes: clamp_count(max_boxes),
            image_width,
            image_height,
            coord_width,
            coord_height,
            threshold_mode,
            nms_mode,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "EvalConfig(score_threshold={}, iou_threshold={}, max_boxes={}, image=({}x{}), parallel={})",
            self.inner.score_threshold,
            self.inner.iou_threshold,
            self.inner.max_boxes,
            self.inner.image_width,
            self.inner.image_height,
            self.inner.parallel
        )
    }
}

enum Pipeline {
    Direct(RustEvaluator<BoxDecoder>),
    Anchored(RustEvaluator<AnchorDecoder>),
}

/// Detection post-processor over raw prediction tensors.
#[pyclass]
pub struct Evaluator {
    pipeline: Pipeline,
}

#[pymethods]
impl Evaluator {
    /// Create an evaluator.
    ///
    /// Args:
    ///     grid_height: Output grid rows; tensors must match
    ///     grid_width: Output grid columns; tensors must match
    ///     num_anchors: Anchors per grid cell
    ///     num_classes: Classes per anchor
    ///     anchors: Optional list of (width, height) anchor priors in grid
    ///         cells; when given, the tensor is decoded as raw logits
    ///     config: EvalConfig (default: EvalConfig())
    #[new]
    #[pyo3(signature = (grid_height, grid_width, num_anchors, num_classes, anchors = None, config = None))]
    fn new(
        grid_height: usize,
        grid_width: usize,
        num_anchors: usize,
        num_classes: usize,
        anchors: Option<Vec<(f32, f32)>>,
        config: Option<EvalConfig>,
    ) -> PyResult<Self> {
        let layout = HeadLayout::new(grid_height, grid_width, num_anchors, num_classes)
            .map_err(to_py_err)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let pipeline = match anchors {
            Some(anchors) => {
                let anchors = anchors
                    .into_iter()
                    .map(|(w, h)| Anchor::new(w, h))
                    .collect();
                let decoder = AnchorDecoder::new(layout, anchors).map_err(to_py_err)?;
                Pipeline::Anchored(RustEvaluator::new(decoder, cfg).map_err(to_py_err)?)
            }
            None => Pipeline::Direct(
                RustEvaluator::new(BoxDecoder::new(layout), cfg).map_err(to_py_err)?,
            ),
        };
        Ok(Self { pipeline })
    }

    /// Evaluate one prediction tensor.
    ///
    /// Args:
    ///     predictions: 4D float32 numpy array
    ///         (grid_height x grid_width x num_anchors x (5 + num_classes))
    ///
    /// Returns:
    ///     List of Detection objects, best first
    fn evaluate(&self, predictions: PyReadonlyArray4<'_, f32>) -> PyResult<Vec<Detection>> {
        let shape = predictions.shape();
        let dims = [shape[0], shape[1], shape[2], shape[3]];
        let data = predictions.as_slice()?;
        let view = PredictionView::new(data, dims).map_err(to_py_err)?;

        let detections: DetectionSet = match &self.pipeline {
            Pipeline::Direct(ev) => ev.evaluate(view),
            Pipeline::Anchored(ev) => ev.evaluate(view),
        }
        .map_err(to_py_err)?;
        Ok(detections.into_iter().map(Detection::from).collect())
    }

    fn __repr__(&self) -> String {
        let kind = match self.pipeline {
            Pipeline::Direct(_) => "direct",
            Pipeline::Anchored(_) => "anchored",
        };
        format!("Evaluator(decoder='{kind}')")
    }
}

/// Intersection over union of two (x1, y1, x2, y2) boxes.
#[pyfunction]
fn iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    detsift::iou(&BBox::from(a), &BBox::from(b))
}

/// Class-agnostic greedy non-maximum suppression.
///
/// Args:
///     boxes: Nx4 float32 numpy array of (x1, y1, x2, y2)
///     scores: N-length float32 numpy array
///     iou_threshold: Suppression threshold in [0, 1] (default: 0.5)
///     max_boxes: Maximum kept boxes; negative means none (default: 10)
///
/// Returns:
///     Indices of kept boxes, best first
#[pyfunction]
#[pyo3(signature = (boxes, scores, iou_threshold = 0.5, max_boxes = 10))]
fn non_max_suppression(
    boxes: PyReadonlyArray2<'_, f32>,
    scores: PyReadonlyArray1<'_, f32>,
    iou_threshold: f32,
    max_boxes: i64,
) -> PyResult<Vec<usize>> {
    let shape = boxes.shape();
    if shape[1] != 4 {
        return Err(PyValueError::new_err("boxes must have shape (N, 4)"));
    }
    let coords = boxes.as_slice()?;
    let scores = scores.as_slice()?;
    if scores.len() != shape[0] {
        return Err(PyValueError::new_err(
            "scores must have one entry per box",
        ));
    }

    let scored: Vec<ScoredBox> = coords
        .chunks_exact(4)
        .zip(scores.iter())
        .map(|(c, &score)| ScoredBox {
            score,
            bbox: BBox::new(c[0], c[1], c[2], c[3]),
            class_index: 0,
        })
        .collect();
    let nms = detsift::NonMaxSuppressor::new(
        iou_threshold,
        clamp_count(max_boxes),
        NmsMode::ClassAgnostic,
    )
    .map_err(to_py_err)?;
    Ok(nms.suppress_indices(&scored))
}

/// Python module for detsift.
#[pymodule]
fn _detsift(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<EvalConfig>()?;
    m.add_class::<Evaluator>()?;
    m.add_function(wrap_pyfunction!(iou, m)?)?;
    m.add_function(wrap_pyfunction!(non_max_suppression, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
