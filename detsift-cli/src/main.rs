use clap::Parser;
use detsift::{
    Anchor, AnchorDecoder, BoxDecoder, DetSiftResult, DetectionSet, EvalConfig, Evaluator,
    HeadLayout, NmsMode, PredictionView, ScoredBox, ThresholdMode,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "detsift CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NmsModeConfig {
    ClassAgnostic,
    PerClass,
}

impl From<NmsModeConfig> for NmsMode {
    fn from(value: NmsModeConfig) -> Self {
        match value {
            NmsModeConfig::ClassAgnostic => NmsMode::ClassAgnostic,
            NmsModeConfig::PerClass => NmsMode::PerClass,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ThresholdModeConfig {
    Strict,
    Relaxed,
}

impl From<ThresholdModeConfig> for ThresholdMode {
    fn from(value: ThresholdModeConfig) -> Self {
        match value {
            ThresholdModeConfig::Strict => ThresholdMode::Strict,
            ThresholdModeConfig::Relaxed => ThresholdMode::Relaxed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeadConfigJson {
    grid_height: usize,
    grid_width: usize,
    num_anchors: usize,
    num_classes: usize,
    #[serde(default)]
    anchors: Option<Vec<[f32; 2]>>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
struct EvalConfigJson {
    score_threshold: f32,
    iou_threshold: f32,
    max_boxes: i64,
    image_width: f32,
    image_height: f32,
    coord_width: f32,
    coord_height: f32,
    threshold_mode: ThresholdModeConfig,
    nms_mode: NmsModeConfig,
    parallel: bool,
}

impl Default for EvalConfigJson {
    fn default() -> Self {
        let cfg = EvalConfig::default();
        Self {
            score_threshold: cfg.score_threshold,
            iou_threshold: cfg.iou_threshold,
            max_boxes: cfg.max_boxes as i64,
            image_width: cfg.image_width,
            image_height: cfg.image_height,
            coord_width: cfg.coord_width,
            coord_height: cfg.coord_height,
            threshold_mode: ThresholdModeConfig::Strict,
            nms_mode: NmsModeConfig::ClassAgnostic,
            parallel: cfg.parallel,
        }
    }
}

impl From<EvalConfigJson> for EvalConfig {
    fn from(value: EvalConfigJson) -> Self {
        Self {
            score_threshold: value.score_threshold,
            iou_threshold: value.iou_threshold,
            // A non-positive cap means "no detections", not an error.
            max_boxes: usize::try_from(value.max_boxes).unwrap_or(0),
            image_width: value.image_width,
            image_height: value.image_height,
            coord_width: value.coord_width,
            coord_height: value.coord_height,
            threshold_mode: value.threshold_mode.into(),
            nms_mode: value.nms_mode.into(),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Config {
    predictions_path: String,
    #[serde(default)]
    output_path: Option<String>,
    head: HeadConfigJson,
    #[serde(default)]
    eval: EvalConfigJson,
    #[serde(default)]
    class_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Predictions {
    dims: [usize; 4],
    data: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    class_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
}

impl DetectionRecord {
    fn new(det: &ScoredBox, class_names: &[String]) -> Self {
        Self {
            score: det.score,
            x1: det.bbox.x1,
            y1: det.bbox.y1,
            x2: det.bbox.x2,
            y2: det.bbox.y2,
            class_index: det.class_index,
            class_name: class_names.get(det.class_index).cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    count: usize,
    detections: Vec<DetectionRecord>,
}

impl Config {
    /// Checks cross-field constraints and builds the head layout.
    fn layout(&self) -> Result<HeadLayout, Box<dyn Error>> {
        if self.predictions_path.is_empty() {
            return Err("predictions_path must be set in the config".into());
        }
        let head = &self.head;
        if !self.class_names.is_empty() && self.class_names.len() != head.num_classes {
            return Err(format!(
                "class_names has {} entries but num_classes is {}",
                self.class_names.len(),
                head.num_classes
            )
            .into());
        }
        Ok(HeadLayout::new(
            head.grid_height,
            head.grid_width,
            head.num_anchors,
            head.num_classes,
        )?)
    }
}

/// Evaluator for either decoding scheme, chosen by `head.anchors`.
enum Pipeline {
    Direct(Evaluator<BoxDecoder>),
    Anchored(Evaluator<AnchorDecoder>),
}

impl Pipeline {
    fn from_config(config: &Config) -> Result<Self, Box<dyn Error>> {
        let layout = config.layout()?;
        let eval_cfg = EvalConfig::from(config.eval);
        let pipeline = match &config.head.anchors {
            Some(anchors) => {
                let anchors = anchors.iter().map(|&[w, h]| Anchor::new(w, h)).collect();
                let decoder = AnchorDecoder::new(layout, anchors)?;
                Pipeline::Anchored(Evaluator::new(decoder, eval_cfg)?)
            }
            None => Pipeline::Direct(Evaluator::new(BoxDecoder::new(layout), eval_cfg)?),
        };
        Ok(pipeline)
    }

    fn config(&self) -> &EvalConfig {
        match self {
            Pipeline::Direct(evaluator) => evaluator.config(),
            Pipeline::Anchored(evaluator) => evaluator.config(),
        }
    }

    fn evaluate(&self, view: PredictionView<'_>) -> DetSiftResult<DetectionSet> {
        match self {
            Pipeline::Direct(evaluator) => evaluator.evaluate(view),
            Pipeline::Anchored(evaluator) => evaluator.evaluate(view),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("detsift=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let pipeline = Pipeline::from_config(&config)?;

    let predictions_text = fs::read_to_string(&config.predictions_path)?;
    let predictions: Predictions = serde_json::from_str(&predictions_text)?;
    let view = PredictionView::new(&predictions.data, predictions.dims)?;

    let detections = pipeline.evaluate(view)?;
    tracing::info!(
        candidates = view.num_candidates(),
        detections = detections.len(),
        max_boxes = pipeline.config().max_boxes,
        "evaluation finished"
    );

    let records: Vec<DetectionRecord> = detections
        .iter()
        .map(|det| DetectionRecord::new(det, &config.class_names))
        .collect();
    let output = Output {
        count: records.len(),
        detections: records,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
