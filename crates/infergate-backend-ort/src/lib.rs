//! ONNX Runtime engine for `infergate-predictor`.

mod convert;
pub mod predictor;
pub mod reader;
mod session;
pub mod shape_range;

use anyhow::{Context, Result};
use infergate_predictor::{Engine, PredictorConfig};
use tracing::{debug, info};

pub use predictor::OrtPredictor;
pub use reader::OrtModelReader;
pub use shape_range::ShapeRangeRecorder;

pub struct OrtEngine;

impl OrtEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for OrtEngine {
    type Predictor = OrtPredictor;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn create_predictor(&self, config: &PredictorConfig) -> Result<OrtPredictor> {
        if config.params_file != config.model_file {
            debug!(
                params = %config.params_file.display(),
                "ONNX models carry their weights, params file unused"
            );
        }

        let session = session::builder_for(config)?
            .commit_from_file(&config.model_file)
            .with_context(|| format!("failed to load {}", config.model_file.display()))?;

        let recorder = config.collect_shape_range_info.as_ref().map(|path| {
            info!(path = %path.display(), "recording input shape ranges");
            ShapeRangeRecorder::new(path)
        });

        Ok(OrtPredictor::new(session, recorder))
    }
}
