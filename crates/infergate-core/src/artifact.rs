use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Paddle,
    Onnx,
    TorchScript,
    TensorRt,
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelFormat::Paddle => "paddle",
            ModelFormat::Onnx => "onnx",
            ModelFormat::TorchScript => "torchscript",
            ModelFormat::TensorRt => "tensorrt",
        };
        f.write_str(name)
    }
}

/// Model graph file plus its parameters file.
#[derive(Clone, Debug)]
pub struct ModelArtifact {
    pub model_file: PathBuf,
    pub params_file: PathBuf,
    pub format: ModelFormat,
}

impl ModelArtifact {
    pub fn new(
        model_file: impl Into<PathBuf>,
        params_file: impl Into<PathBuf>,
        format: ModelFormat,
    ) -> Self {
        Self {
            model_file: model_file.into(),
            params_file: params_file.into(),
            format,
        }
    }

    /// Directory holding the model file; `.` for bare file names.
    pub fn model_dir(&self) -> PathBuf {
        model_dir(&self.model_file)
    }
}

pub fn model_dir(model_file: &Path) -> PathBuf {
    match model_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
