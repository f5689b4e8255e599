use infergate_core::{
    Backend, BackendError, BackendOption, ModelArtifact, ModelFormat, Result, Tensor, TensorInfo,
};

use crate::backend::PredictorBackend;
use crate::engine::{Engine, ModelReader};

/// Construct-and-predict surface for embedding a single model.
pub struct Model<E: Engine, R: ModelReader> {
    artifact: ModelArtifact,
    backend: PredictorBackend<E, R>,
}

impl<E, R> Model<E, R>
where
    E: Engine + Send,
    R: ModelReader + Send,
{
    /// Builds and initializes a backend for `artifact`.
    pub fn new(
        engine: E,
        reader: R,
        artifact: ModelArtifact,
        option: &BackendOption,
    ) -> Result<Self> {
        Self::from_backend(PredictorBackend::new(engine, reader), artifact, option)
    }

    /// Like `new`, over a backend built with a specific accelerator binder.
    pub fn from_backend(
        mut backend: PredictorBackend<E, R>,
        artifact: ModelArtifact,
        option: &BackendOption,
    ) -> Result<Self> {
        match artifact.format {
            ModelFormat::Paddle | ModelFormat::Onnx => {}
            other => return Err(BackendError::UnsupportedFormat(other)),
        }
        backend.initialize(&artifact.model_file, &artifact.params_file, option)?;
        Ok(Self { artifact, backend })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn backend(&self) -> &PredictorBackend<E, R> {
        &self.backend
    }

    pub fn input_infos(&self) -> &[TensorInfo] {
        self.backend.input_infos()
    }

    pub fn output_infos(&self) -> &[TensorInfo] {
        self.backend.output_infos()
    }

    /// Runs a single-input model.
    pub fn predict(&mut self, input: Tensor) -> Result<Vec<Tensor>> {
        let mut outputs = Vec::new();
        self.backend.infer(std::slice::from_ref(&input), &mut outputs)?;
        Ok(outputs)
    }

    pub fn predict_batch(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let mut outputs = Vec::new();
        self.backend.infer(inputs, &mut outputs)?;
        Ok(outputs)
    }
}
