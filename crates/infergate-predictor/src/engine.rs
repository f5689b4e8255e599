//! Seams to the third-party collaborators: the model-file reader and the
//! execution engine. Both report failures as `anyhow::Error`; the backend
//! wraps them into `BackendError`.

use std::collections::HashMap;

use anyhow::Result;
use infergate_core::{BackendError, DType, Tensor};

use crate::config::PredictorConfig;

/// Element type tags as reported by the model reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderDataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Float16,
    Float32,
    Float64,
    Other(i32),
}

/// Fixed translation from reader tags to tensor element types.
pub fn dtype_from_reader(tag: ReaderDataType) -> Result<DType, BackendError> {
    match tag {
        ReaderDataType::Float32 => Ok(DType::F32),
        ReaderDataType::Float64 => Ok(DType::F64),
        ReaderDataType::Float16 => Ok(DType::F16),
        ReaderDataType::Uint8 => Ok(DType::U8),
        ReaderDataType::Int8 => Ok(DType::I8),
        ReaderDataType::Int32 => Ok(DType::I32),
        ReaderDataType::Int64 => Ok(DType::I64),
        ReaderDataType::Bool => Ok(DType::Bool),
        other => Err(BackendError::ModelParse(format!(
            "unsupported reader data type {other:?}"
        ))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderTensor {
    pub name: String,
    pub shape: Vec<i64>,
    pub dtype: ReaderDataType,
}

impl ReaderTensor {
    pub fn new(name: impl Into<String>, shape: &[i64], dtype: ReaderDataType) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
            dtype,
        }
    }
}

/// What the reader learned from the serialized graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelInfo {
    pub is_quantized: bool,
    pub inputs: Vec<ReaderTensor>,
    pub outputs: Vec<ReaderTensor>,
}

pub trait ModelReader {
    fn parse(&self, bytes: &[u8]) -> Result<ModelInfo>;
}

/// Host data copied into an engine input.
#[derive(Clone, Debug, PartialEq)]
pub enum HostBuffer {
    F32(Vec<f32>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl HostBuffer {
    /// `count` ones of `dtype`, or `None` when the type has no filler.
    pub fn ones(dtype: DType, count: usize) -> Option<Self> {
        match dtype {
            DType::F32 => Some(HostBuffer::F32(vec![1.0; count])),
            DType::I32 => Some(HostBuffer::I32(vec![1; count])),
            DType::I64 => Some(HostBuffer::I64(vec![1; count])),
            _ => None,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostBuffer::F32(_) => DType::F32,
            HostBuffer::I32(_) => DType::I32,
            HostBuffer::I64(_) => DType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostBuffer::F32(v) => v.len(),
            HostBuffer::I32(v) => v.len(),
            HostBuffer::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One constructed engine instance. Input and output slots are addressed by
/// name; binding is a shared mutable resource, hence `&mut self`.
pub trait Predictor: Send {
    fn input_names(&self) -> Vec<String>;
    fn input_types(&self) -> HashMap<String, DType>;

    fn reshape_input(&mut self, name: &str, shape: &[usize]) -> Result<()>;
    fn copy_from_cpu(&mut self, name: &str, data: HostBuffer) -> Result<()>;

    /// Binds the tensor's storage to the slot without copying when the
    /// layout allows it.
    fn share_input(&mut self, name: &str, tensor: &Tensor) -> Result<()>;

    /// Synchronous; outputs are ready when it returns.
    fn run(&mut self) -> Result<()>;

    fn copy_output_to_cpu(&mut self, name: &str) -> Result<Tensor>;

    /// Persists the shape ranges recorded so far. A predictor built for
    /// shape collection writes nothing unless this is called.
    fn finish_shape_collection(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds engine instances from a finalized configuration.
pub trait Engine {
    type Predictor: Predictor;

    fn name(&self) -> &'static str;
    fn create_predictor(&self, config: &PredictorConfig) -> Result<Self::Predictor>;
}
