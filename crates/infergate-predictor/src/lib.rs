//! Adapter that configures, initializes and drives a tensor-graph predictor
//! engine, with optional TensorRT subgraph offload and one-time dynamic
//! shape calibration.

pub mod accelerator;
pub mod backend;
pub mod calibrate;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod model;
pub mod quantize;
pub mod shape;

pub use accelerator::AcceleratorBinder;
pub use backend::PredictorBackend;
pub use config::{
    ConfigBuilder, CpuFusionConfig, DeviceConfig, DynamicShape, Precision, PredictorConfig,
    TensorRtConfig,
};
pub use engine::{
    dtype_from_reader, Engine, HostBuffer, ModelInfo, ModelReader, Predictor, ReaderDataType,
    ReaderTensor,
};
pub use model::Model;
pub use shape::{ShapeRanges, SHAPE_RANGE_INFO_FILE};
