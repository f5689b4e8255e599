//! Typed errors for the backend contract.
//!
//! Engine and reader failures arrive as `anyhow::Error` and are wrapped;
//! everything else is a precondition the backend checks itself.

use std::path::PathBuf;

use crate::{DType, ModelFormat};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("backend is already initialized, cannot initialize again")]
    AlreadyInitialized,

    #[error("backend not initialized, call initialize() first")]
    NotInitialized,

    #[error("backend failed a previous initialization and must be rebuilt")]
    Poisoned,

    // ── Model loading ────────────────────────────────────────────────
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model: {0}")]
    ModelParse(String),

    #[error("model format `{0}` is not supported by this backend")]
    UnsupportedFormat(ModelFormat),

    // ── Dynamic shape ────────────────────────────────────────────────
    #[error("cannot find input `{name}` in the {map} shape map")]
    MissingShapeBound { name: String, map: &'static str },

    #[error("input `{name}` has rank {min_rank} in min_shape but rank {rank} in {map}")]
    ShapeRankMismatch {
        name: String,
        map: &'static str,
        min_rank: usize,
        rank: usize,
    },

    #[error("engine input `{name}` is not one of the dynamic shape inputs")]
    UnboundDynamicInput { name: String },

    #[error("calibration supports float32/int32/int64 inputs, `{name}` is {dtype}")]
    UnsupportedCalibrationType { name: String, dtype: DType },

    // ── Inference ────────────────────────────────────────────────────
    #[error("size of inputs ({actual}) should keep same with the inputs of this model ({expected})")]
    InputCountMismatch { expected: usize, actual: usize },

    #[error("{kind} index {index} should be less than the number of {kind}s ({len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("engine error: {0:#}")]
    Engine(#[from] anyhow::Error),
}

pub type Result<T, E = BackendError> = std::result::Result<T, E>;
