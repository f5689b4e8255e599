use tracing::warn;

use crate::config::TensorRtConfig;

/// Whether the engine build carries the TensorRT subgraph accelerator.
/// Chosen once from the `tensorrt` feature; every TensorRT decision goes
/// through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceleratorBinder {
    Absent,
    Present,
}

impl Default for AcceleratorBinder {
    fn default() -> Self {
        Self::detect()
    }
}

impl AcceleratorBinder {
    pub const fn detect() -> Self {
        if cfg!(feature = "tensorrt") {
            AcceleratorBinder::Present
        } else {
            AcceleratorBinder::Absent
        }
    }

    pub fn is_present(self) -> bool {
        self == AcceleratorBinder::Present
    }

    /// Returns the TensorRT settings to install, or `None` after warning that
    /// execution falls back to plain GPU.
    pub fn bind(self, trt: TensorRtConfig) -> Option<TensorRtConfig> {
        match self {
            AcceleratorBinder::Present => Some(trt),
            AcceleratorBinder::Absent => {
                warn!("built without the TensorRT accelerator, falling back to GPU execution");
                None
            }
        }
    }
}
