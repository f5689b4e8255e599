use infergate_core::{BackendError, Result, TensorInfo};

use crate::config::PredictorConfig;

/// Everything a backend owns once initialization succeeded.
pub struct Ready<P> {
    pub config: PredictorConfig,
    pub predictor: P,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

/// Backend lifecycle. Transitions only move forward:
/// `Unconfigured -> Configured -> Initialized`, with `Failed` reachable from
/// `Configured` and absorbing.
pub enum Lifecycle<P> {
    Unconfigured,
    Configured(PredictorConfig),
    Initialized(Box<Ready<P>>),
    Failed,
}

impl<P> Lifecycle<P> {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Unconfigured => "unconfigured",
            Lifecycle::Configured(_) => "configured",
            Lifecycle::Initialized(_) => "initialized",
            Lifecycle::Failed => "failed",
        }
    }

    /// Rejects configuration or initialization once past `Configured`.
    pub fn check_configurable(&self) -> Result<()> {
        match self {
            Lifecycle::Unconfigured | Lifecycle::Configured(_) => Ok(()),
            Lifecycle::Initialized(_) => Err(BackendError::AlreadyInitialized),
            Lifecycle::Failed => Err(BackendError::Poisoned),
        }
    }

    pub fn config(&self) -> Option<&PredictorConfig> {
        match self {
            Lifecycle::Configured(config) => Some(config),
            Lifecycle::Initialized(ready) => Some(&ready.config),
            Lifecycle::Unconfigured | Lifecycle::Failed => None,
        }
    }

    pub fn ready(&self) -> Option<&Ready<P>> {
        match self {
            Lifecycle::Initialized(ready) => Some(ready),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Result<&mut Ready<P>> {
        match self {
            Lifecycle::Initialized(ready) => Ok(ready),
            _ => Err(BackendError::NotInitialized),
        }
    }
}
