//! Engine configuration as a plain value, and the resolver that derives it
//! from a `BackendOption`.

use std::path::PathBuf;

use infergate_core::{BackendOption, Result};
use tracing::{info, warn};

use crate::accelerator::AcceleratorBinder;
use crate::quantize::{self, QuantAction};
use crate::shape::{self, ShapeRanges};

/// Math-library threads used when the option leaves the count unset.
pub const DEFAULT_CPU_THREADS: usize = 8;

/// Largest batch dimension TensorRT subgraphs are built for.
pub const TRT_MAX_BATCH_SIZE: usize = 32;

/// Subgraphs with fewer nodes stay on the native engine.
pub const TRT_MIN_SUBGRAPH_SIZE: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceConfig {
    Cpu,
    Gpu { memory_pool_mb: u64, device_id: i32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    Float32,
    Half,
    Int8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorRtConfig {
    pub workspace_size: usize,
    pub max_batch_size: usize,
    pub min_subgraph_size: usize,
    pub precision: Precision,
    /// Serialize built engines to the model directory and reuse them.
    pub use_static: bool,
    pub use_calib_mode: bool,
}

impl TensorRtConfig {
    pub fn new(workspace_size: usize, precision: Precision, use_static: bool) -> Self {
        Self {
            workspace_size,
            max_batch_size: TRT_MAX_BATCH_SIZE,
            min_subgraph_size: TRT_MIN_SUBGRAPH_SIZE,
            precision,
            use_static,
            use_calib_mode: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynamicShape {
    /// Bounds given directly by the caller.
    Static(ShapeRanges),
    /// Bounds read from a collected shape-range file. Non-strict tolerates
    /// runtime shapes outside the recorded ranges.
    Tuned { path: PathBuf, strict: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuFusionConfig {
    pub cache_capacity: i32,
    pub int8: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictorConfig {
    pub model_file: PathBuf,
    pub params_file: PathBuf,
    pub device: DeviceConfig,
    pub tensorrt: Option<TensorRtConfig>,
    pub dynamic_shape: Option<DynamicShape>,
    /// Record input shape ranges into this file instead of running normally.
    pub collect_shape_range_info: Option<PathBuf>,
    pub cpu_fusion: Option<CpuFusionConfig>,
    pub engine_info_logging: bool,
    pub deleted_passes: Vec<String>,
    pub cpu_math_threads: usize,
}

impl PredictorConfig {
    /// Engine defaults bound to one model.
    pub fn new(model_file: impl Into<PathBuf>, params_file: impl Into<PathBuf>) -> Self {
        Self {
            model_file: model_file.into(),
            params_file: params_file.into(),
            device: DeviceConfig::Cpu,
            tensorrt: None,
            dynamic_shape: None,
            collect_shape_range_info: None,
            cpu_fusion: None,
            engine_info_logging: true,
            deleted_passes: Vec::new(),
            cpu_math_threads: 1,
        }
    }

    /// Throwaway configuration that only profiles input shapes.
    pub fn for_shape_collection(
        model_file: impl Into<PathBuf>,
        params_file: impl Into<PathBuf>,
        shape_range_info: impl Into<PathBuf>,
    ) -> Self {
        Self {
            collect_shape_range_info: Some(shape_range_info.into()),
            ..Self::new(model_file, params_file)
        }
    }

    pub fn use_gpu(&self) -> bool {
        matches!(self.device, DeviceConfig::Gpu { .. })
    }
}

/// Derives a `PredictorConfig` from an option snapshot. Unsupported
/// combinations degrade with a warning; only inconsistent shape bounds fail.
#[derive(Clone, Copy, Debug)]
pub struct ConfigBuilder<'a> {
    option: &'a BackendOption,
    binder: AcceleratorBinder,
}

impl<'a> ConfigBuilder<'a> {
    pub fn new(option: &'a BackendOption, binder: AcceleratorBinder) -> Self {
        Self { option, binder }
    }

    pub fn resolve(
        &self,
        model_file: impl Into<PathBuf>,
        params_file: impl Into<PathBuf>,
    ) -> Result<PredictorConfig> {
        let option = self.option;
        let mut config = PredictorConfig::new(model_file, params_file);

        if option.use_gpu {
            config.device = DeviceConfig::Gpu {
                memory_pool_mb: option.gpu_mem_init_size,
                device_id: option.gpu_id,
            };
            if option.enable_trt {
                let precision = if option.trt_option.enable_fp16 {
                    Precision::Half
                } else {
                    Precision::Float32
                };
                let trt = TensorRtConfig::new(
                    option.trt_option.max_workspace_size,
                    precision,
                    self.use_static_cache(),
                );
                config = self.with_tensorrt(config, trt)?;
            }
        } else if option.enable_mkldnn {
            config.cpu_fusion = Some(CpuFusionConfig {
                cache_capacity: option.mkldnn_cache_size,
                int8: false,
            });
        }

        config.engine_info_logging = option.enable_log_info;

        for pass in &option.delete_pass_names {
            info!(pass = %pass, "deleting optimization pass");
            config.deleted_passes.push(pass.clone());
        }

        config.cpu_math_threads = cpu_math_threads(option.cpu_thread_num);
        Ok(config)
    }

    /// Decision-table row for this option. TensorRT only counts as enabled
    /// when the accelerator is bound; `resolve` already warned otherwise.
    pub fn quantization_actions(&self, quantized: bool) -> &'static [QuantAction] {
        let option = self.option;
        quantize::decide(
            option.use_gpu,
            quantized,
            option.enable_trt && self.binder.is_present(),
            option.enable_mkldnn,
        )
    }

    /// Applies the quantized-model rows of the decision table to `config`.
    pub fn with_quantization(
        &self,
        mut config: PredictorConfig,
        quantized: bool,
    ) -> Result<PredictorConfig> {
        let option = self.option;
        for action in self.quantization_actions(quantized) {
            match action {
                QuantAction::WarnPreferTensorRt => warn!(
                    "model is quantized, use the TensorRT backend on GPU for better performance"
                ),
                QuantAction::TensorRtInt8 => {
                    let trt = TensorRtConfig {
                        use_calib_mode: false,
                        ..TensorRtConfig::new(
                            option.trt_option.max_workspace_size,
                            Precision::Int8,
                            false,
                        )
                    };
                    config = self.with_tensorrt(config, trt)?;
                }
                QuantAction::CpuFusionInt8 => {
                    let fusion = config.cpu_fusion.get_or_insert(CpuFusionConfig {
                        cache_capacity: option.mkldnn_cache_size,
                        int8: false,
                    });
                    fusion.int8 = true;
                }
                QuantAction::WarnEnableCpuFusion => warn!(
                    "model is quantized, enable mkldnn for better performance on CPU"
                ),
            }
        }
        Ok(config)
    }

    /// Installs TensorRT through the binder and pushes the caller's static
    /// shape bounds when any are given.
    fn with_tensorrt(
        &self,
        mut config: PredictorConfig,
        trt: TensorRtConfig,
    ) -> Result<PredictorConfig> {
        let Some(trt) = self.binder.bind(trt) else {
            return Ok(config);
        };
        config.tensorrt = Some(trt);

        let ranges = shape::derive(&self.option.trt_option)?;
        if !ranges.is_empty() {
            info!(inputs = ranges.len(), "setting TensorRT dynamic shape");
            config.dynamic_shape = Some(DynamicShape::Static(ranges));
        }
        Ok(config)
    }

    // TODO: carry `serialize_file` into `TensorRtConfig` so the ORT engine can
    // hand it to `with_engine_cache_path`; today the cache lands beside the model.
    fn use_static_cache(&self) -> bool {
        let serialize_file = &self.option.trt_option.serialize_file;
        if serialize_file.is_empty() {
            return false;
        }
        warn!(
            serialize_file = %serialize_file,
            "TensorRT cache file was set, but the cache will be saved to the directory of the model"
        );
        true
    }
}

pub fn cpu_math_threads(cpu_thread_num: i32) -> usize {
    usize::try_from(cpu_thread_num)
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CPU_THREADS)
}
