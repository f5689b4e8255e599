use anyhow::{Context, Result};
use infergate_predictor::{DeviceConfig, PredictorConfig};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use tracing::{debug, info, warn};

/// Session builder with everything from `config` that ONNX Runtime can
/// express. The rest is logged and skipped.
pub fn builder_for(config: &PredictorConfig) -> Result<SessionBuilder> {
    let builder = Session::builder()
        .context("failed to create ORT session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("failed to configure ORT session builder")?
        .with_intra_threads(config.cpu_math_threads)
        .context("failed to set ORT intra-op threads")?;

    for pass in &config.deleted_passes {
        warn!(pass = %pass, "onnxruntime cannot delete individual passes, ignoring");
    }
    if let Some(fusion) = &config.cpu_fusion {
        warn!(
            cache_capacity = fusion.cache_capacity,
            int8 = fusion.int8,
            "onnxruntime has no CPU fusion toggle, using its default CPU kernels"
        );
    }
    if !config.engine_info_logging {
        debug!("engine info logging disabled");
    }

    match &config.device {
        DeviceConfig::Cpu => Ok(builder),
        DeviceConfig::Gpu {
            memory_pool_mb,
            device_id,
        } => {
            info!(
                device_id,
                memory_pool_mb,
                "initial memory pool size is managed by the CUDA arena"
            );
            configure_gpu(builder, config, *device_id)
        }
    }
}

fn configure_gpu(
    builder: SessionBuilder,
    config: &PredictorConfig,
    device_id: i32,
) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::CUDAExecutionProvider;

        let mut providers = Vec::new();
        #[cfg(feature = "tensorrt")]
        {
            if let Some(trt) = &config.tensorrt {
                providers.push(tensorrt::provider(config, trt, device_id)?);
            }
        }
        #[cfg(not(feature = "tensorrt"))]
        {
            if config.tensorrt.is_some() {
                warn!("TensorRT requested but this build has no TensorRT provider");
            }
        }
        providers.push(CUDAExecutionProvider::default().with_device_id(device_id).build());

        builder
            .with_execution_providers(providers)
            .context("failed to enable ORT GPU execution providers")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, config, device_id);
        anyhow::bail!(
            "GPU requested but infergate-backend-ort was built without the `cuda` feature"
        )
    }
}

#[cfg(feature = "tensorrt")]
mod tensorrt {
    use anyhow::Result;
    use infergate_core::model_dir;
    use infergate_predictor::{DynamicShape, Precision, PredictorConfig, TensorRtConfig};
    use ort::execution_providers::{ExecutionProviderDispatch, TensorRTExecutionProvider};
    use tracing::info;

    use crate::shape_range::{profile_string, read_pbtxt};

    pub fn provider(
        config: &PredictorConfig,
        trt: &TensorRtConfig,
        device_id: i32,
    ) -> Result<ExecutionProviderDispatch> {
        let mut ep = TensorRTExecutionProvider::default()
            .with_device_id(device_id)
            .with_max_workspace_size(trt.workspace_size)
            .with_min_subgraph_size(trt.min_subgraph_size);

        match trt.precision {
            Precision::Float32 => info!("TRT precision: FP32"),
            Precision::Half => {
                ep = ep.with_fp16(true);
                info!("TRT precision: FP16 mixed precision");
            }
            Precision::Int8 => {
                ep = ep.with_fp16(true).with_int8(true);
                info!(calibrate = trt.use_calib_mode, "TRT precision: INT8");
            }
        }

        if trt.use_static {
            let cache = model_dir(&config.model_file).join("trt_cache");
            ep = ep
                .with_engine_cache(true)
                .with_engine_cache_path(cache.to_string_lossy().to_string());
        }

        let ranges = match &config.dynamic_shape {
            None => None,
            Some(DynamicShape::Static(ranges)) => Some(ranges.clone()),
            Some(DynamicShape::Tuned { path, strict }) => {
                info!(path = %path.display(), strict, "reading tuned TensorRT dynamic shapes");
                Some(read_pbtxt(path)?)
            }
        };
        if let Some(ranges) = ranges.filter(|r| !r.is_empty()) {
            ep = ep
                .with_profile_min_shapes(profile_string(&ranges.min))
                .with_profile_max_shapes(profile_string(&ranges.max))
                .with_profile_opt_shapes(profile_string(&ranges.opt));
        }

        Ok(ep.build())
    }
}
