/// One configuration step taken for a quantized model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantAction {
    /// Plain GPU execution of a quantized graph is slow; TensorRT is not.
    WarnPreferTensorRt,
    /// Re-enable TensorRT at int8 with static caching and calibration off.
    TensorRtInt8,
    /// Switch CPU fusion to its int8 kernels.
    CpuFusionInt8,
    /// CPU fusion is off, so the quantized graph runs unfused.
    WarnEnableCpuFusion,
}

/// Decision table over device x quantized x TensorRT x CPU fusion.
pub fn decide(
    use_gpu: bool,
    quantized: bool,
    enable_trt: bool,
    enable_cpu_fusion: bool,
) -> &'static [QuantAction] {
    use QuantAction::*;

    match (quantized, use_gpu, enable_trt, enable_cpu_fusion) {
        (false, _, _, _) => &[],
        (true, true, true, _) => &[WarnPreferTensorRt, TensorRtInt8],
        (true, true, false, _) => &[WarnPreferTensorRt],
        (true, false, _, true) => &[CpuFusionInt8],
        (true, false, _, false) => &[WarnEnableCpuFusion],
    }
}

#[cfg(test)]
mod tests {
    use super::QuantAction::*;
    use super::*;

    #[test]
    fn float_models_need_nothing() {
        for gpu in [false, true] {
            for trt in [false, true] {
                for fusion in [false, true] {
                    assert!(decide(gpu, false, trt, fusion).is_empty());
                }
            }
        }
    }

    #[test]
    fn gpu_rows() {
        assert_eq!(decide(true, true, true, false), &[WarnPreferTensorRt, TensorRtInt8]);
        assert_eq!(decide(true, true, true, true), &[WarnPreferTensorRt, TensorRtInt8]);
        assert_eq!(decide(true, true, false, true), &[WarnPreferTensorRt]);
    }

    #[test]
    fn cpu_rows_ignore_tensorrt() {
        assert_eq!(decide(false, true, true, true), &[CpuFusionInt8]);
        assert_eq!(decide(false, true, false, true), &[CpuFusionInt8]);
        assert_eq!(decide(false, true, false, false), &[WarnEnableCpuFusion]);
    }
}
