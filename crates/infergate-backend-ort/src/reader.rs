use anyhow::{Context, Result};
use infergate_predictor::{ModelInfo, ModelReader, ReaderTensor};
use ort::session::Session;

use crate::convert;

/// Operator names that only appear in quantized ONNX graphs.
const QUANTIZED_OPS: &[&[u8]] = &[
    b"QuantizeLinear",
    b"DequantizeLinear",
    b"QLinearConv",
    b"QLinearMatMul",
    b"MatMulInteger",
    b"ConvInteger",
    b"DynamicQuantizeLinear",
];

/// Reads IO signatures by committing a throwaway session from memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrtModelReader;

impl OrtModelReader {
    pub fn new() -> Self {
        Self
    }
}

impl ModelReader for OrtModelReader {
    fn parse(&self, bytes: &[u8]) -> Result<ModelInfo> {
        let session = Session::builder()
            .context("failed to create ORT session builder")?
            .commit_from_memory(bytes)
            .context("failed to load ONNX model")?;

        let inputs = session
            .inputs
            .iter()
            .map(|input| reader_tensor(&input.name, &input.input_type))
            .collect::<Result<Vec<_>>>()?;
        let outputs = session
            .outputs
            .iter()
            .map(|output| reader_tensor(&output.name, &output.output_type))
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelInfo {
            is_quantized: contains_quantized_ops(bytes),
            inputs,
            outputs,
        })
    }
}

fn reader_tensor(name: &str, value_type: &ort::value::ValueType) -> Result<ReaderTensor> {
    let (ty, dims) = convert::tensor_signature(value_type)
        .with_context(|| format!("IO `{name}`"))?;
    let dtype = convert::element_to_reader(ty).with_context(|| format!("IO `{name}`"))?;
    Ok(ReaderTensor::new(name, &dims, dtype))
}

/// Scans serialized graph bytes for quantize/dequantize and integer operators.
pub fn contains_quantized_ops(bytes: &[u8]) -> bool {
    QUANTIZED_OPS
        .iter()
        .any(|op| bytes.windows(op.len()).any(|w| w == *op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_qdq_operators() {
        assert!(contains_quantized_ops(b"\x22\x0eDequantizeLinear"));
        assert!(contains_quantized_ops(b"..QLinearConv.."));
        assert!(!contains_quantized_ops(b"Conv Relu MatMul Gemm"));
        assert!(!contains_quantized_ops(b""));
    }
}
