use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use infergate_core::{DType, HostElement, Shape, Tensor};
use infergate_predictor::{HostBuffer, ReaderDataType};
use ort::{
    tensor::{PrimitiveTensorElementType, TensorElementType},
    value::{DynValue, ValueType},
};

pub fn element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Float64 => Ok(DType::F64),
        TensorElementType::Float16 => Ok(DType::F16),
        TensorElementType::Int64 => Ok(DType::I64),
        TensorElementType::Int32 => Ok(DType::I32),
        TensorElementType::Int8 => Ok(DType::I8),
        TensorElementType::Uint8 => Ok(DType::U8),
        TensorElementType::Bool => Ok(DType::Bool),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

pub fn element_to_reader(ty: TensorElementType) -> Result<ReaderDataType> {
    match ty {
        TensorElementType::Float32 => Ok(ReaderDataType::Float32),
        TensorElementType::Float64 => Ok(ReaderDataType::Float64),
        TensorElementType::Float16 => Ok(ReaderDataType::Float16),
        TensorElementType::Int64 => Ok(ReaderDataType::Int64),
        TensorElementType::Int32 => Ok(ReaderDataType::Int32),
        TensorElementType::Int16 => Ok(ReaderDataType::Int16),
        TensorElementType::Int8 => Ok(ReaderDataType::Int8),
        TensorElementType::Uint8 => Ok(ReaderDataType::Uint8),
        TensorElementType::Bool => Ok(ReaderDataType::Bool),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

/// Splits a session IO type into its element type and raw dims (`-1` for
/// dynamic axes).
pub fn tensor_signature(value_type: &ValueType) -> Result<(TensorElementType, Vec<i64>)> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type");
    };
    Ok((*ty, shape.iter().copied().collect()))
}

/// Copies a host tensor into an owned ORT value.
pub fn tensor_to_value(tensor: &Tensor) -> Result<DynValue> {
    let shape = tensor.shape().to_vec();
    let expected = tensor.desc.shape.numel() * tensor.dtype().byte_size();
    let actual = tensor.host_bytes()?.len();
    ensure!(
        actual == expected,
        "input `{}` byte size mismatch: got {actual}, expected {expected}",
        tensor.name
    );

    let value = match tensor.dtype() {
        DType::F32 => owned(shape, tensor.to_host_vec::<f32>()?)?,
        DType::F64 => owned(shape, tensor.to_host_vec::<f64>()?)?,
        DType::I64 => owned(shape, tensor.to_host_vec::<i64>()?)?,
        DType::I32 => owned(shape, tensor.to_host_vec::<i32>()?)?,
        DType::I8 => owned(shape, tensor.to_host_vec::<i8>()?)?,
        DType::U8 => owned(shape, tensor.to_host_vec::<u8>()?)?,
        DType::Bool => {
            let data: Vec<bool> = tensor.host_bytes()?.iter().map(|b| *b != 0).collect();
            owned(shape, data)?
        }
        DType::F16 => bail!("f16 inputs are not supported yet"),
    };
    Ok(value)
}

pub fn host_buffer_to_value(shape: &[usize], data: HostBuffer) -> Result<DynValue> {
    let numel: usize = shape.iter().product();
    ensure!(
        numel == data.len(),
        "shape {shape:?} holds {numel} elements, got {}",
        data.len()
    );
    let shape = shape.to_vec();
    let value = match data {
        HostBuffer::F32(v) => owned(shape, v)?,
        HostBuffer::I32(v) => owned(shape, v)?,
        HostBuffer::I64(v) => owned(shape, v)?,
    };
    Ok(value)
}

pub fn value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let (ty, dims) = tensor_signature(value.dtype())?;
    let dims: Vec<usize> = dims.iter().map(|d| *d as usize).collect();
    let shape = Shape::from_slice(&dims);

    match ty {
        TensorElementType::Float32 => from_array::<f32>(value, shape),
        TensorElementType::Float64 => from_array::<f64>(value, shape),
        TensorElementType::Int64 => from_array::<i64>(value, shape),
        TensorElementType::Int32 => from_array::<i32>(value, shape),
        TensorElementType::Int8 => from_array::<i8>(value, shape),
        TensorElementType::Uint8 => from_array::<u8>(value, shape),
        TensorElementType::Bool => {
            let array = value.try_extract_array::<bool>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            let bytes: Vec<u8> = slice.iter().map(|b| u8::from(*b)).collect();
            Ok(Tensor::from_cpu_bytes(DType::Bool, shape, Bytes::from(bytes)))
        }
        TensorElementType::Float16 => bail!("f16 outputs are not supported yet"),
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}

fn owned<T>(shape: Vec<usize>, data: Vec<T>) -> Result<DynValue>
where
    T: PrimitiveTensorElementType + std::fmt::Debug + Clone + 'static,
{
    Ok(ort::value::Tensor::from_array((shape, data))?.into_dyn())
}

fn from_array<T>(value: &ort::value::ValueRef<'_>, shape: Shape) -> Result<Tensor>
where
    T: HostElement + PrimitiveTensorElementType + std::fmt::Debug,
{
    let array = value.try_extract_array::<T>()?;
    let slice = array.as_slice().context("non-contiguous output tensor")?;
    Tensor::from_host(shape, slice)
}
