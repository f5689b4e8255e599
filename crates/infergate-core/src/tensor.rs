use anyhow::{bail, ensure, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
    F16,
    I8,
    I32,
    I64,
    U8,
    Bool,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F64 | DType::I64 => 8,
            DType::F32 | DType::I32 => 4,
            DType::F16 => 2,
            DType::I8 | DType::U8 | DType::Bool => 1,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::F16 => "float16",
            DType::I8 => "int8",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::Bool => "bool",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Element count; 1 for scalars, 0 when any axis is empty.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
    pub device: Device,
    pub strides: Option<SmallVec<[isize; 6]>>,
}

#[derive(Clone, Debug)]
pub struct PinnedBuf {
    pub bytes: Bytes,
}

#[derive(Clone, Debug)]
pub struct CudaBuf {
    pub device_id: u32,
    pub bytes: Bytes,
}

/// Owns the storage for a tensor. Host variants are reference counted, so
/// cloning a tensor or handing it to an engine never copies the payload.
#[derive(Clone, Debug)]
pub enum TensorStorage {
    CpuBytes(Bytes),
    CpuPinned(PinnedBuf),
    CudaDevice(CudaBuf),
}

#[derive(Clone, Debug)]
pub struct Tensor {
    pub name: String,
    pub desc: TensorDesc,
    pub storage: TensorStorage,
    pub byte_len: usize,
}

impl Default for Tensor {
    fn default() -> Self {
        Self::from_cpu_bytes(DType::F32, Shape::default(), Bytes::new())
    }
}

impl Tensor {
    pub fn from_cpu_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Self {
        let byte_len = bytes.len();
        Self {
            name: String::new(),
            desc: TensorDesc {
                dtype,
                shape,
                device: Device::Cpu,
                strides: None,
            },
            storage: TensorStorage::CpuBytes(bytes),
            byte_len,
        }
    }

    /// Builds a host tensor from typed values, little-endian.
    pub fn from_host<T: HostElement>(shape: Shape, values: &[T]) -> Result<Self> {
        ensure!(
            shape.numel() == values.len(),
            "shape {:?} holds {} elements, got {}",
            shape.as_slice(),
            shape.numel(),
            values.len()
        );
        let mut buf = BytesMut::with_capacity(std::mem::size_of_val(values));
        for v in values {
            v.put_le(&mut buf);
        }
        Ok(Self::from_cpu_bytes(T::DTYPE, shape, buf.freeze()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.desc.shape.as_slice()
    }

    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }

    pub fn is_pinned_memory(&self) -> bool {
        matches!(self.storage, TensorStorage::CpuPinned(_))
    }

    /// Moves host storage between the pageable and pinned variants. Device
    /// storage is left alone.
    pub fn set_pinned_memory(&mut self, pinned: bool) {
        let storage = std::mem::replace(&mut self.storage, TensorStorage::CpuBytes(Bytes::new()));
        self.storage = match (storage, pinned) {
            (TensorStorage::CpuBytes(bytes), true) => TensorStorage::CpuPinned(PinnedBuf { bytes }),
            (TensorStorage::CpuPinned(p), false) => TensorStorage::CpuBytes(p.bytes),
            (other, _) => other,
        };
    }

    pub fn host_bytes(&self) -> Result<&Bytes> {
        match &self.storage {
            TensorStorage::CpuBytes(bytes) => Ok(bytes),
            TensorStorage::CpuPinned(p) => Ok(&p.bytes),
            TensorStorage::CudaDevice(_) => bail!("tensor `{}` lives on a CUDA device", self.name),
        }
    }

    pub fn to_host_vec<T: HostElement>(&self) -> Result<Vec<T>> {
        ensure!(
            self.desc.dtype == T::DTYPE,
            "tensor `{}` is {}, requested {}",
            self.name,
            self.desc.dtype,
            T::DTYPE
        );
        let bytes = self.host_bytes()?;
        let width = T::DTYPE.byte_size();
        ensure!(
            bytes.len() % width == 0,
            "{} tensor has invalid byte length {}",
            T::DTYPE,
            bytes.len()
        );
        Ok(bytes.chunks_exact(width).map(T::from_le).collect())
    }
}

/// Plain element types that can be written to and read from host storage.
pub trait HostElement: Copy {
    const DTYPE: DType;
    fn put_le(&self, buf: &mut BytesMut);
    fn from_le(chunk: &[u8]) -> Self;
}

macro_rules! host_element {
    ($ty:ty, $dtype:expr, $put:ident) => {
        impl HostElement for $ty {
            const DTYPE: DType = $dtype;
            fn put_le(&self, buf: &mut BytesMut) {
                buf.$put(*self);
            }
            fn from_le(chunk: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(chunk);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

host_element!(f32, DType::F32, put_f32_le);
host_element!(f64, DType::F64, put_f64_le);
host_element!(i32, DType::I32, put_i32_le);
host_element!(i64, DType::I64, put_i64_le);
host_element!(i8, DType::I8, put_i8);
host_element!(u8, DType::U8, put_u8);
