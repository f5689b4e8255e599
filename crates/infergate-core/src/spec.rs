use crate::DType;

/// Declared name, dims and element type of one model input or output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: DType,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl TensorInfo {
    /// Builds a descriptor from reader dims, where negative values mark
    /// dynamic axes.
    pub fn from_reader_dims(name: impl Into<String>, dtype: DType, dims: &[i64]) -> Self {
        Self {
            name: name.into(),
            dtype,
            dims: dims
                .iter()
                .map(|d| usize::try_from(*d).ok())
                .collect(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_dynamic(&self) -> bool {
        self.dims.iter().any(Option::is_none)
    }

    /// Concrete shape with every dynamic axis replaced by `fill`.
    pub fn concrete_dims(&self, fill: usize) -> Vec<usize> {
        self.dims.iter().map(|d| d.unwrap_or(fill)).collect()
    }
}
