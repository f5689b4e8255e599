use crate::{BackendError, Result, Tensor, TensorInfo};

/// Uniform tensor-in/tensor-out contract every backend exposes, whatever
/// acceleration path it selected.
pub trait Backend: Send {
    fn name(&self) -> &'static str;

    fn input_infos(&self) -> &[TensorInfo];
    fn output_infos(&self) -> &[TensorInfo];

    fn num_inputs(&self) -> usize {
        self.input_infos().len()
    }

    fn num_outputs(&self) -> usize {
        self.output_infos().len()
    }

    fn input_info(&self, index: usize) -> Result<&TensorInfo> {
        let infos = self.input_infos();
        infos.get(index).ok_or(BackendError::IndexOutOfRange {
            kind: "input",
            index,
            len: infos.len(),
        })
    }

    fn output_info(&self, index: usize) -> Result<&TensorInfo> {
        let infos = self.output_infos();
        infos.get(index).ok_or(BackendError::IndexOutOfRange {
            kind: "output",
            index,
            len: infos.len(),
        })
    }

    /// Inputs are matched to engine slots by `Tensor::name`. `outputs` is
    /// resized to `num_outputs()` and filled in declaration order.
    fn infer(&mut self, inputs: &[Tensor], outputs: &mut Vec<Tensor>) -> Result<()>;
}
