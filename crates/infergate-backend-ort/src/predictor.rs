use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use infergate_core::{DType, Tensor};
use infergate_predictor::{HostBuffer, Predictor};
use ort::session::{Session, SessionInputValue};
use ort::value::DynValue;
use tracing::warn;

use crate::convert;
use crate::shape_range::ShapeRangeRecorder;

pub struct OrtPredictor {
    session: Session,
    inputs: Vec<(String, Option<DType>)>,
    reshaped: HashMap<String, Vec<usize>>,
    bound: HashMap<String, (Vec<usize>, DynValue)>,
    outputs: HashMap<String, Tensor>,
    recorder: Option<ShapeRangeRecorder>,
}

impl OrtPredictor {
    pub(crate) fn new(session: Session, recorder: Option<ShapeRangeRecorder>) -> Self {
        let inputs = session
            .inputs
            .iter()
            .map(|input| {
                let dtype = convert::tensor_signature(&input.input_type)
                    .and_then(|(ty, _)| convert::element_to_dtype(ty));
                if let Err(err) = &dtype {
                    warn!(input = %input.name, "{err:#}");
                }
                (input.name.clone(), dtype.ok())
            })
            .collect();

        Self {
            session,
            inputs,
            reshaped: HashMap::new(),
            bound: HashMap::new(),
            outputs: HashMap::new(),
            recorder,
        }
    }

    fn check_input(&self, name: &str) -> Result<()> {
        if !self.inputs.iter().any(|(n, _)| n == name) {
            bail!("model has no input named `{name}`");
        }
        Ok(())
    }
}

impl Predictor for OrtPredictor {
    fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|(name, _)| name.clone()).collect()
    }

    fn input_types(&self) -> HashMap<String, DType> {
        self.inputs
            .iter()
            .filter_map(|(name, dtype)| dtype.map(|d| (name.clone(), d)))
            .collect()
    }

    fn reshape_input(&mut self, name: &str, shape: &[usize]) -> Result<()> {
        self.check_input(name)?;
        self.reshaped.insert(name.to_string(), shape.to_vec());
        Ok(())
    }

    fn copy_from_cpu(&mut self, name: &str, data: HostBuffer) -> Result<()> {
        self.check_input(name)?;
        let shape = self
            .reshaped
            .get(name)
            .with_context(|| format!("input `{name}` must be reshaped before copying data"))?
            .clone();
        let value = convert::host_buffer_to_value(&shape, data)
            .with_context(|| format!("failed to bind input `{name}`"))?;
        self.bound.insert(name.to_string(), (shape, value));
        Ok(())
    }

    /// ORT owns its input values, so the payload is copied once into the
    /// session's value.
    fn share_input(&mut self, name: &str, tensor: &Tensor) -> Result<()> {
        self.check_input(name)?;
        let value = convert::tensor_to_value(tensor)
            .with_context(|| format!("failed to bind input `{name}`"))?;
        self.bound
            .insert(name.to_string(), (tensor.shape().to_vec(), value));
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        if let Some((name, _)) = self.inputs.iter().find(|(n, _)| !self.bound.contains_key(n)) {
            bail!("input `{name}` is not bound");
        }

        let mut feeds = Vec::with_capacity(self.inputs.len());
        let mut shapes = Vec::with_capacity(self.inputs.len());
        for (name, _) in &self.inputs {
            let (shape, value) = self
                .bound
                .remove(name)
                .with_context(|| format!("input `{name}` is not bound"))?;
            shapes.push((name.as_str(), shape));
            feeds.push((name.clone(), SessionInputValue::from(value)));
        }

        let outputs = self.session.run(feeds).context("onnxruntime run failed")?;
        self.outputs.clear();
        for (name, value) in outputs.iter() {
            let tensor = convert::value_to_tensor(&value)
                .with_context(|| format!("failed to read output `{name}`"))?;
            self.outputs.insert(name.to_string(), tensor);
        }

        if let Some(recorder) = self.recorder.as_mut() {
            for (name, shape) in &shapes {
                recorder.record(name, shape);
            }
        }
        Ok(())
    }

    fn copy_output_to_cpu(&mut self, name: &str) -> Result<Tensor> {
        self.outputs
            .get(name)
            .cloned()
            .with_context(|| format!("no output named `{name}` from the last run"))
    }

    fn finish_shape_collection(&mut self) -> Result<()> {
        match self.recorder.as_mut() {
            Some(recorder) => recorder.finish(),
            None => Ok(()),
        }
    }
}
