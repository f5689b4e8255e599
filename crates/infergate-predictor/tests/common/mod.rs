#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use infergate_core::{DType, Shape, Tensor};
use infergate_predictor::{
    Engine, HostBuffer, ModelInfo, ModelReader, Predictor, PredictorConfig, ReaderDataType,
    ReaderTensor,
};
use tempfile::TempDir;

/// Everything the mock engine was asked to do, across all its predictors.
#[derive(Default)]
pub struct EngineLog {
    pub configs: Vec<PredictorConfig>,
    pub runs: usize,
    pub reshapes: Vec<(String, Vec<usize>)>,
    pub copies: Vec<(String, HostBuffer)>,
    pub shared: Vec<(String, Tensor)>,
    pub artifacts_written: usize,
}

#[derive(Clone)]
pub struct MockEngine {
    pub log: Arc<Mutex<EngineLog>>,
    pub inputs: Vec<(String, DType)>,
    pub outputs: Vec<(String, DType, Vec<usize>)>,
    /// 1-based run, counted across predictors, that fails.
    pub fail_run: Option<usize>,
    /// Write whatever was recorded when a collection predictor drops, even
    /// if collection was never finished.
    pub flush_on_drop: bool,
}

impl MockEngine {
    pub fn new(inputs: &[(&str, DType)], outputs: &[(&str, DType, &[usize])]) -> Self {
        Self {
            log: Arc::default(),
            inputs: inputs.iter().map(|(n, d)| (n.to_string(), *d)).collect(),
            outputs: outputs
                .iter()
                .map(|(n, d, s)| (n.to_string(), *d, s.to_vec()))
                .collect(),
            fail_run: None,
            flush_on_drop: false,
        }
    }

    pub fn failing_run(mut self, run: usize) -> Self {
        self.fail_run = Some(run);
        self
    }

    pub fn flushing_on_drop(mut self) -> Self {
        self.flush_on_drop = true;
        self
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }
}

pub struct MockPredictor {
    log: Arc<Mutex<EngineLog>>,
    inputs: Vec<(String, DType)>,
    outputs: Vec<(String, DType, Vec<usize>)>,
    collect_into: Option<std::path::PathBuf>,
    fail_run: Option<usize>,
    flush_on_drop: bool,
    finished: bool,
}

impl Engine for MockEngine {
    type Predictor = MockPredictor;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_predictor(&self, config: &PredictorConfig) -> Result<MockPredictor> {
        self.log().configs.push(config.clone());
        Ok(MockPredictor {
            log: Arc::clone(&self.log),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            collect_into: config.collect_shape_range_info.clone(),
            fail_run: self.fail_run,
            flush_on_drop: self.flush_on_drop,
            finished: false,
        })
    }
}

impl Predictor for MockPredictor {
    fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|(n, _)| n.clone()).collect()
    }

    fn input_types(&self) -> HashMap<String, DType> {
        self.inputs.iter().cloned().collect()
    }

    fn reshape_input(&mut self, name: &str, shape: &[usize]) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .reshapes
            .push((name.to_string(), shape.to_vec()));
        Ok(())
    }

    fn copy_from_cpu(&mut self, name: &str, data: HostBuffer) -> Result<()> {
        self.log.lock().unwrap().copies.push((name.to_string(), data));
        Ok(())
    }

    fn share_input(&mut self, name: &str, tensor: &Tensor) -> Result<()> {
        if !self.inputs.iter().any(|(n, _)| n == name) {
            bail!("no input slot named `{name}`");
        }
        self.log
            .lock()
            .unwrap()
            .shared
            .push((name.to_string(), tensor.clone()));
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.runs += 1;
        if self.fail_run == Some(log.runs) {
            bail!("engine rejected run {}", log.runs);
        }
        Ok(())
    }

    fn copy_output_to_cpu(&mut self, name: &str) -> Result<Tensor> {
        let (_, dtype, shape) = self
            .outputs
            .iter()
            .find(|(n, _, _)| n == name)
            .with_context(|| format!("no output slot named `{name}`"))?;
        let numel = shape.iter().product::<usize>();
        let shape = Shape::from_slice(shape);
        let tensor = match dtype {
            DType::F32 => Tensor::from_host(shape, &vec![0.5f32; numel][..])?,
            DType::I64 => Tensor::from_host(shape, &vec![3i64; numel][..])?,
            other => bail!("mock cannot produce {other} outputs"),
        };
        Ok(tensor)
    }

    fn finish_shape_collection(&mut self) -> Result<()> {
        if let Some(path) = &self.collect_into {
            std::fs::write(path, "shape_range_info {}\n")?;
            self.log.lock().unwrap().artifacts_written += 1;
            self.finished = true;
        }
        Ok(())
    }
}

impl Drop for MockPredictor {
    fn drop(&mut self) {
        if let (Some(path), true, false) = (&self.collect_into, self.flush_on_drop, self.finished) {
            let _ = std::fs::write(path, "shape_range_info { name: \"partial\" }\n");
        }
    }
}

#[derive(Clone)]
pub struct MockReader {
    pub info: ModelInfo,
}

impl MockReader {
    pub fn new(
        quantized: bool,
        inputs: &[(&str, &[i64], ReaderDataType)],
        outputs: &[(&str, &[i64], ReaderDataType)],
    ) -> Self {
        let to_tensors = |list: &[(&str, &[i64], ReaderDataType)]| {
            list.iter()
                .map(|(n, s, d)| ReaderTensor::new(*n, s, *d))
                .collect::<Vec<_>>()
        };
        Self {
            info: ModelInfo {
                is_quantized: quantized,
                inputs: to_tensors(inputs),
                outputs: to_tensors(outputs),
            },
        }
    }
}

impl ModelReader for MockReader {
    fn parse(&self, bytes: &[u8]) -> Result<ModelInfo> {
        if bytes.starts_with(b"corrupt") {
            bail!("truncated program desc");
        }
        Ok(self.info.clone())
    }
}

/// Temporary model directory holding `model.pdmodel` and `model.pdiparams`.
pub struct ModelDir {
    pub dir: TempDir,
}

impl ModelDir {
    pub fn new(model_bytes: &[u8]) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("model.pdmodel"), model_bytes)?;
        std::fs::write(dir.path().join("model.pdiparams"), b"params")?;
        Ok(Self { dir })
    }

    pub fn model(&self) -> std::path::PathBuf {
        self.dir.path().join("model.pdmodel")
    }

    pub fn params(&self) -> std::path::PathBuf {
        self.dir.path().join("model.pdiparams")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Two float inputs, one float and one int64 output.
pub fn two_input_fixture() -> (MockEngine, MockReader) {
    let engine = MockEngine::new(
        &[("image", DType::F32), ("scale", DType::F32)],
        &[
            ("boxes", DType::F32, &[1, 4][..]),
            ("labels", DType::I64, &[1][..]),
        ],
    );
    let reader = MockReader::new(
        false,
        &[
            ("image", &[-1, 3, 224, 224][..], ReaderDataType::Float32),
            ("scale", &[-1, 2][..], ReaderDataType::Float32),
        ],
        &[
            ("boxes", &[-1, 4][..], ReaderDataType::Float32),
            ("labels", &[-1][..], ReaderDataType::Int64),
        ],
    );
    (engine, reader)
}

pub fn f32_input(name: &str, shape: &[usize]) -> Tensor {
    let numel = shape.iter().product::<usize>();
    Tensor::from_host(Shape::from_slice(shape), &vec![1.0f32; numel][..])
        .expect("valid input")
        .with_name(name)
}
