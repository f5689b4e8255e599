use std::path::{Path, PathBuf};

use infergate_core::{
    model_dir, Backend, BackendError, BackendOption, Result, Tensor, TensorInfo,
};
use tracing::{error, info, warn};

use crate::accelerator::AcceleratorBinder;
use crate::calibrate;
use crate::config::{ConfigBuilder, DynamicShape, PredictorConfig};
use crate::engine::{dtype_from_reader, Engine, ModelReader, Predictor, ReaderTensor};
use crate::lifecycle::{Lifecycle, Ready};
use crate::shape::{self, ShapeRanges, SHAPE_RANGE_INFO_FILE};

/// Drives one engine predictor for one model.
///
/// Not safe for concurrent `infer` calls; `&mut self` keeps it that way.
pub struct PredictorBackend<E: Engine, R: ModelReader> {
    engine: E,
    reader: R,
    binder: AcceleratorBinder,
    option: BackendOption,
    state: Lifecycle<E::Predictor>,
}

impl<E: Engine, R: ModelReader> PredictorBackend<E, R> {
    pub fn new(engine: E, reader: R) -> Self {
        Self::with_accelerator(engine, reader, AcceleratorBinder::detect())
    }

    pub fn with_accelerator(engine: E, reader: R, binder: AcceleratorBinder) -> Self {
        Self {
            engine,
            reader,
            binder,
            option: BackendOption::default(),
            state: Lifecycle::Unconfigured,
        }
    }

    pub fn option(&self) -> &BackendOption {
        &self.option
    }

    /// Resolved engine configuration, once configured.
    pub fn config(&self) -> Option<&PredictorConfig> {
        self.state.config()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.ready().is_some()
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn predictor(&self) -> Option<&E::Predictor> {
        self.state.ready().map(|ready| &ready.predictor)
    }

    /// Registers the model and resolves `option` into an engine
    /// configuration. May be repeated until `initialize` succeeds.
    pub fn build_option(
        &mut self,
        model_file: impl Into<PathBuf>,
        params_file: impl Into<PathBuf>,
        option: &BackendOption,
    ) -> Result<()> {
        self.configure(model_file, params_file, option).map(drop)
    }

    fn configure(
        &mut self,
        model_file: impl Into<PathBuf>,
        params_file: impl Into<PathBuf>,
        option: &BackendOption,
    ) -> Result<PredictorConfig> {
        self.state.check_configurable()?;
        let config = ConfigBuilder::new(option, self.binder).resolve(model_file, params_file)?;
        self.option = option.clone();
        self.state = Lifecycle::Configured(config.clone());
        Ok(config)
    }

    /// One-shot setup: resolve options, read model metadata, reconcile
    /// quantization, collect shape ranges if needed, build the predictor.
    ///
    /// Any failure after the call is accepted leaves the backend `Failed`.
    pub fn initialize(
        &mut self,
        model_file: impl AsRef<Path>,
        params_file: impl AsRef<Path>,
        option: &BackendOption,
    ) -> Result<()> {
        if let Err(err) = self.state.check_configurable() {
            error!(state = self.state.name(), "{err}");
            return Err(err);
        }

        match self.try_initialize(model_file.as_ref(), params_file.as_ref(), option) {
            Ok(ready) => {
                self.state = Lifecycle::Initialized(Box::new(ready));
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "backend initialization failed");
                self.state = Lifecycle::Failed;
                Err(err)
            }
        }
    }

    fn try_initialize(
        &mut self,
        model_file: &Path,
        params_file: &Path,
        option: &BackendOption,
    ) -> Result<Ready<E::Predictor>> {
        let config = self.configure(model_file, params_file, option)?;

        // The predictor's own IO introspection is unreliable, so descriptors
        // come from the reader.
        let contents = std::fs::read(model_file).map_err(|source| BackendError::Io {
            path: model_file.to_path_buf(),
            source,
        })?;
        let info = self
            .reader
            .parse(&contents)
            .map_err(|e| BackendError::ModelParse(format!("{e:#}")))?;
        let inputs = descriptors(&info.inputs)?;
        let outputs = descriptors(&info.outputs)?;

        let builder = ConfigBuilder::new(&self.option, self.binder);
        let mut config = builder.with_quantization(config, info.is_quantized)?;

        if self.option.collect_shape && self.binder.is_present() {
            let shape_range_info = model_dir(model_file).join(SHAPE_RANGE_INFO_FILE);
            if !shape_range_info.exists() {
                self.collect_shape_range_info(model_file, params_file, &shape_range_info)?;
            }
            info!(
                path = %shape_range_info.display(),
                "loading shape range info to set TensorRT dynamic shape"
            );
            config.dynamic_shape = Some(DynamicShape::Tuned {
                path: shape_range_info,
                strict: false,
            });
        }

        let predictor = self.engine.create_predictor(&config)?;
        info!(
            engine = self.engine.name(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            quantized = info.is_quantized,
            "predictor created"
        );

        Ok(Ready {
            config,
            predictor,
            inputs,
            outputs,
        })
    }

    /// Runs a throwaway predictor over the max, min and opt shapes, then
    /// has the engine persist `shape_range_info`. A failed pass leaves no
    /// file behind, so the next initialization collects again.
    fn collect_shape_range_info(
        &self,
        model_file: &Path,
        params_file: &Path,
        shape_range_info: &Path,
    ) -> Result<()> {
        info!(path = %shape_range_info.display(), "start generating shape range info file");
        let ranges = shape::derive(&self.option.trt_option)?;
        let config =
            PredictorConfig::for_shape_collection(model_file, params_file, shape_range_info);
        let mut predictor = self.engine.create_predictor(&config)?;

        let outcome = calibrate_ranges(&mut predictor, &ranges);
        drop(predictor);
        if let Err(err) = outcome {
            discard_partial(shape_range_info);
            return Err(err);
        }

        info!("finish generating shape range info file");
        Ok(())
    }
}

fn calibrate_ranges<P: Predictor>(predictor: &mut P, ranges: &ShapeRanges) -> Result<()> {
    calibrate::run(predictor, &ranges.max)?;
    calibrate::run(predictor, &ranges.min)?;
    calibrate::run(predictor, &ranges.opt)?;
    predictor.finish_shape_collection()?;
    Ok(())
}

fn discard_partial(shape_range_info: &Path) {
    if !shape_range_info.exists() {
        return;
    }
    match std::fs::remove_file(shape_range_info) {
        Ok(()) => warn!(
            path = %shape_range_info.display(),
            "removed incomplete shape range info file"
        ),
        Err(err) => error!(
            path = %shape_range_info.display(),
            error = %err,
            "failed to remove incomplete shape range info file"
        ),
    }
}

fn descriptors(tensors: &[ReaderTensor]) -> Result<Vec<TensorInfo>> {
    tensors
        .iter()
        .map(|t| {
            let dtype = dtype_from_reader(t.dtype)?;
            Ok(TensorInfo::from_reader_dims(t.name.clone(), dtype, &t.shape))
        })
        .collect()
}

impl<E, R> Backend for PredictorBackend<E, R>
where
    E: Engine + Send,
    R: ModelReader + Send,
{
    fn name(&self) -> &'static str {
        self.engine.name()
    }

    fn input_infos(&self) -> &[TensorInfo] {
        match self.state.ready() {
            Some(ready) => &ready.inputs,
            None => &[],
        }
    }

    fn output_infos(&self) -> &[TensorInfo] {
        match self.state.ready() {
            Some(ready) => &ready.outputs,
            None => &[],
        }
    }

    fn infer(&mut self, inputs: &[Tensor], outputs: &mut Vec<Tensor>) -> Result<()> {
        let pinned = self.option.enable_pinned_memory;
        let ready = self.state.ready_mut()?;

        if inputs.len() != ready.inputs.len() {
            let err = BackendError::InputCountMismatch {
                expected: ready.inputs.len(),
                actual: inputs.len(),
            };
            error!("{err}");
            return Err(err);
        }

        for (input, info) in inputs.iter().zip(&ready.inputs) {
            // Unnamed tensors bind positionally.
            let name = if input.name.is_empty() {
                &info.name
            } else {
                &input.name
            };
            ready.predictor.share_input(name, input)?;
        }

        ready.predictor.run()?;

        outputs.resize_with(ready.outputs.len(), Tensor::default);
        for (slot, info) in outputs.iter_mut().zip(&ready.outputs) {
            let mut tensor = ready.predictor.copy_output_to_cpu(&info.name)?;
            tensor.name.clone_from(&info.name);
            tensor.set_pinned_memory(pinned);
            *slot = tensor;
        }
        Ok(())
    }
}
