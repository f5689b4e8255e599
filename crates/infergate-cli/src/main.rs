mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use infergate_backend_ort::{OrtEngine, OrtModelReader};
use infergate_core::{
    Backend, BackendOption, DType, Device, Shape, Tensor, TensorInfo, TrtOption,
};
use infergate_predictor::{dtype_from_reader, ModelReader, PredictorBackend};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log filter")?)
        .init();

    match cli.command {
        Command::Inspect { model } => inspect(&model),
        Command::Run {
            model,
            params,
            device,
            option,
        } => {
            let device = parse_device(&device)?;
            let params = params.unwrap_or_else(|| model.clone());
            run(&model, &params, device, option.as_deref())
        }
    }
}

fn inspect(model: &Path) -> Result<()> {
    let bytes =
        std::fs::read(model).with_context(|| format!("failed to read {}", model.display()))?;
    let info = OrtModelReader::new().parse(&bytes)?;

    println!("quantized: {}", info.is_quantized);
    for (kind, tensors) in [("input", &info.inputs), ("output", &info.outputs)] {
        for (i, t) in tensors.iter().enumerate() {
            let dtype = dtype_from_reader(t.dtype)?;
            let info = TensorInfo::from_reader_dims(t.name.clone(), dtype, &t.shape);
            println!("{kind}[{i}] {}", describe(&info));
        }
    }
    Ok(())
}

fn run(model: &Path, params: &Path, device: Device, option: Option<&Path>) -> Result<()> {
    let mut option = match option {
        Some(path) => BackendOption::from_json_file(path)?,
        None => BackendOption::default(),
    };
    if let Device::Cuda { device_id } = device {
        option.use_gpu = true;
        option.gpu_id = i32::try_from(device_id).context("cuda device id out of range")?;
    }

    let mut backend = PredictorBackend::new(OrtEngine::new(), OrtModelReader::new());
    backend.initialize(model, params, &option)?;
    tracing::info!(backend = backend.name(), "backend initialized");

    let inputs = backend
        .input_infos()
        .iter()
        .map(|info| ones_input(info, &option.trt_option))
        .collect::<Result<Vec<_>>>()?;

    let mut outputs = Vec::new();
    let t0 = std::time::Instant::now();
    backend.infer(&inputs, &mut outputs)?;
    tracing::info!(elapsed_us = t0.elapsed().as_micros() as u64, "inference done");

    for (i, out) in outputs.iter().enumerate() {
        println!(
            "output[{i}] {}: {} {:?}",
            out.name,
            out.dtype(),
            out.shape()
        );
    }
    Ok(())
}

/// All-ones input for `info`. Dynamic dims take the configured opt shape
/// when there is one, else 1.
fn ones_input(info: &TensorInfo, trt: &TrtOption) -> Result<Tensor> {
    let dims = match trt.opt_shape.get(&info.name) {
        Some(opt) if info.is_dynamic() && opt.len() == info.rank() => opt.clone(),
        _ => info.concrete_dims(1),
    };
    let shape = Shape::from_slice(&dims);
    let numel = shape.numel();

    let tensor = match info.dtype {
        DType::F32 => Tensor::from_host(shape, &vec![1.0f32; numel][..])?,
        DType::F64 => Tensor::from_host(shape, &vec![1.0f64; numel][..])?,
        DType::I32 => Tensor::from_host(shape, &vec![1i32; numel][..])?,
        DType::I64 => Tensor::from_host(shape, &vec![1i64; numel][..])?,
        DType::I8 => Tensor::from_host(shape, &vec![1i8; numel][..])?,
        DType::U8 => Tensor::from_host(shape, &vec![1u8; numel][..])?,
        other => bail!("cannot fill input `{}` of type {other}", info.name),
    };
    Ok(tensor.with_name(info.name.clone()))
}

fn describe(info: &TensorInfo) -> String {
    let dims: Vec<String> = info
        .dims
        .iter()
        .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
        .collect();
    format!("{}: {} [{}]", info.name, info.dtype, dims.join(", "))
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
