use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Input name to shape.
pub type ShapeMap = BTreeMap<String, Vec<usize>>;

/// TensorRT subgraph options. Only read when `BackendOption::enable_trt` is
/// set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrtOption {
    pub enable_fp16: bool,
    pub max_workspace_size: usize,
    /// Requested engine cache file. The engine writes its cache beside the
    /// model file instead; a non-empty value only turns static caching on.
    pub serialize_file: String,
    pub min_shape: ShapeMap,
    pub max_shape: ShapeMap,
    pub opt_shape: ShapeMap,
}

impl Default for TrtOption {
    fn default() -> Self {
        Self {
            enable_fp16: false,
            max_workspace_size: 1 << 30,
            serialize_file: String::new(),
            min_shape: ShapeMap::new(),
            max_shape: ShapeMap::new(),
            opt_shape: ShapeMap::new(),
        }
    }
}

impl TrtOption {
    /// Registers the min/opt/max bounds of one dynamic input.
    pub fn set_shape(
        &mut self,
        name: impl Into<String>,
        min: Vec<usize>,
        opt: Vec<usize>,
        max: Vec<usize>,
    ) {
        let name = name.into();
        self.min_shape.insert(name.clone(), min);
        self.opt_shape.insert(name.clone(), opt);
        self.max_shape.insert(name, max);
    }
}

/// Caller-facing backend configuration. Cloned into the backend at build
/// time and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendOption {
    pub use_gpu: bool,
    /// Initial GPU memory pool, in MB.
    pub gpu_mem_init_size: u64,
    pub gpu_id: i32,

    pub enable_trt: bool,
    pub trt_option: TrtOption,
    /// Profile input shapes once and reuse `shape_range_info.pbtxt`.
    pub collect_shape: bool,

    /// <= 0 selects the default of 8 math-library threads.
    pub cpu_thread_num: i32,
    pub enable_log_info: bool,
    pub delete_pass_names: Vec<String>,

    pub enable_mkldnn: bool,
    pub mkldnn_cache_size: i32,

    pub enable_pinned_memory: bool,
}

impl Default for BackendOption {
    fn default() -> Self {
        Self {
            use_gpu: false,
            gpu_mem_init_size: 100,
            gpu_id: 0,
            enable_trt: false,
            trt_option: TrtOption::default(),
            collect_shape: false,
            cpu_thread_num: -1,
            enable_log_info: false,
            delete_pass_names: Vec::new(),
            enable_mkldnn: true,
            mkldnn_cache_size: 1,
            enable_pinned_memory: false,
        }
    }
}

impl BackendOption {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid backend option JSON")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read backend option {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}
