use infergate_core::{BackendError, Result, ShapeMap, TrtOption};
use tracing::info;

/// File the engine writes collected shape ranges to, beside the model.
pub const SHAPE_RANGE_INFO_FILE: &str = "shape_range_info.pbtxt";

/// Per-input min/max/opt bounds for dynamic-shape compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeRanges {
    pub min: ShapeMap,
    pub max: ShapeMap,
    pub opt: ShapeMap,
}

impl ShapeRanges {
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    pub fn len(&self) -> usize {
        self.min.len()
    }
}

/// Collects the bound triple of every input named in `min_shape`. Each such
/// input must also appear in `max_shape` and `opt_shape` with the same rank.
pub fn derive(trt: &TrtOption) -> Result<ShapeRanges> {
    let mut ranges = ShapeRanges::default();
    for (name, min) in &trt.min_shape {
        let max = lookup(&trt.max_shape, name, "max_shape", min.len())?;
        let opt = lookup(&trt.opt_shape, name, "opt_shape", min.len())?;

        info!(
            input = %name,
            max = %format_shape(max),
            min = %format_shape(min),
            opt = %format_shape(opt),
            "dynamic shape bounds"
        );

        ranges.max.insert(name.clone(), max.clone());
        ranges.min.insert(name.clone(), min.clone());
        ranges.opt.insert(name.clone(), opt.clone());
    }
    Ok(ranges)
}

fn lookup<'a>(
    map: &'a ShapeMap,
    name: &str,
    map_name: &'static str,
    min_rank: usize,
) -> Result<&'a Vec<usize>> {
    let shape = map.get(name).ok_or_else(|| BackendError::MissingShapeBound {
        name: name.to_string(),
        map: map_name,
    })?;
    if shape.len() != min_rank {
        return Err(BackendError::ShapeRankMismatch {
            name: name.to_string(),
            map: map_name,
            min_rank,
            rank: shape.len(),
        });
    }
    Ok(shape)
}

pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("[{}]", dims.join(", "))
}
