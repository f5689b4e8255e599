//! Text-format shape range files: one `shape_range_info` block per input
//! with repeated `min_shape`, `max_shape` and `opt_shape` dims.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use infergate_predictor::ShapeRanges;
use tracing::{info, warn};

pub fn to_pbtxt(ranges: &ShapeRanges) -> String {
    let mut out = String::new();
    for (name, min) in &ranges.min {
        out.push_str("shape_range_info {\n");
        out.push_str(&format!("  name: \"{name}\"\n"));
        let maps = [
            ("min_shape", &ranges.min),
            ("max_shape", &ranges.max),
            ("opt_shape", &ranges.opt),
        ];
        for (key, map) in maps {
            let dims = map.get(name).unwrap_or(min);
            for dim in dims {
                out.push_str(&format!("  {key}: {dim}\n"));
            }
        }
        out.push_str("}\n");
    }
    out
}

pub fn parse_pbtxt(text: &str) -> Result<ShapeRanges> {
    let mut ranges = ShapeRanges::default();
    let mut block: Option<Block> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let lineno = idx + 1;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "shape_range_info {" {
            ensure!(block.is_none(), "line {lineno}: nested shape_range_info block");
            block = Some(Block::default());
            continue;
        }
        if line == "}" {
            let done = block
                .take()
                .with_context(|| format!("line {lineno}: unbalanced `}}`"))?;
            done.finish(&mut ranges)
                .with_context(|| format!("line {lineno}: incomplete shape_range_info block"))?;
            continue;
        }

        let current = block
            .as_mut()
            .with_context(|| format!("line {lineno}: field outside shape_range_info block"))?;
        let (key, value) = line
            .split_once(':')
            .with_context(|| format!("line {lineno}: expected `key: value`"))?;
        let value = value.trim();
        match key.trim() {
            "name" => current.name = Some(value.trim_matches('"').to_string()),
            "min_shape" => current.min.push(parse_dim(value, lineno)?),
            "max_shape" => current.max.push(parse_dim(value, lineno)?),
            "opt_shape" => current.opt.push(parse_dim(value, lineno)?),
            // Value ranges of shape tensors are not used for profiles.
            _ => {}
        }
    }

    ensure!(block.is_none(), "unterminated shape_range_info block");
    Ok(ranges)
}

pub fn read_pbtxt(path: &Path) -> Result<ShapeRanges> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shape range file {}", path.display()))?;
    parse_pbtxt(&text).with_context(|| format!("malformed shape range file {}", path.display()))
}

fn parse_dim(value: &str, lineno: usize) -> Result<usize> {
    value
        .parse()
        .with_context(|| format!("line {lineno}: invalid dimension `{value}`"))
}

#[derive(Default)]
struct Block {
    name: Option<String>,
    min: Vec<usize>,
    max: Vec<usize>,
    opt: Vec<usize>,
}

impl Block {
    fn finish(self, ranges: &mut ShapeRanges) -> Result<()> {
        let Some(name) = self.name else {
            bail!("missing name");
        };
        ensure!(
            self.min.len() == self.max.len() && self.min.len() == self.opt.len(),
            "`{name}` has ranks min={} max={} opt={}",
            self.min.len(),
            self.max.len(),
            self.opt.len()
        );
        ranges.min.insert(name.clone(), self.min);
        ranges.max.insert(name.clone(), self.max);
        ranges.opt.insert(name, self.opt);
        Ok(())
    }
}

/// Profiles input shapes across runs. Nothing reaches disk until `finish`;
/// a recorder dropped before that discards what it saw.
///
/// Min and max are elementwise over every observed shape; opt is the most
/// recent one.
pub struct ShapeRangeRecorder {
    path: PathBuf,
    ranges: ShapeRanges,
    finished: bool,
}

impl ShapeRangeRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ranges: ShapeRanges::default(),
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ranges(&self) -> &ShapeRanges {
        &self.ranges
    }

    pub fn record(&mut self, name: &str, shape: &[usize]) {
        let ranges = &mut self.ranges;
        let prev_rank = ranges.min.get(name).map(Vec::len);
        if prev_rank == Some(shape.len()) {
            if let (Some(min), Some(max)) = (ranges.min.get_mut(name), ranges.max.get_mut(name)) {
                for ((lo, hi), dim) in min.iter_mut().zip(max.iter_mut()).zip(shape) {
                    *lo = (*lo).min(*dim);
                    *hi = (*hi).max(*dim);
                }
            }
        } else {
            if let Some(from) = prev_rank {
                warn!(
                    input = %name,
                    from,
                    to = shape.len(),
                    "input rank changed, restarting its range"
                );
            }
            ranges.min.insert(name.to_string(), shape.to_vec());
            ranges.max.insert(name.to_string(), shape.to_vec());
        }
        ranges.opt.insert(name.to_string(), shape.to_vec());
    }

    /// Writes the shape range file. Later calls are no-ops.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        ensure!(
            !self.ranges.is_empty(),
            "no input shapes recorded for {}",
            self.path.display()
        );
        std::fs::write(&self.path, to_pbtxt(&self.ranges))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.finished = true;
        info!(
            path = %self.path.display(),
            inputs = self.ranges.len(),
            "wrote shape range file"
        );
        Ok(())
    }
}

impl Drop for ShapeRangeRecorder {
    fn drop(&mut self) {
        if !self.finished && !self.ranges.is_empty() {
            warn!(
                path = %self.path.display(),
                "shape collection was not finished, discarding recorded ranges"
            );
        }
    }
}

/// Renders one bound map as a TensorRT profile string,
/// e.g. `x:1x3x224x224,scale:1x2`.
pub fn profile_string(shapes: &BTreeMap<String, Vec<usize>>) -> String {
    shapes
        .iter()
        .map(|(name, dims)| {
            let dims: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("{name}:{}", dims.join("x"))
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_strings_join_dims_with_x() {
        let mut shapes = BTreeMap::new();
        shapes.insert("x".to_string(), vec![1, 3, 224, 224]);
        shapes.insert("scale".to_string(), vec![1, 2]);
        assert_eq!(profile_string(&shapes), "scale:1x2,x:1x3x224x224");
    }

    #[test]
    fn rank_change_restarts_the_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = ShapeRangeRecorder::new(dir.path().join("ranges.pbtxt"));
        recorder.record("x", &[4, 3]);
        recorder.record("x", &[2, 3, 8]);
        assert_eq!(recorder.ranges().min["x"], vec![2, 3, 8]);
        assert_eq!(recorder.ranges().max["x"], vec![2, 3, 8]);
    }

    #[test]
    fn rejects_blocks_with_mismatched_ranks() {
        let text = "shape_range_info {\n  name: \"x\"\n  min_shape: 1\n  \
                    max_shape: 4\n  max_shape: 3\n  opt_shape: 2\n}\n";
        let err = parse_pbtxt(text).unwrap_err();
        assert!(format!("{err:#}").contains("incomplete shape_range_info block"));
    }

    #[test]
    fn ignores_value_ranges_and_comments() {
        let text = "# collected\nshape_range_info {\n  name: \"n\"\n  min_shape: 1\n  \
                    max_shape: 1\n  opt_shape: 1\n  min_value: 3\n}\n";
        let ranges = parse_pbtxt(text).unwrap();
        assert_eq!(ranges.opt["n"], vec![1]);
    }
}
