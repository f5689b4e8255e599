//! Hand-encoded ONNX graphs, so the tests need no model files on disk.

#![allow(dead_code)]

fn varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn int_field(out: &mut Vec<u8>, field: u64, v: u64) {
    varint(out, field << 3);
    varint(out, v);
}

fn bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    varint(out, (field << 3) | 2);
    varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// `float[n, 3]` value info.
fn value_info(name: &str) -> Vec<u8> {
    let mut dynamic = Vec::new();
    bytes_field(&mut dynamic, 2, b"n");
    let mut fixed = Vec::new();
    int_field(&mut fixed, 1, 3);

    let mut shape = Vec::new();
    bytes_field(&mut shape, 1, &dynamic);
    bytes_field(&mut shape, 1, &fixed);

    let mut tensor = Vec::new();
    int_field(&mut tensor, 1, 1);
    bytes_field(&mut tensor, 2, &shape);

    let mut ty = Vec::new();
    bytes_field(&mut ty, 1, &tensor);

    let mut info = Vec::new();
    bytes_field(&mut info, 1, name.as_bytes());
    bytes_field(&mut info, 2, &ty);
    info
}

/// Single `op` node over `inputs` producing `y`, all `float[n, 3]`.
fn single_node_model(op: &str, inputs: &[&str]) -> Vec<u8> {
    let mut node = Vec::new();
    for input in inputs {
        bytes_field(&mut node, 1, input.as_bytes());
    }
    bytes_field(&mut node, 2, b"y");
    bytes_field(&mut node, 3, b"node");
    bytes_field(&mut node, 4, op.as_bytes());

    let mut graph = Vec::new();
    bytes_field(&mut graph, 1, &node);
    bytes_field(&mut graph, 2, b"test_graph");
    for input in inputs {
        bytes_field(&mut graph, 11, &value_info(input));
    }
    bytes_field(&mut graph, 12, &value_info("y"));

    let mut opset = Vec::new();
    int_field(&mut opset, 2, 13);

    let mut model = Vec::new();
    int_field(&mut model, 1, 8);
    bytes_field(&mut model, 2, b"infergate-tests");
    bytes_field(&mut model, 7, &graph);
    bytes_field(&mut model, 8, &opset);
    model
}

/// `y = Identity(x)`.
pub fn identity_model() -> Vec<u8> {
    single_node_model("Identity", &["x"])
}

/// `y = Add(x, z)`.
pub fn add_model() -> Vec<u8> {
    single_node_model("Add", &["x", "z"])
}

pub fn write_identity_model(dir: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    write_model(dir, "identity.onnx", &identity_model())
}

pub fn write_model(
    dir: &std::path::Path,
    file: &str,
    bytes: &[u8],
) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join(file);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
