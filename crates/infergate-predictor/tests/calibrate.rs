mod common;

use std::collections::BTreeMap;

use anyhow::Result;
use common::MockEngine;
use infergate_core::{BackendError, DType};
use infergate_predictor::{calibrate, Engine, HostBuffer, PredictorConfig};

fn shapes(entries: &[(&str, &[usize])]) -> BTreeMap<String, Vec<usize>> {
    entries
        .iter()
        .map(|(name, shape)| (name.to_string(), shape.to_vec()))
        .collect()
}

#[test]
fn fills_float_input_with_ones_and_runs_once() -> Result<()> {
    let engine = MockEngine::new(&[("x", DType::F32)], &[]);
    let mut predictor = engine.create_predictor(&PredictorConfig::new("m", "p"))?;

    calibrate::run(&mut predictor, &shapes(&[("x", &[1, 3, 224, 224])]))?;

    let log = engine.log();
    assert_eq!(log.runs, 1);
    assert_eq!(log.reshapes, vec![("x".to_string(), vec![1, 3, 224, 224])]);
    assert_eq!(log.copies.len(), 1);
    let (name, buffer) = &log.copies[0];
    assert_eq!(name, "x");
    match buffer {
        HostBuffer::F32(values) => {
            assert_eq!(values.len(), 150_528);
            assert!(values.iter().all(|v| *v == 1.0));
        }
        other => panic!("expected f32 filler, got {:?}", other.dtype()),
    }
    Ok(())
}

#[test]
fn integer_inputs_get_integer_fillers() -> Result<()> {
    let engine = MockEngine::new(&[("ids", DType::I64), ("mask", DType::I32)], &[]);
    let mut predictor = engine.create_predictor(&PredictorConfig::new("m", "p"))?;

    calibrate::run(
        &mut predictor,
        &shapes(&[("ids", &[2, 16]), ("mask", &[2, 16])]),
    )?;

    let log = engine.log();
    assert_eq!(log.runs, 1);
    assert_eq!(log.copies[0].1, HostBuffer::I64(vec![1; 32]));
    assert_eq!(log.copies[1].1, HostBuffer::I32(vec![1; 32]));
    Ok(())
}

#[test]
fn every_call_runs_the_engine_once() -> Result<()> {
    let engine = MockEngine::new(&[("x", DType::F32)], &[]);
    let mut predictor = engine.create_predictor(&PredictorConfig::new("m", "p"))?;

    for shape in [&[8, 3][..], &[1, 3][..], &[4, 3][..]] {
        calibrate::run(&mut predictor, &shapes(&[("x", shape)]))?;
    }

    let log = engine.log();
    assert_eq!(log.runs, 3);
    let reshaped: Vec<_> = log.reshapes.iter().map(|(_, s)| s.clone()).collect();
    assert_eq!(reshaped, vec![vec![8, 3], vec![1, 3], vec![4, 3]]);
    Ok(())
}

#[test]
fn unsupported_element_type_never_runs() -> Result<()> {
    for dtype in [DType::F16, DType::F64, DType::U8, DType::I8, DType::Bool] {
        let engine = MockEngine::new(&[("x", DType::F32), ("y", dtype)], &[]);
        let mut predictor = engine.create_predictor(&PredictorConfig::new("m", "p"))?;

        let err = calibrate::run(&mut predictor, &shapes(&[("x", &[1, 2]), ("y", &[1, 2])]))
            .unwrap_err();
        match err {
            BackendError::UnsupportedCalibrationType { name, dtype: got } => {
                assert_eq!(name, "y");
                assert_eq!(got, dtype);
            }
            other => panic!("unexpected error {other}"),
        }

        let log = engine.log();
        assert_eq!(log.runs, 0);
        assert!(log.copies.is_empty());
    }
    Ok(())
}

#[test]
fn input_without_shape_is_unbound() -> Result<()> {
    let engine = MockEngine::new(&[("x", DType::F32), ("y", DType::F32)], &[]);
    let mut predictor = engine.create_predictor(&PredictorConfig::new("m", "p"))?;

    let err = calibrate::run(&mut predictor, &shapes(&[("x", &[1, 2])])).unwrap_err();
    assert!(matches!(err, BackendError::UnboundDynamicInput { ref name } if name == "y"));
    assert_eq!(engine.log().runs, 0);
    Ok(())
}
