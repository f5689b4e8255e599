use infergate_core::{BackendError, Result, ShapeMap};
use tracing::debug;

use crate::engine::{HostBuffer, Predictor};

/// Binds a buffer of ones to every engine input, shaped by `shapes`, and runs
/// the engine once so its shape-range profiler records those shapes.
///
/// All inputs are checked before anything is bound, so a rejected call never
/// reaches `Predictor::run`.
pub fn run<P: Predictor + ?Sized>(predictor: &mut P, shapes: &ShapeMap) -> Result<()> {
    let input_types = predictor.input_types();
    let mut fillers = Vec::new();

    for name in predictor.input_names() {
        let (Some(shape), Some(dtype)) = (shapes.get(&name), input_types.get(&name)) else {
            return Err(BackendError::UnboundDynamicInput { name });
        };
        let numel: usize = shape.iter().product();
        let Some(buffer) = HostBuffer::ones(*dtype, numel) else {
            return Err(BackendError::UnsupportedCalibrationType {
                name,
                dtype: *dtype,
            });
        };
        fillers.push((name, shape, buffer));
    }

    for (name, shape, buffer) in fillers {
        debug!(input = %name, ?shape, dtype = %buffer.dtype(), "binding calibration input");
        predictor.reshape_input(&name, shape)?;
        predictor.copy_from_cpu(&name, buffer)?;
    }

    predictor.run()?;
    Ok(())
}
