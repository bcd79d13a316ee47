//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::EqError;

mod equalizer_bindings;

impl From<EqError> for PyErr {
    fn from(err: EqError) -> PyErr {
        match err {
            EqError::InvalidConfig(_) | EqError::OutOfRange(_) => PyValueError::new_err(err.to_string()),
            EqError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn band_equalizer(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<equalizer_bindings::PyEqualizer>()?;
    Ok(())
}
