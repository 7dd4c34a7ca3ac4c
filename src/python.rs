use std::path::Path;

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::CorrectionConfig;
use crate::engine::{CancelToken, CorrectionRequest, CorrectionResult, Corrector};
use crate::error::CleanError;

fn to_py_err(e: CleanError) -> PyErr {
    match e {
        CleanError::Io(_) | CleanError::Persist { .. } => PyIOError::new_err(e.to_string()),
        CleanError::Config(_) | CleanError::Json(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Render any Python value as cell text; `None` is the empty string.
fn cell_text(value: &Bound<'_, PyAny>) -> PyResult<String> {
    if value.is_none() {
        return Ok(String::new());
    }
    Ok(value.str()?.to_string())
}

/// Correction outcome returned to Python
#[pyclass(name = "CorrectionResult")]
#[derive(Clone)]
struct PyCorrectionResult {
    #[pyo3(get)]
    original: String,
    #[pyo3(get)]
    corrected: String,
    #[pyo3(get)]
    confidence: f64,
    #[pyo3(get)]
    source: Option<String>,
}

impl From<CorrectionResult> for PyCorrectionResult {
    fn from(result: CorrectionResult) -> Self {
        Self {
            original: result.original,
            corrected: result.corrected,
            confidence: result.confidence,
            source: result.source.map(|s| s.to_string()),
        }
    }
}

#[pyclass(name = "Corrector")]
struct PyCorrector {
    inner: Corrector,
}

#[pymethods]
impl PyCorrector {
    /// Without a path, sources are looked up in the platform data directory.
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => CorrectionConfig::load(Path::new(&path)).map_err(to_py_err)?,
            None => CorrectionConfig::in_default_data_dir(),
        };
        let inner = Corrector::from_config(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[pyo3(signature = (value, column=None))]
    fn correct(&self, value: &Bound<'_, PyAny>, column: Option<String>) -> PyResult<PyCorrectionResult> {
        let mut request = CorrectionRequest::new(cell_text(value)?);
        request.column_hint = column;
        Ok(self.inner.correct(&request).into())
    }

    #[pyo3(signature = (text, column=None))]
    fn correct_text(&self, text: String, column: Option<String>) -> PyCorrectionResult {
        self.inner.correct_text(&text, column.as_deref()).into()
    }

    /// Corrected values, one per input value.
    fn correct_column(&self, py: Python<'_>, column: String, values: Vec<Py<PyAny>>) -> PyResult<Vec<String>> {
        let values = values
            .iter()
            .map(|v| cell_text(v.bind(py)))
            .collect::<PyResult<Vec<String>>>()?;
        Ok(self.inner.correct_column(&column, &values, &CancelToken::new()).values)
    }

    fn learn(&self, original: String, canonical: String) -> PyResult<()> {
        self.inner.learn(&original, &canonical).map_err(to_py_err)
    }

    fn protect(&self, term: String) -> PyResult<bool> {
        self.inner.protect(&term).map_err(to_py_err)
    }

    fn change_log_json(&self) -> PyResult<String> {
        self.inner.change_log().to_json().map_err(to_py_err)
    }

    /// (hits, misses, entries)
    fn cache_stats(&self) -> (u64, u64, usize) {
        let stats = self.inner.cache_stats();
        (stats.hits, stats.misses, stats.entries)
    }
}

#[pymodule]
fn rust_field_clean(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCorrector>()?;
    m.add_class::<PyCorrectionResult>()?;
    Ok(())
}
