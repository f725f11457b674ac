//! Serde values to Python objects
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde::Serialize;
use serde_json::Value;

/// Converts any serializable value into the equivalent Python builtins.
pub fn to_pyobject<'py, T: Serialize>(py: Python<'py>, value: &T) -> PyResult<Bound<'py, PyAny>> {
    let json = serde_json::to_value(value).map_err(|e| PyValueError::new_err(e.to_string()))?;
    json_to_pyobject(py, &json)
}

pub fn json_to_pyobject<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
    match value {
        Value::Null => Ok(py.None().into_bound(py)),
        Value::Bool(b) => Ok((*b).into_pyobject(py)?.to_owned().into_any()),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => Ok(u.into_pyobject(py)?.into_any()),
            (None, Some(i), _) => Ok(i.into_pyobject(py)?.into_any()),
            (None, None, Some(f)) => Ok(f.into_pyobject(py)?.into_any()),
            _ => Ok(n.to_string().into_pyobject(py)?.into_any()),
        },
        Value::String(s) => Ok(s.as_str().into_pyobject(py)?.into_any()),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_pyobject(py, item)?)?;
            }
            Ok(list.into_any())
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, json_to_pyobject(py, item)?)?;
            }
            Ok(dict.into_any())
        }
    }
}
