//! Engine backed by an embedded CPython interpreter (feature `cpython`)
//!
//! Declared beans are copied into the module globals before every request,
//! and names that were undeclared since the last request are removed again.
//! Host objects appear in Python as proxies whose attributes are callable
//! host methods.

use ahash::AHashSet;
use pyo3::exceptions::{PyNameError, PyRuntimeError, PySyntaxError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyTuple};
use pyo3::IntoPyObjectExt;
use scriptbridge_core::{
    BridgeError, EngineContext, HostObject, HostValue, LanguageSpec, ScriptEngine, ScriptSource,
};
use scriptbridge_logger as logger;
use std::any::Any;
use std::sync::Arc;

pub const LANGUAGE_ID: &str = "cpython";
pub const EXTENSIONS: &[&str] = &["py3"];

/// Filename compiled scripts carry, so their frames can be told apart in a
/// traceback.
const SCRIPT_FILENAME: &str = "<script>";

pub fn language_spec() -> LanguageSpec {
    LanguageSpec::new(LANGUAGE_ID, EXTENSIONS, || Box::new(CPythonEngine::default()))
}

/// A Python object travelling through the bridge.
#[derive(Debug)]
struct PyObjectHandle {
    object: Py<PyAny>,
    type_name: String,
}

impl HostObject for PyObjectHandle {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke(&self, method: &str, args: &[HostValue]) -> Result<HostValue, BridgeError> {
        Python::attach(|py| {
            let args = to_python_args(py, args)?;
            let result = self.object.bind(py).call_method1(method, args)?;
            from_python(&result)
        })
        .map_err(|e| call_failure(method, e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[pyclass(name = "HostObject", frozen)]
struct PyHostObject {
    object: Arc<dyn HostObject>,
}

#[pymethods]
impl PyHostObject {
    fn __getattr__(&self, name: String) -> PyHostMethod {
        PyHostMethod {
            object: self.object.clone(),
            method: name,
        }
    }

    fn __repr__(&self) -> String {
        format!("<{} object>", self.object.type_name())
    }
}

#[pyclass(name = "HostMethod", frozen)]
struct PyHostMethod {
    object: Arc<dyn HostObject>,
    method: String,
}

#[pymethods]
impl PyHostMethod {
    #[pyo3(signature = (*args))]
    fn __call__(&self, py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyResult<Py<PyAny>> {
        let args = args
            .iter()
            .map(|a| from_python(&a))
            .collect::<PyResult<Vec<_>>>()?;
        let result = self
            .object
            .invoke(&self.method, &args)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        to_python(py, &result)
    }
}

fn to_python(py: Python<'_>, value: &HostValue) -> PyResult<Py<PyAny>> {
    match value {
        HostValue::Null => Ok(py.None()),
        HostValue::Bool(b) => (*b).into_py_any(py),
        HostValue::Int(i) => (*i).into_py_any(py),
        HostValue::Float(f) => (*f).into_py_any(py),
        HostValue::Str(s) => s.as_str().into_py_any(py),
        HostValue::Object(object) => match object.as_any().downcast_ref::<PyObjectHandle>() {
            Some(handle) => Ok(handle.object.clone_ref(py)),
            None => PyHostObject {
                object: object.clone(),
            }
            .into_py_any(py),
        },
    }
}

fn to_python_args<'py>(py: Python<'py>, args: &[HostValue]) -> PyResult<Bound<'py, PyTuple>> {
    let args = args
        .iter()
        .map(|a| to_python(py, a))
        .collect::<PyResult<Vec<_>>>()?;
    PyTuple::new(py, args)
}

fn from_python(object: &Bound<'_, PyAny>) -> PyResult<HostValue> {
    if object.is_none() {
        return Ok(HostValue::Null);
    }
    if let Ok(b) = object.cast::<PyBool>() {
        return Ok(HostValue::Bool(b.is_true()));
    }
    if object.is_instance_of::<PyInt>() {
        if let Ok(i) = object.extract::<i64>() {
            return Ok(HostValue::Int(i));
        }
    } else if let Ok(f) = object.cast::<PyFloat>() {
        return Ok(HostValue::Float(f.value()));
    } else if let Ok(s) = object.extract::<String>() {
        return Ok(HostValue::Str(s));
    }
    if let Ok(proxy) = object.cast::<PyHostObject>() {
        return Ok(HostValue::Object(proxy.get().object.clone()));
    }
    let type_name = object
        .get_type()
        .name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "object".to_string());
    Ok(HostValue::object(PyObjectHandle {
        object: object.clone().unbind(),
        type_name,
    }))
}

fn call_failure(method: &str, err: PyErr) -> BridgeError {
    BridgeError::Call {
        method: method.to_string(),
        message: err.to_string(),
        cause: Some(Box::new(err)),
    }
}

/// Pull the name out of "name 'foo' is not defined".
fn undefined_name(message: &str) -> String {
    message
        .split('\'')
        .nth(1)
        .unwrap_or(message)
        .to_string()
}

/// Line and column inside the submitted text where `err` was raised.
fn error_position(py: Python<'_>, err: &PyErr) -> Option<(u32, u32)> {
    let value = err.value(py);
    if err.is_instance_of::<PySyntaxError>(py) {
        let filename: String = value.getattr("filename").ok()?.extract().ok()?;
        if filename != SCRIPT_FILENAME {
            return None;
        }
        let line = value.getattr("lineno").ok()?.extract::<u32>().ok()?;
        let column = value
            .getattr("offset")
            .ok()
            .and_then(|o| o.extract::<u32>().ok())
            .unwrap_or(1);
        return Some((line, column));
    }

    // The innermost frame that belongs to the script itself.
    let mut line = None;
    let mut traceback = err.traceback(py).map(Bound::into_any);
    while let Some(current) = traceback {
        let filename: Option<String> = current
            .getattr("tb_frame")
            .and_then(|frame| frame.getattr("f_code"))
            .and_then(|code| code.getattr("co_filename"))
            .and_then(|name| name.extract::<String>().map_err(Into::into))
            .ok();
        if filename.as_deref() == Some(SCRIPT_FILENAME) {
            line = current
                .getattr("tb_lineno")
                .and_then(|l| l.extract::<u32>().map_err(Into::into))
                .ok()
                .or(line);
        }
        traceback = current.getattr("tb_next").ok().filter(|next| !next.is_none());
    }
    line.map(|line| (line, 1))
}

fn script_failure(source: &ScriptSource, err: PyErr) -> BridgeError {
    Python::attach(|py| {
        let location = match error_position(py, &err) {
            Some((line, column)) => source.locate(line, column),
            None => source.start(),
        };
        if err.is_instance_of::<PyNameError>(py) {
            let message = err.value(py).to_string();
            BridgeError::UndefinedName {
                name: undefined_name(&message),
                location: Some(location),
            }
        } else {
            BridgeError::Execution {
                location,
                message: err.to_string(),
                cause: Some(Box::new(err)),
            }
        }
    })
}

/// Compile and run `text` in `globals`.
///
/// With `keep_value`, a trailing expression statement is split off and
/// evaluated after the rest has run, and its value returned, as an
/// interactive prompt does. Otherwise the result is `None`.
fn run_script<'py>(
    py: Python<'py>,
    globals: &Bound<'py, PyDict>,
    text: &str,
    keep_value: bool,
) -> PyResult<Bound<'py, PyAny>> {
    let ast = py.import("ast")?;
    let builtins = py.import("builtins")?;
    let compile = builtins.getattr("compile")?;

    let tree = ast.call_method1("parse", (text, SCRIPT_FILENAME, "exec"))?;
    let body = tree.getattr("body")?;
    let mut tail = None;
    if keep_value && body.len()? > 0 {
        let last = body.get_item(-1)?;
        if last.is_instance(&ast.getattr("Expr")?)? {
            body.del_item(-1)?;
            tail = Some(last.getattr("value")?);
        }
    }

    let module = compile.call1((&tree, SCRIPT_FILENAME, "exec"))?;
    builtins.getattr("exec")?.call1((module, globals))?;
    match tail {
        Some(expr) => {
            let expression = ast.getattr("Expression")?.call1((expr,))?;
            let code = compile.call1((expression, SCRIPT_FILENAME, "eval"))?;
            builtins.getattr("eval")?.call1((code, globals))
        }
        None => Ok(py.None().into_bound(py)),
    }
}

struct State {
    ctx: EngineContext,
    globals: Py<PyDict>,
    synced: AHashSet<String>,
}

impl State {
    /// Mirror the declared beans into the module globals.
    fn sync_beans(&mut self, py: Python<'_>) -> PyResult<()> {
        let globals = self.globals.bind(py);
        let mut current = AHashSet::new();
        for bean in self.ctx.beans().declared() {
            let value = match bean.declared_type {
                Some(bean_type) => bean_type
                    .coerce(&bean.value)
                    .map_err(|e| PyRuntimeError::new_err(e.to_string()))?,
                None => bean.value,
            };
            globals.set_item(&bean.name, to_python(py, &value)?)?;
            current.insert(bean.name);
        }
        for stale in self.synced.difference(&current) {
            if globals.contains(stale)? {
                globals.del_item(stale)?;
            }
        }
        self.synced = current;
        Ok(())
    }

    /// Run `f` with `sys.stdout` captured into the engine's output sink.
    fn capture_stdout<T>(&self, py: Python<'_>, f: impl FnOnce() -> PyResult<T>) -> PyResult<T> {
        let sys = py.import("sys")?;
        let buffer = py.import("io")?.call_method0("StringIO")?;
        let previous = sys.getattr("stdout")?;
        sys.setattr("stdout", &buffer)?;
        let result = f();
        sys.setattr("stdout", previous)?;
        let text: String = buffer.call_method0("getvalue")?.extract()?;
        self.ctx.output().write_str(&text)?;
        result
    }
}

#[derive(Default)]
pub struct CPythonEngine {
    state: Option<State>,
}

impl CPythonEngine {
    fn state(&mut self) -> Result<&mut State, BridgeError> {
        self.state
            .as_mut()
            .ok_or_else(|| BridgeError::IllegalState("cpython engine is not initialized".to_string()))
    }
}

impl ScriptEngine for CPythonEngine {
    fn initialize(&mut self, ctx: EngineContext) -> Result<(), BridgeError> {
        ctx.install_bridge_binding();
        let globals = Python::attach(|py| -> PyResult<Py<PyDict>> {
            let globals = PyDict::new(py);
            globals.set_item("__builtins__", py.import("builtins")?)?;
            Ok(globals.unbind())
        })
        .map_err(|e| BridgeError::IllegalState(format!("failed to initialize CPython: {}", e)))?;
        logger::debug(&format!("Initialized '{}' engine", ctx.language()));
        self.state = Some(State {
            ctx,
            globals,
            synced: AHashSet::new(),
        });
        Ok(())
    }

    fn exec(&mut self, source: &ScriptSource) -> Result<(), BridgeError> {
        let state = self.state()?;
        Python::attach(|py| {
            state.sync_beans(py)?;
            let globals = state.globals.bind(py);
            state.capture_stdout(py, || run_script(py, globals, &source.text, false).map(drop))
        })
        .map_err(|e| script_failure(source, e))
    }

    fn eval(&mut self, source: &ScriptSource) -> Result<HostValue, BridgeError> {
        let state = self.state()?;
        Python::attach(|py| {
            state.sync_beans(py)?;
            let globals = state.globals.bind(py);
            state.capture_stdout(py, || {
                run_script(py, globals, &source.text, true).and_then(|value| from_python(&value))
            })
        })
        .map_err(|e| script_failure(source, e))
    }

    fn call(
        &mut self,
        object: Option<&str>,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        let state = self.state()?;
        Python::attach(|py| {
            state.sync_beans(py).map_err(|e| call_failure(method, e))?;
            let globals = state.globals.bind(py);
            let args = to_python_args(py, args).map_err(|e| call_failure(method, e))?;
            let result = match object {
                None => {
                    let callee = globals
                        .get_item(method)
                        .map_err(|e| call_failure(method, e))?
                        .ok_or_else(|| {
                            BridgeError::call(method, format!("name '{}' is not defined", method))
                        })?;
                    callee.call1(args)
                }
                Some(name) => {
                    let receiver = match state.ctx.beans().lookup(name) {
                        Some(bean) => to_python(py, &bean.value)
                            .map_err(|e| call_failure(method, e))?
                            .into_bound(py),
                        None => globals
                            .get_item(name)
                            .map_err(|e| call_failure(method, e))?
                            .ok_or_else(|| BridgeError::undefined_name(name))?,
                    };
                    receiver.call_method1(method, args)
                }
            };
            result
                .and_then(|v| from_python(&v))
                .map_err(|e| call_failure(method, e))
        })
    }

    fn terminate(&mut self) {
        if self.state.take().is_some() {
            logger::debug("Terminated cpython engine");
        }
    }
}
