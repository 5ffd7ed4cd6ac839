//! [`ScriptEngine`] implementation backed by the embedded interpreter

use crate::errors::{ErrorKind, ScriptError};
use crate::interpreter::Interpreter;
use crate::value::{from_host, to_host, Value};
use scriptbridge_core::{BridgeError, EngineContext, HostValue, ScriptEngine, ScriptSource};
use scriptbridge_logger as logger;

#[derive(Default)]
pub struct PythonEngine {
    interpreter: Option<Interpreter>,
}

impl PythonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn interpreter(&mut self) -> Result<&mut Interpreter, BridgeError> {
        self.interpreter
            .as_mut()
            .ok_or_else(|| BridgeError::IllegalState("python engine is not initialized".to_string()))
    }
}

/// Translate an interpreter failure in `source` into a bridge error.
fn script_error(err: ScriptError, source: &ScriptSource) -> BridgeError {
    let location = source.locate(err.line.max(1), err.column.max(1));
    match err {
        ScriptError {
            kind: ErrorKind::NameError(name),
            ..
        } => BridgeError::UndefinedName {
            name,
            location: Some(location),
        },
        ScriptError {
            kind: ErrorKind::Host(inner),
            ..
        } => inner.at(location),
        other => BridgeError::Execution {
            location,
            message: other.to_string(),
            cause: Some(Box::new(other)),
        },
    }
}

/// Translate a failure of a host-initiated call into a bridge error.
fn call_error(err: ScriptError, method: &str) -> BridgeError {
    match err {
        ScriptError {
            kind: ErrorKind::NameError(name),
            ..
        } => BridgeError::undefined_name(name),
        ScriptError {
            kind: ErrorKind::Host(inner),
            ..
        } => inner,
        other => BridgeError::Call {
            method: method.to_string(),
            message: other.to_string(),
            cause: Some(Box::new(other)),
        },
    }
}

fn marshal_args(args: &[HostValue]) -> Vec<Value> {
    args.iter().cloned().map(from_host).collect()
}

impl ScriptEngine for PythonEngine {
    fn initialize(&mut self, ctx: EngineContext) -> Result<(), BridgeError> {
        if self.interpreter.is_some() {
            return Err(BridgeError::IllegalState(
                "python engine is already initialized".to_string(),
            ));
        }
        ctx.install_bridge_binding();
        logger::debug(&format!(
            "Initialized '{}' engine, bridge bound as '{}'",
            ctx.language(),
            ctx.bridge_binding()
        ));
        self.interpreter = Some(Interpreter::new(ctx.beans().clone(), ctx.output().clone()));
        Ok(())
    }

    fn exec(&mut self, source: &ScriptSource) -> Result<(), BridgeError> {
        tracing::debug!(source = %source.source_name, line = source.line, "exec");
        self.interpreter()?
            .run(&source.text)
            .map(|_| ())
            .map_err(|e| script_error(e, source))
    }

    fn eval(&mut self, source: &ScriptSource) -> Result<HostValue, BridgeError> {
        tracing::debug!(source = %source.source_name, line = source.line, "eval");
        self.interpreter()?
            .run(&source.text)
            .map(|v| to_host(&v))
            .map_err(|e| script_error(e, source))
    }

    /// Interactive mode consumes only the first line of the submitted text.
    fn iexec(&mut self, source: &ScriptSource) -> Result<(), BridgeError> {
        self.exec(&source.first_line())
    }

    fn call(
        &mut self,
        object: Option<&str>,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        tracing::debug!(object = ?object, method, args = args.len(), "call");
        let args = marshal_args(args);
        let interp = self.interpreter()?;
        let result = match object {
            None => {
                let callee = interp.global(method).ok_or_else(|| {
                    BridgeError::call(method, format!("name '{}' is not defined", method))
                })?;
                if !callee.is_callable() {
                    return Err(BridgeError::call(
                        method,
                        format!("'{}' object is not callable", callee.type_name()),
                    ));
                }
                interp.call(&callee, args)
            }
            Some(name) => {
                let receiver = interp
                    .receiver(name)
                    .map_err(|e| call_error(e, method))?
                    .ok_or_else(|| BridgeError::undefined_name(name))?;
                interp.call_method(&receiver, method, args)
            }
        };
        result.map(|v| to_host(&v)).map_err(|e| call_error(e, method))
    }

    fn apply(
        &mut self,
        source: &ScriptSource,
        params: &[String],
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        if params.len() != args.len() {
            return Err(BridgeError::call(
                source.source_name.clone(),
                format!("expected {} argument(s), got {}", params.len(), args.len()),
            ));
        }
        let args = marshal_args(args);
        self.interpreter()?
            .apply(&source.text, params, args)
            .map(|v| to_host(&v))
            .map_err(|e| script_error(e, source))
    }

    fn terminate(&mut self) {
        if self.interpreter.take().is_some() {
            logger::debug("Terminated python engine");
        }
    }
}
