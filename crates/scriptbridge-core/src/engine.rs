//! The capability interface every language adapter implements
//!
//! An adapter translates the uniform requests of the bridge (exec, eval,
//! iexec, call, apply) into operations on its interpreter, and marshals
//! values through [`HostValue`]. Adapters are constructed by a factory
//! registered with the [`EngineRegistry`](crate::EngineRegistry), receive
//! an [`EngineContext`] exactly once through [`ScriptEngine::initialize`],
//! and are released with [`ScriptEngine::terminate`].

use crate::beans::BeanRegistry;
use crate::error::BridgeError;
use crate::output::OutputSink;
use crate::source::ScriptSource;
use crate::value::{BeanType, HostObject, HostValue};
use std::any::Any;

/// Default name of the implicit binding scripts use to reach the bridge.
pub const BRIDGE_BINDING: &str = "bsf";

pub trait ScriptEngine: Send {
    /// Wire the adapter to the bridge. Called once, before any request.
    fn initialize(&mut self, ctx: EngineContext) -> Result<(), BridgeError>;

    /// Run `source` to completion.
    fn exec(&mut self, source: &ScriptSource) -> Result<(), BridgeError>;

    /// Run `source` and return the value of its last expression.
    fn eval(&mut self, source: &ScriptSource) -> Result<HostValue, BridgeError>;

    /// Interactive execution. Adapters may consume only part of `source`;
    /// by default the whole text is executed.
    fn iexec(&mut self, source: &ScriptSource) -> Result<(), BridgeError> {
        self.exec(source)
    }

    /// Invoke `method` on the bean named `object`, or on the engine's
    /// global namespace when `object` is `None`.
    fn call(
        &mut self,
        object: Option<&str>,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError>;

    /// Evaluate `source` as the body of an anonymous function whose
    /// parameters `params` are bound to `args`.
    fn apply(
        &mut self,
        source: &ScriptSource,
        params: &[String],
        args: &[HostValue],
    ) -> Result<HostValue, BridgeError> {
        let _ = (params, args);
        Err(BridgeError::call(
            source.source_name.clone(),
            "this engine does not support apply",
        ))
    }

    /// Release interpreter resources.
    fn terminate(&mut self) {}
}

/// Everything an adapter receives from the bridge at initialization.
#[derive(Debug, Clone)]
pub struct EngineContext {
    language: String,
    beans: BeanRegistry,
    output: OutputSink,
    bridge_binding: String,
}

impl EngineContext {
    pub fn new(
        language: impl Into<String>,
        beans: BeanRegistry,
        output: OutputSink,
        bridge_binding: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            beans,
            output,
            bridge_binding: bridge_binding.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn bridge_binding(&self) -> &str {
        &self.bridge_binding
    }

    /// Declare the bridge self-reference so scripts can call back into
    /// the host through it.
    pub fn install_bridge_binding(&self) {
        let bridge = BridgeObject::new(self.beans.clone());
        self.beans
            .declare(self.bridge_binding.clone(), HostValue::object(bridge), BeanType::Object);
    }
}

/// The host object bound to [`BRIDGE_BINDING`] inside scripts.
#[derive(Debug, Clone)]
pub struct BridgeObject {
    beans: BeanRegistry,
}

impl BridgeObject {
    pub fn new(beans: BeanRegistry) -> Self {
        Self { beans }
    }
}

fn expect_arity(method: &str, args: &[HostValue], arity: usize) -> Result<(), BridgeError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(BridgeError::call(
            method,
            format!("expected {} argument(s), got {}", arity, args.len()),
        ))
    }
}

fn name_arg<'a>(method: &str, args: &'a [HostValue]) -> Result<&'a str, BridgeError> {
    args.first()
        .and_then(HostValue::as_str)
        .ok_or_else(|| BridgeError::call(method, "bean name must be a string"))
}

impl HostObject for BridgeObject {
    fn type_name(&self) -> &str {
        "Bridge"
    }

    fn invoke(&self, method: &str, args: &[HostValue]) -> Result<HostValue, BridgeError> {
        match method {
            "lookupBean" => {
                expect_arity(method, args, 1)?;
                Ok(self.beans.lookup_value(name_arg(method, args)?))
            }
            "registerBean" => {
                expect_arity(method, args, 2)?;
                self.beans.register(name_arg(method, args)?, args[1].clone());
                Ok(HostValue::Null)
            }
            "unregisterBean" => {
                expect_arity(method, args, 1)?;
                self.beans.unregister(name_arg(method, args)?);
                Ok(HostValue::Null)
            }
            "declareBean" => {
                expect_arity(method, args, 3)?;
                let bean_type: BeanType = args[2]
                    .as_str()
                    .ok_or_else(|| BridgeError::call(method, "bean type must be a string"))?
                    .parse()?;
                self.beans.declare(name_arg(method, args)?, args[1].clone(), bean_type);
                Ok(HostValue::Null)
            }
            "undeclareBean" => {
                expect_arity(method, args, 1)?;
                self.beans.undeclare(name_arg(method, args)?);
                Ok(HostValue::Null)
            }
            _ => Err(BridgeError::call(
                method,
                format!("'Bridge' object has no method '{}'", method),
            )),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EngineContext {
        EngineContext::new("test", BeanRegistry::new(), OutputSink::buffered().0, BRIDGE_BINDING)
    }

    #[test]
    fn test_install_bridge_binding_declares_object() {
        let ctx = context();
        ctx.install_bridge_binding();
        let declared = ctx.beans().lookup_declared(BRIDGE_BINDING);
        assert!(declared.is_some_and(|(value, ty)| ty == BeanType::Object && value.as_object().is_some()));
    }

    #[test]
    fn test_bridge_object_bean_roundtrip() -> Result<(), BridgeError> {
        let beans = BeanRegistry::new();
        let bridge = BridgeObject::new(beans.clone());

        assert!(bridge.invoke("lookupBean", &["foo".into()])?.is_null());
        bridge.invoke("registerBean", &["foo".into(), 1.into()])?;
        assert_eq!(bridge.invoke("lookupBean", &["foo".into()])?, HostValue::Int(1));
        bridge.invoke("unregisterBean", &["foo".into()])?;
        assert!(bridge.invoke("lookupBean", &["foo".into()])?.is_null());
        Ok(())
    }

    #[test]
    fn test_bridge_object_declare_parses_type() -> Result<(), BridgeError> {
        let beans = BeanRegistry::new();
        let bridge = BridgeObject::new(beans.clone());
        bridge.invoke("declareBean", &["n".into(), 5.into(), "int".into()])?;
        assert_eq!(beans.lookup_declared("n"), Some((HostValue::Int(5), BeanType::Integer)));
        bridge.invoke("undeclareBean", &["n".into()])?;
        assert!(!beans.contains("n"));
        Ok(())
    }

    #[test]
    fn test_bridge_object_rejects_bad_calls() {
        let bridge = BridgeObject::new(BeanRegistry::new());
        assert!(matches!(bridge.invoke("lookupBean", &[]), Err(BridgeError::Call { .. })));
        assert!(matches!(bridge.invoke("lookupBean", &[1.into()]), Err(BridgeError::Call { .. })));
        assert!(matches!(bridge.invoke("explode", &[]), Err(BridgeError::Call { .. })));
    }
}
