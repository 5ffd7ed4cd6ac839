//! Scripting engine bridge
//!
//! This crate provides the host side of scriptbridge:
//! 1. A shared registry of host objects ("beans") visible to every engine
//! 2. The [`ScriptEngine`] capability trait language adapters implement
//! 3. A registry that builds one engine instance per language on demand
//! 4. The [`Manager`] façade routing eval/exec/iexec/call by language id
//!
//! Adapters live in their own crates and are plugged in with
//! [`Manager::register_scripting_engine`].

pub mod beans;
pub mod engine;
pub mod error;
pub mod manager;
pub mod output;
pub mod registry;
pub mod source;
pub mod value;

pub use beans::{Bean, BeanRegistry};
pub use engine::{BridgeObject, EngineContext, ScriptEngine, BRIDGE_BINDING};
pub use error::{BridgeError, Cause, SourceLocation};
pub use manager::Manager;
pub use output::{OutputBuffer, OutputSink};
pub use registry::{EngineFactory, EngineHandle, EngineRegistry, EngineState, LanguageSpec};
pub use source::ScriptSource;
pub use value::{BeanType, HostObject, HostValue};
