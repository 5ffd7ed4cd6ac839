//! Python language adapter for scriptbridge
//!
//! This crate provides:
//! 1. An embedded interpreter for a Python 2 flavoured subset (print
//!    statements, functions, loops, lists, host method calls)
//! 2. [`PythonEngine`], the [`ScriptEngine`](scriptbridge_core::ScriptEngine)
//!    built on it, registered under the language id `python`
//! 3. With the `cpython` feature, an engine backed by a real CPython
//!    interpreter through pyo3, registered as `cpython`

mod ast;
mod builtins;
pub mod engine;
pub mod errors;
mod interpreter;
mod lexer;
mod ops;
mod parser;
mod value;

#[cfg(feature = "cpython")]
pub mod cpython;

pub use engine::PythonEngine;
pub use errors::{ErrorKind, ScriptError};

use scriptbridge_core::{LanguageSpec, Manager};

pub const LANGUAGE_ID: &str = "python";
pub const EXTENSIONS: &[&str] = &["py"];

pub fn language_spec() -> LanguageSpec {
    LanguageSpec::new(LANGUAGE_ID, EXTENSIONS, || Box::new(PythonEngine::new()))
}

/// Register every engine this crate was built with.
pub fn install(manager: &Manager) {
    manager.register_scripting_engine(language_spec());
    #[cfg(feature = "cpython")]
    manager.register_scripting_engine(cpython::language_spec());
}
