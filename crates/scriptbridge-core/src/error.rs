use std::fmt;
use std::io;
use thiserror::Error;

/// Boxed interpreter-native error kept as the source of a bridge failure.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where in a script a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub source_name: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(source_name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.line, self.column)
    }
}

/// Errors surfaced by the bridge to its callers
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("No scripting engine registered for language '{0}'")]
    UnknownEngine(String),

    #[error("{location}: {message}")]
    Execution {
        location: SourceLocation,
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("Call to '{method}' failed: {message}")]
    Call {
        method: String,
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("{}name '{name}' is not defined", location_prefix(.location))]
    UndefinedName {
        name: String,
        location: Option<SourceLocation>,
    },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Cannot convert {value} to declared type {target}")]
    Marshal { value: String, target: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn location_prefix(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!("{}: ", loc),
        None => String::new(),
    }
}

impl BridgeError {
    pub fn execution(location: SourceLocation, message: impl Into<String>) -> Self {
        BridgeError::Execution {
            location,
            message: message.into(),
            cause: None,
        }
    }

    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Call {
            method: method.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn undefined_name(name: impl Into<String>) -> Self {
        BridgeError::UndefinedName {
            name: name.into(),
            location: None,
        }
    }

    /// Attach a script location to errors that do not carry one yet.
    pub fn at(self, location: SourceLocation) -> Self {
        match self {
            BridgeError::UndefinedName {
                name,
                location: None,
            } => BridgeError::UndefinedName {
                name,
                location: Some(location),
            },
            other => other,
        }
    }

    /// The script location this error points at, if any.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            BridgeError::Execution { location, .. } => Some(location),
            BridgeError::UndefinedName { location, .. } => location.as_ref(),
            _ => None,
        }
    }
}

impl From<scriptbridge_config::ConfigError> for BridgeError {
    fn from(err: scriptbridge_config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display_includes_location() {
        let err = BridgeError::execution(SourceLocation::new("Test.py", 3, 1), "boom");
        assert_eq!(err.to_string(), "Test.py:3:1: boom");
    }

    #[test]
    fn test_undefined_name_display() {
        let err = BridgeError::undefined_name("foo");
        assert_eq!(err.to_string(), "name 'foo' is not defined");

        let located = err.at(SourceLocation::new("Test.py", 0, 0));
        assert_eq!(located.to_string(), "Test.py:0:0: name 'foo' is not defined");
        assert!(located.location().is_some());
    }

    #[test]
    fn test_at_keeps_existing_location() {
        let err = BridgeError::execution(SourceLocation::new("a.py", 1, 1), "x")
            .at(SourceLocation::new("b.py", 2, 2));
        assert_eq!(err.location().map(|l| l.source_name.as_str()), Some("a.py"));
    }
}
