use scriptbridge_core::BridgeError;
use std::fmt;

/// The interpreter-level category of a script failure.
#[derive(Debug)]
pub enum ErrorKind {
    SyntaxError,
    IndentationError,
    NameError(String),
    TypeError,
    ValueError,
    ZeroDivisionError,
    AttributeError,
    IndexError,
    OverflowError,
    RecursionError,
    /// A host object raised while a script was calling into it.
    Host(BridgeError),
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::IndentationError => "IndentationError",
            ErrorKind::NameError(_) => "NameError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::RecursionError => "RecursionError",
            ErrorKind::Host(_) => "HostError",
        }
    }
}

/// A failure raised while lexing, parsing or running a script.
///
/// `line` and `column` are 1-based positions inside the submitted text; 0
/// means the position is not known yet.
#[derive(Debug)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
            column: 0,
        }
    }

    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::new(ErrorKind::SyntaxError, message).at(line, column)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(
            ErrorKind::NameError(name.to_string()),
            format!("name '{}' is not defined", name),
        )
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn host(err: BridgeError) -> Self {
        let message = err.to_string();
        Self::new(ErrorKind::Host(err), message)
    }

    /// Set the position unless one is already recorded.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        if self.line == 0 {
            self.line = line;
            self.column = column;
        }
        self
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorKind::SyntaxError | ErrorKind::IndentationError)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Host(err) => write!(f, "{}", err),
            kind => write!(f, "{}: {}", kind.name(), self.message),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BridgeError> for ScriptError {
    fn from(err: BridgeError) -> Self {
        ScriptError::host(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_python_names() {
        let err = ScriptError::type_error("unsupported operand");
        assert_eq!(err.to_string(), "TypeError: unsupported operand");
        assert_eq!(ScriptError::name_error("foo").to_string(), "NameError: name 'foo' is not defined");
    }

    #[test]
    fn test_at_keeps_first_position() {
        let err = ScriptError::value_error("bad").at(3, 4).at(9, 9);
        assert_eq!((err.line, err.column), (3, 4));
    }

    #[test]
    fn test_host_error_exposes_source() {
        use std::error::Error;
        let err = ScriptError::host(BridgeError::call("lookupBean", "nope"));
        assert!(err.source().is_some());
        assert!(!err.is_syntax());
    }
}
