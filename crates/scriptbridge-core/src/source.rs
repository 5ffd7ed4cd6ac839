use crate::error::SourceLocation;

/// A unit of script text submitted for execution.
///
/// `line` and `column` are the position of the first character of `text`
/// inside `source_name`; adapters offset their own diagnostics by them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub source_name: String,
    pub line: u32,
    pub column: u32,
    pub text: String,
}

impl ScriptSource {
    pub fn new(source_name: impl Into<String>, line: u32, column: u32, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            column,
            text: text.into(),
        }
    }

    /// Anonymous snippet starting at 0:0.
    pub fn snippet(text: impl Into<String>) -> Self {
        Self::new("<script>", 0, 0, text)
    }

    /// Translate a 1-based position inside `text` into a location in the
    /// enclosing source.
    pub fn locate(&self, line: u32, column: u32) -> SourceLocation {
        let line_offset = line.saturating_sub(1);
        let column = if line_offset == 0 {
            self.column + column.saturating_sub(1)
        } else {
            column
        };
        SourceLocation::new(self.source_name.clone(), self.line + line_offset, column)
    }

    /// Location of the start of the text.
    pub fn start(&self) -> SourceLocation {
        SourceLocation::new(self.source_name.clone(), self.line, self.column)
    }

    /// The source restricted to its first line.
    pub fn first_line(&self) -> ScriptSource {
        let text = self.text.split('\n').next().unwrap_or_default();
        Self {
            text: text.trim_end_matches('\r').to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_offsets_first_line_column() {
        let src = ScriptSource::new("Test.py", 10, 4, "x\ny");
        assert_eq!(src.locate(1, 1), SourceLocation::new("Test.py", 10, 4));
        assert_eq!(src.locate(2, 3), SourceLocation::new("Test.py", 11, 3));
    }

    #[test]
    fn test_first_line() {
        let src = ScriptSource::new("Test.py", 0, 0, "print \"PASSED\",\r\nprint \"FAILED\",");
        assert_eq!(src.first_line().text, "print \"PASSED\",");
        assert_eq!(ScriptSource::snippet("").first_line().text, "");
    }
}
