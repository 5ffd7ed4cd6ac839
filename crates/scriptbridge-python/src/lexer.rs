//! Tokenizer with Python-style indentation tracking
//!
//! Logical lines end in `Newline`; changes in leading whitespace produce
//! `Indent`/`Dedent`. Blank and comment-only lines produce nothing, and line
//! breaks inside brackets or after a backslash are joined.

use crate::errors::{ErrorKind, ScriptError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Break,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    False,
    For,
    Global,
    If,
    In,
    Is,
    None,
    Not,
    Or,
    Pass,
    Print,
    Return,
    True,
    While,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        let kw = match ident {
            "and" => Keyword::And,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "def" => Keyword::Def,
            "del" => Keyword::Del,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "False" => Keyword::False,
            "for" => Keyword::For,
            "global" => Keyword::Global,
            "if" => Keyword::If,
            "in" => Keyword::In,
            "is" => Keyword::Is,
            "None" => Keyword::None,
            "not" => Keyword::Not,
            "or" => Keyword::Or,
            "pass" => Keyword::Pass,
            "print" => Keyword::Print,
            "return" => Keyword::Return,
            "True" => Keyword::True,
            "while" => Keyword::While,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(Keyword),
    /// Operator or delimiter, e.g. `+`, `//=`, `(`.
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    EndOfFile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

// Longest operators first so prefix matching picks `**=` over `**` over `*`.
const OPERATORS: &[&str] = &[
    "**=", "//=", "**", "//", "==", "!=", "<>", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "+", "-",
    "*", "/", "%", "<", ">", "=", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";",
];

const TAB_SIZE: usize = 8;

pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    line_start: usize,
    depth: usize,
    indents: Vec<usize>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
            depth: 0,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn column(&self) -> u32 {
        (self.pos - self.line_start + 1) as u32
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, line: u32, column: u32) {
        self.tokens.push(Token { kind, line, column });
    }

    fn new_line(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    fn last_is_newline(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        )
    }

    fn run(mut self) -> Result<Vec<Token>, ScriptError> {
        let mut at_line_start = true;
        while self.pos < self.chars.len() {
            if at_line_start {
                at_line_start = false;
                if self.depth == 0 && self.indentation()? {
                    // blank line consumed; measure the next one
                    at_line_start = true;
                    continue;
                }
            }

            let Some(c) = self.peek() else { break };
            match c {
                '\n' => {
                    if self.depth == 0 && !self.last_is_newline() {
                        let (line, column) = (self.line, self.column());
                        self.push(TokenKind::Newline, line, column);
                    }
                    self.new_line();
                    at_line_start = true;
                }
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' if matches!(self.peek_at(1), Some('\n')) => {
                    self.pos += 1;
                    self.new_line();
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 2;
                    self.new_line();
                }
                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.identifier(),
                _ => self.operator()?,
            }
        }

        if self.depth > 0 {
            return Err(ScriptError::syntax(
                "unexpected EOF while parsing",
                self.line,
                self.column(),
            ));
        }
        let (line, column) = (self.line, self.column());
        if !self.last_is_newline() {
            self.push(TokenKind::Newline, line, column);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, column);
        }
        self.push(TokenKind::EndOfFile, line, column);
        Ok(self.tokens)
    }

    /// Measure leading whitespace and emit Indent/Dedent tokens.
    /// Returns true when the whole line was blank or a comment.
    fn indentation(&mut self) -> Result<bool, ScriptError> {
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek() {
            None => return Ok(true),
            Some('\n') => {
                self.new_line();
                return Ok(true);
            }
            Some('\r') if self.peek_at(1) == Some('\n') => {
                self.pos += 1;
                self.new_line();
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.new_line();
                }
                return Ok(true);
            }
            _ => {}
        }

        let current = self.indents.last().copied().unwrap_or(0);
        let (line, column) = (self.line, self.column());
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line, column);
        } else if width < current {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.push(TokenKind::Dedent, line, column);
            }
            if self.indents.last() != Some(&width) {
                return Err(ScriptError::new(
                    ErrorKind::IndentationError,
                    "unindent does not match any outer indentation level",
                )
                .at(line, column));
            }
        }
        Ok(false)
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) {
        let (line, column) = (self.line, self.column());
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let ident: String = self.chars[start..self.pos].iter().collect();
        let kind = match Keyword::from_ident(&ident) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Name(ident),
        };
        self.push(kind, line, column);
    }

    fn number(&mut self) -> Result<(), ScriptError> {
        let (line, column) = (self.line, self.column());
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            let value = i64::from_str_radix(&digits, 16)
                .map_err(|_| ScriptError::syntax("invalid hexadecimal literal", line, column))?;
            self.push(TokenKind::Int(value), line, column);
            return Ok(());
        }

        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let kind = if is_float {
            TokenKind::Float(
                text.parse()
                    .map_err(|_| ScriptError::syntax("invalid float literal", line, column))?,
            )
        } else {
            let value = text.parse().map_err(|_| {
                ScriptError::new(ErrorKind::OverflowError, "integer literal too large")
                    .at(line, column)
            })?;
            TokenKind::Int(value)
        };
        // Python 2 long suffix
        if matches!(self.peek(), Some('l' | 'L')) && !is_float {
            self.pos += 1;
        }
        self.push(kind, line, column);
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), ScriptError> {
        let (line, column) = (self.line, self.column());
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(ScriptError::syntax(
                    "EOF while scanning string literal",
                    line,
                    column,
                ));
            };
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
                value.push(c);
                self.pos += 1;
                continue;
            }
            match c {
                '\n' if !triple => {
                    return Err(ScriptError::syntax(
                        "EOL while scanning string literal",
                        line,
                        column,
                    ));
                }
                '\n' => {
                    value.push('\n');
                    self.new_line();
                }
                '\\' => {
                    self.pos += 1;
                    let Some(escaped) = self.peek() else { continue };
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        '\n' => {
                            self.new_line();
                            continue;
                        }
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                    self.pos += 1;
                }
                _ => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
        self.push(TokenKind::Str(value), line, column);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), ScriptError> {
        let (line, column) = (self.line, self.column());
        for op in OPERATORS {
            let len = op.chars().count();
            let matches = op
                .chars()
                .enumerate()
                .all(|(i, ch)| self.peek_at(i) == Some(ch));
            if matches {
                self.pos += len;
                match *op {
                    "(" | "[" | "{" => self.depth += 1,
                    ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
                self.push(TokenKind::Op(op), line, column);
                return Ok(());
            }
        }
        let c = self.peek().unwrap_or(' ');
        Err(ScriptError::syntax(
            format!("invalid character '{}'", c),
            line,
            column,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        match tokenize(source) {
            Ok(tokens) => tokens.into_iter().map(|t| t.kind).collect(),
            Err(e) => panic!("tokenize failed: {}", e),
        }
    }

    #[test]
    fn test_print_statement() {
        assert_eq!(
            kinds("print \"PASSED\","),
            vec![
                TokenKind::Keyword(Keyword::Print),
                TokenKind::Str("PASSED".to_string()),
                TokenKind::Op(","),
                TokenKind::Newline,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_indent_with_tab_and_space() {
        let k = kinds("def addOne(f):\n\t return f + 1\n");
        assert!(k.contains(&TokenKind::Indent));
        assert!(k.contains(&TokenKind::Dedent));
        assert_eq!(k.last(), Some(&TokenKind::EndOfFile));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let k = kinds("x = 1\n\n   # comment\ny = 2\n");
        let newlines = k.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(!k.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_brackets_join_lines() {
        let k = kinds("x = [1,\n     2]\n");
        let newlines = k.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
        assert_eq!(kinds("0x1F")[0], TokenKind::Int(31));
        assert_eq!(kinds("2e3")[0], TokenKind::Float(2000.0));
        assert_eq!(kinds("10L")[0], TokenKind::Int(10));
    }

    #[test]
    fn test_string_escapes_and_triple_quotes() {
        assert_eq!(kinds(r#"'a\'b\n'"#)[0], TokenKind::Str("a'b\n".to_string()));
        assert_eq!(kinds("\"\"\"x\ny\"\"\"")[0], TokenKind::Str("x\ny".to_string()));
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(kinds("a //= 2")[1], TokenKind::Op("//="));
        assert_eq!(kinds("a ** 2")[1], TokenKind::Op("**"));
    }

    #[test]
    fn test_bad_dedent() {
        let err = tokenize("if x:\n    y\n  z\n");
        assert!(matches!(err, Err(ScriptError { kind: ErrorKind::IndentationError, .. })));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("print \"oops");
        assert!(err.is_err_and(|e| e.is_syntax() && e.line == 1));
    }

    #[test]
    fn test_positions() -> Result<(), ScriptError> {
        let tokens = tokenize("x = 1\n  \ny")?;
        let y = tokens.iter().find(|t| t.kind == TokenKind::Name("y".to_string()));
        assert_eq!(y.map(|t| (t.line, t.column)), Some((3, 1)));
        Ok(())
    }
}
