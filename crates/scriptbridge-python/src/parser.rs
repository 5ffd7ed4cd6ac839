//! Recursive-descent parser from tokens to [`Stmt`] trees

use crate::ast::{BinOp, CmpOp, Expr, ExprKind, FunctionDef, Param, Stmt, StmtKind, UnaryOp};
use crate::errors::ScriptError;
use crate::lexer::{tokenize, Keyword, Token, TokenKind};
use std::sync::Arc;

/// Deepest nesting of brackets, operators and blocks a script may use.
pub const MAX_NESTING: usize = 100;

/// Parse a whole program.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    Parser::new(tokenize(source)?, 0).program()
}

/// Parse text that runs as the body of a function, so `return` is allowed.
pub fn parse_function_body(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    Parser::new(tokenize(source)?, 1).program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Enclosing `def` bodies and loops, for `return`/`break` validation.
    functions: usize,
    loops: usize,
    /// Current syntactic nesting, bounded by [`MAX_NESTING`].
    depth: usize,
}

fn aug_op(op: &str) -> Option<BinOp> {
    let op = match op {
        "+=" => BinOp::Add,
        "-=" => BinOp::Sub,
        "*=" => BinOp::Mul,
        "/=" => BinOp::Div,
        "//=" => BinOp::FloorDiv,
        "%=" => BinOp::Mod,
        "**=" => BinOp::Pow,
        _ => return None,
    };
    Some(op)
}

impl Parser {
    fn new(tokens: Vec<Token>, functions: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            functions,
            loops: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("too many levels of nesting"));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::EndOfFile, |t| &t.kind)
    }

    fn position(&self) -> (u32, u32) {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or((1, 1), |t| (t.line, t.column))
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: &str) -> ScriptError {
        let (line, column) = self.position();
        ScriptError::syntax(message, line, column)
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ScriptError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", op)))
        }
    }

    fn expect_name(&mut self) -> Result<String, ScriptError> {
        match self.peek() {
            TokenKind::Name(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn program(mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                TokenKind::EndOfFile => return Ok(body),
                TokenKind::Newline => self.pos += 1,
                TokenKind::Indent => return Err(self.indentation_error("unexpected indent")),
                _ => body.extend(self.statement()?),
            }
        }
    }

    fn indentation_error(&self, message: &str) -> ScriptError {
        let (line, column) = self.position();
        ScriptError::new(crate::errors::ErrorKind::IndentationError, message).at(line, column)
    }

    /// One statement line; simple lines may hold several `;`-separated statements.
    fn statement(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let (line, column) = self.position();
        let compound = match self.peek() {
            TokenKind::Keyword(Keyword::If) => Some(self.if_statement()?),
            TokenKind::Keyword(Keyword::While) => Some(self.while_statement()?),
            TokenKind::Keyword(Keyword::For) => Some(self.for_statement()?),
            TokenKind::Keyword(Keyword::Def) => Some(self.def_statement()?),
            _ => None,
        };
        match compound {
            Some(kind) => Ok(vec![Stmt { kind, line, column }]),
            None => self.simple_statements(),
        }
    }

    fn simple_statements(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut stmts = vec![self.small_statement()?];
        while self.eat_op(";") {
            if matches!(self.peek(), TokenKind::Newline | TokenKind::EndOfFile) {
                break;
            }
            stmts.push(self.small_statement()?);
        }
        match self.peek() {
            TokenKind::Newline => {
                self.pos += 1;
                Ok(stmts)
            }
            TokenKind::EndOfFile => Ok(stmts),
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn small_statement(&mut self) -> Result<Stmt, ScriptError> {
        let (line, column) = self.position();
        let kind = match self.peek() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.pos += 1;
                StmtKind::Pass
            }
            TokenKind::Keyword(Keyword::Break) => {
                if self.loops == 0 {
                    return Err(self.error("'break' outside loop"));
                }
                self.pos += 1;
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                if self.loops == 0 {
                    return Err(self.error("'continue' not properly in loop"));
                }
                self.pos += 1;
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Return) => {
                if self.functions == 0 {
                    return Err(self.error("'return' outside function"));
                }
                self.pos += 1;
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.test()?))
                }
            }
            TokenKind::Keyword(Keyword::Global) => {
                self.pos += 1;
                let mut names = vec![self.expect_name()?];
                while self.eat_op(",") {
                    names.push(self.expect_name()?);
                }
                StmtKind::Global(names)
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.pos += 1;
                let mut targets = vec![self.target()?];
                while self.eat_op(",") {
                    targets.push(self.target()?);
                }
                StmtKind::Del(targets)
            }
            TokenKind::Keyword(Keyword::Print) => {
                self.pos += 1;
                self.print_statement()?
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt { kind, line, column })
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline | TokenKind::EndOfFile) || self.at_op(";")
    }

    fn print_statement(&mut self) -> Result<StmtKind, ScriptError> {
        let mut values = Vec::new();
        let mut newline = true;
        while !self.at_statement_end() {
            values.push(self.test()?);
            newline = true;
            if self.eat_op(",") {
                newline = false;
            } else {
                break;
            }
        }
        Ok(StmtKind::Print { values, newline })
    }

    fn expression_statement(&mut self) -> Result<StmtKind, ScriptError> {
        let first = self.test()?;

        if let TokenKind::Op(op) = self.peek() {
            if let Some(op) = aug_op(op) {
                self.pos += 1;
                check_target(&first)?;
                let value = self.test()?;
                return Ok(StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                });
            }
        }

        if !self.at_op("=") {
            return Ok(StmtKind::Expr(first));
        }
        let mut targets = vec![first];
        let mut value = None;
        while self.eat_op("=") {
            let next = self.test()?;
            if let Some(previous) = value.replace(next) {
                targets.push(previous);
            }
        }
        for target in &targets {
            check_target(target)?;
        }
        let value = value.ok_or_else(|| self.error("invalid syntax"))?;
        Ok(StmtKind::Assign { targets, value })
    }

    fn target(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.atom_expr()?;
        check_target(&expr)?;
        Ok(expr)
    }

    /// `:` followed by either an inline simple statement or an indented block.
    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect_op(":")?;
        self.descend()?;
        let body = self.block_body();
        self.depth -= 1;
        body
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if !matches!(self.peek(), TokenKind::Newline) {
            return self.simple_statements();
        }
        self.pos += 1;
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.indentation_error("expected an indented block"));
        }
        self.pos += 1;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Dedent => {
                    self.pos += 1;
                    return Ok(body);
                }
                TokenKind::EndOfFile => return Ok(body),
                TokenKind::Newline => self.pos += 1,
                TokenKind::Indent => return Err(self.indentation_error("unexpected indent")),
                _ => body.extend(self.statement()?),
            }
        }
    }

    fn if_statement(&mut self) -> Result<StmtKind, ScriptError> {
        self.pos += 1;
        let mut branches = vec![(self.test()?, self.block()?)];
        let mut orelse = Vec::new();
        loop {
            if self.eat_keyword(Keyword::Elif) {
                branches.push((self.test()?, self.block()?));
            } else if self.eat_keyword(Keyword::Else) {
                orelse = self.block()?;
                break;
            } else {
                break;
            }
        }
        Ok(StmtKind::If { branches, orelse })
    }

    fn while_statement(&mut self) -> Result<StmtKind, ScriptError> {
        self.pos += 1;
        let test = self.test()?;
        let body = self.loop_body()?;
        Ok(StmtKind::While { test, body })
    }

    fn for_statement(&mut self) -> Result<StmtKind, ScriptError> {
        self.pos += 1;
        let target = self.expect_name()?;
        if !self.eat_keyword(Keyword::In) {
            return Err(self.error("expected 'in'"));
        }
        let iter = self.test()?;
        let body = self.loop_body()?;
        Ok(StmtKind::For { target, iter, body })
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.loops += 1;
        let body = self.block();
        self.loops -= 1;
        body
    }

    fn def_statement(&mut self) -> Result<StmtKind, ScriptError> {
        self.pos += 1;
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let mut params: Vec<Param> = Vec::new();
        while !self.at_op(")") {
            let param = self.expect_name()?;
            if params.iter().any(|p| p.name == param) {
                return Err(self.error("duplicate argument in function definition"));
            }
            let default = if self.eat_op("=") {
                Some(self.test()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error("non-default argument follows default argument"));
                }
                None
            };
            params.push(Param {
                name: param,
                default,
            });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        let loops = std::mem::take(&mut self.loops);
        self.functions += 1;
        let body = self.block();
        self.functions -= 1;
        self.loops = loops;
        let body = body?;
        Ok(StmtKind::Def(Arc::new(FunctionDef { name, params, body })))
    }

    fn test(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.conditional();
        self.depth -= 1;
        expr
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let body = self.or_test()?;
        if !self.eat_keyword(Keyword::If) {
            return Ok(body);
        }
        let test = self.or_test()?;
        if !self.eat_keyword(Keyword::Else) {
            return Err(self.error("expected 'else' in conditional expression"));
        }
        let orelse = self.test()?;
        Ok(Expr {
            line: body.line,
            column: body.column,
            kind: ExprKind::IfElse {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
        })
    }

    fn or_test(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and_test()?;
        let mut chained = 0;
        while self.eat_keyword(Keyword::Or) {
            self.descend()?;
            chained += 1;
            let right = self.and_test()?;
            left = Expr {
                line: left.line,
                column: left.column,
                kind: ExprKind::Or(Box::new(left), Box::new(right)),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.not_test()?;
        let mut chained = 0;
        while self.eat_keyword(Keyword::And) {
            self.descend()?;
            chained += 1;
            let right = self.not_test()?;
            left = Expr {
                line: left.line,
                column: left.column,
                kind: ExprKind::And(Box::new(left), Box::new(right)),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, ScriptError> {
        let (line, column) = self.position();
        if self.eat_keyword(Keyword::Not) {
            self.descend()?;
            let operand = self.not_test()?;
            self.depth -= 1;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                line,
                column,
            });
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek() {
            TokenKind::Op("==") => CmpOp::Eq,
            TokenKind::Op("!=" | "<>") => CmpOp::NotEq,
            TokenKind::Op("<") => CmpOp::Lt,
            TokenKind::Op("<=") => CmpOp::LtE,
            TokenKind::Op(">") => CmpOp::Gt,
            TokenKind::Op(">=") => CmpOp::GtE,
            TokenKind::Keyword(Keyword::In) => CmpOp::In,
            TokenKind::Keyword(Keyword::Is) => {
                self.pos += 1;
                return Some(if self.eat_keyword(Keyword::Not) {
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                });
            }
            TokenKind::Keyword(Keyword::Not)
                if matches!(
                    self.tokens.get(self.pos + 1).map(|t| &t.kind),
                    Some(TokenKind::Keyword(Keyword::In))
                ) =>
            {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let left = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            return Ok(left);
        }
        Ok(Expr {
            line: left.line,
            column: left.column,
            kind: ExprKind::Compare {
                left: Box::new(left),
                rest,
            },
        })
    }

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr {
            line: left.line,
            column: left.column,
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    fn arith(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.term()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Op("+") => BinOp::Add,
                TokenKind::Op("-") => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            chained += 1;
            let right = self.term()?;
            left = Self::binary(left, op, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.factor()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Op("*") => BinOp::Mul,
                TokenKind::Op("/") => BinOp::Div,
                TokenKind::Op("//") => BinOp::FloorDiv,
                TokenKind::Op("%") => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            chained += 1;
            let right = self.factor()?;
            left = Self::binary(left, op, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, ScriptError> {
        let (line, column) = self.position();
        let op = match self.peek() {
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.factor()?;
        self.depth -= 1;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
            column,
        })
    }

    fn power(&mut self) -> Result<Expr, ScriptError> {
        let base = self.atom_expr()?;
        if self.eat_op("**") {
            self.descend()?;
            let exponent = self.factor()?;
            self.depth -= 1;
            return Ok(Self::binary(base, BinOp::Pow, exponent));
        }
        Ok(base)
    }

    fn atom_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.atom()?;
        let mut chained = 0;
        loop {
            let (line, column) = self.position();
            if matches!(self.peek(), TokenKind::Op("(" | "[" | ".")) {
                self.descend()?;
                chained += 1;
            }
            if self.eat_op("(") {
                let mut args = Vec::new();
                while !self.at_op(")") {
                    args.push(self.test()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(")")?;
                expr = Expr {
                    kind: ExprKind::Call {
                        func: Box::new(expr),
                        args,
                    },
                    line,
                    column,
                };
            } else if self.eat_op("[") {
                let index = self.test()?;
                self.expect_op("]")?;
                expr = Expr {
                    kind: ExprKind::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                    column,
                };
            } else if self.eat_op(".") {
                let name = self.expect_name()?;
                expr = Expr {
                    kind: ExprKind::Attribute {
                        value: Box::new(expr),
                        name,
                    },
                    line,
                    column,
                };
            } else {
                self.depth -= chained;
                return Ok(expr);
            }
        }
    }

    fn atom(&mut self) -> Result<Expr, ScriptError> {
        let (line, column) = self.position();
        let kind = match self.advance() {
            TokenKind::Int(i) => ExprKind::Int(i),
            TokenKind::Float(f) => ExprKind::Float(f),
            TokenKind::Str(s) => {
                let mut s = s;
                while let TokenKind::Str(next) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                ExprKind::Str(s)
            }
            TokenKind::Name(name) => ExprKind::Name(name),
            TokenKind::Keyword(Keyword::True) => ExprKind::Bool(true),
            TokenKind::Keyword(Keyword::False) => ExprKind::Bool(false),
            TokenKind::Keyword(Keyword::None) => ExprKind::None,
            TokenKind::Op("(") => {
                let inner = self.test()?;
                self.expect_op(")")?;
                return Ok(inner);
            }
            TokenKind::Op("[") => {
                let mut items = Vec::new();
                while !self.at_op("]") {
                    items.push(self.test()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                ExprKind::List(items)
            }
            _ => return Err(ScriptError::syntax("invalid syntax", line, column)),
        };
        Ok(Expr { kind, line, column })
    }
}

fn check_target(expr: &Expr) -> Result<(), ScriptError> {
    match expr.kind {
        ExprKind::Name(_) | ExprKind::Subscript { .. } => Ok(()),
        _ => Err(ScriptError::syntax(
            "can't assign to expression",
            expr.line,
            expr.column,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Stmt> {
        match parse(source) {
            Ok(stmts) => stmts,
            Err(e) => panic!("parse failed: {}", e),
        }
    }

    #[test]
    fn test_print_trailing_comma() {
        let stmts = parse_ok("print \"PASSED\",");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Print { values, newline: false } if values.len() == 1
        ));
    }

    #[test]
    fn test_def_with_body() {
        let stmts = parse_ok("def addOne(f):\n\t return f + 1\n");
        let StmtKind::Def(def) = &stmts[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.name, "addOne");
        assert_eq!(def.params.len(), 1);
        assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_precedence() {
        let stmts = parse_ok("1 + 2 * 3");
        let StmtKind::Expr(expr) = &stmts[0].kind else {
            panic!("expected expression");
        };
        assert!(matches!(
            &expr.kind,
            ExprKind::Binary { op: BinOp::Add, right, .. }
                if matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. })
        ));
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        let stmts = parse_ok("-2 ** 2");
        let StmtKind::Expr(expr) = &stmts[0].kind else {
            panic!("expected expression");
        };
        assert!(matches!(&expr.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_chained_assignment_and_semicolons() {
        let stmts = parse_ok("a = b = 1; c = 2");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0].kind, StmtKind::Assign { targets, .. } if targets.len() == 2));
    }

    #[test]
    fn test_if_elif_else() {
        let stmts = parse_ok("if x:\n  a = 1\nelif y:\n  a = 2\nelse:\n  a = 3\n");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::If { branches, orelse } if branches.len() == 2 && orelse.len() == 1
        ));
    }

    #[test]
    fn test_not_in_and_is_not() {
        let stmts = parse_ok("a not in b\na is not None");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Compare { rest, .. }, .. }) if rest[0].0 == CmpOp::NotIn
        ));
        assert!(matches!(
            &stmts[1].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Compare { rest, .. }, .. }) if rest[0].0 == CmpOp::IsNot
        ));
    }

    #[test]
    fn test_method_call_on_attribute() {
        let stmts = parse_ok("bsf.lookupBean(\"foo\")");
        let StmtKind::Expr(expr) = &stmts[0].kind else {
            panic!("expected expression");
        };
        assert!(matches!(
            &expr.kind,
            ExprKind::Call { func, args } if args.len() == 1
                && matches!(&func.kind, ExprKind::Attribute { name, .. } if name == "lookupBean")
        ));
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let err = parse("x = \n").err();
        assert!(err.is_some_and(|e| e.is_syntax() && e.line == 1));

        let err = parse("x = 1\n1 = x\n").err();
        assert!(err.is_some_and(|e| e.is_syntax() && e.line == 2));

        let err = parse("def f(:\n  pass\n").err();
        assert!(err.is_some_and(|e| e.is_syntax()));
    }

    #[test]
    fn test_missing_block_is_indentation_error() {
        let err = parse("if x:\ny = 1\n").err();
        assert!(err.is_some_and(|e| matches!(e.kind, crate::errors::ErrorKind::IndentationError)));
    }

    #[test]
    fn test_return_and_break_context() {
        assert!(parse("return 1").is_err());
        assert!(parse("break").is_err());
        assert!(parse("while True:\n  def f():\n    break\n").is_err());
        assert!(parse("for x in y:\n  if x: break\n").is_ok());
        assert!(parse_function_body("return f + 1").is_ok());
    }

    #[test]
    fn test_inline_block() {
        let stmts = parse_ok("while x: x = x - 1\n");
        assert!(matches!(&stmts[0].kind, StmtKind::While { body, .. } if body.len() == 1));
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let too_deep = [
            format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000)),
            format!("{}1{}", "[".repeat(20_000), "]".repeat(20_000)),
            format!("{}1", "not ".repeat(20_000)),
            format!("{}1", "- ".repeat(20_000)),
            format!("2{}", " ** 2".repeat(20_000)),
            format!("1{}", " + 1".repeat(20_000)),
            format!("x{}", ".y".repeat(20_000)),
        ];
        for source in &too_deep {
            let err = parse(source).err();
            assert!(err.is_some_and(|e| e.is_syntax() && e.message == "too many levels of nesting"));
        }
        assert!(parse(&format!("{}1{}", "(".repeat(50), ")".repeat(50))).is_ok());
        assert!(parse(&format!("1{}", " + 1".repeat(50))).is_ok());
    }

    #[test]
    fn test_deeply_nested_blocks() {
        let mut source = String::new();
        for level in 0..150 {
            source.push_str(&" ".repeat(level));
            source.push_str("if x:\n");
        }
        source.push_str(&" ".repeat(150));
        source.push_str("pass\n");
        let err = parse(&source).err();
        assert!(err.is_some_and(|e| e.is_syntax()));
    }
}
