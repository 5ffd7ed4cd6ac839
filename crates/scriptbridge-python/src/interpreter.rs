//! Tree-walking evaluator
//!
//! Name resolution order is: function locals, module globals, beans
//! declared on the bridge, then builtins. Declared beans are read from the
//! shared registry on every lookup, so a bean undeclared by the host is
//! immediately undefined to scripts.

use crate::ast::{BinOp, CmpOp, Expr, ExprKind, FunctionDef, Stmt, StmtKind, UnaryOp};
use crate::builtins::{self, Builtin};
use crate::errors::{ErrorKind, ScriptError};
use crate::ops;
use crate::parser::{parse, parse_function_body};
use crate::value::{from_host, to_host, Function, Value};
use ahash::{AHashMap, AHashSet};
use scriptbridge_core::{BeanRegistry, HostValue, OutputSink};
use std::sync::Arc;

/// Nesting limit for script function calls.
pub const MAX_CALL_DEPTH: usize = 100;

/// Limit on statements and expressions being evaluated at once, summed
/// over every active call.
pub const MAX_EVAL_DEPTH: usize = 400;

fn recursion_error() -> ScriptError {
    ScriptError::new(ErrorKind::RecursionError, "maximum recursion depth exceeded")
}

#[derive(Default)]
struct Frame {
    locals: AHashMap<String, Value>,
    globals: AHashSet<String>,
}

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: AHashMap<String, Value>,
    frames: Vec<Frame>,
    beans: BeanRegistry,
    output: OutputSink,
    /// Python 2 `print` state: a separating space is owed before the next item.
    softspace: bool,
    /// Statements and expressions currently being evaluated.
    depth: usize,
}

impl Interpreter {
    pub fn new(beans: BeanRegistry, output: OutputSink) -> Self {
        Self {
            globals: AHashMap::new(),
            frames: Vec::new(),
            beans,
            output,
            softspace: false,
            depth: 0,
        }
    }

    /// Run `source` at module level. Returns the value of the final
    /// statement when it is an expression, `None` otherwise.
    pub fn run(&mut self, source: &str) -> Result<Value, ScriptError> {
        let program = parse(source)?;
        self.run_statements(&program)
    }

    /// Run `body` as an anonymous function with `params` bound to `args`.
    pub fn apply(&mut self, body: &str, params: &[String], args: Vec<Value>) -> Result<Value, ScriptError> {
        if params.len() != args.len() {
            return Err(ScriptError::type_error(format!(
                "<lambda>() takes exactly {} arguments ({} given)",
                params.len(),
                args.len()
            )));
        }
        let program = parse_function_body(body)?;
        let mut frame = Frame::default();
        frame.locals.extend(params.iter().cloned().zip(args));
        self.with_frame(frame, |interp| interp.run_statements(&program))
    }

    /// A module-level global or builtin, for host-initiated calls.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals
            .get(name)
            .cloned()
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
    }

    /// Resolve the receiver of a host-initiated method call: any bean
    /// (registered or declared) first, then a module-level global.
    pub fn receiver(&self, name: &str) -> Result<Option<Value>, ScriptError> {
        if let Some(bean) = self.beans.lookup(name) {
            let value = match bean.declared_type {
                Some(bean_type) => bean_type.coerce(&bean.value)?,
                None => bean.value,
            };
            return Ok(Some(from_host(value)));
        }
        Ok(self.globals.get(name).cloned())
    }

    fn with_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(recursion_error());
        }
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    fn run_statements(&mut self, program: &[Stmt]) -> Result<Value, ScriptError> {
        let mut last = Value::None;
        for stmt in program {
            if let StmtKind::Expr(expr) = &stmt.kind {
                last = self.eval(expr).map_err(|e| e.at(stmt.line, stmt.column))?;
                continue;
            }
            last = Value::None;
            if let Flow::Return(value) = self.exec(stmt)? {
                return Ok(value);
            }
        }
        Ok(last)
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, ScriptError> {
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        let flow = if self.depth < MAX_EVAL_DEPTH {
            self.depth += 1;
            let flow = self.exec_inner(stmt);
            self.depth -= 1;
            flow
        } else {
            Err(recursion_error())
        };
        flow.map_err(|e| e.at(stmt.line, stmt.column))
    }

    // Thin dispatch only: this frame sits on every step of script recursion.
    fn exec_inner(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.eval(expr).map(|_| Flow::Normal),
            StmtKind::Assign { targets, value } => self.exec_assign(targets, value),
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value),
            StmtKind::Print { values, newline } => self.print(values, *newline).map(|()| Flow::Normal),
            StmtKind::If { branches, orelse } => self.exec_if(branches, orelse),
            StmtKind::While { test, body } => self.exec_while(test, body),
            StmtKind::For { target, iter, body } => self.exec_for(target, iter, body),
            StmtKind::Def(def) => self.exec_def(def),
            StmtKind::Return(value) => self.exec_return(value.as_ref()),
            StmtKind::Global(names) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.globals.extend(names.iter().cloned());
                }
                Ok(Flow::Normal)
            }
            StmtKind::Del(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::Pass => Ok(Flow::Normal),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    fn exec_assign(&mut self, targets: &[Expr], value: &Expr) -> Result<Flow, ScriptError> {
        let value = self.eval(value)?;
        for target in targets {
            self.assign(target, value.clone())?;
        }
        Ok(Flow::Normal)
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> Result<Flow, ScriptError> {
        match &target.kind {
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                let current = subscript(&container, &index)?;
                let rhs = self.eval(value)?;
                set_item(&container, &index, ops::binary(op, &current, &rhs)?)?;
            }
            ExprKind::Name(name) => {
                let current = self.load(name)?;
                let rhs = self.eval(value)?;
                self.store(name, ops::binary(op, &current, &rhs)?);
            }
            _ => return Err(ScriptError::syntax("illegal expression for augmented assignment", target.line, target.column)),
        }
        Ok(Flow::Normal)
    }

    fn exec_if(&mut self, branches: &[(Expr, Vec<Stmt>)], orelse: &[Stmt]) -> Result<Flow, ScriptError> {
        for (test, body) in branches {
            if self.eval(test)?.is_truthy() {
                return self.exec_block(body);
            }
        }
        self.exec_block(orelse)
    }

    fn exec_while(&mut self, test: &Expr, body: &[Stmt]) -> Result<Flow, ScriptError> {
        while self.eval(test)?.is_truthy() {
            match self.exec_block(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for(&mut self, target: &str, iter: &Expr, body: &[Stmt]) -> Result<Flow, ScriptError> {
        for item in self.eval(iter)?.iterate()? {
            self.store(target, item);
            match self.exec_block(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_def(&mut self, def: &Arc<FunctionDef>) -> Result<Flow, ScriptError> {
        let defaults = def
            .params
            .iter()
            .filter_map(|p| p.default.as_ref())
            .map(|e| self.eval(e))
            .collect::<Result<Vec<_>, _>>()?;
        let function = Function {
            def: def.clone(),
            defaults,
        };
        self.store(&def.name, Value::Function(Arc::new(function)));
        Ok(Flow::Normal)
    }

    fn exec_return(&mut self, value: Option<&Expr>) -> Result<Flow, ScriptError> {
        let value = match value {
            Some(expr) => self.eval(expr)?,
            None => Value::None,
        };
        Ok(Flow::Return(value))
    }

    fn print(&mut self, values: &[Expr], newline: bool) -> Result<(), ScriptError> {
        let mut out = String::new();
        for expr in values {
            let text = self.eval(expr)?.to_str();
            if self.softspace {
                out.push(' ');
            }
            // Like Python 2, no space is owed after text ending in a line
            // break or tab.
            self.softspace = !text.ends_with(|c: char| c.is_whitespace() && c != ' ');
            out.push_str(&text);
        }
        if newline {
            out.push('\n');
            self.softspace = false;
        }
        self.output
            .write_str(&out)
            .map_err(|e| ScriptError::host(e.into()))
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), ScriptError> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.store(name, value);
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                set_item(&container, &index, value)
            }
            _ => Err(ScriptError::syntax("can't assign to expression", target.line, target.column)),
        }
    }

    fn delete(&mut self, target: &Expr) -> Result<(), ScriptError> {
        match &target.kind {
            ExprKind::Name(name) => {
                let removed = match self.frames.last_mut() {
                    Some(frame) if !frame.globals.contains(name) => frame.locals.remove(name),
                    _ => self.globals.remove(name),
                };
                removed
                    .map(|_| ())
                    .ok_or_else(|| ScriptError::name_error(name).at(target.line, target.column))
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                match &container {
                    Value::List(items) => {
                        let mut items = items.lock();
                        let i = list_index(items.len(), &index)?;
                        items.remove(i);
                        Ok(())
                    }
                    other => Err(ScriptError::type_error(format!(
                        "'{}' object doesn't support item deletion",
                        other.type_name()
                    ))),
                }
            }
            _ => Err(ScriptError::syntax("can't delete expression", target.line, target.column)),
        }
    }

    fn load(&self, name: &str) -> Result<Value, ScriptError> {
        if let Some(frame) = self.frames.last() {
            if !frame.globals.contains(name) {
                if let Some(value) = frame.locals.get(name) {
                    return Ok(value.clone());
                }
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if let Some((value, bean_type)) = self.beans.lookup_declared(name) {
            return Ok(from_host(bean_type.coerce(&value)?));
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| ScriptError::name_error(name))
    }

    fn store(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) if !frame.globals.contains(name) => {
                frame.locals.insert(name.to_string(), value);
            }
            _ => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        let value = if self.depth < MAX_EVAL_DEPTH {
            self.depth += 1;
            let value = self.eval_inner(expr);
            self.depth -= 1;
            value
        } else {
            Err(recursion_error())
        };
        value.map_err(|e| e.at(expr.line, expr.column))
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match &expr.kind {
            ExprKind::None => Ok(Value::None),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Name(name) => self.load(name),
            ExprKind::List(items) => self.eval_list(items),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Compare { left, rest } => self.eval_compare(left, rest),
            ExprKind::And(left, right) => self.eval_logical(left, right, true),
            ExprKind::Or(left, right) => self.eval_logical(left, right, false),
            ExprKind::IfElse { test, body, orelse } => self.eval_if_else(test, body, orelse),
            ExprKind::Call { func, args } => self.eval_call(func, args),
            ExprKind::Attribute { value, name } => self.eval_attribute(value, name),
            ExprKind::Subscript { value, index } => self.eval_subscript(value, index),
        }
    }

    fn eval_list(&mut self, items: &[Expr]) -> Result<Value, ScriptError> {
        let items = items
            .iter()
            .map(|e| self.eval(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::list(items))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, ScriptError> {
        let operand = self.eval(operand)?;
        ops::unary(op, &operand)
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, ScriptError> {
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        ops::binary(op, &left, &right)
    }

    fn eval_compare(&mut self, left: &Expr, rest: &[(CmpOp, Expr)]) -> Result<Value, ScriptError> {
        let mut current = self.eval(left)?;
        for (op, right) in rest {
            let right = self.eval(right)?;
            if !ops::compare(*op, &current, &right)? {
                return Ok(Value::Bool(false));
            }
            current = right;
        }
        Ok(Value::Bool(true))
    }

    /// `and`/`or`: the deciding operand is the result.
    fn eval_logical(&mut self, left: &Expr, right: &Expr, is_and: bool) -> Result<Value, ScriptError> {
        let left = self.eval(left)?;
        if left.is_truthy() == is_and {
            self.eval(right)
        } else {
            Ok(left)
        }
    }

    fn eval_if_else(&mut self, test: &Expr, body: &Expr, orelse: &Expr) -> Result<Value, ScriptError> {
        if self.eval(test)?.is_truthy() {
            self.eval(body)
        } else {
            self.eval(orelse)
        }
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr]) -> Result<Value, ScriptError> {
        let callee = self.eval(func)?;
        let args = args
            .iter()
            .map(|e| self.eval(e))
            .collect::<Result<Vec<_>, _>>()?;
        self.call(&callee, args)
    }

    fn eval_attribute(&mut self, value: &Expr, name: &str) -> Result<Value, ScriptError> {
        let receiver = self.eval(value)?;
        if builtins::has_method(&receiver, name) {
            Ok(Value::Method(Box::new(receiver), name.to_string()))
        } else {
            Err(ScriptError::new(
                ErrorKind::AttributeError,
                format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
            ))
        }
    }

    fn eval_subscript(&mut self, value: &Expr, index: &Expr) -> Result<Value, ScriptError> {
        let container = self.eval(value)?;
        let index = self.eval(index)?;
        subscript(&container, &index)
    }

    /// Call any callable value with positional arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, ScriptError> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            Value::Builtin(builtin) => builtin.call(args),
            Value::Method(receiver, name) => self.call_method(receiver, name, args),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Call `name` on `receiver`; host objects receive marshaled arguments.
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        match receiver {
            Value::Host(object) => {
                let args: Vec<HostValue> = args.iter().map(to_host).collect();
                Ok(from_host(object.invoke(name, &args)?))
            }
            Value::Function(_) | Value::Builtin(_) | Value::Method(..) if name == "__call__" => {
                self.call(receiver, args)
            }
            _ => builtins::call_method(receiver, name, args),
        }
    }

    fn call_function(&mut self, function: &Arc<Function>, args: Vec<Value>) -> Result<Value, ScriptError> {
        let params = &function.def.params;
        let required = params.len() - function.defaults.len();
        if args.len() < required || args.len() > params.len() {
            let qualifier = if function.defaults.is_empty() {
                "exactly"
            } else if args.len() < required {
                "at least"
            } else {
                "at most"
            };
            let expected = if args.len() < required { required } else { params.len() };
            return Err(ScriptError::type_error(format!(
                "{}() takes {} {} argument{} ({} given)",
                function.name(),
                qualifier,
                expected,
                if expected == 1 { "" } else { "s" },
                args.len()
            )));
        }

        let mut frame = Frame::default();
        let given = args.len();
        for (param, value) in params.iter().zip(args) {
            frame.locals.insert(param.name.clone(), value);
        }
        for (param, default) in params
            .iter()
            .skip(required)
            .zip(function.defaults.iter())
            .skip(given.saturating_sub(required))
        {
            frame.locals.insert(param.name.clone(), default.clone());
        }

        let function = function.clone();
        self.with_frame(frame, |interp| match interp.exec_block(&function.def.body)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        })
    }
}

fn list_index(len: usize, index: &Value) -> Result<usize, ScriptError> {
    let i = match index.number() {
        Some(crate::value::Number::Int(i)) => i,
        _ => {
            return Err(ScriptError::type_error(format!(
                "list indices must be integers, not {}",
                index.type_name()
            )))
        }
    };
    let len = len as i64;
    let resolved = if i < 0 { i + len } else { i };
    if resolved < 0 || resolved >= len {
        return Err(ScriptError::new(ErrorKind::IndexError, "list index out of range"));
    }
    Ok(resolved as usize)
}

fn subscript(container: &Value, index: &Value) -> Result<Value, ScriptError> {
    match container {
        Value::List(items) => {
            let items = items.lock();
            let i = list_index(items.len(), index)?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = list_index(chars.len(), index)
                .map_err(|e| ScriptError::new(e.kind, e.message.replace("list", "string")))?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object has no attribute '__getitem__'",
            other.type_name()
        ))),
    }
}

fn set_item(container: &Value, index: &Value, value: Value) -> Result<(), ScriptError> {
    match container {
        Value::List(items) => {
            let mut items = items.lock();
            let i = list_index(items.len(), index)?;
            items[i] = value;
            Ok(())
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}
