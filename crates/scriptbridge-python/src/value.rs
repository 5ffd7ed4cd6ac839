//! Interpreter-native values and their conversion to and from [`HostValue`]

use crate::ast::FunctionDef;
use crate::builtins::Builtin;
use crate::errors::{ErrorKind, ScriptError};
use parking_lot::Mutex;
use scriptbridge_core::{BridgeError, HostObject, HostValue};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub type List = Arc<Mutex<Vec<Value>>>;

/// Lists nested deeper than this render as `[...]` and stop comparing.
const MAX_CONTAINER_DEPTH: usize = 100;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(List),
    Function(Arc<Function>),
    Builtin(Builtin),
    /// A method looked up on a receiver, waiting to be called.
    Method(Box<Value>, String),
    Host(Arc<dyn HostObject>),
}

/// A `def` closed over its evaluated default arguments.
#[derive(Debug)]
pub struct Function {
    pub def: Arc<FunctionDef>,
    pub defaults: Vec<Value>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

/// Numeric view of a value; booleans count as integers.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(Mutex::new(items)))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Method(..) => "instancemethod",
            Value::Host(object) => object.type_name(),
        }
    }

    pub fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.lock().is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::Method(..)
        )
    }

    /// The `str()` rendering, as written by `print`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// The `repr()` rendering. A list reached again while it is still
    /// being rendered shows as `[...]`.
    pub fn repr(&self) -> String {
        self.repr_within(&mut Vec::new())
    }

    fn repr_within(&self, open: &mut Vec<List>) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => repr_str(s),
            Value::List(items) => {
                if open.len() >= MAX_CONTAINER_DEPTH || open.iter().any(|l| Arc::ptr_eq(l, items)) {
                    return "[...]".to_string();
                }
                let snapshot = items.lock().clone();
                open.push(items.clone());
                let parts: Vec<String> = snapshot.iter().map(|v| v.repr_within(open)).collect();
                open.pop();
                format!("[{}]", parts.join(", "))
            }
            Value::Function(f) => format!("<function {}>", f.name()),
            Value::Builtin(b) => format!("<built-in function {}>", b.name()),
            Value::Method(receiver, name) => {
                format!("<method {} of {} object>", name, receiver.type_name())
            }
            Value::Host(object) => format!("<{} object>", object.type_name()),
        }
    }

    /// `==` semantics: numbers compare across int/float/bool, containers
    /// element-wise, callables and host objects by identity.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_at(other, 0)
    }

    fn equals_at(&self, other: &Value, depth: usize) -> bool {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return match (a, b) {
                (Number::Int(a), Number::Int(b)) => a == b,
                (a, b) => a.as_f64() == b.as_f64(),
            };
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if depth >= MAX_CONTAINER_DEPTH {
                    return false;
                }
                let (a, b) = (a.lock().clone(), b.lock().clone());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals_at(y, depth + 1))
            }
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `is` semantics. Small immutable values compare by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ordering for `<`, `min`, `sorted` and friends.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ScriptError> {
        self.compare_at(other, 0)
    }

    fn compare_at(&self, other: &Value, depth: usize) -> Result<Ordering, ScriptError> {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            let ordering = match (a, b) {
                (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
                (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
            };
            return ordering.ok_or_else(|| ScriptError::value_error("cannot order NaN"));
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return Ok(Ordering::Equal);
                }
                if depth >= MAX_CONTAINER_DEPTH {
                    return Err(ScriptError::new(
                        ErrorKind::RecursionError,
                        "maximum recursion depth exceeded in cmp",
                    ));
                }
                let (a, b) = (a.lock().clone(), b.lock().clone());
                for (x, y) in a.iter().zip(b.iter()) {
                    let ordering = x.compare_at(y, depth + 1)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(ScriptError::type_error(format!(
                "unorderable types: {}() and {}()",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Snapshot of the items a `for` loop walks over.
    pub fn iterate(&self) -> Result<Vec<Value>, ScriptError> {
        match self {
            Value::List(items) => Ok(items.lock().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:?}", f)
    }
}

fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Interpreter values with no host counterpart, carried across the bridge
/// as opaque objects and unwrapped again when they come back.
#[derive(Debug)]
pub struct ScriptObject {
    value: Value,
}

impl ScriptObject {
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl HostObject for ScriptObject {
    fn type_name(&self) -> &str {
        self.value.type_name()
    }

    fn invoke(&self, method: &str, args: &[HostValue]) -> Result<HostValue, BridgeError> {
        let args = args.iter().cloned().map(from_host).collect();
        crate::builtins::call_method(&self.value, method, args)
            .map(|v| to_host(&v))
            .map_err(|e| BridgeError::Call {
                method: method.to_string(),
                message: e.to_string(),
                cause: Some(Box::new(e)),
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn to_host(value: &Value) -> HostValue {
    match value {
        Value::None => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Int(i) => HostValue::Int(*i),
        Value::Float(f) => HostValue::Float(*f),
        Value::Str(s) => HostValue::Str(s.clone()),
        Value::Host(object) => HostValue::Object(object.clone()),
        other => HostValue::object(ScriptObject {
            value: other.clone(),
        }),
    }
}

pub fn from_host(value: HostValue) -> Value {
    match value {
        HostValue::Null => Value::None,
        HostValue::Bool(b) => Value::Bool(b),
        HostValue::Int(i) => Value::Int(i),
        HostValue::Float(f) => Value::Float(f),
        HostValue::Str(s) => Value::Str(s),
        HostValue::Object(object) => match object.as_any().downcast_ref::<ScriptObject>() {
            Some(script) => script.value().clone(),
            None => Value::Host(object),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_and_str() {
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Float(0.1).repr(), "0.1");
        assert_eq!(Value::Str("it's".into()).repr(), "\"it's\"");
        assert_eq!(Value::Str("a\nb".into()).repr(), "'a\\nb'");
        assert_eq!(Value::Str("PASSED".into()).to_str(), "PASSED");
        let list = Value::list(vec![Value::Int(1), Value::Str("a".into()), Value::None]);
        assert_eq!(list.repr(), "[1, 'a', None]");
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(Value::Bool(true).equals(&Value::Int(1)));
        assert!(!Value::Int(1).equals(&Value::Str("1".into())));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::list(Vec::new()).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
    }

    #[test]
    fn test_compare_rejects_mixed_types() {
        assert!(Value::Int(1).compare(&Value::Str("a".into())).is_err());
        assert!(matches!(
            Value::Str("a".into()).compare(&Value::Str("b".into())),
            Ok(Ordering::Less)
        ));
    }

    #[test]
    fn test_marshal_primitives_faithfully() {
        for value in [HostValue::Null, HostValue::Int(2), HostValue::Str("x".into()), HostValue::Bool(true)] {
            assert_eq!(to_host(&from_host(value.clone())), value);
        }
    }

    #[test]
    fn test_list_roundtrips_as_same_object() {
        let list = Value::list(vec![Value::Int(1)]);
        let host = to_host(&list);
        assert_eq!(host.kind(), "list");
        let Value::List(back) = from_host(host) else {
            panic!("expected list");
        };
        let Value::List(original) = &list else {
            unreachable!()
        };
        assert!(Arc::ptr_eq(original, &back));
    }

    #[test]
    fn test_script_object_methods_callable_from_host() -> Result<(), BridgeError> {
        let host = to_host(&Value::list(Vec::new()));
        let object = host.as_object().cloned();
        let Some(object) = object else {
            panic!("expected object");
        };
        object.invoke("append", &[HostValue::Int(5)])?;
        let popped = object.invoke("pop", &[])?;
        assert_eq!(popped, HostValue::Int(5));
        assert!(matches!(object.invoke("nope", &[]), Err(BridgeError::Call { .. })));
        Ok(())
    }

    fn self_containing(first: Value) -> (Value, List) {
        let items = Arc::new(Mutex::new(vec![first]));
        items.lock().push(Value::List(items.clone()));
        (Value::List(items.clone()), items)
    }

    #[test]
    fn test_self_containing_list() {
        let (list, items) = self_containing(Value::Int(1));
        assert_eq!(list.repr(), "[1, [...]]");
        assert_eq!(list.to_str(), "[1, [...]]");
        assert!(list.equals(&list));
        assert!(matches!(list.compare(&list), Ok(Ordering::Equal)));
        items.lock().clear();
    }

    #[test]
    fn test_distinct_cycles_stop_comparing() {
        let (a, a_items) = self_containing(Value::Int(1));
        let (b, b_items) = self_containing(Value::Int(1));
        assert!(!a.equals(&b));
        assert!(a
            .compare(&b)
            .is_err_and(|e| matches!(e.kind, ErrorKind::RecursionError)));
        a_items.lock().clear();
        b_items.lock().clear();
    }

    #[test]
    fn test_deeply_nested_list_repr_is_cut_off() {
        let mut value = Value::list(Vec::new());
        for _ in 0..500 {
            value = Value::list(vec![value]);
        }
        let repr = value.repr();
        assert!(repr.starts_with("[[[["));
        assert!(repr.contains("[...]"));
    }
}
