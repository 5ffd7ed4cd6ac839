//! The marshaling contract between host code and interpreters
//!
//! Every value crossing the bridge is a [`HostValue`]: numeric, string,
//! boolean, null, or an opaque [`HostObject`] handle. Adapters translate
//! these into interpreter-native values and back; anything an interpreter
//! cannot express faithfully travels as an `Object`.

use crate::error::BridgeError;
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A host-side object that scripts can hold and invoke methods on.
pub trait HostObject: Send + Sync + fmt::Debug {
    /// Short type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Invoke `method` with positional arguments.
    fn invoke(&self, method: &str, args: &[HostValue]) -> Result<HostValue, BridgeError> {
        let _ = args;
        Err(BridgeError::call(
            method,
            format!("'{}' object has no method '{}'", self.type_name(), method),
        ))
    }

    /// Downcasting hook, used by adapters to recover their own native values.
    fn as_any(&self) -> &dyn Any;
}

/// A value crossing the host/interpreter boundary.
#[derive(Clone, Debug, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(Arc<dyn HostObject>),
}

impl HostValue {
    pub fn object<T: HostObject + 'static>(object: T) -> Self {
        HostValue::Object(Arc::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "integer",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::Object(o) => o.type_name(),
        }
    }

    /// JSON rendering used by the command line runner.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            HostValue::Null => serde_json::Value::Null,
            HostValue::Bool(b) => serde_json::Value::Bool(*b),
            HostValue::Int(i) => serde_json::Value::from(*i),
            HostValue::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            HostValue::Str(s) => serde_json::Value::String(s.clone()),
            HostValue::Object(o) => serde_json::Value::String(format!("<{}>", o.type_name())),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Int(a), HostValue::Float(b)) | (HostValue::Float(b), HostValue::Int(a)) => {
                (*a as f64) == *b
            }
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Int(i) => write!(f, "{}", i),
            HostValue::Float(x) => write!(f, "{}", x),
            HostValue::Str(s) => write!(f, "{}", s),
            HostValue::Object(o) => write!(f, "<{} object>", o.type_name()),
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Int(i)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        HostValue::Int(i64::from(i))
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> Self {
        HostValue::Float(f)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Str(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Str(s)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

/// Static type tag attached to declared beans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanType {
    Integer,
    Float,
    Boolean,
    String,
    Object,
}

impl BeanType {
    pub fn name(self) -> &'static str {
        match self {
            BeanType::Integer => "Integer",
            BeanType::Float => "Float",
            BeanType::Boolean => "Boolean",
            BeanType::String => "String",
            BeanType::Object => "Object",
        }
    }

    /// Convert `value` into the representation this type tag calls for.
    ///
    /// `Object` accepts anything unchanged. `Null` passes through every tag.
    pub fn coerce(self, value: &HostValue) -> Result<HostValue, BridgeError> {
        let mismatch = || BridgeError::Marshal {
            value: format!("{} '{}'", value.kind(), value),
            target: self.name().to_string(),
        };

        let coerced = match (self, value) {
            (BeanType::Object, v) | (_, v @ HostValue::Null) => v.clone(),

            (BeanType::Integer, HostValue::Int(i)) => HostValue::Int(*i),
            (BeanType::Integer, HostValue::Bool(b)) => HostValue::Int(i64::from(*b)),
            (BeanType::Integer, HostValue::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
                HostValue::Int(*f as i64)
            }
            (BeanType::Integer, HostValue::Str(s)) => {
                HostValue::Int(s.trim().parse().map_err(|_| mismatch())?)
            }

            (BeanType::Float, HostValue::Float(f)) => HostValue::Float(*f),
            (BeanType::Float, HostValue::Int(i)) => HostValue::Float(*i as f64),
            (BeanType::Float, HostValue::Str(s)) => {
                HostValue::Float(s.trim().parse().map_err(|_| mismatch())?)
            }

            (BeanType::Boolean, HostValue::Bool(b)) => HostValue::Bool(*b),
            (BeanType::Boolean, HostValue::Int(i)) => HostValue::Bool(*i != 0),
            (BeanType::Boolean, HostValue::Str(s)) => match s.trim() {
                "true" | "True" => HostValue::Bool(true),
                "false" | "False" => HostValue::Bool(false),
                _ => return Err(mismatch()),
            },

            (BeanType::String, HostValue::Object(_)) => return Err(mismatch()),
            (BeanType::String, v) => HostValue::Str(v.to_string()),

            _ => return Err(mismatch()),
        };
        Ok(coerced)
    }
}

impl fmt::Display for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BeanType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "long" => Ok(BeanType::Integer),
            "float" | "double" => Ok(BeanType::Float),
            "bool" | "boolean" => Ok(BeanType::Boolean),
            "str" | "string" => Ok(BeanType::String),
            "object" | "any" => Ok(BeanType::Object),
            other => Err(BridgeError::Marshal {
                value: other.to_string(),
                target: "bean type".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter;

    impl HostObject for Counter {
        fn type_name(&self) -> &str {
            "Counter"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_integer_coercion() -> Result<(), BridgeError> {
        assert_eq!(BeanType::Integer.coerce(&HostValue::Int(1))?, HostValue::Int(1));
        assert_eq!(BeanType::Integer.coerce(&"42".into())?, HostValue::Int(42));
        assert_eq!(BeanType::Integer.coerce(&HostValue::Float(3.0))?, HostValue::Int(3));
        assert!(BeanType::Integer.coerce(&HostValue::Float(3.5)).is_err());
        assert!(BeanType::Integer.coerce(&"abc".into()).is_err());
        Ok(())
    }

    #[test]
    fn test_object_tag_passes_everything() -> Result<(), BridgeError> {
        let obj = HostValue::object(Counter);
        assert_eq!(BeanType::Object.coerce(&obj)?, obj);
        assert!(BeanType::String.coerce(&obj).is_err());
        Ok(())
    }

    #[test]
    fn test_null_passes_every_tag() -> Result<(), BridgeError> {
        for tag in [BeanType::Integer, BeanType::Boolean, BeanType::String] {
            assert!(tag.coerce(&HostValue::Null)?.is_null());
        }
        Ok(())
    }

    #[test]
    fn test_bean_type_from_str() {
        assert_eq!("Integer".parse::<BeanType>().ok(), Some(BeanType::Integer));
        assert_eq!("double".parse::<BeanType>().ok(), Some(BeanType::Float));
        assert!("Widget".parse::<BeanType>().is_err());
    }

    #[test]
    fn test_default_invoke_is_call_error() {
        let err = Counter.invoke("tick", &[]);
        assert!(matches!(err, Err(BridgeError::Call { .. })));
    }

    #[test]
    fn test_int_float_equality() {
        assert_eq!(HostValue::Int(2), HostValue::Float(2.0));
        assert_ne!(HostValue::Int(2), HostValue::Str("2".into()));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(HostValue::Int(2).to_json(), serde_json::json!(2));
        assert_eq!(HostValue::Null.to_json(), serde_json::Value::Null);
    }
}
