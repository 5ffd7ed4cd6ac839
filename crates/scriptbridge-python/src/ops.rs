//! Operator semantics. Integer division floors, as in Python 2.

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::errors::{ErrorKind, ScriptError};
use crate::value::{Number, Value};
use std::cmp::Ordering;

fn overflow() -> ScriptError {
    ScriptError::new(ErrorKind::OverflowError, "integer overflow")
}

fn zero_division(message: &str) -> ScriptError {
    ScriptError::new(ErrorKind::ZeroDivisionError, message)
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> ScriptError {
    ScriptError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn floor_div(a: i64, b: i64) -> Result<i64, ScriptError> {
    if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Result<i64, ScriptError> {
    if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
    }
    let r = a.checked_rem(b).ok_or_else(overflow)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn float_mod(a: f64, b: f64) -> Result<f64, ScriptError> {
    if b == 0.0 {
        return Err(zero_division("float modulo"));
    }
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn int_pow(base: i64, exponent: i64) -> Result<Value, ScriptError> {
    if exponent < 0 {
        if base == 0 {
            return Err(zero_division("0.0 cannot be raised to a negative power"));
        }
        return Ok(Value::Float((base as f64).powf(exponent as f64)));
    }
    let exponent = u32::try_from(exponent).map_err(|_| overflow())?;
    base.checked_pow(exponent).map(Value::Int).ok_or_else(overflow)
}

/// Longest sequence (in items, or bytes for strings) that `*` will build.
const MAX_REPEAT_LEN: usize = 1 << 24;

/// How many copies of a `len`-long sequence to make for `seq * count`.
/// Zero when the result is empty.
fn repeat_count(len: usize, count: i64) -> Result<usize, ScriptError> {
    let count = usize::try_from(count).unwrap_or(0);
    match len.checked_mul(count) {
        Some(0) => Ok(0),
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(ScriptError::new(
            ErrorKind::OverflowError,
            "repeated sequence is too long",
        )),
    }
}

fn arithmetic(op: BinOp, a: Number, b: Number) -> Result<Value, ScriptError> {
    if let (Number::Int(a), Number::Int(b)) = (a, b) {
        let value = match op {
            BinOp::Add => a.checked_add(b).ok_or_else(overflow)?,
            BinOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
            BinOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
            BinOp::Div | BinOp::FloorDiv => floor_div(a, b)?,
            BinOp::Mod => floor_mod(a, b)?,
            BinOp::Pow => return int_pow(a, b),
        };
        return Ok(Value::Int(value));
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            if op == BinOp::FloorDiv {
                (a / b).floor()
            } else {
                a / b
            }
        }
        BinOp::Mod => float_mod(a, b)?,
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
    };
    Ok(Value::Float(value))
}

pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    if let (Some(a), Some(b)) = (left.number(), right.number()) {
        return arithmetic(op, a, b);
    }
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.lock().clone();
            items.extend(b.lock().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.number().is_some() => {
            match n.number() {
                Some(Number::Int(count)) => Ok(Value::Str(s.repeat(repeat_count(s.len(), count)?))),
                _ => Err(ScriptError::type_error("can't multiply sequence by non-int of type 'float'")),
            }
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) if n.number().is_some() => {
            match n.number() {
                Some(Number::Int(count)) => {
                    let items = items.lock().clone();
                    let count = repeat_count(items.len(), count)?;
                    let mut out = Vec::with_capacity(items.len() * count);
                    for _ in 0..count {
                        out.extend(items.iter().cloned());
                    }
                    Ok(Value::list(out))
                }
                _ => Err(ScriptError::type_error("can't multiply sequence by non-int of type 'float'")),
            }
        }
        _ => Err(unsupported(op, left, right)),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, ScriptError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand.number() {
            Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(ScriptError::type_error(format!(
                "bad operand type for unary -: '{}'",
                operand.type_name()
            ))),
        },
        UnaryOp::Pos => match operand.number() {
            Some(Number::Int(i)) => Ok(Value::Int(i)),
            Some(Number::Float(f)) => Ok(Value::Float(f)),
            None => Err(ScriptError::type_error(format!(
                "bad operand type for unary +: '{}'",
                operand.type_name()
            ))),
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, ScriptError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(ScriptError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => {
            // Compare against a snapshot; `item` may be this very list.
            let items = items.lock().clone();
            Ok(items.iter().any(|v| v.equals(item)))
        }
        other => Err(ScriptError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, ScriptError> {
    match op {
        CmpOp::Eq => Ok(left.equals(right)),
        CmpOp::NotEq => Ok(!left.equals(right)),
        CmpOp::Is => Ok(left.is_same(right)),
        CmpOp::IsNot => Ok(!left.is_same(right)),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
        CmpOp::Lt => Ok(left.compare(right)? == Ordering::Less),
        CmpOp::LtE => Ok(left.compare(right)? != Ordering::Greater),
        CmpOp::Gt => Ok(left.compare(right)? == Ordering::Greater),
        CmpOp::GtE => Ok(left.compare(right)? != Ordering::Less),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: Result<Value, ScriptError>) -> Option<i64> {
        match value {
            Ok(Value::Int(i)) => Some(i),
            _ => None,
        }
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(int(binary(BinOp::Div, &Value::Int(7), &Value::Int(2))), Some(3));
        assert_eq!(int(binary(BinOp::Div, &Value::Int(-7), &Value::Int(2))), Some(-4));
        assert_eq!(int(binary(BinOp::Mod, &Value::Int(-7), &Value::Int(2))), Some(1));
        assert_eq!(int(binary(BinOp::FloorDiv, &Value::Int(7), &Value::Int(-2))), Some(-4));
    }

    #[test]
    fn test_float_division() -> Result<(), ScriptError> {
        let value = binary(BinOp::Div, &Value::Int(7), &Value::Float(2.0))?;
        assert!(value.equals(&Value::Float(3.5)));
        Ok(())
    }

    #[test]
    fn test_division_by_zero() {
        let err = binary(BinOp::Div, &Value::Int(1), &Value::Int(0)).err();
        assert!(err.is_some_and(|e| matches!(e.kind, ErrorKind::ZeroDivisionError)));
        let err = binary(BinOp::Mod, &Value::Float(1.0), &Value::Float(0.0)).err();
        assert!(err.is_some_and(|e| matches!(e.kind, ErrorKind::ZeroDivisionError)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = binary(BinOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).err();
        assert!(err.is_some_and(|e| matches!(e.kind, ErrorKind::OverflowError)));
    }

    #[test]
    fn test_power() -> Result<(), ScriptError> {
        assert_eq!(int(binary(BinOp::Pow, &Value::Int(2), &Value::Int(10))), Some(1024));
        assert!(binary(BinOp::Pow, &Value::Int(2), &Value::Int(-1))?.equals(&Value::Float(0.5)));
        Ok(())
    }

    #[test]
    fn test_sequences() -> Result<(), ScriptError> {
        let s = binary(BinOp::Add, &Value::Str("PASS".into()), &Value::Str("ED".into()))?;
        assert_eq!(s.to_str(), "PASSED");
        let s = binary(BinOp::Mul, &Value::Int(3), &Value::Str("ab".into()))?;
        assert_eq!(s.to_str(), "ababab");
        let l = binary(BinOp::Mul, &Value::list(vec![Value::Int(0)]), &Value::Int(2))?;
        assert_eq!(l.repr(), "[0, 0]");
        assert!(binary(BinOp::Add, &Value::Str("a".into()), &Value::Int(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_huge_repeat_is_an_error() -> Result<(), ScriptError> {
        let pair = Value::list(vec![Value::Int(0), Value::Int(0)]);
        let err = binary(BinOp::Mul, &pair, &Value::Int(i64::MAX)).err();
        assert!(err.is_some_and(|e| matches!(e.kind, ErrorKind::OverflowError)));
        let err = binary(BinOp::Mul, &Value::Str("ab".into()), &Value::Int(i64::MAX)).err();
        assert!(err.is_some_and(|e| matches!(e.kind, ErrorKind::OverflowError)));

        assert_eq!(binary(BinOp::Mul, &Value::Str(String::new()), &Value::Int(i64::MAX))?.to_str(), "");
        assert_eq!(binary(BinOp::Mul, &Value::list(Vec::new()), &Value::Int(i64::MAX))?.repr(), "[]");
        assert_eq!(binary(BinOp::Mul, &pair, &Value::Int(-3))?.repr(), "[]");
        Ok(())
    }

    #[test]
    fn test_comparisons() -> Result<(), ScriptError> {
        assert!(compare(CmpOp::Lt, &Value::Int(1), &Value::Float(1.5))?);
        assert!(compare(CmpOp::In, &Value::Str("ss".into()), &Value::Str("PASSED".into()))?);
        assert!(compare(CmpOp::NotIn, &Value::Int(3), &Value::list(vec![Value::Int(1)]))?);
        assert!(compare(CmpOp::Is, &Value::None, &Value::None)?);
        assert!(compare(CmpOp::Gt, &Value::Str("a".into()), &Value::Int(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_membership_of_list_in_itself() -> Result<(), ScriptError> {
        let list = Value::list(vec![Value::list(vec![Value::Int(1)])]);
        assert!(!compare(CmpOp::In, &list, &list)?);
        assert!(compare(CmpOp::NotIn, &list, &list)?);
        Ok(())
    }

    #[test]
    fn test_unary() -> Result<(), ScriptError> {
        assert_eq!(int(unary(UnaryOp::Neg, &Value::Int(2))), Some(-2));
        assert!(unary(UnaryOp::Not, &Value::Int(0))?.is_truthy());
        assert!(unary(UnaryOp::Neg, &Value::Str("a".into())).is_err());
        Ok(())
    }
}
