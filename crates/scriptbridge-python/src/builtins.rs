//! Built-in functions and the methods of `str` and `list`

use crate::errors::{ErrorKind, ScriptError};
use crate::value::{Number, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    Bool,
    Float,
    Int,
    Len,
    Max,
    Min,
    Range,
    Repr,
    Sorted,
    Str,
    Sum,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        let builtin = match name {
            "abs" => Builtin::Abs,
            "bool" => Builtin::Bool,
            "float" => Builtin::Float,
            "int" => Builtin::Int,
            "len" => Builtin::Len,
            "max" => Builtin::Max,
            "min" => Builtin::Min,
            "range" | "xrange" => Builtin::Range,
            "repr" => Builtin::Repr,
            "sorted" => Builtin::Sorted,
            "str" => Builtin::Str,
            "sum" => Builtin::Sum,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Abs => "abs",
            Builtin::Bool => "bool",
            Builtin::Float => "float",
            Builtin::Int => "int",
            Builtin::Len => "len",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Range => "range",
            Builtin::Repr => "repr",
            Builtin::Sorted => "sorted",
            Builtin::Str => "str",
            Builtin::Sum => "sum",
        }
    }

    pub fn call(self, args: Vec<Value>) -> Result<Value, ScriptError> {
        let name = self.name();
        match self {
            Builtin::Len => {
                let [arg] = exactly::<1>(name, args)?;
                let len = match &arg {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.lock().len(),
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )))
                    }
                };
                Ok(Value::Int(len as i64))
            }
            Builtin::Str => match optional(name, args)? {
                Some(arg) => Ok(Value::Str(arg.to_str())),
                None => Ok(Value::Str(String::new())),
            },
            Builtin::Repr => {
                let [arg] = exactly::<1>(name, args)?;
                Ok(Value::Str(arg.repr()))
            }
            Builtin::Bool => Ok(Value::Bool(
                optional(name, args)?.is_some_and(|v| v.is_truthy()),
            )),
            Builtin::Int => match optional(name, args)? {
                None => Ok(Value::Int(0)),
                Some(arg) => to_int(&arg),
            },
            Builtin::Float => match optional(name, args)? {
                None => Ok(Value::Float(0.0)),
                Some(arg) => to_float(&arg),
            },
            Builtin::Abs => {
                let [arg] = exactly::<1>(name, args)?;
                match arg.number() {
                    Some(Number::Int(i)) => i
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(overflow),
                    Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                    None => Err(bad_operand("abs()", &arg)),
                }
            }
            Builtin::Range => range(args),
            Builtin::Min => extreme(name, args, Ordering::Less),
            Builtin::Max => extreme(name, args, Ordering::Greater),
            Builtin::Sum => {
                let [items] = exactly::<1>(name, args)?;
                let mut total = Value::Int(0);
                for item in items.iterate()? {
                    total = crate::ops::binary(crate::ast::BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            Builtin::Sorted => {
                let [items] = exactly::<1>(name, args)?;
                let mut items = items.iterate()?;
                sort(&mut items)?;
                Ok(Value::list(items))
            }
        }
    }
}

fn overflow() -> ScriptError {
    ScriptError::new(ErrorKind::OverflowError, "integer overflow")
}

fn bad_operand(what: &str, value: &Value) -> ScriptError {
    ScriptError::type_error(format!(
        "bad operand type for {}: '{}'",
        what,
        value.type_name()
    ))
}

fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], ScriptError> {
    let given = args.len();
    args.try_into().map_err(|_| {
        ScriptError::type_error(format!(
            "{}() takes exactly {} argument{} ({} given)",
            name,
            N,
            if N == 1 { "" } else { "s" },
            given
        ))
    })
}

fn optional(name: &str, args: Vec<Value>) -> Result<Option<Value>, ScriptError> {
    if args.len() > 1 {
        return Err(ScriptError::type_error(format!(
            "{}() takes at most 1 argument ({} given)",
            name,
            args.len()
        )));
    }
    Ok(args.into_iter().next())
}

fn int_arg(value: &Value) -> Result<i64, ScriptError> {
    match value.number() {
        Some(Number::Int(i)) => Ok(i),
        _ => Err(ScriptError::type_error(format!(
            "an integer is required, got '{}'",
            value.type_name()
        ))),
    }
}

fn to_int(value: &Value) -> Result<Value, ScriptError> {
    match value {
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ScriptError::value_error(format!("invalid literal for int(): '{}'", s))),
        other => match other.number() {
            Some(Number::Int(i)) => Ok(Value::Int(i)),
            Some(Number::Float(f)) if f.is_finite() && f.abs() < 9.2e18 => Ok(Value::Int(f.trunc() as i64)),
            Some(Number::Float(_)) => Err(overflow()),
            None => Err(ScriptError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

fn to_float(value: &Value) -> Result<Value, ScriptError> {
    match value {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ScriptError::value_error(format!("could not convert string to float: {}", s))),
        other => other
            .number()
            .map(|n| Value::Float(n.as_f64()))
            .ok_or_else(|| {
                ScriptError::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))
            }),
    }
}

fn range(args: Vec<Value>) -> Result<Value, ScriptError> {
    let ints = args.iter().map(int_arg).collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(ScriptError::type_error(format!(
                "range expected 1 to 3 arguments, got {}",
                ints.len()
            )))
        }
    };
    if step == 0 {
        return Err(ScriptError::value_error("range() step argument must not be zero"));
    }
    let mut items = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        items.push(Value::Int(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(items))
}

fn extreme(name: &str, args: Vec<Value>, keep: Ordering) -> Result<Value, ScriptError> {
    let items = match args.len() {
        0 => {
            return Err(ScriptError::type_error(format!(
                "{} expected 1 arguments, got 0",
                name
            )))
        }
        1 => args.into_iter().next().map_or(Ok(Vec::new()), |v| v.iterate())?,
        _ => args,
    };
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            Some(current) if item.compare(&current)? != keep => current,
            _ => item,
        });
    }
    best.ok_or_else(|| ScriptError::value_error(format!("{}() arg is an empty sequence", name)))
}

/// Stable insertion sort that can surface comparison errors.
fn sort(items: &mut [Value]) -> Result<(), ScriptError> {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && items[j].compare(&items[j - 1])? == Ordering::Less {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
    Ok(())
}

/// Whether `receiver.name` resolves to a method.
pub fn has_method(receiver: &Value, name: &str) -> bool {
    match receiver {
        Value::Str(_) => matches!(
            name,
            "upper" | "lower" | "strip" | "split" | "join" | "startswith" | "endswith" | "replace" | "find"
        ),
        Value::List(_) => matches!(name, "append" | "extend" | "pop" | "index" | "count"),
        Value::Host(_) => true,
        _ => false,
    }
}

fn str_arg<'a>(method: &str, value: &'a Value) -> Result<&'a str, ScriptError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(ScriptError::type_error(format!(
            "{}() argument must be str, not {}",
            method,
            other.type_name()
        ))),
    }
}

fn no_attribute(receiver: &Value, name: &str) -> ScriptError {
    ScriptError::new(
        ErrorKind::AttributeError,
        format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
    )
}

/// Call a method of a native `str` or `list` value.
pub fn call_method(receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
    match receiver {
        Value::Str(s) => str_method(s, name, args),
        Value::List(items) => {
            let items = items.clone();
            match name {
                "append" => {
                    let [item] = exactly::<1>(name, args)?;
                    items.lock().push(item);
                    Ok(Value::None)
                }
                "extend" => {
                    let [other] = exactly::<1>(name, args)?;
                    let extra = other.iterate()?;
                    items.lock().extend(extra);
                    Ok(Value::None)
                }
                "pop" => {
                    let index = optional(name, args)?.map(|v| int_arg(&v)).transpose()?;
                    let mut guard = items.lock();
                    let len = guard.len() as i64;
                    let index = index.unwrap_or(-1);
                    let index = if index < 0 { index + len } else { index };
                    if guard.is_empty() || index < 0 || index >= len {
                        return Err(ScriptError::new(ErrorKind::IndexError, "pop index out of range"));
                    }
                    Ok(guard.remove(index as usize))
                }
                "index" => {
                    let [needle] = exactly::<1>(name, args)?;
                    let snapshot = items.lock().clone();
                    let position = snapshot.iter().position(|v| v.equals(&needle));
                    position
                        .map(|i| Value::Int(i as i64))
                        .ok_or_else(|| ScriptError::value_error("list.index(x): x not in list"))
                }
                "count" => {
                    let [needle] = exactly::<1>(name, args)?;
                    let snapshot = items.lock().clone();
                    let count = snapshot.iter().filter(|v| v.equals(&needle)).count();
                    Ok(Value::Int(count as i64))
                }
                _ => Err(no_attribute(receiver, name)),
            }
        }
        other => Err(no_attribute(other, name)),
    }
}

fn str_method(s: &str, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
    match name {
        "upper" => {
            exactly::<0>(name, args)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        "lower" => {
            exactly::<0>(name, args)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        "strip" => {
            exactly::<0>(name, args)?;
            Ok(Value::Str(s.trim().to_string()))
        }
        "split" => {
            let parts: Vec<Value> = match optional(name, args)? {
                None | Some(Value::None) => s.split_whitespace().map(|p| Value::Str(p.to_string())).collect(),
                Some(sep) => {
                    let sep = str_arg(name, &sep)?;
                    if sep.is_empty() {
                        return Err(ScriptError::value_error("empty separator"));
                    }
                    s.split(sep).map(|p| Value::Str(p.to_string())).collect()
                }
            };
            Ok(Value::list(parts))
        }
        "join" => {
            let [items] = exactly::<1>(name, args)?;
            let parts = items
                .iterate()?
                .iter()
                .map(|v| str_arg(name, v).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Str(parts.join(s)))
        }
        "startswith" => {
            let [prefix] = exactly::<1>(name, args)?;
            Ok(Value::Bool(s.starts_with(str_arg(name, &prefix)?)))
        }
        "endswith" => {
            let [suffix] = exactly::<1>(name, args)?;
            Ok(Value::Bool(s.ends_with(str_arg(name, &suffix)?)))
        }
        "replace" => {
            let [from, to] = exactly::<2>(name, args)?;
            Ok(Value::Str(s.replace(str_arg(name, &from)?, str_arg(name, &to)?)))
        }
        "find" => {
            let [needle] = exactly::<1>(name, args)?;
            let needle = str_arg(name, &needle)?;
            let index = s
                .find(needle)
                .map_or(-1, |byte| s[..byte].chars().count() as i64);
            Ok(Value::Int(index))
        }
        _ => Err(no_attribute(&Value::Str(s.to_string()), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(value: &Value) -> Vec<i64> {
        match value {
            Value::List(items) => items
                .lock()
                .iter()
                .filter_map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_range_forms() -> Result<(), ScriptError> {
        assert_eq!(ints(&Builtin::Range.call(vec![Value::Int(3)])?), vec![0, 1, 2]);
        assert_eq!(
            ints(&Builtin::Range.call(vec![Value::Int(5), Value::Int(0), Value::Int(-2)])?),
            vec![5, 3, 1]
        );
        assert!(Builtin::Range.call(vec![Value::Int(1), Value::Int(2), Value::Int(0)]).is_err());
        Ok(())
    }

    #[test]
    fn test_len_and_conversions() -> Result<(), ScriptError> {
        assert!(Builtin::Len.call(vec![Value::Str("héllo".into())])?.equals(&Value::Int(5)));
        assert!(Builtin::Int.call(vec![Value::Str(" 42 ".into())])?.equals(&Value::Int(42)));
        assert!(Builtin::Int.call(vec![Value::Float(-2.7)])?.equals(&Value::Int(-2)));
        assert!(Builtin::Float.call(vec![Value::Int(2)])?.equals(&Value::Float(2.0)));
        assert!(Builtin::Int.call(vec![Value::Str("x".into())]).is_err());
        assert!(Builtin::Len.call(vec![Value::Int(1)]).is_err());
        Ok(())
    }

    #[test]
    fn test_arity_message() {
        let err = Builtin::Len.call(Vec::new()).err();
        assert!(err.is_some_and(|e| e.message == "len() takes exactly 1 argument (0 given)"));
    }

    #[test]
    fn test_min_max_sorted_sum() -> Result<(), ScriptError> {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(Builtin::Min.call(vec![list.clone()])?.equals(&Value::Int(1)));
        assert!(Builtin::Max.call(vec![Value::Int(4), Value::Int(9)])?.equals(&Value::Int(9)));
        assert_eq!(ints(&Builtin::Sorted.call(vec![list.clone()])?), vec![1, 2, 3]);
        assert!(Builtin::Sum.call(vec![list])?.equals(&Value::Int(6)));
        assert!(Builtin::Max.call(vec![Value::list(Vec::new())]).is_err());
        Ok(())
    }

    #[test]
    fn test_string_methods() -> Result<(), ScriptError> {
        let s = Value::Str("a,b,c".into());
        let parts = call_method(&s, "split", vec![Value::Str(",".into())])?;
        assert_eq!(parts.repr(), "['a', 'b', 'c']");
        let joined = call_method(&Value::Str("-".into()), "join", vec![parts])?;
        assert_eq!(joined.to_str(), "a-b-c");
        assert_eq!(call_method(&s, "upper", Vec::new())?.to_str(), "A,B,C");
        assert!(call_method(&s, "find", vec![Value::Str("c".into())])?.equals(&Value::Int(4)));
        assert!(call_method(&s, "nope", Vec::new()).is_err());
        Ok(())
    }

    #[test]
    fn test_list_methods_mutate_shared_list() -> Result<(), ScriptError> {
        let list = Value::list(Vec::new());
        call_method(&list, "append", vec![Value::Int(1)])?;
        call_method(&list, "extend", vec![Value::list(vec![Value::Int(2), Value::Int(1)])])?;
        assert_eq!(ints(&list), vec![1, 2, 1]);
        assert!(call_method(&list, "count", vec![Value::Int(1)])?.equals(&Value::Int(2)));
        assert!(call_method(&list, "pop", Vec::new())?.equals(&Value::Int(1)));
        assert!(call_method(&list, "pop", vec![Value::Int(0)])?.equals(&Value::Int(1)));
        assert!(call_method(&list, "pop", vec![Value::Int(5)]).is_err());
        Ok(())
    }

    #[test]
    fn test_list_searched_for_itself() -> Result<(), ScriptError> {
        let list = Value::list(vec![Value::list(vec![Value::Int(1)])]);
        assert!(call_method(&list, "count", vec![list.clone()])?.equals(&Value::Int(0)));
        assert!(call_method(&list, "index", vec![list.clone()]).is_err_and(|e| matches!(e.kind, ErrorKind::ValueError)));
        call_method(&list, "append", vec![list.clone()])?;
        assert!(call_method(&list, "index", vec![list.clone()])?.equals(&Value::Int(1)));
        call_method(&list, "pop", Vec::new())?;
        Ok(())
    }
}
