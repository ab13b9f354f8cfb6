//! Builtin functions available to every definition file.

use crate::error::{LangError, Result};
use crate::interpreter::Env;
use crate::value::{NativeFunction, NativeHandler, Value};
use std::rc::Rc;

/// Bind every builtin into `env`
pub fn install(env: &Env) {
    register(env, "print", 0, None, "Print values separated by spaces.", builtin_print);
    register(env, "len", 1, Some(1), "Length of a string, list or map.", builtin_len);
    register(env, "str", 1, Some(1), "String conversion of a value.", builtin_str);
    register(env, "repr", 1, Some(1), "Representation of a value.", builtin_repr);
    register(env, "help", 1, Some(1), "Introspection text for a value.", builtin_help);
    register(env, "push", 2, Some(2), "Append a value to a list.", builtin_push);
    register(env, "keys", 1, Some(1), "Sorted keys of a map.", builtin_keys);
    register(env, "range", 1, Some(2), "Integers from start (default 0) up to end.", builtin_range);
    register(env, "type_of", 1, Some(1), "Name of a value's type.", builtin_type_of);
}

fn register(
    env: &Env,
    name: &'static str,
    min_arity: usize,
    max_arity: Option<usize>,
    doc: &'static str,
    handler: NativeHandler,
) {
    env.define(
        name,
        Value::Native(Rc::new(NativeFunction {
            name,
            min_arity,
            max_arity,
            doc,
            handler,
        })),
    );
}

fn builtin_print(args: &[Value]) -> Result<Value> {
    let parts = args
        .iter()
        .map(Value::display)
        .collect::<Result<Vec<_>>>()?;
    println!("{}", parts.join(" "));
    Ok(Value::None)
}

fn builtin_len(args: &[Value]) -> Result<Value> {
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => {
            return Err(LangError::type_error(format!(
                "'{}' value has no length",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_str(args: &[Value]) -> Result<Value> {
    Ok(Value::str(args[0].display()?))
}

fn builtin_repr(args: &[Value]) -> Result<Value> {
    Ok(Value::str(args[0].repr()?))
}

fn builtin_help(args: &[Value]) -> Result<Value> {
    Ok(Value::str(args[0].help()?))
}

fn builtin_push(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::List(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(Value::None)
        }
        other => Err(LangError::type_error(format!(
            "push() expects a list, got '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_keys(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Map(entries) => Ok(Value::list(
            entries.borrow().keys().map(Value::str).collect(),
        )),
        other => Err(LangError::type_error(format!(
            "keys() expects a map, got '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_range(args: &[Value]) -> Result<Value> {
    let ints = args
        .iter()
        .map(|v| {
            v.as_int().ok_or_else(|| {
                LangError::type_error(format!("range() expects ints, got '{}'", v.type_name()))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let (start, end) = match ints.as_slice() {
        [end] => (0, *end),
        [start, end] => (*start, *end),
        _ => unreachable!("arity checked by caller"),
    };
    Ok(Value::list((start..end).map(Value::Int).collect()))
}

fn builtin_type_of(args: &[Value]) -> Result<Value> {
    Ok(Value::str(args[0].type_name()))
}
