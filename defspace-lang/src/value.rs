//! Runtime values of the definition-file language.

use crate::ast::FnDef;
use crate::error::{LangError, Result};
use crate::interpreter::Env;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Arguments passed to a callable: positional values followed by keywords
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keywords.push((name.into(), value));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An object implemented by the embedding program.
///
/// Namespaces and deferred bindings are exposed to definition files through
/// this trait, so scripts can call them, read and assign their attributes and
/// items, and print them like any other value.
pub trait HostObject {
    fn type_name(&self) -> &'static str;

    fn call(&self, _args: Args) -> Result<Value> {
        Err(LangError::type_error(format!(
            "'{}' object is not callable",
            self.type_name()
        )))
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        Err(LangError::attribute_error(format!(
            "'{}' object has no attribute '{}'",
            self.type_name(),
            name
        )))
    }

    fn set_attr(&self, name: &str, _value: Value) -> Result<()> {
        Err(LangError::attribute_error(format!(
            "cannot set attribute '{}' on '{}' object",
            name,
            self.type_name()
        )))
    }

    fn get_item(&self, _key: &Value) -> Result<Value> {
        Err(LangError::type_error(format!(
            "'{}' object is not subscriptable",
            self.type_name()
        )))
    }

    fn set_item(&self, _key: Value, _value: Value) -> Result<()> {
        Err(LangError::type_error(format!(
            "'{}' object does not support item assignment",
            self.type_name()
        )))
    }

    /// String conversion
    fn display(&self) -> Result<String> {
        self.repr()
    }

    fn repr(&self) -> Result<String> {
        Ok(format!("<{}>", self.type_name()))
    }

    /// Introspection text
    fn help(&self) -> Result<String> {
        self.repr()
    }
}

/// A user-defined function together with the scope it closes over
pub struct Function {
    pub def: Rc<FnDef>,
    pub env: Env,
    /// Name of the unit that defined the function
    pub module: Rc<str>,
}

impl Function {
    pub fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("<anonymous>")
    }
}

pub type NativeHandler = fn(&[Value]) -> Result<Value>;

/// A builtin implemented in Rust
pub struct NativeFunction {
    pub name: &'static str,
    pub min_arity: usize,
    /// `None` for variadic builtins
    pub max_arity: Option<usize>,
    pub doc: &'static str,
    pub handler: NativeHandler,
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Host(Rc<dyn HostObject>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "fn",
            Value::Native(_) => "builtin",
            Value::Host(host) => host.type_name(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_) | Value::Host(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) | Value::Host(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Identity comparison: the same allocation for reference values,
    /// equal contents for scalars
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Map(entries) => entries.borrow().get(name).cloned().ok_or_else(|| {
                LangError::attribute_error(format!("map has no attribute '{}'", name))
            }),
            Value::Host(host) => host.get_attr(name),
            Value::Function(func) => match name {
                "name" => Ok(Value::str(func.name())),
                "doc" => Ok(func.def.doc.as_deref().map(Value::str).unwrap_or(Value::None)),
                _ => Err(LangError::attribute_error(format!(
                    "fn has no attribute '{}'",
                    name
                ))),
            },
            other => Err(LangError::attribute_error(format!(
                "'{}' value has no attribute '{}'",
                other.type_name(),
                name
            ))),
        }
    }

    pub fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Map(entries) => {
                entries.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            Value::Host(host) => host.set_attr(name, value),
            other => Err(LangError::attribute_error(format!(
                "cannot set attribute '{}' on '{}' value",
                name,
                other.type_name()
            ))),
        }
    }

    pub fn get_item(&self, key: &Value) -> Result<Value> {
        match (self, key) {
            (Value::List(items), Value::Int(i)) => {
                let items = items.borrow();
                let idx = normalize_index(*i, items.len())?;
                Ok(items[idx].clone())
            }
            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(*i, chars.len())?;
                Ok(Value::str(chars[idx].to_string()))
            }
            (Value::Map(entries), Value::Str(k)) => {
                entries.borrow().get(k.as_ref()).cloned().ok_or_else(|| {
                    LangError::index_error(format!("key {:?} not found", k.as_ref()))
                })
            }
            (Value::Host(host), key) => host.get_item(key),
            (container, key) => Err(LangError::type_error(format!(
                "cannot index '{}' with '{}'",
                container.type_name(),
                key.type_name()
            ))),
        }
    }

    pub fn set_item(&self, key: Value, value: Value) -> Result<()> {
        match (self, &key) {
            (Value::List(items), Value::Int(i)) => {
                let mut items = items.borrow_mut();
                let idx = normalize_index(*i, items.len())?;
                items[idx] = value;
                Ok(())
            }
            (Value::Map(entries), Value::Str(k)) => {
                entries.borrow_mut().insert(k.to_string(), value);
                Ok(())
            }
            (Value::Host(host), _) => host.set_item(key, value),
            (container, key) => Err(LangError::type_error(format!(
                "cannot assign into '{}' with '{}'",
                container.type_name(),
                key.type_name()
            ))),
        }
    }

    /// String conversion: strings print without quotes
    pub fn display(&self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s.to_string()),
            Value::Host(host) => host.display(),
            other => other.repr(),
        }
    }

    pub fn repr(&self) -> Result<String> {
        Ok(match self {
            Value::None => "none".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Str(s) => format!("{:?}", s.as_ref()),
            Value::List(items) => {
                let Some(_visit) = ReprVisit::enter(Rc::as_ptr(items) as *const ()) else {
                    return Ok("[...]".to_string());
                };
                let parts = items
                    .borrow()
                    .iter()
                    .map(Value::repr)
                    .collect::<Result<Vec<_>>>()?;
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let Some(_visit) = ReprVisit::enter(Rc::as_ptr(entries) as *const ()) else {
                    return Ok("{...}".to_string());
                };
                let parts = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", k, v.repr()?)))
                    .collect::<Result<Vec<_>>>()?;
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(func) => format!("<fn {}>", func.def.signature()),
            Value::Native(native) => format!("<builtin {}>", native.name),
            Value::Host(host) => return host.repr(),
        })
    }

    /// Introspection text: signature and docstring for functions
    pub fn help(&self) -> Result<String> {
        match self {
            Value::Function(func) => {
                let mut text = format!("fn {}", func.def.signature());
                if let Some(doc) = &func.def.doc {
                    text.push_str("\n\n");
                    text.push_str(doc);
                }
                Ok(text)
            }
            Value::Native(native) => Ok(format!("builtin {}\n\n{}", native.name, native.doc)),
            Value::Host(host) => host.help(),
            other => Ok(format!("{} value {}", other.type_name(), other.repr()?)),
        }
    }
}

fn normalize_index(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(LangError::index_error(format!(
            "index {} out of range for length {}",
            index, len
        )));
    }
    Ok(resolved as usize)
}

thread_local! {
    static REPR_ACTIVE: RefCell<Vec<*const ()>> = const { RefCell::new(Vec::new()) };
    static EQ_ACTIVE: RefCell<Vec<(*const (), *const ())>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container as being rendered; a container that contains itself
/// renders the inner occurrence as `[...]` or `{...}`
struct ReprVisit(*const ());

impl ReprVisit {
    fn enter(ptr: *const ()) -> Option<Self> {
        REPR_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&ptr) {
                return None;
            }
            active.push(ptr);
            Some(ReprVisit(ptr))
        })
    }
}

impl Drop for ReprVisit {
    fn drop(&mut self) {
        REPR_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|p| *p == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// Pairs of containers under comparison. Meeting a pair again means the
/// structures recurse in step, which counts as equal.
struct EqVisit((*const (), *const ()));

impl EqVisit {
    fn compare(a: *const (), b: *const (), eq: impl FnOnce() -> bool) -> bool {
        let pair = (a, b);
        let entered = EQ_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&pair) {
                return false;
            }
            active.push(pair);
            true
        });
        if !entered {
            return true;
        }
        let _visit = EqVisit(pair);
        eq()
    }
}

impl Drop for EqVisit {
    fn drop(&mut self) {
        EQ_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|p| *p == self.0) {
                active.remove(pos);
            }
        });
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b)
                    || EqVisit::compare(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const (), || {
                        *a.borrow() == *b.borrow()
                    })
            }
            (Value::Map(a), Value::Map(b)) => {
                Rc::ptr_eq(a, b)
                    || EqVisit::compare(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const (), || {
                        *a.borrow() == *b.borrow()
                    })
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display() {
            Ok(text) => f.write_str(&text),
            Err(err) => write!(f, "<{} error: {}>", self.type_name(), err),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(text) => f.write_str(&text),
            Err(err) => write!(f, "<{} error: {}>", self.type_name(), err),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}
