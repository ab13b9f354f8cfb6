use crate::ast::{BinaryOp, Block, Expr, ExprKind, Literal, Program, Stmt, UnaryOp};
use crate::builtins;
use crate::error::{LangError, Result, Span};
use crate::value::{Args, Function, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

/// A lexical scope chain
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    pub fn root() -> Self {
        Env(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.0.borrow();
        match scope.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    /// Bind `name` in this scope, shadowing outer bindings
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    /// Rebind `name` in the nearest scope that has it
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut scope = self.0.borrow_mut();
        if let Some(slot) = scope.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        match scope.parent.clone() {
            Some(parent) => {
                drop(scope);
                parent.assign(name, value)
            }
            None => false,
        }
    }

    /// Names bound directly in this scope
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().vars.keys().cloned().collect();
        names.sort();
        names
    }

    fn get_local(&self, name: &str) -> Option<Value> {
        self.0.borrow().vars.get(name).cloned()
    }
}

/// Resolves `import` statements of a unit being executed
pub trait ImportResolver {
    /// `Ok(None)` means no module with that path exists
    fn resolve(&self, path: &[String]) -> Result<Option<Value>>;
}

/// Resolver for standalone units: every import fails as not found
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&self, _path: &[String]) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// An executed unit and its global scope
pub struct Module {
    name: Rc<str>,
    globals: Env,
    last_value: Value,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a global binding defined by the unit itself (builtins excluded)
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get_local(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.globals.local_names()
    }

    /// Value of the last top-level expression statement
    pub fn last_value(&self) -> &Value {
        &self.last_value
    }
}

enum Flow {
    Normal(Value),
    Return(Value),
}

/// Executes definition files
pub struct Interpreter<'r> {
    resolver: &'r dyn ImportResolver,
}

impl<'r> Interpreter<'r> {
    pub fn new(resolver: &'r dyn ImportResolver) -> Self {
        Self { resolver }
    }

    /// Run `source` as a unit named `name` in a fresh global scope
    pub fn execute_module(&mut self, name: &str, source: &str) -> Result<Module> {
        let tokens = crate::lexer::tokenize(source)?;
        let program = crate::parser::parse(&tokens)?;
        self.execute_program(name, &program)
    }

    pub fn execute_program(&mut self, name: &str, program: &Program) -> Result<Module> {
        let module: Rc<str> = Rc::from(name);
        let builtins_env = Env::root();
        builtins::install(&builtins_env);
        let globals = builtins_env.child();

        let mut last_value = Value::None;
        for stmt in &program.stmts {
            if let Stmt::Import { path, alias, span } = stmt {
                let value = self.import(path, *span)?;
                let binding = alias.as_ref().or_else(|| path.last());
                if let Some(binding) = binding {
                    globals.define(binding.clone(), value);
                }
                last_value = Value::None;
                continue;
            }
            match exec_stmt(stmt, &globals, &module)? {
                Flow::Normal(value) => last_value = value,
                Flow::Return(_) => {
                    return Err(LangError::EvaluationError {
                        span: stmt.span(),
                        message: "'return' outside function".to_string(),
                    });
                }
            }
        }

        Ok(Module {
            name: module,
            globals,
            last_value,
        })
    }

    fn import(&self, path: &[String], span: Span) -> Result<Value> {
        tracing::trace!(module = %path.join("."), "resolving import");
        match self.resolver.resolve(path) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(LangError::ModuleNotFound {
                span,
                module: path.join("."),
            }),
            Err(err) => Err(err.at(span)),
        }
    }
}

fn exec_block(block: &Block, env: &Env, module: &Rc<str>) -> Result<Flow> {
    let scope = env.child();
    let mut last = Value::None;
    for stmt in &block.stmts {
        match exec_stmt(stmt, &scope, module)? {
            Flow::Normal(value) => last = value,
            ret @ Flow::Return(_) => return Ok(ret),
        }
    }
    Ok(Flow::Normal(last))
}

fn exec_stmt(stmt: &Stmt, env: &Env, module: &Rc<str>) -> Result<Flow> {
    match stmt {
        Stmt::Import { span, .. } => Err(LangError::EvaluationError {
            span: *span,
            message: "'import' is only allowed at the top level".to_string(),
        }),

        Stmt::Let { name, value, .. } => {
            let value = eval_expr(value, env, module)?;
            env.define(name.clone(), value);
            Ok(Flow::Normal(Value::None))
        }

        Stmt::FnDecl(def) => {
            let func = Function {
                def: def.clone(),
                env: env.clone(),
                module: module.clone(),
            };
            if let Some(name) = &def.name {
                env.define(name.clone(), Value::Function(Rc::new(func)));
            }
            Ok(Flow::Normal(Value::None))
        }

        Stmt::Assign { target, value, span } => {
            let value = eval_expr(value, env, module)?;
            assign(target, value, env, module).map_err(|e| e.at(*span))?;
            Ok(Flow::Normal(Value::None))
        }

        Stmt::Return { value, .. } => {
            let value = match value {
                Some(expr) => eval_expr(expr, env, module)?,
                None => Value::None,
            };
            Ok(Flow::Return(value))
        }

        Stmt::While {
            condition, body, ..
        } => {
            while eval_expr(condition, env, module)?.is_truthy() {
                if let ret @ Flow::Return(_) = exec_block(body, env, module)? {
                    return Ok(ret);
                }
            }
            Ok(Flow::Normal(Value::None))
        }

        Stmt::For {
            var,
            iterable,
            body,
            span,
        } => {
            let items = iterate(&eval_expr(iterable, env, module)?).map_err(|e| e.at(*span))?;
            for item in items {
                let scope = env.child();
                scope.define(var.clone(), item);
                if let ret @ Flow::Return(_) = exec_block(body, &scope, module)? {
                    return Ok(ret);
                }
            }
            Ok(Flow::Normal(Value::None))
        }

        Stmt::Expr(expr) if matches!(expr.kind, ExprKind::If { .. }) => {
            exec_if(expr, env, module)
        }

        Stmt::Expr(expr) => Ok(Flow::Normal(eval_expr(expr, env, module)?)),
    }
}

fn assign(target: &Expr, value: Value, env: &Env, module: &Rc<str>) -> Result<()> {
    match &target.kind {
        ExprKind::Ident(name) => {
            if env.assign(name, value) {
                Ok(())
            } else {
                Err(LangError::UnboundIdentifier {
                    span: target.span,
                    name: name.clone(),
                })
            }
        }
        ExprKind::Attr { object, name } => {
            let object = eval_expr(object, env, module)?;
            object.set_attr(name, value)
        }
        ExprKind::Index { object, index } => {
            let object = eval_expr(object, env, module)?;
            let index = eval_expr(index, env, module)?;
            object.set_item(index, value)
        }
        _ => Err(LangError::EvaluationError {
            span: target.span,
            message: "Invalid assignment target".to_string(),
        }),
    }
}

fn iterate(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Map(entries) => Ok(entries.borrow().keys().map(Value::str).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(LangError::type_error(format!(
            "'{}' value is not iterable",
            other.type_name()
        ))),
    }
}

fn eval_expr(expr: &Expr, env: &Env, module: &Rc<str>) -> Result<Value> {
    match &expr.kind {
        ExprKind::Literal(lit) => Ok(match lit {
            Literal::None => Value::None,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::str(s),
        }),

        ExprKind::Ident(name) => env.get(name).ok_or_else(|| LangError::UnboundIdentifier {
            span: expr.span,
            name: name.clone(),
        }),

        ExprKind::List(items) => {
            let values = items
                .iter()
                .map(|item| eval_expr(item, env, module))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::list(values))
        }

        ExprKind::Map(entries) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval_expr(value, env, module)?);
            }
            Ok(Value::map(map))
        }

        ExprKind::Fn(def) => Ok(Value::Function(Rc::new(Function {
            def: def.clone(),
            env: env.clone(),
            module: module.clone(),
        }))),

        ExprKind::Call { callee, args } => {
            let callee = eval_expr(callee, env, module)?;
            let mut call_args = Args::new();
            for arg in args {
                let value = eval_expr(&arg.value, env, module)?;
                match &arg.name {
                    Some(name) => call_args.keywords.push((name.clone(), value)),
                    None => call_args.positional.push(value),
                }
            }
            let result = callee.call(call_args);
            let result = match &callee {
                Value::Function(func) if func.module != *module => {
                    result.map_err(|e| e.raised_in(&func.module))
                }
                _ => result,
            };
            result.map_err(|e| e.at(expr.span))
        }

        ExprKind::Attr { object, name } => {
            let object = eval_expr(object, env, module)?;
            object.get_attr(name).map_err(|e| e.at(expr.span))
        }

        ExprKind::Index { object, index } => {
            let object = eval_expr(object, env, module)?;
            let index = eval_expr(index, env, module)?;
            object.get_item(&index).map_err(|e| e.at(expr.span))
        }

        ExprKind::Unary { op, operand } => {
            let value = eval_expr(operand, env, module)?;
            match (op, &value) {
                (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
                (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(|| {
                    LangError::EvaluationError {
                        span: expr.span,
                        message: "integer overflow".to_string(),
                    }
                }),
                (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                (UnaryOp::Neg, v) => Err(LangError::TypeError {
                    span: expr.span,
                    message: format!("cannot negate '{}'", v.type_name()),
                }),
            }
        }

        ExprKind::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => {
                let lhs = eval_expr(lhs, env, module)?;
                if !lhs.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval_expr(rhs, env, module)?.is_truthy()))
            }
            BinaryOp::Or => {
                let lhs = eval_expr(lhs, env, module)?;
                if lhs.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval_expr(rhs, env, module)?.is_truthy()))
            }
            _ => {
                let lhs = eval_expr(lhs, env, module)?;
                let rhs = eval_expr(rhs, env, module)?;
                binary_op(*op, &lhs, &rhs).map_err(|e| e.at(expr.span))
            }
        },

        ExprKind::If { .. } => match exec_if(expr, env, module)? {
            Flow::Normal(value) => Ok(value),
            Flow::Return(_) => Err(LangError::EvaluationError {
                span: expr.span,
                message: "'return' is only allowed in statement position".to_string(),
            }),
        },
    }
}

/// Run an if-expression, letting `return` in its branches escape
fn exec_if(expr: &Expr, env: &Env, module: &Rc<str>) -> Result<Flow> {
    let ExprKind::If {
        condition,
        then_branch,
        else_branch,
    } = &expr.kind
    else {
        return Ok(Flow::Normal(eval_expr(expr, env, module)?));
    };

    if eval_expr(condition, env, module)?.is_truthy() {
        exec_block(then_branch, env, module)
    } else if let Some(block) = else_branch {
        exec_block(block, env, module)
    } else {
        Ok(Flow::Normal(Value::None))
    }
}

fn binary_op(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    use Value::{Float, Int, Str};

    let overflow = || LangError::evaluation_error("integer overflow");
    let mismatch = || {
        LangError::type_error(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))
    };

    match op {
        BinaryOp::Eq => return Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => return Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Int(a), Int(b)) => a.partial_cmp(b),
                (Str(a), Str(b)) => a.partial_cmp(b),
                _ => match (as_float(lhs), as_float(rhs)) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => return Err(mismatch()),
                },
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            return Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }));
        }
        _ => {}
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Str(a), Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Add, Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or_else(overflow),
        (BinaryOp::Sub, Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or_else(overflow),
        (BinaryOp::Mul, Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or_else(overflow),
        (BinaryOp::Div | BinaryOp::Rem, Int(_), Int(0)) => {
            Err(LangError::evaluation_error("division by zero"))
        }
        (BinaryOp::Div, Int(a), Int(b)) => a.checked_div(*b).map(Int).ok_or_else(overflow),
        (BinaryOp::Rem, Int(a), Int(b)) => a.checked_rem(*b).map(Int).ok_or_else(overflow),
        (op, lhs, rhs) => {
            let (Some(a), Some(b)) = (as_float(lhs), as_float(rhs)) else {
                return Err(mismatch());
            };
            match op {
                BinaryOp::Add => Ok(Float(a + b)),
                BinaryOp::Sub => Ok(Float(a - b)),
                BinaryOp::Mul => Ok(Float(a * b)),
                BinaryOp::Div if b == 0.0 => Err(LangError::evaluation_error("division by zero")),
                BinaryOp::Div => Ok(Float(a / b)),
                BinaryOp::Rem => Ok(Float(a % b)),
                _ => Err(mismatch()),
            }
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Nested calls allowed before a call fails instead of exhausting the stack
pub const MAX_CALL_DEPTH: usize = 128;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of call depth for as long as it lives
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(LangError::evaluation_error("maximum recursion depth exceeded"));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Call a user-defined function, binding positional and keyword arguments
pub fn call_function(func: &Function, args: Args) -> Result<Value> {
    let _depth = DepthGuard::enter()?;
    let def = &func.def;
    let scope = func.env.child();

    if args.positional.len() > def.params.len() {
        return Err(LangError::ArityMismatch {
            span: Span::default(),
            name: func.name().to_string(),
            expected: format!("at most {}", def.params.len()),
            got: args.positional.len(),
        });
    }

    let mut slots: Vec<Option<Value>> = vec![None; def.params.len()];
    for (slot, value) in slots.iter_mut().zip(args.positional) {
        *slot = Some(value);
    }
    for (name, value) in args.keywords {
        let Some(idx) = def.params.iter().position(|p| p.name == name) else {
            return Err(LangError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                func.name(),
                name
            )));
        };
        if slots[idx].is_some() {
            return Err(LangError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                func.name(),
                name
            )));
        }
        slots[idx] = Some(value);
    }

    for (param, slot) in def.params.iter().zip(slots) {
        let value = match (slot, &param.default) {
            (Some(value), _) => value,
            // Defaults are evaluated at call time, in the function's scope
            (None, Some(default)) => eval_expr(default, &scope, &func.module)?,
            (None, None) => {
                return Err(LangError::type_error(format!(
                    "{}() missing required argument '{}'",
                    func.name(),
                    param.name
                )));
            }
        };
        scope.define(param.name.clone(), value);
    }

    match exec_block(&def.body, &scope, &func.module)? {
        Flow::Normal(value) | Flow::Return(value) => Ok(value),
    }
}

impl Value {
    /// Invoke a callable value
    pub fn call(&self, args: Args) -> Result<Value> {
        match self {
            Value::Function(func) => call_function(func, args),
            Value::Native(native) => {
                if !args.keywords.is_empty() {
                    return Err(LangError::type_error(format!(
                        "{}() takes no keyword arguments",
                        native.name
                    )));
                }
                let got = args.positional.len();
                let too_many = native.max_arity.is_some_and(|max| got > max);
                if got < native.min_arity || too_many {
                    let expected = match native.max_arity {
                        Some(max) if max == native.min_arity => max.to_string(),
                        Some(max) => format!("{} to {}", native.min_arity, max),
                        None => format!("at least {}", native.min_arity),
                    };
                    return Err(LangError::ArityMismatch {
                        span: Span::default(),
                        name: native.name.to_string(),
                        expected,
                        got,
                    });
                }
                (native.handler)(&args.positional)
            }
            Value::Host(host) => host.call(args),
            other => Err(LangError::type_error(format!(
                "'{}' value is not callable",
                other.type_name()
            ))),
        }
    }
}
