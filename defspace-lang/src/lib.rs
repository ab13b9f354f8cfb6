//! # defspace definition language
//!
//! Definition files are small scripts executed in their own global scope.
//! The embedding program reads back the binding that carries the file's
//! name, so a file `greet.def` is expected to define `greet`:
//!
//! ```ignore
//! import format            # sibling definition, resolved lazily
//!
//! fn greet(name, greeting = "hi") {
//!   "Greets someone by name."
//!   greeting + " " + name
//! }
//! ```
//!
//! Values are dynamically typed: none, booleans, ints, floats, strings,
//! lists, maps, functions and host objects provided by the embedder.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

#[cfg(test)]
mod tests;

pub use ast::Program;
pub use error::{ErrorContext, LangError, Result};
pub use interpreter::{call_function, Env, ImportResolver, Interpreter, Module, NoImports};
pub use lexer::{tokenize, SpannedToken, Token};
pub use parser::{parse, Parser};
pub use value::{Args, Function, HostObject, NativeFunction, Value};

pub use defspace_types::Span;

/// Parse definition source into a program
pub fn parse_source(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    parse(&tokens)
}

/// Execute standalone source and return the value of its last expression
pub fn eval(source: &str) -> Result<Value> {
    let mut interpreter = Interpreter::new(&NoImports);
    let module = interpreter.execute_module("__main__", source)?;
    Ok(module.last_value().clone())
}
