//! # defspace-core
//!
//! Convention-based discovery of definitions.
//!
//! A space is a directory whose sub-directories each hold one definition
//! file named after the directory (`greet/greet.def`). Importing a space
//! binds every definition found under a namespace named after the space,
//! without loading anything; each definition is loaded on first use.
//!
//! ```ignore
//! let registry = Registry::new();
//! let defs = import_space(Path::new("defs"), &SpaceConfig::from_env(), &registry)?;
//! let greeting = registry.call("defs.greet", Args::positional(["Sam".into()]))?;
//! ```

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod locator;
pub mod namespace;
pub mod registry;
pub mod space;

pub use binding::{Binding, DeferredBinding};
pub use config::{ConfigError, ReloadPolicy, SpaceConfig, RELOAD_ENV_VAR};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::{DefError, Result};
pub use loader::{load_definition, AbsentReason, Loaded};
pub use locator::{locate, DefinitionMap};
pub use namespace::Namespace;
pub use registry::{Entry, ImportContext, Registry, WeakRegistry};
pub use space::{import_space, locate_and_load};
