//! Deferred bindings: stand-ins for definitions that are not loaded yet.
//!
//! A [`DeferredBinding`] knows where its definition file lives and loads it on
//! first use. Under [`ReloadPolicy::LoadOnce`] the loaded value is cached and
//! the binding replaces itself, in its namespace and in the registry, with
//! [`Binding::Resolved`]. Under [`ReloadPolicy::Reload`] every use runs the
//! file again and nothing is replaced.
//!
//! Script code sees a deferred binding as a host object that forwards every
//! operation to the definition it stands for.

use crate::config::ReloadPolicy;
use crate::diagnostics::Diagnostic;
use crate::error::{DefError, Result};
use crate::loader::{load_definition, Loaded};
use crate::registry::WeakRegistry;
use defspace_lang::{Args, HostObject, LangError, Value};
use defspace_types::QualifiedName;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A registry or namespace slot
#[derive(Clone)]
pub enum Binding {
    Deferred(Rc<DeferredBinding>),
    Resolved(Value),
}

impl Binding {
    /// The value scripts see for this slot
    pub fn value(&self) -> Value {
        match self {
            Binding::Deferred(deferred) => Value::Host(deferred.clone()),
            Binding::Resolved(value) => value.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Binding::Resolved(_))
    }

    /// Call the slot, resolving it first if it is deferred
    pub fn call(&self, args: Args) -> Result<Value> {
        match self {
            Binding::Deferred(deferred) => deferred.call(args),
            Binding::Resolved(value) => Ok(value.call(args)?),
        }
    }

    /// The slot's definition, loading it if needed. `None` when the file
    /// defines nothing under the slot's name.
    pub fn definition(&self) -> Result<Option<Value>> {
        match self {
            Binding::Deferred(deferred) => deferred.definition(),
            Binding::Resolved(value) => Ok(Some(value.clone())),
        }
    }

    pub(crate) fn is_deferred(&self, deferred: &DeferredBinding) -> bool {
        matches!(self, Binding::Deferred(d) if std::ptr::eq(Rc::as_ptr(d), deferred))
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Deferred(deferred) => f
                .debug_tuple("Deferred")
                .field(&deferred.location)
                .finish(),
            Binding::Resolved(value) => f.debug_tuple("Resolved").field(value).finish(),
        }
    }
}

enum LoadState {
    Unloaded,
    Loading,
    Loaded(Loaded),
}

pub struct DeferredBinding {
    location: PathBuf,
    space: String,
    name: String,
    policy: ReloadPolicy,
    registry: WeakRegistry,
    state: RefCell<LoadState>,
}

impl DeferredBinding {
    pub fn new(
        location: PathBuf,
        space: &str,
        name: &str,
        policy: ReloadPolicy,
        registry: WeakRegistry,
    ) -> Self {
        Self {
            location,
            space: space.to_string(),
            name: name.to_string(),
            policy,
            registry,
            state: RefCell::new(LoadState::Unloaded),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.space, &self.name)
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// Whether a load-once binding has a cached result
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Loaded(_))
    }

    /// Load the definition, or return the cached result under load-once
    pub fn resolve(&self) -> Result<Loaded> {
        match &*self.state.borrow() {
            LoadState::Loading => {
                return Err(DefError::CircularLoad {
                    name: self.qualified_name().to_string(),
                });
            }
            LoadState::Loaded(loaded) if self.policy == ReloadPolicy::LoadOnce => {
                return Ok(loaded.clone());
            }
            _ => {}
        }

        let registry = self.registry.upgrade().ok_or_else(|| DefError::Detached {
            name: self.qualified_name().to_string(),
        })?;

        *self.state.borrow_mut() = LoadState::Loading;
        let context = registry.import_context(&self.space, &self.name);
        let result = load_definition(&self.location, &context);

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                *self.state.borrow_mut() = LoadState::Unloaded;
                return Err(err);
            }
        };

        match self.policy {
            ReloadPolicy::LoadOnce => {
                *self.state.borrow_mut() = LoadState::Loaded(loaded.clone());
                if let Loaded::Definition(value) = &loaded {
                    registry.resolve_in_place(self, value.clone());
                }
            }
            ReloadPolicy::Reload => *self.state.borrow_mut() = LoadState::Unloaded,
        }

        Ok(loaded)
    }

    /// The loaded definition without calling it
    pub fn definition(&self) -> Result<Option<Value>> {
        Ok(self.resolve()?.into_value())
    }

    /// Resolve and call the definition.
    ///
    /// Calling a definition that does not exist is not an error: a
    /// diagnostic naming the file is reported and the call yields `none`.
    pub fn call(&self, args: Args) -> Result<Value> {
        match self.resolve()? {
            Loaded::Definition(value) => Ok(value.call(args)?),
            Loaded::Absent(reason) => {
                tracing::debug!("{} is absent ({:?})", self.qualified_name(), reason);
                self.report_absent();
                Ok(Value::None)
            }
        }
    }

    /// Report that the file yields no definition for this binding
    pub fn report_absent(&self) {
        let diagnostic = Diagnostic::missing_definition(&self.location);
        match self.registry.upgrade() {
            Some(registry) => registry.diagnostics().emit(diagnostic),
            None => eprintln!("{}", diagnostic.message),
        }
    }

    fn resolved(&self) -> defspace_lang::Result<Value> {
        self.definition()?.ok_or_else(|| {
            LangError::attribute_error(format!(
                "no definition found at {}",
                self.location.display()
            ))
        })
    }

    fn absent_repr(&self) -> String {
        format!("<no definition at {}>", self.location.display())
    }
}

impl HostObject for DeferredBinding {
    fn type_name(&self) -> &'static str {
        "definition"
    }

    fn call(&self, args: Args) -> defspace_lang::Result<Value> {
        match DeferredBinding::call(self, args) {
            Ok(value) => Ok(value),
            Err(DefError::Lang(err)) => Err(err.raised_in(&self.name)),
            Err(other) => Err(other.into()),
        }
    }

    fn get_attr(&self, name: &str) -> defspace_lang::Result<Value> {
        self.resolved()?.get_attr(name)
    }

    fn set_attr(&self, name: &str, value: Value) -> defspace_lang::Result<()> {
        self.resolved()?.set_attr(name, value)
    }

    fn get_item(&self, key: &Value) -> defspace_lang::Result<Value> {
        self.resolved()?.get_item(key)
    }

    fn set_item(&self, key: Value, value: Value) -> defspace_lang::Result<()> {
        self.resolved()?.set_item(key, value)
    }

    fn display(&self) -> defspace_lang::Result<String> {
        match self.definition()? {
            Some(value) => value.display(),
            None => Ok(self.absent_repr()),
        }
    }

    fn repr(&self) -> defspace_lang::Result<String> {
        match self.definition()? {
            Some(value) => value.repr(),
            None => Ok(self.absent_repr()),
        }
    }

    fn help(&self) -> defspace_lang::Result<String> {
        match self.definition()? {
            Some(value) => value.help(),
            None => Ok(self.absent_repr()),
        }
    }
}
