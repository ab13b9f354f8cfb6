//! The registry of imported spaces.
//!
//! Maps dotted names to entries: a space name maps to its [`Namespace`] and
//! `space.name` maps to the [`Binding`] of one definition. Definition files
//! resolve their `import` statements against it.
//!
//! The registry is a cheap handle around shared state. It is single-threaded
//! by construction (`Rc`/`RefCell`), so it cannot be sent across threads; a
//! program using several threads keeps one registry per thread.

use crate::binding::{Binding, DeferredBinding};
use crate::diagnostics::DiagnosticSink;
use crate::error::{DefError, Result};
use crate::namespace::Namespace;
use defspace_lang::{Args, ImportResolver, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

#[derive(Clone)]
pub enum Entry {
    Namespace(Rc<Namespace>),
    Binding(Binding),
}

impl Entry {
    pub fn value(&self) -> Value {
        match self {
            Entry::Namespace(namespace) => Value::Host(namespace.clone()),
            Entry::Binding(binding) => binding.value(),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    entries: BTreeMap<String, Entry>,
    diagnostics: DiagnosticSink,
}

#[derive(Clone, Default)]
pub struct Registry {
    state: Rc<RefCell<RegistryState>>,
}

/// A registry handle that does not keep the registry alive
#[derive(Clone, Default)]
pub struct WeakRegistry(Weak<RefCell<RegistryState>>);

impl WeakRegistry {
    pub fn upgrade(&self) -> Option<Registry> {
        self.0.upgrade().map(|state| Registry { state })
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry reporting diagnostics to `sink`
    pub fn with_diagnostics(sink: DiagnosticSink) -> Self {
        let registry = Self::new();
        registry.state.borrow_mut().diagnostics = sink;
        registry
    }

    pub fn diagnostics(&self) -> DiagnosticSink {
        self.state.borrow().diagnostics.clone()
    }

    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Rc::downgrade(&self.state))
    }

    /// Register a namespace and its members, replacing whatever an earlier
    /// import of the same space left behind
    pub fn register_namespace(&self, namespace: Rc<Namespace>) {
        let name = namespace.name().to_string();
        let prefix = format!("{}.", name);
        let mut state = self.state.borrow_mut();

        state.entries.retain(|key, _| !key.starts_with(&prefix));
        for member in namespace.names() {
            if let Some(binding) = namespace.member(&member) {
                state
                    .entries
                    .insert(format!("{}{}", prefix, member), Entry::Binding(binding));
            }
        }
        state.entries.insert(name, Entry::Namespace(namespace));
    }

    pub fn entry(&self, dotted: &str) -> Option<Entry> {
        self.state.borrow().entries.get(dotted).cloned()
    }

    /// Look up a dotted name: a space yields its namespace, a definition its
    /// resolved value or, until it is loaded, its deferred binding
    pub fn lookup(&self, dotted: &str) -> Option<Value> {
        self.entry(dotted).map(|entry| entry.value())
    }

    pub fn namespace(&self, name: &str) -> Option<Rc<Namespace>> {
        match self.entry(name)? {
            Entry::Namespace(namespace) => Some(namespace),
            Entry::Binding(_) => None,
        }
    }

    pub fn binding(&self, dotted: &str) -> Option<Binding> {
        match self.entry(dotted)? {
            Entry::Binding(binding) => Some(binding),
            Entry::Namespace(_) => None,
        }
    }

    /// Call the definition registered as `dotted`
    pub fn call(&self, dotted: &str, args: Args) -> Result<Value> {
        let binding = self
            .binding(dotted)
            .ok_or_else(|| DefError::UnknownName(dotted.to_string()))?;
        binding.call(args)
    }

    pub fn names(&self) -> Vec<String> {
        self.state.borrow().entries.keys().cloned().collect()
    }

    /// Swap `deferred` for its loaded value, in the registry and in its
    /// namespace. Slots already taken over by a later import are left alone.
    pub(crate) fn resolve_in_place(&self, deferred: &DeferredBinding, value: Value) {
        let dotted = deferred.qualified_name().to_string();
        let namespace = {
            let mut state = self.state.borrow_mut();
            match state.entries.get_mut(&dotted) {
                Some(Entry::Binding(binding)) if binding.is_deferred(deferred) => {
                    *binding = Binding::Resolved(value.clone());
                }
                _ => return,
            }
            match state.entries.get(deferred.space()) {
                Some(Entry::Namespace(namespace)) => Some(namespace.clone()),
                _ => None,
            }
        };

        if let Some(namespace) = namespace {
            if namespace
                .member(deferred.name())
                .is_some_and(|binding| binding.is_deferred(deferred))
            {
                namespace.install(deferred.name(), Binding::Resolved(value));
            }
        }
        tracing::debug!("Resolved {} in place", dotted);
    }

    /// Import resolution for the unit `unit` of space `space` while it loads
    pub(crate) fn import_context(&self, space: &str, unit: &str) -> ImportContext {
        ImportContext {
            registry: self.clone(),
            space: space.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Resolves the imports of one unit.
///
/// `import a` finds the sibling definition `<space>.a`, then a space named
/// `a`. `import a.b` is looked up as written. A unit importing its own name
/// finds nothing: it is still loading.
pub struct ImportContext {
    registry: Registry,
    space: String,
    unit: String,
}

impl ImportResolver for ImportContext {
    fn resolve(&self, path: &[String]) -> defspace_lang::Result<Option<Value>> {
        let value = match path {
            [name] if *name == self.unit => None,
            [name] => self
                .registry
                .lookup(&format!("{}.{}", self.space, name))
                .or_else(|| self.registry.lookup(name)),
            _ => self.registry.lookup(&path.join(".")),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry_with(space: &str, members: &[(&str, Value)]) -> Registry {
        let registry = Registry::new();
        let ns = Namespace::new(space, PathBuf::from("/tmp"), Default::default());
        for (name, value) in members {
            ns.install(name, Binding::Resolved(value.clone()));
        }
        registry.register_namespace(Rc::new(ns));
        registry
    }

    #[test]
    fn test_lookup_entries() {
        let registry = registry_with("defs", &[("limit", Value::Int(3))]);
        assert_eq!(registry.lookup("defs.limit"), Some(Value::Int(3)));
        assert!(registry.namespace("defs").is_some());
        assert!(registry.lookup("defs.other").is_none());
        assert!(registry.binding("defs").is_none());
        assert_eq!(
            registry.names(),
            vec!["defs".to_string(), "defs.limit".to_string()]
        );
    }

    #[test]
    fn test_reregistering_replaces_members() {
        let registry = registry_with("defs", &[("old", Value::Int(1))]);
        let ns = Namespace::new("defs", PathBuf::from("/tmp"), Default::default());
        ns.install("new", Binding::Resolved(Value::Int(2)));
        registry.register_namespace(Rc::new(ns));

        assert!(registry.lookup("defs.old").is_none());
        assert_eq!(registry.lookup("defs.new"), Some(Value::Int(2)));
    }

    #[test]
    fn test_call_unknown_name() {
        let registry = Registry::new();
        let err = registry.call("defs.nothing", Args::new()).unwrap_err();
        assert!(matches!(err, DefError::UnknownName(name) if name == "defs.nothing"));
    }

    #[test]
    fn test_import_context_resolution() {
        let registry = registry_with("defs", &[("helper", Value::Int(1))]);
        let ns = Namespace::new("tools", PathBuf::from("/tmp"), Default::default());
        ns.install("fmt", Binding::Resolved(Value::Int(2)));
        registry.register_namespace(Rc::new(ns));

        let context = registry.import_context("defs", "main");
        let resolve = |path: &[&str]| {
            let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            context.resolve(&path).unwrap()
        };

        assert_eq!(resolve(&["helper"]), Some(Value::Int(1)));
        assert_eq!(resolve(&["tools", "fmt"]), Some(Value::Int(2)));
        assert!(matches!(resolve(&["tools"]), Some(Value::Host(_))));
        assert_eq!(resolve(&["main"]), None);
        assert_eq!(resolve(&["missing"]), None);
    }

    #[test]
    fn test_weak_handle_does_not_keep_registry_alive() {
        let registry = Registry::new();
        let weak = registry.downgrade();
        assert!(weak.upgrade().is_some());
        drop(registry);
        assert!(weak.upgrade().is_none());
    }
}
