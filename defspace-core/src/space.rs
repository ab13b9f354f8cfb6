//! Assembling a space into a namespace.

use crate::binding::{Binding, DeferredBinding};
use crate::config::SpaceConfig;
use crate::error::{DefError, Result};
use crate::locator::locate;
use crate::namespace::Namespace;
use crate::registry::Registry;
use defspace_lang::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Import the space rooted at `root` into `registry`.
///
/// Every definition found is bound lazily: nothing is loaded until a member
/// is used. The namespace is named after the root directory and registered
/// under that name, with each definition also registered as `space.name`.
/// Importing the same space again replaces its earlier entries.
pub fn import_space(root: &Path, config: &SpaceConfig, registry: &Registry) -> Result<Rc<Namespace>> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let name = root
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.contains('.'))
        .ok_or_else(|| DefError::InvalidSpace { path: root.clone() })?
        .to_string();

    let defs = locate(&root, None, config);
    let policy = config.policy();
    tracing::info!(
        "Importing space {} from {} ({} definitions, {:?})",
        name,
        root.display(),
        defs.len(),
        policy
    );

    let namespace = Namespace::new(&name, root.clone(), defs.clone());
    for (def_name, location) in defs {
        let deferred = DeferredBinding::new(
            location,
            &name,
            &def_name,
            policy,
            registry.downgrade(),
        );
        namespace.install(&def_name, Binding::Deferred(Rc::new(deferred)));
    }

    let namespace = Rc::new(namespace);
    registry.register_namespace(namespace.clone());
    Ok(namespace)
}

/// Import a space and load every definition right away, returning the ones
/// that exist
pub fn locate_and_load(
    root: &Path,
    config: &SpaceConfig,
    registry: &Registry,
) -> Result<BTreeMap<String, Value>> {
    let namespace = import_space(root, config, registry)?;
    let mut loaded = BTreeMap::new();
    for name in namespace.names() {
        let value = match namespace.member(&name) {
            Some(Binding::Deferred(deferred)) => deferred.definition()?,
            Some(Binding::Resolved(value)) => Some(value),
            None => None,
        };
        if let Some(value) = value {
            loaded.insert(name, value);
        }
    }
    Ok(loaded)
}
