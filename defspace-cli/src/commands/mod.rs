//! CLI command implementations.

pub mod call;
pub mod describe;
pub mod list;

pub use call::call_definition;
pub use describe::{describe_definition, show_definition};
pub use list::list_definitions;

use anyhow::{Context, Result};
use defspace_core::{import_space, DiagnosticSink, Namespace, Registry, SpaceConfig};
use defspace_lang::Value;
use defspace_types::QualifiedName;
use std::path::PathBuf;
use std::rc::Rc;

/// Where and how to import the space
pub struct SpaceOptions {
    pub space: PathBuf,
    pub config: Option<PathBuf>,
    pub reload: bool,
}

/// An imported space ready for use
pub struct Session {
    pub registry: Registry,
    pub namespace: Rc<Namespace>,
}

impl Session {
    /// Registry name for `name`: bare names belong to the imported space
    pub fn qualify(&self, name: &str) -> QualifiedName {
        QualifiedName::parse(name)
            .unwrap_or_else(|| QualifiedName::new(self.namespace.name(), name))
    }

    /// Value registered for `name`, failing if nothing is
    pub fn lookup(&self, name: &str) -> Result<Value> {
        let dotted = self.qualify(name).to_string();
        self.registry
            .lookup(&dotted)
            .with_context(|| format!("Unknown definition: {}", dotted))
    }
}

pub fn open_space(options: &SpaceOptions) -> Result<Session> {
    open_space_with(options, DiagnosticSink::default())
}

/// Import the space with diagnostics going to `sink`
pub fn open_space_with(options: &SpaceOptions, sink: DiagnosticSink) -> Result<Session> {
    let mut config = SpaceConfig::load(&options.space, options.config.as_deref())
        .context("Failed to load configuration")?;
    if options.reload {
        config.reload = true;
    }

    let registry = Registry::with_diagnostics(sink);
    let namespace = import_space(&options.space, &config, &registry)
        .with_context(|| format!("Failed to import space {}", options.space.display()))?;
    Ok(Session {
        registry,
        namespace,
    })
}
