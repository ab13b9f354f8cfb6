//! Finding definition files in a space.
//!
//! A space is a directory tree. Every sub-directory `D`, at any depth, that
//! contains a file `D/D.def` defines the name `D`. Directories whose name
//! starts with the reserved prefix are skipped together with everything
//! beneath them.

use crate::config::SpaceConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Definition names mapped to the file defining them
pub type DefinitionMap = BTreeMap<String, PathBuf>;

/// Scan `root` for definition files.
///
/// Nothing is loaded. With a `target`, scanning stops as soon as that name
/// has been found. Unreadable entries are skipped and a missing root yields
/// an empty map. When two directories share a name the one visited last
/// wins; traversal is sorted by file name so the outcome is stable.
pub fn locate(root: &Path, target: Option<&str>, config: &SpaceConfig) -> DefinitionMap {
    let mut defs = DefinitionMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_reserved_dir(entry, config));

    for entry in walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let candidate = entry.path().join(config.definition_file_name(name));
        if !candidate.is_file() {
            continue;
        }

        tracing::debug!("Found definition {} at {}", name, candidate.display());
        if let Some(previous) = defs.insert(name.to_string(), candidate) {
            tracing::debug!(
                "Definition {} at {} was shadowed",
                name,
                previous.display()
            );
        }

        if target == Some(name) {
            break;
        }
    }

    defs
}

fn is_reserved_dir(entry: &DirEntry, config: &SpaceConfig) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| config.is_reserved(name))
}
