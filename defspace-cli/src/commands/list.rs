//! List the definitions of a space.

use super::{open_space, SpaceOptions};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct DefinitionSummary<'a> {
    name: &'a str,
    qualified_name: String,
    path: String,
}

pub fn list_definitions(options: &SpaceOptions, json: bool) -> Result<()> {
    let session = open_space(options)?;
    let namespace = &session.namespace;

    let summaries: Vec<DefinitionSummary> = namespace
        .defs()
        .iter()
        .map(|(name, path)| DefinitionSummary {
            name,
            qualified_name: session.qualify(name).to_string(),
            path: path.display().to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No definitions in {}", namespace.root().display());
        return Ok(());
    }

    let width = summaries.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for summary in &summaries {
        println!("{:width$}  {}", summary.name, summary.path, width = width);
    }
    Ok(())
}
