//! Inspect a definition without calling it.

use super::{open_space, SpaceOptions};
use anyhow::Result;

/// Print the help text of a definition
pub fn describe_definition(options: &SpaceOptions, name: &str) -> Result<()> {
    let session = open_space(options)?;
    let value = session.lookup(name)?;
    println!("{}", value.help()?);
    Ok(())
}

/// Print the representation of a definition
pub fn show_definition(options: &SpaceOptions, name: &str) -> Result<()> {
    let session = open_space(options)?;
    let value = session.lookup(name)?;
    println!("{}", value.repr()?);
    Ok(())
}
