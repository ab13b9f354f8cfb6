//! The namespace a space is assembled into.

use crate::binding::Binding;
use crate::locator::DefinitionMap;
use defspace_lang::{HostObject, LangError, Result, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Members of one space, each bound to a deferred or resolved definition
pub struct Namespace {
    name: String,
    root: PathBuf,
    defs: DefinitionMap,
    members: RefCell<BTreeMap<String, Binding>>,
}

impl Namespace {
    pub fn new(name: &str, root: PathBuf, defs: DefinitionMap) -> Self {
        Self {
            name: name.to_string(),
            root,
            defs,
            members: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The name to file map found when the space was imported
    pub fn defs(&self) -> &DefinitionMap {
        &self.defs
    }

    pub fn member(&self, name: &str) -> Option<Binding> {
        self.members.borrow().get(name).cloned()
    }

    /// The value scripts see for member `name`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.member(name).map(|binding| binding.value())
    }

    pub fn names(&self) -> Vec<String> {
        self.members.borrow().keys().cloned().collect()
    }

    pub fn install(&self, name: &str, binding: Binding) {
        self.members.borrow_mut().insert(name.to_string(), binding);
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self, name: &str) -> LangError {
        LangError::attribute_error(format!(
            "namespace '{}' has no definition '{}'",
            self.name, name
        ))
    }
}

impl HostObject for Namespace {
    fn type_name(&self) -> &'static str {
        "namespace"
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.get(name) {
            return Ok(value);
        }
        match name {
            "defs" => Ok(Value::map(
                self.defs
                    .iter()
                    .map(|(name, path)| (name.clone(), Value::str(path.to_string_lossy())))
                    .collect(),
            )),
            "name" => Ok(Value::str(&self.name)),
            _ => Err(self.missing(name)),
        }
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        self.install(name, Binding::Resolved(value));
        Ok(())
    }

    fn get_item(&self, key: &Value) -> Result<Value> {
        match key.as_str() {
            Some(name) => self.get(name).ok_or_else(|| self.missing(name)),
            None => Err(LangError::type_error(format!(
                "namespace keys are strings, got '{}'",
                key.type_name()
            ))),
        }
    }

    fn repr(&self) -> Result<String> {
        Ok(format!(
            "<namespace {} ({} definitions)>",
            self.name,
            self.len()
        ))
    }

    fn help(&self) -> Result<String> {
        let mut text = format!("namespace {}\n", self.name);
        for (name, path) in &self.defs {
            text.push_str(&format!("\n  {}  {}", name, path.display()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace() -> Namespace {
        let mut defs = DefinitionMap::new();
        defs.insert("limit".into(), PathBuf::from("/defs/limit/limit.def"));
        let ns = Namespace::new("defs", PathBuf::from("/defs"), defs);
        ns.install("limit", Binding::Resolved(Value::Int(3)));
        ns
    }

    #[test]
    fn test_member_access() {
        let ns = namespace();
        assert_eq!(ns.get_attr("limit").unwrap(), Value::Int(3));
        assert_eq!(ns.get_item(&Value::str("limit")).unwrap(), Value::Int(3));
        assert!(matches!(
            ns.get_attr("missing"),
            Err(LangError::AttributeError { .. })
        ));
        assert_eq!(ns.names(), vec!["limit".to_string()]);
    }

    #[test]
    fn test_defs_map_attribute() {
        let ns = namespace();
        let defs = ns.get_attr("defs").unwrap();
        assert_eq!(
            defs.get_item(&Value::str("limit")).unwrap(),
            Value::str("/defs/limit/limit.def")
        );
    }

    #[test]
    fn test_members_shadow_builtin_attributes() {
        let ns = namespace();
        ns.set_attr("name", Value::str("shadowed")).unwrap();
        assert_eq!(ns.get_attr("name").unwrap(), Value::str("shadowed"));
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn test_repr_and_help() {
        let ns = namespace();
        assert_eq!(ns.repr().unwrap(), "<namespace defs (1 definitions)>");
        insta::assert_snapshot!(ns.help().unwrap(), @r"
        namespace defs

          limit  /defs/limit/limit.def
        ");
    }
}
