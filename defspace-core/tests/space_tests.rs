//! Integration tests for importing spaces and using their definitions

use defspace_core::{
    import_space, locate_and_load, Binding, DefError, DiagnosticSink, Registry, SpaceConfig,
};
use defspace_lang::{Args, LangError, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary space named `defs`
struct Space {
    _dir: TempDir,
    root: PathBuf,
}

impl Space {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("defs");
        fs::create_dir_all(&root).unwrap();
        Self { _dir: dir, root }
    }

    fn define(&self, name: &str, source: &str) -> PathBuf {
        self.define_at(name, name, source)
    }

    fn define_at(&self, rel_dir: &str, name: &str, source: &str) -> PathBuf {
        let dir = self.root.join(rel_dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.def", name));
        fs::write(&path, source).unwrap();
        path
    }
}

fn collecting_registry() -> (Registry, DiagnosticSink) {
    let sink = DiagnosticSink::collecting();
    (Registry::with_diagnostics(sink.clone()), sink)
}

fn load_once() -> SpaceConfig {
    SpaceConfig::default()
}

fn reload() -> SpaceConfig {
    SpaceConfig {
        reload: true,
        ..SpaceConfig::default()
    }
}

fn sam() -> Args {
    Args::positional([Value::str("Sam")])
}

#[test]
fn test_greet_through_namespace_and_registry() {
    let space = Space::new();
    space.define("greet", "fn greet(name) { \"hi \" + name }\n");
    let (registry, _) = collecting_registry();

    let ns = import_space(&space.root, &load_once(), &registry).unwrap();
    assert_eq!(ns.name(), "defs");
    assert_eq!(ns.names(), vec!["greet".to_string()]);

    let greet = ns.get("greet").unwrap();
    assert_eq!(greet.call(sam()).unwrap(), Value::str("hi Sam"));
    assert_eq!(registry.call("defs.greet", sam()).unwrap(), Value::str("hi Sam"));
}

#[test]
fn test_nothing_is_loaded_at_import() {
    let space = Space::new();
    space.define("bad", "let bad = 1 / 0\n");
    let registry = Registry::new();

    let ns = import_space(&space.root, &load_once(), &registry).unwrap();
    let Some(Binding::Deferred(deferred)) = ns.member("bad") else {
        panic!("Expected a deferred binding");
    };
    assert!(!deferred.is_loaded());
    assert!(registry.call("defs.bad", Args::new()).is_err());
}

#[test]
fn test_missing_binding_reports_diagnostic() {
    let space = Space::new();
    let path = space.define("broken", "let something_else = 1\n");
    let (registry, sink) = collecting_registry();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let result = registry.call("defs.broken", Args::new()).unwrap();
    assert!(result.is_none());

    let diagnostics = sink.collected();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.starts_with("No definition found at "));
    assert!(diagnostics[0]
        .location
        .as_deref()
        .is_some_and(|location| location.ends_with("broken/broken.def")));
    assert_eq!(
        fs::canonicalize(diagnostics[0].location.as_deref().unwrap()).unwrap(),
        fs::canonicalize(path).unwrap()
    );

    // Absent definitions stay deferred and report on every call
    assert!(matches!(
        registry.binding("defs.broken"),
        Some(Binding::Deferred(_))
    ));
    registry.call("defs.broken", Args::new()).unwrap();
    assert_eq!(sink.collected().len(), 2);
}

#[test]
fn test_attribute_of_absent_definition_fails() {
    let space = Space::new();
    space.define("broken", "let other = 1\n");
    space.define("inspect", "import broken\nlet inspect = broken.size\n");
    let (registry, _) = collecting_registry();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let err = registry.call("defs.inspect", Args::new()).unwrap_err();
    assert!(matches!(
        err.lang_error(),
        Some(LangError::AttributeError { .. })
    ));
}

#[test]
fn test_load_once_replaces_binding_in_place() {
    let space = Space::new();
    space.define("items", "let items = [1, 2]\n");
    let registry = Registry::new();
    let ns = import_space(&space.root, &load_once(), &registry).unwrap();

    assert!(matches!(registry.lookup("defs.items"), Some(Value::Host(_))));

    let Some(Binding::Deferred(deferred)) = registry.binding("defs.items") else {
        panic!("Expected a deferred binding");
    };
    let first = deferred.definition().unwrap().unwrap();
    let second = deferred.definition().unwrap().unwrap();
    assert!(first.same(&second));

    assert!(registry.binding("defs.items").unwrap().is_resolved());
    assert!(ns.member("items").unwrap().is_resolved());
    let looked_up = registry.lookup("defs.items").unwrap();
    assert!(looked_up.same(&first));
    assert!(ns.get("items").unwrap().same(&first));
}

#[test]
fn test_reload_runs_the_file_each_time() {
    let space = Space::new();
    space.define("items", "let items = [1, 2]\n");
    let registry = Registry::new();
    import_space(&space.root, &reload(), &registry).unwrap();

    let Some(Binding::Deferred(deferred)) = registry.binding("defs.items") else {
        panic!("Expected a deferred binding");
    };
    let first = deferred.definition().unwrap().unwrap();
    let second = deferred.definition().unwrap().unwrap();
    assert_eq!(first, second);
    assert!(!first.same(&second));
    assert!(!deferred.is_loaded());
    assert!(matches!(
        registry.binding("defs.items"),
        Some(Binding::Deferred(_))
    ));
}

#[test]
fn test_reload_sees_edits() {
    let space = Space::new();
    space.define("version", "fn version() { 1 }\n");
    let registry = Registry::new();
    import_space(&space.root, &reload(), &registry).unwrap();

    assert_eq!(registry.call("defs.version", Args::new()).unwrap(), Value::Int(1));
    space.define("version", "fn version() { 2 }\n");
    assert_eq!(registry.call("defs.version", Args::new()).unwrap(), Value::Int(2));
}

#[test]
fn test_load_once_ignores_edits() {
    let space = Space::new();
    space.define("version", "fn version() { 1 }\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    assert_eq!(registry.call("defs.version", Args::new()).unwrap(), Value::Int(1));
    space.define("version", "fn version() { 2 }\n");
    assert_eq!(registry.call("defs.version", Args::new()).unwrap(), Value::Int(1));
}

#[test]
fn test_missing_import_error_propagates() {
    let space = Space::new();
    space.define("report", "import helpers\nfn report() { helpers() }\n");
    let (registry, sink) = collecting_registry();
    import_space(&space.root, &load_once(), &registry).unwrap();

    for _ in 0..2 {
        let err = registry.call("defs.report", Args::new()).unwrap_err();
        assert!(matches!(err, DefError::Definition { .. }));
        assert_eq!(err.lang_error().and_then(|e| e.missing_module()), Some("helpers"));
    }
    assert!(sink.collected().is_empty());
}

#[test]
fn test_self_import_is_absent() {
    let space = Space::new();
    space.define("echo", "import echo\nfn echo(x) { x }\n");
    let (registry, sink) = collecting_registry();
    import_space(&space.root, &load_once(), &registry).unwrap();

    assert!(registry.call("defs.echo", sam()).unwrap().is_none());
    assert_eq!(sink.collected().len(), 1);
}

#[test]
fn test_sibling_imports() {
    let space = Space::new();
    space.define("wrap", "fn wrap(x) { \"<\" + x + \">\" }\n");
    space.define("shout", "import wrap\nfn shout(x) { wrap(x + \"!\") }\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let result = registry
        .call("defs.shout", Args::positional([Value::str("hey")]))
        .unwrap();
    assert_eq!(result, Value::str("<hey!>"));
    assert!(registry.binding("defs.wrap").unwrap().is_resolved());
}

#[test]
fn test_namespace_import_from_script() {
    let space = Space::new();
    space.define("greet", "fn greet(name) { \"hi \" + name }\n");
    space.define("main", "import defs\nlet main = defs.greet(\"Ada\")\n");
    space.define("alias", "import defs.greet as hello\nlet alias = hello(\"Bo\")\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let Some(Binding::Deferred(main)) = registry.binding("defs.main") else {
        panic!("Expected a deferred binding");
    };
    assert_eq!(main.definition().unwrap(), Some(Value::str("hi Ada")));
    let Some(Binding::Deferred(alias)) = registry.binding("defs.alias") else {
        panic!("Expected a deferred binding");
    };
    assert_eq!(alias.definition().unwrap(), Some(Value::str("hi Bo")));
}

#[test]
fn test_reload_does_not_keep_mutations() {
    let space = Space::new();
    space.define("settings", "let settings = { level: 3, tags: [\"a\"] }\n");
    space.define(
        "bump",
        "import settings\n\
         settings.level = 10\n\
         let bump = [settings.level, len(settings.tags)]\n",
    );
    let registry = Registry::new();
    import_space(&space.root, &reload(), &registry).unwrap();

    let Some(Binding::Deferred(bump)) = registry.binding("defs.bump") else {
        panic!("Expected a deferred binding");
    };
    // Every access to `settings` runs its file again
    let value = bump.definition().unwrap().unwrap();
    assert_eq!(value.repr().unwrap(), "[3, 1]");
}

#[test]
fn test_structural_operations_on_loaded_value() {
    let space = Space::new();
    space.define("settings", "let settings = { level: 3 }\n");
    space.define(
        "bump",
        "import settings\nsettings.level = settings.level + 1\nlet bump = settings[\"level\"]\n",
    );
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let Some(Binding::Deferred(bump)) = registry.binding("defs.bump") else {
        panic!("Expected a deferred binding");
    };
    assert_eq!(bump.definition().unwrap(), Some(Value::Int(4)));
    let settings = registry.lookup("defs.settings").unwrap();
    assert_eq!(settings.get_attr("level").unwrap(), Value::Int(4));
}

#[test]
fn test_item_assignment_through_deferred_binding() {
    let space = Space::new();
    space.define("settings", "let settings = { level: 3 }\n");
    space.define(
        "seed",
        "import settings\nsettings[\"level\"] = 7\nlet seed = settings.level\n",
    );
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();
    assert!(!registry.binding("defs.settings").unwrap().is_resolved());

    let Some(Binding::Deferred(seed)) = registry.binding("defs.seed") else {
        panic!("Expected a deferred binding");
    };
    assert_eq!(seed.definition().unwrap(), Some(Value::Int(7)));
    assert!(registry.binding("defs.settings").unwrap().is_resolved());
    let settings = registry.lookup("defs.settings").unwrap();
    assert_eq!(settings.get_item(&Value::str("level")).unwrap(), Value::Int(7));
}

#[test]
fn test_error_in_other_definition_points_at_call_site() {
    let space = Space::new();
    space.define("helper", "\n\n\nfn helper() { 1 / 0 }\n");
    space.define("main", "import helper\nlet main = helper()\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let err = registry.call("defs.main", Args::new()).unwrap_err();
    let DefError::Definition { path, line_col, source } = &err else {
        panic!("Expected a definition error, got {:?}", err);
    };
    assert!(path.ends_with("main/main.def"));
    assert_eq!(*line_col, Some((2, 12)));
    assert!(matches!(source, LangError::Raised { unit, .. } if unit == "helper"));
    let message = err.to_string();
    assert!(message.contains(":2:12: in helper: "));
    assert!(message.contains("division by zero"));
    assert!(matches!(
        err.lang_error(),
        Some(LangError::EvaluationError { .. })
    ));
}

#[test]
fn test_display_and_help_are_forwarded() {
    let space = Space::new();
    space.define(
        "greet",
        "fn greet(name) {\n  \"Greets someone.\"\n  \"hi \" + name\n}\n",
    );
    space.define("gone", "let other = 1\n");
    let registry = Registry::new();
    import_space(&space.root, &reload(), &registry).unwrap();

    let greet = registry.lookup("defs.greet").unwrap();
    assert_eq!(greet.type_name(), "definition");
    assert_eq!(greet.repr().unwrap(), "<fn greet(name)>");
    assert_eq!(greet.help().unwrap(), "fn greet(name)\n\nGreets someone.");

    let gone = registry.lookup("defs.gone").unwrap();
    assert!(gone.repr().unwrap().starts_with("<no definition at "));
}

#[test]
fn test_circular_load_is_an_error() {
    let space = Space::new();
    space.define("a", "import b\nlet a = b()\n");
    space.define("b", "import a\nlet b = a()\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();

    let err = registry.call("defs.a", Args::new()).unwrap_err();
    assert!(err.to_string().contains("Circular load of defs.a"));

    let Some(Binding::Deferred(a)) = registry.binding("defs.a") else {
        panic!("Expected a deferred binding");
    };
    assert!(!a.is_loaded());
}

#[test]
fn test_reserved_and_nested_directories() {
    let space = Space::new();
    space.define_at("_cache/hidden", "hidden", "let hidden = 1\n");
    space.define_at("group/inner", "inner", "let inner = 2\n");
    space.define_at("stray", "other", "let other = 3\n");
    let registry = Registry::new();

    let ns = import_space(&space.root, &load_once(), &registry).unwrap();
    assert_eq!(ns.names(), vec!["inner".to_string()]);
    assert!(ns.defs()["inner"].ends_with("group/inner/inner.def"));
    let Some(Binding::Deferred(inner)) = ns.member("inner") else {
        panic!("Expected a deferred binding");
    };
    assert_eq!(inner.definition().unwrap(), Some(Value::Int(2)));
}

#[test]
fn test_empty_space_is_valid() {
    let space = Space::new();
    let registry = Registry::new();
    let ns = import_space(&space.root, &load_once(), &registry).unwrap();
    assert!(ns.is_empty());
    assert!(registry.namespace("defs").is_some());
}

#[test]
fn test_reimport_replaces_entries() {
    let space = Space::new();
    space.define("old", "let old = 1\n");
    let registry = Registry::new();
    import_space(&space.root, &load_once(), &registry).unwrap();
    assert!(registry.lookup("defs.old").is_some());

    fs::remove_dir_all(space.root.join("old")).unwrap();
    space.define("new", "let new = 2\n");
    import_space(&space.root, &load_once(), &registry).unwrap();

    assert!(registry.lookup("defs.old").is_none());
    assert!(registry.lookup("defs.new").is_some());
}

#[test]
fn test_locate_and_load_skips_absent() {
    let space = Space::new();
    space.define("limit", "let limit = 10\n");
    space.define("broken", "let other = 1\n");
    let registry = Registry::new();

    let loaded = locate_and_load(&space.root, &load_once(), &registry).unwrap();
    assert_eq!(loaded.keys().cloned().collect::<Vec<_>>(), vec!["limit".to_string()]);
    assert_eq!(loaded["limit"], Value::Int(10));
}

#[test]
fn test_dropped_registry_detaches_bindings() {
    let space = Space::new();
    space.define("limit", "let limit = 10\n");
    let registry = Registry::new();
    let ns = import_space(&space.root, &load_once(), &registry).unwrap();
    drop(registry);

    let Some(Binding::Deferred(limit)) = ns.member("limit") else {
        panic!("Expected a deferred binding");
    };
    assert!(matches!(limit.resolve(), Err(DefError::Detached { .. })));
}

#[test]
fn test_missing_space_root_imports_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new();
    let ns = import_space(&dir.path().join("ghost"), &load_once(), &registry).unwrap();
    assert_eq!(ns.name(), "ghost");
    assert!(ns.is_empty());
}
