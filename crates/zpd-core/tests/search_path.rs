//! Global search path resolution
//!
//! The search path is process-wide, so every scenario lives in one test
//! function to keep them from racing.

mod common;

use std::sync::Arc;

use zpd_core::{environment, ConsoleHistory, EngineConfig, Instance, ZpdError};

use common::{init_logging, write_patch};

fn marker_patch(marker: &str) -> String {
    format!("#N canvas 0 0 100 100 10;\n#X obj 10 10 print {};\n#X obj 10 40 loadbang;\n#X connect 1 0 0 0;\n", marker)
}

#[test]
fn test_search_path_precedence() {
    init_logging();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_patch(a.path(), "shared.pd", &marker_patch("from-a"));
    write_patch(b.path(), "shared.pd", &marker_patch("from-b"));
    write_patch(b.path(), "only-b.pd", &marker_patch("only-b"));

    let mut instance = Instance::new();
    let history = Arc::new(ConsoleHistory::new());
    instance.set_console_hook(history.clone());

    // first match wins
    environment::searchpath_clear();
    environment::searchpath_add(a.path());
    environment::searchpath_add(b.path());
    assert_eq!(environment::searchpath().dirs().len(), 2);
    let id = instance.load("shared.pd", "").unwrap();
    assert_eq!(instance.patch(id).unwrap().path(), a.path().join("shared.pd").as_path());
    assert_eq!(history.posts()[0].text, "from-a: bang");

    // later entries are still consulted
    instance.load("only-b.pd", "").unwrap();

    // an explicit directory overrides the search path
    let id = instance
        .load("shared.pd", &b.path().to_string_lossy())
        .unwrap();
    assert_eq!(instance.patch(id).unwrap().path(), b.path().join("shared.pd").as_path());

    // cleared search path: nothing resolves without a directory
    environment::searchpath_clear();
    assert!(matches!(
        instance.load("shared.pd", ""),
        Err(ZpdError::PatchNotFound { .. })
    ));

    // configuration replaces the search path in order
    let config = EngineConfig {
        search_paths: vec![b.path().to_path_buf(), a.path().to_path_buf()],
        ..Default::default()
    };
    config.apply_search_paths();
    let id = instance.load("shared.pd", "").unwrap();
    assert_eq!(instance.patch(id).unwrap().path(), b.path().join("shared.pd").as_path());

    environment::clear();
    assert!(environment::searchpath().dirs().is_empty());
}
