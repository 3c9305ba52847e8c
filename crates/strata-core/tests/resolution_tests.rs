//! End-to-end resolution over an in-memory store

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::collections::BTreeMap;
use strata_core::{ConfigManager, Document, Error, ListMergeMode, ManagerOptions};
use strata_store::MemoryStorage;

fn manager_with(options: ManagerOptions, layers: &[(&str, &str)]) -> ConfigManager {
    let mut manager = ConfigManager::new(Box::new(MemoryStorage::new()), options);
    for (path, text) in layers {
        assert!(manager.set(path, text).unwrap());
    }
    manager.clear_cache();
    manager
}

fn manager(layers: &[(&str, &str)]) -> ConfigManager {
    manager_with(ManagerOptions::default(), layers)
}

#[test]
fn test_more_specific_layer_extends_general_one() {
    let mut manager = manager(&[
        ("app", "db:\n  host: h1\n"),
        ("app:prod", "db:\n  port: 5432\n"),
    ]);
    assert_eq!(
        manager.get("app:prod").unwrap(),
        Some(json!({"db": {"host": "h1", "port": 5432}}))
    );
}

#[test]
fn test_more_specific_layer_overrides_scalars() {
    let mut manager = manager(&[
        ("app", "level: info\nname: app\n"),
        ("app:prod", "level: warn\n"),
        ("app:prod:eu", "level: error\n"),
    ]);
    assert_eq!(
        manager.get("app:prod:eu").unwrap(),
        Some(json!({"level": "error", "name": "app"}))
    );
    assert_eq!(
        manager.get("app:prod").unwrap(),
        Some(json!({"level": "warn", "name": "app"}))
    );
}

#[test]
fn test_missing_intermediate_layers_are_skipped() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod:eu", "b: 2\n")]);
    assert_eq!(manager.get("app:prod:eu").unwrap(), Some(json!({"a": 1, "b": 2})));
}

#[test]
fn test_nothing_found_resolves_to_none() {
    let mut manager = manager(&[("other", "a: 1\n")]);
    assert_eq!(manager.get("app:prod").unwrap(), None);
}

#[test]
fn test_empty_layers_are_ignored() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod", "{}\n")]);
    assert_eq!(manager.get("app:prod").unwrap(), Some(json!({"a": 1})));
}

#[test]
fn test_alternation_folds_every_candidate_in_order() {
    let mut manager = manager(&[
        ("app", "region: none\n"),
        ("app:eu", "region: eu\neu: true\n"),
        ("app:us", "region: us\nus: true\n"),
        ("app:us:eu", "combined: true\n"),
    ]);
    assert_eq!(
        manager.get("app:eu+us").unwrap(),
        Some(json!({"region": "us", "eu": true, "us": true, "combined": true}))
    );
}

#[test]
fn test_get_without_recursion_is_exact() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod", "b: 2\n")]);
    assert_eq!(manager.get_with("app:prod", false).unwrap(), Some(json!({"b": 2})));
    assert_eq!(manager.get_with("app:dev", false).unwrap(), None);
}

#[test]
fn test_source_round_trip_is_verbatim() {
    let mut manager = manager(&[]);
    manager.set("path", "v").unwrap();
    manager.clear_cache();

    let layer = manager.get_one_source("path").unwrap().unwrap();
    assert_eq!(layer.text, "v");
    assert_eq!(layer.attrs, None);
}

#[test]
fn test_string_placeholder() {
    let mut manager = manager(&[("x", "'1'\n"), ("y", "ref=$$x$$\n")]);
    assert_eq!(manager.get("y").unwrap(), Some(json!("ref=1")));
}

#[test]
fn test_placeholder_resolves_through_hierarchy() {
    let mut manager = manager(&[
        ("db", "host: h1\nname: main\n"),
        ("db:prod", "host: h2\n"),
        ("app", "url: postgres://$$db:prod.host$$/$$db.name$$\n"),
    ]);
    assert_eq!(
        manager.get("app").unwrap(),
        Some(json!({"url": "postgres://h2/main"}))
    );
}

#[test]
fn test_non_string_placeholder_replaces_value() {
    let mut manager = manager(&[("ports", "- 80\n- 443\n"), ("app", "ports: $$ports$$\n")]);
    assert_eq!(manager.get("app").unwrap(), Some(json!({"ports": [80, 443]})));
}

#[rstest]
#[case::angle_marker("<<settings: defaults\n")]
#[case::suffix_marker("settings:$$: $$defaults$$\n")]
fn test_key_alias_pulls_in_resolved_value(#[case] layer: &str) {
    let mut manager = manager(&[("defaults", "pool: 5\n"), ("app", layer)]);
    assert_eq!(
        manager.get("app").unwrap(),
        Some(json!({"settings": {"pool": 5}}))
    );
}

#[rstest]
#[case::missing_path("url: $$nowhere.host$$\n", "$$nowhere.host$$")]
#[case::scalar_walk("url: $$name.first$$\n", "$$name.first$$")]
#[case::undecodable_target("url: $$bad.a$$\n", "$$bad.a$$")]
#[case::self_reference("url: $$app.url$$\n", "$$app.url$$")]
fn test_failed_placeholder_leaves_value_unchanged(#[case] layer: &str, #[case] expected: &str) {
    let mut manager = manager(&[("name", "plain\n"), ("bad", "a: [1, 2\n"), ("app", layer)]);
    assert_eq!(manager.get("app").unwrap(), Some(json!({"url": expected})));
}

#[test]
fn test_mutual_placeholders_terminate() {
    let mut manager = manager(&[("a", "v: $$b.v$$\n"), ("b", "v: $$a.v$$\n")]);
    let resolved = manager.get("a").unwrap().unwrap();
    assert!(resolved["v"].as_str().unwrap().contains("$$"));
}

#[test]
fn test_undecodable_layer_is_an_error() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod", "a: [1, 2\n")]);
    let err = manager.get("app:prod").unwrap_err();
    assert!(matches!(err, Error::Decode { ref path, .. } if path == "app:prod"));
}

#[rstest]
#[case::empty("")]
#[case::empty_segment("app::prod")]
#[case::trailing("app:")]
#[case::empty_alternative("app:eu+")]
fn test_invalid_paths_are_rejected(#[case] path: &str) {
    let mut manager = manager(&[]);
    assert!(matches!(manager.get(path), Err(Error::InvalidPath { .. })));
    assert!(matches!(manager.set(path, "a: 1"), Err(Error::InvalidPath { .. })));
}

#[rstest]
#[case::concatenate(ListMergeMode::Concatenate, json!(["p", "q", "r"]))]
#[case::legacy(ListMergeMode::Legacy, json!(["r"]))]
fn test_list_merge_mode_is_per_manager(#[case] mode: ListMergeMode, #[case] expected: Document) {
    let layers = [("app", "tags: [p, q]\n"), ("app:prod", "tags: [r]\n")];
    let mut manager = manager_with(ManagerOptions::default().with_list_merge(mode), &layers);
    assert_eq!(manager.get("app:prod").unwrap(), Some(json!({"tags": expected})));
}

#[test]
fn test_two_managers_keep_their_own_list_mode() {
    let layers = [("app", "tags: [p]\n"), ("app:prod", "tags: [r]\n")];
    let mut concat = manager_with(ManagerOptions::default(), &layers);
    let mut legacy = manager_with(
        ManagerOptions::default().with_list_merge(ListMergeMode::Legacy),
        &layers,
    );
    assert_eq!(concat.get("app:prod").unwrap(), Some(json!({"tags": ["p", "r"]})));
    assert_eq!(legacy.get("app:prod").unwrap(), Some(json!({"tags": ["r"]})));
}

#[test]
fn test_delete_purges_cache_and_storage() {
    let mut manager = manager(&[("app", "a: 1\n")]);
    assert!(manager.get_one("app").unwrap().is_some());
    assert!(manager.cache().contains("rc:app"));

    assert!(manager.delete("app").unwrap());
    assert!(!manager.cache().contains("rc:app"));
    assert_eq!(manager.get_one("app").unwrap(), None);
    assert!(!manager.delete("app").unwrap());
}

#[test]
fn test_delete_with_wildcard() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod", "b: 2\n"), ("db", "c: 3\n")]);
    assert!(manager.delete("app*").unwrap());
    assert_eq!(manager.keys("*").unwrap(), vec!["db"]);
}

#[test]
fn test_delete_many() {
    let mut manager = manager(&[("a", "x: 1\n"), ("b", "x: 2\n"), ("c", "x: 3\n")]);
    assert!(manager.delete_many(&["a", "c"]).unwrap());
    assert_eq!(manager.keys("*").unwrap(), vec!["b"]);
}

#[test]
fn test_keys_strip_root() {
    let mut manager = manager(&[("app", "a: 1\n"), ("app:prod", "b: 2\n"), ("db", "c: 3\n")]);
    assert_eq!(manager.keys("app*").unwrap(), vec!["app", "app:prod"]);
    assert_eq!(manager.keys("*").unwrap(), vec!["app", "app:prod", "db"]);
}

#[test]
fn test_root_namespaces_are_isolated() {
    let mut storage = MemoryStorage::new();
    strata_store::Storage::set(&mut storage, "other:app", "a: 1\n").unwrap();
    let mut manager = ConfigManager::new(Box::new(storage), ManagerOptions::default());
    assert_eq!(manager.get("app").unwrap(), None);
    assert!(manager.keys("*").unwrap().is_empty());
}

#[test]
fn test_load_cache_and_tree() {
    let mut manager = manager(&[
        ("app", "a: 1\n"),
        ("app:prod", "b: 2\n"),
        ("app:dev", "c: 3\n"),
        ("db", "d: 4\n"),
    ]);
    assert_eq!(manager.get_tree("*").unwrap(), json!({}));

    assert_eq!(manager.load_cache("*", Some("db*")).unwrap(), 3);
    assert_eq!(
        manager.get_tree("*").unwrap(),
        json!({"app": {"prod": {}, "dev": {}}})
    );
    assert_eq!(manager.get_tree("app:p*").unwrap(), json!({"app": {"prod": {}}}));
}

#[test]
fn test_set_many_writes_every_layer() {
    let mut manager = manager(&[]);
    let layers: BTreeMap<String, String> = [
        ("app".to_string(), "a: 1\n".to_string()),
        ("app:prod".to_string(), "b: 2\n".to_string()),
    ]
    .into_iter()
    .collect();
    assert!(manager.set_many(&layers).unwrap());
    manager.clear_cache();
    assert_eq!(manager.get("app:prod").unwrap(), Some(json!({"a": 1, "b": 2})));
}

#[test]
fn test_close_clears_cache() {
    let mut manager = manager(&[("app", "a: 1\n")]);
    manager.get("app").unwrap();
    assert!(!manager.cache().is_empty());
    manager.close().unwrap();
    assert!(manager.cache().is_empty());
}

#[test]
fn test_cached_layer_is_served_without_storage() {
    let mut manager = manager(&[("app", "a: 1\n")]);
    manager.get_one("app").unwrap();
    strata_store::Storage::delete(manager.storage_mut(), "rc:app").unwrap();
    assert_eq!(manager.get_one("app").unwrap(), Some(json!({"a": 1})));
}
