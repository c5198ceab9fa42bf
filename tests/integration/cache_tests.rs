//! Cache integration tests
//!
//! Exercise the on-disk store through its public API and through scans.

use std::fs;
use std::path::Path;
use std::time::Duration;
use sweepstacx::analysis::{IssueKind, IssueRecord};
use sweepstacx::cache::{cache_key, content_hash, CacheStore};
use sweepstacx::config::Config;
use sweepstacx::scan::Scanner;
use tempfile::TempDir;

fn issues(file: &str) -> Vec<IssueRecord> {
    vec![IssueRecord::new(IssueKind::UnusedImport, file, "'x' is imported but never used")
        .with_line(3)
        .with_symbol("x")]
}

#[test]
fn test_issue_lists_survive_the_store() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path(), "v1");
    let hash = content_hash("import { x } from 'y';");

    store.set("scan", Path::new("/p/a.js"), &hash, &issues("/p/a.js")).unwrap();
    let back: Option<Vec<IssueRecord>> = store.get("scan", Path::new("/p/a.js"), &hash).unwrap();

    assert_eq!(back, Some(issues("/p/a.js")));
}

#[test]
fn test_entries_are_named_by_key() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path(), "v1");
    let hash = content_hash("a");

    store.set("scan", Path::new("/p/a.js"), &hash, &1u32).unwrap();

    let key = cache_key("scan", Path::new("/p/a.js"), &hash);
    assert_eq!(key.len(), 64);
    assert!(dir.path().join(format!("{key}.json")).is_file());
}

#[test]
fn test_different_hash_misses() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path(), "v1");

    store.set("scan", Path::new("/p/a.js"), &content_hash("old"), &1u32).unwrap();
    let hit: Option<u32> = store.get("scan", Path::new("/p/a.js"), &content_hash("new")).unwrap();

    assert_eq!(hit, None);
}

#[test]
fn test_zero_max_age_expires_everything() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::new(dir.path(), "v1").with_max_age(Duration::ZERO);
    let hash = content_hash("a");

    store.set("scan", Path::new("/p/a.js"), &hash, &1u32).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let hit: Option<u32> = store.get("scan", Path::new("/p/a.js"), &hash).unwrap();

    assert_eq!(hit, None);
}

#[test]
fn test_scanner_uses_configured_cache_dir() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.js"), "import { x } from 'y';\n").unwrap();

    let cache_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.cache.dir = Some(cache_dir.path().to_path_buf());

    let scanner = Scanner::new(&root, config);
    scanner.scan().unwrap();

    assert_eq!(scanner.cache_store().dir(), Some(cache_dir.path()));
    assert_eq!(scanner.cache_store().entry_count(), 1);
    assert!(!root.join(".sweepstacx").exists());
}

#[test]
fn test_clearing_forces_reanalysis() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.js"), "console.log(1);\n").unwrap();
    fs::write(root.join("other.js"), "console.log(2);\n").unwrap();

    let scanner = Scanner::new(&root, Config::default());
    scanner.scan().unwrap();
    assert_eq!(scanner.cache_store().entry_count(), 2);

    scanner.cache_store().invalidate_all().unwrap();
    assert_eq!(scanner.cache_store().entry_count(), 0);

    let report = scanner.scan().unwrap();
    assert_eq!(report.stats.cache_hits, 0);
    assert_eq!(report.stats.cache_misses, 2);
}

#[test]
fn test_corrupt_entry_falls_back_to_analysis() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.js"), "import { x } from 'y';\n").unwrap();

    let scanner = Scanner::new(&root, Config::default());
    scanner.scan().unwrap();

    let cache_dir = scanner.config().cache_dir(&root);
    for entry in fs::read_dir(&cache_dir).unwrap() {
        fs::write(entry.unwrap().path(), "{ not json").unwrap();
    }

    let report = scanner.scan().unwrap();
    assert_eq!(report.stats.cache_hits, 0);
    assert_eq!(report.stats.unused_imports, 1);
    assert!(report
        .warnings_of_kind(sweepstacx::scan::WarningKind::CacheError)
        .next()
        .is_some());
}

#[test]
fn test_schema_version_names_crate_version() {
    let scanner = Scanner::new("/p", Config::default());
    let version = scanner.schema_version();

    assert!(version.starts_with(env!("CARGO_PKG_VERSION")));
    assert_eq!(version, Scanner::new("/q", Config::default()).schema_version());

    let mut config = Config::default();
    config.typescript.check_type_imports = false;
    assert_ne!(version, Scanner::new("/p", config).schema_version());
}

#[test]
fn test_edited_file_keeps_one_entry() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let scanner = Scanner::new(&root, Config::default());

    for i in 0..5 {
        fs::write(root.join("index.js"), format!("console.log({i});\n")).unwrap();
        let report = scanner.scan().unwrap();
        assert_eq!(report.stats.cache_misses, 1);
        assert_eq!(scanner.cache_store().entry_count(), 1);
    }
}

#[test]
fn test_deleted_file_entry_is_pruned() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.js"), "console.log(1);\n").unwrap();
    fs::write(root.join("gone.js"), "console.log(2);\n").unwrap();

    let scanner = Scanner::new(&root, Config::default());
    scanner.scan().unwrap();
    assert_eq!(scanner.cache_store().entry_count(), 2);

    fs::remove_file(root.join("gone.js")).unwrap();
    let report = scanner.scan().unwrap();
    assert_eq!(report.stats.cache_hits, 1);
    assert_eq!(scanner.cache_store().entry_count(), 1);
}

#[test]
fn test_clearing_a_shared_directory_keeps_sources() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.js"), "import './util';\n").unwrap();
    fs::write(root.join("util.js"), "export const x = 1;\n").unwrap();

    // Cache pointed at the project itself
    let mut config = Config::default();
    config.cache.dir = Some(root.clone());
    let scanner = Scanner::new(&root, config);
    scanner.scan().unwrap();
    assert_eq!(scanner.cache_store().entry_count(), 2);

    scanner.cache_store().invalidate_all().unwrap();

    assert_eq!(scanner.cache_store().entry_count(), 0);
    assert!(root.join("index.js").is_file());
    assert!(root.join("util.js").is_file());
}
