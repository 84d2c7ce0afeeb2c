//! Integration tests for the tool cache index
//!
//! Covers behavior across cache instances sharing one root and concurrent
//! registrations of distinct keys.

use kubetools_core::cache::ToolCache;
use std::path::Path;
use tempfile::TempDir;

fn write_binary(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_slots_survive_across_instances() {
    let root = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let binary = write_binary(source.path(), "kubectl", b"kubectl 1.29.0");

    let first = ToolCache::new(root.path());
    let slot = first.register_file(&binary, "kubectl", "kubectl", "1.29.0").unwrap();

    // A later run only knows the root
    let second = ToolCache::new(root.path());
    assert_eq!(second.lookup("kubectl", "1.29.0"), Some(slot.clone()));
    assert_eq!(
        std::fs::read(slot.join("kubectl")).unwrap(),
        b"kubectl 1.29.0"
    );
    assert_eq!(second.versions("kubectl"), vec!["1.29.0".to_string()]);
}

#[test]
fn test_concurrent_registrations_of_distinct_keys() {
    let root = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let cache = ToolCache::new(root.path());

    let versions: Vec<String> = (0..8).map(|i| format!("1.{i}.0")).collect();
    let binaries: Vec<_> = versions
        .iter()
        .map(|v| write_binary(source.path(), &format!("helm-{v}"), v.as_bytes()))
        .collect();

    std::thread::scope(|scope| {
        for (version, binary) in versions.iter().zip(&binaries) {
            let cache = &cache;
            scope.spawn(move || {
                cache.register_file(binary, "helm", "helm", version).unwrap();
            });
        }
    });

    for version in &versions {
        let slot = cache.lookup("helm", version).unwrap();
        assert_eq!(std::fs::read(slot.join("helm")).unwrap(), version.as_bytes());
    }
    assert_eq!(cache.versions("helm").len(), versions.len());
}

#[test]
fn test_interrupted_registration_is_not_listed() {
    let root = TempDir::new().unwrap();
    let cache = ToolCache::new(root.path());

    // Slot directory without its marker, as left by a crash mid-registration
    std::fs::create_dir_all(cache.slot_dir("jq", "1.7.1")).unwrap();
    std::fs::write(cache.slot_dir("jq", "1.7.1").join("jq"), b"partial").unwrap();

    assert!(cache.lookup("jq", "1.7.1").is_none());
    assert!(cache.versions("jq").is_empty());

    // Registering again makes it visible
    let source = TempDir::new().unwrap();
    let binary = write_binary(source.path(), "jq-linux-amd64", b"jq");
    let slot = cache.register_file(&binary, "jq", "jq", "1.7.1").unwrap();
    assert_eq!(std::fs::read(slot.join("jq")).unwrap(), b"jq");
}

#[test]
fn test_removed_slot_can_be_registered_again() {
    let root = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let cache = ToolCache::new(root.path());
    let binary = write_binary(source.path(), "yq", b"yq");

    cache.register_file(&binary, "yq", "yq", "4.35.1").unwrap();
    assert!(cache.remove("yq", "4.35.1").unwrap());
    assert!(!cache.remove("yq", "4.35.1").unwrap());
    assert!(cache.lookup("yq", "4.35.1").is_none());

    cache.register_file(&binary, "yq", "yq", "4.35.1").unwrap();
    assert!(cache.lookup("yq", "4.35.1").is_some());
}
