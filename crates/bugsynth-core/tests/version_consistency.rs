//! Ensures all workspace crates use `version.workspace = true`.

use std::path::Path;

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
}

#[test]
fn all_crates_use_workspace_version() {
    let crates = [
        "crates/bugsynth-core",
        "crates/bugsynth-d4j",
        "crates/bugsynth-cli",
    ];

    for krate in crates {
        let manifest = workspace_root().join(krate).join("Cargo.toml");
        let doc: toml::Value = std::fs::read_to_string(&manifest)
            .unwrap()
            .parse()
            .unwrap();
        let uses_workspace = doc["package"]["version"]
            .as_table()
            .and_then(|t| t.get("workspace"))
            .and_then(|v| v.as_bool())
            == Some(true);
        assert!(
            uses_workspace,
            "{} should use version.workspace = true",
            manifest.display()
        );
    }
}

#[test]
fn internal_dependency_versions_match_workspace() {
    let doc: toml::Value = std::fs::read_to_string(workspace_root().join("Cargo.toml"))
        .unwrap()
        .parse()
        .unwrap();
    let version = doc["workspace"]["package"]["version"].as_str().unwrap();
    for name in ["bugsynth-core", "bugsynth-d4j"] {
        assert_eq!(
            doc["workspace"]["dependencies"][name]["version"].as_str(),
            Some(version),
            "{name} workspace dependency version drifted"
        );
    }
    assert_eq!(env!("CARGO_PKG_VERSION"), version);
}
