use std::path::Path;
use std::process::{Command, Output};

/// Copy `tests/fixtures/<name>` into a fresh temp dir.
fn fixture(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let source = Path::new("tests/fixtures").join(name);
    for entry in walkdir::WalkDir::new(&source).min_depth(1) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

fn relmap(dir: &tempfile::TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_relmap"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn check_reports_the_drifted_pom() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["check"]);
    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    assert!(text.contains("org.eclipse.foo/pom.xml:10:"), "got: {text}");
    assert!(text.contains("warning: POM version 1.0.1 does not match the bundle version 1.0.0"));
    assert!(text.contains("(expected 1.0.0-SNAPSHOT)"));
    assert!(!text.contains("org.eclipse.bar"));
    assert!(text.ends_with("0 error(s), 1 warning(s)\n"));
}

#[test]
fn check_json_locates_the_version_text() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["check", "--format", "json"]);
    assert_eq!(out.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let diagnostics = json.as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);

    let pom = std::fs::read_to_string(dir.path().join("org.eclipse.foo/pom.xml")).unwrap();
    let start = pom.find("1.0.1-SNAPSHOT").unwrap();
    let d = &diagnostics[0];
    assert_eq!(d["subject"], "org.eclipse.foo/pom.xml");
    assert_eq!(d["corrected_version"], "1.0.0-SNAPSHOT");
    assert_eq!(d["location"]["line"], 10);
    assert_eq!(d["location"]["char_start"], start);
    assert_eq!(d["location"]["char_end"], start + "1.0.1-SNAPSHOT".len());
}

#[test]
fn fixed_pom_passes_check() {
    let dir = fixture("workspace");
    let pom_path = dir.path().join("org.eclipse.foo/pom.xml");
    let pom = std::fs::read_to_string(&pom_path).unwrap();
    std::fs::write(&pom_path, pom.replace("1.0.1-SNAPSHOT", "1.0.0-SNAPSHOT")).unwrap();

    let out = relmap(&dir, &["check"]);
    assert!(out.status.success(), "stdout: {}", stdout(&out));
    assert!(stdout(&out).contains("All POM versions match their manifests"));
}

#[test]
fn severity_setting_changes_reporting() {
    let dir = fixture("workspace");

    let set = relmap(&dir, &["config", "severity", "error"]);
    assert!(set.status.success(), "stderr: {}", stderr(&set));
    let text = stdout(&relmap(&dir, &["check"]));
    assert!(text.contains("error: POM version 1.0.1"));
    assert!(text.ends_with("1 error(s), 0 warning(s)\n"));

    relmap(&dir, &["config", "severity", "ignore"]);
    let out = relmap(&dir, &["check"]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("disabled"));
}

#[test]
fn unknown_severity_is_rejected() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["config", "severity", "loud"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Invalid Config"));
    assert!(!dir.path().join(".relmap.toml").exists());
}

#[test]
fn entry_comes_from_the_first_map_in_path_order() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["entry", "org.eclipse.foo"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "org.eclipse.foo=v20240101  (org.eclipse.releng/maps/core.map)\n");
}

#[test]
fn unmapped_entry_is_an_error() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["entry", "org.eclipse.nope"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Unmapped Project"));
    assert!(stderr(&out).contains("plugin@org.eclipse.nope=<tag>"));
}

#[test]
fn tags_default_to_head() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["tags", "org.eclipse.baz", "org.eclipse.nope", "org.eclipse.sdk", "org.eclipse.bar"]);
    assert!(out.status.success());
    assert_eq!(
        stdout(&out),
        "org.eclipse.baz v3\norg.eclipse.nope HEAD\norg.eclipse.sdk HEAD\norg.eclipse.bar v20240102\n"
    );
}

#[test]
fn tag_rewrites_one_line_and_keeps_history() {
    let dir = fixture("workspace");
    let map_path = dir.path().join("org.eclipse.releng/maps/core.map");
    let before = std::fs::read_to_string(&map_path).unwrap();

    let out = relmap(&dir, &["tag", "org.eclipse.bar", "v20241231"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let after = std::fs::read_to_string(&map_path).unwrap();
    assert_eq!(after, before.replace("= v20240102", "= v20241231"));
    let history = dir.path().join(".relmap/history/org.eclipse.releng/maps/core.map.1");
    assert_eq!(std::fs::read_to_string(history).unwrap(), before);

    let tags = relmap(&dir, &["tags", "org.eclipse.bar"]);
    assert_eq!(stdout(&tags), "org.eclipse.bar v20241231\n");
}

#[test]
fn retagging_to_the_same_tag_writes_nothing() {
    let dir = fixture("workspace");
    let out = relmap(&dir, &["tag", "org.eclipse.foo", "v20240101"]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("already at v20240101"));
    assert!(!dir.path().join(".relmap").exists());
}

#[test]
fn maps_lists_all_or_only_valid_files() {
    let dir = fixture("workspace");
    let all = stdout(&relmap(&dir, &["maps"]));
    assert!(all.contains("org.eclipse.releng/maps/core.map  3 entries"));
    assert!(all.contains("org.eclipse.releng/maps/extra.map  2 entries"));

    std::fs::remove_dir_all(dir.path().join("org.eclipse.foo")).unwrap();
    let valid = stdout(&relmap(&dir, &["maps", "--valid"]));
    assert!(valid.contains("core.map"));
    assert!(!valid.contains("extra.map"));
}

#[test]
fn missing_map_folder_is_an_empty_index() {
    let dir = fixture("workspace");
    std::fs::remove_dir_all(dir.path().join("org.eclipse.releng/maps")).unwrap();
    let out = relmap(&dir, &["tags", "org.eclipse.foo"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "org.eclipse.foo HEAD\n");
}

#[test]
fn custom_map_location_from_config() {
    let dir = fixture("workspace");
    std::fs::rename(dir.path().join("org.eclipse.releng"), dir.path().join("releng")).unwrap();
    std::fs::write(dir.path().join(".relmap.toml"), "map_project = \"releng\"\n").unwrap();

    let out = relmap(&dir, &["entry", "org.eclipse.baz"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("(releng/maps/extra.map)"));
}

#[test]
fn tag_fills_an_empty_tag_in_place() {
    let dir = fixture("workspace");
    let map_path = dir.path().join("org.eclipse.releng/maps/core.map");
    let before = std::fs::read_to_string(&map_path).unwrap();

    let out = relmap(&dir, &["tag", "org.eclipse.sdk", "v1"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let after = std::fs::read_to_string(&map_path).unwrap();
    assert_eq!(after, before.replace("feature@org.eclipse.sdk=\n", "feature@org.eclipse.sdk=v1\n"));
    let tags = relmap(&dir, &["tags", "org.eclipse.sdk", "org.eclipse.foo"]);
    assert_eq!(stdout(&tags), "org.eclipse.sdk v1\norg.eclipse.foo v20240101\n");
}
