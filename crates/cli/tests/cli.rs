use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn atlas() -> Command {
    let mut cmd = Command::cargo_bin("atlas").expect("binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn setup_project() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(
        root.join("app/models.py"),
        r#"
class Base:
    def save(self):
        pass

class User(Base):
    def save(self):
        validate(self)

def validate(obj):
    return obj is not None
"#,
    )
    .unwrap();
    fs::write(root.join("app/main.py"), "import os\n\nprint(os.name)\n").unwrap();
    temp
}

#[test]
fn parse_prints_entities_and_relationships() {
    let temp = setup_project();
    let output = atlas()
        .arg("parse")
        .arg(temp.path().join("app/models.py"))
        .arg("--name")
        .arg("app/models.py")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["file_path"], "app/models.py");

    let names: Vec<&str> = body["entities"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["qualified_name"].as_str())
        .collect();
    assert!(names.contains(&"app/models.py::User.save"));
    assert!(names.contains(&"app/models.py::validate"));

    let overrides = body["relationships"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| {
            r["rel_type"] == "OVERRIDES"
                && r["source_id"] == "app/models.py::User.save"
                && r["target_id"] == "app/models.py::Base.save"
        });
    assert!(overrides, "missing OVERRIDES edge: {body}");
}

#[test]
fn parse_rejects_invalid_python() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("broken.py");
    fs::write(&file, "def broken(:\n    pass\n").unwrap();

    atlas()
        .arg("parse")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn ingest_json_reports_stats() {
    let temp = setup_project();
    let output = atlas()
        .arg("ingest")
        .arg(temp.path())
        .arg("--json")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["stats"]["files_scanned"], 2);
    assert_eq!(body["stats"]["files_parsed"], 2);
    assert_eq!(body["stats"]["files_failed"], 0);
    assert!(body["graph"]["nodes"].as_u64().unwrap() > 0);
}

#[test]
fn ingest_writes_graph_document() {
    let temp = setup_project();
    let out = temp.path().join("out/graph.json");

    atlas()
        .arg("ingest")
        .arg(temp.path())
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files scanned"));

    let document: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let has_inherits = document["edges"].as_array().unwrap().iter().any(|e| {
        e["source"] == "app/models.py::User"
            && e["target"] == "app/models.py::Base"
            && e["rel_type"] == "INHERITS"
    });
    assert!(has_inherits);
}

#[test]
fn ingest_uses_project_config() {
    let temp = setup_project();
    fs::write(
        temp.path().join("atlas.toml"),
        "[ingestion]\npatterns = [\"app/main.py\"]\n",
    )
    .unwrap();

    let output = atlas()
        .arg("ingest")
        .arg(temp.path())
        .arg("--json")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["stats"]["files_scanned"], 1);
}

#[test]
fn ingest_missing_root_fails() {
    let temp = tempdir().unwrap();
    atlas()
        .arg("ingest")
        .arg(temp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid ingestion root"));
}

#[test]
fn config_init_prints_toml_template() {
    atlas()
        .args(["config", "init", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ingestion]"))
        .stdout(predicate::str::contains("batch_size = 100"));
}

#[test]
fn config_show_reads_explicit_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("custom.json");
    fs::write(&path, r#"{"ingestion": {"batch_size": 7}}"#).unwrap();

    let output = atlas()
        .args(["config", "show", "--config"])
        .arg(&path)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["ingestion"]["batch_size"], 7);
    assert_eq!(body["logging"]["level"], "info");
}

#[test]
fn config_show_rejects_invalid_values() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.json");
    fs::write(&path, r#"{"ingestion": {"batch_size": 0}}"#).unwrap();

    atlas()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_size"));
}
