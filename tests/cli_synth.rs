use assert_cmd::Command;
use tempfile::tempdir;

const MANIFEST: &str = r#"version: 1
pipeline: acme-cicd
source:
  owner: acme
  repo: acme-infra
  branch: master
  connection: arn:aws:codestar-connections:eu-west-1:1:connection/x
project:
  build_spec: buildspec.yml
deploys:
  - stack: acme-cicd
"#;

const BUILDSPEC: &str = r#"version: 0.2
phases:
  build:
    commands:
      - make synth
"#;

#[test]
fn synth_writes_pipeline_and_lock() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("manifest.yaml"), MANIFEST).unwrap();
    std::fs::write(temp.path().join("buildspec.yml"), BUILDSPEC).unwrap();

    Command::cargo_bin("stackforge")
        .expect("binary present")
        .current_dir(temp.path())
        .args([
            "synth",
            "manifest.yaml",
            "--output",
            "pipeline.json",
            "--lock",
            "assembly.lock",
        ])
        .assert()
        .success();

    let pipeline = std::fs::read_to_string(temp.path().join("pipeline.json")).unwrap();
    let model: serde_json::Value = serde_json::from_str(&pipeline).unwrap();
    assert_eq!(model["name"], "acme-cicd");
    assert_eq!(model["stages"][0]["name"], "Source");
    assert_eq!(model["stages"][2]["actions"][0]["name"], "Deploy-acme-cicd");

    assert!(temp.path().join("assembly.lock").is_file());
}

#[test]
fn validate_fails_on_missing_credentials() {
    let temp = tempdir().unwrap();
    let manifest = MANIFEST.replace(
        "  connection: arn:aws:codestar-connections:eu-west-1:1:connection/x\n",
        "",
    );
    std::fs::write(temp.path().join("manifest.yaml"), manifest).unwrap();

    Command::cargo_bin("stackforge")
        .expect("binary present")
        .current_dir(temp.path())
        .args(["validate", "manifest.yaml"])
        .assert()
        .failure();
}

#[test]
fn manifest_new_generates_a_loadable_preset() {
    let temp = tempdir().unwrap();

    Command::cargo_bin("stackforge")
        .expect("binary present")
        .current_dir(temp.path())
        .args(["manifest", "new", "--preset", "cicd", "--output", "cicd.yaml"])
        .assert()
        .success();

    let content = std::fs::read_to_string(temp.path().join("cicd.yaml")).unwrap();
    assert!(content.contains("pipeline: acme-cicd"));

    // The generated manifest must lint clean apart from the missing
    // buildspec warning.
    Command::cargo_bin("stackforge")
        .expect("binary present")
        .current_dir(temp.path())
        .args(["manifest", "lint", "cicd.yaml"])
        .assert()
        .success();
}
