use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use stackforge::actions::{
    DeployConfig, EnvironmentVariable, GithubSourceConfig, ProjectConfig,
};
use stackforge::assembler::{PipelineAssembler, assemble};
use stackforge::lockfile::generate_lock;
use stackforge::manifest::{DeploySpec, Manifest};
use tempfile::tempdir;

fn github_source() -> GithubSourceConfig {
    GithubSourceConfig {
        owner: "acme".to_string(),
        repo: "acme-infra".to_string(),
        branch: "master".to_string(),
        connection: Some("arn:aws:codestar-connections:eu-west-1:1:connection/x".to_string()),
        oauth: None,
    }
}

fn write_buildspec(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("buildspec.yml");
    fs::write(
        &path,
        "version: 0.2\nphases:\n  build:\n    commands:\n      - make synth\n",
    )
    .unwrap();
    path
}

fn manifest(build_spec: Option<PathBuf>) -> Manifest {
    let mut environment = BTreeMap::new();
    environment.insert(
        "PYPI_TOKEN".to_string(),
        EnvironmentVariable::secret("acme/tokens:PYPI_TOKEN"),
    );
    Manifest {
        version: 1,
        pipeline: "acme-cicd".to_string(),
        source: Some(github_source()),
        project: Some(ProjectConfig {
            build_spec,
            environment,
            ..ProjectConfig::default()
        }),
        deploys: vec![DeploySpec {
            stack: "acme-cicd".to_string(),
            config: DeployConfig::default(),
        }],
    }
}

#[test]
fn manifest_assembles_into_three_stages() {
    let temp = tempdir().unwrap();
    let build_spec = write_buildspec(temp.path());
    let model = assemble(&manifest(Some(build_spec))).unwrap();

    assert_eq!(model.name, "acme-cicd");
    let names: Vec<_> = model.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Source", "Build", "Deploy"]);

    let checkout = &model.stages[0].actions[0];
    assert_eq!(checkout.name, "acme-infra@master");
    assert_eq!(checkout.outputs, vec!["acme_infra"]);

    let build = &model.stages[1].actions[0];
    assert_eq!(build.inputs, vec!["acme_infra"]);
    assert_eq!(build.outputs, vec!["Artifact_Build_1"]);
    // Buildspec travels embedded in the action configuration.
    assert!(build.configuration.get("build_spec").is_some());
    assert!(
        build
            .configuration
            .get("environment_variables")
            .and_then(|v| v.get("PYPI_TOKEN"))
            .and_then(|v| v.get("type"))
            .is_some_and(|v| v == "SECRETS_MANAGER")
    );

    let deploy = &model.stages[2].actions[0];
    assert_eq!(deploy.name, "Deploy-acme-cicd");
    assert_eq!(
        deploy.configuration.get("template_path").unwrap(),
        "Artifact_Build_1::acme-cicd.template.json"
    );
}

#[test]
fn source_without_credentials_aborts_assembly() {
    let mut manifest = manifest(None);
    manifest.source = Some(GithubSourceConfig {
        connection: None,
        oauth: None,
        ..github_source()
    });

    let err = assemble(&manifest).unwrap_err();
    assert!(err.to_string().contains("credential error"));
}

#[test]
fn deploy_with_explicit_template_path_keeps_it() {
    let temp = tempdir().unwrap();
    let build_spec = write_buildspec(temp.path());
    let mut manifest = manifest(Some(build_spec));
    manifest.deploys[0].config.template_path = Some("custom::stack.json".to_string());

    let model = assemble(&manifest).unwrap();
    let deploy = &model.stages[2].actions[0];
    assert_eq!(
        deploy.configuration.get("template_path").unwrap(),
        "custom::stack.json"
    );
}

#[test]
fn assembler_state_does_not_leak_between_pipelines() {
    let mut first = PipelineAssembler::new("one");
    first.github_source(&github_source()).unwrap();

    // A second assembler starts from scratch: no source artifacts means no
    // default build input.
    let mut second = PipelineAssembler::new("two");
    let err = second
        .build("Build", &ProjectConfig { build_spec: None, ..ProjectConfig::default() }, None)
        .unwrap_err();
    assert!(err.to_string().contains("no source artifacts"));
}

#[test]
fn lockfile_digests_every_action() {
    let temp = tempdir().unwrap();
    let model = assemble(&manifest(None)).unwrap();

    let lock_path = temp.path().join("assembly.lock");
    generate_lock(&model, 1, &lock_path).unwrap();

    let content = fs::read_to_string(&lock_path).unwrap();
    assert!(content.contains("pipeline: acme-cicd"));
    assert!(content.contains("manifest_version: 1"));
    assert!(content.contains("config_hash"));
    assert!(content.contains("Deploy-acme-cicd"));
}

#[test]
fn model_serializes_with_stage_order() {
    let model = assemble(&manifest(None)).unwrap();
    let rendered = serde_json::to_value(&model).unwrap();
    let stages = rendered["stages"].as_array().unwrap();
    assert_eq!(stages[0]["name"], "Source");
    assert_eq!(
        stages[0]["actions"][0]["provider"],
        "github-source"
    );
}
