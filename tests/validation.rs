use stackforge::actions::{DeployConfig, GithubSourceConfig, ProjectConfig};
use stackforge::manifest::{DeploySpec, Manifest};
use stackforge::validation::validate_manifest;

fn base_manifest() -> Manifest {
    Manifest {
        version: 1,
        pipeline: "test-pipe".to_string(),
        source: Some(GithubSourceConfig {
            owner: "acme".to_string(),
            repo: "acme-infra".to_string(),
            branch: "master".to_string(),
            connection: Some("arn:aws:codestar-connections:eu-west-1:1:connection/x".to_string()),
            oauth: None,
        }),
        project: Some(ProjectConfig {
            build_spec: None,
            ..ProjectConfig::default()
        }),
        deploys: vec![DeploySpec {
            stack: "test-stack".to_string(),
            config: DeployConfig::default(),
        }],
    }
}

#[test]
fn valid_manifest_passes() {
    let report = validate_manifest(&base_manifest());
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
}

#[test]
fn wrong_version_is_an_error() {
    let mut manifest = base_manifest();
    manifest.version = 2;
    let report = validate_manifest(&manifest);
    assert!(!report.is_ok());
    assert!(report.errors[0].contains("version"));
}

#[test]
fn missing_credentials_are_an_error() {
    let mut manifest = base_manifest();
    if let Some(source) = manifest.source.as_mut() {
        source.connection = None;
        source.oauth = None;
    }
    let report = validate_manifest(&manifest);
    assert!(!report.is_ok());
    assert!(report.errors.iter().any(|e| e.contains("credential")));
}

#[test]
fn deploys_without_a_project_are_an_error() {
    let mut manifest = base_manifest();
    manifest.project = None;
    let report = validate_manifest(&manifest);
    assert!(!report.is_ok());
}

#[test]
fn missing_buildspec_file_is_a_warning() {
    let mut manifest = base_manifest();
    if let Some(project) = manifest.project.as_mut() {
        project.build_spec = Some("definitely-not-here/buildspec.yml".into());
    }
    let report = validate_manifest(&manifest);
    assert!(report.is_ok());
    assert!(report.warnings.iter().any(|w| w.contains("Buildspec")));
}

#[test]
fn no_deploys_is_a_warning_not_an_error() {
    let mut manifest = base_manifest();
    manifest.deploys.clear();
    let report = validate_manifest(&manifest);
    assert!(report.is_ok());
    assert!(report.warnings.iter().any(|w| w.contains("deploy")));
}

#[test]
fn duplicate_deploy_action_names_are_flagged() {
    let mut manifest = base_manifest();
    manifest.deploys.push(DeploySpec {
        stack: "test-stack".to_string(),
        config: DeployConfig::default(),
    });
    let report = validate_manifest(&manifest);
    assert!(report.is_ok());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("the last entry wins"))
    );
}

#[test]
fn malformed_template_path_is_an_error() {
    let mut manifest = base_manifest();
    manifest.deploys[0].config.template_path = Some("no-separator.json".to_string());
    let report = validate_manifest(&manifest);
    assert!(!report.is_ok());
    assert!(
        report
            .errors
            .iter()
            .any(|e| e.contains("<artifact>::<file>"))
    );
}
