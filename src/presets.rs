use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::actions::{
    DeployConfig, EnvironmentVariable, GithubSourceConfig, ProjectConfig,
};
use crate::manifest::{DeploySpec, Manifest};

/// Write a starter manifest for `name` to `destination`.
pub fn generate_preset(name: &str, destination: &Path) -> Result<PathBuf> {
    let preset = match name {
        "cicd" => cicd_preset(),
        "idp" => idp_preset(),
        other => anyhow::bail!("Unknown preset '{other}'"),
    };

    let rendered = serde_yaml::to_string(&preset)?;
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(destination, rendered)
        .with_context(|| format!("Failed to write preset manifest: {}", destination.display()))?;

    Ok(destination.to_path_buf())
}

// Self-mutating CI/CD pipeline: checkout, build, deploy the pipeline's own
// stack from the build output.
fn cicd_preset() -> Manifest {
    let mut environment = BTreeMap::new();
    environment.insert(
        "PYPI_TOKEN".to_string(),
        EnvironmentVariable::secret("acme/tokens:PYPI_TOKEN"),
    );
    Manifest {
        version: 1,
        pipeline: "acme-cicd".to_string(),
        source: Some(GithubSourceConfig {
            owner: "acme".to_string(),
            repo: "acme-infra".to_string(),
            branch: "master".to_string(),
            connection: Some(
                "arn:aws:codestar-connections:eu-west-1:000000000000:connection/example"
                    .to_string(),
            ),
            oauth: None,
        }),
        project: Some(ProjectConfig {
            description: Some("Build and synthesize the infrastructure".to_string()),
            environment,
            ..ProjectConfig::default()
        }),
        deploys: vec![DeploySpec {
            stack: "acme-cicd".to_string(),
            config: DeployConfig::default(),
        }],
    }
}

// Identity-provider stack: same shape, OAuth credentials and an explicit
// deploy action name.
fn idp_preset() -> Manifest {
    Manifest {
        version: 1,
        pipeline: "acme-iam-idp".to_string(),
        source: Some(GithubSourceConfig {
            owner: "acme".to_string(),
            repo: "acme-iam-idp".to_string(),
            branch: "master".to_string(),
            connection: None,
            oauth: Some("github/tokens:OAUTH".to_string()),
        }),
        project: Some(ProjectConfig {
            description: Some("Package the identity-provider resources".to_string()),
            ..ProjectConfig::default()
        }),
        deploys: vec![DeploySpec {
            stack: "acme-iam-idp".to_string(),
            config: DeployConfig {
                action_name: Some("Deploy-idp".to_string()),
                ..DeployConfig::default()
            },
        }],
    }
}
