use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::actions::{DeployConfig, GithubSourceConfig, ProjectConfig};

/// Declarative description of one pipeline: where the source comes from,
/// how it builds, and which stacks the build output deploys.
#[derive(Debug, Deserialize, Serialize)]
pub struct Manifest {
    pub version: u32,
    /// Pipeline name; also the default build-project name.
    pub pipeline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<GithubSourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deploys: Vec<DeploySpec>,
}

/// One deploy stage entry: the stack to deploy plus its action settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeploySpec {
    pub stack: String,
    #[serde(flatten)]
    pub config: DeployConfig,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;
        let manifest: Manifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest YAML: {}", path.display()))?;
        Ok(manifest)
    }
}
