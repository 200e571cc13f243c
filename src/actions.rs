use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::errors::AssemblyError;
use crate::registry::{Action, ActionProvider, Artifact, ArtifactPath};

/// Where a GitHub checkout action gets its credentials and what it clones.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubSourceConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// CodeStar connection ARN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// OAuth token reference, the legacy alternative to a connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<String>,
}

fn default_branch() -> String {
    "master".to_string()
}

impl GithubSourceConfig {
    /// Either a connection or an OAuth token must be present.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        if self.connection.is_none() && self.oauth.is_none() {
            return Err(AssemblyError::credential(format!(
                "no credentials for github source '{}/{}': set 'connection' or 'oauth'",
                self.owner, self.repo
            )));
        }
        Ok(())
    }

    /// Action names are `<repo>@<branch>` so several branches of the same
    /// repository can coexist in one pipeline.
    pub fn action_name(&self) -> String {
        format!("{}@{}", self.repo, self.branch)
    }

    /// The checkout artifact, named after the repository.
    pub fn artifact(&self) -> Artifact {
        Artifact::new(self.repo.replace('-', "_"))
    }

    pub fn action(&self) -> Result<Action, AssemblyError> {
        self.validate()?;
        let mut configuration = Map::new();
        configuration.insert("owner".into(), Value::String(self.owner.clone()));
        configuration.insert("repo".into(), Value::String(self.repo.clone()));
        configuration.insert("branch".into(), Value::String(self.branch.clone()));
        if let Some(connection) = &self.connection {
            configuration.insert("connection_arn".into(), Value::String(connection.clone()));
        }
        if let Some(oauth) = &self.oauth {
            configuration.insert("oauth_token".into(), Value::String(oauth.clone()));
        }
        // Full clone so downstream build steps see git metadata.
        configuration.insert("code_build_clone_output".into(), Value::Bool(true));
        Ok(Action::new(
            self.action_name(),
            ActionProvider::GithubSource,
            configuration,
        ))
    }
}

/// How a build environment variable is sourced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentVariableKind {
    #[default]
    PlainText,
    SecretsManager,
}

impl EnvironmentVariableKind {
    fn as_provider_str(self) -> &'static str {
        match self {
            EnvironmentVariableKind::PlainText => "PLAINTEXT",
            EnvironmentVariableKind::SecretsManager => "SECRETS_MANAGER",
        }
    }
}

/// One build environment variable. `value` is either a literal or, for
/// secrets, a `<secret-path>:<json-field>` reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvironmentVariable {
    pub value: String,
    #[serde(default)]
    pub kind: EnvironmentVariableKind,
}

impl EnvironmentVariable {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: EnvironmentVariableKind::PlainText,
        }
    }

    pub fn secret(reference: impl Into<String>) -> Self {
        Self {
            value: reference.into(),
            kind: EnvironmentVariableKind::SecretsManager,
        }
    }
}

/// Build-project settings forwarded to the build provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Buildspec document to load and embed; relative to the working
    /// directory of the assembly run.
    #[serde(default = "default_build_spec")]
    pub build_spec: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, EnvironmentVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(default)]
    pub privileged: bool,
}

fn default_build_spec() -> Option<PathBuf> {
    Some(PathBuf::from("buildspec.yml"))
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            description: None,
            build_spec: default_build_spec(),
            environment: BTreeMap::new(),
            timeout_minutes: None,
            privileged: false,
        }
    }
}

impl ProjectConfig {
    /// Build action descriptor. The buildspec document, when one was
    /// loaded, is embedded verbatim — its contents are the build
    /// provider's business.
    pub fn action(&self, name: &str, build_spec: Option<Value>) -> Action {
        let mut configuration = Map::new();
        if let Some(project_name) = &self.project_name {
            configuration.insert("project_name".into(), Value::String(project_name.clone()));
        }
        if let Some(description) = &self.description {
            configuration.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(timeout) = self.timeout_minutes {
            configuration.insert("timeout_minutes".into(), json!(timeout));
        }
        if self.privileged {
            configuration.insert("privileged".into(), Value::Bool(true));
        }
        if !self.environment.is_empty() {
            configuration.insert(
                "environment_variables".into(),
                environment_configuration(&self.environment),
            );
        }
        if let Some(build_spec) = build_spec {
            configuration.insert("build_spec".into(), build_spec);
        }
        Action::new(name, ActionProvider::CodeBuild, configuration)
    }
}

/// Expand the name -> variable mapping into the provider's object shape.
pub fn environment_configuration(
    environment: &BTreeMap<String, EnvironmentVariable>,
) -> Value {
    let mut rendered = Map::new();
    for (name, variable) in environment {
        rendered.insert(
            name.clone(),
            json!({
                "value": variable.value,
                "type": variable.kind.as_provider_str(),
            }),
        );
    }
    Value::Object(rendered)
}

/// Deploy-action settings, one struct per stack. Named fields replace the
/// original free-form keyword passthrough; anything the deploy provider
/// does not recognize has no way in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    /// Explicit template location as `<artifact>::<file>`. Defaults to
    /// `<stack>.template.json` inside the first build artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
    #[serde(default = "default_admin_permissions")]
    pub admin_permissions: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_overrides: BTreeMap<String, String>,
}

fn default_admin_permissions() -> bool {
    true
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            action_name: None,
            template_path: None,
            admin_permissions: true,
            capabilities: Vec::new(),
            role_arn: None,
            region: None,
            parameter_overrides: BTreeMap::new(),
        }
    }
}

impl DeployConfig {
    /// Parse the explicit template path, if any.
    pub fn template_artifact_path(&self) -> Result<Option<ArtifactPath>, AssemblyError> {
        match &self.template_path {
            None => Ok(None),
            Some(raw) => {
                let (artifact, file) = raw.split_once("::").ok_or_else(|| {
                    AssemblyError::configuration(format!(
                        "template path '{raw}' must be '<artifact>::<file>'"
                    ))
                })?;
                if artifact.is_empty() || file.is_empty() {
                    return Err(AssemblyError::configuration(format!(
                        "template path '{raw}' must name both an artifact and a file"
                    )));
                }
                Ok(Some(ArtifactPath::new(artifact, file)))
            }
        }
    }

    /// Provider configuration, minus the stack name and template path the
    /// registry fills in.
    pub fn configuration(&self) -> Map<String, Value> {
        let mut configuration = Map::new();
        configuration.insert(
            "admin_permissions".into(),
            Value::Bool(self.admin_permissions),
        );
        if !self.capabilities.is_empty() {
            configuration.insert("capabilities".into(), json!(self.capabilities));
        }
        if let Some(role_arn) = &self.role_arn {
            configuration.insert("role_arn".into(), Value::String(role_arn.clone()));
        }
        if let Some(region) = &self.region {
            configuration.insert("region".into(), Value::String(region.clone()));
        }
        if !self.parameter_overrides.is_empty() {
            configuration.insert("parameter_overrides".into(), json!(self.parameter_overrides));
        }
        configuration
    }
}
