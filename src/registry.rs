use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::AssemblyError;

/// Phase categories of a pipeline, in their fixed emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Source,
    Build,
    Deploy,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Source, StageKind::Build, StageKind::Deploy];

    /// Capitalized form, used as the emitted stage name.
    pub fn label(self) -> &'static str {
        match self {
            StageKind::Source => "Source",
            StageKind::Build => "Build",
            StageKind::Deploy => "Deploy",
        }
    }
}

/// Named handle to a unit of output data passed between actions.
///
/// The producing action owns its artifacts; downstream actions reference
/// them by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Artifact {
    name: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name for an artifact nobody bothered to name explicitly.
    pub fn generated(kind: StageKind, index: usize) -> Self {
        Self {
            name: format!("Artifact_{}_{index}", kind.label()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A file location inside this artifact.
    pub fn at_path(&self, file: impl Into<String>) -> ArtifactPath {
        ArtifactPath {
            artifact: self.name.clone(),
            file: file.into(),
        }
    }
}

/// A file within a named artifact, rendered as `<artifact>::<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct ArtifactPath {
    artifact: String,
    file: String,
}

impl ArtifactPath {
    pub fn new(artifact: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            file: file.into(),
        }
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn file(&self) -> &str {
        &self.file
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.artifact, self.file)
    }
}

impl From<ArtifactPath> for String {
    fn from(path: ArtifactPath) -> Self {
        path.to_string()
    }
}

/// Which external provider executes an action. The provider plus the
/// `configuration` object is everything the synthesis engine needs; no
/// behavior lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionProvider {
    GithubSource,
    CodeBuild,
    CloudFormationDeploy,
}

/// A single named unit of work within a pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub name: String,
    pub provider: ActionProvider,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    pub configuration: Map<String, Value>,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        provider: ActionProvider,
        configuration: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            inputs: Vec::new(),
            outputs: Vec::new(),
            configuration,
        }
    }
}

/// Registry entry: the action descriptor plus the artifacts it produced.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredAction {
    pub action: Action,
    pub outputs: Vec<Artifact>,
}

/// One stage of the assembled pipeline, in registration order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStage {
    pub name: String,
    pub actions: Vec<Action>,
}

// Insertion-ordered name -> entry mapping. Overwriting keeps the original
// position, matching how the registry has always behaved.
#[derive(Debug, Default)]
struct Entries(Vec<(String, RegisteredAction)>);

impl Entries {
    fn insert(&mut self, name: &str, entry: RegisteredAction) {
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| n == name) {
            slot.1 = entry;
        } else {
            self.0.push((name.to_string(), entry));
        }
    }

    fn get(&self, name: &str) -> Option<&RegisteredAction> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    fn artifacts(&self) -> Vec<Artifact> {
        self.0
            .iter()
            .flat_map(|(_, e)| e.outputs.iter().cloned())
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn actions(&self) -> Vec<Action> {
        self.0.iter().map(|(_, e)| e.action.clone()).collect()
    }
}

/// Tracks the artifacts and actions registered under each stage kind and
/// resolves default wiring when callers omit explicit inputs.
///
/// State is scoped to one assembly pass: build a fresh registry per
/// pipeline, register actions, emit stages, drop it.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    source: Entries,
    build: Entries,
    deploy: Entries,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self, kind: StageKind) -> &Entries {
        match kind {
            StageKind::Source => &self.source,
            StageKind::Build => &self.build,
            StageKind::Deploy => &self.deploy,
        }
    }

    /// Record a source action and the artifact it checks out. Name
    /// collisions overwrite silently.
    pub fn register_source(&mut self, name: &str, mut action: Action, artifact: Artifact) {
        action.outputs = vec![artifact.name().to_string()];
        self.source.insert(
            name,
            RegisteredAction {
                action,
                outputs: vec![artifact],
            },
        );
    }

    /// Record a build action, wiring its input from the source registry
    /// when none is given: the first-registered source artifact becomes the
    /// primary input, and any further source artifacts become extra inputs
    /// unless the caller supplied extras explicitly.
    pub fn register_build(
        &mut self,
        name: &str,
        mut action: Action,
        outputs: Vec<Artifact>,
        input: Option<Artifact>,
        extra_inputs: Vec<Artifact>,
    ) -> Result<&RegisteredAction, AssemblyError> {
        let sources = self.source.artifacts();
        // Implicit wiring only kicks in when the caller named nothing: an
        // explicit input carries exactly the inputs the caller asked for.
        let defaulted = input.is_none();
        let input = match input {
            Some(artifact) => artifact,
            None => sources.first().cloned().ok_or_else(|| {
                AssemblyError::configuration(format!(
                    "build action '{name}' has no input and no source artifacts are registered"
                ))
            })?,
        };
        let extras = if defaulted && extra_inputs.is_empty() && sources.len() > 1 {
            sources[1..].to_vec()
        } else {
            extra_inputs
        };

        action.inputs = std::iter::once(&input)
            .chain(extras.iter())
            .map(|a| a.name().to_string())
            .collect();
        action.outputs = outputs.iter().map(|a| a.name().to_string()).collect();

        self.build.insert(name, RegisteredAction { action, outputs });
        Ok(self.build.get(name).unwrap_or_else(|| unreachable!()))
    }

    /// Record a deploy action for `stack_name`. The action name defaults to
    /// `Deploy-<stack_name>`; the template path defaults to
    /// `<stack_name>.template.json` inside the first build artifact. Every
    /// build artifact is attached as an input so the deploy provider can
    /// read the synthesized templates.
    pub fn register_deploy(
        &mut self,
        stack_name: &str,
        action_name: Option<String>,
        template_path: Option<ArtifactPath>,
        mut configuration: Map<String, Value>,
    ) -> Result<&RegisteredAction, AssemblyError> {
        let builds = self.build.artifacts();
        let template_path = match template_path {
            Some(path) => path,
            None => builds
                .first()
                .map(|artifact| artifact.at_path(format!("{stack_name}.template.json")))
                .ok_or_else(|| {
                    AssemblyError::configuration(format!(
                        "deploy of stack '{stack_name}' has no template path and no build \
                         artifacts are registered"
                    ))
                })?,
        };
        let action_name = action_name.unwrap_or_else(|| format!("Deploy-{stack_name}"));

        configuration.insert("stack_name".into(), Value::String(stack_name.to_string()));
        configuration.insert(
            "template_path".into(),
            Value::String(template_path.to_string()),
        );

        let mut action = Action::new(
            action_name.clone(),
            ActionProvider::CloudFormationDeploy,
            configuration,
        );
        action.inputs = builds.iter().map(|a| a.name().to_string()).collect();

        self.deploy.insert(
            &action_name,
            RegisteredAction {
                action,
                outputs: Vec::new(),
            },
        );
        Ok(self.deploy.get(&action_name).unwrap_or_else(|| unreachable!()))
    }

    /// Emit one stage per non-empty stage kind, in {Source, Build, Deploy}
    /// order, each carrying its actions in registration order.
    pub fn stage_all(&self) -> Vec<PipelineStage> {
        let mut stages = Vec::new();
        for kind in StageKind::ALL {
            let entries = self.entries(kind);
            if entries.is_empty() {
                debug!(stage = kind.label(), "no actions registered, skipping stage");
                continue;
            }
            stages.push(PipelineStage {
                name: kind.label().to_string(),
                actions: entries.actions(),
            });
        }
        stages
    }

    pub fn get(&self, kind: StageKind, name: &str) -> Option<&RegisteredAction> {
        self.entries(kind).get(name)
    }

    pub fn artifacts(&self, kind: StageKind) -> Vec<Artifact> {
        self.entries(kind).artifacts()
    }

    pub fn len(&self, kind: StageKind) -> usize {
        self.entries(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        StageKind::ALL.iter().all(|k| self.entries(*k).is_empty())
    }

    /// Next positional index for a generated artifact name in `kind`.
    pub fn next_artifact_index(&self, kind: StageKind) -> usize {
        self.entries(kind).len() + 1
    }
}
