use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::actions::{DeployConfig, GithubSourceConfig, ProjectConfig};
use crate::buildspec;
use crate::errors::AssemblyError;
use crate::manifest::Manifest;
use crate::registry::{Artifact, ArtifactRegistry, PipelineStage, StageKind};

/// The externally constructed pipeline object, reduced to what the
/// synthesis engine consumes: a name and an ordered list of stages. The
/// assembler wraps one of these by composition and only ever appends.
#[derive(Debug, Serialize)]
pub struct PipelineModel {
    pub name: String,
    pub stages: Vec<PipelineStage>,
}

impl PipelineModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn add_stage(&mut self, stage: PipelineStage) {
        debug!(stage = %stage.name, actions = stage.actions.len(), "staging actions");
        self.stages.push(stage);
    }
}

/// Single-pass pipeline assembly: register source, build and deploy
/// actions against a fresh registry, then emit the stages into the wrapped
/// pipeline model. One assembler per pipeline; nothing is shared between
/// assemblies.
pub struct PipelineAssembler {
    model: PipelineModel,
    registry: ArtifactRegistry,
}

impl PipelineAssembler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            model: PipelineModel::new(name),
            registry: ArtifactRegistry::new(),
        }
    }

    /// Register a GitHub checkout action. Returns the checkout artifact so
    /// callers can wire it explicitly if they want to.
    pub fn github_source(
        &mut self,
        config: &GithubSourceConfig,
    ) -> Result<Artifact, AssemblyError> {
        let action = config.action()?;
        let action_name = action.name.clone();
        let artifact = config.artifact();
        info!(
            repo = %config.repo,
            branch = %config.branch,
            artifact = artifact.name(),
            "registered source action"
        );
        self.registry
            .register_source(&action_name, action, artifact.clone());
        Ok(artifact)
    }

    /// Register a build action. With `input` unset the first source
    /// artifact is used, and any remaining source artifacts ride along as
    /// extra inputs. Loads the project's buildspec file when one is
    /// configured; those parse errors propagate unchanged.
    pub fn build(
        &mut self,
        name: &str,
        project: &ProjectConfig,
        input: Option<Artifact>,
    ) -> Result<Artifact> {
        let build_spec = match &project.build_spec {
            Some(path) => Some(
                buildspec::load(path)
                    .with_context(|| format!("Build action '{name}' buildspec"))?,
            ),
            None => None,
        };

        let output = Artifact::generated(
            StageKind::Build,
            self.registry.next_artifact_index(StageKind::Build),
        );
        let action = project.action(name, build_spec);
        self.registry
            .register_build(name, action, vec![output.clone()], input, Vec::new())?;
        info!(action = name, artifact = output.name(), "registered build action");
        Ok(output)
    }

    /// Register a deploy action for `stack`. Name and template path
    /// default as documented on [`ArtifactRegistry::register_deploy`].
    pub fn deploy(&mut self, stack: &str, config: &DeployConfig) -> Result<(), AssemblyError> {
        let template_path = config.template_artifact_path()?;
        let registered = self.registry.register_deploy(
            stack,
            config.action_name.clone(),
            template_path,
            config.configuration(),
        )?;
        info!(stack, action = %registered.action.name, "registered deploy action");
        Ok(())
    }

    /// Emit one stage per non-empty stage kind into the pipeline model.
    pub fn stage_all(&mut self) {
        for stage in self.registry.stage_all() {
            self.model.add_stage(stage);
        }
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn model(&self) -> &PipelineModel {
        &self.model
    }

    /// Finish assembly; the registry is dropped here.
    pub fn into_model(self) -> PipelineModel {
        self.model
    }
}

/// Assemble a whole manifest: source, one build action, deploy actions,
/// then stage everything.
pub fn assemble(manifest: &Manifest) -> Result<PipelineModel> {
    let mut assembler = PipelineAssembler::new(&manifest.pipeline);

    if let Some(source) = &manifest.source {
        assembler.github_source(source)?;
    }
    if let Some(project) = &manifest.project {
        assembler.build("Build", project, None)?;
    }
    for deploy in &manifest.deploys {
        assembler.deploy(&deploy.stack, &deploy.config)?;
    }

    assembler.stage_all();
    Ok(assembler.into_model())
}
