use std::collections::BTreeSet;

use serde::Serialize;

use crate::manifest::Manifest;

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Check a manifest before assembly. Errors are the same conditions that
/// would abort assembly, surfaced in one pass; warnings flag things that
/// assemble fine but are probably not what the author meant.
pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::default();

    if manifest.version != 1 {
        report
            .errors
            .push(format!("Unsupported manifest version: {}", manifest.version));
    }

    if manifest.pipeline.trim().is_empty() {
        report.errors.push("Pipeline name cannot be empty".into());
    }

    if let Some(source) = &manifest.source
        && let Err(err) = source.validate()
    {
        report.errors.push(err.to_string());
    }

    if manifest.project.is_some() && manifest.source.is_none() {
        report
            .errors
            .push("A build project requires a source to supply its input artifact".into());
    }

    if let Some(project) = &manifest.project
        && let Some(build_spec) = &project.build_spec
        && !build_spec.is_file()
    {
        report.warnings.push(format!(
            "Buildspec file '{}' does not exist relative to the working directory",
            build_spec.display()
        ));
    }

    if !manifest.deploys.is_empty() && manifest.project.is_none() {
        report
            .errors
            .push("Deploy stages require a build project to produce the template artifact".into());
    }

    if manifest.deploys.is_empty() {
        report
            .warnings
            .push("Manifest defines no deploy stages".into());
    }

    let mut seen = BTreeSet::new();
    for (idx, deploy) in manifest.deploys.iter().enumerate() {
        if deploy.stack.trim().is_empty() {
            report
                .errors
                .push(format!("Deploy entry {} has an empty stack name", idx + 1));
            continue;
        }
        if let Err(err) = deploy.config.template_artifact_path() {
            report.errors.push(format!(
                "Deploy entry {} ('{}'): {err}",
                idx + 1,
                deploy.stack
            ));
        }
        let action_name = deploy
            .config
            .action_name
            .clone()
            .unwrap_or_else(|| format!("Deploy-{}", deploy.stack));
        if !seen.insert(action_name.clone()) {
            // Duplicate names overwrite in the registry (last write wins);
            // almost certainly an accident worth surfacing.
            report.warnings.push(format!(
                "Deploy action name '{action_name}' appears more than once; the last entry wins"
            ));
        }
    }

    report
}
