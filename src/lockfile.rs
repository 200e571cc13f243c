use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::assembler::PipelineModel;
use crate::registry::Action;

/// Drift-detection record for an assembled pipeline: which actions ended
/// up in which stages, and a digest of each action's configuration.
#[derive(Debug, Serialize)]
pub struct AssemblyLock {
    pub manifest_version: u32,
    pub pipeline: String,
    pub generated_at: DateTime<Utc>,
    pub actions: Vec<ActionLock>,
}

#[derive(Debug, Serialize)]
pub struct ActionLock {
    pub stage: String,
    pub name: String,
    pub config_hash: String,
}

pub fn generate_lock(model: &PipelineModel, manifest_version: u32, path: &Path) -> Result<()> {
    let mut actions = Vec::new();
    for stage in &model.stages {
        for action in &stage.actions {
            actions.push(ActionLock {
                stage: stage.name.clone(),
                name: action.name.clone(),
                config_hash: hash_configuration(action),
            });
        }
    }

    let lock = AssemblyLock {
        manifest_version,
        pipeline: model.name.clone(),
        generated_at: Utc::now(),
        actions,
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create lockfile: {}", path.display()))?;
    serde_yaml::to_writer(file, &lock)
        .with_context(|| format!("Failed to write lockfile: {}", path.display()))?;

    Ok(())
}

fn hash_configuration(action: &Action) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.name.as_bytes());
    let serialized = serde_json::to_vec(&action.configuration).unwrap_or_default();
    hasher.update(serialized);
    format!("{:x}", hasher.finalize())
}
