use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Load a provider-native buildspec document.
///
/// The contents are opaque to this crate: the document is parsed only to
/// prove it is well-formed YAML, then embedded verbatim in the build
/// action's configuration. Schema checks are the build provider's job.
pub fn load(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read buildspec file: {}", path.display()))?;
    let document: serde_yaml::Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse buildspec YAML: {}", path.display()))?;
    serde_json::to_value(document)
        .with_context(|| format!("Buildspec is not JSON-representable: {}", path.display()))
}
