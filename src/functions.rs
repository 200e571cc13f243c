use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};

/// Where a function's code comes from.
#[derive(Debug, Clone)]
pub enum FunctionCode {
    /// Source embedded directly in the template.
    Inline(String),
    /// A packaged archive on disk.
    Asset(PathBuf),
}

impl FunctionCode {
    /// Inline code read from a source file, the way small handler bodies
    /// are shipped.
    pub fn inline_from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read handler source: {}", path.display()))?;
        Ok(FunctionCode::Inline(source))
    }
}

/// A function resource for the local template. Only the fields the
/// emulator needs; everything else is provider territory.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub handler: String,
    pub runtime: String,
    pub timeout_seconds: Option<u32>,
    pub code: FunctionCode,
}

impl FunctionSpec {
    pub fn new(code: FunctionCode) -> Self {
        Self {
            handler: "index.handler".to_string(),
            runtime: "python3.12".to_string(),
            timeout_seconds: None,
            code,
        }
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn timeout_seconds(mut self, seconds: u32) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Render as an `AWS::Lambda::Function` resource object.
    pub fn resource(&self) -> Value {
        let code = match &self.code {
            FunctionCode::Inline(source) => json!({ "ZipFile": source }),
            FunctionCode::Asset(path) => Value::String(path.display().to_string()),
        };
        let mut properties = json!({
            "Handler": self.handler,
            "Runtime": self.runtime,
            "Code": code,
        });
        if let Some(timeout) = self.timeout_seconds {
            properties["Timeout"] = json!(timeout);
        }
        json!({
            "Type": "AWS::Lambda::Function",
            "Properties": properties,
        })
    }
}

/// A shared layer attached alongside a function.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub description: Option<String>,
    pub asset: PathBuf,
}

impl LayerSpec {
    pub fn new(asset: impl Into<PathBuf>) -> Self {
        Self {
            description: None,
            asset: asset.into(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Render as an `AWS::Lambda::LayerVersion` resource object.
    pub fn resource(&self) -> Value {
        let mut properties = json!({
            "Content": self.asset.display().to_string(),
        });
        if let Some(description) = &self.description {
            properties["Description"] = Value::String(description.clone());
        }
        json!({
            "Type": "AWS::Lambda::LayerVersion",
            "Properties": properties,
        })
    }
}
