use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use crate::functions::{FunctionSpec, LayerSpec};
use crate::statemachine::StateMachine;

const LAMBDA_FUNCTION_TYPE: &str = "AWS::Lambda::Function";
const STATE_MACHINE_TYPE: &str = "AWS::StepFunctions::StateMachine";

/// Load a synthesized template document.
pub fn load(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template file: {}", path.display()))?;
    let template: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse template JSON: {}", path.display()))?;
    Ok(template)
}

/// Candidate templates near the working directory, `template.json` first
/// and then anything a synthesis run left under `cdk.out/`.
pub fn discover() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for pattern in ["template.json", "*.template.json", "cdk.out/*.template.json"] {
        let Ok(matches) = glob::glob(pattern) else {
            continue;
        };
        for entry in matches.flatten() {
            if entry.is_file() && !candidates.contains(&entry) {
                candidates.push(entry);
            }
        }
    }
    candidates
}

fn resources(template: &Value) -> impl Iterator<Item = (&String, &Value)> {
    template
        .get("Resources")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
}

/// Logical ids of every function resource in the template.
pub fn lambda_logical_ids(template: &Value) -> Vec<String> {
    resources(template)
        .filter(|(_, resource)| {
            resource.get("Type").and_then(Value::as_str) == Some(LAMBDA_FUNCTION_TYPE)
        })
        .map(|(logical_id, _)| logical_id.clone())
        .collect()
}

/// Best-effort parameter values for a synthesized template: the synthesis
/// engine quotes the original value inside each parameter's description,
/// so pull it back out. Asset-bucket parameters point into `cdk.out/`.
pub fn parameter_defaults(template: &Value) -> BTreeMap<String, String> {
    let mut defaults = BTreeMap::new();
    let Some(parameters) = template.get("Parameters").and_then(Value::as_object) else {
        return defaults;
    };
    for (name, parameter) in parameters {
        let Some(description) = parameter.get("Description").and_then(Value::as_str) else {
            continue;
        };
        let Some(quoted) = description.split('"').nth(1) else {
            continue;
        };
        let value = if name.contains("S3Bucket") {
            format!("cdk.out/asset||{quoted}")
        } else {
            quoted.to_string()
        };
        defaults.insert(name.clone(), value);
    }
    defaults
}

/// Extract every state-machine definition from the template, resolving
/// parameter references from their description defaults and stripping the
/// markers left behind for attributes that only exist after deployment.
pub fn state_machine_definitions(template: &Value) -> Result<Vec<(String, String)>> {
    let parameters = parameter_defaults(template);
    let mut definitions = Vec::new();
    for (logical_id, resource) in resources(template) {
        if resource.get("Type").and_then(Value::as_str) != Some(STATE_MACHINE_TYPE) {
            continue;
        }
        let raw = resource
            .get("Properties")
            .and_then(|p| p.get("DefinitionString"))
            .with_context(|| format!("State machine '{logical_id}' has no definition"))?;
        let definition = fixup_definition(&flatten_definition(raw, &parameters)?);
        definitions.push((logical_id.clone(), definition));
    }
    Ok(definitions)
}

// Definitions come out of synthesis either as a plain string or as an
// Fn::Join of string fragments and references.
fn flatten_definition(raw: &Value, parameters: &BTreeMap<String, String>) -> Result<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Object(object) => {
            if let Some(join) = object.get("Fn::Join") {
                let (separator, parts) = join
                    .as_array()
                    .and_then(|args| {
                        Some((args.first()?.as_str()?, args.get(1)?.as_array()?))
                    })
                    .context("Malformed Fn::Join in state machine definition")?;
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(flatten_definition(part, parameters)?);
                }
                Ok(rendered.join(separator))
            } else if let Some(reference) = object.get("Ref").and_then(Value::as_str) {
                Ok(parameters
                    .get(reference)
                    .cloned()
                    .unwrap_or_else(|| reference.to_string()))
            } else if let Some(get_att) = object.get("Fn::GetAtt") {
                // Attribute values only exist after deployment; keep the
                // logical id so the local emulator has a stable handle.
                let logical_id = get_att
                    .as_array()
                    .and_then(|args| args.first())
                    .and_then(Value::as_str)
                    .context("Malformed Fn::GetAtt in state machine definition")?;
                Ok(logical_id.to_string())
            } else {
                bail!("Unsupported intrinsic in state machine definition: {object:?}")
            }
        }
        other => bail!("Unsupported definition value: {other}"),
    }
}

/// Pick one extracted definition: by logical id when the caller names
/// one, the first otherwise. Naming an unknown id yields nothing rather
/// than silently falling back.
pub fn definition_for<'a>(
    definitions: &'a [(String, String)],
    logical_id: Option<&str>,
) -> Option<&'a (String, String)> {
    match logical_id {
        Some(id) => definitions.iter().find(|(logical, _)| logical == id),
        None => definitions.first(),
    }
}

fn fixup_definition(definition: &str) -> String {
    let definition = definition
        .strip_prefix("UNKNOWN ATT: ")
        .unwrap_or(definition);
    let definition = definition.strip_suffix(".Arn").unwrap_or(definition);
    definition.to_string()
}

/// A minimal template assembled locally, enough for the emulators to run
/// the functions and machines it lists.
#[derive(Debug, Default)]
pub struct LocalTemplate {
    resources: BTreeMap<String, Value>,
}

impl LocalTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, logical_id: impl Into<String>, function: &FunctionSpec) {
        self.resources.insert(logical_id.into(), function.resource());
    }

    pub fn add_layer(&mut self, logical_id: impl Into<String>, layer: &LayerSpec) {
        self.resources.insert(logical_id.into(), layer.resource());
    }

    pub fn add_state_machine(&mut self, logical_id: impl Into<String>, machine: &StateMachine) {
        self.resources.insert(
            logical_id.into(),
            json!({
                "Type": STATE_MACHINE_TYPE,
                "Properties": {
                    "DefinitionString": machine.render().to_string(),
                },
            }),
        );
    }

    pub fn to_value(&self) -> Value {
        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": self.resources,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create template file: {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.to_value())
            .with_context(|| format!("Failed to write template JSON: {}", path.display()))?;
        Ok(())
    }
}
