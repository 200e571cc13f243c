use serde_json::json;
use stackforge::functions::{FunctionCode, FunctionSpec};
use stackforge::statemachine::StateMachine;
use stackforge::template::{
    LocalTemplate, definition_for, lambda_logical_ids, parameter_defaults,
    state_machine_definitions,
};
use tempfile::tempdir;

fn synthesized_template() -> serde_json::Value {
    json!({
        "Parameters": {
            "AssetS3Bucket1": {
                "Type": "String",
                "Description": "S3 bucket for asset \"abcdef123456\""
            },
            "HandlerArnParam": {
                "Type": "String",
                "Description": "Arn value \"arn:aws:lambda:local:0:function:handler\""
            },
            "Undocumented": { "Type": "String" }
        },
        "Resources": {
            "WorkerFunction": {
                "Type": "AWS::Lambda::Function",
                "Properties": { "Handler": "index.handler" }
            },
            "Bucket": { "Type": "AWS::S3::Bucket" },
            "Machine": {
                "Type": "AWS::StepFunctions::StateMachine",
                "Properties": {
                    "DefinitionString": {
                        "Fn::Join": ["", [
                            "{\"StartAt\":\"Invoke\",\"States\":{\"Invoke\":{\"Resource\":\"",
                            { "Ref": "HandlerArnParam" },
                            "\",\"Type\":\"Task\",\"End\":true}}}"
                        ]]
                    }
                }
            }
        }
    })
}

#[test]
fn lambda_resources_are_listed_by_logical_id() {
    let template = synthesized_template();
    assert_eq!(lambda_logical_ids(&template), vec!["WorkerFunction"]);
}

#[test]
fn parameter_defaults_come_from_quoted_descriptions() {
    let template = synthesized_template();
    let defaults = parameter_defaults(&template);

    // Asset buckets resolve into the synthesis output directory.
    assert_eq!(
        defaults.get("AssetS3Bucket1").unwrap(),
        "cdk.out/asset||abcdef123456"
    );
    assert_eq!(
        defaults.get("HandlerArnParam").unwrap(),
        "arn:aws:lambda:local:0:function:handler"
    );
    assert!(!defaults.contains_key("Undocumented"));
}

#[test]
fn state_machine_definitions_are_joined_and_resolved() {
    let template = synthesized_template();
    let definitions = state_machine_definitions(&template).unwrap();

    assert_eq!(definitions.len(), 1);
    let (logical_id, definition) = &definitions[0];
    assert_eq!(logical_id, "Machine");
    assert!(definition.contains("arn:aws:lambda:local:0:function:handler"));
    // The joined document must be valid JSON again.
    let parsed: serde_json::Value = serde_json::from_str(definition).unwrap();
    assert_eq!(parsed["StartAt"], "Invoke");
}

#[test]
fn unresolved_attribute_markers_are_stripped() {
    let template = json!({
        "Resources": {
            "Machine": {
                "Type": "AWS::StepFunctions::StateMachine",
                "Properties": { "DefinitionString": "UNKNOWN ATT: MachineRole.Arn" }
            }
        }
    });
    let definitions = state_machine_definitions(&template).unwrap();
    assert_eq!(definitions[0].1, "MachineRole");
}

#[test]
fn definitions_are_selected_by_logical_id() {
    let definitions = vec![
        ("OrderMachine".to_string(), "{\"States\":{}}".to_string()),
        ("BillingMachine".to_string(), "{\"StartAt\":\"Pass\"}".to_string()),
    ];

    let picked = definition_for(&definitions, Some("BillingMachine")).unwrap();
    assert_eq!(picked.0, "BillingMachine");

    let fallback = definition_for(&definitions, None).unwrap();
    assert_eq!(fallback.0, "OrderMachine");

    assert!(definition_for(&definitions, Some("MissingMachine")).is_none());
}

#[test]
fn local_template_round_trips_through_json() {
    let temp = tempdir().unwrap();
    let mut local = LocalTemplate::new();
    local.add_function(
        "InlineHandler",
        &FunctionSpec::new(FunctionCode::Inline("def handler(event, context): pass".into()))
            .runtime("python3.12")
            .timeout_seconds(20),
    );
    local.add_state_machine("Machine", &StateMachine::new());

    let path = temp.path().join("template.json");
    local.write(&path).unwrap();

    let document = stackforge::template::load(&path).unwrap();
    assert_eq!(lambda_logical_ids(&document), vec!["InlineHandler"]);
    assert_eq!(
        document["Resources"]["InlineHandler"]["Properties"]["Timeout"],
        20
    );
    let definitions = state_machine_definitions(&document).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&definitions[0].1).unwrap();
    assert_eq!(parsed["States"]["Pass"]["Type"], "Pass");
}
