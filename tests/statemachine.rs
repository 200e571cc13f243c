use stackforge::statemachine::{ChoiceRule, State, StateMachine};

#[test]
fn empty_machine_renders_a_single_pass_state() {
    let rendered = StateMachine::new().render();

    assert_eq!(rendered["StartAt"], "Pass");
    assert_eq!(rendered["States"]["Pass"]["Type"], "Pass");
    assert_eq!(rendered["States"]["Pass"]["End"], true);
    assert_eq!(rendered["TimeoutSeconds"], 60);
}

#[test]
fn states_chain_in_append_order() {
    let rendered = StateMachine::new()
        .then(State::pass("Start"))
        .then(State::wait("Cooldown"))
        .then(State::invoke("CallWorker", "WorkerFunction"))
        .timeout_minutes(5)
        .render();

    assert_eq!(rendered["StartAt"], "Start");
    assert_eq!(rendered["States"]["Start"]["Next"], "Cooldown");
    assert_eq!(rendered["States"]["Cooldown"]["Next"], "CallWorker");
    assert_eq!(rendered["States"]["Cooldown"]["SecondsPath"], "$.wait_time");
    assert_eq!(rendered["States"]["CallWorker"]["Resource"], "WorkerFunction");
    assert_eq!(rendered["States"]["CallWorker"]["OutputPath"], "$.Payload");
    assert_eq!(rendered["States"]["CallWorker"]["End"], true);
    assert_eq!(rendered["TimeoutSeconds"], 300);
}

#[test]
fn choice_states_route_through_rules_not_next() {
    let rendered = StateMachine::new()
        .then(State::Choice {
            name: "Route".to_string(),
            rules: vec![ChoiceRule {
                variable: "$.status".to_string(),
                equals: "ok".to_string(),
                next: "Done".to_string(),
            }],
            default: Some("Done".to_string()),
        })
        .then(State::pass("Done"))
        .render();

    let route = &rendered["States"]["Route"];
    assert_eq!(route["Choices"][0]["Variable"], "$.status");
    assert_eq!(route["Choices"][0]["Next"], "Done");
    assert_eq!(route["Default"], "Done");
    assert!(route.get("Next").is_none());
    assert!(route.get("End").is_none());
}

#[test]
fn parallel_branches_render_nested_definitions() {
    let branch = StateMachine::new().then(State::pass("BranchPass"));
    let rendered = StateMachine::new()
        .then(State::Parallel {
            name: "FanOut".to_string(),
            branches: vec![branch.clone(), branch],
        })
        .render();

    let fan_out = &rendered["States"]["FanOut"];
    assert_eq!(fan_out["Branches"].as_array().unwrap().len(), 2);
    assert_eq!(fan_out["Branches"][0]["StartAt"], "BranchPass");
    // Branch definitions carry no timeout of their own.
    assert!(fan_out["Branches"][0].get("TimeoutSeconds").is_none());
    assert_eq!(fan_out["End"], true);
}
