use serde_json::{Map, Value, json};

/// One state in an Amazon-States-Language definition. These are
/// descriptors only; the emulator or the real service interprets them.
#[derive(Debug, Clone)]
pub enum State {
    /// No-op passthrough.
    Pass { name: String },
    /// Wait for a duration read from the input document.
    Wait { name: String, seconds_path: String },
    /// Invoke a function and replace the output with its payload.
    Task {
        name: String,
        resource: String,
        output_path: String,
    },
    /// Branch on an input field equalling a string, with an optional
    /// fallthrough state.
    Choice {
        name: String,
        rules: Vec<ChoiceRule>,
        default: Option<String>,
    },
    /// Run several sub-definitions concurrently.
    Parallel {
        name: String,
        branches: Vec<StateMachine>,
    },
}

#[derive(Debug, Clone)]
pub struct ChoiceRule {
    pub variable: String,
    pub equals: String,
    pub next: String,
}

impl State {
    pub fn pass(name: impl Into<String>) -> Self {
        State::Pass { name: name.into() }
    }

    pub fn wait(name: impl Into<String>) -> Self {
        State::Wait {
            name: name.into(),
            seconds_path: "$.wait_time".to_string(),
        }
    }

    pub fn invoke(name: impl Into<String>, resource: impl Into<String>) -> Self {
        State::Task {
            name: name.into(),
            resource: resource.into(),
            output_path: "$.Payload".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            State::Pass { name }
            | State::Wait { name, .. }
            | State::Task { name, .. }
            | State::Choice { name, .. }
            | State::Parallel { name, .. } => name,
        }
    }

    fn render(&self, next: Option<&str>) -> Value {
        let mut rendered = match self {
            State::Pass { .. } => json!({ "Type": "Pass" }),
            State::Wait { seconds_path, .. } => json!({
                "Type": "Wait",
                "SecondsPath": seconds_path,
            }),
            State::Task {
                resource,
                output_path,
                ..
            } => json!({
                "Type": "Task",
                "Resource": resource,
                "OutputPath": output_path,
            }),
            State::Choice { rules, default, .. } => {
                let choices: Vec<Value> = rules
                    .iter()
                    .map(|rule| {
                        json!({
                            "Variable": rule.variable,
                            "StringEquals": rule.equals,
                            "Next": rule.next,
                        })
                    })
                    .collect();
                let mut value = json!({ "Type": "Choice", "Choices": choices });
                if let Some(default) = default {
                    value["Default"] = Value::String(default.clone());
                }
                value
            }
            State::Parallel { branches, .. } => {
                let rendered: Vec<Value> =
                    branches.iter().map(StateMachine::render_definition).collect();
                json!({ "Type": "Parallel", "Branches": rendered })
            }
        };

        // Choice states route through their rules, never a Next field.
        if !matches!(self, State::Choice { .. }) {
            match next {
                Some(next) => rendered["Next"] = Value::String(next.to_string()),
                None => rendered["End"] = Value::Bool(true),
            }
        }
        rendered
    }
}

/// A sequential chain of states with an execution timeout. States run in
/// the order they were appended; the default machine is a single no-op
/// `Pass` state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    states: Vec<State>,
    timeout_minutes: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            timeout_minutes: 1,
        }
    }

    pub fn then(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    pub fn timeout_minutes(mut self, minutes: u32) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn effective_states(&self) -> Vec<State> {
        if self.states.is_empty() {
            vec![State::pass("Pass")]
        } else {
            self.states.clone()
        }
    }

    fn render_definition(&self) -> Value {
        let states = self.effective_states();
        let mut rendered = Map::new();
        for (idx, state) in states.iter().enumerate() {
            let next = states.get(idx + 1).map(|s| s.name().to_string());
            rendered.insert(state.name().to_string(), state.render(next.as_deref()));
        }
        json!({
            "StartAt": states[0].name(),
            "States": Value::Object(rendered),
        })
    }

    /// Full machine definition document.
    pub fn render(&self) -> Value {
        let mut definition = self.render_definition();
        definition["TimeoutSeconds"] = json!(self.timeout_minutes * 60);
        definition
    }
}
