//! Batch entry point for a whole crew run.

use serde_json::Value;
use tracing::{info, instrument};

use outputkit_shared::StructuredOutput;

use crate::{ProcessRequest, process};

const UNKNOWN_ROLE: &str = "Unknown";

/// One task's output from a crew run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    pub raw: Value,
    pub agent_role: Option<String>,
}

impl TaskOutput {
    /// Read `{ "raw": .., "agent": "Role" | { "role": "Role" } }`.
    /// Anything else is treated as the raw output itself.
    pub fn from_value(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            raw => {
                return Self {
                    raw,
                    agent_role: None,
                };
            }
        };

        let agent_role = match map.get("agent") {
            Some(Value::String(role)) => Some(role.clone()),
            Some(Value::Object(agent)) => agent.get("role").and_then(Value::as_str).map(String::from),
            _ => map.get("agent_role").and_then(Value::as_str).map(String::from),
        };

        match map.remove("raw") {
            Some(raw) => Self { raw, agent_role },
            None => Self {
                raw: Value::Object(map),
                agent_role,
            },
        }
    }
}

/// The shapes a crew run's result can take.
#[derive(Debug, Clone, PartialEq)]
pub enum CrewResult {
    /// A result exposing per-task outputs.
    Tasks(Vec<TaskOutput>),
    /// A plain list of raw outputs.
    Outputs(Vec<Value>),
    /// A single raw result.
    Single(Value),
}

impl CrewResult {
    /// Classify a JSON value: an object with a `tasks_output` array, an
    /// array, or anything else as a single result.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.get("tasks_output").is_some_and(Value::is_array) => {
                let tasks = match map.remove("tasks_output") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Self::Tasks(tasks.into_iter().map(TaskOutput::from_value).collect())
            }
            Value::Array(items) => Self::Outputs(items),
            other => Self::Single(other),
        }
    }
}

/// Process every output of a crew run.
///
/// Items get positional ids (`agent_{i}`, `task_{i}`); a single result is
/// `agent_0` with no task id. A failing item becomes a failed output and
/// does not stop the batch.
#[instrument(skip_all, fields(workflow_id = ?workflow_id))]
pub fn process_crew_output(result: CrewResult, workflow_id: Option<&str>) -> Vec<StructuredOutput> {
    let request = |i: usize, role: Option<String>, with_task: bool| ProcessRequest {
        task_id: with_task.then(|| format!("task_{i}")),
        workflow_id: workflow_id.map(String::from),
        ..ProcessRequest::new(
            format!("agent_{i}"),
            role.unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
        )
    };

    let outputs: Vec<StructuredOutput> = match result {
        CrewResult::Tasks(tasks) => tasks
            .into_iter()
            .enumerate()
            .map(|(i, task)| process(task.raw, &request(i, task.agent_role, true), None))
            .collect(),
        CrewResult::Outputs(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, raw)| process(raw, &request(i, None, true), None))
            .collect(),
        CrewResult::Single(raw) => vec![process(raw, &request(0, None, false), None)],
    };

    info!(count = outputs.len(), "processed crew output");
    outputs
}
