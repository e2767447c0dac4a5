//! Job definitions and their structural validation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoreError;

pub const OP_CONTAINER_RUN: &str = "container/run";
pub const OP_CONTAINER_CREATE_VOLUME: &str = "container/create-volume";

/// A job as posted to a market: an ordered list of operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub version: String,
    #[serde(rename = "type", default = "default_job_type")]
    pub kind: String,
    pub ops: Vec<OperationDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

fn default_job_type() -> String {
    "container".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
}

/// One problem found in a job definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the problem, e.g. `ops[1].args.image`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl JobDefinition {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(|e| CoreError::InvalidJobDefinition(e.to_string()))
    }

    /// Check the definition is runnable. Returns every issue found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if self.ops.is_empty() {
            issues.push(ValidationIssue::new("ops", "must contain at least one operation"));
        }

        let mut seen = HashSet::new();
        for (index, op) in self.ops.iter().enumerate() {
            let at = format!("ops[{index}]");

            if op.id.trim().is_empty() {
                issues.push(ValidationIssue::new(format!("{at}.id"), "must not be empty"));
            } else if !seen.insert(op.id.as_str()) {
                issues.push(ValidationIssue::new(
                    format!("{at}.id"),
                    format!("duplicate operation id '{}'", op.id),
                ));
            }

            let required = match op.kind.as_str() {
                OP_CONTAINER_RUN => "image",
                OP_CONTAINER_CREATE_VOLUME => "name",
                other => {
                    issues.push(ValidationIssue::new(
                        format!("{at}.type"),
                        format!("unknown operation type '{other}'"),
                    ));
                    continue;
                }
            };
            let present = op
                .args
                .get(required)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                issues.push(ValidationIssue::new(
                    format!("{at}.args.{required}"),
                    "must be a non-empty string",
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "version": "0.1",
        "type": "container",
        "ops": [
            { "id": "models", "type": "container/create-volume", "args": { "name": "models" } },
            { "id": "run", "type": "container/run", "args": { "image": "ubuntu", "cmd": ["echo", "hi"] } }
        ]
    }"#;

    #[test]
    fn test_valid_definition() {
        let job = JobDefinition::from_json(VALID).unwrap();
        assert_eq!(job.kind, "container");
        assert_eq!(job.ops.len(), 2);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let err = JobDefinition::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::InvalidJobDefinition(_)));
    }

    #[test]
    fn test_empty_ops() {
        let job = JobDefinition::from_json(r#"{ "version": "0.1", "ops": [] }"#).unwrap();
        let issues = job.validate().unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new("ops", "must contain at least one operation")]);
    }

    #[test]
    fn test_collects_all_issues() {
        let job = JobDefinition::from_json(
            r#"{
                "version": "0.1",
                "ops": [
                    { "id": "a", "type": "container/run", "args": {} },
                    { "id": "a", "type": "container/run", "args": { "image": "x" } },
                    { "id": "", "type": "shell/exec" }
                ]
            }"#,
        )
        .unwrap();

        let issues = job.validate().unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["ops[0].args.image", "ops[1].id", "ops[2].id", "ops[2].type"]);
    }
}
