//! Per-operation task ledger.
//!
//! Executing operations write host assignment, status and results here;
//! status queries and path lookups read from it. Records are created lazily
//! on first write and only go away through [`TaskLedger::clear`].
//!
//! Each operation id is written by exactly one executing operation, so the
//! ledger only has to keep distinct ids from contending. It is backed by a
//! sharded [`DashMap`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::{OperationId, OperationStatus};

/// Everything the node knows about one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub operation_id: OperationId,

    /// Execution group; defaults to the operation id.
    pub group: String,

    pub provider_id: Option<String>,

    pub status: OperationStatus,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    pub exit_code: Option<i64>,

    /// Log lines in the order they were produced.
    pub logs: Vec<String>,

    /// Host the operation was assigned to.
    pub host: Option<String>,

    pub results: Map<String, Value>,
}

impl OperationRecord {
    /// Minimal record for an operation nothing has been written for yet.
    pub fn new(operation_id: OperationId) -> Self {
        Self {
            group: operation_id.as_str().to_string(),
            operation_id,
            provider_id: None,
            status: OperationStatus::Init,
            start_time: None,
            end_time: None,
            exit_code: None,
            logs: Vec::new(),
            host: None,
            results: Map::new(),
        }
    }

    /// Resolve a dotted path such as `"results.exitCode"` against this record.
    ///
    /// `"host"` returns the host directly. Otherwise the first segment names a
    /// record field and every further segment indexes into a JSON object.
    /// Unknown fields, missing keys and non-object intermediates all resolve
    /// to `None`.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        if path == "host" {
            return self.host.clone().map(Value::String);
        }

        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };

        match (root, rest) {
            (_, None) => self.field(root),
            ("results", Some(rest)) => lookup(&self.results, rest),
            (_, Some(rest)) => match self.field(root)? {
                Value::Object(map) => lookup(&map, rest),
                _ => None,
            },
        }
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "operationId" | "operation_id" => Some(Value::String(self.operation_id.to_string())),
            "group" => Some(Value::String(self.group.clone())),
            "providerId" | "provider_id" => self.provider_id.clone().map(Value::String),
            "status" => Some(Value::String(self.status.as_str().to_string())),
            "startTime" | "start_time" => self.start_time.map(|t| Value::String(t.to_rfc3339())),
            "endTime" | "end_time" => self.end_time.map(|t| Value::String(t.to_rfc3339())),
            "exitCode" | "exit_code" => self.exit_code.map(Value::from),
            "logs" => Some(Value::from(self.logs.clone())),
            "host" => self.host.clone().map(Value::String),
            "results" => Some(Value::Object(self.results.clone())),
            _ => None,
        }
    }
}

fn lookup(map: &Map<String, Value>, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// Mapping from operation id to its record, owned by one session.
#[derive(Debug, Default)]
pub struct TaskLedger {
    records: DashMap<OperationId, OperationRecord>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_mut(&self, operation_id: &OperationId) -> RefMut<'_, OperationId, OperationRecord> {
        self.records
            .entry(operation_id.clone())
            .or_insert_with(|| OperationRecord::new(operation_id.clone()))
    }

    pub fn set_host(&self, operation_id: &OperationId, host: impl Into<String>) {
        let host = host.into();
        trace!(operation_id = %operation_id, host = %host, "host assigned");
        self.record_mut(operation_id).host = Some(host);
    }

    pub fn set_result(&self, operation_id: &OperationId, key: impl Into<String>, value: Value) {
        self.record_mut(operation_id).results.insert(key.into(), value);
    }

    /// Merge `values` into the results, overwriting overlapping keys.
    pub fn set_results(&self, operation_id: &OperationId, values: Map<String, Value>) {
        let mut record = self.record_mut(operation_id);
        for (key, value) in values {
            record.results.insert(key, value);
        }
    }

    pub fn set_group(&self, operation_id: &OperationId, group: impl Into<String>) {
        self.record_mut(operation_id).group = group.into();
    }

    pub fn set_provider(&self, operation_id: &OperationId, provider_id: impl Into<String>) {
        self.record_mut(operation_id).provider_id = Some(provider_id.into());
    }

    pub fn set_status(&self, operation_id: &OperationId, status: OperationStatus) {
        self.record_mut(operation_id).status = status;
    }

    /// Mark the operation as running and stamp its start time.
    pub fn start(&self, operation_id: &OperationId) {
        let mut record = self.record_mut(operation_id);
        record.status = OperationStatus::Running;
        record.start_time = Some(Utc::now());
        trace!(operation_id = %operation_id, "operation started");
    }

    /// Record the final status and exit code and stamp the end time.
    pub fn finish(
        &self,
        operation_id: &OperationId,
        status: OperationStatus,
        exit_code: Option<i64>,
    ) {
        let mut record = self.record_mut(operation_id);
        record.status = status;
        record.exit_code = exit_code;
        record.end_time = Some(Utc::now());
        trace!(operation_id = %operation_id, status = status.as_str(), "operation finished");
    }

    pub fn append_log(&self, operation_id: &OperationId, line: impl Into<String>) {
        self.record_mut(operation_id).logs.push(line.into());
    }

    pub fn get(&self, operation_id: &OperationId) -> Option<OperationRecord> {
        self.records.get(operation_id).map(|r| r.value().clone())
    }

    /// Resolve `path` against the record for `operation_id`.
    ///
    /// `None` when there is no record or the path does not resolve.
    pub fn get_by_path(&self, operation_id: &OperationId, path: &str) -> Option<Value> {
        self.records.get(operation_id)?.resolve(path)
    }

    /// All records, ordered by operation id.
    pub fn snapshot(&self) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        records
    }

    /// Records belonging to an execution group, ordered by operation id.
    pub fn group(&self, group: &str) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> = self
            .records
            .iter()
            .filter(|r| r.group == group)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        records
    }

    pub fn status_counts(&self) -> HashMap<OperationStatus, usize> {
        let mut counts = HashMap::new();
        for record in self.records.iter() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record. Called when the owning session ends.
    pub fn clear(&self) {
        self.records.clear();
    }
}
