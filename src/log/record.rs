//! Records handed to log sinks.
//!
//! Field names are part of the external contract: dashboards key on
//! `actionName`, `elapsed`, `stats.<kind>.count`, `stats.<kind>.totalElapsed`,
//! `errorCode` and `severity`. Durations are serialized as nanoseconds.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::log::level::Level;
use crate::log::marker::Severity;

/// A single log call that passed level filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub logger: String,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Id of the action bound when the record was emitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

/// Aggregate of all calls tracked under one dependency kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStat {
    pub count: u64,
    #[serde(serialize_with = "as_nanos")]
    pub total_elapsed: Duration,
}

impl ActionStat {
    pub fn add(&mut self, elapsed: Duration) {
        self.count = self.count.saturating_add(1);
        self.total_elapsed = self.total_elapsed.saturating_add(elapsed);
    }
}

/// The one record flushed when a unit of work ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: String,
    pub action_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "as_nanos")]
    pub elapsed: Duration,
    pub stats: BTreeMap<String, ActionStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl ActionRecord {
    pub fn is_failure(&self) -> bool {
        self.severity.is_some()
    }

    /// Stat for `key`, if anything was tracked under it.
    pub fn stat(&self, key: &str) -> Option<&ActionStat> {
        self.stats.get(key)
    }
}

fn as_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}
