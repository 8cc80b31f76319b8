//! Per-stage audit records.
//!
//! Each stage appends one record describing what it consumed and produced.
//! The log is kept in memory and handed to the caller with the bundle; the
//! caller decides where it is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::Stage;

/// Outcome of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
}

/// A single entry in the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    /// Hash of the artifact(s) the stage consumed
    pub input_hash: String,
    /// Hash of the artifact the stage produced
    pub output_hash: Option<String>,
    pub status: StageStatus,
    pub duration_ms: Option<u64>,
    /// Free-form note, e.g. which classifier strategy answered
    pub note: Option<String>,
    pub error: Option<String>,
}

impl StageRecord {
    pub fn new(
        analysis_id: Uuid,
        stage: Stage,
        started_at: DateTime<Utc>,
        input_hash: String,
        status: StageStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            analysis_id,
            stage,
            started_at,
            input_hash,
            output_hash: None,
            status,
            duration_ms: None,
            note: None,
            error: None,
        }
    }

    pub fn with_output_hash(mut self, output_hash: String) -> Self {
        self.output_hash = Some(output_hash);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

/// Ordered audit trail for one analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    records: Vec<StageRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: StageRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.records.iter().all(StageRecord::succeeded)
    }

    pub fn find(&self, stage: Stage) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage == stage)
    }

    /// Newline-delimited JSON, one record per line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}
