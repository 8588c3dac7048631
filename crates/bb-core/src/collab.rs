//! Seams to the outside world: the scheduler's job listing, its kill command,
//! and the mail command. The dashboard only ever talks to these traits so the
//! session logic can be driven by fakes in tests.

use crate::{Cache, JobRecord};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("unreadable output from {command}: {reason}")]
    Parse { command: String, reason: String },
}

/// Produces the scheduler's current view of jobs.
pub trait SnapshotSource {
    fn fetch(&mut self) -> Result<Cache, CollaboratorError>;
}

pub trait JobKiller {
    fn kill(&mut self, job_id: &str) -> Result<(), CollaboratorError>;
}

pub trait Mailer {
    fn send(&mut self, subject: &str, body: &str) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    #[serde(rename = "RECORDS", default)]
    records: Vec<JobRecord>,
}

/// Parses the `{"RECORDS": [...]}` document `bjobs -json` prints into a
/// snapshot keyed by job id. Records without an id are skipped.
pub fn parse_records(command: &str, payload: &[u8]) -> Result<Cache, CollaboratorError> {
    let envelope: RecordsEnvelope =
        serde_json::from_slice(payload).map_err(|err| CollaboratorError::Parse {
            command: command.to_string(),
            reason: err.to_string(),
        })?;
    Ok(envelope
        .records
        .into_iter()
        .filter(|record| !record.id.is_empty())
        .map(|record| (record.id.clone(), record))
        .collect())
}
