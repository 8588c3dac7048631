pub mod classify;
pub mod collab;
pub mod notify;
pub mod reconcile;
pub mod sizes;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every job the dashboard knows about, keyed by scheduler job id.
pub type Cache = BTreeMap<String, JobRecord>;

/// Usage ratio above which a running job is flagged as close to its memory limit.
pub const MEMORY_ALERT_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Exited,
    /// Suspended, unknown and other states are carried through as reported.
    Other(String),
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PEND",
            JobStatus::Running => "RUN",
            JobStatus::Done => "DONE",
            JobStatus::Exited => "EXIT",
            JobStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Exited)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Pending)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "PEND" => JobStatus::Pending,
            "RUN" => JobStatus::Running,
            "DONE" => JobStatus::Done,
            "EXIT" => JobStatus::Exited,
            _ => JobStatus::Other(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job as reported by `bjobs -json`. Field names follow the scheduler's
/// output so the saved cache stays readable by the same parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "JOBID", default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "STAT", default)]
    pub status: JobStatus,
    #[serde(rename = "QUEUE", default)]
    pub queue: String,
    #[serde(rename = "KILL_REASON", default)]
    pub kill_reason: String,
    #[serde(rename = "DEPENDENCY", default)]
    pub dependency: String,
    #[serde(rename = "EXIT_REASON", default)]
    pub exit_reason: String,
    #[serde(rename = "TIME_LEFT", default)]
    pub time_left: String,
    #[serde(rename = "%COMPLETE", default)]
    pub percent_complete: String,
    #[serde(rename = "RUN_TIME", default)]
    pub run_time: String,
    #[serde(rename = "MAX_MEM", default)]
    pub memory_used: String,
    #[serde(rename = "MEMLIMIT", default)]
    pub memory_limit: String,
    #[serde(rename = "NTHREADS", default)]
    pub threads: String,
    #[serde(rename = "EXIT_CODE", default)]
    pub exit_code: String,
}

impl JobRecord {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            ..Self::default()
        }
    }

    /// `"80.5G/293G"`, or empty while the job has no usage data.
    pub fn memory_usage(&self) -> String {
        let Some(used) = sizes::parse_size(&self.memory_used) else {
            return String::new();
        };
        let limit = sizes::parse_size(&self.memory_limit)
            .map(|size| size.short())
            .unwrap_or_default();
        format!("{}/{}", used.short(), limit)
    }

    pub fn is_at_memory_limit(&self) -> bool {
        let Some(used) = sizes::parse_size(&self.memory_used) else {
            return false;
        };
        let limit = sizes::parse_size(&self.memory_limit)
            .map(|size| size.bytes())
            .unwrap_or(0.0);
        if limit <= 0.0 {
            return false;
        }
        used.bytes() / limit > MEMORY_ALERT_RATIO
    }

    pub fn completion_percent(&self) -> f64 {
        sizes::parse_percent(&self.percent_complete)
    }

    pub fn time_limit_display(&self) -> &str {
        sizes::strip_limit_marker(&self.percent_complete)
    }

    /// Whether `other` carries an update worth storing: a new status, time
    /// left, completion, or memory reading (used or limit). Queue, thread
    /// count and the rest do not count.
    pub fn differs_materially(&self, other: &JobRecord) -> bool {
        self.status != other.status
            || self.time_left != other.time_left
            || self.percent_complete != other.percent_complete
            || self.memory_used != other.memory_used
            || self.memory_limit != other.memory_limit
    }
}

/// Scheduler ids are numeric but arrive as strings from `bjobs -json`; accept both.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom("expected string or number for JOBID")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(used: &str, limit: &str) -> JobRecord {
        JobRecord {
            memory_used: used.to_string(),
            memory_limit: limit.to_string(),
            ..JobRecord::new("1", JobStatus::Running)
        }
    }

    #[test]
    fn memory_usage_uses_short_units() {
        assert_eq!(running("80.5 Gbytes", "293 G").memory_usage(), "80.5G/293G");
        assert_eq!(running("", "293 G").memory_usage(), "");
    }

    #[test]
    fn memory_limit_boundary_is_exclusive() {
        assert!(!running("90 G", "100 G").is_at_memory_limit());
        assert!(running("90.00001 G", "100 G").is_at_memory_limit());
        assert!(running("0.9000001 G", "1 G").is_at_memory_limit());
        assert!(!running("", "100 G").is_at_memory_limit());
        assert!(!running("80.5 Gbytes", "293 G").is_at_memory_limit());
        assert!(running("280 Gbytes", "293 G").is_at_memory_limit());
    }

    #[test]
    fn missing_limit_never_alerts() {
        assert!(!running("10 G", "").is_at_memory_limit());
        assert!(!running("10 G", "0 G").is_at_memory_limit());
    }

    #[test]
    fn status_round_trips_unknown_values() {
        let raw = r#"{"JOBID":"7","STAT":"PSUSP","QUEUE":"short"}"#;
        let record: JobRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(record.status, JobStatus::Other("PSUSP".to_string()));
        assert!(!record.status.is_active());
        let encoded = serde_json::to_value(&record).expect("encode");
        assert_eq!(encoded["STAT"], "PSUSP");
    }

    #[test]
    fn numeric_job_id_is_accepted() {
        let record: JobRecord =
            serde_json::from_str(r#"{"JOBID":81061,"STAT":"RUN","%COMPLETE":"0.29% L"}"#)
                .expect("parse");
        assert_eq!(record.id, "81061");
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.completion_percent(), 0.29);
        assert_eq!(record.time_limit_display(), "0.29%");
    }

    #[test]
    fn material_difference_ignores_display_only_fields() {
        let base = running("10 G", "100 G");
        let mut requeued = base.clone();
        requeued.queue = "long".to_string();
        requeued.threads = "8".to_string();
        assert!(!base.differs_materially(&requeued));

        let mut grown = base.clone();
        grown.memory_used = "11 G".to_string();
        assert!(base.differs_materially(&grown));

        let mut raised = base.clone();
        raised.memory_limit = "300 G".to_string();
        assert!(base.differs_materially(&raised));

        let mut finished = base.clone();
        finished.status = JobStatus::Done;
        assert!(base.differs_materially(&finished));
    }
}
