//! Turns the cache into what the dashboard shows: status counts and an
//! ordered list of rows grouped by alert tier.

use crate::{Cache, JobRecord, JobStatus};

/// Completion percentage at which a running job is flagged as close to its
/// run-time limit.
pub const TIME_ALERT_PERCENT: f64 = 95.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub exited: usize,
    pub other: usize,
}

impl JobCounts {
    pub fn active(&self) -> usize {
        self.running + self.pending
    }
}

/// Rows are emitted in the order these variants are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    TimeCritical,
    MemoryCritical,
    Running,
    Exited,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub tier: Tier,
    pub job: JobRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub counts: JobCounts,
    pub rows: Vec<BoardRow>,
}

/// Time pressure is checked before memory pressure, so a job close to both
/// limits is reported once, as time-critical.
pub fn tier_for(job: &JobRecord) -> Option<Tier> {
    match job.status {
        JobStatus::Running if job.completion_percent() >= TIME_ALERT_PERCENT => {
            Some(Tier::TimeCritical)
        }
        JobStatus::Running if job.is_at_memory_limit() => Some(Tier::MemoryCritical),
        JobStatus::Running => Some(Tier::Running),
        JobStatus::Exited => Some(Tier::Exited),
        JobStatus::Done => Some(Tier::Done),
        JobStatus::Pending | JobStatus::Other(_) => None,
    }
}

pub fn count(cache: &Cache) -> JobCounts {
    let mut counts = JobCounts::default();
    for job in cache.values() {
        match job.status {
            JobStatus::Pending => counts.pending += 1,
            JobStatus::Running => counts.running += 1,
            JobStatus::Done => counts.done += 1,
            JobStatus::Exited => counts.exited += 1,
            JobStatus::Other(_) => counts.other += 1,
        }
    }
    counts
}

/// Pending jobs and unrecognised states are counted but get no row.
pub fn classify(cache: &Cache) -> Board {
    let mut rows: Vec<BoardRow> = cache
        .values()
        .filter_map(|job| {
            tier_for(job).map(|tier| BoardRow {
                tier,
                job: job.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.job.id.cmp(&b.job.id)));
    Board {
        counts: count(cache),
        rows,
    }
}
