use crate::classify::JobCounts;

/// Decides whether the armed "mail me when everything ends" notification
/// should go out for the given counts.
///
/// The rule is kept exactly as operators know it: nothing running, and
/// either something exited or nothing is done yet. Note the second clause
/// also holds when only pending jobs remain.
pub fn should_notify(counts: &JobCounts) -> bool {
    counts.running == 0 && (counts.exited != 0 || counts.done == 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

pub fn compose(counts: &JobCounts, project: Option<&str>, at: &str) -> Notification {
    let scope = project
        .map(|name| format!("project {name}"))
        .unwrap_or_else(|| "all jobs".to_string());
    let subject = format!("better-bjobs: {scope} finished");
    let body = format!(
        "No jobs are running for {scope}.\n\n\
         Exited: {exited}\n\
         Done: {done}\n\
         Pending: {pending}\n\n\
         Checked at {at}.\n",
        exited = counts.exited,
        done = counts.done,
        pending = counts.pending,
    );
    Notification { subject, body }
}
