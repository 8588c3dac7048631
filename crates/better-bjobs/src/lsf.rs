//! LSF-backed collaborators: `bjobs` for the listing, `bkill` for kills, and
//! the system `mail` command for the completion notice.

use crate::config::Config;
use crate::session::Collaborators;
use bb_core::collab::{parse_records, CollaboratorError, JobKiller, Mailer, SnapshotSource};
use bb_core::Cache;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

const BJOBS_FIELDS: &str = "jobid stat queue kill_reason dependency exit_reason time_left \
                            %complete run_time max_mem memlimit nthreads exit_code";

pub fn collaborators(config: &Config) -> Collaborators {
    let source: Box<dyn SnapshotSource> = match &config.snapshot_file {
        Some(path) => Box::new(FileSource { path: path.clone() }),
        None => Box::new(BjobsSource {
            project: config.project.clone(),
        }),
    };
    Collaborators {
        source,
        killer: Box::new(Bkill),
        mailer: Box::new(MailCommand {
            recipient: config.mail_to.clone(),
        }),
    }
}

pub struct BjobsSource {
    project: Option<String>,
}

impl BjobsSource {
    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(project) = &self.project {
            args.push("-Jd".to_string());
            args.push(project.clone());
        }
        args.extend(["-a", "-json", "-o", BJOBS_FIELDS].map(str::to_string));
        args
    }
}

impl SnapshotSource for BjobsSource {
    fn fetch(&mut self) -> Result<Cache, CollaboratorError> {
        let args = self.args();
        let output = match run_command("bjobs", &args) {
            Ok(output) => output,
            Err(CollaboratorError::Failed { stderr, .. }) if is_empty_listing(&stderr) => {
                return Ok(Cache::new())
            }
            Err(err) => return Err(err),
        };
        let snapshot = parse_records("bjobs", &output)?;
        debug!(jobs = snapshot.len(), "bjobs listing fetched");
        Ok(snapshot)
    }
}

/// Reads a saved `bjobs -json` document instead of querying LSF.
pub struct FileSource {
    path: PathBuf,
}

impl SnapshotSource for FileSource {
    fn fetch(&mut self) -> Result<Cache, CollaboratorError> {
        let command = self.path.display().to_string();
        let payload = std::fs::read(&self.path).map_err(|source| CollaboratorError::Spawn {
            command: command.clone(),
            source,
        })?;
        parse_records(&command, &payload)
    }
}

pub struct Bkill;

impl JobKiller for Bkill {
    fn kill(&mut self, job_id: &str) -> Result<(), CollaboratorError> {
        run_command("bkill", &[job_id.to_string()])?;
        Ok(())
    }
}

pub struct MailCommand {
    recipient: String,
}

impl Mailer for MailCommand {
    fn send(&mut self, subject: &str, body: &str) -> Result<(), CollaboratorError> {
        let spawn_err = |source| CollaboratorError::Spawn {
            command: "mail".to_string(),
            source,
        };
        let mut child = Command::new("mail")
            .arg("-s")
            .arg(subject)
            .arg(&self.recipient)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(body.as_bytes()).map_err(spawn_err)?;
        }
        let output = child.wait_with_output().map_err(spawn_err)?;
        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                command: "mail".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn run_command(program: &str, args: &[String]) -> Result<Vec<u8>, CollaboratorError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CollaboratorError::Spawn {
            command: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(CollaboratorError::Failed {
            command: format!("{program} {}", args.join(" ")),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// `bjobs` exits non-zero when a project has no jobs at all.
fn is_empty_listing(stderr: &str) -> bool {
    stderr.contains("No job found") || stderr.contains("No unfinished job found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn project_scope_adds_job_group_filter() {
        let all = BjobsSource { project: None }.args();
        assert_eq!(all[..3], ["-a", "-json", "-o"]);
        assert!(all[3].contains("%complete"));

        let scoped = BjobsSource {
            project: Some("rnaseq".to_string()),
        }
        .args();
        assert_eq!(scoped[..3], ["-Jd", "rnaseq", "-a"]);
    }

    #[test]
    fn empty_listing_is_recognised() {
        assert!(is_empty_listing("No unfinished job found\n"));
        assert!(is_empty_listing("No job found in job group /rnaseq"));
        assert!(!is_empty_listing("LSF is down. Please wait"));
    }

    #[test]
    fn file_source_reads_bjobs_json() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(br#"{"RECORDS":[{"JOBID":"5","STAT":"DONE"}]}"#)
            .expect("write");
        let mut source = FileSource {
            path: file.path().to_path_buf(),
        };

        let snapshot = source.fetch().expect("fetch");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot["5"].status.is_terminal());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = run_command("better-bjobs-no-such-binary", &[]).unwrap_err();
        assert!(matches!(err, CollaboratorError::Spawn { .. }));
    }
}
