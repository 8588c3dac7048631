//! The dashboard's state machine: refresh ticks, operator commands, the
//! kill-all confirmation and the one-shot "all jobs ended" mail.
//!
//! Everything here runs on the main loop. Rendering reads the session through
//! its accessors; nothing else writes to it.

use crate::status::{ExpiryTimer, Notice, NoticeToken, StatusLine, Tone, NOTICE_TTL, PROMPT_TTL};
use bb_core::classify::{classify, Board, JobCounts};
use bb_core::collab::{CollaboratorError, JobKiller, Mailer, SnapshotSource};
use bb_core::notify::{compose, should_notify};
use bb_core::reconcile::reconcile;
use bb_core::Cache;
use bb_storage::JobStore;
use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not read the scheduler job listing: {0}")]
    Snapshot(#[source] CollaboratorError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    AwaitKillConfirmation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserCommand {
    Quit,
    ToggleEmail,
    ClearCache,
    ResizeDisplay { width: u16, height: u16 },
    RequestKillAll,
    ConfirmYes,
    ConfirmNo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Tick,
    Command(UserCommand),
    NoticeExpired(NoticeToken),
}

/// What the loop has to do after an event: arm notice timers, maybe stop.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub quit: bool,
    pub timers: Vec<ExpiryTimer>,
}

pub struct Collaborators {
    pub source: Box<dyn SnapshotSource>,
    pub killer: Box<dyn JobKiller>,
    pub mailer: Box<dyn Mailer>,
}

pub struct Session {
    cache: Cache,
    store: JobStore,
    project: Option<String>,
    collaborators: Collaborators,
    mode: Mode,
    /// Set exactly while the mode is `AwaitKillConfirmation`.
    prompt: Option<(NoticeToken, Notice)>,
    email_armed: bool,
    board: Board,
    status: StatusLine,
    viewport: (u16, u16),
    last_refresh: Option<DateTime<Local>>,
    exit_error: Option<String>,
}

impl Session {
    /// Loads the saved cache and performs the first refresh. An unreadable
    /// cache file is reported on the status line; a failed job listing is fatal.
    pub fn start(
        store: JobStore,
        project: Option<String>,
        collaborators: Collaborators,
    ) -> Result<(Self, Step), SessionError> {
        let (cache, load_error) = store.load_or_empty();
        let mut session = Self {
            cache,
            store,
            project,
            collaborators,
            mode: Mode::Idle,
            prompt: None,
            email_armed: false,
            board: Board::default(),
            status: StatusLine::default(),
            viewport: (0, 0),
            last_refresh: None,
            exit_error: None,
        };
        let mut step = Step::default();
        if let Some(err) = load_error {
            session.notify(&mut step, Tone::Error, format!("Ignoring saved jobs: {err}"));
        }
        session.refresh(&mut step)?;
        Ok((session, step))
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<Step, SessionError> {
        let mut step = Step::default();
        match event {
            SessionEvent::Tick => self.refresh(&mut step)?,
            SessionEvent::NoticeExpired(token) => self.expire(token),
            SessionEvent::Command(command) => self.command(command, &mut step)?,
        }
        Ok(step)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn counts(&self) -> &JobCounts {
        &self.board.counts
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn email_armed(&self) -> bool {
        self.email_armed
    }

    /// An armed kill prompt stays on screen over any later notice, so a
    /// `y` is never answered blind.
    pub fn notice(&self) -> Option<&Notice> {
        match &self.prompt {
            Some((_, prompt)) => Some(prompt),
            None => self.status.current(),
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.last_refresh
    }

    /// Set when the final save on quit failed.
    pub fn exit_error(&self) -> Option<&str> {
        self.exit_error.as_deref()
    }

    fn command(&mut self, command: UserCommand, step: &mut Step) -> Result<(), SessionError> {
        match (self.mode, command) {
            (_, UserCommand::Quit) => {
                if let Err(err) = self.store.save(&self.cache) {
                    warn!(error = %err, "job cache not saved on exit");
                    self.exit_error = Some(format!("job cache not saved: {err}"));
                }
                step.quit = true;
            }
            (_, UserCommand::ToggleEmail) => self.toggle_email(step),
            (_, UserCommand::ClearCache) => self.clear_cache(step)?,
            (_, UserCommand::ResizeDisplay { width, height }) => {
                self.viewport = (width, height);
            }
            (Mode::Idle, UserCommand::RequestKillAll) => self.request_kill_all(step),
            (Mode::AwaitKillConfirmation, UserCommand::ConfirmYes) => {
                self.leave_prompt();
                self.kill_all(step);
            }
            (Mode::AwaitKillConfirmation, UserCommand::ConfirmNo) => {
                if let Some((token, _)) = &self.prompt {
                    self.status.expire(*token);
                }
                self.leave_prompt();
                debug!("kill all declined");
            }
            (Mode::AwaitKillConfirmation, UserCommand::RequestKillAll)
            | (Mode::Idle, UserCommand::ConfirmYes | UserCommand::ConfirmNo) => {}
        }
        Ok(())
    }

    fn refresh(&mut self, step: &mut Step) -> Result<(), SessionError> {
        let live = self
            .collaborators
            .source
            .fetch()
            .map_err(SessionError::Snapshot)?;
        if reconcile(&mut self.cache, live) {
            debug!(jobs = self.cache.len(), "job cache changed");
        }
        self.board = classify(&self.cache);
        self.last_refresh = Some(Local::now());

        if self.email_armed && should_notify(&self.board.counts) {
            self.send_notification(step);
        }
        Ok(())
    }

    fn send_notification(&mut self, step: &mut Step) {
        self.email_armed = false;
        let counts = self.board.counts;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let message = compose(&counts, self.project.as_deref(), &stamp);
        match self
            .collaborators
            .mailer
            .send(&message.subject, &message.body)
        {
            Ok(()) => {
                info!(exited = counts.exited, done = counts.done, "completion mail sent");
                self.notify(
                    step,
                    Tone::Success,
                    format!(
                        "Email sent: {} exited, {} done",
                        counts.exited, counts.done
                    ),
                );
            }
            Err(err) => {
                warn!(error = %err, "completion mail failed");
                self.notify(step, Tone::Error, format!("Email failed: {err}"));
            }
        }
    }

    fn toggle_email(&mut self, step: &mut Step) {
        if self.board.counts.active() == 0 {
            self.notify(step, Tone::Error, "No running or pending jobs to watch");
            return;
        }
        self.email_armed = !self.email_armed;
        info!(armed = self.email_armed, "completion mail toggled");
    }

    /// Replaces the cache with the live listing. Unlike a refresh this drops
    /// finished jobs the scheduler no longer reports.
    fn clear_cache(&mut self, step: &mut Step) -> Result<(), SessionError> {
        let live = self
            .collaborators
            .source
            .fetch()
            .map_err(SessionError::Snapshot)?;
        let dropped = self.cache.len().saturating_sub(live.len());
        self.cache = live;
        self.board = classify(&self.cache);
        self.last_refresh = Some(Local::now());
        info!(dropped, kept = self.cache.len(), "job cache cleared");

        match self.store.save(&self.cache) {
            Ok(()) => self.notify(step, Tone::Info, "Cleared cached job info"),
            Err(err) => {
                warn!(error = %err, "cleared job cache not saved");
                self.notify(step, Tone::Error, format!("Cache cleared but not saved: {err}"));
            }
        }
        Ok(())
    }

    fn request_kill_all(&mut self, step: &mut Step) {
        if self.board.counts.active() == 0 {
            self.notify(step, Tone::Error, "No running or pending jobs to kill");
            return;
        }
        let scope = self
            .project
            .as_deref()
            .map(|name| format!(" for project {name}"))
            .unwrap_or_default();
        let prompt = Notice::new(
            Tone::Prompt,
            format!("Are you sure you want to kill all unfinished jobs{scope}? [y/n]"),
        );
        let timer = self.status.show(prompt.clone(), PROMPT_TTL);
        self.mode = Mode::AwaitKillConfirmation;
        self.prompt = Some((timer.token, prompt));
        step.timers.push(timer);
    }

    /// Sends a kill for every cached job, whatever its state. One failure
    /// does not stop the rest.
    fn kill_all(&mut self, step: &mut Step) {
        let ids: Vec<String> = self.cache.keys().cloned().collect();
        let mut first_error = None;
        let mut failed = 0usize;
        for id in &ids {
            if let Err(err) = self.collaborators.killer.kill(id) {
                warn!(job = %id, error = %err, "kill failed");
                failed += 1;
                first_error.get_or_insert(err);
            }
        }
        info!(requested = ids.len(), failed, "kill all finished");

        match first_error {
            None => self.notify(
                step,
                Tone::Success,
                format!("Kill sent to {} jobs", ids.len()),
            ),
            Some(err) => self.notify(
                step,
                Tone::Error,
                format!(
                    "Killed {}/{} jobs; first failure: {err}",
                    ids.len() - failed,
                    ids.len()
                ),
            ),
        }
    }

    fn expire(&mut self, token: NoticeToken) {
        self.status.expire(token);
        let timed_out = matches!(&self.prompt, Some((prompt, _)) if *prompt == token);
        if self.mode == Mode::AwaitKillConfirmation && timed_out {
            debug!("kill confirmation timed out");
            self.leave_prompt();
        }
    }

    fn leave_prompt(&mut self) {
        self.mode = Mode::Idle;
        self.prompt = None;
    }

    fn notify(&mut self, step: &mut Step, tone: Tone, text: impl Into<String>) {
        step.timers
            .push(self.status.show(Notice::new(tone, text), NOTICE_TTL));
    }
}
