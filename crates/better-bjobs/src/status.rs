//! The transient message line at the bottom of the screen.
//!
//! The main loop owns the [`StatusLine`]. Expiring a notice is done by a
//! detached task that only sleeps and then mails the notice's token back over
//! a channel, so display state has a single writer.

use std::time::Duration;
use tokio::sync::mpsc;

/// How long errors and confirmations stay on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(2);
/// How long the kill-all prompt waits for an answer.
pub const PROMPT_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
    Prompt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub tone: Tone,
}

impl Notice {
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoticeToken(u64);

/// Ask the loop to deliver `token` back after `after` has elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryTimer {
    pub token: NoticeToken,
    pub after: Duration,
}

#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<(NoticeToken, Notice)>,
    issued: u64,
}

impl StatusLine {
    /// Replaces whatever is showing. The previous notice's timer becomes stale.
    pub fn show(&mut self, notice: Notice, ttl: Duration) -> ExpiryTimer {
        self.issued += 1;
        let token = NoticeToken(self.issued);
        self.current = Some((token, notice));
        ExpiryTimer { token, after: ttl }
    }

    /// Clears the line if `token` is still the notice on display.
    pub fn expire(&mut self, token: NoticeToken) -> bool {
        match &self.current {
            Some((current, _)) if *current == token => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref().map(|(_, notice)| notice)
    }
}

pub fn spawn_expiry(timer: ExpiryTimer, tx: mpsc::Sender<NoticeToken>) {
    tokio::spawn(async move {
        tokio::time::sleep(timer.after).await;
        let _ = tx.send(timer.token).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_clears_only_the_matching_notice() {
        let mut line = StatusLine::default();
        let first = line.show(Notice::new(Tone::Info, "one"), NOTICE_TTL);
        let second = line.show(Notice::new(Tone::Error, "two"), NOTICE_TTL);
        assert_ne!(first.token, second.token);

        assert!(!line.expire(first.token));
        assert_eq!(line.current().map(|n| n.text.as_str()), Some("two"));

        assert!(line.expire(second.token));
        assert!(line.current().is_none());
        assert!(!line.expire(second.token));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_task_sends_token_after_ttl() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut line = StatusLine::default();
        let timer = line.show(Notice::new(Tone::Prompt, "sure?"), PROMPT_TTL);

        spawn_expiry(timer, tx);

        let token = rx.recv().await.expect("token");
        assert_eq!(token, timer.token);
        assert!(line.expire(token));
    }
}
