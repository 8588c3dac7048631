mod config;
mod lsf;
mod session;
mod status;
mod theme;
mod ui;

use anyhow::{Context, Result};
use bb_storage::JobStore;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use session::{Session, SessionEvent, Step, UserCommand};
use status::NoticeToken;
use std::{io, time::Duration};
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EXPIRY_QUEUE_CAPACITY: usize = 64;

#[derive(Parser)]
#[command(name = "better-bjobs")]
#[command(about = "Live LSF job dashboard that remembers finished jobs", long_about = None)]
struct Cli {
    /// Only show jobs in this LSF job group / project
    project: Option<String>,
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.project);
    init_logging(config.log_stdout);
    info!(
        store = %config.store_path.display(),
        project = config.project.as_deref().unwrap_or("*"),
        "starting"
    );

    let store = JobStore::new(&config.store_path);
    let (mut session, first) = Session::start(
        store,
        config.project.clone(),
        lsf::collaborators(&config),
    )
    .context("initial job listing failed")?;

    let mut terminal = setup_terminal().context("failed to initialise terminal")?;
    let result = run(&mut terminal, &mut session, first, config.refresh).await;
    let restored = restore_terminal(&mut terminal);

    if let Some(err) = session.exit_error() {
        eprintln!("better-bjobs: {err}");
    }
    finish(result, restored)
}

/// A loop failure outranks a failure to restore the terminal after it.
fn finish(result: Result<()>, restored: Result<()>) -> Result<()> {
    if let Err(err) = &restored {
        warn!(error = %err, "failed to restore terminal");
    }
    result.and(restored)
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run(
    terminal: &mut Term,
    session: &mut Session,
    first: Step,
    refresh: Duration,
) -> Result<()> {
    let (expiry_tx, mut expiry_rx) = mpsc::channel::<NoticeToken>(EXPIRY_QUEUE_CAPACITY);
    schedule(&expiry_tx, first);

    let (width, height) = crossterm::terminal::size()?;
    session.handle(SessionEvent::Command(UserCommand::ResizeDisplay {
        width,
        height,
    }))?;

    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + refresh, refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| ui::render(frame, session))?;

        let event = tokio::select! {
            _ = ticker.tick() => SessionEvent::Tick,
            Some(token) = expiry_rx.recv() => SessionEvent::NoticeExpired(token),
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => match command_for_event(event) {
                    Some(command) => SessionEvent::Command(command),
                    None => continue,
                },
                Some(Err(err)) => return Err(err).context("terminal input failed"),
                None => break,
            },
        };

        let step = session.handle(event)?;
        if step.quit {
            break;
        }
        schedule(&expiry_tx, step);
    }

    Ok(())
}

fn schedule(tx: &mpsc::Sender<NoticeToken>, step: Step) {
    for timer in step.timers {
        status::spawn_expiry(timer, tx.clone());
    }
}

fn command_for_event(event: Event) -> Option<UserCommand> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => command_for_key(key),
        Event::Resize(width, height) => Some(UserCommand::ResizeDisplay { width, height }),
        _ => None,
    }
}

fn command_for_key(key: KeyEvent) -> Option<UserCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(UserCommand::Quit),
        KeyCode::Char('l') if ctrl => Some(UserCommand::ClearCache),
        _ if ctrl => None,
        KeyCode::Char('q') => Some(UserCommand::Quit),
        KeyCode::Char('e') => Some(UserCommand::ToggleEmail),
        KeyCode::Char('c') => Some(UserCommand::ClearCache),
        KeyCode::Char('k') => Some(UserCommand::RequestKillAll),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserCommand::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(UserCommand::ConfirmNo),
        _ => None,
    }
}

fn init_logging(stdout_enabled: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keys_map_to_commands() {
        let none = KeyModifiers::NONE;
        let ctrl = KeyModifiers::CONTROL;
        assert_eq!(
            command_for_event(key(KeyCode::Char('q'), none)),
            Some(UserCommand::Quit)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Char('c'), ctrl)),
            Some(UserCommand::Quit)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Char('c'), none)),
            Some(UserCommand::ClearCache)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Char('l'), ctrl)),
            Some(UserCommand::ClearCache)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Char('k'), none)),
            Some(UserCommand::RequestKillAll)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Char('Y'), KeyModifiers::SHIFT)),
            Some(UserCommand::ConfirmYes)
        );
        assert_eq!(
            command_for_event(key(KeyCode::Esc, none)),
            Some(UserCommand::ConfirmNo)
        );
        assert_eq!(command_for_event(key(KeyCode::Char('x'), none)), None);
        assert_eq!(command_for_event(key(KeyCode::Char('e'), ctrl)), None);
    }

    #[test]
    fn key_release_is_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(command_for_event(release), None);
    }

    #[test]
    fn resize_carries_new_size() {
        assert_eq!(
            command_for_event(Event::Resize(132, 43)),
            Some(UserCommand::ResizeDisplay {
                width: 132,
                height: 43
            })
        );
    }

    #[test]
    fn loop_error_wins_over_restore_error() {
        let both = finish(
            Err(anyhow::anyhow!("terminal input failed")),
            Err(anyhow::anyhow!("raw mode stuck")),
        );
        assert_eq!(both.unwrap_err().to_string(), "terminal input failed");

        let restore_only = finish(Ok(()), Err(anyhow::anyhow!("raw mode stuck")));
        assert_eq!(restore_only.unwrap_err().to_string(), "raw mode stuck");

        assert!(finish(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn cli_accepts_at_most_one_project() {
        assert!(Cli::try_parse_from(["better-bjobs"]).is_ok());
        let scoped = Cli::try_parse_from(["better-bjobs", "rnaseq"]).expect("parse");
        assert_eq!(scoped.project.as_deref(), Some("rnaseq"));
        assert!(Cli::try_parse_from(["better-bjobs", "a", "b"]).is_err());
    }
}
