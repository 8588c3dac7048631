use crate::session::Session;
use crate::theme;
use bb_core::classify::{BoardRow, JobCounts, Tier};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

/// Below this width the queue column is dropped.
const COMPACT_WIDTH: u16 = 72;

const BUTTONS: [&str; 4] = [
    "Quit [q]",
    "Email On All Ending [e]",
    "Kill All Jobs [k]",
    "Clear Job Cache [c]",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub table: Rect,
    pub counts: Rect,
    pub footer: Rect,
    pub compact: bool,
}

impl Geometry {
    /// Job table on top, then a counts line, then the button/status line.
    pub fn compute(area: Rect) -> Self {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);
        Self {
            table: parts[0],
            counts: parts[1],
            footer: parts[2],
            compact: area.width < COMPACT_WIDTH,
        }
    }
}

pub fn render(frame: &mut Frame, session: &Session) {
    let geometry = Geometry::compute(viewport_area(session.viewport(), frame.size()));
    render_table(frame, session, geometry);
    render_counts(frame, session.counts(), geometry.counts);
    render_footer(frame, session, geometry.footer);
}

/// The last size the terminal reported, clamped to the frame actually drawn.
fn viewport_area(viewport: (u16, u16), frame: Rect) -> Rect {
    match viewport {
        (0, _) | (_, 0) => frame,
        (width, height) => Rect::new(0, 0, width, height).intersection(frame),
    }
}

fn render_table(frame: &mut Frame, session: &Session, geometry: Geometry) {
    let mut title = String::from(" better-bjobs ");
    if let Some(project) = session.project() {
        title.push_str(&format!("· project {project} "));
    }
    if let Some(at) = session.last_refresh() {
        title.push_str(&format!("· {} ", at.format("%H:%M:%S")));
    }

    let header = Row::new(
        header_cells(geometry.compact)
            .into_iter()
            .map(Cell::from)
            .collect::<Vec<_>>(),
    )
    .style(theme::HEADER_STYLE);
    let rows: Vec<Row> = session
        .board()
        .rows
        .iter()
        .map(|row| {
            Row::new(
                row_cells(row, geometry.compact)
                    .into_iter()
                    .map(Cell::from)
                    .collect::<Vec<_>>(),
            )
            .style(theme::tier_style(row.tier))
        })
        .collect();
    let widths: Vec<Constraint> = if geometry.compact {
        vec![
            Constraint::Percentage(20),
            Constraint::Percentage(12),
            Constraint::Percentage(34),
            Constraint::Percentage(34),
        ]
    } else {
        vec![
            Constraint::Percentage(14),
            Constraint::Percentage(10),
            Constraint::Percentage(14),
            Constraint::Percentage(31),
            Constraint::Percentage(31),
        ]
    };

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::BORDER_STYLE)
            .title(title),
    );
    frame.render_widget(table, geometry.table);
}

fn render_counts(frame: &mut Frame, counts: &JobCounts, area: Rect) {
    let labels = [
        format!("Running: {}", counts.running),
        format!("Pending: {}", counts.pending),
        format!("Done: {}", counts.done),
        format!("Exited: {}", counts.exited),
    ];
    render_quarters(frame, area, labels.map(Line::from));
}

fn render_footer(frame: &mut Frame, session: &Session, area: Rect) {
    if let Some(notice) = session.notice() {
        let line = Line::from(Span::styled(
            notice.text.clone(),
            theme::tone_style(notice.tone),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let buttons = BUTTONS.map(|label| Line::from(Span::styled(label, theme::BUTTON_STYLE)));
    let [quit, email, kill, clear] = buttons;
    let email = if session.email_armed() {
        Line::from(Span::styled(
            "Email notification scheduled",
            theme::ARMED_STYLE,
        ))
    } else {
        email
    };
    render_quarters(frame, area, [quit, email, kill, clear]);
}

fn render_quarters(frame: &mut Frame, area: Rect, lines: [Line<'static>; 4]) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for (line, column) in lines.into_iter().zip(columns.iter()) {
        frame.render_widget(Paragraph::new(line), *column);
    }
}

fn header_cells(compact: bool) -> Vec<&'static str> {
    if compact {
        vec!["JOB ID", "STATUS", "RAM USAGE", "%Time Limit"]
    } else {
        vec!["JOB ID", "STATUS", "QUEUE", "RAM USAGE", "%Time Limit"]
    }
}

/// Alert rows replace the column they are alerting on with an explanation;
/// finished jobs show their exit reason in the last column.
fn row_cells(row: &BoardRow, compact: bool) -> Vec<String> {
    let job = &row.job;
    let (memory, last) = match row.tier {
        Tier::TimeCritical => (
            job.memory_usage(),
            format!("Job is nearly at time limit ({})", job.time_limit_display()),
        ),
        Tier::MemoryCritical => (
            format!("Job is at memory limit ({})", job.memory_usage()),
            job.time_limit_display().to_string(),
        ),
        Tier::Running => (job.memory_usage(), job.time_limit_display().to_string()),
        Tier::Exited => (job.memory_usage(), job.exit_reason.clone()),
        Tier::Done => (job.memory_usage(), String::new()),
    };
    let mut cells = vec![job.id.clone(), job.status.to_string()];
    if !compact {
        cells.push(job.queue.clone());
    }
    cells.push(memory);
    cells.push(last);
    cells
}
