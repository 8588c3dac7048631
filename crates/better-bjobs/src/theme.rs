use crate::status::Tone;
use bb_core::classify::Tier;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
pub const BUTTON_STYLE: Style = Style::new().fg(Color::Indexed(248));
pub const ARMED_STYLE: Style = Style::new().fg(Color::Green).add_modifier(Modifier::BOLD);
pub const BORDER_STYLE: Style = Style::new().fg(Color::Rgb(71, 85, 105));

pub fn tier_style(tier: Tier) -> Style {
    match tier {
        Tier::TimeCritical | Tier::MemoryCritical => Style::new()
            .fg(Color::Indexed(197))
            .add_modifier(Modifier::UNDERLINED),
        Tier::Running => Style::new().fg(Color::Indexed(248)),
        Tier::Exited => Style::new().fg(Color::Red),
        Tier::Done => Style::new().fg(Color::Green),
    }
}

pub fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Info => Style::new().fg(Color::Yellow),
        Tone::Success => Style::new().fg(Color::Green),
        Tone::Error => Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
        Tone::Prompt => Style::new().fg(Color::Red),
    }
}
