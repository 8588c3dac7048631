//! Parsing for the human-readable size and percentage strings the scheduler
//! reports (`"80.5 Gbytes"`, `"293 G"`, `"0.29% L"`).
//!
//! Units step by 1000, not 1024, which is how LSF itself scales `MAX_MEM` and
//! `MEMLIMIT`. Nothing here returns an error: a malformed number reads as zero
//! so a single odd record can only degrade the display.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl SizeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Bytes => "",
            SizeUnit::Kilo => "K",
            SizeUnit::Mega => "M",
            SizeUnit::Giga => "G",
            SizeUnit::Tera => "T",
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            SizeUnit::Bytes => 1.0,
            SizeUnit::Kilo => 1e3,
            SizeUnit::Mega => 1e6,
            SizeUnit::Giga => 1e9,
            SizeUnit::Tera => 1e12,
        }
    }

    /// Accepts `G`, `GB`, `Gbytes` and the other long/short spellings,
    /// case-insensitively. An empty suffix or a bare `bytes` means bytes.
    fn from_suffix(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        let stem = lower
            .strip_suffix("bytes")
            .or_else(|| lower.strip_suffix('b'))
            .unwrap_or(&lower);
        match stem {
            "" => Some(SizeUnit::Bytes),
            "k" => Some(SizeUnit::Kilo),
            "m" => Some(SizeUnit::Mega),
            "g" => Some(SizeUnit::Giga),
            "t" => Some(SizeUnit::Tera),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Size {
    number: String,
    unit: Option<SizeUnit>,
}

impl Size {
    /// Compact display form, e.g. `80.5G`.
    pub fn short(&self) -> String {
        match self.unit {
            Some(unit) => format!("{}{}", self.number, unit.suffix()),
            None => self.number.clone(),
        }
    }

    pub fn bytes(&self) -> f64 {
        let Some(unit) = self.unit else {
            return 0.0;
        };
        self.number.parse::<f64>().unwrap_or(0.0) * unit.multiplier()
    }
}

/// Returns `None` for an empty or whitespace-only string, which is how the
/// scheduler says "no usage data yet".
pub fn parse_size(input: &str) -> Option<Size> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let split = compact
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(compact.len());
    let (number, suffix) = compact.split_at(split);
    match SizeUnit::from_suffix(suffix) {
        Some(unit) => Some(Size {
            number: number.to_string(),
            unit: Some(unit),
        }),
        None => Some(Size {
            number: compact,
            unit: None,
        }),
    }
}

/// Drops the trailing ` L` marker LSF appends to limit-relative columns.
pub fn strip_limit_marker(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('L') {
        Some(rest) if rest.ends_with(char::is_whitespace) || rest.ends_with('%') => rest.trim_end(),
        _ => trimmed,
    }
}

/// `"0.29% L"` -> `0.29`. Anything unparseable is `0.0`.
pub fn parse_percent(raw: &str) -> f64 {
    strip_limit_marker(raw)
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .unwrap_or(0.0)
}
