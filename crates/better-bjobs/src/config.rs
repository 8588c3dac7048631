use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_REFRESH_MS: u64 = 500;
const MIN_REFRESH_MS: u64 = 100;
const STORE_DIR_NAME: &str = "better-bjobs";

#[derive(Clone, Debug)]
pub struct Config {
    pub project: Option<String>,
    pub store_path: PathBuf,
    pub refresh: Duration,
    pub mail_to: String,
    pub snapshot_file: Option<PathBuf>,
    pub log_stdout: bool,
}

pub fn load_config(project: Option<String>) -> Config {
    let store_path = resolve_store_dir().join(store_file_name(project.as_deref()));
    Config {
        project,
        store_path,
        refresh: refresh_interval(env_value("BETTER_BJOBS_REFRESH_MS").as_deref()),
        mail_to: resolve_mail_to(),
        snapshot_file: env_value("BETTER_BJOBS_SNAPSHOT_FILE").map(PathBuf::from),
        log_stdout: env_value("BETTER_BJOBS_LOG_STDOUT")
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(false),
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn resolve_store_dir() -> PathBuf {
    if let Some(dir) = env_value("BETTER_BJOBS_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join(STORE_DIR_NAME);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(STORE_DIR_NAME)
}

fn resolve_mail_to() -> String {
    env_value("BETTER_BJOBS_MAIL_TO")
        .or_else(|| env_value("USER"))
        .unwrap_or_else(|| "root".to_string())
}

/// Each project scope gets its own cache file so views don't leak into each other.
pub fn store_file_name(project: Option<&str>) -> String {
    match project {
        None => "savedDatabase.json".to_string(),
        Some(name) => {
            let safe: String = name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("savedDatabase-{safe}.json")
        }
    }
}

fn refresh_interval(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_REFRESH_MS)
        .max(MIN_REFRESH_MS);
    Duration::from_millis(millis)
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
