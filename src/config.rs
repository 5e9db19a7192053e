use std::{
    env,
    fmt::Display,
    path::Path,
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use log::LevelFilter;
use shakmaty::Color;

use crate::{credentials::Credential, oracle::OracleSettings, reasoning::RetryPolicy};

pub const KEY_FILE: &str = "GEMINI_API_KEYS";
const KEY_VARS: [&str; 5] = [
    "GEMINI_API_KEY",
    "GEMINI_API_KEY_2",
    "GEMINI_API_KEY_3",
    "GEMINI_API_KEY_4",
    "GEMINI_API_KEY_5",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: Vec<Credential>,
    pub model: String,
    pub endpoint: String,
    pub engine_path: String,
    pub engine_depth: u8,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
    pub settings: OracleSettings,
    pub play_as: Color,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let workdir = env::current_dir()?;
        Config::from_lookup(|key| env::var(key).ok(), &workdir)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, workdir: &Path) -> Result<Config> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let turn_timeout_secs: u64 = parse_or(&get, "ORACLE_TURN_TIMEOUT_SECS", 120)?;
        let settings = OracleSettings {
            book_delay: Duration::from_millis(parse_or(&get, "ORACLE_BOOK_DELAY_MS", 800)?),
            turn_timeout: (turn_timeout_secs > 0).then(|| Duration::from_secs(turn_timeout_secs)),
            trip_on_malformed: parse_or(&get, "ORACLE_TRIP_ON_MALFORMED", true)?,
        };
        let retry = RetryPolicy {
            max_retries: parse_or(&get, "ORACLE_MAX_RETRIES", 3)?,
            base_delay: Duration::from_millis(parse_or(&get, "ORACLE_RETRY_BASE_MS", 1000)?),
            ..RetryPolicy::default()
        };

        Ok(Config {
            api_keys: read_keys(&get, &workdir.join(KEY_FILE))?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-3-flash-preview".to_string()),
            endpoint: get("GEMINI_ENDPOINT")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            engine_path: get("ORACLE_ENGINE_PATH").unwrap_or_else(|| "stockfish".to_string()),
            engine_depth: parse_or(&get, "ORACLE_ENGINE_DEPTH", crate::engine::SEARCH_DEPTH)?,
            min_interval: Duration::from_millis(parse_or(&get, "ORACLE_MIN_INTERVAL_MS", 4000)?),
            retry,
            settings,
            play_as: parse_color(get("ORACLE_PLAY_AS").as_deref().unwrap_or("black"))?,
            log_level: parse_or(&get, "ORACLE_LOG", LevelFilter::Info)?,
        })
    }
}

/// Keys come from the environment; the local key file is only read when no
/// variable is set.
fn read_keys(get: &impl Fn(&str) -> Option<String>, key_file: &Path) -> Result<Vec<Credential>> {
    let from_env: Vec<Credential> = KEY_VARS
        .iter()
        .filter_map(|var| get(*var))
        .map(|key| Credential::new(key.trim()))
        .collect();
    if !from_env.is_empty() || !key_file.exists() {
        return Ok(from_env);
    }

    let content = std::fs::read_to_string(key_file)
        .with_context(|| format!("reading {}", key_file.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Credential::new)
        .collect())
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse() {
            Ok(v) => Ok(v),
            Err(e) => bail!("invalid value {raw:?} for {key}: {e}"),
        },
    }
}

fn parse_color(raw: &str) -> Result<Color> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Ok(Color::White),
        "black" | "b" => Ok(Color::Black),
        other => bail!("invalid value {other:?} for ORACLE_PLAY_AS, expected white or black"),
    }
}
