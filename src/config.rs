use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use crate::error::{AppError, Result};

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";
pub const DEFAULT_USER_AGENT: &str = "WikipediaScraper/1.0 (Educational Project; contact@example.com)";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Pause between two keywords.
    pub request_delay: Duration,
    pub summary_excerpt_chars: usize,
    /// Fixed summary table name; a timestamped name is used when unset.
    pub summary_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            output_dir: PathBuf::from("output"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            request_delay: Duration::from_millis(1000),
            summary_excerpt_chars: 200,
            summary_file: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let base_url = match lookup("WIKI_BASE_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.base_url,
        };

        Ok(Config {
            base_url,
            output_dir: lookup("WIKI_OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            user_agent: lookup("WIKI_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(parse_var(&lookup, "WIKI_TIMEOUT_SECS", 10)?),
            connect_timeout: Duration::from_secs(parse_var(&lookup, "WIKI_CONNECT_TIMEOUT_SECS", 5)?),
            max_retries: parse_var(&lookup, "WIKI_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(parse_var(&lookup, "WIKI_RETRY_DELAY_MS", 500)?),
            request_delay: Duration::from_millis(parse_var(&lookup, "WIKI_REQUEST_DELAY_MS", 1000)?),
            summary_excerpt_chars: parse_var(&lookup, "WIKI_SUMMARY_EXCERPT_CHARS", defaults.summary_excerpt_chars)?,
            summary_file: lookup("WIKI_SUMMARY_FILE").filter(|name| !name.trim().is_empty()),
        })
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::ConfigError(format!("Invalid base url {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::ConfigError(format!("Base url {:?} cannot be used as a base", raw)));
    }
    Ok(url)
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}
