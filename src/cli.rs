use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{parse_base_url, Config};
use crate::error::Result;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Scrape Wikipedia articles based on keywords", long_about = None)]
pub struct Cli {
    /// Keywords to search for
    #[arg(long, num_args = 0..)]
    pub keywords: Vec<String>,

    /// Output directory for scraped data
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Site to scrape (e.g. https://de.wikipedia.org)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Extra attempts for failed requests
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between keywords in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// File name of the summary table inside the output directory
    #[arg(long)]
    pub summary_file: Option<String>,

    /// Also append log output to this file (e.g. wikipedia_scraper.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = parse_base_url(base_url)?;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.request_delay = Duration::from_millis(delay_ms);
        }
        if let Some(summary_file) = &self.summary_file {
            config.summary_file = Some(summary_file.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_multiple_keywords() {
        let cli = Cli::try_parse_from(["wiki-scrapper", "--keywords", "Rust", "Python (programming language)", "--output", "out"]).unwrap();
        assert_eq!(cli.keywords, vec!["Rust", "Python (programming language)"]);
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_parses_log_file() {
        let cli = Cli::try_parse_from(["wiki-scrapper", "--log-file", "wikipedia_scraper.log", "-v"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("wikipedia_scraper.log")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_no_keywords_is_allowed() {
        let cli = Cli::try_parse_from(["wiki-scrapper"]).unwrap();
        assert!(cli.keywords.is_empty());
        let cli = Cli::try_parse_from(["wiki-scrapper", "--keywords"]).unwrap();
        assert!(cli.keywords.is_empty());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from([
            "wiki-scrapper", "--retries", "0", "--delay-ms", "0", "--timeout", "3",
            "--base-url", "https://fr.wikipedia.org", "--summary-file", "run.csv",
        ])
        .unwrap();
        let config = cli.apply(Config::default()).unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.base_url.host_str(), Some("fr.wikipedia.org"));
        assert_eq!(config.summary_file.as_deref(), Some("run.csv"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_apply_rejects_bad_base_url() {
        let cli = Cli::try_parse_from(["wiki-scrapper", "--base-url", "nope"]).unwrap();
        assert!(cli.apply(Config::default()).is_err());
    }
}
