use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::{Image, InfoboxField, Link, Section, SummaryRow};
use crate::record::{Record, RecordError};

/// On-disk shape of one keyword's output file.
#[derive(Serialize)]
struct OutputUnit<'a> {
    keyword: &'a str,
    success: bool,
    resolved_title: Option<&'a str>,
    url: Option<&'a str>,
    fetched_at: Option<DateTime<Utc>>,
    summary: Option<&'a str>,
    infobox: &'a [InfoboxField],
    sections: &'a [Section],
    references: &'a [String],
    links: &'a [Link],
    images: &'a [Image],
    error: Option<&'a RecordError>,
}

impl<'a> OutputUnit<'a> {
    fn from_record(record: &'a Record) -> Self {
        let article = record.article();
        let extraction = record.extraction();
        OutputUnit {
            keyword: &record.keyword,
            success: record.success(),
            resolved_title: article.map(|a| a.title.as_str()),
            url: article.map(|a| a.url.as_str()),
            fetched_at: article.map(|a| a.fetched_at),
            summary: extraction.map(|e| e.summary.as_str()),
            infobox: extraction.map(|e| e.infobox.as_slice()).unwrap_or_default(),
            sections: extraction.map(|e| e.sections.as_slice()).unwrap_or_default(),
            references: extraction.map(|e| e.references.as_slice()).unwrap_or_default(),
            links: extraction.map(|e| e.links.as_slice()).unwrap_or_default(),
            images: extraction.map(|e| e.images.as_slice()).unwrap_or_default(),
            error: record.error(),
        }
    }
}

/// Writes one JSON file per keyword and collects the summary table.
///
/// Failed records are written too, so every keyword leaves a file behind.
/// `finalize` consumes the writer; the summary table is written once.
pub struct ArticleWriter {
    output_dir: PathBuf,
    summary_file: String,
    excerpt_chars: usize,
    used_slugs: HashSet<String>,
    rows: Vec<SummaryRow>,
}

impl ArticleWriter {
    /// Creates the output directory if needed.
    pub fn create(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.output_dir)?;
        let summary_file = config.summary_file.clone().unwrap_or_else(|| {
            format!("wikipedia_summary_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Ok(Self {
            output_dir: config.output_dir.clone(),
            summary_file,
            excerpt_chars: config.summary_excerpt_chars,
            used_slugs: HashSet::new(),
            rows: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn write_article(&mut self, record: &Record) -> Result<PathBuf> {
        let slug = self.claim_slug(&record.keyword);
        let path = self.output_dir.join(format!("{}.json", slug));

        let mut json = serde_json::to_string_pretty(&OutputUnit::from_record(record))?;
        json.push('\n');
        fs::write(&path, json)?;
        info!("Saved data for {:?} to {}", record.keyword, path.display());

        if let (Some(article), Some(extraction)) = (record.article(), record.extraction()) {
            self.rows
                .push(SummaryRow::new(&record.keyword, article, extraction, self.excerpt_chars));
        }
        Ok(path)
    }

    pub fn finalize(self) -> Result<PathBuf> {
        let path = self.output_dir.join(&self.summary_file);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(SummaryRow::HEADERS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Saved summary of {} articles to {}", self.rows.len(), path.display());
        Ok(path)
    }

    /// First free `slug`, `slug_2`, `slug_3`, ... for this run.
    fn claim_slug(&mut self, keyword: &str) -> String {
        let base = slugify(keyword);
        let mut candidate = base.clone();
        let mut index = 2;
        while self.used_slugs.contains(&candidate) {
            candidate = format!("{}_{}", base, index);
            index += 1;
        }
        self.used_slugs.insert(candidate.clone());
        candidate
    }
}

/// Longest slug in bytes; leaves room for a `_N` suffix and `.json`
/// under the usual 255-byte file name limit.
pub const MAX_SLUG_BYTES: usize = 200;

/// Lowercase, underscore-separated, filesystem-safe name for a keyword.
pub fn slugify(keyword: &str) -> String {
    let kept: String = keyword
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let mut slug = kept.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase();
    if slug.len() > MAX_SLUG_BYTES {
        let mut end = MAX_SLUG_BYTES;
        while !slug.is_char_boundary(end) {
            end -= 1;
        }
        slug.truncate(end);
        slug.truncate(slug.trim_end_matches('_').len());
    }
    if slug.is_empty() {
        "keyword".to_string()
    } else {
        slug
    }
}
