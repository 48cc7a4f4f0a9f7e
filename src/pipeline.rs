use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, Result};
use crate::extractor::Extractor;
use crate::fetcher::ArticleSource;
use crate::models::{ArticleReference, ExtractionResult};
use crate::record::{KeywordFailure, Record, RecordError};
use crate::writer::ArticleWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedKeyword {
    pub keyword: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for FailedKeyword {
    /// The message already names the kind and the keyword.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: Vec<FailedKeyword>,
    /// One per keyword whose output file could be written.
    pub outputs: Vec<PathBuf>,
    pub summary_path: PathBuf,
}

/// Runs fetch, extract, build and write for each keyword in turn.
pub struct Pipeline<S> {
    source: S,
    extractor: Extractor,
    writer: ArticleWriter,
    request_delay: Duration,
}

impl<S: ArticleSource> Pipeline<S> {
    pub fn new(source: S, extractor: Extractor, writer: ArticleWriter, request_delay: Duration) -> Self {
        Self {
            source,
            extractor,
            writer,
            request_delay,
        }
    }

    /// Only a failure to write the summary table escapes; per-keyword
    /// failures end up in the report and in that keyword's output file.
    pub async fn run(mut self, keywords: &[String]) -> Result<RunReport> {
        let mut succeeded = 0;
        let mut failed = Vec::new();
        let mut outputs = Vec::new();

        for (index, keyword) in keywords.iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            info!("Processing keyword {}/{}: {:?}", index + 1, keywords.len(), keyword);

            let record = Record::build(keyword, self.process(keyword).await);
            if let Some(err) = record.error() {
                warn!("{}", err.message);
            }

            match self.writer.write_article(&record) {
                Ok(path) => {
                    outputs.push(path);
                    match record.error() {
                        None => succeeded += 1,
                        Some(err) => failed.push(failure(keyword, err)),
                    }
                }
                Err(e) => {
                    let err = RecordError::new(keyword, &e);
                    error!("Failed to save output: {}", err.message);
                    failed.push(failure(keyword, &err));
                }
            }
        }

        let summary_path = self.writer.finalize()?;
        info!("Run finished: {} succeeded, {} failed", succeeded, failed.len());

        Ok(RunReport {
            succeeded,
            failed,
            outputs,
            summary_path,
        })
    }

    async fn process(&self, keyword: &str) -> std::result::Result<(ArticleReference, ExtractionResult), KeywordFailure> {
        let page = self.source.fetch(keyword).await?;
        match self.extractor.extract(&page.markup) {
            Ok(extraction) => Ok((page.article, extraction)),
            Err(error) => Err(KeywordFailure {
                article: Some(page.article),
                error,
            }),
        }
    }
}

fn failure(keyword: &str, err: &RecordError) -> FailedKeyword {
    FailedKeyword {
        keyword: keyword.to_string(),
        kind: err.kind,
        message: err.message.clone(),
    }
}
