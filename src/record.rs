use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::models::{ArticleReference, ExtractionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        article: ArticleReference,
        extraction: ExtractionResult,
    },
    Failure {
        /// Known when the page was fetched but could not be parsed.
        article: Option<ArticleReference>,
        error: RecordError,
    },
}

/// The result of processing one keyword.
#[derive(Debug, Clone)]
pub struct Record {
    pub keyword: String,
    pub outcome: Outcome,
}

/// Why a keyword failed, with whatever was resolved before the failure.
#[derive(Debug)]
pub struct KeywordFailure {
    pub article: Option<ArticleReference>,
    pub error: AppError,
}

impl From<AppError> for KeywordFailure {
    fn from(error: AppError) -> Self {
        KeywordFailure { article: None, error }
    }
}

impl Record {
    pub fn build(
        keyword: &str,
        outcome: std::result::Result<(ArticleReference, ExtractionResult), KeywordFailure>,
    ) -> Self {
        let outcome = match outcome {
            Ok((article, extraction)) => Outcome::Success { article, extraction },
            Err(KeywordFailure { article, error }) => Outcome::Failure {
                article,
                error: RecordError::new(keyword, &error),
            },
        };
        Record {
            keyword: keyword.to_string(),
            outcome,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn article(&self) -> Option<&ArticleReference> {
        match &self.outcome {
            Outcome::Success { article, .. } => Some(article),
            Outcome::Failure { article, .. } => article.as_ref(),
        }
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        match &self.outcome {
            Outcome::Success { extraction, .. } => Some(extraction),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RecordError> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }
}

impl RecordError {
    pub fn new(keyword: &str, error: &AppError) -> Self {
        let kind = error.kind();
        RecordError {
            kind,
            message: format!("{} for keyword {:?}: {}", kind, keyword, error),
        }
    }
}
