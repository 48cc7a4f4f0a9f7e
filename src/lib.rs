pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod record;
pub mod writer;

pub use config::Config;
pub use error::{AppError, ErrorKind, Result};
pub use extractor::Extractor;
pub use fetcher::{ArticleSource, WikipediaClient};
pub use models::{ArticleReference, ExtractionResult, FetchedPage, SummaryRow};
pub use pipeline::{Pipeline, RunReport};
pub use record::Record;
pub use writer::ArticleWriter;
