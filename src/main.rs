use clap::Parser;
use rust_wiki_scrapper::{
    cli::Cli,
    logging::init_logging,
    ArticleWriter, Config, Extractor, Pipeline, WikipediaClient,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    // Load configuration
    let config = cli.apply(Config::load()?)?;
    info!("Writing output to {}", config.output_dir.display());

    let client = WikipediaClient::new(&config)?;
    let writer = ArticleWriter::create(&config)?;
    let extractor = Extractor::new(config.base_url.clone());

    let report = Pipeline::new(client, extractor, writer, config.request_delay)
        .run(&cli.keywords)
        .await?;

    println!("Scraped {} articles successfully!", report.succeeded);
    for failed in &report.failed {
        println!("Failed: {}", failed);
    }
    println!("Summary written to {}", report.summary_path.display());

    Ok(())
}
