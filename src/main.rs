// src/main.rs
mod edgar;
mod storage;
mod utils;
mod xbrl;

use std::path::{Path, PathBuf};

use clap::Parser;
use storage::RecordWriter;
use utils::AppError;
use xbrl::filing::FilingDocuments;

/// Resolve an SEC XBRL filing's linkbases and instance document into one record set
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbol of the company (fetches the filing from EDGAR)
    #[arg(short, long, required_unless_present = "input_dir")]
    ticker: Option<String>,

    /// Only consider filings made in this year (optional)
    #[arg(short, long)]
    year: Option<u32>,

    /// Resolve documents already on disk instead of fetching (skips all network access)
    #[arg(short, long, conflicts_with = "ticker")]
    input_dir: Option<PathBuf>,

    /// Where downloaded filing documents are cached
    #[arg(long, default_value = "./filings")]
    cache_dir: PathBuf,

    /// Output directory for the resolved record set
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Debug-level logging for this crate (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);
    tracing::info!("Starting processing for args: {:?}", args);

    // 1. Locate the filing documents on disk, downloading them first if needed
    let (documents, label, output_dir) = match (&args.input_dir, &args.ticker) {
        (Some(dir), _) => {
            let label = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "local".to_string());
            (FilingDocuments::from_dir(dir)?, label, args.output_dir.clone())
        }
        (None, Some(ticker)) => fetch_filing(ticker, args.year, &args.cache_dir, &args.output_dir).await?,
        (None, None) => {
            return Err(AppError::Config("either --ticker or --input-dir is required".to_string()));
        }
    };

    // 2. Resolve. Only a missing or malformed instance document stops here.
    let resolved = xbrl::resolve_filing(&documents)?;

    // 3. Export
    let writer = RecordWriter::new(&output_dir)?;
    let written = writer.write_all(&resolved, &label)?;

    if resolved.summary.unmapped_facts > 0 {
        tracing::info!(
            "{} facts had no matching concept; see {}",
            resolved.summary.unmapped_facts,
            output_dir.join(storage::FACTS_FILE).display()
        );
    }
    tracing::info!("Processing finished. {} files written to {}", written.len(), output_dir.display());

    Ok(())
}

/// Looks up the ticker's newest XBRL filing and caches its documents under
/// `cache_dir/TICKER/ACCESSION/`. Output goes to `output_dir/TICKER/ACCESSION/`.
async fn fetch_filing(
    ticker: &str,
    year: Option<u32>,
    cache_dir: &Path,
    output_dir: &Path,
) -> Result<(FilingDocuments, String, PathBuf), AppError> {
    tracing::info!("Finding XBRL filings for ticker: {}", ticker);
    let cik = edgar::client::get_cik_from_ticker(ticker).await?;
    let index = edgar::client::find_xbrl_filing(&cik, year).await?;

    let ticker_dir = ticker.to_uppercase();
    let filing_dir = Path::new(&ticker_dir).join(&index.accession_number);
    let documents = edgar::client::download_documents(&index, &cache_dir.join(&filing_dir)).await?;

    let label = format!("{} {} ({})", ticker_dir, index.accession_number, index.filing_date);
    Ok((documents, label, output_dir.join(filing_dir)))
}
