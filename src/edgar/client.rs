// src/edgar/client.rs
use crate::edgar::models::{CompanySubmission, DirectoryIndex, DirectoryItem, FilingIndex};
use crate::utils::error::EdgarError;
use crate::xbrl::filing::{is_filing_document, FilingDocuments, INSTANCE_SUFFIX};
use reqwest::header;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

// SEC requires a descriptive User-Agent; override with SEC_USER_AGENT.
const DEFAULT_USER_AGENT: &str = "xbrl_resolver/0.1 (contact: research@example.com)";
// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
const EDGAR_REQUEST_DELAY_MS: u64 = 150;

const TICKER_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";
const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";
const PARTIAL_SUFFIX: &str = ".part";

fn user_agent() -> String {
    std::env::var("SEC_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string())
}

/// Creates a reqwest client configured for EDGAR interaction.
fn build_edgar_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(Duration::from_secs(60))
        .build()
}

/// Maps non-2xx responses onto EdgarError.
fn check_status(status: reqwest::StatusCode, url: &str) -> Result<(), EdgarError> {
    if status.is_success() {
        return Ok(());
    }
    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Received {} - check User-Agent and rate limits.", status);
        return Err(EdgarError::RateLimited);
    }
    Err(EdgarError::Http(status))
}

/// Rate-limited GET, returning the raw response after a status check.
async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, EdgarError> {
    tokio::time::sleep(Duration::from_millis(EDGAR_REQUEST_DELAY_MS)).await;
    tracing::debug!("GET {}", url);
    let response = client
        .get(url)
        .header(header::ACCEPT, "application/json,application/xml,*/*")
        .send()
        .await?; // Propagates reqwest::Error as EdgarError::Network
    check_status(response.status(), url)?;
    Ok(response)
}

async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T, EdgarError> {
    let body = get(client, url).await?.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| EdgarError::Parse(format!("{} from {}", e, url)))
}

/// Gets the CIK (Central Index Key) for a ticker symbol, zero-padded to 10 digits.
pub async fn get_cik_from_ticker(ticker: &str) -> Result<String, EdgarError> {
    let client = build_edgar_client()?;
    let json: serde_json::Value = get_json(&client, TICKER_URL).await?;
    find_cik(&json, ticker)
}

fn find_cik(json: &serde_json::Value, ticker: &str) -> Result<String, EdgarError> {
    let companies = json
        .as_object()
        .ok_or_else(|| EdgarError::Parse("Invalid ticker JSON structure".to_string()))?;

    for company in companies.values() {
        let matches = company
            .get("ticker")
            .and_then(|t| t.as_str())
            .is_some_and(|t| t.eq_ignore_ascii_case(ticker));
        if matches {
            let cik_num = company
                .get("cik_str")
                .and_then(|c| c.as_u64())
                .ok_or_else(|| EdgarError::Parse("Invalid CIK format".to_string()))?;
            let cik = format!("{:010}", cik_num);
            tracing::info!("Found CIK {} for ticker {}", cik, ticker);
            return Ok(cik);
        }
    }

    Err(EdgarError::TickerNotFound(ticker.to_string()))
}

/// Fetches the company submission data for a given CIK
pub async fn get_company_submissions(cik: &str) -> Result<CompanySubmission, EdgarError> {
    let client = build_edgar_client()?;
    let url = format!("{}/CIK{}.json", SUBMISSIONS_URL, cik);
    get_json(&client, &url).await
}

/// Keeps the five resolver document kinds from a directory listing.
fn select_filing_files(items: &[DirectoryItem], base_url: &str) -> BTreeMap<String, String> {
    items
        .iter()
        .filter(|item| is_filing_document(&item.name))
        .map(|item| (item.name.clone(), format!("{}{}", base_url, item.name)))
        .collect()
}

/// Finds the newest filing (optionally within `year`) whose directory holds an XBRL
/// instance document. Filings whose index cannot be fetched are skipped.
pub async fn find_xbrl_filing(cik: &str, year: Option<u32>) -> Result<FilingIndex, EdgarError> {
    let submissions = get_company_submissions(cik).await?;
    tracing::info!("Searching filings of {} (CIK {})", submissions.name, cik);

    let client = build_edgar_client()?;
    for row in submissions.filings.recent.rows(year) {
        let base_url = row.base_url(ARCHIVES_URL, cik);
        let index_url = format!("{}index.json", base_url);

        let index: DirectoryIndex = match get_json(&client, &index_url).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", index_url, e);
                continue;
            }
        };

        let files = select_filing_files(&index.directory.item, &base_url);
        if files.keys().any(|name| name.ends_with(INSTANCE_SUFFIX)) {
            tracing::info!(
                "Using {} filing {} from {} ({} documents)",
                row.form_type,
                row.accession_number,
                row.filing_date,
                files.len()
            );
            return Ok(FilingIndex {
                accession_number: row.accession_number,
                filing_date: row.filing_date,
                files,
            });
        }
    }

    Err(EdgarError::FilingNotFound(cik.to_string()))
}

/// Downloads every document of the filing into `cache_dir`, reusing files already there.
/// A failed download is logged and the document is left out.
pub async fn download_documents(index: &FilingIndex, cache_dir: &Path) -> Result<FilingDocuments, EdgarError> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let client = build_edgar_client()?;

    let mut paths = Vec::new();
    for (name, url) in &index.files {
        let path = cache_dir.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!("Already cached: {}", path.display());
            paths.push(path);
            continue;
        }

        let bytes = match get(&client, url).await {
            Ok(response) => response.bytes().await,
            Err(e) => {
                tracing::warn!("Error downloading {}: {}", name, e);
                continue;
            }
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Error reading body of {}: {}", name, e);
                continue;
            }
        };
        if let Err(e) = write_cached(&path, &bytes).await {
            tracing::warn!("Error caching {}: {}", name, e);
            continue;
        }
        tracing::info!("Downloaded {} ({} bytes)", name, bytes.len());
        paths.push(path);
    }

    Ok(FilingDocuments::from_paths(paths))
}

/// `<path>.part`, where a download lives until it is complete.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Writes and syncs `<path>.part`, then renames it into place. Only complete documents
/// ever appear under their final name.
async fn write_cached(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(path);
    let result = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&partial, path).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbrl::filing::LinkbaseKind;

    #[test]
    fn finds_cik_case_insensitively() {
        let json = serde_json::json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 1326801, "ticker": "META", "title": "Meta Platforms, Inc."}
        });
        assert_eq!(find_cik(&json, "meta").unwrap(), "0001326801");
        assert!(matches!(find_cik(&json, "NOPE"), Err(EdgarError::TickerNotFound(_))));
    }

    #[test]
    fn selects_only_resolver_documents() {
        let items: Vec<DirectoryItem> = ["meta-20231231_htm.xml", "meta-20231231_lab.xml", "meta-20231231.xsd", "R2.htm"]
            .iter()
            .map(|n| DirectoryItem { name: n.to_string() })
            .collect();
        let files = select_filing_files(&items, "https://host/dir/");
        assert_eq!(files.len(), 2);
        assert_eq!(files["meta-20231231_lab.xml"], "https://host/dir/meta-20231231_lab.xml");
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(reqwest::StatusCode::OK, "u").is_ok());
        assert!(matches!(
            check_status(reqwest::StatusCode::FORBIDDEN, "u"),
            Err(EdgarError::RateLimited)
        ));
        assert!(matches!(
            check_status(reqwest::StatusCode::NOT_FOUND, "u"),
            Err(EdgarError::Http(_))
        ));
    }

    #[test]
    fn cached_documents_are_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meta_htm.xml"), "<xbrl/>").unwrap();
        std::fs::write(dir.path().join("meta_cal.xml"), "<linkbase/>").unwrap();

        let index = FilingIndex {
            accession_number: "0001326801-24-000012".into(),
            filing_date: "2024-02-02".into(),
            files: [
                ("meta_htm.xml".to_string(), "http://invalid.invalid/meta_htm.xml".to_string()),
                ("meta_cal.xml".to_string(), "http://invalid.invalid/meta_cal.xml".to_string()),
            ]
            .into_iter()
            .collect(),
        };

        let documents = tokio_test::block_on(download_documents(&index, dir.path())).unwrap();
        assert_eq!(documents.instance, Some(dir.path().join("meta_htm.xml")));
        assert!(documents.linkbase(LinkbaseKind::Calculation).is_some());
    }

    #[test]
    fn leftover_partial_download_is_not_a_cached_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meta_htm.xml.part"), "<xbrli:xbrl><xbrli:cont").unwrap();

        let index = FilingIndex {
            accession_number: "0001326801-24-000012".into(),
            filing_date: "2024-02-02".into(),
            // Nothing listens here, so the download fails.
            files: [("meta_htm.xml".to_string(), "http://127.0.0.1:9/meta_htm.xml".to_string())]
                .into_iter()
                .collect(),
        };

        let documents = tokio_test::block_on(download_documents(&index, dir.path())).unwrap();
        assert_eq!(documents.instance, None);
        assert!(!dir.path().join("meta_htm.xml").exists());
        assert_eq!(FilingDocuments::from_dir(dir.path()).unwrap().instance, None);
    }

    #[test]
    fn cached_write_replaces_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta_lab.xml");
        std::fs::write(partial_path(&path), "<link:linkbase").unwrap();

        tokio_test::block_on(write_cached(&path, b"<linkbase/>")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<linkbase/>");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn failed_cached_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("meta_lab.xml");

        assert!(tokio_test::block_on(write_cached(&path, b"<linkbase/>")).is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
