// src/edgar/models.rs
#![allow(non_snake_case)]
use serde::Deserialize;
use std::collections::BTreeMap;

/// The parts of the EDGAR company submission index used to locate a filing.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented: entry `i` of every vector describes the same filing.
#[derive(Debug, Deserialize)]
pub struct FilingsList {
    pub accessionNumber: Vec<String>,
    pub filingDate: Vec<String>,
    pub form: Vec<String>,
}

/// A filing directory's `index.json`.
#[derive(Debug, Deserialize)]
pub struct DirectoryIndex {
    pub directory: Directory,
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub item: Vec<DirectoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryItem {
    pub name: String,
}

/// One recent filing, row-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingRef {
    pub accession_number: String,
    pub filing_date: String,
    pub form_type: String,
}

impl FilingRef {
    /// Archive directory of this filing, e.g. `.../edgar/data/1326801/000132680124000012/`.
    pub fn base_url(&self, archive_base: &str, cik: &str) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        // The archive path uses the CIK without leading zeros.
        let cik = cik.trim_start_matches('0');
        format!("{}/{}/{}/", archive_base.trim_end_matches('/'), cik, acc_no_dashes)
    }
}

impl FilingsList {
    /// Rows sorted newest first, optionally restricted to one filing year.
    pub fn rows(&self, year: Option<u32>) -> Vec<FilingRef> {
        let mut rows: Vec<FilingRef> = self
            .accessionNumber
            .iter()
            .zip(&self.filingDate)
            .zip(&self.form)
            .map(|((acc, date), form)| FilingRef {
                accession_number: acc.clone(),
                filing_date: date.clone(),
                form_type: form.clone(),
            })
            .filter(|row| match year {
                Some(y) => row.filing_date.starts_with(&y.to_string()),
                None => true,
            })
            .collect();
        // ISO dates sort lexically
        rows.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
        rows
    }
}

/// The resolver-relevant documents of one filing: file name -> download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingIndex {
    pub accession_number: String,
    pub filing_date: String,
    pub files: BTreeMap<String, String>,
}
