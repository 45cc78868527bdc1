// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Could not find CIK for ticker {0}")]
    TickerNotFound(String),

    #[error("No filing with an XBRL instance document found for CIK {0}")]
    FilingNotFound(String),

    #[error("I/O error while caching documents: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

/// Failures that abort a resolution run. Only the instance document can cause one.
#[derive(Error, Debug)]
pub enum XbrlError {
    #[error("Filing has no instance document")]
    MissingInstance,

    #[error("Could not read instance document {path}: {source}")]
    ReadInstance {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed instance document: {0}")]
    MalformedInstance(#[from] roxmltree::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Resolution failed: {0}")]
    Xbrl(#[from] XbrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A linkbase that could not be loaded. Always recoverable: the run continues without it.
#[derive(Error, Debug)]
pub enum LinkbaseError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Malformed(#[from] roxmltree::Error),
}
