//! Price file ingestion.
//!
//! Reads every `SYMBOL_values.csv` file of a directory, parses it line by
//! line and stores each file as one batch. Failures are contained per file:
//! a single bad line discards the whole file, the other files go on.

use crate::application::analytics::registry::SymbolRegistry;
use crate::domain::errors::IngestionError;
use crate::domain::price::{PricePoint, price_csv_reader};
use crate::domain::repositories::PriceRepository;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

/// Lines starting with this token are headers and are skipped
pub const HEADER_TOKEN: &str = "timestamp";

/// Required file name ending, preceded by at least one character
pub const PRICE_FILE_SUFFIX: &str = "_values.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub file_name: String,
    pub error: IngestionError,
}

/// Outcome of one `ingest` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub files_ingested: usize,
    pub records_stored: usize,
    pub rejected: Vec<RejectedFile>,
    /// Set when the directory itself could not be used; nothing was ingested
    pub directory_error: Option<IngestionError>,
}

impl IngestionReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.directory_error.is_none()
    }
}

pub fn is_price_file_name(file_name: &str) -> bool {
    file_name
        .strip_suffix(PRICE_FILE_SUFFIX)
        .is_some_and(|symbol| !symbol.is_empty())
}

/// Parse the content of one price file, skipping header and blank lines.
///
/// The first malformed record fails the whole content.
pub fn parse_price_records(content: &str) -> Result<Vec<PricePoint>, IngestionError> {
    let mut reader = price_csv_reader(content.as_bytes());
    let mut prices = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e
                .position()
                .map(|p| format!("line {}", p.line()))
                .unwrap_or_default();
            IngestionError::format(&line, e.to_string())
        })?;
        if record.get(0).is_some_and(|first| first.starts_with(HEADER_TOKEN)) {
            continue;
        }
        prices.push(PricePoint::from_record(&record)?);
    }
    Ok(prices)
}

pub struct PriceFileIngestor {
    repository: Arc<dyn PriceRepository>,
    registry: Arc<SymbolRegistry>,
}

impl PriceFileIngestor {
    pub fn new(repository: Arc<dyn PriceRepository>, registry: Arc<SymbolRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// Ingest every file of `dir`, in file name order.
    ///
    /// Never fails: directory problems abort the call and are reported in
    /// `directory_error`, file problems are reported in `rejected`.
    pub async fn ingest(&self, dir: &Path) -> IngestionReport {
        let mut report = IngestionReport::default();

        let files = match list_price_dir(dir).await {
            Ok(files) => files,
            Err(e) => {
                error!("PriceFileIngestor: {}", e);
                report.directory_error = Some(e);
                return report;
            }
        };

        if files.is_empty() {
            warn!("PriceFileIngestor: No price file found in {}", dir.display());
        }

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match self.ingest_file(&path, &file_name).await {
                Ok(stored) => {
                    if stored > 0 {
                        report.files_ingested += 1;
                        report.records_stored += stored;
                    }
                }
                Err(e) => {
                    error!("PriceFileIngestor: Error when reading file {}: {}", file_name, e);
                    report.rejected.push(RejectedFile {
                        file_name,
                        error: e,
                    });
                }
            }
        }

        info!(
            "PriceFileIngestor: Ingested {} records from {} files in {} ({} rejected)",
            report.records_stored,
            report.files_ingested,
            dir.display(),
            report.rejected.len()
        );
        report
    }

    async fn ingest_file(&self, path: &Path, file_name: &str) -> Result<usize, IngestionError> {
        let missing = || IngestionError::EmptyOrMissingFile {
            file_name: file_name.to_string(),
        };

        let metadata = fs::metadata(path).await.map_err(|_| missing())?;
        if !metadata.is_file() || metadata.len() == 0 {
            return Err(missing());
        }

        if !is_price_file_name(file_name) {
            return Err(IngestionError::Naming {
                file_name: file_name.to_string(),
            });
        }

        let content = fs::read_to_string(path).await.map_err(|_| missing())?;
        let prices = parse_price_records(&content)?;
        if prices.is_empty() {
            return Ok(0);
        }

        self.repository
            .save_batch(&prices)
            .await
            .map_err(|e| IngestionError::Storage {
                file_name: file_name.to_string(),
                reason: e.to_string(),
            })?;

        let symbols: BTreeSet<&str> = prices.iter().map(|p| p.symbol.as_str()).collect();
        for symbol in symbols {
            if self.registry.register(symbol) {
                info!("PriceFileIngestor: New symbol {} from {}", symbol, file_name);
            }
        }

        Ok(prices.len())
    }
}

async fn list_price_dir(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    let directory_error = |reason: String| IngestionError::Directory {
        path: dir.display().to_string(),
        reason,
    };

    let metadata = fs::metadata(dir)
        .await
        .map_err(|_| directory_error("path doesn't exist".to_string()))?;
    if !metadata.is_dir() {
        return Err(directory_error("path is not a directory".to_string()));
    }

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| directory_error(format!("cannot list directory: {}", e)))?;

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => files.push(entry.path()),
            Ok(None) => break,
            Err(e) => return Err(directory_error(format!("cannot list directory: {}", e))),
        }
    }
    files.sort();
    Ok(files)
}
