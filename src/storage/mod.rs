// src/storage/mod.rs
use crate::extractors::statement::FinancialStatement;
use crate::extractors::OutputFormat;
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

/// Output rendered for one ticker, plus what is needed to describe it.
#[derive(Debug)]
pub struct TableSnapshot<'a> {
    pub ticker: &'a str,
    pub format: OutputFormat,
    pub min_year: i32,
    pub json: &'a str,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    // Directory structure like: /base_dir/TICKER/
    fn ticker_dir(&self, ticker: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(ticker.to_uppercase());
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    /// Saves a fetched statement as pretty JSON, e.g. `AAPL/income_statement.json`.
    pub fn save_statement(
        &self,
        ticker: &str,
        name: &str,
        statement: &FinancialStatement,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.ticker_dir(ticker)?.join(format!("{}.json", name));

        let content = serde_json::to_string_pretty(statement)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, content).map_err(StorageError::IoError)?;

        tracing::info!("Saved {} to {}", name, file_path.display());
        Ok(file_path)
    }

    /// Saves the rendered output document
    pub fn save_table(&self, snapshot: &TableSnapshot<'_>) -> Result<PathBuf, StorageError> {
        let file_path = self
            .ticker_dir(snapshot.ticker)?
            .join(format!("{}_financials.json", snapshot.ticker.to_uppercase()));

        fs::write(&file_path, snapshot.json).map_err(StorageError::IoError)?;

        tracing::info!("Saved table to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the rendered table in JSON format
    pub fn save_table_metadata(&self, snapshot: &TableSnapshot<'_>) -> Result<PathBuf, StorageError> {
        let file_path = self
            .ticker_dir(snapshot.ticker)?
            .join(format!("{}_financials_meta.json", snapshot.ticker.to_uppercase()));

        let metadata = serde_json::json!({
            "ticker": snapshot.ticker,
            "format": snapshot.format.as_str(),
            "min_year": snapshot.min_year,
            "content_length": snapshot.json.len(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}
