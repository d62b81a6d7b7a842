// src/extractors/mod.rs
pub mod financial;
pub mod report;
pub mod statement;

// Re-export key extraction types for convenience
pub use financial::FinancialExtractor;
pub use report::OutputFormat;
pub use statement::FinancialStatement;
