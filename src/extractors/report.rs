// src/extractors/report.rs
use crate::extractors::financial::{FinancialExtractor, FinancialRow, FinancialTable};
use crate::extractors::statement::FinancialStatement;
use crate::utils::error::ExtractError;
use clap::ValueEnum;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Shape of the JSON document written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `{"2023": {"Revenue": ..., "EBIT": ..., ...}, ...}`
    #[default]
    Table,
    /// Flat `{"revenue23": "383.3", "netProfit23": ..., ...}` in billions.
    History,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::History => "history",
        }
    }
}

/// Flattened per-year view used by the dashboard history panel. Oldest year first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    entries: Vec<(String, String)>,
}

impl HistoryView {
    pub fn from_table(table: &FinancialTable) -> Self {
        let mut entries = Vec::with_capacity(table.len() * 5);
        let mut rows: Vec<_> = table.iter().collect();
        rows.reverse();
        for (year, row) in rows {
            let suffix = year_suffix(year);
            entries.extend(history_fields(row).map(|(name, value)| (format!("{}{}", name, suffix), value)));
        }
        Self { entries }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for HistoryView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn year_suffix(year: i32) -> String {
    let year = year.to_string();
    year.get(2..).unwrap_or(&year).to_string()
}

fn history_fields(row: &FinancialRow) -> impl Iterator<Item = (&'static str, String)> {
    [
        ("revenue", billions(row.revenue)),
        ("ebit", billions(row.ebit)),
        ("netProfit", billions(row.net_profit)),
        ("ebitda", billions(row.ebitda)),
        ("roi", row.roi.to_string()),
    ]
    .into_iter()
}

/// Millions to billions, one decimal, halves rounded up. Whole numbers keep a
/// trailing ".0".
fn billions(millions: f64) -> String {
    if !millions.is_finite() {
        return "N/A".to_string();
    }
    let rounded = (millions / 1000.0 * 10.0 + 0.5).floor() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// `{"error": "<message>"}`
pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ExtractError> {
    serde_json::to_string(value).map_err(|e| ExtractError::Serialization(e.to_string()))
}

/// Renders an extraction outcome. Failures become the error payload rather
/// than propagating.
pub fn render(ticker: &str, outcome: &Result<FinancialTable, ExtractError>, format: OutputFormat) -> String {
    let rendered = outcome.as_ref().map_err(|e| e.to_string()).and_then(|table| {
        match format {
            OutputFormat::Table => to_json(table),
            OutputFormat::History => to_json(&HistoryView::from_table(table)),
        }
        .map_err(|e| e.to_string())
    });

    match rendered {
        Ok(json) => {
            if outcome.as_ref().is_ok_and(FinancialTable::is_empty) {
                tracing::warn!("No fiscal years retained for {}", ticker);
            }
            json
        }
        Err(message) => {
            tracing::error!("Error creating financial table for {}: {}", ticker, message);
            error_payload(&message)
        }
    }
}

impl FinancialExtractor {
    /// Builds the table and encodes it in `format`; never fails.
    pub fn build_table_json(
        &self,
        ticker: &str,
        income: Option<&FinancialStatement>,
        balance: Option<&FinancialStatement>,
        format: OutputFormat,
    ) -> String {
        render(ticker, &self.build_table(income, balance), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_income() -> FinancialStatement {
        FinancialStatement::new()
            .with_row("Total Revenue", [("2022-12-31", 394_328e6), ("2023-12-31", 383_285e6)])
            .with_row("Net Income", [("2022-12-31", 99_803e6), ("2023-12-31", 96_995e6)])
    }

    #[test]
    fn table_json_for_missing_balance_sheet() {
        let income = FinancialStatement::new()
            .with_row("Total Revenue", [("2020-12-31", 1e9), ("2022-12-31", 2e9)])
            .with_row("Operating Income", [("2020-12-31", 1e8), ("2022-12-31", 3e8)]);
        let json = FinancialExtractor::new().build_table_json("TST", Some(&income), None, OutputFormat::Table);
        assert_eq!(
            json,
            r#"{"2022":{"Revenue":2000.0,"EBIT":300.0,"Net Profit":null,"EBITDA":null,"ROI":"N/A"}}"#
        );
    }

    #[test]
    fn malformed_input_yields_error_payload_only() {
        let income = FinancialStatement::new()
            .with_row("Total Revenue", [("2023-12-31", 1e9), ("not-a-date", 2e9)]);
        let json = FinancialExtractor::new().build_table_json("TST", Some(&income), None, OutputFormat::Table);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["error"].as_str().unwrap().contains("not-a-date"));
    }

    #[test]
    fn history_view_flattens_years_in_billions() {
        let balance = FinancialStatement::new()
            .with_row("Total Assets", [("2023-12-31", 400_000e6)]);
        let table = FinancialExtractor::new()
            .build_table(Some(&sample_income()), Some(&balance))
            .unwrap();
        let history = HistoryView::from_table(&table);

        assert_eq!(history.len(), 10);
        assert_eq!(history.get("revenue23"), Some("383.3"));
        assert_eq!(history.get("revenue22"), Some("394.3"));
        assert_eq!(history.get("netProfit23"), Some("97.0"));
        assert_eq!(history.get("ebit23"), Some("N/A"));
        assert_eq!(history.get("roi23"), Some("24.25%"));
        assert_eq!(history.get("roi22"), Some("N/A"));

        let json = serde_json::to_string(&history).unwrap();
        assert!(json.starts_with(r#"{"revenue22":"394.3","ebit22":"N/A","netProfit22":"99.8""#));
        assert!(json.find("revenue22").unwrap() < json.find("revenue23").unwrap());
    }

    #[test]
    fn build_table_json_honours_history_format() {
        let json = FinancialExtractor::new()
            .build_table_json("TST", Some(&sample_income()), None, OutputFormat::History);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["revenue23"], "383.3");
        assert_eq!(value["roi22"], "N/A");
        assert!(value.get("2023").is_none());
    }

    #[test]
    fn duplicate_fiscal_year_yields_error_payload() {
        let income = FinancialStatement::new()
            .with_row("Total Revenue", [("2023-01-31", 1e6), ("2023-12-31", 2e6)]);
        let json = FinancialExtractor::new().build_table_json("TST", Some(&income), None, OutputFormat::Table);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["error"].as_str().unwrap().contains("2023"));
    }

    #[test]
    fn render_history_passes_errors_through() {
        let outcome = Err(ExtractError::MalformedPeriod("x".into()));
        let json = render("TST", &outcome, OutputFormat::History);
        assert_eq!(json, error_payload(&outcome.unwrap_err().to_string()));
    }

    #[test]
    fn billions_rounding() {
        assert_eq!(billions(2000.0), "2.0");
        assert_eq!(billions(2250.0), "2.3");
        assert_eq!(billions(-1250.0), "-1.2");
        assert_eq!(billions(-1260.0), "-1.3");
        assert_eq!(billions(f64::NAN), "N/A");
    }
}
