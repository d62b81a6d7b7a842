// src/provider/models.rs
#![allow(dead_code)]
use crate::extractors::statement::{FinancialStatement, RawValue};
use crate::utils::error::ProviderError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Prefix Yahoo puts on annual series names, e.g. `annualTotalRevenue`.
pub const ANNUAL_PREFIX: &str = "annual";

// "TotalRevenue" -> "Total Revenue", "EBITDA" stays intact
static CAMEL_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("Failed to compile CAMEL_BOUNDARY_RE"));

/// Envelope of the fundamentals-timeseries endpoint.
/// Example: https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries/AAPL?type=annualTotalRevenue
#[derive(Debug, Deserialize)]
pub struct TimeseriesResponse {
    pub timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesBody {
    #[serde(default)]
    pub result: Option<Vec<TimeseriesResult>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// One requested series. The data lives under a key equal to `meta.type[0]`.
#[derive(Debug, Deserialize)]
pub struct TimeseriesResult {
    pub meta: TimeseriesMeta,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    #[serde(flatten)]
    pub series: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesMeta {
    #[serde(default)]
    pub symbol: Vec<String>,
    #[serde(rename = "type", default)]
    pub series_type: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DataPoint {
    #[serde(rename = "asOfDate")]
    pub as_of_date: String,
    #[serde(rename = "periodType", default)]
    pub period_type: Option<String>,
    #[serde(rename = "currencyCode", default)]
    pub currency_code: Option<String>,
    #[serde(rename = "reportedValue", default)]
    pub reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
pub struct ReportedValue {
    #[serde(default)]
    pub raw: Option<RawValue>,
    #[serde(default)]
    pub fmt: Option<String>,
}

impl TimeseriesResult {
    /// The series key, e.g. `annualTotalRevenue`.
    pub fn series_key(&self) -> Option<&str> {
        self.meta.series_type.first().map(String::as_str)
    }

    /// Data points of this series, skipping `null` slots.
    pub fn data_points(&self) -> Result<Vec<DataPoint>, ProviderError> {
        let Some(values) = self.series_key().and_then(|key| self.series.get(key)) else {
            return Ok(Vec::new());
        };
        let points: Vec<Option<DataPoint>> = serde_json::from_value(values.clone())
            .map_err(|e| ProviderError::Parse(format!("Invalid data points: {}", e)))?;
        Ok(points.into_iter().flatten().collect())
    }
}

/// `annualTotalRevenue` -> `Total Revenue`
pub fn line_item_label(series_key: &str) -> String {
    let key = series_key.strip_prefix(ANNUAL_PREFIX).unwrap_or(series_key);
    CAMEL_BOUNDARY_RE.replace_all(key, "${1} ${2}").into_owned()
}

impl TimeseriesResponse {
    /// Folds every returned series into one statement.
    pub fn into_statement(self) -> Result<FinancialStatement, ProviderError> {
        if let Some(error) = self.timeseries.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::Parse(format!("Provider returned error: {}", error)));
        }

        let mut statement = FinancialStatement::new();
        for result in self.timeseries.result.unwrap_or_default() {
            let Some(key) = result.series_key() else {
                continue;
            };
            let label = line_item_label(key);
            for point in result.data_points()? {
                let value = point
                    .reported_value
                    .and_then(|v| v.raw)
                    .unwrap_or(RawValue::Missing);
                statement.insert(&label, point.as_of_date, value);
            }
        }
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_split_on_camel_case() {
        assert_eq!(line_item_label("annualTotalRevenue"), "Total Revenue");
        assert_eq!(line_item_label("annualEBITDA"), "EBITDA");
        assert_eq!(line_item_label("annualEBIT"), "EBIT");
        assert_eq!(
            line_item_label("annualNetIncomeCommonStockholders"),
            "Net Income Common Stockholders"
        );
        assert_eq!(
            line_item_label("annualDepreciationAndAmortization"),
            "Depreciation And Amortization"
        );
    }

    #[test]
    fn response_folds_into_statement() {
        let body = r#"{
            "timeseries": {
                "result": [
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["annualTotalRevenue"]},
                        "timestamp": [1664496000, 1696032000],
                        "annualTotalRevenue": [
                            {"asOfDate": "2022-09-30", "periodType": "12M", "currencyCode": "USD",
                             "reportedValue": {"raw": 394328000000, "fmt": "394.33B"}},
                            null,
                            {"asOfDate": "2023-09-30", "periodType": "12M", "currencyCode": "USD",
                             "reportedValue": {"raw": 383285000000, "fmt": "383.29B"}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["annualEBITDA"]}
                    }
                ],
                "error": null
            }
        }"#;
        let response: TimeseriesResponse = serde_json::from_str(body).unwrap();
        let stmt = response.into_statement().unwrap();

        let revenue = stmt.row("Total Revenue").unwrap();
        assert_eq!(revenue.len(), 2);
        assert_eq!(revenue["2023-09-30"], RawValue::Number(383_285_000_000.0));
        assert!(stmt.row("EBITDA").is_none());
    }

    #[test]
    fn provider_error_is_surfaced() {
        let body = r#"{"timeseries": {"result": null, "error": {"code": "Bad Request", "description": "Invalid type"}}}"#;
        let response: TimeseriesResponse = serde_json::from_str(body).unwrap();
        let err = response.into_statement().unwrap_err();
        assert!(matches!(err, ProviderError::Parse(ref msg) if msg.contains("Invalid type")));
    }
}
