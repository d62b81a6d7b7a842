// src/extractors/financial.rs

// --- Imports ---
use crate::extractors::statement::{FinancialStatement, Row};
use crate::utils::error::ExtractError;
use chrono::{Datelike, NaiveDate};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

// --- Constants ---
pub const DEFAULT_MIN_YEAR: i32 = 2021;
const MILLION: f64 = 1_000_000.0;

// --- Line-item aliases, highest priority first ---
const REVENUE_LABELS: &[&str] = &["Total Revenue", "Revenue"];
const EBIT_LABELS: &[&str] = &["Operating Income", "EBIT"];
const NET_PROFIT_LABELS: &[&str] = &["Net Income", "Net Income Common Stockholders"];
const OPERATING_INCOME_LABEL: &str = "Operating Income";
const DEPRECIATION_LABELS: &[&str] = &["Depreciation & Amortization", "Depreciation And Amortization"];
const EBITDA_LABEL: &str = "EBITDA";
const NET_INCOME_LABEL: &str = "Net Income";
const TOTAL_ASSETS_LABEL: &str = "Total Assets";

// --- Data Structures ---

/// Return on investment for one fiscal year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roi {
    Percent(f64),
    NotAvailable,
}

impl Roi {
    fn from_ratio(net_income: f64, total_assets: f64) -> Self {
        let pct = net_income / total_assets * 100.0;
        if pct.is_finite() {
            Roi::Percent(pct)
        } else {
            Roi::NotAvailable
        }
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Roi::Percent(pct) => write!(f, "{:.2}%", pct),
            Roi::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Roi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One output record. Monetary fields are in millions; NaN when unavailable
/// (serialized as `null`).
#[derive(Debug, Clone, Serialize)]
pub struct FinancialRow {
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "EBIT")]
    pub ebit: f64,
    #[serde(rename = "Net Profit")]
    pub net_profit: f64,
    #[serde(rename = "EBITDA")]
    pub ebitda: f64,
    #[serde(rename = "ROI")]
    pub roi: Roi,
}

/// Output table keyed by fiscal year, serialized newest year first.
#[derive(Debug, Clone, Default)]
pub struct FinancialTable {
    rows: BTreeMap<i32, FinancialRow>,
}

impl FinancialTable {
    /// Years in descending order.
    #[cfg(test)]
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.keys().rev().copied()
    }

    /// Rows in descending year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &FinancialRow)> {
        self.rows.iter().rev().map(|(year, row)| (*year, row))
    }

    #[cfg(test)]
    pub fn get(&self, year: i32) -> Option<&FinancialRow> {
        self.rows.get(&year)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for FinancialTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (year, row) in self.iter() {
            map.serialize_entry(&year.to_string(), row)?;
        }
        map.end()
    }
}

/// Where EBITDA comes from for a given statement.
#[derive(Debug)]
enum EbitdaSource<'a> {
    Computed { operating_income: &'a Row, depreciation: &'a Row },
    Reported(&'a Row),
    Unavailable,
}

impl<'a> EbitdaSource<'a> {
    fn resolve(income: &'a FinancialStatement) -> Self {
        let operating_income = income.row(OPERATING_INCOME_LABEL);
        let depreciation = income.first_row(DEPRECIATION_LABELS).map(|(_, row)| row);
        match (operating_income, depreciation) {
            (Some(operating_income), Some(depreciation)) => EbitdaSource::Computed {
                operating_income,
                depreciation,
            },
            _ => income
                .row(EBITDA_LABEL)
                .map_or(EbitdaSource::Unavailable, EbitdaSource::Reported),
        }
    }

    fn millions_at(&self, period: &str) -> f64 {
        match self {
            EbitdaSource::Computed { operating_income, depreciation } => {
                (value_at(operating_income, period) + value_at(depreciation, period)) / MILLION
            }
            EbitdaSource::Reported(row) => millions_at(Some(*row), period),
            EbitdaSource::Unavailable => f64::NAN,
        }
    }
}

/// Where ROI comes from. Total Assets is re-keyed by date so balance-sheet
/// labels only need to agree with the income statement on the calendar date.
#[derive(Debug)]
enum RoiSource<'a> {
    Ratio { net_income: &'a Row, total_assets: HashMap<NaiveDate, f64> },
    Unavailable,
}

impl<'a> RoiSource<'a> {
    fn resolve(
        income: &'a FinancialStatement,
        balance: Option<&'a FinancialStatement>,
    ) -> Result<Self, ExtractError> {
        let net_income = income.row(NET_INCOME_LABEL);
        let total_assets = balance.and_then(|b| b.row(TOTAL_ASSETS_LABEL));
        let (Some(net_income), Some(total_assets)) = (net_income, total_assets) else {
            tracing::debug!("ROI unavailable: Net Income or Total Assets row missing");
            return Ok(RoiSource::Unavailable);
        };

        let mut by_date = HashMap::with_capacity(total_assets.len());
        for (period, value) in total_assets {
            by_date.insert(parse_period(period)?, value.as_f64());
        }
        Ok(RoiSource::Ratio { net_income, total_assets: by_date })
    }

    fn at(&self, period: &str, date: NaiveDate) -> Roi {
        match self {
            RoiSource::Ratio { net_income, total_assets } => {
                let assets = total_assets.get(&date).copied().unwrap_or(f64::NAN);
                Roi::from_ratio(value_at(net_income, period), assets)
            }
            RoiSource::Unavailable => Roi::NotAvailable,
        }
    }
}

// --- Helpers ---

fn value_at(row: &Row, period: &str) -> f64 {
    row.get(period).map_or(f64::NAN, |v| v.as_f64())
}

fn millions_at(row: Option<&Row>, period: &str) -> f64 {
    row.map_or(f64::NAN, |row| value_at(row, period) / MILLION)
}

/// Parses a fiscal period label. Accepts `YYYY-MM-DD` with an optional time suffix.
pub fn parse_period(label: &str) -> Result<NaiveDate, ExtractError> {
    let trimmed = label.trim();
    trimmed
        .get(..10)
        .filter(|_| {
            trimmed.len() == 10 || matches!(trimmed.as_bytes()[10], b'T' | b' ')
        })
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .ok_or_else(|| ExtractError::MalformedPeriod(label.to_string()))
}

// --- Extractor ---

/// Turns an income statement and balance sheet into the per-year table.
#[derive(Debug, Clone)]
pub struct FinancialExtractor {
    min_year: i32,
}

impl Default for FinancialExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FinancialExtractor {
    pub fn new() -> Self {
        Self { min_year: DEFAULT_MIN_YEAR }
    }

    pub fn with_min_year(min_year: i32) -> Self {
        Self { min_year }
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    /// Builds the table. Missing line items degrade to NaN / "N/A"; only
    /// structurally broken input (unparsable period labels) is an error.
    pub fn build_table(
        &self,
        income: Option<&FinancialStatement>,
        balance: Option<&FinancialStatement>,
    ) -> Result<FinancialTable, ExtractError> {
        let mut table = FinancialTable::default();
        let Some(income) = income.filter(|stmt| !stmt.is_empty()) else {
            tracing::warn!("Income statement is empty; producing an empty table");
            return Ok(table);
        };

        let mut periods = income
            .periods()
            .into_iter()
            .map(|period| parse_period(period).map(|date| (period, date)))
            .collect::<Result<Vec<_>, _>>()?;
        periods.sort_by_key(|(_, date)| *date);

        let revenue = income.first_row(REVENUE_LABELS);
        let ebit = income.first_row(EBIT_LABELS);
        let net_profit = income.first_row(NET_PROFIT_LABELS);
        for (field, source) in [("Revenue", &revenue), ("EBIT", &ebit), ("Net Profit", &net_profit)] {
            match source {
                Some((label, _)) => tracing::debug!("{} resolved from '{}'", field, label),
                None => tracing::debug!("{} unavailable: no matching line item", field),
            }
        }
        let revenue = revenue.map(|(_, row)| row);
        let ebit = ebit.map(|(_, row)| row);
        let net_profit = net_profit.map(|(_, row)| row);
        let ebitda = EbitdaSource::resolve(income);
        let roi = RoiSource::resolve(income, balance)?;

        for (period, date) in periods {
            let year = date.year();
            if year < self.min_year {
                continue;
            }
            let row = FinancialRow {
                revenue: millions_at(revenue, period),
                ebit: millions_at(ebit, period),
                net_profit: millions_at(net_profit, period),
                ebitda: ebitda.millions_at(period),
                roi: roi.at(period, date),
            };
            if table.rows.insert(year, row).is_some() {
                return Err(ExtractError::DuplicateFiscalYear(year));
            }
        }

        Ok(table)
    }
}
