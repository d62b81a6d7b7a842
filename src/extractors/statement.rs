// src/extractors/statement.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single reported cell. Providers occasionally hand back strings or
/// blanks where a number is expected, so the raw form is kept until
/// conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Numeric view of the cell; anything unconvertible is NaN.
    pub fn as_f64(&self) -> f64 {
        match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            RawValue::Missing => f64::NAN,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// One line item: period label -> value.
pub type Row = BTreeMap<String, RawValue>;

/// A financial statement keyed by line-item label, then by fiscal period label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialStatement {
    rows: BTreeMap<String, Row>,
}

impl FinancialStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a whole row for fixtures.
    #[cfg(test)]
    pub fn with_row<I, P, V>(mut self, label: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (P, V)>,
        P: Into<String>,
        V: Into<RawValue>,
    {
        for (period, value) in values {
            self.insert(label, period, value);
        }
        self
    }

    pub fn insert<P: Into<String>, V: Into<RawValue>>(&mut self, label: &str, period: P, value: V) {
        self.rows
            .entry(label.to_string())
            .or_default()
            .insert(period.into(), value.into());
    }

    pub fn row(&self, label: &str) -> Option<&Row> {
        self.rows.get(label)
    }

    /// First row present among `aliases`, in priority order. Rows are never merged.
    pub fn first_row<'a>(&'a self, aliases: &[&str]) -> Option<(&'a str, &'a Row)> {
        aliases.iter().find_map(|label| {
            self.rows
                .get_key_value(*label)
                .map(|(key, row)| (key.as_str(), row))
        })
    }

    /// Union of period labels across all rows.
    pub fn periods(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.is_empty())
    }
}
