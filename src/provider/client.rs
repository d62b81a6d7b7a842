// src/provider/client.rs
use crate::extractors::statement::FinancialStatement;
use crate::provider::models::{TimeseriesResponse, ANNUAL_PREFIX};
use crate::utils::error::ProviderError;
use chrono::{NaiveDate, Utc};
use reqwest::header;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const TIMESERIES_PATH: &str = "/ws/fundamentals-timeseries/v1/finance/timeseries";
// Yahoo rejects the default reqwest agent on some edges
const PROVIDER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";
// Keep a gap between the statement requests. Yahoo throttles bursts with 429s.
const PROVIDER_REQUEST_DELAY_MS: u64 = 250;
const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Income statement line items requested from the provider.
pub const INCOME_STATEMENT_KEYS: &[&str] = &[
    "TotalRevenue",
    "OperatingRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "EBIT",
    "EBITDA",
    "NormalizedEBITDA",
    "ReconciledDepreciation",
    "DepreciationAndAmortization",
    "DepreciationAndAmortizationInIncomeStatement",
    "InterestExpense",
    "TaxProvision",
    "PretaxIncome",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "DilutedEPS",
    "BasicEPS",
];

/// Balance sheet line items requested from the provider.
pub const BALANCE_SHEET_KEYS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "TotalDebt",
    "StockholdersEquity",
    "TotalEquityGrossMinorityInterest",
    "WorkingCapital",
    "InvestedCapital",
];

/// The two statements the extractor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    IncomeStatement,
    BalanceSheet,
}

impl StatementKind {
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            StatementKind::IncomeStatement => INCOME_STATEMENT_KEYS,
            StatementKind::BalanceSheet => BALANCE_SHEET_KEYS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "income statement",
            StatementKind::BalanceSheet => "balance sheet",
        }
    }
}

/// Client for Yahoo Finance's fundamentals-timeseries API.
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
    request_delay: Duration,
}

impl YahooClient {
    /// Creates a client configured for Yahoo interaction.
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(PROVIDER_USER_AGENT)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_delay: Duration::from_millis(PROVIDER_REQUEST_DELAY_MS),
        })
    }

    /// Overrides the pause taken before each request.
    #[cfg(test)]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Fetches one annual statement for `ticker`.
    pub async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<FinancialStatement, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, TIMESERIES_PATH, ticker);
        let types = kind
            .keys()
            .iter()
            .map(|key| format!("{}{}", ANNUAL_PREFIX, key))
            .collect::<Vec<_>>()
            .join(",");
        // Annual statements only reach back a handful of years
        let period1 = NaiveDate::from_ymd_opt(2016, 12, 31)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = Utc::now().timestamp();

        tracing::info!("Fetching {} for {}", kind.as_str(), ticker);
        tracing::debug!("Requesting {} with {} series", url, kind.keys().len());

        // --- Basic Rate Limiting ---
        tokio::time::sleep(self.request_delay).await;

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("symbol", ticker.to_string()),
                ("type", types),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ])
            .send()
            .await?; // Propagates reqwest::Error as ProviderError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Received 429 Too Many Requests - slow down.");
                return Err(ProviderError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ProviderError::SymbolNotFound(ticker.to_string()));
            }
            return Err(ProviderError::Http(status));
        }

        let body: TimeseriesResponse = response.json().await?;
        let statement = body.into_statement()?;
        if statement.is_empty() {
            tracing::warn!("Provider returned an empty {} for {}", kind.as_str(), ticker);
        }
        Ok(statement)
    }

    /// Fetches the income statement and balance sheet, propagating the first failure.
    pub async fn try_fetch_statements(
        &self,
        ticker: &str,
    ) -> Result<(FinancialStatement, FinancialStatement), ProviderError> {
        let income = self.fetch_statement(ticker, StatementKind::IncomeStatement).await?;
        let balance = self.fetch_statement(ticker, StatementKind::BalanceSheet).await?;
        Ok((income, balance))
    }

    /// Like [`try_fetch_statements`](Self::try_fetch_statements) but never fails:
    /// the error is logged and both statements come back absent.
    pub async fn fetch_statements(
        &self,
        ticker: &str,
    ) -> (Option<FinancialStatement>, Option<FinancialStatement>) {
        match self.try_fetch_statements(ticker).await {
            Ok((income, balance)) => (Some(income), Some(balance)),
            Err(e) => {
                tracing::error!("Error fetching data for {}: {}", ticker, e);
                (None, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::statement::RawValue;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> YahooClient {
        YahooClient::new(&server.base_url())
            .unwrap()
            .with_request_delay(Duration::ZERO)
    }

    fn series(key: &str, points: serde_json::Value) -> serde_json::Value {
        json!({ "meta": { "symbol": ["TST"], "type": [key] }, key: points })
    }

    #[test]
    fn fetches_both_statements() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/ws/fundamentals-timeseries/v1/finance/timeseries/TST")
                .query_param("symbol", "TST");
            then.status(200).json_body(json!({
                "timeseries": {
                    "result": [
                        series("annualTotalRevenue", json!([
                            { "asOfDate": "2023-12-31", "reportedValue": { "raw": 2.0e9 } }
                        ])),
                        series("annualTotalAssets", json!([
                            { "asOfDate": "2023-12-31", "reportedValue": { "raw": 8.0e9 } }
                        ]))
                    ],
                    "error": null
                }
            }));
        });

        let client = client_for(&server);
        let (income_stmt, balance_stmt) =
            tokio_test::block_on(client.try_fetch_statements("TST")).unwrap();

        mock.assert_calls(2);
        assert_eq!(
            income_stmt.row("Total Revenue").unwrap()["2023-12-31"],
            RawValue::Number(2.0e9)
        );
        assert_eq!(
            balance_stmt.row("Total Assets").unwrap()["2023-12-31"],
            RawValue::Number(8.0e9)
        );
    }

    #[test]
    fn not_found_maps_to_symbol_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(404);
        });

        let client = client_for(&server);
        let err = tokio_test::block_on(client.fetch_statement("NOPE", StatementKind::IncomeStatement))
            .unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound(ref t) if t == "NOPE"));
    }

    #[test]
    fn rate_limit_and_server_errors_are_distinguished() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(format!("{}/SLOW", TIMESERIES_PATH));
            then.status(429);
        });
        server.mock(|when, then| {
            when.method(GET).path(format!("{}/DOWN", TIMESERIES_PATH));
            then.status(503);
        });

        let client = client_for(&server);
        let slow = tokio_test::block_on(client.fetch_statement("SLOW", StatementKind::BalanceSheet));
        assert!(matches!(slow, Err(ProviderError::RateLimited)));
        let down = tokio_test::block_on(client.fetch_statement("DOWN", StatementKind::BalanceSheet));
        assert!(matches!(down, Err(ProviderError::Http(s)) if s.as_u16() == 503));
    }

    #[test]
    fn fetch_failure_yields_absent_statements() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).body("not json");
        });

        let client = client_for(&server);
        let (income, balance) = tokio_test::block_on(client.fetch_statements("TST"));
        assert!(income.is_none());
        assert!(balance.is_none());
    }
}
