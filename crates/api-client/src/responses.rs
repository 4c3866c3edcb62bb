use chrono::NaiveDate;
use core_types::{AnalysisRequest, PortfolioKind, PortfolioResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// The service speaks snake_case JSON, so field names map one-to-one except `return`,
// which is a Rust keyword and is renamed to `expected_return`.

/// The body shared by every POST call of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisPayload {
    pub tickers: Vec<String>,
    /// `[start, end]` as ISO calendar dates.
    pub date_range: [NaiveDate; 2],
}

impl From<&AnalysisRequest> for AnalysisPayload {
    fn from(request: &AnalysisRequest) -> Self {
        Self {
            tickers: request.tickers.clone(),
            date_range: [request.date_range.start(), request.date_range.end()],
        }
    }
}

/// The response from `POST /equal`.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineResponse {
    pub weights: Vec<f64>,
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub risk: f64,
}

/// The response from `POST /optimize`.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeResponse {
    pub weights: Vec<f64>,
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub risk: f64,
    pub max_sharpe_ratio_return: f64,
    pub max_sharpe_ratio_risk: f64,
    pub min_volatility_return: f64,
    pub min_volatility_risk: f64,
    // The simulated cloud and the frontier are optional extras.
    #[serde(default)]
    pub portfolios_risk: Vec<f64>,
    #[serde(default)]
    pub portfolios_return: Vec<f64>,
    #[serde(default, alias = "frontier_x")]
    pub frontier_risk: Vec<f64>,
    #[serde(default, alias = "frontier_y")]
    pub frontier_return: Vec<f64>,
}

/// The response from `GET /cumulative_sum`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub image_path: String,
}

/// The response from `POST /efficient_frontier`: a chart, keyed portfolios, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontierResponse {
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub normal_portfolio: Option<PortfolioEntry>,
    #[serde(default)]
    pub max_sharpe: Option<PortfolioEntry>,
    #[serde(default)]
    pub min_volatility: Option<PortfolioEntry>,
    #[serde(default)]
    pub max_return: Option<PortfolioEntry>,
}

impl FrontierResponse {
    /// Keys the embedded portfolios by kind. Empty when the service only sent a chart.
    pub fn into_results(self) -> BTreeMap<PortfolioKind, PortfolioResult> {
        keyed_results([
            (PortfolioKind::Normal, self.normal_portfolio),
            (PortfolioKind::MaxSharpe, self.max_sharpe),
            (PortfolioKind::MinVolatility, self.min_volatility),
            (PortfolioKind::MaxReturn, self.max_return),
        ])
    }
}

/// A single keyed portfolio as the service reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioEntry {
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub risk: f64,
    pub weights: Vec<f64>,
}

/// The response from `POST /get_portfolio_table`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioTableResponse {
    #[serde(default)]
    pub normal_portfolio: Option<PortfolioEntry>,
    pub max_sharpe: PortfolioEntry,
    pub min_volatility: PortfolioEntry,
    pub max_return: PortfolioEntry,
}

impl PortfolioTableResponse {
    /// Keys every reported portfolio by its kind.
    pub fn into_results(self) -> BTreeMap<PortfolioKind, PortfolioResult> {
        keyed_results([
            (PortfolioKind::Normal, self.normal_portfolio),
            (PortfolioKind::MaxSharpe, Some(self.max_sharpe)),
            (PortfolioKind::MinVolatility, Some(self.min_volatility)),
            (PortfolioKind::MaxReturn, Some(self.max_return)),
        ])
    }
}

fn keyed_results(
    entries: [(PortfolioKind, Option<PortfolioEntry>); 4],
) -> BTreeMap<PortfolioKind, PortfolioResult> {
    entries
        .into_iter()
        .filter_map(|(kind, entry)| {
            entry.map(|e| {
                (
                    kind,
                    PortfolioResult {
                        kind,
                        expected_return: e.expected_return,
                        risk: e.risk,
                        weights: e.weights,
                    },
                )
            })
        })
        .collect()
}

/// An error body from the analysis service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: serde_json::Value,
}

impl ApiErrorResponse {
    pub fn message(&self) -> String {
        match &self.error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
