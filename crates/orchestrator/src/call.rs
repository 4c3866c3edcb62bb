use api_client::error::CallError;
use core_types::{FrontierArtifact, PortfolioKind, PortfolioResult, RiskReturn};
use renderer::ResultTable;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named portfolios keyed by kind, as reported by one call.
pub type PortfolioResults = BTreeMap<PortfolioKind, PortfolioResult>;

/// One remote call of a submission. Each call owns exactly one display region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallName {
    /// `POST /equal`
    Baseline,
    /// `POST /optimize`
    Summary,
    /// `POST /efficient_frontier`
    FrontierChart,
    /// `POST /get_portfolio_table`
    PortfolioTable,
    /// `GET /cumulative_sum`
    CumulativeChart,
}

impl CallName {
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallName::Baseline => api_client::EQUAL_PATH,
            CallName::Summary => api_client::OPTIMIZE_PATH,
            CallName::FrontierChart => api_client::EFFICIENT_FRONTIER_PATH,
            CallName::PortfolioTable => api_client::PORTFOLIO_TABLE_PATH,
            CallName::CumulativeChart => api_client::CUMULATIVE_SUM_PATH,
        }
    }
}

impl fmt::Display for CallName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallName::Baseline => "baseline",
            CallName::Summary => "summary",
            CallName::FrontierChart => "frontier chart",
            CallName::PortfolioTable => "portfolio table",
            CallName::CumulativeChart => "cumulative chart",
        };
        f.write_str(name)
    }
}

/// Equal-weight metrics returned for a baseline submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineMetrics {
    pub expected_return: f64,
    pub risk: f64,
    pub weights: Vec<f64>,
    pub table: ResultTable,
}

/// Parallel risk/return series, e.g. the simulated cloud or the frontier curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReturnSeries {
    pub risk: Vec<f64>,
    pub expected_return: Vec<f64>,
}

impl RiskReturnSeries {
    pub fn len(&self) -> usize {
        self.risk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.risk.is_empty()
    }
}

/// Scalar figures returned by the optimize call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    pub optimal_return: f64,
    pub optimal_risk: f64,
    pub optimal_weights: Vec<f64>,
    pub max_sharpe: RiskReturn,
    pub min_volatility: RiskReturn,
    pub simulated: Option<RiskReturnSeries>,
    pub frontier: Option<RiskReturnSeries>,
    /// Optimal allocation as a one-row table.
    pub allocation: ResultTable,
    /// Return and volatility of the named sub-portfolios.
    pub metrics: ResultTable,
}

/// What the frontier call returned: the chart, and any portfolios it plotted.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierOutput {
    pub chart: Option<FrontierArtifact>,
    pub portfolios: PortfolioResults,
}

/// What a successful call adds to the display.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    Baseline(BaselineMetrics),
    Summary(OptimizationSummary),
    FrontierChart(FrontierOutput),
    /// Weight counts are already checked against the tickers.
    PortfolioTable(PortfolioResults),
    CumulativeChart(FrontierArtifact),
}

/// The result of one call, tagged with the submission it belongs to.
#[derive(Debug)]
pub struct CallOutcome {
    pub sequence: u64,
    pub call: CallName,
    pub result: Result<Contribution, CallError>,
}
