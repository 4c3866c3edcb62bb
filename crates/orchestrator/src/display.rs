use crate::call::{BaselineMetrics, CallName, Contribution, OptimizationSummary, PortfolioResults};
use api_client::error::CallError;
use core_types::{Action, AnalysisRequest, DateRange, FrontierArtifact, PortfolioKind};
use renderer::ResultTable;
use serde::Serialize;

pub const DISCLAIMER: &str = "Disclaimer: The Markowitz portfolio optimization is based on historical \
data and assumes that past performance is indicative of future results. This method also assumes that \
asset returns are normally distributed, which might not always be the case in real market conditions. \
Investors should use these results with caution and consider other factors before making investment \
decisions.";

/// A call that failed, kept so the display can say why a region is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallFailure {
    pub call: CallName,
    pub message: String,
}

/// Everything the display surface shows for the current submission.
///
/// Each call writes its own region only; a failed call leaves its region `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayState {
    /// Submission the regions belong to. Zero before the first submission.
    pub sequence: u64,
    pub action: Option<Action>,
    pub tickers: Vec<String>,
    pub date_range: Option<DateRange>,
    pub baseline: Option<BaselineMetrics>,
    pub summary: Option<OptimizationSummary>,
    pub frontier_chart: Option<FrontierArtifact>,
    pub cumulative_chart: Option<FrontierArtifact>,
    /// Built from the table call, with kinds it lacks filled in from the frontier call.
    pub portfolio_table: Option<ResultTable>,
    pub failures: Vec<CallFailure>,
    #[serde(skip)]
    table_rows: Vec<PortfolioKind>,
    #[serde(skip)]
    table_portfolios: PortfolioResults,
    #[serde(skip)]
    frontier_portfolios: PortfolioResults,
}

impl DisplayState {
    /// A blank display for a new submission. Previous results are discarded wholesale.
    pub fn for_submission(sequence: u64, request: &AnalysisRequest, table_rows: &[PortfolioKind]) -> Self {
        Self {
            sequence,
            action: Some(request.action),
            tickers: request.tickers.clone(),
            date_range: Some(request.date_range),
            table_rows: table_rows.to_vec(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Baseline(metrics) => self.baseline = Some(metrics),
            Contribution::Summary(summary) => self.summary = Some(summary),
            Contribution::FrontierChart(output) => {
                self.frontier_chart = output.chart;
                self.frontier_portfolios = output.portfolios;
                self.refresh_portfolio_table();
            }
            Contribution::PortfolioTable(results) => {
                self.table_portfolios = results;
                self.refresh_portfolio_table();
            }
            Contribution::CumulativeChart(chart) => self.cumulative_chart = Some(chart),
        }
    }

    /// Rebuilds the table from both sources. The table call wins where both report a kind.
    fn refresh_portfolio_table(&mut self) {
        let mut merged = self.frontier_portfolios.clone();
        merged.extend(self.table_portfolios.clone());
        if merged.is_empty() {
            return;
        }
        match renderer::build_portfolio_table(&self.tickers, &merged, &self.table_rows) {
            Ok(table) => self.portfolio_table = Some(table),
            Err(e) => tracing::warn!(error = %e, "Portfolio table left unchanged."),
        }
    }

    pub fn record_failure(&mut self, call: CallName, error: &CallError) {
        self.failures.push(CallFailure {
            call,
            message: error.to_string(),
        });
    }

    /// Whether the region owned by `call` holds a result.
    pub fn is_rendered(&self, call: CallName) -> bool {
        match call {
            CallName::Baseline => self.baseline.is_some(),
            CallName::Summary => self.summary.is_some(),
            CallName::FrontierChart => self.frontier_chart.is_some(),
            CallName::PortfolioTable => self.portfolio_table.is_some(),
            CallName::CumulativeChart => self.cumulative_chart.is_some(),
        }
    }

    pub fn has_results(&self) -> bool {
        self.baseline.is_some()
            || self.summary.is_some()
            || self.frontier_chart.is_some()
            || self.portfolio_table.is_some()
            || self.cumulative_chart.is_some()
    }

    pub fn failure(&self, call: CallName) -> Option<&CallFailure> {
        self.failures.iter().find(|f| f.call == call)
    }

    /// The disclaimer accompanies any rendered result.
    pub fn disclaimer(&self) -> Option<&'static str> {
        self.has_results().then_some(DISCLAIMER)
    }
}
