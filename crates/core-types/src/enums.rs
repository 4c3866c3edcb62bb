use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a submission asks the analysis service to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Uniform-weight metrics plus the cumulative-performance chart.
    Baseline,
    /// Optimized metrics, the frontier chart and the multi-portfolio table.
    Optimize,
}

impl Action {
    /// Whether the action needs the selection to satisfy the full cardinality policy.
    pub fn requires_optimization(&self) -> bool {
        matches!(self, Action::Optimize)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Baseline => write!(f, "baseline"),
            Action::Optimize => write!(f, "optimize"),
        }
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "equal" => Ok(Action::Baseline),
            "optimize" => Ok(Action::Optimize),
            other => Err(CoreError::InvalidInput("action".to_string(), other.to_string())),
        }
    }
}

/// The named portfolios the analysis service reports on.
///
/// The declaration order is the canonical row order of the portfolio table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioKind {
    #[serde(alias = "normal_portfolio")]
    Normal,
    MaxSharpe,
    MinVolatility,
    MaxReturn,
}

impl PortfolioKind {
    pub const ALL: [PortfolioKind; 4] = [
        PortfolioKind::Normal,
        PortfolioKind::MaxSharpe,
        PortfolioKind::MinVolatility,
        PortfolioKind::MaxReturn,
    ];

    /// Human-readable name used in the `Portfolio Type` column.
    pub fn label(&self) -> &'static str {
        match self {
            PortfolioKind::Normal => "Normal Portfolio",
            PortfolioKind::MaxSharpe => "Max Sharpe Ratio",
            PortfolioKind::MinVolatility => "Min Volatility",
            PortfolioKind::MaxReturn => "Max Return",
        }
    }
}

impl fmt::Display for PortfolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which chart a `FrontierArtifact` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Risk/return scatter with the efficient frontier.
    EfficientFrontier,
    /// Cumulative-performance curve over the analysis window.
    CumulativePerformance,
}
