use crate::enums::{Action, ArtifactKind, PortfolioKind};
use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tradable instrument as offered by the catalog.
///
/// `identifier` is the canonical key sent to the analysis service; `label` is
/// display text only and is never parsed back into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub identifier: String,
    pub label: String,
}

impl Instrument {
    pub fn new(identifier: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A historical analysis window. Both ends are inclusive calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting reversed bounds. Temporal policy (span, floor,
    /// future dates) is enforced by the validator, not here.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidInput(
                "date_range".to_string(),
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A single submission to the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    /// Identifiers in selection order. Result weights are parallel to this.
    pub tickers: Vec<String>,
    pub date_range: DateRange,
    pub action: Action,
}

/// Return, risk and allocation for one named portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub kind: PortfolioKind,
    pub expected_return: f64,
    pub risk: f64,
    /// Positionally parallel to `AnalysisRequest::tickers`.
    pub weights: Vec<f64>,
}

/// A scalar return/risk pair for a sub-portfolio that comes without weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskReturn {
    pub expected_return: f64,
    pub risk: f64,
}

/// Reference to a chart rendered by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierArtifact {
    pub kind: ArtifactKind,
    pub uri: String,
}
