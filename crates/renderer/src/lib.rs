use crate::error::RenderError;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement};
use core_types::{PortfolioKind, PortfolioResult, RiskReturn};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub mod error;

pub const PORTFOLIO_TYPE_HEADER: &str = "Portfolio Type";
pub const RETURN_HEADER: &str = "Expected Return (%)";
pub const VOLATILITY_HEADER: &str = "Volatility (%)";

/// A rendered table: fixed headers and rows of already-formatted cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Looks up a cell by row index and header name.
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let column = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Builds a terminal table; every column after the first is right-aligned.
    pub fn to_terminal_table(&self) -> comfy_table::Table {
        let mut table = comfy_table::Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(self.headers.iter().map(Cell::new));
        for row in &self.rows {
            table.add_row(row.iter().enumerate().map(|(i, value)| {
                let cell = Cell::new(value);
                if i == 0 { cell } else { cell.set_alignment(CellAlignment::Right) }
            }));
        }
        table
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_terminal_table())
    }
}

/// Builds the multi-portfolio breakdown.
///
/// Columns are `Portfolio Type`, `Expected Return (%)`, `Volatility (%)`, then one
/// `"<ticker> Weight (%)"` column per ticker in request order. Rows follow `row_order`,
/// skipping kinds absent from `results`. Every result must carry exactly one weight
/// per ticker.
pub fn build_portfolio_table(
    tickers: &[String],
    results: &BTreeMap<PortfolioKind, PortfolioResult>,
    row_order: &[PortfolioKind],
) -> Result<ResultTable, RenderError> {
    let mut rows = Vec::with_capacity(row_order.len());
    for kind in row_order {
        let Some(result) = results.get(kind) else {
            tracing::debug!(%kind, "No result for portfolio kind, row omitted.");
            continue;
        };
        rows.push(allocation_row(
            kind.label(),
            tickers,
            result.expected_return,
            result.risk,
            &result.weights,
        )?);
    }

    Ok(ResultTable {
        headers: allocation_headers(tickers),
        rows,
    })
}

/// Builds a single-row allocation table, as for the equal-weight baseline.
pub fn build_allocation_table(
    label: &str,
    tickers: &[String],
    expected_return: f64,
    risk: f64,
    weights: &[f64],
) -> Result<ResultTable, RenderError> {
    Ok(ResultTable {
        headers: allocation_headers(tickers),
        rows: vec![allocation_row(label, tickers, expected_return, risk, weights)?],
    })
}

/// Builds a return/volatility table for portfolios reported without weights.
pub fn build_metrics_table(rows: &[(&str, RiskReturn)]) -> Result<ResultTable, RenderError> {
    let rows = rows
        .iter()
        .map(|(label, metrics)| {
            Ok(vec![
                label.to_string(),
                percent("expected return", metrics.expected_return)?,
                percent("risk", metrics.risk)?,
            ])
        })
        .collect::<Result<Vec<_>, RenderError>>()?;

    Ok(ResultTable {
        headers: vec![
            PORTFOLIO_TYPE_HEADER.to_string(),
            RETURN_HEADER.to_string(),
            VOLATILITY_HEADER.to_string(),
        ],
        rows,
    })
}

/// Formats a fraction as a percentage with exactly two decimals, rounding half away from zero.
pub fn percent(field: &str, value: f64) -> Result<String, RenderError> {
    let non_finite = || RenderError::NonFiniteValue {
        field: field.to_string(),
        value,
    };
    if !value.is_finite() {
        return Err(non_finite());
    }
    let out_of_range = || RenderError::OutOfRange {
        field: field.to_string(),
        value,
    };
    let scaled = Decimal::from_f64(value)
        .and_then(|v| v.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(out_of_range)?;
    let mut rounded = scaled.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // Avoid "-0.00" for tiny negative weights.
        rounded = Decimal::ZERO;
    }
    Ok(format!("{:.2}", rounded))
}

fn allocation_headers(tickers: &[String]) -> Vec<String> {
    let mut headers = vec![
        PORTFOLIO_TYPE_HEADER.to_string(),
        RETURN_HEADER.to_string(),
        VOLATILITY_HEADER.to_string(),
    ];
    headers.extend(tickers.iter().map(|t| format!("{} Weight (%)", t)));
    headers
}

fn allocation_row(
    label: &str,
    tickers: &[String],
    expected_return: f64,
    risk: f64,
    weights: &[f64],
) -> Result<Vec<String>, RenderError> {
    if weights.len() != tickers.len() {
        return Err(RenderError::SchemaMismatch {
            portfolio: label.to_string(),
            expected: tickers.len(),
            actual: weights.len(),
        });
    }

    let mut row = Vec::with_capacity(3 + weights.len());
    row.push(label.to_string());
    row.push(percent("expected return", expected_return)?);
    row.push(percent("risk", risk)?);
    for (ticker, weight) in tickers.iter().zip(weights) {
        row.push(percent(&format!("{} weight", ticker), *weight)?);
    }
    Ok(row)
}
