use crate::call::{
    BaselineMetrics, CallName, Contribution, FrontierOutput, OptimizationSummary, PortfolioResults,
    RiskReturnSeries,
};
use api_client::error::CallError;
use api_client::{AnalysisApi, AnalysisPayload, BaselineResponse, FrontierResponse, OptimizeResponse};
use core_types::{ArtifactKind, FrontierArtifact, PortfolioKind, RiskReturn};
use renderer::error::RenderError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Everything a spawned call needs. Cloned into each task of a submission.
#[derive(Clone)]
pub(crate) struct CallContext {
    pub api: Arc<dyn AnalysisApi>,
    pub payload: Arc<AnalysisPayload>,
    pub table_rows: Arc<[PortfolioKind]>,
    pub call_timeout: Duration,
}

/// Runs one call under the per-call timeout and converts its response into a display contribution.
pub(crate) async fn run_call(ctx: &CallContext, call: CallName) -> Result<Contribution, CallError> {
    let limit = ctx.call_timeout;
    let tickers = &ctx.payload.tickers;
    match call {
        CallName::Baseline => {
            let response = with_timeout(limit, ctx.api.equal_weights(&ctx.payload)).await?;
            baseline_metrics(tickers, response).map(Contribution::Baseline)
        }
        CallName::Summary => {
            let response = with_timeout(limit, ctx.api.optimize(&ctx.payload)).await?;
            optimization_summary(tickers, response).map(Contribution::Summary)
        }
        CallName::FrontierChart => {
            let response = with_timeout(limit, ctx.api.efficient_frontier(&ctx.payload)).await?;
            frontier_output(tickers, &ctx.table_rows, response).map(Contribution::FrontierChart)
        }
        CallName::PortfolioTable => {
            let response = with_timeout(limit, ctx.api.portfolio_table(&ctx.payload)).await?;
            checked_portfolios(tickers, &ctx.table_rows, response.into_results())
                .map(Contribution::PortfolioTable)
        }
        CallName::CumulativeChart => {
            let response = with_timeout(limit, ctx.api.cumulative_sum()).await?;
            artifact(ArtifactKind::CumulativePerformance, response.image_path)
                .map(Contribution::CumulativeChart)
        }
    }
}

async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CallError::Timeout(limit)),
    }
}

fn render_failure(err: RenderError) -> CallError {
    match err {
        RenderError::SchemaMismatch { .. } => CallError::SchemaMismatch(err.to_string()),
        RenderError::NonFiniteValue { .. } | RenderError::OutOfRange { .. } => {
            CallError::Payload(err.to_string())
        }
    }
}

fn baseline_metrics(tickers: &[String], response: BaselineResponse) -> Result<BaselineMetrics, CallError> {
    let table = renderer::build_allocation_table(
        "Equal Weight",
        tickers,
        response.expected_return,
        response.risk,
        &response.weights,
    )
    .map_err(render_failure)?;

    Ok(BaselineMetrics {
        expected_return: response.expected_return,
        risk: response.risk,
        weights: response.weights,
        table,
    })
}

fn optimization_summary(
    tickers: &[String],
    response: OptimizeResponse,
) -> Result<OptimizationSummary, CallError> {
    let allocation = renderer::build_allocation_table(
        "Optimal (Min Variance)",
        tickers,
        response.expected_return,
        response.risk,
        &response.weights,
    )
    .map_err(render_failure)?;

    let max_sharpe = RiskReturn {
        expected_return: response.max_sharpe_ratio_return,
        risk: response.max_sharpe_ratio_risk,
    };
    let min_volatility = RiskReturn {
        expected_return: response.min_volatility_return,
        risk: response.min_volatility_risk,
    };
    let metrics = renderer::build_metrics_table(&[
        (PortfolioKind::MaxSharpe.label(), max_sharpe),
        (PortfolioKind::MinVolatility.label(), min_volatility),
    ])
    .map_err(render_failure)?;

    Ok(OptimizationSummary {
        optimal_return: response.expected_return,
        optimal_risk: response.risk,
        optimal_weights: response.weights,
        max_sharpe,
        min_volatility,
        simulated: series("simulated portfolios", response.portfolios_risk, response.portfolios_return)?,
        frontier: series("frontier", response.frontier_risk, response.frontier_return)?,
        allocation,
        metrics,
    })
}

fn series(
    name: &str,
    risk: Vec<f64>,
    expected_return: Vec<f64>,
) -> Result<Option<RiskReturnSeries>, CallError> {
    if risk.len() != expected_return.len() {
        return Err(CallError::SchemaMismatch(format!(
            "{} has {} risk values but {} return values",
            name,
            risk.len(),
            expected_return.len()
        )));
    }
    if risk.is_empty() {
        return Ok(None);
    }
    Ok(Some(RiskReturnSeries { risk, expected_return }))
}

fn artifact(kind: ArtifactKind, image_path: String) -> Result<FrontierArtifact, CallError> {
    if image_path.trim().is_empty() {
        return Err(CallError::Payload("image_path is empty".to_string()));
    }
    Ok(FrontierArtifact { kind, uri: image_path })
}

/// Renders the portfolios once so a bad response fails its own call, not the merged table.
fn checked_portfolios(
    tickers: &[String],
    rows: &[PortfolioKind],
    portfolios: PortfolioResults,
) -> Result<PortfolioResults, CallError> {
    renderer::build_portfolio_table(tickers, &portfolios, rows).map_err(render_failure)?;
    Ok(portfolios)
}

fn frontier_output(
    tickers: &[String],
    rows: &[PortfolioKind],
    mut response: FrontierResponse,
) -> Result<FrontierOutput, CallError> {
    let chart = response
        .image_path
        .take()
        .map(|path| artifact(ArtifactKind::EfficientFrontier, path))
        .transpose()?;
    let portfolios = checked_portfolios(tickers, rows, response.into_results())?;
    if chart.is_none() && portfolios.is_empty() {
        return Err(CallError::Payload(
            "frontier response has neither an image_path nor portfolios".to_string(),
        ));
    }
    Ok(FrontierOutput { chart, portfolios })
}
