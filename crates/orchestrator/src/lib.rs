use crate::dispatch::{CallContext, run_call};
use api_client::error::CallError;
use api_client::{AnalysisApi, AnalysisPayload};
use configuration::OrchestratorSettings;
use core_types::{Action, AnalysisRequest, PortfolioKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Instrument;

pub mod call;
mod dispatch;
pub mod display;
pub mod error;
pub mod session;

// --- Public API ---
pub use call::{
    BaselineMetrics, CallName, CallOutcome, Contribution, FrontierOutput, OptimizationSummary,
    PortfolioResults, RiskReturnSeries,
};
pub use display::{CallFailure, DISCLAIMER, DisplayState};
pub use error::SessionError;
pub use session::{Applied, Session};

/// The calls started for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub sequence: u64,
    pub calls: Vec<CallName>,
}

/// Dispatches the remote calls of each submission and collects their outcomes.
///
/// Calls run as tasks on the current runtime and report back through a channel.
/// Every outcome carries the sequence number of its submission; nothing is
/// cancelled when a newer submission starts, so consumers must compare the
/// tag against `current_sequence` before applying an outcome.
pub struct RequestOrchestrator {
    api: Arc<dyn AnalysisApi>,
    settings: OrchestratorSettings,
    table_rows: Arc<[PortfolioKind]>,
    call_timeout: Duration,
    sequence: u64,
    outcome_tx: mpsc::UnboundedSender<CallOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<CallOutcome>,
}

impl RequestOrchestrator {
    pub fn new(
        api: Arc<dyn AnalysisApi>,
        settings: OrchestratorSettings,
        table_rows: Vec<PortfolioKind>,
        call_timeout: Duration,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            api,
            settings,
            table_rows: table_rows.into(),
            call_timeout,
            sequence: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Sequence number of the latest submission. Zero before the first one.
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_current(&self, outcome: &CallOutcome) -> bool {
        outcome.sequence == self.sequence
    }

    /// Row order of the portfolio table.
    pub fn table_rows(&self) -> &[PortfolioKind] {
        &self.table_rows
    }

    /// The call chains for an action. Chains run concurrently; calls within a chain run in order.
    pub fn plan(&self, action: Action) -> Vec<Vec<CallName>> {
        match action {
            Action::Baseline if self.settings.sequence_cumulative_after_baseline => {
                vec![vec![CallName::Baseline, CallName::CumulativeChart]]
            }
            Action::Baseline => vec![vec![CallName::Baseline], vec![CallName::CumulativeChart]],
            Action::Optimize => vec![
                vec![CallName::Summary],
                vec![CallName::FrontierChart],
                vec![CallName::PortfolioTable],
            ],
        }
    }

    /// Starts every call for `request` under a fresh sequence number.
    ///
    /// Must be called from within a Tokio runtime. A chained call runs after its
    /// predecessor whether or not the predecessor succeeded.
    pub fn submit(&mut self, request: &AnalysisRequest) -> Dispatch {
        self.sequence += 1;
        let sequence = self.sequence;
        let ctx = CallContext {
            api: Arc::clone(&self.api),
            payload: Arc::new(AnalysisPayload::from(request)),
            table_rows: Arc::clone(&self.table_rows),
            call_timeout: self.call_timeout,
        };

        let plan = self.plan(request.action);
        tracing::info!(
            sequence,
            action = %request.action,
            tickers = ?request.tickers,
            range = %request.date_range,
            "Dispatching analysis submission."
        );

        for chain in &plan {
            let ctx = ctx.clone();
            let chain = chain.clone();
            let tx = self.outcome_tx.clone();
            let span = tracing::info_span!("submission", sequence);
            tokio::spawn(
                async move {
                    for call in chain {
                        tracing::debug!(%call, endpoint = call.endpoint(), "Call started.");
                        // Each call runs in its own task so a panic still yields an outcome.
                        let call_ctx = ctx.clone();
                        let handle = tokio::spawn(
                            async move { run_call(&call_ctx, call).await }
                                .instrument(tracing::Span::current()),
                        );
                        let result = match handle.await {
                            Ok(result) => result,
                            Err(e) => Err(CallError::Aborted(e.to_string())),
                        };
                        if let Err(e) = &result {
                            tracing::warn!(%call, error = %e, "Call failed.");
                        }
                        if tx.send(CallOutcome { sequence, call, result }).is_err() {
                            // Orchestrator is gone; nobody is left to render anything.
                            break;
                        }
                    }
                }
                .instrument(span),
            );
        }

        Dispatch {
            sequence,
            calls: plan.concat(),
        }
    }

    /// Waits for the next outcome of any submission, current or stale.
    pub async fn next_outcome(&mut self) -> Option<CallOutcome> {
        self.outcome_rx.recv().await
    }
}
