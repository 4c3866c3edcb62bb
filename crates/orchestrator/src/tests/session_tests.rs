use super::*;
use api_client::error::CallError;
use api_client::{
    AnalysisPayload, BaselineResponse, ChartResponse, FrontierResponse, OptimizeResponse,
    PortfolioEntry, PortfolioTableResponse,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

const TICKERS: [&str; 4] = ["AAPL", "MSFT", "GOOG", "AMZN"];

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    call: CallName,
    payload: Option<AnalysisPayload>,
}

/// An in-process analysis service with scripted latency and failures.
#[derive(Default)]
struct ScriptedApi {
    delays: HashMap<CallName, Duration>,
    /// Extra latency for every call whose payload starts with this ticker.
    slow_first_ticker: Option<(&'static str, Duration)>,
    failures: HashMap<CallName, &'static str>,
    panics: HashSet<CallName>,
    short_weights: HashSet<CallName>,
    /// Overrides the max-Sharpe return of the table call.
    max_sharpe_return: Option<f64>,
    /// The table call leaves out the normal portfolio.
    table_without_normal: bool,
    /// The frontier call embeds every keyed portfolio, with distinct returns.
    frontier_portfolios: bool,
    frontier_without_image: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    fn failing(call: CallName, message: &'static str) -> Self {
        let mut api = Self::default();
        api.failures.insert(call, message);
        api
    }

    fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: CallName, payload: Option<&AnalysisPayload>) -> Result<usize, CallError> {
        self.calls.lock().unwrap().push(RecordedCall {
            call,
            payload: payload.cloned(),
        });

        let mut delay = self.delays.get(&call).copied().unwrap_or(Duration::from_millis(10));
        if let (Some((ticker, extra)), Some(payload)) = (self.slow_first_ticker, payload) {
            if payload.tickers.first().map(String::as_str) == Some(ticker) {
                delay += extra;
            }
        }
        tokio::time::sleep(delay).await;

        if self.panics.contains(&call) {
            panic!("{call} handler crashed");
        }
        if let Some(message) = self.failures.get(&call) {
            return Err(CallError::Payload(message.to_string()));
        }
        let n = payload.map_or(0, |p| p.tickers.len());
        Ok(if self.short_weights.contains(&call) { n - 1 } else { n })
    }
}

fn weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

fn entry(expected_return: f64, n: usize) -> PortfolioEntry {
    PortfolioEntry {
        expected_return,
        risk: 0.2,
        weights: weights(n),
    }
}

#[async_trait]
impl AnalysisApi for ScriptedApi {
    async fn equal_weights(&self, payload: &AnalysisPayload) -> Result<BaselineResponse, CallError> {
        let n = self.respond(CallName::Baseline, Some(payload)).await?;
        Ok(BaselineResponse {
            weights: weights(n),
            expected_return: 0.0008,
            risk: 0.013,
        })
    }

    async fn optimize(&self, payload: &AnalysisPayload) -> Result<OptimizeResponse, CallError> {
        let n = self.respond(CallName::Summary, Some(payload)).await?;
        Ok(OptimizeResponse {
            weights: weights(n),
            expected_return: 0.001,
            risk: 0.012,
            max_sharpe_ratio_return: 0.0015,
            max_sharpe_ratio_risk: 0.014,
            min_volatility_return: 0.0009,
            min_volatility_risk: 0.011,
            portfolios_risk: vec![0.012, 0.015],
            portfolios_return: vec![0.001, 0.0013],
            frontier_risk: Vec::new(),
            frontier_return: Vec::new(),
        })
    }

    async fn efficient_frontier(&self, payload: &AnalysisPayload) -> Result<FrontierResponse, CallError> {
        let n = self.respond(CallName::FrontierChart, Some(payload)).await?;
        let mut response = FrontierResponse::default();
        if !self.frontier_without_image {
            response.image_path = Some("http://127.0.0.1:5000/static/efficient_frontier.png".to_string());
        }
        if self.frontier_portfolios {
            response.normal_portfolio = Some(entry(0.11, n));
            response.max_sharpe = Some(entry(0.99, n));
            response.min_volatility = Some(entry(0.04, n));
            response.max_return = Some(entry(0.35, n));
        }
        Ok(response)
    }

    async fn portfolio_table(
        &self,
        payload: &AnalysisPayload,
    ) -> Result<PortfolioTableResponse, CallError> {
        let n = self.respond(CallName::PortfolioTable, Some(payload)).await?;
        Ok(PortfolioTableResponse {
            normal_portfolio: (!self.table_without_normal).then(|| entry(0.1, n)),
            max_sharpe: entry(self.max_sharpe_return.unwrap_or(0.2), n),
            min_volatility: entry(0.05, n),
            max_return: entry(0.3, n),
        })
    }

    async fn cumulative_sum(&self) -> Result<ChartResponse, CallError> {
        self.respond(CallName::CumulativeChart, None).await?;
        Ok(ChartResponse {
            image_path: "http://127.0.0.1:5000/static/cumulative_sum.png".to_string(),
        })
    }
}

fn config() -> Config {
    configuration::parse_config(
        r#"
        [service]
        base_url = "http://127.0.0.1:5000"
        call_timeout = "30s"

        [[catalog]]
        identifier = "AAPL"
        label = "Apple Inc. (AAPL)"

        [[catalog]]
        identifier = "MSFT"
        label = "Microsoft Corporation (MSFT)"

        [[catalog]]
        identifier = "GOOG"
        label = "Alphabet Inc. (GOOG)"

        [[catalog]]
        identifier = "AMZN"
        label = "Amazon.com, Inc. (AMZN)"

        [[catalog]]
        identifier = "NVDA"
        label = "NVIDIA Corporation (NVDA)"
        "#,
    )
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 30)
}

fn session_with(api: Arc<ScriptedApi>) -> Session {
    let mut session = Session::new(&config(), api);
    for ticker in TICKERS {
        session.add_by_identifier(ticker).unwrap();
    }
    session
}

fn submit(session: &mut Session, action: Action) -> u64 {
    session
        .submit_as_of(today(), date(2020, 1, 1), date(2021, 6, 1), action)
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn optimize_dispatches_three_calls_with_identical_payload() {
    let api = Arc::new(ScriptedApi::default());
    let mut session = session_with(Arc::clone(&api));

    let sequence = submit(&mut session, Action::Optimize);
    assert_eq!(sequence, 1);
    assert_eq!(session.pending(), 3);
    session.settle().await;

    let recorded = api.recorded();
    assert_eq!(recorded.len(), 3);
    let calls: HashSet<CallName> = recorded.iter().map(|r| r.call).collect();
    assert_eq!(
        calls,
        HashSet::from([CallName::Summary, CallName::FrontierChart, CallName::PortfolioTable])
    );
    let expected = AnalysisPayload {
        tickers: TICKERS.iter().map(|t| t.to_string()).collect(),
        date_range: [date(2020, 1, 1), date(2021, 6, 1)],
    };
    assert!(recorded.iter().all(|r| r.payload.as_ref() == Some(&expected)));

    let display = session.display();
    assert_eq!(display.sequence, 1);
    assert!(display.summary.is_some());
    assert!(display.frontier_chart.is_some());
    assert!(display.failures.is_empty());
    assert!(display.disclaimer().is_some());
    let table = display.portfolio_table.as_ref().unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.column_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn frontier_failure_does_not_block_the_table() {
    let api = Arc::new(ScriptedApi::failing(CallName::FrontierChart, "plotting failed"));
    let mut session = session_with(api);

    submit(&mut session, Action::Optimize);
    session.settle().await;

    let display = session.display();
    assert!(display.frontier_chart.is_none());
    assert!(display.failure(CallName::FrontierChart).unwrap().message.contains("plotting failed"));
    let table = display.portfolio_table.as_ref().unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.cell(0, "AAPL Weight (%)"), Some("25.00"));
    assert!(display.summary.is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_call_times_out_alone() {
    let mut api = ScriptedApi::default();
    api.delays.insert(CallName::PortfolioTable, Duration::from_secs(120));
    let mut session = session_with(Arc::new(api));

    submit(&mut session, Action::Optimize);
    session.settle().await;

    let display = session.display();
    assert!(display.portfolio_table.is_none());
    let failure = display.failure(CallName::PortfolioTable).unwrap();
    assert!(failure.message.contains("30s"));
    assert!(display.is_rendered(CallName::Summary));
    assert!(display.is_rendered(CallName::FrontierChart));
}

#[tokio::test(start_paused = true)]
async fn mismatched_weights_fail_only_that_call() {
    let mut api = ScriptedApi::default();
    api.short_weights.insert(CallName::PortfolioTable);
    let mut session = session_with(Arc::new(api));

    submit(&mut session, Action::Optimize);
    session.settle().await;

    let display = session.display();
    assert!(display.portfolio_table.is_none());
    assert!(display.failure(CallName::PortfolioTable).unwrap().message.contains("3 weights for 4 tickers"));
    assert!(display.summary.is_some());
}

#[tokio::test(start_paused = true)]
async fn baseline_chart_follows_a_failed_baseline() {
    let api = Arc::new(ScriptedApi::failing(CallName::Baseline, "no prices"));
    let mut session = session_with(Arc::clone(&api));

    submit(&mut session, Action::Baseline);
    assert_eq!(session.pending(), 2);
    session.settle().await;

    let order: Vec<CallName> = api.recorded().iter().map(|r| r.call).collect();
    assert_eq!(order, vec![CallName::Baseline, CallName::CumulativeChart]);
    let display = session.display();
    assert!(display.baseline.is_none());
    assert!(display.cumulative_chart.is_some());
    assert!(display.summary.is_none() && display.portfolio_table.is_none());
}

#[tokio::test(start_paused = true)]
async fn older_submission_is_discarded_when_it_lands_late() {
    let mut api = ScriptedApi::default();
    api.slow_first_ticker = Some(("AAPL", Duration::from_secs(5)));
    let mut session = session_with(Arc::new(api));

    let first = submit(&mut session, Action::Optimize);
    session.remove("AAPL");
    session.add_by_identifier("NVDA").unwrap();
    let second = submit(&mut session, Action::Optimize);
    assert_eq!((first, second), (1, 2));

    session.settle().await;
    let rendered = session.display().clone();
    assert_eq!(rendered.sequence, 2);
    assert_eq!(rendered.tickers, vec!["MSFT", "GOOG", "AMZN", "NVDA"]);
    assert_eq!(rendered.portfolio_table.as_ref().unwrap().headers[6], "NVDA Weight (%)");

    for _ in 0..3 {
        let event = session.next_event().await.unwrap();
        assert!(matches!(event, Applied::Stale { sequence: 1, .. }));
    }
    assert_eq!(session.display(), &rendered);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_submissions_only_render_the_latest() {
    let api = Arc::new(ScriptedApi::default());
    let mut session = session_with(api);

    submit(&mut session, Action::Baseline);
    submit(&mut session, Action::Optimize);

    let mut stale = 0;
    while session.pending() > 0 || stale < 2 {
        match session.next_event().await.unwrap() {
            Applied::Stale { sequence, .. } => {
                assert_eq!(sequence, 1);
                stale += 1;
            }
            Applied::Rendered { sequence, .. } => assert_eq!(sequence, 2),
            Applied::Failed { call, .. } => panic!("{call} failed"),
        }
    }

    let display = session.display();
    assert!(display.baseline.is_none());
    assert!(display.cumulative_chart.is_none());
    assert!(display.summary.is_some());
}

#[tokio::test]
async fn invalid_window_sends_nothing() {
    let api = Arc::new(ScriptedApi::default());
    let mut session = session_with(Arc::clone(&api));

    let err = session
        .submit_as_of(today(), date(2021, 6, 1), date(2020, 1, 1), Action::Optimize)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(validator::error::ValidationError::StartAfterEnd { .. })
    ));

    let err = session
        .submit_as_of(today(), date(2024, 5, 1), date(2024, 6, 1), Action::Optimize)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(validator::error::ValidationError::SpanTooShort { .. })
    ));

    assert_eq!(session.current_sequence(), 0);
    assert_eq!(session.date_range(), None);
    assert!(api.recorded().is_empty());
}

#[tokio::test]
async fn optimize_needs_an_actionable_selection() {
    let api = Arc::new(ScriptedApi::default());
    let mut session = Session::new(&config(), Arc::clone(&api) as Arc<dyn AnalysisApi>);

    let err = session
        .submit_as_of(today(), date(2020, 1, 1), date(2021, 1, 1), Action::Baseline)
        .unwrap_err();
    assert_eq!(err, SessionError::EmptySelection);

    for ticker in &TICKERS[..3] {
        session.add_by_identifier(ticker).unwrap();
    }
    let err = session
        .submit_as_of(today(), date(2020, 1, 1), date(2021, 1, 1), Action::Optimize)
        .unwrap_err();
    assert!(matches!(err, SessionError::NotActionable { size: 3, .. }));
    assert_eq!(err.to_string(), "Optimization needs between 4 and 10 instruments, 3 selected");
    assert!(api.recorded().is_empty());
}

#[tokio::test(start_paused = true)]
async fn baseline_runs_with_a_small_selection() {
    let api = Arc::new(ScriptedApi::default());
    let mut session = Session::new(&config(), Arc::clone(&api) as Arc<dyn AnalysisApi>);
    session.add_by_identifier("MSFT").unwrap();
    session.add_by_identifier("GOOG").unwrap();

    submit(&mut session, Action::Baseline);
    session.settle().await;

    let baseline = session.display().baseline.as_ref().unwrap();
    assert_eq!(baseline.weights, vec![0.5, 0.5]);
    assert_eq!(baseline.table.cell(0, "GOOG Weight (%)"), Some("50.00"));
    assert_eq!(session.date_range().map(|r| r.end()), Some(date(2021, 6, 1)));
}

#[tokio::test]
async fn concurrent_baseline_plan_splits_the_chain() {
    let mut config = config();
    config.orchestrator.sequence_cumulative_after_baseline = false;
    let orchestrator = RequestOrchestrator::new(
        Arc::new(ScriptedApi::default()),
        config.orchestrator,
        config.table.rows.clone(),
        config.service.call_timeout,
    );

    assert_eq!(
        orchestrator.plan(Action::Baseline),
        vec![vec![CallName::Baseline], vec![CallName::CumulativeChart]]
    );
    assert_eq!(orchestrator.plan(Action::Optimize).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn frontier_supplies_the_normal_row_the_table_lacks() {
    let mut api = ScriptedApi::default();
    api.table_without_normal = true;
    api.frontier_portfolios = true;
    let mut session = session_with(Arc::new(api));

    submit(&mut session, Action::Optimize);
    session.settle().await;

    let display = session.display();
    assert!(display.frontier_chart.is_some());
    let table = display.portfolio_table.as_ref().unwrap();
    let kinds: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(kinds, vec!["Normal Portfolio", "Max Sharpe Ratio", "Min Volatility", "Max Return"]);
    // Normal comes from the frontier call; the table call wins for the rest.
    assert_eq!(table.cell(0, "Expected Return (%)"), Some("11.00"));
    assert_eq!(table.cell(1, "Expected Return (%)"), Some("20.00"));
}

#[tokio::test(start_paused = true)]
async fn frontier_portfolios_alone_render_the_table() {
    let mut api = ScriptedApi::failing(CallName::PortfolioTable, "table unavailable");
    api.frontier_portfolios = true;
    api.frontier_without_image = true;
    let mut session = session_with(Arc::new(api));

    submit(&mut session, Action::Optimize);
    session.settle().await;

    let display = session.display();
    assert!(display.frontier_chart.is_none());
    assert!(display.failure(CallName::FrontierChart).is_none());
    assert!(display.failure(CallName::PortfolioTable).is_some());
    let table = display.portfolio_table.as_ref().unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.cell(1, "Expected Return (%)"), Some("99.00"));
}

#[tokio::test(start_paused = true)]
async fn oversized_value_fails_the_call_and_settles() {
    let mut api = ScriptedApi::default();
    api.max_sharpe_return = Some(1e27);
    let mut session = session_with(Arc::new(api));

    submit(&mut session, Action::Optimize);
    tokio::time::timeout(Duration::from_secs(60), session.settle())
        .await
        .expect("settle must finish");

    assert_eq!(session.pending(), 0);
    let display = session.display();
    assert!(display.portfolio_table.is_none());
    assert!(display.failure(CallName::PortfolioTable).unwrap().message.contains("too large"));
    assert!(display.summary.is_some());
}

#[tokio::test(start_paused = true)]
async fn crashed_call_is_reported_and_the_chain_continues() {
    let mut api = ScriptedApi::default();
    api.panics.insert(CallName::Baseline);
    let api = Arc::new(api);
    let mut session = session_with(Arc::clone(&api));

    submit(&mut session, Action::Baseline);
    tokio::time::timeout(Duration::from_secs(60), session.settle())
        .await
        .expect("settle must finish");

    let display = session.display();
    assert!(display.baseline.is_none());
    assert!(display.failure(CallName::Baseline).unwrap().message.contains("aborted"));
    assert!(display.cumulative_chart.is_some());
    let order: Vec<CallName> = api.recorded().iter().map(|r| r.call).collect();
    assert_eq!(order, vec![CallName::Baseline, CallName::CumulativeChart]);
}
