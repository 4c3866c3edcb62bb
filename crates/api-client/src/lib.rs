use crate::error::CallError;
use async_trait::async_trait;
use configuration::ServiceConfig;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::{
    AnalysisPayload, ApiErrorResponse, BaselineResponse, ChartResponse, FrontierResponse,
    OptimizeResponse, PortfolioEntry, PortfolioTableResponse,
};

pub const EQUAL_PATH: &str = "/equal";
pub const OPTIMIZE_PATH: &str = "/optimize";
pub const EFFICIENT_FRONTIER_PATH: &str = "/efficient_frontier";
pub const PORTFOLIO_TABLE_PATH: &str = "/get_portfolio_table";
pub const CUMULATIVE_SUM_PATH: &str = "/cumulative_sum";

/// The abstract interface to the remote portfolio-analysis service.
/// The orchestrator only sees this trait, so the HTTP implementation can be
/// swapped for an in-process double in tests.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Uniform-weight metrics for the tickers over the window.
    async fn equal_weights(&self, payload: &AnalysisPayload) -> Result<BaselineResponse, CallError>;

    /// Optimized weights and the summary figures for named sub-portfolios.
    async fn optimize(&self, payload: &AnalysisPayload) -> Result<OptimizeResponse, CallError>;

    /// Renders the risk/return scatter with the efficient frontier. The service may
    /// also embed the keyed portfolios it plotted.
    async fn efficient_frontier(&self, payload: &AnalysisPayload) -> Result<FrontierResponse, CallError>;

    /// The keyed multi-portfolio breakdown.
    async fn portfolio_table(
        &self,
        payload: &AnalysisPayload,
    ) -> Result<PortfolioTableResponse, CallError>;

    /// Renders the cumulative-performance curve of the most recent computation.
    async fn cumulative_sum(&self) -> Result<ChartResponse, CallError>;
}

/// The `AnalysisApi` implementation that talks JSON over HTTP.
#[derive(Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAnalysisClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, CallError> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(&config.base_url, client)
    }

    /// Uses a preconfigured `reqwest::Client`, e.g. one without proxy lookup.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, CallError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| CallError::Payload(format!("Invalid service URL {}: {}", base_url, e)))?;
        // Endpoints are joined relative to the base, so a path prefix must end in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CallError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| CallError::Payload(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &AnalysisPayload,
    ) -> Result<T, CallError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, tickers = ?payload.tickers, "POST to analysis service.");

        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_body(status, &text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CallError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET from analysis service.");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_body(status, &text)
    }

    /// Turns a service-relative image path into an absolute URI.
    fn resolve_image(&self, image_path: &str) -> Result<String, CallError> {
        self.base_url
            .join(image_path)
            .map(String::from)
            .map_err(|e| CallError::Payload(format!("Invalid image path {}: {}", image_path, e)))
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn equal_weights(&self, payload: &AnalysisPayload) -> Result<BaselineResponse, CallError> {
        self.post(EQUAL_PATH, payload).await
    }

    async fn optimize(&self, payload: &AnalysisPayload) -> Result<OptimizeResponse, CallError> {
        self.post(OPTIMIZE_PATH, payload).await
    }

    async fn efficient_frontier(&self, payload: &AnalysisPayload) -> Result<FrontierResponse, CallError> {
        let mut response: FrontierResponse = self.post(EFFICIENT_FRONTIER_PATH, payload).await?;
        if let Some(path) = response.image_path.take() {
            response.image_path = Some(self.resolve_image(&path)?);
        }
        Ok(response)
    }

    async fn portfolio_table(
        &self,
        payload: &AnalysisPayload,
    ) -> Result<PortfolioTableResponse, CallError> {
        self.post(PORTFOLIO_TABLE_PATH, payload).await
    }

    async fn cumulative_sum(&self) -> Result<ChartResponse, CallError> {
        let chart: ChartResponse = self.get(CUMULATIVE_SUM_PATH).await?;
        Ok(ChartResponse {
            image_path: self.resolve_image(&chart.image_path)?,
        })
    }
}

/// Decodes a response body.
///
/// A body carrying a non-null `error` field is a failure whatever the status; a
/// non-success status is a failure whatever the body.
pub fn decode_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, CallError> {
    let body: Option<Value> = serde_json::from_str(text).ok();
    let reported = body.as_ref().and_then(reported_error);

    if !status.is_success() {
        return Err(CallError::Http {
            status: status.as_u16(),
            message: reported.unwrap_or_else(|| text.to_string()),
        });
    }
    if let Some(message) = reported {
        return Err(CallError::Payload(message));
    }

    let body = body.ok_or_else(|| CallError::Payload(format!("Response is not JSON: {}", text)))?;
    serde_json::from_value::<T>(body)
        .map_err(|e| CallError::Payload(format!("Failed to deserialize the API response: {}", e)))
}

fn reported_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(ApiErrorResponse { error: error.clone() }.message())
}
