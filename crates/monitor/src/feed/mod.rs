use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};
use tron_deposit_domain::config::MonitorConfig;
use tron_deposit_domain::TronAddress;

use crate::worker::MonitorError;

mod types;

pub use types::{EventsResponse, RawEvent, RawTransferResult, TransferEvent};

const EVENTS_ENDPOINT: &str = "/v1/contracts/events";
const API_KEY_HEADER: &str = "tron-pro-api-key";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { status: Option<u16>, reason: String },
    #[error("upstream payload malformed: {0}")]
    UpstreamMalformed(String),
}

impl FeedError {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            status: None,
            reason: reason.into(),
        }
    }

    /// HTTP status when one was received, `unknown` otherwise.
    pub fn status_label(&self) -> String {
        match self {
            FeedError::UpstreamUnavailable {
                status: Some(code), ..
            } => code.to_string(),
            FeedError::UpstreamUnavailable { status: None, .. } => "unknown".to_string(),
            FeedError::UpstreamMalformed(_) => "malformed".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::UpstreamUnavailable { .. } => "unavailable",
            FeedError::UpstreamMalformed(_) => "malformed",
        }
    }
}

/// Ledger feed returning the most recent confirmed transfers of one asset,
/// newest first.
#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn fetch_page(&self, contract: &TronAddress) -> Result<Vec<TransferEvent>, FeedError>;
}

/// TronGrid `/v1/contracts/{contract}/events` client.
pub struct TronGridClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl TronGridClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        page_size: u32,
        request_timeout: Duration,
    ) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|err| MonitorError::Client(format!("invalid api key header: {err}")))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|err| MonitorError::Client(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        Self::new(
            config.tron_node_url(),
            config.tron_api_key(),
            config.page_size(),
            config.fetch_timeout(),
        )
    }

    fn events_url(&self, contract: &TronAddress) -> String {
        format!("{}/v1/contracts/{}/events", self.base_url, contract)
    }
}

#[async_trait]
impl TransferSource for TronGridClient {
    async fn fetch_page(&self, contract: &TronAddress) -> Result<Vec<TransferEvent>, FeedError> {
        let limit = self.page_size.to_string();
        let response = self
            .http
            .get(self.events_url(contract))
            .query(&[
                ("event_name", "Transfer"),
                ("only_confirmed", "true"),
                ("limit", limit.as_str()),
                ("order_by", "block_timestamp,desc"),
            ])
            .send()
            .await
            .map_err(|err| FeedError::UpstreamUnavailable {
                status: err.status().map(|status| status.as_u16()),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                reason: format!("unexpected http status {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FeedError::unavailable(err.to_string()))?;
        decode_events(&body)
    }
}

pub(crate) fn decode_events(body: &[u8]) -> Result<Vec<TransferEvent>, FeedError> {
    let parsed: EventsResponse = serde_json::from_slice(body)
        .map_err(|err| FeedError::UpstreamMalformed(err.to_string()))?;

    if parsed.success == Some(false) {
        return Err(FeedError::unavailable(
            parsed
                .error
                .unwrap_or_else(|| "upstream reported success=false".to_string()),
        ));
    }

    let data = parsed
        .data
        .ok_or_else(|| FeedError::UpstreamMalformed("response has no `data` field".into()))?;
    Ok(data.into_iter().map(TransferEvent::from).collect())
}

/// Fetches one page under a bounded timeout and reports latency and status.
/// Failures are logged and counted, then surface as an empty page: the next
/// cycle retries naturally.
pub async fn fetch_recent_transfers<S>(
    source: &S,
    contract: &TronAddress,
    fetch_timeout: Duration,
) -> Vec<TransferEvent>
where
    S: TransferSource + ?Sized,
{
    let started = Instant::now();
    let result = match timeout(fetch_timeout, source.fetch_page(contract)).await {
        Ok(result) => result,
        Err(_) => Err(FeedError::unavailable(format!(
            "timed out after {}ms",
            fetch_timeout.as_millis()
        ))),
    };
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(events) => {
            histogram!(
                "api_latency_seconds",
                "method" => "GET",
                "endpoint" => EVENTS_ENDPOINT,
                "status" => "success"
            )
            .record(elapsed);
            counter!("monitor_fetch_total", "result" => "ok").increment(1);
            if events.is_empty() {
                debug!("no new events found");
            }
            events
        }
        Err(err) => {
            histogram!(
                "api_latency_seconds",
                "method" => "GET",
                "endpoint" => EVENTS_ENDPOINT,
                "status" => err.status_label()
            )
            .record(elapsed);
            counter!("monitor_fetch_total", "result" => err.kind()).increment(1);
            warn!(error = %err, "failed to fetch transfer events");
            Vec::new()
        }
    }
}
