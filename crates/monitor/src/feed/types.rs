use serde::Deserialize;

/// One transfer as reported by the ledger feed. Lives only for a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub tx_hash: String,
    /// Raw hex destination as emitted by the feed.
    pub to_address: Option<String>,
    /// Amount in the token's smallest unit. Unparseable values decode to 0 so
    /// the recorder rejects them as invalid.
    pub amount: u64,
    pub block_number: Option<u64>,
    pub block_timestamp: Option<i64>,
}

/// `GET /v1/contracts/{contract}/events` response body.
#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<RawEvent>>,
}

#[derive(Debug, Deserialize)]
pub struct RawEvent {
    pub transaction_id: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_timestamp: Option<i64>,
    #[serde(default)]
    pub result: Option<RawTransferResult>,
}

/// Decoded `Transfer(from, to, value)` arguments. TronGrid also repeats them
/// under positional keys, which are ignored.
#[derive(Debug, Deserialize, Default)]
pub struct RawTransferResult {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl From<RawEvent> for TransferEvent {
    fn from(raw: RawEvent) -> Self {
        let result = raw.result.unwrap_or_default();
        Self {
            tx_hash: raw.transaction_id,
            to_address: result.to.filter(|to| !to.trim().is_empty()),
            amount: parse_amount(result.value.as_deref()),
            block_number: raw.block_number,
            block_timestamp: raw.block_timestamp,
        }
    }
}

fn parse_amount(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}
