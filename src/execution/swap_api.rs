//! Quote and transaction-build service (Raydium trade API)

use std::fmt::Display;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{RAYDIUM_API_HOST, RAYDIUM_PRIORITY_FEE_PATH, RAYDIUM_SWAP_HOST};
use crate::errors::{Error, Result};

use super::types::TxVersion;

/// Which priority-fee estimate to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    /// Very high
    #[default]
    Vh,
    /// High
    H,
    /// Medium
    M,
}

/// Priority fee estimates in micro-lamports per compute unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PriorityFee {
    pub vh: u64,
    pub h: u64,
    pub m: u64,
}

impl PriorityFee {
    pub fn at(&self, level: PriorityLevel) -> u64 {
        match level {
            PriorityLevel::Vh => self.vh,
            PriorityLevel::H => self.h,
            PriorityLevel::M => self.m,
        }
    }
}

/// Parameters of a quote request
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteParams {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16,
    pub tx_version: TxVersion,
}

/// One hop of the quoted route
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHop {
    pub pool_id: String,
    pub input_mint: String,
    pub output_mint: String,
    #[serde(default)]
    pub fee_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteData {
    input_amount: String,
    output_amount: String,
    other_amount_threshold: String,
    #[serde(default)]
    price_impact_pct: f64,
    #[serde(default)]
    route_plan: Vec<RouteHop>,
}

/// A swap quote. `raw` is the untouched service response, which has to be
/// echoed back verbatim when requesting the transactions.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub raw: Value,
    pub input_amount: u64,
    pub output_amount: u64,
    /// Minimum output after slippage
    pub other_amount_threshold: u64,
    pub price_impact_pct: f64,
    pub route: Vec<RouteHop>,
}

impl SwapQuote {
    /// Parse a compute response, rejecting `success: false`
    pub fn from_response(raw: Value) -> Result<Self> {
        check_success(&raw)?;
        let data: QuoteData = serde_json::from_value(raw.get("data").cloned().unwrap_or(Value::Null))
            .map_err(quote_err)?;
        Ok(Self {
            input_amount: parse_amount("inputAmount", &data.input_amount)?,
            output_amount: parse_amount("outputAmount", &data.output_amount)?,
            other_amount_threshold: parse_amount("otherAmountThreshold", &data.other_amount_threshold)?,
            price_impact_pct: data.price_impact_pct,
            route: data.route_plan,
            raw,
        })
    }
}

/// Body of the transaction-build request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub compute_unit_price_micro_lamports: String,
    pub swap_response: Value,
    pub tx_version: TxVersion,
    pub wallet: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_account: Option<String>,
}

/// Quote/build service. All three calls are read-only from the chain's point of view.
#[async_trait]
pub trait SwapApi: Send + Sync {
    async fn priority_fee(&self) -> Result<PriorityFee>;

    async fn quote(&self, params: &QuoteParams) -> Result<SwapQuote>;

    /// Unsigned base64 wire transactions, in execution order
    async fn build_transactions(&self, request: &BuildRequest) -> Result<Vec<String>>;
}

fn quote_err(err: impl Display) -> Error {
    Error::QuoteBuild(err.to_string())
}

fn parse_amount(field: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| Error::QuoteBuild(format!("{} '{}': {}", field, value, e)))
}

fn check_success(raw: &Value) -> Result<()> {
    if raw.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let msg = raw
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("unsuccessful response");
    Err(Error::QuoteBuild(msg.to_string()))
}

// ============================================================================
// Raydium Implementation
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeeEnvelope {
    data: FeeData,
}

#[derive(Debug, Deserialize)]
struct FeeData {
    default: PriorityFee,
}

#[derive(Debug, Deserialize)]
struct BuiltTransaction {
    transaction: String,
}

/// Raydium trade API client
pub struct RaydiumSwapApi {
    http: reqwest::Client,
    swap_host: String,
    api_host: String,
}

impl RaydiumSwapApi {
    pub fn new(http: reqwest::Client, swap_host: impl Into<String>, api_host: impl Into<String>) -> Self {
        Self {
            http,
            swap_host: swap_host.into().trim_end_matches('/').to_string(),
            api_host: api_host.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(quote_err)?;
        let status = response.status();
        let body: Value = response.json().await.map_err(quote_err)?;
        if !status.is_success() {
            return Err(Error::QuoteBuild(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }
}

impl Default for RaydiumSwapApi {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), RAYDIUM_SWAP_HOST, RAYDIUM_API_HOST)
    }
}

#[async_trait]
impl SwapApi for RaydiumSwapApi {
    async fn priority_fee(&self) -> Result<PriorityFee> {
        let url = format!("{}{}", self.api_host, RAYDIUM_PRIORITY_FEE_PATH);
        let body = self.get_json(self.http.get(url)).await?;
        check_success(&body)?;
        let envelope: FeeEnvelope = serde_json::from_value(body).map_err(quote_err)?;
        debug!("Priority fee estimate: {:?}", envelope.data.default);
        Ok(envelope.data.default)
    }

    async fn quote(&self, params: &QuoteParams) -> Result<SwapQuote> {
        let url = format!("{}/compute/swap-base-in", self.swap_host);
        let query = [
            ("inputMint", params.input_mint.clone()),
            ("outputMint", params.output_mint.clone()),
            ("amount", params.amount.to_string()),
            ("slippageBps", params.slippage_bps.to_string()),
            ("txVersion", params.tx_version.as_str().to_string()),
        ];
        let body = self.get_json(self.http.get(url).query(&query)).await?;
        SwapQuote::from_response(body)
    }

    async fn build_transactions(&self, request: &BuildRequest) -> Result<Vec<String>> {
        let url = format!("{}/transaction/swap-base-in", self.swap_host);
        let body = self.get_json(self.http.post(url).json(request)).await?;
        check_success(&body)?;
        let built: Vec<BuiltTransaction> =
            serde_json::from_value(body.get("data").cloned().unwrap_or(Value::Null)).map_err(quote_err)?;
        Ok(built.into_iter().map(|tx| tx.transaction).collect())
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Scriptable quote/build service for tests
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MockSwapApi {
        pub fee: PriorityFee,
        pub transactions: Mutex<Vec<String>>,
        pub quotes: Mutex<Vec<QuoteParams>>,
        pub builds: Mutex<Vec<BuildRequest>>,
        pub fail_quote: Mutex<bool>,
        pub fail_build: Mutex<bool>,
    }

    impl MockSwapApi {
        pub fn new(transactions: Vec<String>) -> Self {
            Self {
                fee: PriorityFee { vh: 1_000_000, h: 500_000, m: 100_000 },
                transactions: Mutex::new(transactions),
                quotes: Mutex::new(Vec::new()),
                builds: Mutex::new(Vec::new()),
                fail_quote: Mutex::new(false),
                fail_build: Mutex::new(false),
            }
        }

        pub fn set_fail_quote(&self, fail: bool) {
            *self.fail_quote.lock().unwrap() = fail;
        }

        pub fn set_fail_build(&self, fail: bool) {
            *self.fail_build.lock().unwrap() = fail;
        }

        pub fn quote_response(params: &QuoteParams) -> Value {
            serde_json::json!({
                "id": "mock",
                "success": true,
                "version": "V1",
                "data": {
                    "swapType": "BaseIn",
                    "inputMint": params.input_mint,
                    "inputAmount": params.amount.to_string(),
                    "outputMint": params.output_mint,
                    "outputAmount": params.amount.saturating_mul(2).to_string(),
                    "otherAmountThreshold": params.amount.to_string(),
                    "slippageBps": params.slippage_bps,
                    "priceImpactPct": 0.25,
                    "routePlan": [{
                        "poolId": "pool",
                        "inputMint": params.input_mint,
                        "outputMint": params.output_mint,
                        "feeMint": params.input_mint,
                        "feeRate": 25,
                        "feeAmount": "10"
                    }]
                }
            })
        }
    }

    #[async_trait]
    impl SwapApi for MockSwapApi {
        async fn priority_fee(&self) -> Result<PriorityFee> {
            Ok(self.fee)
        }

        async fn quote(&self, params: &QuoteParams) -> Result<SwapQuote> {
            self.quotes.lock().unwrap().push(params.clone());
            if *self.fail_quote.lock().unwrap() {
                return Err(Error::QuoteBuild("Mock quote failure".into()));
            }
            SwapQuote::from_response(Self::quote_response(params))
        }

        async fn build_transactions(&self, request: &BuildRequest) -> Result<Vec<String>> {
            self.builds.lock().unwrap().push(request.clone());
            if *self.fail_build.lock().unwrap() {
                return Err(Error::QuoteBuild("Mock build failure".into()));
            }
            Ok(self.transactions.lock().unwrap().clone())
        }
    }
}
