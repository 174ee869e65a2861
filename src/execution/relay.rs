//! Bundle relay (Jito block engine)

use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, warn};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;

use crate::consts::MAX_BUNDLE_TRANSACTIONS;
use crate::errors::{Error, Result};

/// Submits bundles for atomic all-or-nothing inclusion
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// One of the relay's tip accounts
    async fn tip_account(&self) -> Result<Pubkey>;

    /// Submit base58 wire transactions as one bundle, returning the bundle id
    async fn send_bundle(&self, transactions: &[String]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T> {
        if let Some(err) = self.error {
            return Err(Error::RelayRejection(format!("{} (code {})", err.message, err.code)));
        }
        self.result
            .ok_or_else(|| Error::RelayRejection("response carried no result".into()))
    }
}

/// JSON-RPC client for a Jito block engine's bundle endpoint
pub struct JitoRelay {
    http: reqwest::Client,
    url: String,
}

impl JitoRelay {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RelayRejection(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::RelayRejection(e.to_string()))?;
        debug!("{} -> HTTP {}: {}", method, status, text);

        let parsed: RpcResponse<T> = serde_json::from_str(&text).map_err(|e| {
            Error::RelayRejection(format!("HTTP {} unreadable response ({}): {}", status, e, text))
        })?;
        parsed.into_result()
    }
}

#[async_trait]
impl BundleRelay for JitoRelay {
    async fn tip_account(&self) -> Result<Pubkey> {
        let accounts: Vec<String> = self.call("getTipAccounts", json!([])).await?;
        let chosen = {
            let mut rng = rand::thread_rng();
            accounts.choose(&mut rng).cloned()
        };
        let chosen = chosen.ok_or_else(|| Error::RelayRejection("relay returned no tip accounts".into()))?;
        Pubkey::from_str(&chosen).map_err(|e| Error::Decode(format!("tip account '{}': {}", chosen, e)))
    }

    async fn send_bundle(&self, transactions: &[String]) -> Result<String> {
        if transactions.is_empty() || transactions.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(Error::RelayRejection(format!(
                "bundle must hold 1..={} transactions, got {}",
                MAX_BUNDLE_TRANSACTIONS,
                transactions.len()
            )));
        }
        match self.call::<String>("sendBundle", json!([transactions])).await {
            Ok(bundle_id) => Ok(bundle_id),
            Err(err) => {
                warn!("Bundle of {} transactions rejected: {}", transactions.len(), err);
                Err(err)
            }
        }
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Recording relay for tests
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MockRelay {
        pub tip_account: Pubkey,
        pub bundles: Mutex<Vec<Vec<String>>>,
        pub tip_requests: Mutex<usize>,
        pub should_reject: Mutex<bool>,
    }

    impl MockRelay {
        pub fn new() -> Self {
            Self {
                tip_account: Pubkey::new_unique(),
                bundles: Mutex::new(Vec::new()),
                tip_requests: Mutex::new(0),
                should_reject: Mutex::new(false),
            }
        }

        pub fn set_should_reject(&self, reject: bool) {
            *self.should_reject.lock().unwrap() = reject;
        }

        pub fn bundle_count(&self) -> usize {
            self.bundles.lock().unwrap().len()
        }
    }

    impl Default for MockRelay {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl BundleRelay for MockRelay {
        async fn tip_account(&self) -> Result<Pubkey> {
            *self.tip_requests.lock().unwrap() += 1;
            Ok(self.tip_account)
        }

        async fn send_bundle(&self, transactions: &[String]) -> Result<String> {
            if *self.should_reject.lock().unwrap() {
                return Err(Error::RelayRejection("Mock rejection".into()));
            }
            let mut bundles = self.bundles.lock().unwrap();
            bundles.push(transactions.to_vec());
            Ok(format!("bundle-{}", bundles.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_becomes_rejection() {
        let response: RpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bundle contains an expired blockhash"}}"#,
        )
        .unwrap();
        match response.into_result() {
            Err(Error::RelayRejection(msg)) => assert!(msg.contains("expired blockhash")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rpc_result_is_bundle_id() {
        let response: RpcResponse<String> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"2id3YC2jgiZpzDmVDn"}"#).unwrap();
        assert_eq!(response.into_result().unwrap(), "2id3YC2jgiZpzDmVDn");
    }

    #[tokio::test]
    async fn test_oversized_bundle_rejected_locally() {
        let relay = JitoRelay::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let txs = vec!["tx".to_string(); MAX_BUNDLE_TRANSACTIONS + 1];
        assert!(matches!(relay.send_bundle(&txs).await, Err(Error::RelayRejection(_))));
        assert!(matches!(relay.send_bundle(&[]).await, Err(Error::RelayRejection(_))));
    }

    #[tokio::test]
    async fn test_mock_relay_records_bundles() {
        let relay = mock::MockRelay::new();
        let id = relay.send_bundle(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(id, "bundle-1");
        assert_eq!(relay.bundles.lock().unwrap()[0].len(), 2);

        relay.set_should_reject(true);
        assert!(relay.send_bundle(&["c".into()]).await.is_err());
        assert_eq!(relay.bundle_count(), 1);
    }
}
