//! Ledger reads - enables mocking for tests

use std::str::FromStr;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{Error, Result};

use super::types::TokenAmount;

/// Read-only ledger operations used by the price feed and execution pipeline
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Raw account data, `None` if the account does not exist
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Balance of an SPL token account
    async fn token_account_balance(&self, account: &Pubkey) -> Result<TokenAmount>;

    /// First token account owned by `owner` for `mint`
    async fn find_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<Pubkey>>;

    /// Native SOL balance in lamports
    async fn sol_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Recent blockhash shared by every transaction of one bundle
    async fn latest_blockhash(&self) -> Result<Hash>;
}

// ============================================================================
// Solana JSON-RPC Implementation
// ============================================================================

/// Ledger backed by a Solana JSON-RPC node
pub struct RpcLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url.into(), commitment),
            commitment,
        }
    }

    /// Parse a commitment name such as `"confirmed"`
    pub fn parse_commitment(name: &str) -> Result<CommitmentConfig> {
        let commitment = CommitmentLevel::from_str(name)
            .map_err(|e| Error::Config(format!("invalid commitment '{}': {}", name, e)))?;
        Ok(CommitmentConfig { commitment })
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn token_account_balance(&self, account: &Pubkey) -> Result<TokenAmount> {
        let balance = self.client.get_token_account_balance(account).await?;
        let amount = balance
            .amount
            .parse::<u64>()
            .map_err(|e| Error::Decode(format!("token amount '{}': {}", balance.amount, e)))?;
        let mut token_amount = TokenAmount::new(amount, balance.decimals);
        if let Some(ui) = balance.ui_amount {
            token_amount.ui_amount = ui;
        }
        Ok(token_amount)
    }

    async fn find_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<Pubkey>> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(*mint))
            .await?;
        accounts
            .first()
            .map(|keyed| {
                Pubkey::from_str(&keyed.pubkey)
                    .map_err(|e| Error::Decode(format!("token account '{}': {}", keyed.pubkey, e)))
            })
            .transpose()
    }

    async fn sol_balance(&self, owner: &Pubkey) -> Result<u64> {
        Ok(self.client.get_balance(owner).await?)
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// In-memory ledger for tests
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockLedger {
        pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
        pub balances: Mutex<HashMap<Pubkey, TokenAmount>>,
        /// Token accounts keyed by mint (single owner)
        pub token_accounts: Mutex<HashMap<Pubkey, Pubkey>>,
        pub lamports: Mutex<u64>,
        pub blockhash: Mutex<Hash>,
        pub blockhash_calls: AtomicUsize,
        pub balance_calls: AtomicUsize,
        pub should_fail: Mutex<bool>,
    }

    impl MockLedger {
        pub fn new() -> Self {
            Self {
                blockhash: Mutex::new(Hash::new_unique()),
                ..Self::default()
            }
        }

        pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
            self.accounts.lock().unwrap().insert(address, data);
        }

        pub fn set_balance(&self, account: Pubkey, amount: TokenAmount) {
            self.balances.lock().unwrap().insert(account, amount);
        }

        pub fn set_token_account(&self, mint: Pubkey, account: Pubkey) {
            self.token_accounts.lock().unwrap().insert(mint, account);
        }

        pub fn set_should_fail(&self, fail: bool) {
            *self.should_fail.lock().unwrap() = fail;
        }

        pub fn blockhash(&self) -> Hash {
            *self.blockhash.lock().unwrap()
        }

        fn check_fail(&self) -> Result<()> {
            if *self.should_fail.lock().unwrap() {
                return Err(Error::Rpc("Mock failure".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Ledger for MockLedger {
        async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
            self.check_fail()?;
            Ok(self.accounts.lock().unwrap().get(address).cloned())
        }

        async fn token_account_balance(&self, account: &Pubkey) -> Result<TokenAmount> {
            self.check_fail()?;
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            self.balances
                .lock()
                .unwrap()
                .get(account)
                .copied()
                .ok_or_else(|| Error::Rpc(format!("could not find account {}", account)))
        }

        async fn find_token_account(&self, _owner: &Pubkey, mint: &Pubkey) -> Result<Option<Pubkey>> {
            self.check_fail()?;
            Ok(self.token_accounts.lock().unwrap().get(mint).copied())
        }

        async fn sol_balance(&self, _owner: &Pubkey) -> Result<u64> {
            self.check_fail()?;
            Ok(*self.lamports.lock().unwrap())
        }

        async fn latest_blockhash(&self) -> Result<Hash> {
            self.check_fail()?;
            self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.blockhash())
        }
    }
}
