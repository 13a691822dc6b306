// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! The wallet provider seam.
//!
//! A `WalletProvider` stands in for the user's wallet: account discovery,
//! transaction submission, message signing, and change notifications.
//! Write transactions always go through the provider so that a user
//! declining to sign is distinguishable from a transport failure.

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// EIP-1193 error code for a user-rejected request.
pub const CODE_USER_REJECTED: i64 = 4001;

/// EIP-1193 error code for a request that is already pending.
pub const CODE_REQUEST_PENDING: i64 = -32002;

/// Parameters for a wallet-submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub gas: u64,
    pub gas_price: u128,
}

/// Asynchronous notifications from the wallet.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The active account list changed; may be empty.
    AccountsChanged(Vec<Address>),
    /// The wallet switched networks.
    ChainChanged(u64),
}

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The user declined the request. Never retried.
    #[error("user rejected the request")]
    UserRejected,

    /// A request is already awaiting user action in the wallet.
    #[error("a wallet request is already pending")]
    RequestPending,

    /// No provider is reachable.
    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),

    #[error("wallet provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Map an EIP-1193 error code onto the taxonomy.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        match code {
            CODE_USER_REJECTED => ProviderError::UserRejected,
            CODE_REQUEST_PENDING => ProviderError::RequestPending,
            _ => ProviderError::Other(message.into()),
        }
    }
}

/// Seam over an injected wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access, prompting the user if necessary.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Currently exposed accounts, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Submit a transaction for signing and broadcast. Resolves with the
    /// transaction hash as soon as the wallet accepts it; inclusion is not
    /// awaited.
    async fn send_transaction(&self, params: TxParams) -> Result<String, ProviderError>;

    /// Sign an arbitrary message with the given account.
    async fn personal_sign(&self, address: Address, message: &str)
        -> Result<String, ProviderError>;

    /// Subscribe to account and network change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
