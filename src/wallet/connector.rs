// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Wallet connection management.
//!
//! Tracks the connected account, its on-chain allow-list status, and the
//! active network. The connector is the single writer of wallet state:
//! account-change events and explicit connects each fully replace the
//! connection record, last write wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::provider::{ProviderError, WalletEvent, WalletProvider};
use crate::error::{Error, Result};
use crate::notify::Notices;
use crate::storage::ClientStore;

/// Maximum wallet connection attempts.
const CONNECT_ATTEMPTS: u32 = 3;

/// Maximum allow-list check attempts.
const ALLOW_LIST_ATTEMPTS: u32 = 3;

/// Base backoff; multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Wallet connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The connector's seam to the ledger: allow-list lookups, sending-account
/// synchronization, and binding invalidation on network changes.
#[async_trait]
pub trait LedgerLink: Send + Sync {
    /// Allow-list membership for an address. Implementations initialize
    /// their RPC binding lazily.
    async fn is_allow_listed(&self, address: Address) -> Result<bool>;

    /// Adopt (or clear) the account used for write transactions.
    async fn set_sending_account(&self, account: Option<Address>);

    /// The current network id, if reachable.
    async fn network_id(&self) -> Option<u64>;

    /// Drop any bound chain state so nothing stale survives a network switch.
    async fn reset(&self);
}

/// Host hook invoked on a network change (full-reload simplification).
pub type ReloadHandler = Arc<dyn Fn() + Send + Sync>;

struct ConnectorInner {
    provider: Arc<dyn WalletProvider>,
    ledger: Arc<dyn LedgerLink>,
    store: ClientStore,
    notices: Notices,
    state: RwLock<ConnectionState>,
    address: RwLock<Option<Address>>,
    allow_listed: AtomicBool,
    network_id: RwLock<Option<u64>>,
    reload: RwLock<Option<ReloadHandler>>,
}

/// Manages the connection to the user's wallet.
#[derive(Clone)]
pub struct WalletConnector {
    inner: Arc<ConnectorInner>,
}

impl WalletConnector {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        ledger: Arc<dyn LedgerLink>,
        store: ClientStore,
        notices: Notices,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                provider,
                ledger,
                store,
                notices,
                state: RwLock::new(ConnectionState::Disconnected),
                address: RwLock::new(None),
                allow_listed: AtomicBool::new(false),
                network_id: RwLock::new(None),
                reload: RwLock::new(None),
            }),
        }
    }

    /// Install the host's reload hook for network changes.
    pub async fn set_reload_handler(&self, handler: ReloadHandler) {
        *self.inner.reload.write().await = Some(handler);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    pub async fn address(&self) -> Option<Address> {
        *self.inner.address.read().await
    }

    /// Whether the connected account is on the verifier allow-list.
    pub fn is_allow_listed(&self) -> bool {
        self.inner.allow_listed.load(Ordering::SeqCst)
    }

    pub async fn network_id(&self) -> Option<u64> {
        *self.inner.network_id.read().await
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Restore a previous connection: prefer the persisted address, fall
    /// back to whatever the provider already exposes without prompting.
    pub async fn restore_connection(&self) {
        match self.inner.store.wallet_address() {
            Ok(Some(persisted)) => match persisted.parse::<Address>() {
                Ok(address) => {
                    debug!(address = %persisted, "Restoring persisted wallet connection");
                    self.adopt(address, false).await;
                    self.spawn_allow_list_check(address);
                    return;
                }
                Err(_) => {
                    warn!(address = %persisted, "Discarding unparseable persisted wallet address");
                    self.inner.store.clear_wallet_address().ok();
                }
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read persisted wallet address"),
        }

        if let Ok(accounts) = self.inner.provider.accounts().await {
            if let Some(address) = accounts.first().copied() {
                debug!(address = ?address, "Auto-connecting already exposed account");
                self.adopt(address, true).await;
                self.spawn_allow_list_check(address);
            }
        }
    }

    /// Connect to the wallet, prompting the user.
    ///
    /// Generic failures are retried up to 3 times with a linearly
    /// increasing backoff. An explicit user rejection is never retried.
    pub async fn connect(&self) -> Result<Address> {
        *self.inner.state.write().await = ConnectionState::Connecting;
        let mut last_error = String::from("no accounts returned from wallet");

        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.inner.provider.request_accounts().await {
                Ok(accounts) => {
                    if let Some(address) = accounts.first().copied() {
                        self.adopt(address, true).await;
                        info!(address = ?address, "Wallet connected");

                        if let Some(network_id) = self.inner.ledger.network_id().await {
                            *self.inner.network_id.write().await = Some(network_id);
                        }
                        self.spawn_allow_list_check(address);
                        return Ok(address);
                    }
                    warn!(attempt, "Wallet returned an empty account list");
                }
                Err(ProviderError::UserRejected) => {
                    *self.inner.state.write().await = ConnectionState::Disconnected;
                    return Err(Error::UserRejected(
                        "connection request rejected; approve it in your wallet".to_string(),
                    ));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Wallet connection attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt < CONNECT_ATTEMPTS {
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
        }

        *self.inner.state.write().await = ConnectionState::Disconnected;
        Err(Error::NetworkUnavailable(format!(
            "failed to connect wallet after {CONNECT_ATTEMPTS} attempts: {last_error}"
        )))
    }

    /// Disconnect and forget the persisted address.
    pub async fn disconnect(&self) {
        self.clear_connection().await;
        info!("Wallet disconnected");
    }

    async fn adopt(&self, address: Address, persist: bool) {
        *self.inner.address.write().await = Some(address);
        *self.inner.state.write().await = ConnectionState::Connected;
        if persist {
            if let Err(e) = self
                .inner
                .store
                .set_wallet_address(&format!("{address:?}"))
            {
                warn!(error = %e, "Failed to persist wallet address");
            }
        }
        self.inner.ledger.set_sending_account(Some(address)).await;
    }

    async fn clear_connection(&self) {
        *self.inner.address.write().await = None;
        *self.inner.state.write().await = ConnectionState::Disconnected;
        self.inner.allow_listed.store(false, Ordering::SeqCst);
        if let Err(e) = self.inner.store.clear_wallet_address() {
            warn!(error = %e, "Failed to clear persisted wallet address");
        }
        self.inner.ledger.set_sending_account(None).await;
    }

    // =========================================================================
    // Change notifications
    // =========================================================================

    /// Apply an account-change notification from the provider.
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        match accounts.first().copied() {
            Some(address) => {
                info!(address = ?address, "Active wallet account changed");
                // A new account invalidates the cached allow-list status.
                self.inner.allow_listed.store(false, Ordering::SeqCst);
                self.adopt(address, true).await;
                self.spawn_allow_list_check(address);
            }
            None => {
                info!("Wallet reported no accounts; clearing connection");
                self.clear_connection().await;
            }
        }
    }

    /// Apply a network-change notification. Bound chain state is dropped
    /// and the host's reload hook invoked, so no stale-network reads or
    /// writes can happen afterwards.
    pub async fn handle_chain_changed(&self, chain_id: u64) {
        info!(chain_id, "Wallet network changed");
        *self.inner.network_id.write().await = Some(chain_id);
        self.inner.ledger.reset().await;

        match self.inner.reload.read().await.as_ref() {
            Some(reload) => reload(),
            None => warn!("No reload handler installed; host must re-resolve chain state"),
        }
    }

    /// Listen for provider events until the token is cancelled.
    pub fn spawn_event_listener(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let connector = self.clone();
        let mut events = self.inner.provider.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(WalletEvent::AccountsChanged(accounts)) => {
                            connector.handle_accounts_changed(accounts).await;
                        }
                        Ok(WalletEvent::ChainChanged(chain_id)) => {
                            connector.handle_chain_changed(chain_id).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Wallet event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    // =========================================================================
    // Allow-list status
    // =========================================================================

    fn spawn_allow_list_check(&self, address: Address) {
        let connector = self.clone();
        tokio::spawn(async move {
            connector.check_allow_list_status(address).await;
        });
    }

    /// Check the address against the on-chain allow-list, retrying up to
    /// 3 times with backoff. Exhaustion resolves to `false`: the check
    /// fails open to "not allow-listed" and never errors.
    pub async fn check_allow_list_status(&self, address: Address) -> bool {
        for attempt in 1..=ALLOW_LIST_ATTEMPTS {
            match self.inner.ledger.is_allow_listed(address).await {
                Ok(listed) => {
                    self.inner.allow_listed.store(listed, Ordering::SeqCst);
                    debug!(address = ?address, listed, "Allow-list status resolved");
                    return listed;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Allow-list check attempt failed");
                    if attempt < ALLOW_LIST_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    }
                }
            }
        }

        warn!(address = ?address, "All allow-list check attempts failed");
        self.inner.allow_listed.store(false, Ordering::SeqCst);
        false
    }

    /// Re-run the allow-list check for the connected account, surfacing
    /// the outcome as a notice.
    pub async fn retry_allow_list_check(&self) -> bool {
        let Some(address) = self.address().await else {
            self.inner.notices.notify(
                crate::notify::NoticeLevel::Error,
                "No wallet connected. Please connect your wallet first.",
            );
            return false;
        };

        let listed = self.check_allow_list_status(address).await;
        let message = if listed {
            "Verifier status confirmed"
        } else {
            "Your account does not have verifier permissions"
        };
        self.inner.notices.notify(crate::notify::NoticeLevel::Info, message);
        listed
    }
}
