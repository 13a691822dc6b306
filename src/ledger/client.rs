// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Document registry client.
//!
//! Reads go straight to the node; writes are encoded here but signed and
//! submitted through the wallet provider, so a user declining a signature
//! surfaces as `UserRejected` rather than a transport failure.

use alloy::{
    network::Ethereum,
    primitives::{Address, U256, U64},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::contract::IIdentityVerification;
use super::types::{
    apply_gas_margin, format_gwei, LedgerDocument, NetworkInfo, PendingTransaction, TxReceipt,
    DEFAULT_GAS_PRICE_WEI, DEFAULT_UPLOAD_GAS, FALLBACK_OWNER_ADDRESS, VERIFY_GAS,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::wallet::connector::LedgerLink;
use crate::wallet::provider::{TxParams, WalletProvider};

/// HTTP provider type for registry reads (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

type ContractInstance = IIdentityVerification::IIdentityVerificationInstance<HttpProvider>;

#[derive(Clone)]
struct Binding {
    provider: HttpProvider,
    contract: ContractInstance,
}

/// Client for the on-chain document registry.
pub struct LedgerClient {
    rpc_url: String,
    contract_address: Address,
    wallet: Arc<dyn WalletProvider>,
    account: RwLock<Option<Address>>,
    binding: RwLock<Option<Binding>>,
    init_lock: Mutex<()>,
}

impl LedgerClient {
    pub fn new(config: &Config, wallet: Arc<dyn WalletProvider>) -> Result<Self> {
        let contract_address = config
            .contract_address
            .parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("invalid contract address: {e}")))?;

        Ok(Self {
            rpc_url: config.rpc_url.clone(),
            contract_address,
            wallet,
            account: RwLock::new(None),
            binding: RwLock::new(None),
            init_lock: Mutex::new(()),
        })
    }

    /// The bound contract address.
    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Establish the RPC connection and bind the contract interface.
    /// Idempotent; concurrent calls share a single initialization.
    pub async fn init(&self) -> Result<()> {
        if self.binding.read().await.is_some() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.binding.read().await.is_some() {
            return Ok(());
        }

        let url: url::Url = self
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| Error::Config(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);
        let contract = IIdentityVerification::new(self.contract_address, provider.clone());

        *self.binding.write().await = Some(Binding { provider, contract });
        info!(contract = ?self.contract_address, "Registry contract bound");

        // Adopt an already exposed account, best effort.
        if self.account.read().await.is_none() {
            if let Ok(accounts) = self.wallet.accounts().await {
                if let Some(first) = accounts.first().copied() {
                    debug!(account = ?first, "Adopted already connected account");
                    *self.account.write().await = Some(first);
                }
            }
        }

        Ok(())
    }

    async fn binding(&self) -> Result<Binding> {
        self.init().await?;
        self.binding
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Ledger("registry binding unavailable".to_string()))
    }

    /// The account used for write transactions, connecting the wallet
    /// transparently when none is adopted yet.
    async fn ensure_account(&self) -> Result<Address> {
        if let Some(account) = *self.account.read().await {
            return Ok(account);
        }

        debug!("No connected account, requesting wallet access");
        let accounts = self.wallet.request_accounts().await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| Error::Ledger("no accounts returned from wallet".to_string()))?;
        *self.account.write().await = Some(account);
        Ok(account)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Record a document on the registry. Returns as soon as the wallet
    /// accepts the transaction; inclusion is not awaited.
    pub async fn upload_document(
        &self,
        content_hash: &str,
        document_type: &str,
    ) -> Result<PendingTransaction> {
        if content_hash.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "content hash must be a non-empty string".to_string(),
            ));
        }
        if document_type.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "document type must be a non-empty string".to_string(),
            ));
        }

        let binding = self.binding().await?;
        let account = self.ensure_account().await?;

        let data = IIdentityVerification::uploadDocumentCall {
            _documentHash: content_hash.to_string(),
            _documentType: document_type.to_string(),
        }
        .abi_encode();

        let gas = apply_gas_margin(self.estimate_gas_or_default(&binding, account, &data).await);
        let tx_hash = self.submit(&binding, account, data, gas).await?;

        info!(tx_hash = %tx_hash, content_hash, "Document upload transaction sent");
        Ok(PendingTransaction {
            tx_hash,
            from: format!("{account:?}"),
            to: format!("{:?}", self.contract_address),
        })
    }

    /// Record a verification outcome. A malformed owner address or index
    /// is substituted with documented fallbacks rather than rejected.
    pub async fn verify_document(
        &self,
        owner_address: &str,
        document_index: &str,
        status: &str,
        notes: &str,
    ) -> Result<String> {
        let owner = normalize_owner_address(owner_address);
        let index = normalize_document_index(document_index);

        let binding = self.binding().await?;
        let account = self.ensure_account().await?;

        let data = IIdentityVerification::verifyDocumentCall {
            _user: owner,
            _docIndex: index,
            _status: status.to_string(),
            _notes: notes.to_string(),
        }
        .abi_encode();

        let tx_hash = self.submit(&binding, account, data, VERIFY_GAS).await?;
        info!(tx_hash = %tx_hash, owner = ?owner, index = %index, status, "Verification transaction sent");
        Ok(tx_hash)
    }

    /// Grant verifier permissions to an address. Owner-only on-chain.
    pub async fn add_verifier(&self, address: &str) -> Result<String> {
        let verifier = address
            .parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("invalid verifier address: {e}")))?;

        let binding = self.binding().await?;
        let account = self.ensure_account().await?;

        let data = IIdentityVerification::addVerifierCall { _verifier: verifier }.abi_encode();
        let gas = apply_gas_margin(self.estimate_gas_or_default(&binding, account, &data).await);
        let tx_hash = self.submit(&binding, account, data, gas).await?;

        info!(tx_hash = %tx_hash, verifier = ?verifier, "Verifier grant transaction sent");
        Ok(tx_hash)
    }

    async fn submit(
        &self,
        binding: &Binding,
        account: Address,
        data: Vec<u8>,
        gas: u64,
    ) -> Result<String> {
        let gas_price = match binding.provider.get_gas_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, default = DEFAULT_GAS_PRICE_WEI, "Gas price fetch failed, using default");
                DEFAULT_GAS_PRICE_WEI
            }
        };

        let params = TxParams {
            from: account,
            to: self.contract_address,
            data: data.into(),
            gas,
            gas_price,
        };
        Ok(self.wallet.send_transaction(params).await?)
    }

    async fn estimate_gas_or_default(
        &self,
        binding: &Binding,
        account: Address,
        data: &[u8],
    ) -> u64 {
        let tx = TransactionRequest::default()
            .from(account)
            .to(self.contract_address)
            .input(data.to_vec().into());

        match binding.provider.estimate_gas(tx).await {
            Ok(gas) => gas,
            Err(e) => {
                warn!(error = %e, default = DEFAULT_UPLOAD_GAS, "Gas estimation failed, using default");
                DEFAULT_UPLOAD_GAS
            }
        }
    }

    // =========================================================================
    // Reads (no wallet, no gas)
    // =========================================================================

    /// Fetch a stored document entry.
    pub async fn get_document(&self, owner_address: &str, index: u64) -> Result<LedgerDocument> {
        let owner = owner_address
            .parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("invalid owner address: {e}")))?;

        let binding = self.binding().await?;
        let entry = binding
            .contract
            .getDocument(owner, U256::from(index))
            .call()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;

        Ok(LedgerDocument {
            document_hash: entry.documentHash,
            document_type: entry.documentType,
            status: entry.status,
            timestamp: entry.timestamp.to::<u64>(),
            verifier: format!("{:?}", entry.verifier),
            notes: entry.notes,
        })
    }

    /// Number of entries stored for an address.
    pub async fn get_document_count(&self, owner_address: &str) -> Result<u64> {
        let owner = owner_address
            .parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("invalid owner address: {e}")))?;

        let binding = self.binding().await?;
        let count = binding
            .contract
            .getDocumentCount(owner)
            .call()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        Ok(count.to::<u64>())
    }

    /// Allow-list membership check.
    pub async fn is_verifier(&self, address: &str) -> Result<bool> {
        let address = address
            .parse::<Address>()
            .map_err(|e| Error::InvalidArgument(format!("invalid address: {e}")))?;
        LedgerLink::is_allow_listed(self, address).await
    }

    /// The registry contract's owner.
    pub async fn owner(&self) -> Result<String> {
        let binding = self.binding().await?;
        let owner = binding
            .contract
            .owner()
            .call()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        Ok(format!("{owner:?}"))
    }

    /// Network snapshot. Never fails: an unreachable ledger is reported as
    /// `connected: false` and is the canonical unavailability signal.
    pub async fn network_info(&self) -> NetworkInfo {
        match self.try_network_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Network introspection failed");
                NetworkInfo::offline(e.to_string())
            }
        }
    }

    async fn try_network_info(&self) -> Result<NetworkInfo> {
        let binding = self.binding().await?;

        let network_id = binding
            .provider
            .get_chain_id()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        let gas_price = binding
            .provider
            .get_gas_price()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        let latest_block = binding
            .provider
            .get_block_number()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        let peer_count: U64 = binding
            .provider
            .raw_request("net_peerCount".into(), Vec::<String>::new())
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;

        Ok(NetworkInfo {
            connected: true,
            network_id: Some(network_id),
            gas_price: Some(format_gwei(gas_price)),
            latest_block: Some(latest_block),
            peer_count: Some(peer_count.to::<u64>()),
            error: None,
        })
    }

    /// Receipt probe for a previously submitted transaction. `None` while
    /// the transaction is still pending.
    pub async fn transaction_status(&self, tx_hash: &str) -> Result<Option<TxReceipt>> {
        let hash = tx_hash
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("invalid tx hash: {e}")))?;

        let binding = self.binding().await?;
        let receipt = binding
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: r.block_number.unwrap_or(0),
            gas_used: r.gas_used as u64,
            success: r.status(),
        }))
    }
}

#[async_trait]
impl LedgerLink for LedgerClient {
    async fn is_allow_listed(&self, address: Address) -> Result<bool> {
        let binding = self.binding().await?;
        binding
            .contract
            .isVerifier(address)
            .call()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))
    }

    async fn set_sending_account(&self, account: Option<Address>) {
        *self.account.write().await = account;
    }

    async fn network_id(&self) -> Option<u64> {
        let binding = self.binding().await.ok()?;
        binding.provider.get_chain_id().await.ok()
    }

    async fn reset(&self) {
        *self.binding.write().await = None;
        *self.account.write().await = None;
        debug!("Registry binding reset");
    }
}

/// Substitute the documented fallback for a malformed owner address.
fn normalize_owner_address(raw: &str) -> Address {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") {
        if let Ok(address) = trimmed.parse::<Address>() {
            return address;
        }
    }
    warn!(
        raw,
        fallback = ?FALLBACK_OWNER_ADDRESS,
        "Malformed owner address, substituting fallback"
    );
    FALLBACK_OWNER_ADDRESS
}

/// Substitute index 0 when the input does not parse to a non-negative integer.
fn normalize_document_index(raw: &str) -> U256 {
    match raw.trim().parse::<u64>() {
        Ok(index) => U256::from(index),
        Err(_) => {
            warn!(raw, "Invalid document index, substituting 0");
            U256::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::mock::MockWalletProvider;
    use crate::wallet::provider::ProviderError;

    const UNREACHABLE_RPC: &str = "http://127.0.0.1:9";

    fn test_account() -> Address {
        Address::repeat_byte(0x42)
    }

    fn client_with(wallet: MockWalletProvider) -> (Arc<MockWalletProvider>, LedgerClient) {
        let wallet = Arc::new(wallet);
        let config = Config::new("http://localhost:8000").with_rpc_url(UNREACHABLE_RPC);
        let client = LedgerClient::new(&config, wallet.clone()).unwrap();
        (wallet, client)
    }

    #[test]
    fn owner_address_normalization() {
        let valid = "0x9e1B746457a30C6826f778679Bc2d6AbB9db6DE7";
        assert_eq!(normalize_owner_address(valid), valid.parse::<Address>().unwrap());
        assert_eq!(normalize_owner_address("not-an-address"), FALLBACK_OWNER_ADDRESS);
        assert_eq!(normalize_owner_address(""), FALLBACK_OWNER_ADDRESS);
        // Missing 0x prefix is malformed even when the hex digits are fine.
        assert_eq!(
            normalize_owner_address("9e1B746457a30C6826f778679Bc2d6AbB9db6DE7"),
            FALLBACK_OWNER_ADDRESS
        );
    }

    #[test]
    fn document_index_normalization() {
        assert_eq!(normalize_document_index("7"), U256::from(7));
        assert_eq!(normalize_document_index("abc"), U256::ZERO);
        assert_eq!(normalize_document_index("-1"), U256::ZERO);
        assert_eq!(normalize_document_index(""), U256::ZERO);
    }

    #[tokio::test]
    async fn upload_rejects_empty_arguments_before_any_call() {
        let (wallet, client) = client_with(MockWalletProvider::with_account(test_account()));

        let err = client.upload_document("", "passport").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = client.upload_document("QmHash", "  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert!(wallet.sent.lock().unwrap().is_empty());
        assert_eq!(wallet.request_call_count(), 0);
    }

    #[tokio::test]
    async fn upload_falls_back_to_default_gas_with_margin() {
        let (wallet, client) = client_with(MockWalletProvider::with_account(test_account()));

        let pending = client.upload_document("QmHash", "passport").await.unwrap();
        assert!(pending.tx_hash.starts_with("0x"));

        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        // Estimation against the unreachable node fails: 200k default + 20%.
        assert_eq!(sent[0].gas, 240_000);
        assert_eq!(sent[0].gas_price, DEFAULT_GAS_PRICE_WEI);
        assert_eq!(sent[0].to, client.contract_address());

        let call = IIdentityVerification::uploadDocumentCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(call._documentHash, "QmHash");
        assert_eq!(call._documentType, "passport");
    }

    #[tokio::test]
    async fn upload_transparently_connects_wallet() {
        let wallet = MockWalletProvider::with_account(test_account());
        let (wallet, client) = client_with(wallet);

        client.upload_document("QmHash", "passport").await.unwrap();
        assert_eq!(wallet.request_call_count(), 1);
        assert_eq!(wallet.sent.lock().unwrap()[0].from, test_account());
    }

    #[tokio::test]
    async fn verify_substitutes_fallback_address_and_index() {
        let (wallet, client) = client_with(MockWalletProvider::with_account(test_account()));

        let tx_hash = client
            .verify_document("not-an-address", "abc", "Verified", "ok")
            .await
            .unwrap();
        assert!(tx_hash.starts_with("0x"));

        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent[0].gas, VERIFY_GAS);

        let call = IIdentityVerification::verifyDocumentCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(call._user, FALLBACK_OWNER_ADDRESS);
        assert_eq!(call._docIndex, U256::ZERO);
        assert_eq!(call._status, "Verified");
        assert_eq!(call._notes, "ok");
    }

    #[tokio::test]
    async fn wallet_rejection_is_distinct_from_transport_failure() {
        let wallet = MockWalletProvider::with_account(test_account());
        wallet.fail_sends_with(ProviderError::UserRejected);
        let (_wallet, client) = client_with(wallet);

        let err = client
            .verify_document(
                "0x9e1B746457a30C6826f778679Bc2d6AbB9db6DE7",
                "0",
                "Verified",
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserRejected(_)));
    }

    #[tokio::test]
    async fn network_info_reports_offline_instead_of_failing() {
        let (_wallet, client) = client_with(MockWalletProvider::new());

        let info = client.network_info().await;
        assert!(!info.connected);
        assert!(info.error.is_some());
        assert!(info.network_id.is_none());
    }

    #[tokio::test]
    async fn init_is_idempotent_under_concurrency() {
        let (_wallet, client) = client_with(MockWalletProvider::new());
        let client = Arc::new(client);

        let (a, b) = tokio::join!(client.init(), client.init());
        a.unwrap();
        b.unwrap();
        client.init().await.unwrap();
    }

    #[tokio::test]
    async fn reads_reject_malformed_addresses() {
        let (_wallet, client) = client_with(MockWalletProvider::new());

        assert!(matches!(
            client.get_document("nope", 0).await.unwrap_err(),
            Error::InvalidArgument(_)
        ));
        assert!(matches!(
            client.get_document_count("nope").await.unwrap_err(),
            Error::InvalidArgument(_)
        ));
        assert!(matches!(
            client.is_verifier("nope").await.unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn reset_drops_binding_and_account() {
        let (_wallet, client) = client_with(MockWalletProvider::with_account(test_account()));
        client.init().await.unwrap();
        LedgerLink::set_sending_account(&client, Some(test_account())).await;

        LedgerLink::reset(&client).await;
        assert!(client.binding.read().await.is_none());
        assert!(client.account.read().await.is_none());
    }
}
