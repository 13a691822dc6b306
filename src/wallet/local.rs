// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Local-key wallet provider for headless and development use.
//!
//! Signs with an in-process key instead of prompting a user, so it never
//! reports `UserRejected`. Production deployments inject a real wallet.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;
use tokio::sync::broadcast;

use super::provider::{ProviderError, TxParams, WalletEvent, WalletProvider};
use crate::error::{Error, Result};

/// HTTP provider type with signing capabilities (all fillers + wallet).
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Wallet provider backed by a local private key.
#[derive(Debug)]
pub struct LocalWalletProvider {
    signer: PrivateKeySigner,
    address: Address,
    provider: SigningProvider,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWalletProvider {
    /// Create a provider from a hex-encoded private key (no 0x prefix).
    pub fn from_private_key(private_key_hex: &str, rpc_url: &str) -> Result<Self> {
        let key_bytes = alloy::hex::decode(private_key_hex)
            .map_err(|e| Error::InvalidArgument(format!("invalid private key: {e}")))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| Error::InvalidArgument(format!("invalid private key: {e}")))?;
        let address = signer.address();

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| Error::InvalidArgument(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(url);

        let (events, _) = broadcast::channel(16);

        Ok(Self {
            signer,
            address,
            provider,
            events,
        })
    }

    /// The signing account's address.
    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
        Ok(vec![self.address])
    }

    async fn accounts(&self) -> std::result::Result<Vec<Address>, ProviderError> {
        Ok(vec![self.address])
    }

    async fn send_transaction(&self, params: TxParams) -> std::result::Result<String, ProviderError> {
        let mut tx = alloy::rpc::types::TransactionRequest::default()
            .from(params.from)
            .to(params.to)
            .input(params.data.into())
            .gas_limit(params.gas);
        tx.gas_price = Some(params.gas_price);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ProviderError::Other(format!("failed to send: {e}")))?;

        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn personal_sign(
        &self,
        address: Address,
        message: &str,
    ) -> std::result::Result<String, ProviderError> {
        if address != self.address {
            return Err(ProviderError::Other(format!(
                "unknown signing account: {address:?}"
            )));
        }
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| ProviderError::Other(e.to_string()))?;
        Ok(format!("0x{}", alloy::hex::encode(signature.as_bytes())))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known dev mnemonic key #0; never used with real funds.
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn derives_expected_address() {
        let provider =
            LocalWalletProvider::from_private_key(DEV_KEY, "http://localhost:8545").unwrap();
        assert_eq!(
            format!("{:?}", provider.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        let accounts = provider.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![provider.address()]);
    }

    #[test]
    fn rejects_malformed_key() {
        let err = LocalWalletProvider::from_private_key("zz", "http://localhost:8545").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn signs_messages_for_own_account() {
        let provider =
            LocalWalletProvider::from_private_key(DEV_KEY, "http://localhost:8545").unwrap();
        let signature = provider
            .personal_sign(provider.address(), "veridoc login")
            .await
            .unwrap();
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 2 + 65 * 2);

        let other = Address::ZERO;
        assert!(provider.personal_sign(other, "nope").await.is_err());
    }
}
