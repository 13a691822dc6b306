// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Deployment probe for the registry contract.
//!
//! Answers "is there a usable contract at this address" without requiring
//! a wallet: code presence is checked with bounded retries, and the
//! `owner()` view read is wrapped in a timeout so a hung node cannot
//! stall the caller.

use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder},
};
use tracing::warn;

use super::contract::IIdentityVerification;

const PROBE_ATTEMPTS: u32 = 3;
const PROBE_BACKOFF: Duration = Duration::from_secs(1);

/// Timeout on the `owner()` ownership read.
const OWNER_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Network id assumed when the node will not answer (local devnet).
const FALLBACK_NETWORK_ID: u64 = 1337;

/// Outcome of a deployment probe.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub success: bool,
    pub network_id: Option<u64>,
    pub owner: Option<String>,
    pub code_length: Option<usize>,
    /// Existence was verified by code length only; the function interface
    /// could not be confirmed.
    pub partial_verification: bool,
    pub error: Option<String>,
}

impl DeploymentReport {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            network_id: None,
            owner: None,
            code_length: None,
            partial_verification: false,
            error: Some(error),
        }
    }
}

/// Probe the given RPC endpoint for a usable registry deployment.
pub async fn check_deployment(rpc_url: &str, contract_address: &str) -> DeploymentReport {
    let address = match contract_address.parse::<Address>() {
        Ok(address) => address,
        Err(e) => return DeploymentReport::failure(format!("invalid contract address: {e}")),
    };
    let url: url::Url = match rpc_url.parse() {
        Ok(url) => url,
        Err(e) => return DeploymentReport::failure(format!("invalid RPC URL: {e}")),
    };
    let provider = ProviderBuilder::new().connect_http(url);

    // Network id, with a devnet fallback so code probing still proceeds.
    let mut network_id = None;
    for attempt in 1..=PROBE_ATTEMPTS {
        match provider.get_chain_id().await {
            Ok(id) => {
                network_id = Some(id);
                break;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Network id retrieval failed");
                if attempt < PROBE_ATTEMPTS {
                    tokio::time::sleep(PROBE_BACKOFF).await;
                }
            }
        }
    }
    let network_id = network_id.unwrap_or_else(|| {
        warn!(fallback = FALLBACK_NETWORK_ID, "Using fallback network id");
        FALLBACK_NETWORK_ID
    });

    // Code at the address, with bounded retries.
    let mut code = None;
    for attempt in 1..=PROBE_ATTEMPTS {
        match provider.get_code_at(address).await {
            Ok(bytes) => {
                code = Some(bytes);
                break;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Contract code retrieval failed");
                if attempt < PROBE_ATTEMPTS {
                    tokio::time::sleep(PROBE_BACKOFF).await;
                }
            }
        }
    }
    let Some(code) = code else {
        return DeploymentReport::failure(format!(
            "failed to check contract code after {PROBE_ATTEMPTS} attempts"
        ));
    };
    if code.is_empty() {
        return DeploymentReport::failure(format!(
            "no contract found at address {address:?} on network {network_id}"
        ));
    }

    // Interface check: a timed owner() read, then an existence-only fallback.
    let contract = IIdentityVerification::new(address, provider.clone());
    match tokio::time::timeout(OWNER_CALL_TIMEOUT, contract.owner().call()).await {
        Ok(Ok(owner)) => DeploymentReport {
            success: true,
            network_id: Some(network_id),
            owner: Some(format!("{owner:?}")),
            code_length: Some(code.len()),
            partial_verification: false,
            error: None,
        },
        Ok(Err(e)) => {
            warn!(error = %e, "owner() call failed, falling back to code-length check");
            existence_only_report(network_id, code.len())
        }
        Err(_) => {
            warn!(
                timeout_secs = OWNER_CALL_TIMEOUT.as_secs(),
                "owner() call timed out, falling back to code-length check"
            );
            existence_only_report(network_id, code.len())
        }
    }
}

/// Existence verified by code length alone.
fn existence_only_report(network_id: u64, code_length: usize) -> DeploymentReport {
    if code_length > 10 {
        DeploymentReport {
            success: true,
            network_id: Some(network_id),
            owner: None,
            code_length: Some(code_length),
            partial_verification: true,
            error: None,
        }
    } else {
        DeploymentReport::failure(
            "contract exists but its interface could not be verified".to_string(),
        )
    }
}
