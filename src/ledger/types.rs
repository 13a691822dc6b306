// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Ledger types and constants.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Gas limit used for document uploads when estimation fails.
pub const DEFAULT_UPLOAD_GAS: u64 = 200_000;

/// Fixed gas limit for verification transactions.
pub const VERIFY_GAS: u64 = 100_000;

/// Gas price used when the node cannot be asked for one (25 gwei).
pub const DEFAULT_GAS_PRICE_WEI: u128 = 25_000_000_000;

/// Placeholder substituted for a malformed owner address in
/// `verify_document`. Kept for compatibility with existing deployments;
/// every substitution is logged at warn level.
pub const FALLBACK_OWNER_ADDRESS: Address = address!("9e1B746457a30C6826f778679Bc2d6AbB9db6DE7");

/// Add a 20% safety margin to a gas estimate.
pub fn apply_gas_margin(gas: u64) -> u64 {
    gas.saturating_mul(12) / 10
}

/// Format a wei amount as gwei with up to 6 decimal places.
pub fn format_gwei(wei: u128) -> String {
    if wei == 0 {
        return "0".to_string();
    }

    const GWEI: u128 = 1_000_000_000;
    let whole = wei / GWEI;
    let remainder = wei % GWEI;

    if remainder == 0 {
        whole.to_string()
    } else {
        let decimal_str = format!("{remainder:0>9}");
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
        }
    }
}

/// A document entry as stored on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub document_hash: String,
    pub document_type: String,
    pub status: String,
    pub timestamp: u64,
    pub verifier: String,
    pub notes: String,
}

/// Local handle for a submitted-but-unconfirmed write transaction.
/// Carries no guarantee of success; confirmation is a separate probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
}

/// Receipt details once a transaction has been included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Network introspection snapshot. `connected: false` with an error is the
/// canonical signal of ledger unavailability; this type never travels in
/// an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
    /// Gas price in gwei, human-readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkInfo {
    /// Snapshot for an unreachable ledger.
    pub fn offline(error: String) -> Self {
        Self {
            connected: false,
            network_id: None,
            gas_price: None,
            latest_block: None,
            peer_count: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_margin_is_twenty_percent() {
        assert_eq!(apply_gas_margin(100_000), 120_000);
        assert_eq!(apply_gas_margin(DEFAULT_UPLOAD_GAS), 240_000);
    }

    #[test]
    fn format_gwei_truncates_to_six_decimals() {
        assert_eq!(format_gwei(0), "0");
        assert_eq!(format_gwei(1_000_000_000), "1");
        assert_eq!(format_gwei(25_000_000_000), "25");
        assert_eq!(format_gwei(1_500_000_000), "1.5");
        assert_eq!(format_gwei(1_234_567_891), "1.234567");
    }

    #[test]
    fn offline_info_reports_disconnected() {
        let info = NetworkInfo::offline("connection refused".to_string());
        assert!(!info.connected);
        assert!(info.error.is_some());
        assert!(info.network_id.is_none());
    }
}
