// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VERIDOC_BACKEND_URL` | Backend REST API base URL | Required |
//! | `VERIDOC_RPC_URL` | Ledger JSON-RPC endpoint | `http://localhost:8545` |
//! | `VERIDOC_CONTRACT_ADDRESS` | Document registry contract address | Built-in deployment |
//! | `VERIDOC_IPFS_GATEWAYS` | Comma-separated gateway base URLs | Built-in list |
//! | `VERIDOC_DATA_DIR` | Directory for the durable client store | `./data` |
//! | `VERIDOC_PINATA_API_KEY` | Content-store API key | Optional |
//! | `VERIDOC_PINATA_API_SECRET` | Content-store API secret | Optional |

use std::path::PathBuf;

use crate::error::Error;

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_DATA_DIR: &str = "./data";

/// Registry contract address used when no override is configured.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x7A950d2311E19e14F4a7A0A980dC1e24eA7bf0E0";

/// Content-addressed gateways, primary first. Only the primary is used for
/// correctness-critical URLs; the rest are fallbacks for display.
pub const DEFAULT_GATEWAYS: [&str; 5] = [
    "https://gateway.pinata.cloud/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://gateway.ipfs.io/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

/// Client configuration, shared by every service object.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST API base URL (no trailing slash required).
    pub backend_url: String,
    /// Ledger JSON-RPC endpoint.
    pub rpc_url: String,
    /// Document registry contract address (hex, 0x-prefixed).
    pub contract_address: String,
    /// Content gateways, primary first.
    pub gateways: Vec<String>,
    /// Directory for the durable client store.
    pub data_dir: PathBuf,
    /// Content-store API credentials (forwarded to the backend when set).
    pub pinata_api_key: Option<String>,
    pub pinata_api_secret: Option<String>,
}

impl Config {
    /// Build a configuration with defaults for everything but the backend URL.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            pinata_api_key: None,
            pinata_api_secret: None,
        }
    }

    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, Error> {
        let backend_url = env_required("VERIDOC_BACKEND_URL")?;
        let rpc_url = env_or_default("VERIDOC_RPC_URL", DEFAULT_RPC_URL);
        let contract_address =
            env_or_default("VERIDOC_CONTRACT_ADDRESS", DEFAULT_CONTRACT_ADDRESS);
        let gateways = match env_optional("VERIDOC_IPFS_GATEWAYS") {
            Some(raw) => raw
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            None => DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
        };
        let data_dir = PathBuf::from(env_or_default("VERIDOC_DATA_DIR", DEFAULT_DATA_DIR));

        Ok(Self {
            backend_url,
            rpc_url,
            contract_address,
            gateways,
            data_dir,
            pinata_api_key: env_optional("VERIDOC_PINATA_API_KEY"),
            pinata_api_secret: env_optional("VERIDOC_PINATA_API_SECRET"),
        })
    }

    /// Override the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Override the contract address.
    pub fn with_contract_address(mut self, address: impl Into<String>) -> Self {
        self.contract_address = address.into();
        self
    }

    /// Override the client-store directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_required(name: &str) -> Result<String, Error> {
    env_optional(name).ok_or_else(|| Error::Config(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
