// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Crate-wide error taxonomy.
//!
//! Validation errors fail fast locally, transport errors are retried only at
//! the bounded call sites that opt in (wallet connect, allow-list check,
//! token refresh-retry-once), and everything else propagates to the workflow
//! layer which decides the user-visible framing.

use crate::storage::StoreError;
use crate::wallet::provider::ProviderError;

/// Errors surfaced by the client integration layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable session; the operation was refused before any network call.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The refresh token is absent or was rejected by the backend. The
    /// session has been torn down; the user must log in again.
    #[error("session expired: {0}")]
    AuthenticationExpired(String),

    /// The user declined a signature or connection request in their wallet.
    /// Never retried automatically.
    #[error("rejected in wallet: {0}")]
    UserRejected(String),

    /// HTTP or RPC transport failure.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Malformed input caught before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An external API responded with an unexpected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Durable client-side storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Contract-level failure that is neither transport nor user rejection.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Required configuration value is missing or unparseable.
    #[error("configuration missing: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ProviderError> for Error {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::UserRejected => Error::UserRejected(e.to_string()),
            ProviderError::RequestPending => {
                Error::NetworkUnavailable("wallet request already pending".to_string())
            }
            ProviderError::Unavailable(msg) => Error::NetworkUnavailable(msg),
            ProviderError::Other(msg) => Error::Ledger(msg),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::NetworkUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rejection_maps_to_distinct_variant() {
        let err: Error = ProviderError::UserRejected.into();
        assert!(matches!(err, Error::UserRejected(_)));
    }

    #[test]
    fn provider_transport_maps_to_network_unavailable() {
        let err: Error = ProviderError::Unavailable("node down".to_string()).into();
        assert!(matches!(err, Error::NetworkUnavailable(_)));
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = Error::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 403: forbidden");
    }
}
