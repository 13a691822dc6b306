// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Document verification workflow.
//!
//! Backend status update first; the ledger mirror is attempted regardless
//! of the backend outcome whenever a wallet is connected, but only the
//! backend result decides overall success.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::MirrorOutcome;
use crate::api::BackendApi;
use crate::error::Error;
use crate::ledger::LedgerClient;
use crate::models::VerificationDecision;
use crate::notify::{NoticeLevel, Notices};
use crate::wallet::WalletConnector;

/// Result of a completed verify workflow.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    /// Correlation id for this workflow run.
    pub workflow_id: Uuid,
    /// Whether the authoritative backend update succeeded.
    pub backend_updated: bool,
    pub backend_error: Option<String>,
    pub mirror: MirrorOutcome,
}

impl VerifyOutcome {
    /// Backend success alone decides overall success.
    pub fn is_success(&self) -> bool {
        self.backend_updated
    }

    /// Navigation away is appropriate only after a backend success.
    pub fn should_navigate(&self) -> bool {
        self.backend_updated
    }
}

/// Orchestrates the dual-write verification path.
pub struct VerifyWorkflow {
    api: BackendApi,
    connector: WalletConnector,
    ledger: Arc<LedgerClient>,
    notices: Notices,
}

impl VerifyWorkflow {
    pub fn new(
        api: BackendApi,
        connector: WalletConnector,
        ledger: Arc<LedgerClient>,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            connector,
            ledger,
            notices,
        }
    }

    /// Run the verification workflow for one document.
    ///
    /// `owner_address` and `document_index` address the ledger entry and
    /// tolerate malformed input per the registry client's fallback rules.
    pub async fn run(
        &self,
        document_id: i64,
        owner_address: &str,
        document_index: &str,
        decision: VerificationDecision,
        notes: &str,
    ) -> VerifyOutcome {
        let workflow_id = Uuid::new_v4();
        info!(%workflow_id, document_id, ?decision, "Starting document verification");

        let (backend_updated, backend_error) = match self
            .api
            .verify_document(document_id, decision, notes)
            .await
        {
            Ok(()) => {
                self.notices
                    .notify(NoticeLevel::Success, "Document status updated in database");
                (true, None)
            }
            Err(e) => {
                warn!(%workflow_id, error = %e, "Backend verification update failed");
                self.notices.notify(
                    NoticeLevel::Error,
                    &format!("Database update failed: {e}"),
                );
                (false, Some(e.to_string()))
            }
        };

        let mirror = self
            .mirror_verification(owner_address, document_index, decision, notes)
            .await;

        info!(
            %workflow_id,
            backend_updated,
            recorded = mirror.is_recorded(),
            "Verification workflow finished"
        );
        VerifyOutcome {
            workflow_id,
            backend_updated,
            backend_error,
            mirror,
        }
    }

    async fn mirror_verification(
        &self,
        owner_address: &str,
        document_index: &str,
        decision: VerificationDecision,
        notes: &str,
    ) -> MirrorOutcome {
        if self.connector.address().await.is_none() {
            self.notices.notify(
                NoticeLevel::Info,
                "Document updated in database (no wallet connected for ledger mirror)",
            );
            return MirrorOutcome::NoWallet;
        }

        let status = decision.as_status().to_string();
        match self
            .ledger
            .verify_document(owner_address, document_index, &status, notes)
            .await
        {
            Ok(tx_hash) => {
                self.notices
                    .notify(NoticeLevel::Success, "Verification recorded on the ledger");
                MirrorOutcome::Recorded { tx_hash }
            }
            Err(Error::UserRejected(_)) => {
                self.notices.notify(
                    NoticeLevel::Warning,
                    "Ledger mirror skipped: transaction was rejected in your wallet",
                );
                MirrorOutcome::UserDeclined
            }
            Err(e) => {
                warn!(error = %e, "Ledger mirror of verification failed");
                self.notices.notify(
                    NoticeLevel::Warning,
                    &format!("Ledger verification failed: {e}"),
                );
                MirrorOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthClient, Session, TokenStore};
    use crate::config::Config;
    use crate::notify::BufferNotifier;
    use crate::storage::ClientStore;
    use crate::wallet::mock::MockWalletProvider;
    use crate::wallet::provider::ProviderError;
    use alloy::primitives::Address;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWNER: &str = "0x9e1B746457a30C6826f778679Bc2d6AbB9db6DE7";

    struct Harness {
        _dir: tempfile::TempDir,
        wallet: Arc<MockWalletProvider>,
        connector: WalletConnector,
        sink: Arc<BufferNotifier>,
        workflow: VerifyWorkflow,
    }

    async fn harness(server: &MockServer, wallet: MockWalletProvider) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::open(&dir.path().join("client.redb")).unwrap();
        let tokens = TokenStore::new(store.clone());
        tokens
            .replace(Session {
                access_token: "token".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                user_id: None,
                role: None,
            })
            .await;

        let sink = Arc::new(BufferNotifier::new());
        let notices = Notices::new(sink.clone());
        let auth = AuthClient::new(server.uri(), tokens, notices.clone());
        let api = BackendApi::new(auth);
        let config = Config::new(server.uri()).with_rpc_url("http://127.0.0.1:9");
        let wallet = Arc::new(wallet);
        let ledger = Arc::new(LedgerClient::new(&config, wallet.clone()).unwrap());
        let connector = WalletConnector::new(
            wallet.clone(),
            ledger.clone(),
            store,
            notices.clone(),
        );

        Harness {
            _dir: dir,
            wallet,
            connector: connector.clone(),
            sink,
            workflow: VerifyWorkflow::new(api, connector, ledger, notices),
        }
    }

    async fn mount_verify_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/documents/4/verify/"))
            .and(body_partial_json(json!({"status": "verified"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn backend_success_without_wallet() {
        let server = MockServer::start().await;
        mount_verify_ok(&server).await;

        let h = harness(&server, MockWalletProvider::new()).await;
        let outcome = h
            .workflow
            .run(4, OWNER, "0", VerificationDecision::Verified, "ok")
            .await;

        assert!(outcome.is_success());
        assert!(outcome.should_navigate());
        assert_eq!(outcome.mirror, MirrorOutcome::NoWallet);
    }

    #[tokio::test]
    async fn user_rejection_keeps_backend_success_with_skip_flag() {
        let server = MockServer::start().await;
        mount_verify_ok(&server).await;

        let wallet = MockWalletProvider::with_account(Address::repeat_byte(0x42));
        wallet.fail_sends_with(ProviderError::UserRejected);
        let h = harness(&server, wallet).await;

        // Connect so a wallet is present for the mirror attempt.
        h.connector
            .handle_accounts_changed(vec![Address::repeat_byte(0x42)])
            .await;

        let outcome = h
            .workflow
            .run(4, OWNER, "0", VerificationDecision::Verified, "ok")
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.mirror, MirrorOutcome::UserDeclined);
        assert!(h
            .sink
            .messages()
            .iter()
            .any(|(_, m)| m.contains("rejected in your wallet")));
    }

    #[tokio::test]
    async fn transport_failure_is_distinct_from_rejection() {
        let server = MockServer::start().await;
        mount_verify_ok(&server).await;

        let wallet = MockWalletProvider::with_account(Address::repeat_byte(0x42));
        wallet.fail_sends_with(ProviderError::Unavailable("node down".to_string()));
        let h = harness(&server, wallet).await;
        h.connector
            .handle_accounts_changed(vec![Address::repeat_byte(0x42)])
            .await;

        let outcome = h
            .workflow
            .run(4, OWNER, "0", VerificationDecision::Verified, "ok")
            .await;

        assert!(outcome.is_success());
        assert!(matches!(outcome.mirror, MirrorOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn backend_failure_is_overall_failure_without_navigation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/4/verify/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let h = harness(&server, MockWalletProvider::new()).await;
        let outcome = h
            .workflow
            .run(4, OWNER, "0", VerificationDecision::Rejected, "missing page")
            .await;

        assert!(!outcome.is_success());
        assert!(!outcome.should_navigate());
        assert!(outcome.backend_error.is_some());
    }

    #[tokio::test]
    async fn mirror_attempted_even_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/4/verify/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let wallet = MockWalletProvider::with_account(Address::repeat_byte(0x42));
        let h = harness(&server, wallet).await;
        h.connector
            .handle_accounts_changed(vec![Address::repeat_byte(0x42)])
            .await;

        let outcome = h
            .workflow
            .run(4, OWNER, "0", VerificationDecision::Verified, "ok")
            .await;

        assert!(!outcome.is_success());
        assert!(outcome.mirror.is_recorded());
        assert_eq!(h.wallet.sent.lock().unwrap().len(), 1);
    }
}
