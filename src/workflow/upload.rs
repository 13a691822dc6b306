// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Document upload workflow.
//!
//! Content store first, backend record second, ledger mirror last. The
//! backend write succeeding is the success criterion; the mirror is an
//! enhancement and its failure downgrades the result to a partial-success
//! notice only.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::MirrorOutcome;
use crate::api::BackendApi;
use crate::content::ContentStoreClient;
use crate::error::{Error, Result};
use crate::ledger::LedgerClient;
use crate::models::DocumentRecord;
use crate::notify::{NoticeLevel, Notices};
use crate::storage::ClientStore;
use crate::wallet::WalletConnector;

/// Result of a completed upload workflow.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Correlation id for this workflow run.
    pub workflow_id: Uuid,
    pub content_hash: String,
    /// Backend record matching the uploaded content, when found.
    pub document: Option<DocumentRecord>,
    pub mirror: MirrorOutcome,
}

impl UploadOutcome {
    pub fn document_id(&self) -> Option<i64> {
        self.document.as_ref().map(|d| d.id)
    }
}

/// Orchestrates the dual-write upload path.
pub struct UploadWorkflow {
    content: ContentStoreClient,
    api: BackendApi,
    connector: WalletConnector,
    ledger: Arc<LedgerClient>,
    store: ClientStore,
    notices: Notices,
}

impl UploadWorkflow {
    pub fn new(
        content: ContentStoreClient,
        api: BackendApi,
        connector: WalletConnector,
        ledger: Arc<LedgerClient>,
        store: ClientStore,
        notices: Notices,
    ) -> Self {
        Self {
            content,
            api,
            connector,
            ledger,
            store,
            notices,
        }
    }

    /// Run the upload workflow for one document.
    pub async fn run(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        document_type: &str,
    ) -> Result<UploadOutcome> {
        let workflow_id = Uuid::new_v4();
        info!(%workflow_id, file_name, document_type, "Starting document upload");

        let content_hash = match self.content.upload_file(bytes, file_name, document_type).await {
            Ok(hash) => hash,
            Err(e) => {
                self.notices
                    .notify(NoticeLevel::Error, &format!("Document upload failed: {e}"));
                return Err(e);
            }
        };
        self.notices
            .notify(NoticeLevel::Success, "Document uploaded to content store");

        let document = match self.find_uploaded_record(&content_hash).await {
            Ok(document) => document,
            Err(e) => {
                self.notices.notify(
                    NoticeLevel::Error,
                    &format!("Document stored but could not be confirmed: {e}"),
                );
                return Err(e);
            }
        };

        match &document {
            Some(record) => {
                if let Err(e) = self
                    .store
                    .set_current_verification_id(&record.id.to_string())
                {
                    warn!(%workflow_id, error = %e, "Failed to persist verification id");
                }
                self.notices
                    .notify(NoticeLevel::Success, "Document saved successfully");
            }
            None => {
                warn!(%workflow_id, content_hash, "Uploaded document missing from backend listing");
            }
        }

        let mirror = self.mirror_upload(&content_hash, document_type).await;

        info!(%workflow_id, content_hash, recorded = mirror.is_recorded(), "Upload workflow finished");
        Ok(UploadOutcome {
            workflow_id,
            content_hash,
            document,
            mirror,
        })
    }

    /// Locate the backend record created for the uploaded content:
    /// matching hash, most recent upload first when duplicates exist.
    async fn find_uploaded_record(&self, content_hash: &str) -> Result<Option<DocumentRecord>> {
        let mut matching: Vec<DocumentRecord> = self
            .api
            .list_documents()
            .await?
            .into_iter()
            .filter(|record| record.ipfs_hash.as_deref() == Some(content_hash))
            .collect();
        matching.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(matching.into_iter().next())
    }

    /// Best-effort ledger mirror; contingent on a connected wallet.
    async fn mirror_upload(&self, content_hash: &str, document_type: &str) -> MirrorOutcome {
        if self.connector.address().await.is_none() {
            return MirrorOutcome::NoWallet;
        }

        match self.ledger.upload_document(content_hash, document_type).await {
            Ok(pending) => {
                self.notices
                    .notify(NoticeLevel::Success, "Document recorded on the ledger");
                MirrorOutcome::Recorded {
                    tx_hash: pending.tx_hash,
                }
            }
            Err(Error::UserRejected(_)) => {
                self.notices.notify(
                    NoticeLevel::Warning,
                    "Document saved; ledger recording skipped (rejected in wallet)",
                );
                MirrorOutcome::UserDeclined
            }
            Err(e) => {
                warn!(error = %e, "Ledger mirror of upload failed");
                self.notices.notify(
                    NoticeLevel::Warning,
                    "Document saved but ledger recording failed",
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
    use crate::wallet::mock::MockWalletProvider;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        _dir: tempfile::TempDir,
        store: ClientStore,
        workflow: UploadWorkflow,
    }

    async fn harness(server: &MockServer) -> Harness {
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

        let notices = Notices::tracing();
        let auth = AuthClient::new(server.uri(), tokens, notices.clone());
        let api = BackendApi::new(auth.clone());
        let config = Config::new(server.uri()).with_rpc_url("http://127.0.0.1:9");
        let content = ContentStoreClient::new(
            server.uri(),
            config.gateways.clone(),
            auth.clone(),
        );
        let wallet = Arc::new(MockWalletProvider::new());
        let ledger = Arc::new(LedgerClient::new(&config, wallet.clone()).unwrap());
        let connector = WalletConnector::new(
            wallet,
            ledger.clone(),
            store.clone(),
            notices.clone(),
        );

        Harness {
            _dir: dir,
            store: store.clone(),
            workflow: UploadWorkflow::new(content, api, connector, ledger, store, notices),
        }
    }

    #[tokio::test]
    async fn backend_success_without_wallet_is_full_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/upload/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ipfs_hash": "QmUpload"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 5, "status": "pending", "ipfs_hash": "QmUpload",
                 "upload_date": "2026-08-01T10:00:00Z"},
                {"id": 9, "status": "pending", "ipfs_hash": "QmUpload",
                 "upload_date": "2026-08-03T10:00:00Z"},
                {"id": 2, "status": "verified", "ipfs_hash": "QmOther",
                 "upload_date": "2026-08-04T10:00:00Z"}
            ])))
            .mount(&server)
            .await;

        let h = harness(&server).await;
        let outcome = h
            .workflow
            .run(b"document bytes".to_vec(), "passport.pdf", "passport")
            .await
            .unwrap();

        assert_eq!(outcome.content_hash, "QmUpload");
        // Most recent matching record wins the tie-break.
        assert_eq!(outcome.document_id(), Some(9));
        assert_eq!(outcome.mirror, MirrorOutcome::NoWallet);
        assert!(outcome.mirror.tx_hash().is_none());
        assert_eq!(
            h.store.current_verification_id().unwrap().as_deref(),
            Some("9")
        );
    }

    #[tokio::test]
    async fn missing_backend_record_still_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/upload/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ipfs_hash": "QmLost"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let h = harness(&server).await;
        let outcome = h
            .workflow
            .run(b"bytes".to_vec(), "id.png", "national_id")
            .await
            .unwrap();

        assert!(outcome.document.is_none());
        assert!(h.store.current_verification_id().unwrap().is_none());
    }

    #[tokio::test]
    async fn content_upload_failure_fails_the_workflow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/upload/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let h = harness(&server).await;
        let err = h
            .workflow
            .run(b"bytes".to_vec(), "id.png", "national_id")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }
}
