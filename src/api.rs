// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Typed wrappers over the backend REST endpoints.
//!
//! Request/response shapes are backend-owned; parsing is deliberately
//! lenient and anything unexpected surfaces as `MalformedResponse`.

use serde_json::{json, Value};
use tracing::debug;

use crate::auth::AuthClient;
use crate::error::{Error, Result};
use crate::models::{BackendNotification, DocumentRecord, VerificationDecision};

/// Backend document and profile API.
#[derive(Clone)]
pub struct BackendApi {
    auth: AuthClient,
}

impl BackendApi {
    pub fn new(auth: AuthClient) -> Self {
        Self { auth }
    }

    /// The authenticated client backing this API.
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// List the caller's document records.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let value = self.auth.get_json("/documents/").await?;
        parse_records(value)
    }

    /// Fetch one document record.
    pub async fn document(&self, document_id: i64) -> Result<DocumentRecord> {
        let value = self
            .auth
            .get_json(&format!("/documents/{document_id}/"))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Update a document's review status and notes.
    pub async fn verify_document(
        &self,
        document_id: i64,
        decision: VerificationDecision,
        notes: &str,
    ) -> Result<()> {
        let body = json!({
            "status": decision.as_status(),
            "notes": notes,
        });
        self.auth
            .post_json(&format!("/documents/{document_id}/verify/"), &body)
            .await?;
        debug!(document_id, ?decision, "Document status updated");
        Ok(())
    }

    /// Documents awaiting review.
    pub async fn pending_documents(&self) -> Result<Vec<DocumentRecord>> {
        let value = self.auth.get_json("/documents/pending/").await?;
        parse_records(value)
    }

    /// Completed verifications.
    pub async fn verification_history(&self) -> Result<Vec<DocumentRecord>> {
        let value = self.auth.get_json("/documents/history/").await?;
        parse_records(value)
    }

    /// Update the caller's profile. The payload shape is backend-owned.
    pub async fn update_profile(&self, payload: &Value) -> Result<Value> {
        self.auth.put_json("/profile/update/", payload).await
    }

    /// Whether the backend still accepts the current session. Any failure
    /// counts as unauthenticated.
    pub async fn auth_status(&self) -> bool {
        self.auth.get_json("/auth/status/").await.is_ok()
    }

    /// Backend notifications for the current user.
    pub async fn notifications(&self) -> Result<Vec<BackendNotification>> {
        let value = self.auth.get_json("/notifications/").await?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

fn parse_records(value: Value) -> Result<Vec<DocumentRecord>> {
    // Some list endpoints wrap the array in a `results` envelope.
    let list = match value {
        Value::Array(_) => value,
        Value::Object(ref map) if map.contains_key("results") => {
            map.get("results").cloned().unwrap_or(Value::Null)
        }
        other => {
            return Err(Error::MalformedResponse(format!(
                "expected a document list, got: {other}"
            )))
        }
    };
    serde_json::from_value(list).map_err(|e| Error::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, TokenStore};
    use crate::notify::Notices;
    use crate::storage::ClientStore;
    use chrono::{Duration, Utc};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api_for(server: &MockServer) -> (tempfile::TempDir, BackendApi) {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::open(&dir.path().join("client.redb")).unwrap();
        let tokens = TokenStore::new(store);
        tokens
            .replace(Session {
                access_token: "token".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                user_id: None,
                role: None,
            })
            .await;
        let auth = AuthClient::new(server.uri(), tokens, Notices::tracing());
        (dir, BackendApi::new(auth))
    }

    #[tokio::test]
    async fn list_documents_parses_plain_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "status": "pending", "ipfs_hash": "QmA"},
                {"id": 2, "status": "verified"}
            ])))
            .mount(&server)
            .await;

        let (_dir, api) = api_for(&server).await;
        let records = api.list_documents().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ipfs_hash.as_deref(), Some("QmA"));
    }

    #[tokio::test]
    async fn list_documents_unwraps_results_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": 3, "status": "rejected"}]
            })))
            .mount(&server)
            .await;

        let (_dir, api) = api_for(&server).await;
        let records = api.list_documents().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 3);
    }

    #[tokio::test]
    async fn verify_document_posts_status_and_notes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/9/verify/"))
            .and(body_partial_json(serde_json::json!({
                "status": "verified",
                "notes": "all good"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let (_dir, api) = api_for(&server).await;
        api.verify_document(9, VerificationDecision::Verified, "all good")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn auth_status_false_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/status/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (_dir, api) = api_for(&server).await;
        assert!(!api.auth_status().await);
    }
}
