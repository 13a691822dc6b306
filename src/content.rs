// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Content-addressed store client.
//!
//! Files are pinned by the backend's upload endpoint; the client only
//! needs the resulting content hash and gateway URLs to resolve it.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::auth::AuthClient;
use crate::error::{Error, Result};

const UPLOAD_PATH: &str = "/documents/upload/";

/// A gateway-resolved URL for a content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayUrl {
    /// Gateway host name, for display.
    pub name: String,
    pub url: String,
}

/// Client for uploading documents to the content-addressed store and
/// resolving content hashes to retrievable URLs.
#[derive(Clone)]
pub struct ContentStoreClient {
    http: Client,
    auth: AuthClient,
    base_url: String,
    gateways: Vec<String>,
}

impl ContentStoreClient {
    pub fn new(base_url: impl Into<String>, gateways: Vec<String>, auth: AuthClient) -> Self {
        Self {
            http: Client::new(),
            auth,
            base_url: base_url.into(),
            gateways,
        }
    }

    fn upload_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), UPLOAD_PATH)
    }

    /// Upload a document and return its content hash.
    ///
    /// Requires a valid session: fails fast with `AuthenticationRequired`
    /// before any network call when no token is available. A 401 response
    /// goes through one refresh-and-retry, mirroring the JSON request path.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        document_type: &str,
    ) -> Result<String> {
        let mut token = match self.auth.token().await {
            Some(token) => token,
            None => return Err(Error::AuthenticationRequired),
        };

        debug!(file_name, document_type, "Uploading document");

        // Multipart bodies are single-use; rebuild per attempt.
        for attempt in 0..2 {
            let form = Form::new()
                .part(
                    "file",
                    Part::bytes(bytes.clone()).file_name(file_name.to_string()),
                )
                .text("document_type", document_type.to_string());

            let response = self
                .http
                .post(self.upload_url())
                .header("Authorization", format!("Bearer {token}"))
                .multipart(form)
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                debug!("Upload rejected with 401, refreshing token");
                token = self.auth.refresh().await?;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let detail = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or(body);
                return Err(Error::Api {
                    status,
                    message: format!("upload failed: {detail}"),
                });
            }

            let value: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            let hash = extract_content_hash(&value).ok_or_else(|| {
                Error::MalformedResponse("no content hash found in upload response".to_string())
            })?;

            info!(content_hash = %hash, "Document uploaded to content store");
            return Ok(hash.to_string());
        }

        unreachable!("upload loop always returns within two attempts")
    }

    /// Resolve a content hash against the primary gateway.
    /// Returns `None` for empty input.
    pub fn file_url(&self, content_hash: &str) -> Option<String> {
        if content_hash.is_empty() {
            return None;
        }
        self.gateways
            .first()
            .map(|gateway| format!("{gateway}{content_hash}"))
    }

    /// Resolve a content hash against every configured gateway.
    /// For fallback display only, not correctness-critical paths.
    pub fn gateway_urls(&self, content_hash: &str) -> Vec<GatewayUrl> {
        if content_hash.is_empty() {
            return Vec::new();
        }
        self.gateways
            .iter()
            .map(|gateway| GatewayUrl {
                name: gateway_name(gateway),
                url: format!("{gateway}{content_hash}"),
            })
            .collect()
    }
}

/// Probe the known response shapes for a content hash.
fn extract_content_hash(value: &Value) -> Option<&str> {
    value
        .get("ipfs_hash")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/document/ipfs_hash").and_then(Value::as_str))
        .or_else(|| value.get("ipfsHash").and_then(Value::as_str))
}

fn gateway_name(gateway: &str) -> String {
    Url::parse(gateway)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| gateway.to_string())
}
