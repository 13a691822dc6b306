// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Backend-owned records referenced by the client.
//!
//! The client never originates a document record's lifecycle; it only
//! submits creation/update requests and reads the results, so every field
//! beyond the minimal contract is optional and tolerated when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status of a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Verified")]
    Verified,
    #[serde(alias = "Rejected")]
    Rejected,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Capitalized form, matching what the registry contract stores.
        match self {
            DocumentStatus::Pending => write!(f, "Pending"),
            DocumentStatus::Verified => write!(f, "Verified"),
            DocumentStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Outcome a reviewer assigns to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationDecision {
    Verified,
    Rejected,
}

impl VerificationDecision {
    pub fn as_status(&self) -> DocumentStatus {
        match self {
            VerificationDecision::Verified => DocumentStatus::Verified,
            VerificationDecision::Rejected => DocumentStatus::Rejected,
        }
    }
}

/// A document record as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub status: DocumentStatus,
    #[serde(default)]
    pub ipfs_hash: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verification_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Owner's on-chain address, when the backend knows it.
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// A backend notification entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendNotification {
    pub id: i64,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
