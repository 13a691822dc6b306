// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Veridoc Client - eKYC Document Verification Integration Layer
//!
//! This crate provides the client-side integration layer of the Veridoc
//! eKYC platform: documents are persisted through the backend REST API
//! (authoritative) and mirrored best-effort onto an on-chain registry for
//! tamper-evidence.
//!
//! ## Modules
//!
//! - `auth` - Session management and the authenticated HTTP client
//! - `api` - Typed backend REST endpoints
//! - `wallet` - Wallet provider seam and connection management
//! - `ledger` - On-chain document registry client
//! - `content` - Content-addressed store client
//! - `workflow` - Dual-write upload/verify orchestration
//! - `notify` - User notices and the notification poller
//! - `storage` - Durable client-side state (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;
pub mod wallet;
pub mod workflow;

pub use api::BackendApi;
pub use auth::{AuthClient, Session, TokenStore};
pub use config::Config;
pub use content::ContentStoreClient;
pub use error::{Error, Result};
pub use ledger::{LedgerClient, NetworkInfo, PendingTransaction};
pub use models::{DocumentRecord, DocumentStatus, VerificationDecision};
pub use notify::{NoticeLevel, Notices, UserNotifier};
pub use services::Services;
pub use storage::ClientStore;
pub use wallet::{ConnectionState, LocalWalletProvider, WalletConnector, WalletProvider};
pub use workflow::{MirrorOutcome, UploadWorkflow, VerifyWorkflow};
