// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Session management and the authenticated HTTP client.

pub mod client;
pub mod session;

pub use client::AuthClient;
pub use session::{Session, TokenStore};
