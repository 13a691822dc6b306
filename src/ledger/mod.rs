// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! On-chain document registry integration.
//!
//! This module provides functionality for:
//! - Binding the fixed registry contract interface
//! - Submitting document upload and verification transactions
//! - Read-only document, allow-list, and network introspection
//! - Probing a deployment for liveness

pub mod client;
pub mod contract;
pub mod deployment;
pub mod types;

pub use client::LedgerClient;
pub use deployment::{check_deployment, DeploymentReport};
pub use types::*;
