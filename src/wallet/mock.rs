// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Scriptable wallet provider for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::broadcast;

use super::provider::{ProviderError, TxParams, WalletEvent, WalletProvider};

pub(crate) struct MockWalletProvider {
    default_account: Option<Address>,
    silent_accounts: Mutex<Vec<Address>>,
    request_script: Mutex<VecDeque<Result<Vec<Address>, ProviderError>>>,
    send_error: Mutex<Option<ProviderError>>,
    pub sent: Mutex<Vec<TxParams>>,
    pub request_calls: AtomicUsize,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWalletProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            default_account: None,
            silent_accounts: Mutex::new(Vec::new()),
            request_script: Mutex::new(VecDeque::new()),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            request_calls: AtomicUsize::new(0),
            events,
        }
    }

    /// Provider whose `request_accounts` succeeds with the given account.
    pub fn with_account(address: Address) -> Self {
        let mut mock = Self::new();
        mock.default_account = Some(address);
        mock
    }

    /// Queue an explicit outcome for the next `request_accounts` call.
    pub fn push_request_result(&self, result: Result<Vec<Address>, ProviderError>) {
        self.request_script.lock().unwrap().push_back(result);
    }

    /// Make every `send_transaction` fail with the given error.
    pub fn fail_sends_with(&self, error: ProviderError) {
        *self.send_error.lock().unwrap() = Some(error);
    }

    pub fn set_silent_accounts(&self, accounts: Vec<Address>) {
        *self.silent_accounts.lock().unwrap() = accounts;
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn request_call_count(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.request_script.lock().unwrap().pop_front() {
            return result;
        }
        Ok(self.default_account.into_iter().collect())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(self.silent_accounts.lock().unwrap().clone())
    }

    async fn send_transaction(&self, params: TxParams) -> Result<String, ProviderError> {
        self.sent.lock().unwrap().push(params);
        if let Some(error) = self.send_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok("0x00000000000000000000000000000000000000000000000000000000deadbeef".to_string())
    }

    async fn personal_sign(
        &self,
        _address: Address,
        message: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("0xsigned-{message}"))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
