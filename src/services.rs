// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Session-scoped service wiring.
//!
//! All service objects are explicitly constructed and injected here, one
//! set per application session. Nothing in the crate relies on hidden
//! module-level singletons; hosts pass these references around.

use std::sync::Arc;

use crate::api::BackendApi;
use crate::auth::{AuthClient, TokenStore};
use crate::config::Config;
use crate::content::ContentStoreClient;
use crate::error::Result;
use crate::ledger::LedgerClient;
use crate::notify::{NotificationPoller, Notices, UserNotifier};
use crate::storage::ClientStore;
use crate::wallet::{WalletConnector, WalletProvider};
use crate::workflow::{UploadWorkflow, VerifyWorkflow};

/// One session's worth of wired-up services.
pub struct Services {
    pub config: Config,
    pub store: ClientStore,
    pub notices: Notices,
    pub auth: AuthClient,
    pub api: BackendApi,
    pub content: ContentStoreClient,
    pub ledger: Arc<LedgerClient>,
    pub connector: WalletConnector,
}

impl Services {
    /// Wire every service from the configuration, an injected wallet
    /// provider, and a notice sink.
    pub fn new(
        config: Config,
        wallet: Arc<dyn WalletProvider>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Result<Self> {
        let store = ClientStore::open(&config.data_dir.join("client.redb"))?;
        let notices = Notices::new(notifier);
        let tokens = TokenStore::new(store.clone());
        let auth = AuthClient::new(config.backend_url.clone(), tokens, notices.clone());
        let api = BackendApi::new(auth.clone());
        let content = ContentStoreClient::new(
            config.backend_url.clone(),
            config.gateways.clone(),
            auth.clone(),
        );
        let ledger = Arc::new(LedgerClient::new(&config, wallet.clone())?);
        let connector =
            WalletConnector::new(wallet, ledger.clone(), store.clone(), notices.clone());

        Ok(Self {
            config,
            store,
            notices,
            auth,
            api,
            content,
            ledger,
            connector,
        })
    }

    /// The dual-write upload workflow for this session.
    pub fn upload_workflow(&self) -> UploadWorkflow {
        UploadWorkflow::new(
            self.content.clone(),
            self.api.clone(),
            self.connector.clone(),
            self.ledger.clone(),
            self.store.clone(),
            self.notices.clone(),
        )
    }

    /// The dual-write verify workflow for this session.
    pub fn verify_workflow(&self) -> VerifyWorkflow {
        VerifyWorkflow::new(
            self.api.clone(),
            self.connector.clone(),
            self.ledger.clone(),
            self.notices.clone(),
        )
    }

    /// A notification poller bound to this session's API and notices.
    pub fn notification_poller(&self) -> NotificationPoller {
        NotificationPoller::new(self.api.clone(), self.notices.clone())
    }
}
