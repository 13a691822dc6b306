// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Durable client-side state backed by redb (pure Rust, ACID).
//!
//! Replaces the browser's local storage: the serialized session, the
//! persisted wallet address for auto-reconnect, and the single authoritative
//! current-verification-id key survive process restarts.
//!
//! ## Table Layout
//!
//! - `client_state`: well-known key → value bytes

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};

/// Single key-value table for all persisted client state.
const CLIENT_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("client_state");

const KEY_SESSION: &str = "session";
const KEY_WALLET_ADDRESS: &str = "connected_wallet";
const KEY_VERIFICATION_ID: &str = "current_verification_id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key-value store for the client session, wallet address, and
/// workflow correlation id.
#[derive(Clone)]
pub struct ClientStore {
    db: Arc<Database>,
}

impl ClientStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENT_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENT_STATE)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLIENT_STATE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLIENT_STATE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Read the persisted session, if any.
    pub fn session(&self) -> StoreResult<Option<crate::auth::session::Session>> {
        match self.get(KEY_SESSION)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist the session, replacing any previous one.
    pub fn set_session(&self, session: &crate::auth::session::Session) -> StoreResult<()> {
        let bytes = serde_json::to_vec(session)?;
        self.put(KEY_SESSION, &bytes)
    }

    /// Remove the persisted session.
    pub fn clear_session(&self) -> StoreResult<()> {
        self.delete(KEY_SESSION)
    }

    // =========================================================================
    // Wallet address (auto-reconnect)
    // =========================================================================

    pub fn wallet_address(&self) -> StoreResult<Option<String>> {
        Ok(self
            .get(KEY_WALLET_ADDRESS)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn set_wallet_address(&self, address: &str) -> StoreResult<()> {
        self.put(KEY_WALLET_ADDRESS, address.as_bytes())
    }

    pub fn clear_wallet_address(&self) -> StoreResult<()> {
        self.delete(KEY_WALLET_ADDRESS)
    }

    // =========================================================================
    // Current verification id (workflow correlation across restarts)
    // =========================================================================

    pub fn current_verification_id(&self) -> StoreResult<Option<String>> {
        Ok(self
            .get(KEY_VERIFICATION_ID)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn set_current_verification_id(&self, id: &str) -> StoreResult<()> {
        self.put(KEY_VERIFICATION_ID, id.as_bytes())
    }

    pub fn clear_current_verification_id(&self) -> StoreResult<()> {
        self.delete(KEY_VERIFICATION_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Session;

    fn open_temp() -> (tempfile::TempDir, ClientStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::open(&dir.path().join("client.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn session_round_trip() {
        let (_dir, store) = open_temp();
        assert!(store.session().unwrap().is_none());

        let session = Session {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
            user_id: Some("42".to_string()),
            role: Some("client".to_string()),
        };
        store.set_session(&session).unwrap();

        let loaded = store.session().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));

        store.clear_session().unwrap();
        assert!(store.session().unwrap().is_none());
    }

    #[test]
    fn wallet_address_round_trip() {
        let (_dir, store) = open_temp();
        store
            .set_wallet_address("0x9e1B746457a30C6826f778679Bc2d6AbB9db6DE7")
            .unwrap();
        assert_eq!(
            store.wallet_address().unwrap().as_deref(),
            Some("0x9e1B746457a30C6826f778679Bc2d6AbB9db6DE7")
        );
        store.clear_wallet_address().unwrap();
        assert!(store.wallet_address().unwrap().is_none());
    }

    #[test]
    fn verification_id_is_single_authoritative_key() {
        let (_dir, store) = open_temp();
        store.set_current_verification_id("17").unwrap();
        store.set_current_verification_id("23").unwrap();
        assert_eq!(
            store.current_verification_id().unwrap().as_deref(),
            Some("23")
        );
    }
}
