//! Credential storage
//!
//! `SimpleStorage` composes four independent key-value tables:
//!
//! | table            | key           | value               |
//! |------------------|---------------|---------------------|
//! | `clients`        | client id     | cached `Client`     |
//! | `grant_codes`    | grant code    | session id          |
//! | `grant_info`     | access token  | `GrantInfo`         |
//! | `refresh_tokens` | refresh token | access token        |
//!
//! The `grant_info` and `refresh_tokens` tables always change together. A
//! storage-level `RwLock` makes each two-table write one unit, so a reader
//! resolving a refresh token never sees the index point at a record that is
//! not there yet (or any more).

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kv_store::{KeyValueStore, LruStore, SyncMapStore};
use tracing::debug;

use crate::client::{Client, ClientResolver};
use crate::error::{Error, Result};
use crate::grant::GrantInfo;

/// Storage operations used by the authorization and grant engines.
pub trait Storage: Send + Sync {
    /// Cached client, falling back to the resolver on a miss.
    fn get_client(&self, id: &str) -> Result<Arc<dyn Client>>;

    fn save_grant_code(&self, code: &str, session_id: &str) -> Result<()>;

    fn get_grant_code(&self, code: &str) -> Result<String>;

    /// Remove a grant code and return its session id in one step.
    fn take_grant_code(&self, code: &str) -> Result<String>;

    fn remove_grant_code(&self, code: &str) -> Result<()>;

    /// Store the record under its access token and index it by refresh token.
    fn save_grant_info(&self, info: &GrantInfo) -> Result<()>;

    fn get_grant_info_by_access_token(&self, access_token: &str) -> Result<GrantInfo>;

    fn get_grant_info_by_refresh_token(&self, refresh_token: &str) -> Result<GrantInfo>;

    /// Delete the record and the refresh index entry that points at it.
    fn remove_access_token(&self, access_token: &str) -> Result<()>;

    /// Delete only the refresh index entry.
    fn remove_refresh_token(&self, refresh_token: &str) -> Result<()>;
}

/// Table backend selection for `SimpleStorage::with_backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Unbounded concurrent maps
    SyncMap,
    /// LRU tables, each holding at most `capacity` entries
    Lru { capacity: usize },
}

impl Backend {
    fn table<V: Clone + Send + Sync + 'static>(self) -> Result<Box<dyn KeyValueStore<V>>> {
        Ok(match self {
            Backend::SyncMap => Box::new(SyncMapStore::new()),
            Backend::Lru { capacity } => Box::new(LruStore::new(capacity)?),
        })
    }
}

/// Key-value backed `Storage`.
pub struct SimpleStorage {
    clients: Box<dyn KeyValueStore<Arc<dyn Client>>>,
    grant_codes: Box<dyn KeyValueStore<String>>,
    grant_info: Box<dyn KeyValueStore<GrantInfo>>,
    refresh_tokens: Box<dyn KeyValueStore<String>>,
    resolver: Option<ClientResolver>,
    grant_lock: RwLock<()>,
}

impl SimpleStorage {
    /// All four tables as unbounded concurrent maps.
    pub fn new(resolver: Option<ClientResolver>) -> Self {
        Self::from_tables(
            Box::new(SyncMapStore::new()),
            Box::new(SyncMapStore::new()),
            Box::new(SyncMapStore::new()),
            Box::new(SyncMapStore::new()),
            resolver,
        )
    }

    /// Credential tables built from `backend`. The client cache stays an
    /// unbounded map so registered clients are never evicted.
    pub fn with_backend(resolver: Option<ClientResolver>, backend: Backend) -> Result<Self> {
        Ok(Self::from_tables(
            Box::new(SyncMapStore::new()),
            backend.table()?,
            backend.table()?,
            backend.table()?,
            resolver,
        ))
    }

    /// Assemble from individually chosen tables.
    pub fn from_tables(
        clients: Box<dyn KeyValueStore<Arc<dyn Client>>>,
        grant_codes: Box<dyn KeyValueStore<String>>,
        grant_info: Box<dyn KeyValueStore<GrantInfo>>,
        refresh_tokens: Box<dyn KeyValueStore<String>>,
        resolver: Option<ClientResolver>,
    ) -> Self {
        Self {
            clients,
            grant_codes,
            grant_info,
            refresh_tokens,
            resolver,
            grant_lock: RwLock::new(()),
        }
    }

    /// Cache a client directly.
    pub fn put_client(&self, client: Arc<dyn Client>) -> Result<()> {
        let id = client.id().to_owned();
        self.clients.put(&id, client)?;
        debug!(client_id = %id, "client cached");
        Ok(())
    }

    pub fn remove_client(&self, id: &str) -> Result<()> {
        self.clients.delete(id)?;
        Ok(())
    }

    fn read_grants(&self) -> Result<RwLockReadGuard<'_, ()>> {
        self.grant_lock
            .read()
            .map_err(|_| Error::Storage("grant lock poisoned".into()))
    }

    fn write_grants(&self) -> Result<RwLockWriteGuard<'_, ()>> {
        self.grant_lock
            .write()
            .map_err(|_| Error::Storage("grant lock poisoned".into()))
    }
}

impl Storage for SimpleStorage {
    fn get_client(&self, id: &str) -> Result<Arc<dyn Client>> {
        match self.clients.get(id) {
            Ok(client) => return Ok(client),
            Err(kv_store::Error::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let Some(resolver) = &self.resolver else {
            return Err(Error::NotFound(format!("client {id}")));
        };
        let client = resolver(id)?;
        self.clients.put(id, client.clone())?;
        debug!(client_id = id, "client resolved and cached");
        Ok(client)
    }

    fn save_grant_code(&self, code: &str, session_id: &str) -> Result<()> {
        self.grant_codes.put(code, session_id.to_owned())?;
        Ok(())
    }

    fn get_grant_code(&self, code: &str) -> Result<String> {
        Ok(self.grant_codes.get(code)?)
    }

    fn take_grant_code(&self, code: &str) -> Result<String> {
        Ok(self.grant_codes.take(code)?)
    }

    fn remove_grant_code(&self, code: &str) -> Result<()> {
        self.grant_codes.delete(code)?;
        Ok(())
    }

    fn save_grant_info(&self, info: &GrantInfo) -> Result<()> {
        let _guard = self.write_grants()?;
        self.grant_info.put(&info.access_token, info.clone())?;
        if let Err(e) = self
            .refresh_tokens
            .put(&info.refresh_token, info.access_token.clone())
        {
            // keep the tables in step: no record without its index
            let _ = self.grant_info.delete(&info.access_token);
            return Err(e.into());
        }
        debug!(client_id = %info.client_id, session_id = %info.session_id, "grant info saved");
        Ok(())
    }

    fn get_grant_info_by_access_token(&self, access_token: &str) -> Result<GrantInfo> {
        Ok(self.grant_info.get(access_token)?)
    }

    fn get_grant_info_by_refresh_token(&self, refresh_token: &str) -> Result<GrantInfo> {
        let _guard = self.read_grants()?;
        let access_token = self.refresh_tokens.get(refresh_token)?;
        Ok(self.grant_info.get(&access_token)?)
    }

    fn remove_access_token(&self, access_token: &str) -> Result<()> {
        let _guard = self.write_grants()?;
        let info = self.grant_info.get(access_token)?;
        self.grant_info.delete(access_token)?;
        self.refresh_tokens.delete(&info.refresh_token)?;
        debug!(client_id = %info.client_id, session_id = %info.session_id, "access token removed");
        Ok(())
    }

    fn remove_refresh_token(&self, refresh_token: &str) -> Result<()> {
        let _guard = self.write_grants()?;
        self.refresh_tokens.delete(refresh_token)?;
        Ok(())
    }
}

/// Client lookup for the engines: a missing client is `ClientNotFound`.
pub(crate) fn resolve_client(storage: &dyn Storage, id: &str) -> Result<Arc<dyn Client>> {
    storage
        .get_client(id)
        .map_err(|e| e.or_if_missing(Error::ClientNotFound(id.to_owned())))
}
