//! # User Collection
//!
//! Accounts keyed by id, with a unique e-mail index.

use crate::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use crate::store::{encode, load, DocumentStore};
use chrono::Utc;
use ridex_types::{User, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

const USER_PREFIX: &str = "users/";
const EMAIL_INDEX_PREFIX: &str = "idx/users/email/";

/// A user document as stored: the public `User` plus its password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    /// Encoded password hash. Never leaves the service layer.
    pub password: String,
}

impl UserRecord {
    pub fn new(user: User, password_hash: impl Into<String>) -> Self {
        Self {
            user,
            password: password_hash.into(),
        }
    }
}

fn user_key(id: UserId) -> Vec<u8> {
    format!("{USER_PREFIX}{id}").into_bytes()
}

fn email_key(email: &str) -> Vec<u8> {
    format!("{EMAIL_INDEX_PREFIX}{}", normalize_email(email)).into_bytes()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// User documents.
#[derive(Debug, Clone)]
pub struct UserCollection {
    store: DocumentStore,
}

impl UserCollection {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Insert a new account.
    ///
    /// Fails with `DuplicateEmail` when the e-mail (case-insensitive) is
    /// already registered.
    pub fn insert(&self, mut record: UserRecord) -> Result<User, StoreError> {
        record.user.email = normalize_email(&record.user.email);
        let id = record.user.id;
        let email_idx = email_key(&record.user.email);

        let mut kv = self.store.write();
        if kv.exists(&email_idx)? {
            return Err(StoreError::DuplicateEmail(record.user.email));
        }
        if kv.exists(&user_key(id))? {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        kv.atomic_batch_write(vec![
            BatchOperation::put(user_key(id), encode(&record)?),
            BatchOperation::put(email_idx, id.to_string()),
        ])?;
        debug!(user_id = %id, role = %record.user.role, "User inserted");
        Ok(record.user)
    }

    pub fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let kv = self.store.read();
        load(&**kv, &user_key(id))
    }

    /// Look up an account by e-mail, ignoring case and surrounding spaces.
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let kv = self.store.read();
        let Some(raw_id) = kv.get(&email_key(email))? else {
            return Ok(None);
        };
        let id = std::str::from_utf8(&raw_id)
            .ok()
            .and_then(|s| UserId::parse(s).ok())
            .ok_or_else(|| StoreError::Corruption {
                message: format!("bad e-mail index entry for {}", normalize_email(email)),
            })?;
        load(&**kv, &user_key(id))
    }

    /// Apply `f` to the stored record and write it back.
    ///
    /// `updatedAt` is refreshed. An e-mail change keeps the index unique.
    pub fn update<E, F>(&self, id: UserId, f: F) -> Result<User, E>
    where
        F: FnOnce(&mut UserRecord) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut kv = self.store.write();
        let key = user_key(id);
        let mut record: UserRecord =
            load(&**kv, &key)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let old_email = record.user.email.clone();

        f(&mut record)?;
        record.user.id = id;
        record.user.email = normalize_email(&record.user.email);
        record.user.updated_at = Utc::now();

        let mut ops = vec![BatchOperation::put(key, encode(&record)?)];
        if record.user.email != old_email {
            let new_idx = email_key(&record.user.email);
            if kv.exists(&new_idx)? {
                return Err(StoreError::DuplicateEmail(record.user.email).into());
            }
            ops.push(BatchOperation::delete(email_key(&old_email)));
            ops.push(BatchOperation::put(new_idx, id.to_string()));
        }
        kv.atomic_batch_write(ops)?;
        Ok(record.user)
    }

    /// Number of registered accounts.
    pub fn count(&self) -> Result<usize, StoreError> {
        let kv = self.store.read();
        Ok(kv.prefix_scan(USER_PREFIX.as_bytes())?.len())
    }
}
