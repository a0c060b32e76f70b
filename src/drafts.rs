//! # Draft Registry Module
//!
//! Task bodies are stored here by reference so that button payloads only
//! carry a short identifier. Callback data is limited to 64 bytes, far less
//! than a typical task description.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::TaskError;

/// Number of hash bytes kept in a draft identifier (hex encoded to twice as many chars)
const DRAFT_ID_BYTES: usize = 8;

/// Short content-derived identifier of a draft
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftId(String);

impl DraftId {
    /// Derive the identifier of a task body.
    ///
    /// Identical bodies always map to the same identifier.
    pub fn derive(body: &str) -> Self {
        let digest = Sha256::digest(body.as_bytes());
        DraftId(hex::encode(&digest[..DRAFT_ID_BYTES]))
    }

    /// Wrap an identifier decoded from a callback payload
    pub fn from_raw(raw: impl Into<String>) -> Self {
        DraftId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct DraftEntry {
    body: String,
    holders: usize,
    stored_at: Instant,
}

/// Thread-safe registry of pending task bodies
///
/// Entries are reference counted: every dialog that registers a body holds
/// one reference and releases it when the dialog ends. Entries older than
/// the configured TTL are evicted regardless of holders, which bounds memory
/// when a dialog is lost without releasing its draft.
#[derive(Debug)]
pub struct DraftRegistry {
    entries: Mutex<HashMap<DraftId, DraftEntry>>,
    ttl: Duration,
}

impl DraftRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a body and return its identifier
    pub fn put(&self, body: &str) -> DraftId {
        let id = DraftId::derive(body);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Self::evict_expired(&mut entries, self.ttl);

        let entry = entries.entry(id.clone()).or_insert_with(|| DraftEntry {
            body: body.to_string(),
            holders: 0,
            stored_at: Instant::now(),
        });
        entry.holders += 1;
        entry.stored_at = Instant::now();
        debug!(draft_id = %id, holders = entry.holders, "Draft registered");

        id
    }

    /// Look up the body of a draft
    pub fn get(&self, id: &DraftId) -> Result<String, TaskError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(id)
            .map(|entry| entry.body.clone())
            .ok_or_else(|| TaskError::DraftNotFound(id.clone()))
    }

    /// Drop one reference to a draft, removing it when no dialog holds it
    pub fn release(&self, id: &DraftId) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(id) {
            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders == 0 {
                entries.remove(id);
                debug!(draft_id = %id, "Draft released");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(entries: &mut HashMap<DraftId, DraftEntry>, ttl: Duration) {
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired drafts");
        }
    }
}
