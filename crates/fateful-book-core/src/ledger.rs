//! Prescription ledger — sled-backed, append-only record of issued prescriptions.
//! Keys are the issue time (big-endian micros) followed by a sled-generated id, so
//! iteration order is chronological.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prescription::Prescription;

pub const DEFAULT_LEDGER_PATH: &str = "./data/ledger";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage: {0}")]
    Sled(#[from] sled::Error),
    #[error("ledger entry encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: u64,
    pub code: String,
    pub shadow: bool,
    pub prescription: Prescription,
    pub issued_at: DateTime<Utc>,
}

pub struct PrescriptionLedger {
    db: sled::Db,
}

impl PrescriptionLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn record(&self, code: &str, shadow: bool, prescription: &Prescription) -> Result<LedgerEntry, LedgerError> {
        let entry = LedgerEntry {
            id: self.db.generate_id()?,
            code: code.to_string(),
            shadow,
            prescription: prescription.clone(),
            issued_at: Utc::now(),
        };
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&(entry.issued_at.timestamp_micros().max(0) as u64).to_be_bytes());
        key.extend_from_slice(&entry.id.to_be_bytes());

        self.db.insert(key, serde_json::to_vec(&entry)?)?;
        self.db.flush()?;
        Ok(entry)
    }

    /// Newest first. Entries that no longer decode are skipped.
    pub fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries = Vec::new();
        for item in self.db.iter().rev() {
            if entries.len() >= limit {
                break;
            }
            let (_, value) = item?;
            match serde_json::from_slice::<LedgerEntry>(&value) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable ledger entry"),
            }
        }
        Ok(entries)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}
