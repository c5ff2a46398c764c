//! Static wallet metadata keyed by address.
//!
//! Built once at startup from the `{address, sponsor, twitter}` dataset and
//! never mutated afterwards. When the dataset lists an address twice, the
//! first record wins.

use anyhow::{Context, Result};
use common::types::{WalletAddress, WalletMetadata};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct MetadataIndex {
    by_address: HashMap<WalletAddress, WalletMetadata>,
}

impl MetadataIndex {
    pub fn from_records(records: impl IntoIterator<Item = WalletMetadata>) -> Self {
        let mut by_address = HashMap::new();
        for record in records {
            match by_address.entry(record.address.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(_) => {
                    warn!(address = %record.address, "duplicate metadata record ignored");
                }
            }
        }
        Self { by_address }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let records: Vec<WalletMetadata> =
            serde_json::from_str(s).context("failed to parse wallet metadata")?;
        Ok(Self::from_records(records))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read wallet metadata: {}", path.display()))?;
        let index = Self::from_json_str(&content)?;
        info!(path = %path.display(), wallets = index.len(), "wallet metadata loaded");
        Ok(index)
    }

    pub fn lookup(&self, address: &str) -> Option<&WalletMetadata> {
        self.by_address.get(address)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
