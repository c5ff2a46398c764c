use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque wallet identifier. Compared and hashed as the exact string the
/// backend and the metadata dataset use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WalletAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Static per-wallet attributes from the metadata dataset.
///
/// The dataset uses `sponsor` and `twitter` keys; blank strings are treated
/// the same as a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletMetadata {
    pub address: WalletAddress,
    #[serde(rename = "sponsor", default, deserialize_with = "de_blank_as_none")]
    pub sponsor_tag: Option<String>,
    #[serde(rename = "twitter", default, deserialize_with = "de_blank_as_none")]
    pub handle: Option<String>,
}

/// Balance for one address as returned by the balance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: WalletAddress,
    pub balance: f64,
}

/// A balance joined with the wallet's static metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: WalletAddress,
    pub balance: f64,
    pub sponsor_tag: Option<String>,
    pub handle: Option<String>,
}

impl LeaderboardEntry {
    pub fn join(record: BalanceRecord, metadata: Option<&WalletMetadata>) -> Self {
        Self {
            address: record.address,
            balance: record.balance,
            sponsor_tag: metadata.and_then(|m| m.sponsor_tag.clone()),
            handle: metadata.and_then(|m| m.handle.clone()),
        }
    }
}

fn de_blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
