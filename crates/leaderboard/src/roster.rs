use common::types::WalletAddress;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterMode {
    /// Addresses come from configuration and cannot be edited.
    Fixed,
    /// Addresses are entered by the user as newline-separated text.
    UserEntered,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("no wallet addresses entered")]
    EmptyInput,
    #[error("address roster is fixed by configuration")]
    Fixed,
}

/// The ordered address set each refresh cycle looks up.
pub struct AddressRoster {
    mode: RosterMode,
    addresses: RwLock<Vec<WalletAddress>>,
}

impl AddressRoster {
    pub fn fixed(addresses: impl IntoIterator<Item = WalletAddress>) -> Self {
        Self {
            mode: RosterMode::Fixed,
            addresses: RwLock::new(dedup_in_order(addresses)),
        }
    }

    pub fn user_entered() -> Self {
        Self {
            mode: RosterMode::UserEntered,
            addresses: RwLock::new(Vec::new()),
        }
    }

    /// A non-empty configured list means a fixed roster.
    pub fn from_config(addresses: &[String]) -> Self {
        if addresses.is_empty() {
            Self::user_entered()
        } else {
            Self::fixed(addresses.iter().map(|a| WalletAddress::new(a.trim())))
        }
    }

    pub fn mode(&self) -> RosterMode {
        self.mode
    }

    pub async fn snapshot(&self) -> Vec<WalletAddress> {
        self.addresses.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.addresses.read().await.len()
    }

    /// Replace the roster from user text. On error the previous roster stays.
    pub async fn enter(&self, text: &str) -> Result<usize, RosterError> {
        if self.mode == RosterMode::Fixed {
            return Err(RosterError::Fixed);
        }
        let parsed = parse_addresses(text)?;
        let count = parsed.len();
        *self.addresses.write().await = parsed;
        info!(count, "address roster replaced");
        Ok(count)
    }
}

/// One address per line; surrounding whitespace and blank lines are dropped,
/// repeats keep their first position.
pub fn parse_addresses(text: &str) -> Result<Vec<WalletAddress>, RosterError> {
    let addresses = dedup_in_order(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(WalletAddress::from),
    );
    if addresses.is_empty() {
        return Err(RosterError::EmptyInput);
    }
    Ok(addresses)
}

fn dedup_in_order(addresses: impl IntoIterator<Item = WalletAddress>) -> Vec<WalletAddress> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}
