//! Persistence of the paths established between chain pairs.
//!
//! A path is stored under the pair of chains and the port of the first
//! chain, so that a later run reuses the same clients, connection and
//! channel instead of creating new ones.

use core::fmt::{Display, Error as FmtError, Formatter};
use std::sync::Arc;

use flex_error::{define_error, TraceError};
use serde::{Deserialize, Serialize};

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};

use crate::config::PathStoreConfig;
use crate::error::Error as RelayerError;

mod mem;
mod sled;

pub use self::mem::MemoryPathStore;
pub use self::sled::SledPathStore;

define_error! {
    PathStoreError {
        Open
            { path: String }
            [ TraceError<::sled::Error> ]
            |e| { format!("failed to open the path store at {}", e.path) },

        Store
            [ RelayerError ]
            |_| { "path store error" },
    }
}

/// Identifies a path: the two chains, and the port on the first one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey {
    pub chain_a: ChainId,
    pub chain_b: ChainId,
    pub port: PortId,
}

impl PathKey {
    pub fn new(chain_a: ChainId, chain_b: ChainId, port: PortId) -> Self {
        Self {
            chain_a,
            chain_b,
            port,
        }
    }

    /// The key of the same path seen from the second chain.
    pub fn reversed(&self, port_b: PortId) -> Self {
        Self::new(self.chain_b.clone(), self.chain_a.clone(), port_b)
    }
}

impl Display for PathKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}-{}:{}", self.chain_a, self.chain_b, self.port)
    }
}

/// The identifiers making up one end of a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSide {
    pub chain_id: ChainId,
    pub client_id: ClientId,
    pub connection_id: ConnectionId,
    pub port_id: PortId,
    pub channel_id: ChannelId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub a_side: PathSide,
    pub b_side: PathSide,
    pub ordering: Order,
    pub version: Version,
}

impl PathRecord {
    pub fn flipped(&self) -> Self {
        Self {
            a_side: self.b_side.clone(),
            b_side: self.a_side.clone(),
            ordering: self.ordering,
            version: self.version.clone(),
        }
    }

    pub fn key(&self) -> PathKey {
        PathKey::new(
            self.a_side.chain_id.clone(),
            self.b_side.chain_id.clone(),
            self.a_side.port_id.clone(),
        )
    }
}

impl Display for PathRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "{}:{}/{} <-> {}:{}/{} ({}, {})",
            self.a_side.chain_id,
            self.a_side.port_id,
            self.a_side.channel_id,
            self.b_side.chain_id,
            self.b_side.port_id,
            self.b_side.channel_id,
            self.ordering,
            self.version,
        )
    }
}

/// A keyed store of path records. Saving always overwrites.
pub trait PathStore: Send + Sync {
    fn lookup(&self, key: &PathKey) -> Result<Option<PathRecord>, PathStoreError>;

    fn save(&self, key: &PathKey, record: &PathRecord) -> Result<(), PathStoreError>;

    /// Number of saves performed through this store.
    fn write_count(&self) -> u64;
}

/// Opens the path store selected by the configuration.
pub fn from_config(config: &PathStoreConfig) -> Result<Arc<dyn PathStore>, PathStoreError> {
    match config {
        PathStoreConfig::Memory => Ok(Arc::new(MemoryPathStore::new())),
        PathStoreConfig::Sled { path } => Ok(Arc::new(SledPathStore::open(path)?)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use ibc_relay_types::core::ics02_client::client_type::ClientType;
    use test_log::test;

    pub fn record(chain_a: &str, chain_b: &str, channel: u64) -> PathRecord {
        let side = |chain: &str, n: u64| PathSide {
            chain_id: ChainId::from_string(chain),
            client_id: ClientId::new(ClientType::Mock, n).unwrap(),
            connection_id: ConnectionId::new(n),
            port_id: PortId::transfer(),
            channel_id: ChannelId::new(n),
        };

        PathRecord {
            a_side: side(chain_a, channel),
            b_side: side(chain_b, channel + 1),
            ordering: Order::Unordered,
            version: Version::ics20(),
        }
    }

    #[test]
    fn flipped_record_swaps_sides() {
        let record = record("ibc-0", "ibc-1", 0);
        let flipped = record.flipped();

        assert_eq!(flipped.a_side, record.b_side);
        assert_eq!(flipped.b_side, record.a_side);
        assert_eq!(flipped.flipped(), record);

        assert_eq!(
            flipped.key(),
            record.key().reversed(record.b_side.port_id.clone())
        );
    }

    #[test]
    fn key_display() {
        let key = record("ibc-0", "ibc-1", 0).key();
        assert_eq!(key.to_string(), "ibc-0-ibc-1:transfer");
    }
}
