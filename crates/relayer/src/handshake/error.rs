use core::time::Duration;

use flex_error::define_error;

use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::ChainId;

use crate::channel::{ChannelError, ChannelErrorDetail};
use crate::connection::{ConnectionError, ConnectionErrorDetail};
use crate::error::{Error as RelayerError, ErrorDetail as RelayerErrorDetail};
use crate::foreign_client::{ForeignClientError, ForeignClientErrorDetail};
use crate::registry::PathStoreError;

define_error! {
    HandshakeError {
        VersionMismatch
            {
                a_version: Version,
                b_version: Version,
            }
            |e| {
                format!("requested channel versions differ between the two sides: {} and {}",
                    e.a_version, e.b_version)
            },

        Relayer
            { chain_id: ChainId }
            [ RelayerError ]
            |e| { format!("failed to query chain {}", e.chain_id) },

        Client
            { chain_id: ChainId }
            [ ForeignClientError ]
            |e| { format!("failed to create a client on chain {}", e.chain_id) },

        Connection
            [ ConnectionError ]
            |_| { "connection handshake failed" },

        Channel
            [ ChannelError ]
            |_| { "channel handshake failed" },

        Registry
            [ PathStoreError ]
            |_| { "failed to access the path registry" },

        MissingIdentifier
            { description: String }
            |e| { format!("the handshake completed without {}", e.description) },

        MaxRetry
            {
                description: String,
                tries: u64,
                total_delay: Duration,
                reason: String,
            }
            |e| {
                format!("error after maximum retry of {} and total delay of {}s: {}: {}",
                    e.tries, e.total_delay.as_secs(), e.description, e.reason)
            },
    }
}

impl HandshakeError {
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }
}

impl HandshakeErrorDetail {
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::MaxRetry(_) => true,
            Self::Relayer(e) => RelayerErrorDetail::is_connectivity(&e.source),
            Self::Client(e) => ForeignClientErrorDetail::is_connectivity(&e.source),
            Self::Connection(e) => ConnectionErrorDetail::is_connectivity(&e.source),
            Self::Channel(e) => ChannelErrorDetail::is_connectivity(&e.source),
            _ => false,
        }
    }

    /// A disagreement between the chains, or with what was requested.
    /// Retrying cannot resolve it.
    pub fn is_protocol(&self) -> bool {
        match self {
            Self::VersionMismatch(_) | Self::MissingIdentifier(_) => true,
            Self::Registry(_) => false,
            _ => !self.is_connectivity(),
        }
    }
}
