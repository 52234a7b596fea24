use core::time::Duration;

use flex_error::define_error;

use ibc_relay_types::core::ics04_channel::channel::{Order, State};
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};

use crate::error::{Error as RelayerError, ErrorDetail as RelayerErrorDetail};
use crate::foreign_client::{ForeignClientError, ForeignClientErrorDetail};

define_error! {
    ChannelError {
        Relayer
            [ RelayerError ]
            |_| { "relayer error" },

        MissingLocalConnection
            { chain_id: ChainId }
            |e| {
                format_args!("channel constructor failed due to missing connection id on chain id {0}",
                    e.chain_id)
            },

        MissingLocalChannelId
            |_| { "failed due to missing local channel id" },

        MissingCounterpartyChannelId
            |_| { "failed due to missing counterparty channel id" },

        MissingChannelIdFromEvent
            |_| { "cannot extract channel_id from result" },

        MissingEvent
            { description: String }
            |e| { format_args!("no {} event in the transaction result", e.description) },

        NoConnectionHop
            {
                port_id: PortId,
                channel_id: ChannelId,
            }
            |e| {
                format_args!("channel {}/{} has no connection hop", e.port_id, e.channel_id)
            },

        ConnectionNotOpen
            { connection_id: ConnectionId }
            |e| { format_args!("connection {} is not open", e.connection_id) },

        Query
            { chain_id: ChainId }
            [ RelayerError ]
            |e| { format_args!("failed during a query to chain id {0}", e.chain_id) },

        ChannelQuery
            {
                port_id: PortId,
                channel_id: ChannelId,
            }
            [ RelayerError ]
            |e| {
                format_args!("failed to query the channel end {}/{}", e.port_id, e.channel_id)
            },

        Submit
            { chain_id: ChainId }
            [ RelayerError ]
            |e| {
                format_args!("failed during a transaction submission step to chain id {0}",
                    e.chain_id)
            },

        ClientOperation
            {
                client_id: ClientId,
                chain_id: ChainId,
            }
            [ ForeignClientError ]
            |e| {
                format_args!("failed during an operation on client ({0}) hosted by chain ({1})",
                    e.client_id, e.chain_id)
            },

        OrderingMismatch
            {
                chain_id: ChainId,
                expected: Order,
                actual: Order,
            }
            |e| {
                format_args!("channel end on chain {} is {} while {} was requested",
                    e.chain_id, e.actual, e.expected)
            },

        VersionMismatch
            {
                chain_id: ChainId,
                expected: Version,
                actual: Version,
            }
            |e| {
                format_args!("channel end on chain {} has version '{}' while '{}' was requested",
                    e.chain_id, e.actual, e.expected)
            },

        UnexpectedStates
            {
                a_state: State,
                b_state: State,
            }
            |e| {
                format_args!("the channel handshake cannot proceed from the state combination {} / {}",
                    e.a_state, e.b_state)
            },

        HandshakeFinalize
            |_| { "channel handshake did not finish" },

        MaxRetry
            {
                description: String,
                tries: u64,
                total_delay: Duration,
                reason: String,
            }
            |e| {
                format_args!("error after maximum retry of {} and total delay of {}s: {}: {}",
                    e.tries, e.total_delay.as_secs(), e.description, e.reason)
            },
    }
}

impl ChannelError {
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }
}

impl ChannelErrorDetail {
    fn relayer_source(&self) -> Option<&RelayerErrorDetail> {
        match self {
            Self::Relayer(e) => Some(&e.source),
            Self::Query(e) => Some(&e.source),
            Self::ChannelQuery(e) => Some(&e.source),
            Self::Submit(e) => Some(&e.source),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::MaxRetry(_) => true,
            Self::ClientOperation(e) => ForeignClientErrorDetail::is_connectivity(&e.source),
            _ => self
                .relayer_source()
                .map_or(false, RelayerErrorDetail::is_connectivity),
        }
    }

    pub fn is_protocol(&self) -> bool {
        !self.is_connectivity()
    }
}
