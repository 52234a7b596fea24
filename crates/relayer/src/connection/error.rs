use core::time::Duration;

use flex_error::define_error;

use ibc_relay_types::core::ics03_connection::connection::State;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ClientId, ConnectionId};
use ibc_relay_types::events::IbcEvent;

use crate::error::{Error as RelayerError, ErrorDetail as RelayerErrorDetail};
use crate::foreign_client::{ForeignClientError, ForeignClientErrorDetail};

define_error! {
    ConnectionError {
        Relayer
            [ RelayerError ]
            |_| { "relayer error" },

        MissingLocalConnectionId
            |_| { "failed due to missing local connection id" },

        MissingCounterpartyConnectionId
            |_| { "failed due to missing counterparty connection id" },

        MissingConnectionIdFromEvent
            |_| { "cannot extract connection_id from result" },

        MissingEvent
            { description: String }
            |e| { format_args!("no {} event in the transaction result", e.description) },

        InvalidConnectionEnd
            { connection_id: ConnectionId }
            |e| { format_args!("connection end {} carries no version", e.connection_id) },

        InvalidEvent
            { event: IbcEvent }
            |e| { format_args!("a connection object cannot be built from {}", e.event) },

        ChainQuery
            { chain_id: ChainId }
            [ RelayerError ]
            |e| {
                format_args!("failed during a query to chain id {0}", e.chain_id)
            },

        ConnectionQuery
            { connection_id: ConnectionId }
            [ RelayerError ]
            |e| {
                format_args!("failed to query the connection for {}", e.connection_id)
            },

        Submit
            { chain_id: ChainId }
            [ RelayerError ]
            |e| {
                format_args!("failed during a transaction submission step to chain {0}",
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

        ClientMismatch
            {
                expected: ChainId,
                actual: ChainId,
            }
            |e| {
                format_args!("the client on the counterparty tracks chain {} instead of {}",
                    e.actual, e.expected)
            },

        UnexpectedStates
            {
                a_state: State,
                b_state: State,
            }
            |e| {
                format_args!("the connection handshake cannot proceed from the state combination {} / {}",
                    e.a_state, e.b_state)
            },

        HandshakeFinalize
            |_| { "connection handshake did not finish" },

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

impl ConnectionError {
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }
}

impl ConnectionErrorDetail {
    fn relayer_source(&self) -> Option<&RelayerErrorDetail> {
        match self {
            Self::Relayer(e) => Some(&e.source),
            Self::ChainQuery(e) => Some(&e.source),
            Self::ConnectionQuery(e) => Some(&e.source),
            Self::Submit(e) => Some(&e.source),
            _ => None,
        }
    }

    fn client_source(&self) -> Option<&ForeignClientErrorDetail> {
        match self {
            Self::ClientOperation(e) => Some(&e.source),
            _ => None,
        }
    }

    /// Connectivity failures, including retries that ran out.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::MaxRetry(_))
            || self
                .relayer_source()
                .map_or(false, RelayerErrorDetail::is_connectivity)
            || self
                .client_source()
                .map_or(false, ForeignClientErrorDetail::is_connectivity)
    }

    /// Anything that is not a connectivity failure aborts the handshake.
    pub fn is_protocol(&self) -> bool {
        !self.is_connectivity()
    }
}
