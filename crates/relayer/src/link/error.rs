use flex_error::define_error;

use ibc_relay_types::core::ics04_channel::error::Error as ChannelTypesError;
use ibc_relay_types::core::ics04_channel::packet::Sequence;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ChannelId, PortId};
use ibc_relay_types::events::IbcEvent;

use crate::channel::{ChannelError, ChannelErrorDetail};
use crate::error::{Error as RelayerError, ErrorDetail as RelayerErrorDetail};
use crate::foreign_client::{ForeignClientError, ForeignClientErrorDetail};
use crate::link::packet_ledger::PacketState;

define_error! {
    LinkError {
        Relayer
            [ RelayerError ]
            |_| { "failed with underlying error" },

        ChannelNotFound
            {
                port_id: PortId,
                channel_id: ChannelId,
                chain_id: ChainId,
            }
            [ RelayerError ]
            |e| {
                format!("channel {}/{} does not exist on chain {}",
                    e.port_id, e.channel_id, e.chain_id)
            },

        ChannelNotOpened
            {
                channel_id: ChannelId,
                chain_id: ChainId,
            }
            |e| {
                format!("channel {} on chain {} is not open",
                    e.channel_id, e.chain_id)
            },

        CounterpartyChannelNotFound
            { channel_id: ChannelId }
            |e| {
                format!("failed to find counterparty channel id for src channel {}",
                    e.channel_id)
            },

        CounterpartyMismatch
            {
                chain_id: ChainId,
                channel_id: ChannelId,
            }
            |e| {
                format!("channel {} on chain {} does not point back at its counterparty",
                    e.channel_id, e.chain_id)
            },

        Initialization
            [ ChannelError ]
            |_| { "failed to initialize channel for packet worker" },

        Query
            { chain_id: ChainId }
            [ RelayerError ]
            |e| { format!("failed during query to chain id {}", e.chain_id) },

        Submit
            { chain_id: ChainId }
            [ RelayerError ]
            |e| { format!("failed to submit packet messages to chain id {}", e.chain_id) },

        Client
            { chain_id: ChainId }
            [ ForeignClientError ]
            |e| { format!("failed to build a client update for chain id {}", e.chain_id) },

        StaleProofEscalated
            {
                sequence: Sequence,
                chain_id: ChainId,
            }
            [ RelayerError ]
            |e| {
                format!("proofs for packet {} were rejected as stale twice by chain {}",
                    e.sequence, e.chain_id)
            },

        UnexpectedEvent
            { event: IbcEvent }
            |e| { format!("unexpected event in the transaction result: {}", e.event) },

        MissingEvent
            { description: String }
            |e| { format!("no event in the result of {}", e.description) },

        InvalidAcknowledgement
            { sequence: Sequence }
            [ ChannelTypesError ]
            |e| { format!("invalid acknowledgement for packet {}", e.sequence) },

        LedgerTransition
            {
                sequence: Sequence,
                from: PacketState,
                to: PacketState,
            }
            |e| {
                format!("packet {} cannot move from {} to {}",
                    e.sequence, e.from, e.to)
            },
    }
}

impl LinkError {
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }

    pub fn is_stale_proof(&self) -> bool {
        self.detail().is_stale_proof()
    }
}

impl LinkErrorDetail {
    fn relayer_source(&self) -> Option<&RelayerErrorDetail> {
        match self {
            Self::Relayer(e) => Some(&e.source),
            Self::ChannelNotFound(e) => Some(&e.source),
            Self::Query(e) => Some(&e.source),
            Self::Submit(e) => Some(&e.source),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Initialization(e) => ChannelErrorDetail::is_connectivity(&e.source),
            Self::Client(e) => ForeignClientErrorDetail::is_connectivity(&e.source),
            _ => self
                .relayer_source()
                .map_or(false, RelayerErrorDetail::is_connectivity),
        }
    }

    /// Repeated stale proofs count as a protocol failure.
    pub fn is_protocol(&self) -> bool {
        !self.is_connectivity()
    }

    pub fn is_stale_proof(&self) -> bool {
        match self {
            Self::StaleProofEscalated(_) => true,
            _ => self
                .relayer_source()
                .map_or(false, RelayerErrorDetail::is_stale_proof),
        }
    }
}
