//! This module defines the various errors that be raised in the relayer.

use core::time::Duration;

use crossbeam_channel::RecvError;
use flex_error::{define_error, DisplayOnly, TraceError};

use ibc_relay_types::core::ics02_client::error::Error as ClientError;
use ibc_relay_types::core::ics04_channel::error::Error as ChannelError;
use ibc_relay_types::core::ics04_channel::packet::Sequence;
use ibc_relay_types::core::ics23_commitment::error::Error as CommitmentError;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};
use ibc_relay_types::events::{ChainError, RejectionCode};
use ibc_relay_types::proofs::ProofError;
use ibc_relay_types::signer::SignerError;
use ibc_relay_types::Height;

define_error! {
    Error {
        Connectivity
            {
                chain_id: ChainId,
                address: String,
                reason: String,
            }
            |e| {
                format!("RPC endpoint {} of chain {} is unreachable: {}",
                    e.address, e.chain_id, e.reason)
            },

        ConnectivityExhausted
            {
                chain_id: ChainId,
                tries: u64,
                total_delay: Duration,
                reason: String,
            }
            |e| {
                format!("chain {} still unreachable after {} tries and a total delay of {}ms: {}",
                    e.chain_id, e.tries, e.total_delay.as_millis(), e.reason)
            },

        StaleQueryHeight
            {
                chain_id: ChainId,
                reported: Height,
                latest_seen: Height,
            }
            |e| {
                format!("chain {} answered at height {}, below the already observed height {}",
                    e.chain_id, e.reported, e.latest_seen)
            },

        ChannelSend
            |_| { "internal message-passing failure while sending inter-thread request/response" },

        ChannelReceive
            [ TraceError<RecvError> ]
            |_| { "internal message-passing failure while receiving inter-thread request/response" },

        ChainIdMismatch
            {
                expected: ChainId,
                actual: ChainId,
            }
            |e| {
                format!("the node reports chain id {} instead of the configured {}",
                    e.actual, e.expected)
            },

        InvalidGasPrice
            { price: String }
            |e| { format!("invalid gas price: {}", e.price) },

        InvalidGasLimit
            { gas_limit: u64 }
            |e| { format!("invalid gas limit {}: must be greater than zero", e.gas_limit) },

        InvalidAddressPrefix
            { prefix: String }
            |e| {
                format!("invalid address prefix '{}': must be a non-empty lowercase bech32 human-readable part",
                    e.prefix)
            },

        Bech32Encoding
            [ TraceError<bech32::Error> ]
            |_| { "bech32 encoding failed" },

        Signer
            [ SignerError ]
            |_| { "invalid signer" },

        ClientNotFound
            {
                chain_id: ChainId,
                client_id: ClientId,
            }
            |e| { format!("client {} not found on chain {}", e.client_id, e.chain_id) },

        ConsensusStateNotFound
            {
                client_id: ClientId,
                height: Height,
            }
            |e| { format!("consensus state of client {} at height {} not found", e.client_id, e.height) },

        ConnectionNotFound
            {
                chain_id: ChainId,
                connection_id: ConnectionId,
            }
            |e| { format!("connection {} not found on chain {}", e.connection_id, e.chain_id) },

        ChannelNotFound
            {
                chain_id: ChainId,
                port_id: PortId,
                channel_id: ChannelId,
            }
            |e| { format!("channel {}/{} not found on chain {}", e.port_id, e.channel_id, e.chain_id) },

        ChannelClosed
            {
                port_id: PortId,
                channel_id: ChannelId,
            }
            |e| { format!("channel {}/{} is not open", e.port_id, e.channel_id) },

        PortNotBound
            { port_id: PortId }
            |e| { format!("no module is bound to port {}", e.port_id) },

        PacketNotFound
            {
                port_id: PortId,
                channel_id: ChannelId,
                sequence: Sequence,
            }
            |e| {
                format!("no packet with sequence {} was sent on {}/{}",
                    e.sequence, e.port_id, e.channel_id)
            },

        HeightNotAvailable
            {
                chain_id: ChainId,
                height: Height,
            }
            |e| {
                format!("height {} of chain {} is outside the retained history",
                    e.height, e.chain_id)
            },

        TxRejected
            {
                chain_id: ChainId,
                chain_error: ChainError,
            }
            |e| { format!("chain {} rejected the message: {}", e.chain_id, e.chain_error) },

        Proof
            [ CommitmentError ]
            |_| { "failed to build proof" },

        MalformedProof
            [ ProofError ]
            |_| { "malformed proof" },

        Client
            [ ClientError ]
            |_| { "light client error" },

        Channel
            [ ChannelError ]
            |_| { "channel error" },

        Decode
            [ TraceError<serde_json::Error> ]
            |_| { "failed to decode stored value" },

        Store
            [ TraceError<sled::Error> ]
            |_| { "store error" },

        Cbor
            [ TraceError<serde_cbor::Error> ]
            |_| { "CBOR encoding error" },

        Other
            [ DisplayOnly<String> ]
            |_| { "other error" },
    }
}

impl Error {
    pub fn send<T>(_: crossbeam_channel::SendError<T>) -> Error {
        Error::channel_send()
    }

    pub fn tx_rejection(chain_id: ChainId, code: RejectionCode, log: impl Into<String>) -> Error {
        Error::tx_rejected(chain_id, ChainError::new(code, log))
    }

    /// The code of the chain's rejection, if this error is one.
    pub fn rejection_code(&self) -> Option<RejectionCode> {
        self.detail().rejection_code()
    }

    /// The RPC endpoint could not be reached. Retrying may help.
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    /// The chains disagree in a way that retrying cannot fix.
    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }

    /// The proof height is not covered by a consensus state on the verifying chain.
    pub fn is_stale_proof(&self) -> bool {
        self.detail().is_stale_proof()
    }

    /// The destination already holds a receipt for the packet, or the source
    /// already cleared its commitment.
    pub fn is_duplicate_relay(&self) -> bool {
        self.detail().is_duplicate_relay()
    }

    pub fn is_packet_timed_out(&self) -> bool {
        self.detail().rejection_code() == Some(RejectionCode::PacketTimedOut)
    }
}

impl ErrorDetail {
    pub fn rejection_code(&self) -> Option<RejectionCode> {
        match self {
            ErrorDetail::TxRejected(e) => Some(e.chain_error.code),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ErrorDetail::Connectivity(_)
                | ErrorDetail::ConnectivityExhausted(_)
                | ErrorDetail::StaleQueryHeight(_)
        )
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ErrorDetail::ChainIdMismatch(_))
            || matches!(
                self.rejection_code(),
                Some(
                    RejectionCode::InvalidProof
                        | RejectionCode::ProtocolViolation
                        | RejectionCode::OutOfGas
                )
            )
    }

    pub fn is_stale_proof(&self) -> bool {
        self.rejection_code() == Some(RejectionCode::StaleProof)
    }

    pub fn is_duplicate_relay(&self) -> bool {
        self.rejection_code() == Some(RejectionCode::Redundant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn chain_id() -> ChainId {
        ChainId::from_string("ibc-0")
    }

    #[test]
    fn classify_rejections() {
        let stale = Error::tx_rejection(chain_id(), RejectionCode::StaleProof, "pruned");
        assert!(stale.is_stale_proof());
        assert!(!stale.is_protocol());
        assert!(!stale.is_connectivity());

        let duplicate = Error::tx_rejection(chain_id(), RejectionCode::Redundant, "receipt");
        assert!(duplicate.is_duplicate_relay());
        assert!(!duplicate.is_protocol());

        let invalid = Error::tx_rejection(chain_id(), RejectionCode::InvalidProof, "bad root");
        assert!(invalid.is_protocol());
    }

    #[test]
    fn classify_connectivity() {
        let e = Error::connectivity(chain_id(), "http://localhost:26657".into(), "offline".into());
        assert!(e.is_connectivity());
        assert!(!e.is_protocol());
        assert_eq!(e.rejection_code(), None);

        let e = Error::chain_id_mismatch(chain_id(), ChainId::from_string("ibc-1"));
        assert!(e.is_protocol());
    }
}
