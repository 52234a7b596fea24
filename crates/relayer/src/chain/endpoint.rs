use serde::{Deserialize, Serialize};

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::ChannelEnd;
use ibc_relay_types::core::ics04_channel::packet::{PacketMsgType, Sequence};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ChannelId, ConnectionId, PortId};
use ibc_relay_types::proofs::{ProofError, Proofs};
use ibc_relay_types::signer::Signer;
use ibc_relay_types::timestamp::Timestamp;
use ibc_relay_types::Height;

use crate::account::derive_signer;
use crate::chain::handle::AccountLocks;
use crate::chain::requests::*;
use crate::chain::tracking::TrackedMsgs;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::event::IbcEventWithHeight;

/// The latest committed block of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub height: Height,
    pub timestamp: Timestamp,
}

/// Resolves the RPC address of a chain configuration into a live endpoint.
pub trait Connector {
    type Endpoint: ChainEndpoint + Send + 'static;

    fn connect(&self, config: &ChainConfig) -> Result<Self::Endpoint, Error>;

    /// The submission locks shared by every runtime spawned through this connector.
    fn account_locks(&self) -> &AccountLocks;
}

/// Defines a blockchain as understood by the relayer
pub trait ChainEndpoint: Sized {
    /// Returns the chain's identifier
    fn id(&self) -> &ChainId;

    /// Returns the chain configuration
    fn config(&self) -> &ChainConfig;

    /// Shutdown the chain runtime
    fn shutdown(self) -> Result<(), Error>;

    /// Checks that the node is reachable and serves the configured chain.
    fn health_check(&self) -> Result<(), Error>;

    /// The address the relayer signs transactions with on this chain.
    fn get_signer(&self) -> Result<Signer, Error> {
        let config = self.config();
        derive_signer(&config.account, &config.address_prefix)
    }

    /// Sends one or more transactions with `msgs` to chain and waits for
    /// them to be committed. Returns one event per message: the event
    /// emitted by the message, or a [`ChainError`] event when the chain
    /// rejected it.
    ///
    /// [`ChainError`]: ibc_relay_types::events::ChainError
    fn send_messages_and_wait_commit(
        &mut self,
        tracked_msgs: TrackedMsgs,
    ) -> Result<Vec<IbcEventWithHeight>, Error>;

    /// Query the latest height and timestamp the application is at
    fn query_application_status(&self) -> Result<ChainStatus, Error>;

    /// Query the balances of the given address.
    fn query_balance(&self, address: &Signer) -> Result<Vec<Coin>, Error>;

    /// Builds the client state a counterparty uses to track this chain from `height`.
    fn build_client_state(&self, height: Height) -> Result<ClientState, Error>;

    fn build_consensus_state(&self, height: Height) -> Result<ConsensusState, Error>;

    /// Builds a header of this chain at `target_height`, verifiable against
    /// the consensus state a client of this chain stores at `trusted_height`.
    fn build_header(&self, trusted_height: Height, target_height: Height)
        -> Result<Header, Error>;

    /// Performs a query to retrieve the state of the specified light client. A
    /// proof can optionally be returned along with the result.
    fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ClientState, Option<CommitmentProofBytes>), Error>;

    /// Performs a query to retrieve the consensus state for a specified height
    /// `consensus_height` that the specified light client stores.
    fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConsensusState, Option<CommitmentProofBytes>), Error>;

    /// Heights of all the consensus states stored by a client, in ascending order.
    fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
    ) -> Result<Vec<Height>, Error>;

    /// Performs a query to retrieve the connection associated with a given
    /// connection identifier. A proof can optionally be returned along with the
    /// result.
    fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConnectionEnd, Option<CommitmentProofBytes>), Error>;

    /// Performs a query to retrieve the channel associated with a given channel
    /// identifier. A proof can optionally be returned along with the result.
    fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
    ) -> Result<(ChannelEnd, Option<CommitmentProofBytes>), Error>;

    /// Performs a query to retrieve a stored packet commitment hash, stored on
    /// the chain at path `path::CommitmentsPath`. A proof can optionally be
    /// returned along with the result.
    fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    /// Performs a query to retrieve all the packet commitments hashes
    /// associated with a channel. Returns the corresponding packet sequence
    /// numbers and the height at which they were retrieved.
    fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
    ) -> Result<(Vec<Sequence>, Height), Error>;

    /// Performs a query to retrieve a given packet receipt, stored on the chain at path
    /// `path::ReceiptsPath`. A proof can optionally be returned along with the result.
    /// An absent receipt yields empty bytes, and the proof then attests to its absence.
    fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    /// Performs a query about which IBC packets in the specified list has not
    /// been received. Returns the sequence numbers of the packets that were not
    /// received.
    fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
    ) -> Result<Vec<Sequence>, Error>;

    /// Performs a query to retrieve a stored packet acknowledgement hash,
    /// stored on the chain at path `path::AcksPath`. A proof can optionally be
    /// returned along with the result.
    fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    /// Performs a query to retrieve `nextSequenceRecv` stored at path
    /// `path::SeqRecvsPath` as defined in ICS-4. A proof can optionally be
    /// returned along with the result.
    fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
    ) -> Result<(Sequence, Option<CommitmentProofBytes>), Error>;

    /// Retrieves the packet events of the requested type emitted by this chain.
    fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
    ) -> Result<Vec<IbcEventWithHeight>, Error>;

    /// Builds the proof of the connection end `connection_id` at `height`.
    fn build_connection_proofs(
        &self,
        connection_id: &ConnectionId,
        height: Height,
    ) -> Result<Proofs, Error> {
        let (_, maybe_proof) = self.query_connection(
            QueryConnectionRequest {
                connection_id: connection_id.clone(),
                height: QueryHeight::Specific(height),
            },
            IncludeProof::Yes,
        )?;

        into_proofs(maybe_proof, height)
    }

    /// Builds the proof of the channel end `port_id`/`channel_id` at `height`.
    fn build_channel_proofs(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        height: Height,
    ) -> Result<Proofs, Error> {
        let (_, maybe_proof) = self.query_channel(
            QueryChannelRequest {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                height: QueryHeight::Specific(height),
            },
            IncludeProof::Yes,
        )?;

        into_proofs(maybe_proof, height)
    }

    /// Builds the required proofs and the client state for packet messages.
    ///
    /// Returns the proven bytes together with the proofs: the commitment
    /// for `Recv`, the acknowledgement commitment for `Ack`, the receipt
    /// (empty when absent) for `TimeoutUnordered` and the JSON encoded
    /// next receive sequence for `TimeoutOrdered`.
    fn build_packet_proofs(
        &self,
        packet_type: PacketMsgType,
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
        height: Height,
    ) -> Result<(Vec<u8>, Proofs), Error> {
        let query_height = QueryHeight::Specific(height);

        let (bytes, maybe_proof) = match packet_type {
            PacketMsgType::Recv => self.query_packet_commitment(
                QueryPacketCommitmentRequest {
                    port_id,
                    channel_id,
                    sequence,
                    height: query_height,
                },
                IncludeProof::Yes,
            )?,
            PacketMsgType::Ack => self.query_packet_acknowledgement(
                QueryPacketAcknowledgementRequest {
                    port_id,
                    channel_id,
                    sequence,
                    height: query_height,
                },
                IncludeProof::Yes,
            )?,
            PacketMsgType::TimeoutUnordered => self.query_packet_receipt(
                QueryPacketReceiptRequest {
                    port_id,
                    channel_id,
                    sequence,
                    height: query_height,
                },
                IncludeProof::Yes,
            )?,
            PacketMsgType::TimeoutOrdered => {
                let (next_sequence_recv, maybe_proof) = self.query_next_sequence_receive(
                    QueryNextSequenceReceiveRequest {
                        port_id,
                        channel_id,
                        height: query_height,
                    },
                    IncludeProof::Yes,
                )?;

                let bytes = serde_json::to_vec(&next_sequence_recv).map_err(Error::decode)?;
                (bytes, maybe_proof)
            }
        };

        let proofs = into_proofs(maybe_proof, height)?;

        Ok((bytes, proofs))
    }
}

fn into_proofs(maybe_proof: Option<CommitmentProofBytes>, height: Height) -> Result<Proofs, Error> {
    let proof = maybe_proof.ok_or_else(|| Error::malformed_proof(ProofError::empty_proof()))?;

    Proofs::new(proof, height).map_err(Error::malformed_proof)
}
