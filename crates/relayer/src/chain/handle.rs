use core::fmt::{self, Debug, Display};
use std::sync::{Arc, Mutex};

use crossbeam_channel as channel;
use tracing::Span;

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::ChannelEnd;
use ibc_relay_types::core::ics04_channel::packet::{PacketMsgType, Sequence};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ChannelId, ConnectionId, PortId};
use ibc_relay_types::proofs::Proofs;
use ibc_relay_types::signer::Signer;
use ibc_relay_types::Height;

use crate::chain::endpoint::ChainStatus;
use crate::chain::requests::*;
use crate::chain::tracking::TrackedMsgs;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::event::IbcEventWithHeight;

pub use base::{AccountLocks, Backoff, BaseChainHandle};

mod base;

/// A pair of [`ChainHandle`]s.
#[derive(Clone)]
pub struct ChainHandlePair<ChainA: ChainHandle, ChainB: ChainHandle> {
    pub a: ChainA,
    pub b: ChainB,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> ChainHandlePair<ChainA, ChainB> {
    /// Swap the two handles.
    pub fn swap(self) -> ChainHandlePair<ChainB, ChainA> {
        ChainHandlePair {
            a: self.b,
            b: self.a,
        }
    }
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Debug for ChainHandlePair<ChainA, ChainB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandlePair")
            .field("a", &self.a.id())
            .field("b", &self.b.id())
            .finish()
    }
}

pub type ReplyTo<T> = channel::Sender<Result<T, Error>>;
pub type Reply<T> = channel::Receiver<Result<T, Error>>;

pub fn reply_channel<T>() -> (ReplyTo<T>, Reply<T>) {
    channel::bounded(1)
}

/// Requests that a `ChainHandle` may send to a `ChainRuntime`.
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum ChainRequest {
    Shutdown {
        reply_to: ReplyTo<()>,
    },

    SendMessagesAndWaitCommit {
        tracked_msgs: TrackedMsgs,
        reply_to: ReplyTo<Vec<IbcEventWithHeight>>,
    },

    Signer {
        reply_to: ReplyTo<Signer>,
    },

    Config {
        reply_to: ReplyTo<ChainConfig>,
    },

    QueryApplicationStatus {
        reply_to: ReplyTo<ChainStatus>,
    },

    QueryBalance {
        address: Signer,
        reply_to: ReplyTo<Vec<Coin>>,
    },

    BuildHeader {
        trusted_height: Height,
        target_height: Height,
        reply_to: ReplyTo<Header>,
    },

    BuildClientState {
        height: Height,
        reply_to: ReplyTo<ClientState>,
    },

    BuildConsensusState {
        height: Height,
        reply_to: ReplyTo<ConsensusState>,
    },

    BuildConnectionProofs {
        connection_id: ConnectionId,
        height: Height,
        reply_to: ReplyTo<Proofs>,
    },

    BuildChannelProofs {
        port_id: PortId,
        channel_id: ChannelId,
        height: Height,
        reply_to: ReplyTo<Proofs>,
    },

    BuildPacketProofs {
        packet_type: PacketMsgType,
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
        height: Height,
        reply_to: ReplyTo<(Vec<u8>, Proofs)>,
    },

    QueryClientState {
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ClientState, Option<CommitmentProofBytes>)>,
    },

    QueryConsensusState {
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ConsensusState, Option<CommitmentProofBytes>)>,
    },

    QueryConsensusStateHeights {
        request: QueryConsensusStateHeightsRequest,
        reply_to: ReplyTo<Vec<Height>>,
    },

    QueryConnection {
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ConnectionEnd, Option<CommitmentProofBytes>)>,
    },

    QueryChannel {
        request: QueryChannelRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ChannelEnd, Option<CommitmentProofBytes>)>,
    },

    QueryPacketCommitment {
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    },

    QueryPacketCommitments {
        request: QueryPacketCommitmentsRequest,
        reply_to: ReplyTo<(Vec<Sequence>, Height)>,
    },

    QueryPacketReceipt {
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    },

    QueryUnreceivedPackets {
        request: QueryUnreceivedPacketsRequest,
        reply_to: ReplyTo<Vec<Sequence>>,
    },

    QueryPacketAcknowledgement {
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    },

    QueryNextSequenceReceive {
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Sequence, Option<CommitmentProofBytes>)>,
    },

    QueryPacketEventData {
        request: QueryPacketEventDataRequest,
        reply_to: ReplyTo<Vec<IbcEventWithHeight>>,
    },
}

/// A cloneable handle to a chain runtime.
///
/// Every query that is answered at the latest height first resolves that
/// height through [`ChainHandle::query_latest_height`], so proofs are only
/// ever built at heights the handle has observed.
pub trait ChainHandle: Clone + Display + Send + Sync + Debug + 'static {
    fn new(
        chain_id: ChainId,
        submission_lock: Arc<Mutex<()>>,
        backoff: Backoff,
        sender: channel::Sender<(Span, ChainRequest)>,
    ) -> Self;

    /// Get the [`ChainId`] of this chain.
    fn id(&self) -> ChainId;

    /// Shutdown the chain runtime.
    fn shutdown(&self) -> Result<(), Error>;

    /// Submits the given `msgs` to the chain and waits for their commit,
    /// holding the submission lock of the signing account.
    fn send_messages_and_wait_commit(
        &self,
        tracked_msgs: TrackedMsgs,
    ) -> Result<Vec<IbcEventWithHeight>, Error>;

    /// The signer of the relayer account on this chain.
    fn get_signer(&self) -> Result<Signer, Error>;

    fn config(&self) -> Result<ChainConfig, Error>;

    /// The latest height of the chain, never below a height this handle
    /// already observed.
    fn query_latest_height(&self) -> Result<Height, Error> {
        Ok(self.query_application_status()?.height)
    }

    fn query_application_status(&self) -> Result<ChainStatus, Error>;

    fn query_balance(&self, address: Option<Signer>) -> Result<Vec<Coin>, Error>;

    fn build_header(&self, trusted_height: Height, target_height: Height)
        -> Result<Header, Error>;

    fn build_client_state(&self, height: Height) -> Result<ClientState, Error>;

    fn build_consensus_state(&self, height: Height) -> Result<ConsensusState, Error>;

    fn build_connection_proofs(
        &self,
        connection_id: &ConnectionId,
        height: Height,
    ) -> Result<Proofs, Error>;

    fn build_channel_proofs(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        height: Height,
    ) -> Result<Proofs, Error>;

    fn build_packet_proofs(
        &self,
        packet_type: PacketMsgType,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
        height: Height,
    ) -> Result<(Vec<u8>, Proofs), Error>;

    fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ClientState, Option<CommitmentProofBytes>), Error>;

    fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConsensusState, Option<CommitmentProofBytes>), Error>;

    fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
    ) -> Result<Vec<Height>, Error>;

    fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConnectionEnd, Option<CommitmentProofBytes>), Error>;

    fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
    ) -> Result<(ChannelEnd, Option<CommitmentProofBytes>), Error>;

    fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
    ) -> Result<(Vec<Sequence>, Height), Error>;

    fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
    ) -> Result<Vec<Sequence>, Error>;

    fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error>;

    fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
    ) -> Result<(Sequence, Option<CommitmentProofBytes>), Error>;

    fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
    ) -> Result<Vec<IbcEventWithHeight>, Error>;
}
