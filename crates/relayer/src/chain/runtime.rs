use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel as channel;
use tracing::{error, Span};

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::ChannelEnd;
use ibc_relay_types::core::ics04_channel::packet::{PacketMsgType, Sequence};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use ibc_relay_types::proofs::Proofs;
use ibc_relay_types::signer::Signer;
use ibc_relay_types::Height;

use crate::chain::endpoint::{ChainEndpoint, ChainStatus};
use crate::chain::handle::{Backoff, ChainHandle, ChainRequest, ReplyTo};
use crate::chain::requests::*;
use crate::chain::tracking::TrackedMsgs;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::event::IbcEventWithHeight;

pub struct ChainRuntime<Endpoint: ChainEndpoint> {
    /// The specific chain this runtime runs against
    chain: Endpoint,

    /// The sender side of a channel to this runtime. Any `ChainHandle` can use this to send
    /// chain requests to this runtime
    request_sender: channel::Sender<(Span, ChainRequest)>,

    /// The receiving side of a channel to this runtime. The runtime consumes chain requests coming
    /// in through this channel.
    request_receiver: channel::Receiver<(Span, ChainRequest)>,
}

impl<Endpoint> ChainRuntime<Endpoint>
where
    Endpoint: ChainEndpoint + Send + 'static,
{
    /// Spawns a new runtime for an already connected endpoint.
    pub fn spawn<Handle: ChainHandle>(
        chain: Endpoint,
        backoff: Backoff,
        submission_lock: Arc<Mutex<()>>,
    ) -> Handle {
        let (handle, _) = Self::init(chain, backoff, submission_lock);
        handle
    }

    /// Initializes a runtime for a given chain, and spawns the associated thread
    fn init<Handle: ChainHandle>(
        chain: Endpoint,
        backoff: Backoff,
        submission_lock: Arc<Mutex<()>>,
    ) -> (Handle, thread::JoinHandle<()>) {
        let chain_runtime = Self::new(chain);

        // Get a handle to the runtime
        let handle: Handle = chain_runtime.handle(backoff, submission_lock);

        // Spawn the runtime & return
        let id = handle.id();
        let thread = thread::spawn(move || {
            if let Err(e) = chain_runtime.run() {
                error!("failed to start runtime for chain '{}': {}", id, e);
            }
        });

        (handle, thread)
    }

    /// Basic constructor
    fn new(chain: Endpoint) -> Self {
        let (request_sender, request_receiver) = channel::unbounded();

        Self {
            chain,
            request_sender,
            request_receiver,
        }
    }

    pub fn handle<Handle: ChainHandle>(
        &self,
        backoff: Backoff,
        submission_lock: Arc<Mutex<()>>,
    ) -> Handle {
        let chain_id = ChainEndpoint::id(&self.chain).clone();
        let sender = self.request_sender.clone();

        Handle::new(chain_id, submission_lock, backoff, sender)
    }

    fn run(mut self) -> Result<(), Error> {
        loop {
            let (span, event) = match self.request_receiver.recv() {
                Ok((span, event)) => (span, event),
                Err(e) => {
                    error!("received error via chain request channel: {}", e);
                    break;
                }
            };

            let _span = span.entered();

            match event {
                ChainRequest::Shutdown { reply_to } => {
                    let res = self.chain.shutdown();

                    reply_to.send(res).map_err(Error::send)?;

                    break;
                }

                ChainRequest::SendMessagesAndWaitCommit {
                    tracked_msgs,
                    reply_to,
                } => self.send_messages_and_wait_commit(tracked_msgs, reply_to)?,

                ChainRequest::Signer { reply_to } => self.get_signer(reply_to)?,

                ChainRequest::Config { reply_to } => self.get_config(reply_to)?,

                ChainRequest::QueryApplicationStatus { reply_to } => {
                    self.query_application_status(reply_to)?
                }

                ChainRequest::QueryBalance { address, reply_to } => {
                    self.query_balance(address, reply_to)?
                }

                ChainRequest::BuildHeader {
                    trusted_height,
                    target_height,
                    reply_to,
                } => self.build_header(trusted_height, target_height, reply_to)?,

                ChainRequest::BuildClientState { height, reply_to } => {
                    self.build_client_state(height, reply_to)?
                }

                ChainRequest::BuildConsensusState { height, reply_to } => {
                    self.build_consensus_state(height, reply_to)?
                }

                ChainRequest::BuildConnectionProofs {
                    connection_id,
                    height,
                    reply_to,
                } => self.build_connection_proofs(connection_id, height, reply_to)?,

                ChainRequest::BuildChannelProofs {
                    port_id,
                    channel_id,
                    height,
                    reply_to,
                } => self.build_channel_proofs(port_id, channel_id, height, reply_to)?,

                ChainRequest::BuildPacketProofs {
                    packet_type,
                    port_id,
                    channel_id,
                    sequence,
                    height,
                    reply_to,
                } => self.build_packet_proofs(
                    packet_type,
                    port_id,
                    channel_id,
                    sequence,
                    height,
                    reply_to,
                )?,

                ChainRequest::QueryClientState {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_client_state(request, include_proof, reply_to)?,

                ChainRequest::QueryConsensusState {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_consensus_state(request, include_proof, reply_to)?,

                ChainRequest::QueryConsensusStateHeights { request, reply_to } => {
                    self.query_consensus_state_heights(request, reply_to)?
                }

                ChainRequest::QueryConnection {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_connection(request, include_proof, reply_to)?,

                ChainRequest::QueryChannel {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_channel(request, include_proof, reply_to)?,

                ChainRequest::QueryPacketCommitment {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_packet_commitment(request, include_proof, reply_to)?,

                ChainRequest::QueryPacketCommitments { request, reply_to } => {
                    self.query_packet_commitments(request, reply_to)?
                }

                ChainRequest::QueryPacketReceipt {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_packet_receipt(request, include_proof, reply_to)?,

                ChainRequest::QueryUnreceivedPackets { request, reply_to } => {
                    self.query_unreceived_packets(request, reply_to)?
                }

                ChainRequest::QueryPacketAcknowledgement {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_packet_acknowledgement(request, include_proof, reply_to)?,

                ChainRequest::QueryNextSequenceReceive {
                    request,
                    include_proof,
                    reply_to,
                } => self.query_next_sequence_receive(request, include_proof, reply_to)?,

                ChainRequest::QueryPacketEventData { request, reply_to } => {
                    self.query_packet_events(request, reply_to)?
                }
            }
        }

        Ok(())
    }

    fn send_messages_and_wait_commit(
        &mut self,
        tracked_msgs: TrackedMsgs,
        reply_to: ReplyTo<Vec<IbcEventWithHeight>>,
    ) -> Result<(), Error> {
        let result = self.chain.send_messages_and_wait_commit(tracked_msgs);
        reply_to.send(result).map_err(Error::send)
    }

    fn get_signer(&mut self, reply_to: ReplyTo<Signer>) -> Result<(), Error> {
        let result = self.chain.get_signer();
        reply_to.send(result).map_err(Error::send)
    }

    fn get_config(&self, reply_to: ReplyTo<ChainConfig>) -> Result<(), Error> {
        let result = Ok(self.chain.config().clone());
        reply_to.send(result).map_err(Error::send)
    }

    fn query_application_status(&self, reply_to: ReplyTo<ChainStatus>) -> Result<(), Error> {
        let result = self.chain.query_application_status();
        reply_to.send(result).map_err(Error::send)
    }

    fn query_balance(&self, address: Signer, reply_to: ReplyTo<Vec<Coin>>) -> Result<(), Error> {
        let result = self.chain.query_balance(&address);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_header(
        &self,
        trusted_height: Height,
        target_height: Height,
        reply_to: ReplyTo<Header>,
    ) -> Result<(), Error> {
        let result = self.chain.build_header(trusted_height, target_height);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_client_state(&self, height: Height, reply_to: ReplyTo<ClientState>) -> Result<(), Error> {
        let result = self.chain.build_client_state(height);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_consensus_state(
        &self,
        height: Height,
        reply_to: ReplyTo<ConsensusState>,
    ) -> Result<(), Error> {
        let result = self.chain.build_consensus_state(height);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_connection_proofs(
        &self,
        connection_id: ConnectionId,
        height: Height,
        reply_to: ReplyTo<Proofs>,
    ) -> Result<(), Error> {
        let result = self.chain.build_connection_proofs(&connection_id, height);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_channel_proofs(
        &self,
        port_id: PortId,
        channel_id: ChannelId,
        height: Height,
        reply_to: ReplyTo<Proofs>,
    ) -> Result<(), Error> {
        let result = self.chain.build_channel_proofs(&port_id, &channel_id, height);
        reply_to.send(result).map_err(Error::send)
    }

    fn build_packet_proofs(
        &self,
        packet_type: PacketMsgType,
        port_id: PortId,
        channel_id: ChannelId,
        sequence: Sequence,
        height: Height,
        reply_to: ReplyTo<(Vec<u8>, Proofs)>,
    ) -> Result<(), Error> {
        let result = self
            .chain
            .build_packet_proofs(packet_type, port_id, channel_id, sequence, height);

        reply_to.send(result).map_err(Error::send)
    }

    fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ClientState, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let res = self.chain.query_client_state(request, include_proof);
        reply_to.send(res).map_err(Error::send)
    }

    fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ConsensusState, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let res = self.chain.query_consensus_state(request, include_proof);
        reply_to.send(res).map_err(Error::send)
    }

    fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
        reply_to: ReplyTo<Vec<Height>>,
    ) -> Result<(), Error> {
        let heights = self.chain.query_consensus_state_heights(request);
        reply_to.send(heights).map_err(Error::send)
    }

    fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ConnectionEnd, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let connection_end = self.chain.query_connection(request, include_proof);
        reply_to.send(connection_end).map_err(Error::send)
    }

    fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(ChannelEnd, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let result = self.chain.query_channel(request, include_proof);
        reply_to.send(result).map_err(Error::send)
    }

    fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let result = self.chain.query_packet_commitment(request, include_proof);
        reply_to.send(result).map_err(Error::send)
    }

    fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
        reply_to: ReplyTo<(Vec<Sequence>, Height)>,
    ) -> Result<(), Error> {
        let result = self.chain.query_packet_commitments(request);
        reply_to.send(result).map_err(Error::send)
    }

    fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let result = self.chain.query_packet_receipt(request, include_proof);
        reply_to.send(result).map_err(Error::send)
    }

    fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
        reply_to: ReplyTo<Vec<Sequence>>,
    ) -> Result<(), Error> {
        let result = self.chain.query_unreceived_packets(request);
        reply_to.send(result).map_err(Error::send)
    }

    fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Vec<u8>, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let result = self
            .chain
            .query_packet_acknowledgement(request, include_proof);

        reply_to.send(result).map_err(Error::send)
    }

    fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
        reply_to: ReplyTo<(Sequence, Option<CommitmentProofBytes>)>,
    ) -> Result<(), Error> {
        let result = self
            .chain
            .query_next_sequence_receive(request, include_proof);

        reply_to.send(result).map_err(Error::send)
    }

    fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
        reply_to: ReplyTo<Vec<IbcEventWithHeight>>,
    ) -> Result<(), Error> {
        let result = self.chain.query_packet_events(request);
        reply_to.send(result).map_err(Error::send)
    }
}
