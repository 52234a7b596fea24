use std::sync::{Arc, Mutex};

use tracing::{debug, error_span, info, warn};

use ibc_relay_types::core::ics04_channel::acknowledgement::Acknowledgement;
use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::msgs::{MsgAcknowledgement, MsgRecvPacket, MsgTimeout};
use ibc_relay_types::core::ics04_channel::packet::{Packet, PacketMsgType, Sequence};
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, PortId};
use ibc_relay_types::core::ics26_routing::msgs::{MsgEnvelope, PacketMsg};
use ibc_relay_types::events::{ChainError, IbcEvent, IbcEventType, RejectionCode};
use ibc_relay_types::Height;

use crate::chain::endpoint::ChainStatus;
use crate::chain::handle::ChainHandle;
use crate::chain::requests::{
    IncludeProof, QueryHeight, QueryNextSequenceReceiveRequest, QueryPacketCommitmentsRequest,
    QueryPacketEventDataRequest, QueryUnreceivedPacketsRequest,
};
use crate::chain::tracking::TrackedMsgs;
use crate::channel::Channel;
use crate::error::Error as RelayerError;
use crate::foreign_client::ForeignClient;
use crate::link::error::LinkError;
use crate::link::packet_ledger::PacketLedger;
use crate::link::relay_summary::RelaySummary;
use crate::observer::RelayObserver;
use crate::session::CancellationToken;
use crate::util::mutex::MutexUtil;
use crate::util::pretty::PrettySlice;

/// The result of submitting one packet message.
enum Submission {
    Committed(IbcEvent),
    Rejected(ChainError),
}

/// Relays the packets sent on the source end of a channel to its destination
/// end, and their acknowledgements and timeouts back to the source.
pub struct RelayPath<ChainA: ChainHandle, ChainB: ChainHandle> {
    channel: Channel<ChainA, ChainB>,
    src_channel_id: ChannelId,
    dst_channel_id: ChannelId,
    ledger: Arc<Mutex<PacketLedger>>,
    cancel: CancellationToken,
    observer: Arc<dyn RelayObserver>,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> RelayPath<ChainA, ChainB> {
    pub fn new(
        channel: Channel<ChainA, ChainB>,
        ledger: Arc<Mutex<PacketLedger>>,
        cancel: CancellationToken,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Self, LinkError> {
        let src_chain_id = channel.src_chain().id();
        let dst_chain_id = channel.dst_chain().id();

        let src_channel_id = channel
            .src_channel_id()
            .cloned()
            .ok_or_else(|| LinkError::counterparty_channel_not_found(ChannelId::default()))?;

        let dst_channel_id = channel
            .dst_channel_id()
            .cloned()
            .ok_or_else(|| LinkError::counterparty_channel_not_found(src_channel_id.clone()))?;

        debug!(
            src_chain = %src_chain_id,
            dst_chain = %dst_chain_id,
            %src_channel_id,
            %dst_channel_id,
            "relay path ready"
        );

        Ok(Self {
            channel,
            src_channel_id,
            dst_channel_id,
            ledger,
            cancel,
            observer,
        })
    }

    pub fn src_chain(&self) -> &ChainA {
        self.channel.src_chain()
    }

    pub fn dst_chain(&self) -> &ChainB {
        self.channel.dst_chain()
    }

    pub fn src_port_id(&self) -> &PortId {
        self.channel.src_port_id()
    }

    pub fn dst_port_id(&self) -> &PortId {
        self.channel.dst_port_id()
    }

    pub fn src_channel_id(&self) -> &ChannelId {
        &self.src_channel_id
    }

    pub fn dst_channel_id(&self) -> &ChannelId {
        &self.dst_channel_id
    }

    pub fn ordering(&self) -> Order {
        self.channel.ordering
    }

    pub fn channel(&self) -> &Channel<ChainA, ChainB> {
        &self.channel
    }

    /// A snapshot of the packet lifecycle for this direction.
    pub fn ledger(&self) -> PacketLedger {
        self.ledger.acquire_mutex().clone()
    }

    fn is_ordered(&self) -> bool {
        self.ordering() == Order::Ordered
    }

    /// The client hosted on the destination, tracking the source.
    fn dst_client(&self) -> ForeignClient<ChainB, ChainA> {
        ForeignClient::restore(
            self.channel.dst_client_id().clone(),
            self.dst_chain().clone(),
            self.src_chain().clone(),
        )
    }

    /// The client hosted on the source, tracking the destination.
    fn src_client(&self) -> ForeignClient<ChainA, ChainB> {
        ForeignClient::restore(
            self.channel.src_client_id().clone(),
            self.src_chain().clone(),
            self.dst_chain().clone(),
        )
    }

    /// Clears timed out packets, then relays pending packets and
    /// acknowledgements.
    pub fn relay_once(&self) -> Result<RelaySummary, LinkError> {
        let _span = error_span!(
            "relay",
            src_chain = %self.src_chain().id(),
            src_channel = %self.src_channel_id,
            dst_chain = %self.dst_chain().id(),
        )
        .entered();

        let mut summary = self.relay_timeouts()?;
        summary.extend(self.relay_pending_packets()?);

        self.observer.on_relay_summary(&summary);

        Ok(summary)
    }

    /// Sequences with a commitment on the source, in ascending order.
    fn src_commitments(&self) -> Result<Vec<Sequence>, LinkError> {
        let (mut sequences, _) = self
            .src_chain()
            .query_packet_commitments(QueryPacketCommitmentsRequest {
                port_id: self.src_port_id().clone(),
                channel_id: self.src_channel_id.clone(),
                height: QueryHeight::Latest,
            })
            .map_err(|e| LinkError::query(self.src_chain().id(), e))?;

        sequences.sort();

        Ok(sequences)
    }

    /// Of the given committed sequences, the ones the destination has not received.
    fn unreceived_on_dst(&self, sequences: &[Sequence]) -> Result<Vec<Sequence>, LinkError> {
        let mut unreceived = self
            .dst_chain()
            .query_unreceived_packets(QueryUnreceivedPacketsRequest {
                port_id: self.dst_port_id().clone(),
                channel_id: self.dst_channel_id.clone(),
                packet_commitment_sequences: sequences.to_vec(),
            })
            .map_err(|e| LinkError::query(self.dst_chain().id(), e))?;

        unreceived.sort();

        Ok(unreceived)
    }

    fn packet_events_request(
        &self,
        event_id: IbcEventType,
        sequences: &[Sequence],
    ) -> QueryPacketEventDataRequest {
        QueryPacketEventDataRequest {
            event_id,
            source_channel_id: self.src_channel_id.clone(),
            source_port_id: self.src_port_id().clone(),
            destination_channel_id: self.dst_channel_id.clone(),
            destination_port_id: self.dst_port_id().clone(),
            sequences: sequences.to_vec(),
            height: QueryHeight::Latest,
        }
    }

    /// The packets sent on the source with the given sequences, in ascending order.
    fn query_send_packets(&self, sequences: &[Sequence]) -> Result<Vec<Packet>, LinkError> {
        let events = self
            .src_chain()
            .query_packet_events(self.packet_events_request(IbcEventType::SendPacket, sequences))
            .map_err(|e| LinkError::query(self.src_chain().id(), e))?;

        let mut packets = events
            .into_iter()
            .filter_map(|ev| match ev.event {
                IbcEvent::SendPacket(send) => Some(send.packet),
                _ => None,
            })
            .collect::<Vec<_>>();

        packets.sort_by_key(|packet| packet.sequence);
        packets.dedup_by_key(|packet| packet.sequence);

        Ok(packets)
    }

    /// The acknowledgements written on the destination for the given sequences.
    fn query_write_acks(
        &self,
        sequences: &[Sequence],
    ) -> Result<Vec<(Packet, Vec<u8>)>, LinkError> {
        let events = self
            .dst_chain()
            .query_packet_events(self.packet_events_request(IbcEventType::WriteAck, sequences))
            .map_err(|e| LinkError::query(self.dst_chain().id(), e))?;

        let mut acks = events
            .into_iter()
            .filter_map(|ev| match ev.event {
                IbcEvent::WriteAcknowledgement(write_ack) => {
                    Some((write_ack.packet, write_ack.ack))
                }
                _ => None,
            })
            .collect::<Vec<_>>();

        acks.sort_by_key(|(packet, _)| packet.sequence);
        acks.dedup_by_key(|(packet, _)| packet.sequence);

        Ok(acks)
    }

    fn dst_status(&self) -> Result<ChainStatus, LinkError> {
        self.dst_chain()
            .query_application_status()
            .map_err(|e| LinkError::query(self.dst_chain().id(), e))
    }

    /// Records the outcome of relaying one packet. Connectivity failures
    /// abort the pass, any other failure only concerns this sequence.
    fn settle(
        &self,
        sequence: Sequence,
        result: Result<(), LinkError>,
        summary: &mut RelaySummary,
    ) -> Result<bool, LinkError> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                warn!(%sequence, "failed to relay packet: {e}");
                summary.failed.push((sequence, e));
                Ok(false)
            }
        }
    }

    /// Delivers the packets committed on the source and not yet received on
    /// the destination, then relays their acknowledgements back. Packets that
    /// the destination received but whose acknowledgement is still missing on
    /// the source are acknowledged without being delivered again.
    ///
    /// On ordered channels, a packet that cannot be delivered blocks every
    /// later sequence.
    pub fn relay_pending_packets(&self) -> Result<RelaySummary, LinkError> {
        let mut summary = RelaySummary::empty();

        if self.cancel.is_cancelled() {
            return Ok(summary);
        }

        let committed = self.src_commitments()?;
        if committed.is_empty() {
            return Ok(summary);
        }

        self.ledger.acquire_mutex().observe_committed(&committed);

        let unreceived = self.unreceived_on_dst(&committed)?;

        let received = committed
            .iter()
            .filter(|sequence| !unreceived.contains(sequence))
            .copied()
            .collect::<Vec<_>>();

        if !received.is_empty() {
            if self.cancel.is_cancelled() {
                return Ok(summary);
            }

            self.relay_undelivered_acks(&received, &mut summary)?;
        }

        if unreceived.is_empty() || self.cancel.is_cancelled() {
            return Ok(summary);
        }

        info!(
            "{} unreceived packets found: {}",
            unreceived.len(),
            PrettySlice(&unreceived)
        );

        let packets = self.query_send_packets(&unreceived)?;
        let status = self.dst_status()?;

        for packet in packets {
            if self.cancel.is_cancelled() {
                break;
            }

            if packet.timed_out(&status.timestamp, status.height) {
                debug!(sequence = %packet.sequence, "packet timed out on destination, leaving it to the timeout pass");

                if self.is_ordered() {
                    break;
                }

                continue;
            }

            let sequence = packet.sequence;
            let result = self.relay_recv_packet(&packet, &mut summary);

            let delivered = match result {
                Ok(delivered) => delivered,
                Err(e) => self.settle(sequence, Err(e), &mut summary)?,
            };

            if !delivered && self.is_ordered() {
                break;
            }
        }

        Ok(summary)
    }

    /// Acknowledges on the source the packets that the destination already
    /// received.
    fn relay_undelivered_acks(
        &self,
        received: &[Sequence],
        summary: &mut RelaySummary,
    ) -> Result<(), LinkError> {
        let acks = self.query_write_acks(received)?;

        if acks.len() < received.len() {
            warn!(
                "no acknowledgement found on {} for some of the received packets {}",
                self.dst_chain().id(),
                PrettySlice(received)
            );
        }

        for (packet, ack) in acks {
            if self.cancel.is_cancelled() {
                break;
            }

            let sequence = packet.sequence;

            let result = self
                .ledger
                .acquire_mutex()
                .mark_delivered(sequence)
                .and_then(|()| self.relay_ack_packet(&packet, ack, summary));

            if !self.settle(sequence, result, summary)? && self.is_ordered() {
                break;
            }
        }

        Ok(())
    }

    /// Returns whether the packet is now received by the destination,
    /// either by this relayer or by another one.
    fn relay_recv_packet(
        &self,
        packet: &Packet,
        summary: &mut RelaySummary,
    ) -> Result<bool, LinkError> {
        let signer = self
            .dst_chain()
            .get_signer()
            .map_err(|e| LinkError::query(self.dst_chain().id(), e))?;

        let submission =
            self.submit_with_proof(&self.dst_client(), packet.sequence, "packet-recv", |height| {
                let (_, proofs) = self
                    .src_chain()
                    .build_packet_proofs(
                        PacketMsgType::Recv,
                        self.src_port_id(),
                        &self.src_channel_id,
                        packet.sequence,
                        height,
                    )
                    .map_err(|e| LinkError::query(self.src_chain().id(), e))?;

                let msg = MsgRecvPacket::new(packet.clone(), proofs, signer.clone());
                Ok(MsgEnvelope::Packet(PacketMsg::Recv(msg)))
            })?;

        match submission {
            Submission::Committed(IbcEvent::WriteAcknowledgement(write_ack)) => {
                self.ledger
                    .acquire_mutex()
                    .mark_delivered(packet.sequence)?;

                summary.delivered.push(packet.sequence);
                self.observer.on_packet_delivered(packet);

                let ack = write_ack.ack.clone();
                summary
                    .events
                    .push(IbcEvent::WriteAcknowledgement(write_ack));

                self.relay_ack_packet(packet, ack, summary)?;

                Ok(true)
            }

            Submission::Committed(event) => Err(LinkError::unexpected_event(event)),

            Submission::Rejected(e) if e.code == RejectionCode::Redundant => {
                debug!(sequence = %packet.sequence, "packet already received: {}", e.log);

                self.ledger
                    .acquire_mutex()
                    .mark_delivered(packet.sequence)?;

                summary.duplicates.push(packet.sequence);
                self.observer.on_duplicate_relay(packet);

                // Another relayer delivered it, the acknowledgement may still be missing
                if let Some((packet, ack)) = self.query_write_acks(&[packet.sequence])?.pop() {
                    self.relay_ack_packet(&packet, ack, summary)?;
                }

                Ok(true)
            }

            Submission::Rejected(e) if e.code == RejectionCode::PacketTimedOut => {
                debug!(sequence = %packet.sequence, "packet timed out on arrival: {}", e.log);
                Ok(false)
            }

            Submission::Rejected(e) => Err(LinkError::submit(
                self.dst_chain().id(),
                RelayerError::tx_rejected(self.dst_chain().id(), e),
            )),
        }
    }

    fn relay_ack_packet(
        &self,
        packet: &Packet,
        ack: Vec<u8>,
        summary: &mut RelaySummary,
    ) -> Result<(), LinkError> {
        let decoded = Acknowledgement::from_bytes(&ack)
            .map_err(|e| LinkError::invalid_acknowledgement(packet.sequence, e))?;

        let signer = self
            .src_chain()
            .get_signer()
            .map_err(|e| LinkError::query(self.src_chain().id(), e))?;

        let submission =
            self.submit_with_proof(&self.src_client(), packet.sequence, "packet-ack", |height| {
                let (_, proofs) = self
                    .dst_chain()
                    .build_packet_proofs(
                        PacketMsgType::Ack,
                        self.dst_port_id(),
                        &self.dst_channel_id,
                        packet.sequence,
                        height,
                    )
                    .map_err(|e| LinkError::query(self.dst_chain().id(), e))?;

                let msg = MsgAcknowledgement::new(packet.clone(), ack.clone(), proofs, signer.clone());
                Ok(MsgEnvelope::Packet(PacketMsg::Ack(msg)))
            })?;

        match submission {
            Submission::Committed(event) => {
                self.ledger
                    .acquire_mutex()
                    .mark_acknowledged(packet.sequence)?;

                summary.acknowledged.push(packet.sequence);
                summary.events.push(event);
                self.observer.on_packet_acknowledged(packet, &decoded);

                Ok(())
            }

            Submission::Rejected(e) if e.code == RejectionCode::Redundant => {
                debug!(sequence = %packet.sequence, "acknowledgement already relayed: {}", e.log);

                self.ledger
                    .acquire_mutex()
                    .mark_acknowledged(packet.sequence)?;

                self.observer.on_duplicate_relay(packet);

                Ok(())
            }

            Submission::Rejected(e) => Err(LinkError::submit(
                self.src_chain().id(),
                RelayerError::tx_rejected(self.src_chain().id(), e),
            )),
        }
    }

    /// Times out on the source the packets that expired on the destination
    /// before being received.
    ///
    /// On ordered channels only the earliest pending packet is considered,
    /// and timing it out closes the channel.
    pub fn relay_timeouts(&self) -> Result<RelaySummary, LinkError> {
        let mut summary = RelaySummary::empty();

        if self.cancel.is_cancelled() {
            return Ok(summary);
        }

        let committed = self.src_commitments()?;
        if committed.is_empty() {
            return Ok(summary);
        }

        self.ledger.acquire_mutex().observe_committed(&committed);

        let unreceived = self.unreceived_on_dst(&committed)?;

        let candidates = if self.is_ordered() {
            // the head of the line, if it was not received yet
            committed
                .first()
                .filter(|head| unreceived.contains(head))
                .map(|head| vec![*head])
                .unwrap_or_default()
        } else {
            unreceived
        };

        if candidates.is_empty() || self.cancel.is_cancelled() {
            return Ok(summary);
        }

        let packets = self.query_send_packets(&candidates)?;
        let status = self.dst_status()?;

        for packet in packets {
            if self.cancel.is_cancelled() {
                break;
            }

            if !packet.timed_out(&status.timestamp, status.height) {
                continue;
            }

            let sequence = packet.sequence;
            let result = self.relay_timeout_packet(&packet, &mut summary);
            self.settle(sequence, result, &mut summary)?;
        }

        Ok(summary)
    }

    fn relay_timeout_packet(
        &self,
        packet: &Packet,
        summary: &mut RelaySummary,
    ) -> Result<(), LinkError> {
        let signer = self
            .src_chain()
            .get_signer()
            .map_err(|e| LinkError::query(self.src_chain().id(), e))?;

        let packet_type = if self.is_ordered() {
            PacketMsgType::TimeoutOrdered
        } else {
            PacketMsgType::TimeoutUnordered
        };

        let submission = self.submit_with_proof(
            &self.src_client(),
            packet.sequence,
            "packet-timeout",
            |height| {
                let (_, proofs) = self
                    .dst_chain()
                    .build_packet_proofs(
                        packet_type,
                        self.dst_port_id(),
                        &self.dst_channel_id,
                        packet.sequence,
                        height,
                    )
                    .map_err(|e| LinkError::query(self.dst_chain().id(), e))?;

                let next_sequence_recv = if self.is_ordered() {
                    self.query_next_sequence_receive(height)?
                } else {
                    packet.sequence
                };

                let msg = MsgTimeout::new(packet.clone(), next_sequence_recv, proofs, signer.clone());
                Ok(MsgEnvelope::Packet(PacketMsg::Timeout(msg)))
            },
        )?;

        match submission {
            Submission::Committed(event) => {
                self.ledger
                    .acquire_mutex()
                    .mark_timed_out(packet.sequence)?;

                summary.timed_out.push(packet.sequence);
                summary.events.push(event);
                self.observer.on_packet_timed_out(packet);

                Ok(())
            }

            Submission::Rejected(e) if e.code == RejectionCode::Redundant => {
                debug!(sequence = %packet.sequence, "packet already cleared: {}", e.log);

                summary.duplicates.push(packet.sequence);
                self.observer.on_duplicate_relay(packet);

                Ok(())
            }

            Submission::Rejected(e) => Err(LinkError::submit(
                self.src_chain().id(),
                RelayerError::tx_rejected(self.src_chain().id(), e),
            )),
        }
    }

    fn query_next_sequence_receive(&self, height: Height) -> Result<Sequence, LinkError> {
        self.dst_chain()
            .query_next_sequence_receive(
                QueryNextSequenceReceiveRequest {
                    port_id: self.dst_port_id().clone(),
                    channel_id: self.dst_channel_id.clone(),
                    height: QueryHeight::Specific(height),
                },
                IncludeProof::No,
            )
            .map(|(sequence, _)| sequence)
            .map_err(|e| LinkError::query(self.dst_chain().id(), e))
    }

    /// Submits the message built by `build_msg` on the chain hosting `client`,
    /// preceded by the update of `client` to the proof height.
    ///
    /// A stale proof rejection is retried once, with proofs built at the new
    /// latest height of the counterparty and the client updated to it. A
    /// second stale rejection is an error.
    fn submit_with_proof<HostChain: ChainHandle, ProvingChain: ChainHandle>(
        &self,
        client: &ForeignClient<HostChain, ProvingChain>,
        sequence: Sequence,
        tracking_id: &'static str,
        build_msg: impl Fn(Height) -> Result<MsgEnvelope, LinkError>,
    ) -> Result<Submission, LinkError> {
        let host_chain = client.dst_chain();
        let proving_chain = client.src_chain();

        let mut stale = None;

        for attempt in 0..2 {
            if attempt > 0 {
                warn!(
                    %sequence,
                    client = %client.id(),
                    "proof rejected as stale by {}, updating the client and retrying once",
                    host_chain.id()
                );
            }

            let proof_height = proving_chain
                .query_latest_height()
                .map_err(|e| LinkError::query(proving_chain.id(), e))?;

            let msg = build_msg(proof_height)?;

            let mut msgs = client
                .build_update_client(proof_height)
                .map_err(|e| LinkError::client(host_chain.id(), e))?;

            msgs.push(msg);

            let events = host_chain
                .send_messages_and_wait_commit(TrackedMsgs::new_static(msgs, tracking_id))
                .map_err(|e| LinkError::submit(host_chain.id(), e))?;

            let rejection = events
                .iter()
                .find_map(|ev| ev.event.chain_error())
                .cloned();

            match rejection {
                Some(e) if e.code == RejectionCode::StaleProof => {
                    stale = Some(e);
                }
                Some(e) => return Ok(Submission::Rejected(e)),
                None => {
                    return events
                        .into_iter()
                        .last()
                        .map(|ev| Submission::Committed(ev.event))
                        .ok_or_else(|| LinkError::missing_event(tracking_id.to_string()));
                }
            }
        }

        let chain_error = stale.unwrap_or_else(|| {
            ChainError::new(RejectionCode::StaleProof, "proof rejected as stale")
        });

        Err(LinkError::stale_proof_escalated(
            sequence,
            host_chain.id(),
            RelayerError::tx_rejected(host_chain.id(), chain_error),
        ))
    }
}
