use ibc_relay_types::applications::transfer::packet::PacketData;
use ibc_relay_types::core::ics04_channel::acknowledgement::Acknowledgement;
use ibc_relay_types::core::ics04_channel::channel::{ChannelEnd, Order, State};
use ibc_relay_types::core::ics04_channel::commitment::{
    compute_ack_commitment, compute_packet_commitment,
};
use ibc_relay_types::core::ics04_channel::events::{
    AcknowledgePacket, SendPacket, TimeoutPacket, WriteAcknowledgement,
};
use ibc_relay_types::core::ics04_channel::msgs::{MsgAcknowledgement, MsgRecvPacket, MsgTimeout};
use ibc_relay_types::core::ics04_channel::packet::{Packet, Sequence};
use ibc_relay_types::core::ics04_channel::timeout::TimeoutHeight;
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, PortId};
use ibc_relay_types::core::ics24_host::path::{
    AcksPath, ChannelEndsPath, CommitmentsPath, Path, ReceiptsPath, SeqAcksPath, SeqRecvsPath,
    SeqSendsPath,
};
use ibc_relay_types::events::{ChainError, IbcEvent, RejectionCode};
use ibc_relay_types::timestamp::Timestamp;
use ibc_relay_types::Height;

use crate::chain::mock::host::{internal, Application, MockHost};
use crate::error::Error;

fn violation(log: impl Into<String>) -> ChainError {
    ChainError::new(RejectionCode::ProtocolViolation, log)
}

fn redundant(log: impl Into<String>) -> ChainError {
    ChainError::new(RejectionCode::Redundant, log)
}

fn commitment_path(packet: &Packet) -> Path {
    CommitmentsPath {
        port_id: packet.source_port.clone(),
        channel_id: packet.source_channel.clone(),
        sequence: packet.sequence,
    }
    .into()
}

fn packet_commitment(packet: &Packet) -> Vec<u8> {
    compute_packet_commitment(
        &packet.data,
        &packet.timeout_height,
        &packet.timeout_timestamp,
    )
    .into_vec()
}

impl MockHost {
    /// Commits a new packet on an open channel end in a new block.
    pub fn send_packet(
        &mut self,
        port_id: PortId,
        channel_id: ChannelId,
        data: Vec<u8>,
        timeout_height: TimeoutHeight,
        timeout_timestamp: Timestamp,
    ) -> Result<Packet, Error> {
        let end: ChannelEnd = self
            .store
            .get_json(&ChannelEndsPath(port_id.clone(), channel_id.clone()).into())?
            .ok_or_else(|| {
                Error::channel_not_found(self.chain_id.clone(), port_id.clone(), channel_id.clone())
            })?;

        if !end.is_open() {
            return Err(Error::channel_closed(port_id, channel_id));
        }

        let destination_channel = end
            .counterparty()
            .channel_id()
            .cloned()
            .ok_or_else(|| Error::channel_closed(port_id.clone(), channel_id.clone()))?;

        let send_path = Path::from(SeqSendsPath(port_id.clone(), channel_id.clone()));
        let sequence: Sequence = self
            .store
            .get_json(&send_path)?
            .unwrap_or_else(|| Sequence::from(1));

        let packet = Packet {
            sequence,
            source_port: port_id,
            source_channel: channel_id,
            destination_port: end.counterparty().port_id().clone(),
            destination_channel,
            data,
            timeout_height,
            timeout_timestamp,
        };

        packet.validate_basic().map_err(Error::channel)?;

        self.store
            .set(commitment_path(&packet), packet_commitment(&packet));
        self.store.set_json(send_path, &sequence.increment())?;

        self.tx_count += 1;
        let height = self.end_block();

        self.record_packet_event(
            IbcEvent::SendPacket(SendPacket {
                packet: packet.clone(),
            }),
            height,
        );

        Ok(packet)
    }

    pub(crate) fn recv_packet(
        &mut self,
        msg: MsgRecvPacket,
        height: Height,
        timestamp: Timestamp,
    ) -> Result<IbcEvent, ChainError> {
        let packet = msg.packet;
        let port_id = packet.destination_port.clone();
        let channel_id = packet.destination_channel.clone();

        let end = self.channel_end(&port_id, &channel_id)?;

        if !end.is_open() {
            return Err(violation(format!("channel {port_id}/{channel_id} is not open")));
        }

        if end.counterparty().port_id() != &packet.source_port
            || end.counterparty().channel_id() != Some(&packet.source_channel)
        {
            return Err(violation(format!(
                "packet source {}/{} is not the counterparty of {port_id}/{channel_id}",
                packet.source_port, packet.source_channel
            )));
        }

        if packet.timed_out(&timestamp, height) {
            return Err(ChainError::new(
                RejectionCode::PacketTimedOut,
                format!("packet {} timed out at height {height}", packet.sequence),
            ));
        }

        let receipt_path = Path::from(ReceiptsPath {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence: packet.sequence,
        });
        let next_recv_path = Path::from(SeqRecvsPath(port_id.clone(), channel_id.clone()));

        match end.ordering {
            Order::Unordered => {
                if self.store.contains(&receipt_path) {
                    return Err(redundant(format!(
                        "packet {} was already received",
                        packet.sequence
                    )));
                }
            }
            Order::Ordered => {
                let next = self.sequence(next_recv_path.clone())?;

                if packet.sequence < next {
                    return Err(redundant(format!(
                        "packet {} was already received",
                        packet.sequence
                    )));
                }

                if packet.sequence > next {
                    return Err(violation(format!(
                        "ordered channel expects packet {next}, got {}",
                        packet.sequence
                    )));
                }
            }
        }

        let client_id = self.channel_client(&end)?;
        self.verify_proof(
            &client_id,
            &msg.proofs,
            commitment_path(&packet),
            Some(&packet_commitment(&packet)),
        )?;

        let ack = self
            .on_recv_packet(&port_id, &packet)
            .to_bytes()
            .map_err(|e| violation(e.to_string()))?;

        match end.ordering {
            Order::Unordered => self.store.set(receipt_path, vec![1]),
            Order::Ordered => self
                .store
                .set_json(next_recv_path, &packet.sequence.increment())
                .map_err(internal)?,
        }

        self.store.set(
            AcksPath {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                sequence: packet.sequence,
            }
            .into(),
            compute_ack_commitment(&ack).into_vec(),
        );

        *self
            .recv_counts
            .entry((port_id, channel_id, packet.sequence))
            .or_default() += 1;

        let event = IbcEvent::WriteAcknowledgement(WriteAcknowledgement { packet, ack });
        self.record_packet_event(event.clone(), height);

        Ok(event)
    }

    /// Applies the packet to the module bound to `port_id`, returning its acknowledgement.
    fn on_recv_packet(&mut self, port_id: &PortId, packet: &Packet) -> Acknowledgement {
        let application = self.modules.get(port_id).map(|module| module.application);

        match application {
            Some(Application::Transfer) => {
                let credited = PacketData::from_bytes(&packet.data)
                    .and_then(|data| data.coin().map(|coin| (data.receiver, coin)));

                match credited {
                    Ok((receiver, coin)) => {
                        self.credit(&receiver, &coin);
                        Acknowledgement::success()
                    }
                    Err(e) => Acknowledgement::from_error(e),
                }
            }
            Some(Application::Echo) => Acknowledgement::Success(packet.data.clone()),
            None => Acknowledgement::from_error(format!("no module is bound to port {port_id}")),
        }
    }

    /// Checks that the packet commitment is still stored, and matches the packet.
    fn pending_commitment(&self, packet: &Packet) -> Result<(), ChainError> {
        let stored = self.store.get(&commitment_path(packet)).ok_or_else(|| {
            redundant(format!(
                "no commitment for packet {} on {}/{}",
                packet.sequence, packet.source_port, packet.source_channel
            ))
        })?;

        if stored != packet_commitment(packet).as_slice() {
            return Err(violation(format!(
                "packet {} does not match its commitment",
                packet.sequence
            )));
        }

        Ok(())
    }

    pub(crate) fn acknowledge_packet(
        &mut self,
        msg: MsgAcknowledgement,
    ) -> Result<IbcEvent, ChainError> {
        let packet = msg.packet;
        let port_id = packet.source_port.clone();
        let channel_id = packet.source_channel.clone();

        let end = self.channel_end(&port_id, &channel_id)?;

        if !end.is_open() {
            return Err(violation(format!("channel {port_id}/{channel_id} is not open")));
        }

        self.pending_commitment(&packet)?;

        let next_ack_path = Path::from(SeqAcksPath(port_id.clone(), channel_id.clone()));

        if end.ordering == Order::Ordered {
            let next = self.sequence(next_ack_path.clone())?;

            if packet.sequence != next {
                return Err(violation(format!(
                    "ordered channel expects acknowledgement {next}, got {}",
                    packet.sequence
                )));
            }
        }

        let client_id = self.channel_client(&end)?;
        self.verify_proof(
            &client_id,
            &msg.proofs,
            AcksPath {
                port_id: packet.destination_port.clone(),
                channel_id: packet.destination_channel.clone(),
                sequence: packet.sequence,
            }
            .into(),
            Some(&compute_ack_commitment(&msg.acknowledgement).into_vec()),
        )?;

        self.store.delete(&commitment_path(&packet));

        if end.ordering == Order::Ordered {
            self.store
                .set_json(next_ack_path, &packet.sequence.increment())
                .map_err(internal)?;
        }

        Ok(IbcEvent::AcknowledgePacket(AcknowledgePacket { packet }))
    }

    pub(crate) fn timeout_packet(&mut self, msg: MsgTimeout) -> Result<IbcEvent, ChainError> {
        let packet = msg.packet;
        let port_id = packet.source_port.clone();
        let channel_id = packet.source_channel.clone();

        let mut end = self.channel_end(&port_id, &channel_id)?;

        self.pending_commitment(&packet)?;

        let client_id = self.channel_client(&end)?;
        let proof_height = msg.proofs.height();
        let consensus_state = self.consensus_state(&client_id, proof_height)?;

        if !packet.timed_out(&consensus_state.timestamp(), proof_height) {
            return Err(violation(format!(
                "packet {} has not timed out at the proof height {proof_height}",
                packet.sequence
            )));
        }

        match end.ordering {
            Order::Unordered => self.verify_proof(
                &client_id,
                &msg.proofs,
                ReceiptsPath {
                    port_id: packet.destination_port.clone(),
                    channel_id: packet.destination_channel.clone(),
                    sequence: packet.sequence,
                }
                .into(),
                None,
            )?,
            Order::Ordered => {
                if msg.next_sequence_recv > packet.sequence {
                    return Err(violation(format!(
                        "packet {} was already received by the counterparty",
                        packet.sequence
                    )));
                }

                let next_recv = serde_json::to_vec(&msg.next_sequence_recv)
                    .map_err(|e| violation(e.to_string()))?;

                self.verify_proof(
                    &client_id,
                    &msg.proofs,
                    SeqRecvsPath(
                        packet.destination_port.clone(),
                        packet.destination_channel.clone(),
                    )
                    .into(),
                    Some(&next_recv),
                )?;
            }
        }

        self.store.delete(&commitment_path(&packet));

        // A timeout on an ordered channel closes it
        if end.ordering == Order::Ordered && !end.is_closed() {
            end.set_state(State::Closed);

            self.store
                .set_json(ChannelEndsPath(port_id, channel_id).into(), &end)
                .map_err(internal)?;
        }

        Ok(IbcEvent::TimeoutPacket(TimeoutPacket { packet }))
    }
}
