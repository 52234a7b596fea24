use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics02_client::events as ClientEvents;
use crate::core::ics03_connection::events as ConnectionEvents;
use crate::core::ics04_channel::events as ChannelEvents;
use crate::core::ics04_channel::packet::Packet;
use crate::Height;

/// The kind of an [`IbcEvent`], as reported in transaction results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IbcEventType {
    NewBlock,
    CreateClient,
    UpdateClient,
    OpenInitConnection,
    OpenTryConnection,
    OpenAckConnection,
    OpenConfirmConnection,
    OpenInitChannel,
    OpenTryChannel,
    OpenAckChannel,
    OpenConfirmChannel,
    SendPacket,
    ReceivePacket,
    WriteAck,
    AckPacket,
    Timeout,
    ChainError,
}

impl IbcEventType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            IbcEventType::NewBlock => "new_block",
            IbcEventType::CreateClient => "create_client",
            IbcEventType::UpdateClient => "update_client",
            IbcEventType::OpenInitConnection => "connection_open_init",
            IbcEventType::OpenTryConnection => "connection_open_try",
            IbcEventType::OpenAckConnection => "connection_open_ack",
            IbcEventType::OpenConfirmConnection => "connection_open_confirm",
            IbcEventType::OpenInitChannel => "channel_open_init",
            IbcEventType::OpenTryChannel => "channel_open_try",
            IbcEventType::OpenAckChannel => "channel_open_ack",
            IbcEventType::OpenConfirmChannel => "channel_open_confirm",
            IbcEventType::SendPacket => "send_packet",
            IbcEventType::ReceivePacket => "receive_packet",
            IbcEventType::WriteAck => "write_acknowledgement",
            IbcEventType::AckPacket => "acknowledge_packet",
            IbcEventType::Timeout => "timeout_packet",
            IbcEventType::ChainError => "chain_error",
        }
    }
}

impl Display for IbcEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}", self.as_str())
    }
}

/// Why a chain rejected a message, as reported in the transaction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionCode {
    /// The destination already holds a receipt for the packet, or the
    /// source no longer holds its commitment.
    Redundant,
    /// The proof height is not covered by a consensus state of the client.
    StaleProof,
    InvalidProof,
    /// The packet can no longer be received because its timeout has passed.
    PacketTimedOut,
    /// Version, ordering or state mismatch.
    ProtocolViolation,
    OutOfGas,
}

impl RejectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::Redundant => "redundant",
            RejectionCode::StaleProof => "stale_proof",
            RejectionCode::InvalidProof => "invalid_proof",
            RejectionCode::PacketTimedOut => "packet_timed_out",
            RejectionCode::ProtocolViolation => "protocol_violation",
            RejectionCode::OutOfGas => "out_of_gas",
        }
    }
}

impl Display for RejectionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}", self.as_str())
    }
}

/// A message rejected by the chain, with the code and log of the failed delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainError {
    pub code: RejectionCode,
    pub log: String,
}

impl ChainError {
    pub fn new(code: RejectionCode, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "code: {}, log: {}", self.code, self.log)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IbcEvent {
    NewBlock(Height),

    CreateClient(ClientEvents::CreateClient),
    UpdateClient(ClientEvents::UpdateClient),

    OpenInitConnection(ConnectionEvents::OpenInit),
    OpenTryConnection(ConnectionEvents::OpenTry),
    OpenAckConnection(ConnectionEvents::OpenAck),
    OpenConfirmConnection(ConnectionEvents::OpenConfirm),

    OpenInitChannel(ChannelEvents::OpenInit),
    OpenTryChannel(ChannelEvents::OpenTry),
    OpenAckChannel(ChannelEvents::OpenAck),
    OpenConfirmChannel(ChannelEvents::OpenConfirm),

    SendPacket(ChannelEvents::SendPacket),
    ReceivePacket(ChannelEvents::ReceivePacket),
    WriteAcknowledgement(ChannelEvents::WriteAcknowledgement),
    AcknowledgePacket(ChannelEvents::AcknowledgePacket),
    TimeoutPacket(ChannelEvents::TimeoutPacket),

    ChainError(ChainError),
}

impl Display for IbcEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            IbcEvent::NewBlock(h) => write!(f, "NewBlock({h})"),

            IbcEvent::CreateClient(ev) => write!(f, "CreateClient({ev})"),
            IbcEvent::UpdateClient(ev) => write!(f, "UpdateClient({ev})"),

            IbcEvent::OpenInitConnection(ev) => write!(f, "OpenInitConnection({ev})"),
            IbcEvent::OpenTryConnection(ev) => write!(f, "OpenTryConnection({ev})"),
            IbcEvent::OpenAckConnection(ev) => write!(f, "OpenAckConnection({ev})"),
            IbcEvent::OpenConfirmConnection(ev) => write!(f, "OpenConfirmConnection({ev})"),

            IbcEvent::OpenInitChannel(ev) => write!(f, "OpenInitChannel({ev})"),
            IbcEvent::OpenTryChannel(ev) => write!(f, "OpenTryChannel({ev})"),
            IbcEvent::OpenAckChannel(ev) => write!(f, "OpenAckChannel({ev})"),
            IbcEvent::OpenConfirmChannel(ev) => write!(f, "OpenConfirmChannel({ev})"),

            IbcEvent::SendPacket(ev) => write!(f, "{ev}"),
            IbcEvent::ReceivePacket(ev) => write!(f, "{ev}"),
            IbcEvent::WriteAcknowledgement(ev) => write!(f, "{ev}"),
            IbcEvent::AcknowledgePacket(ev) => write!(f, "{ev}"),
            IbcEvent::TimeoutPacket(ev) => write!(f, "{ev}"),

            IbcEvent::ChainError(ev) => write!(f, "ChainError({ev})"),
        }
    }
}

impl IbcEvent {
    pub fn event_type(&self) -> IbcEventType {
        match self {
            IbcEvent::NewBlock(_) => IbcEventType::NewBlock,
            IbcEvent::CreateClient(_) => IbcEventType::CreateClient,
            IbcEvent::UpdateClient(_) => IbcEventType::UpdateClient,
            IbcEvent::OpenInitConnection(_) => IbcEventType::OpenInitConnection,
            IbcEvent::OpenTryConnection(_) => IbcEventType::OpenTryConnection,
            IbcEvent::OpenAckConnection(_) => IbcEventType::OpenAckConnection,
            IbcEvent::OpenConfirmConnection(_) => IbcEventType::OpenConfirmConnection,
            IbcEvent::OpenInitChannel(_) => IbcEventType::OpenInitChannel,
            IbcEvent::OpenTryChannel(_) => IbcEventType::OpenTryChannel,
            IbcEvent::OpenAckChannel(_) => IbcEventType::OpenAckChannel,
            IbcEvent::OpenConfirmChannel(_) => IbcEventType::OpenConfirmChannel,
            IbcEvent::SendPacket(_) => IbcEventType::SendPacket,
            IbcEvent::ReceivePacket(_) => IbcEventType::ReceivePacket,
            IbcEvent::WriteAcknowledgement(_) => IbcEventType::WriteAck,
            IbcEvent::AcknowledgePacket(_) => IbcEventType::AckPacket,
            IbcEvent::TimeoutPacket(_) => IbcEventType::Timeout,
            IbcEvent::ChainError(_) => IbcEventType::ChainError,
        }
    }

    /// The packet carried by a packet event, if any.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            IbcEvent::SendPacket(ev) => Some(&ev.packet),
            IbcEvent::ReceivePacket(ev) => Some(&ev.packet),
            IbcEvent::WriteAcknowledgement(ev) => Some(&ev.packet),
            IbcEvent::AcknowledgePacket(ev) => Some(&ev.packet),
            IbcEvent::TimeoutPacket(ev) => Some(&ev.packet),
            _ => None,
        }
    }

    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            IbcEvent::ChainError(e) => Some(e),
            _ => None,
        }
    }

    pub fn connection_attributes(&self) -> Option<&ConnectionEvents::Attributes> {
        match self {
            IbcEvent::OpenInitConnection(ev) => Some(ev.attributes()),
            IbcEvent::OpenTryConnection(ev) => Some(ev.attributes()),
            IbcEvent::OpenAckConnection(ev) => Some(ev.attributes()),
            IbcEvent::OpenConfirmConnection(ev) => Some(ev.attributes()),
            _ => None,
        }
    }

    pub fn channel_attributes(&self) -> Option<&ChannelEvents::Attributes> {
        match self {
            IbcEvent::OpenInitChannel(ev) => Some(ev.attributes()),
            IbcEvent::OpenTryChannel(ev) => Some(ev.attributes()),
            IbcEvent::OpenAckChannel(ev) => Some(ev.attributes()),
            IbcEvent::OpenConfirmChannel(ev) => Some(ev.attributes()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::core::ics04_channel::timeout::TimeoutHeight;
    use crate::test_utils::dummy_packet;
    use crate::timestamp::Timestamp;

    #[test]
    fn packet_events_expose_their_packet() {
        let packet = dummy_packet(3, TimeoutHeight::Never, Timestamp::none());
        let ev = IbcEvent::SendPacket(ChannelEvents::SendPacket {
            packet: packet.clone(),
        });

        assert_eq!(ev.event_type(), IbcEventType::SendPacket);
        assert_eq!(ev.event_type().as_str(), "send_packet");
        assert_eq!(ev.packet(), Some(&packet));

        let err = IbcEvent::ChainError(ChainError::new(RejectionCode::Redundant, "boom"));
        assert_eq!(err.chain_error().map(|e| e.code), Some(RejectionCode::Redundant));
        assert!(err.packet().is_none());
        assert_eq!(
            err.to_string(),
            "ChainError(code: redundant, log: boom)"
        );
    }
}
