//! Message definitions for the channel handshake and packet datagrams.

use serde_derive::{Deserialize, Serialize};

use crate::core::ics04_channel::channel::ChannelEnd;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::version::Version;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::proofs::Proofs;
use crate::signer::Signer;

/// Message definition for the first step in the channel open handshake (`ChanOpenInit` datagram).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgChannelOpenInit {
    pub port_id: PortId,
    pub channel: ChannelEnd,
    pub signer: Signer,
}

/// Message definition for the second step in the channel open handshake (`ChanOpenTry` datagram).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgChannelOpenTry {
    pub port_id: PortId,
    pub channel: ChannelEnd,
    pub counterparty_version: Version,
    pub proofs: Proofs,
    pub signer: Signer,
}

/// Message definition for the third step in the channel open handshake (`ChanOpenAck` datagram).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgChannelOpenAck {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub counterparty_channel_id: ChannelId,
    pub counterparty_version: Version,
    pub proofs: Proofs,
    pub signer: Signer,
}

/// Message definition for the fourth step in the channel open handshake (`ChanOpenConfirm` datagram).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgChannelOpenConfirm {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub proofs: Proofs,
    pub signer: Signer,
}

/// Message definition for the "packet receiving" datagram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRecvPacket {
    pub packet: Packet,
    pub proofs: Proofs,
    pub signer: Signer,
}

impl MsgRecvPacket {
    pub fn new(packet: Packet, proofs: Proofs, signer: Signer) -> MsgRecvPacket {
        Self {
            packet,
            proofs,
            signer,
        }
    }
}

/// Message definition for packet acknowledgements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAcknowledgement {
    pub packet: Packet,
    #[serde(with = "crate::serializers::base64")]
    pub acknowledgement: Vec<u8>,
    pub proofs: Proofs,
    pub signer: Signer,
}

impl MsgAcknowledgement {
    pub fn new(packet: Packet, acknowledgement: Vec<u8>, proofs: Proofs, signer: Signer) -> Self {
        Self {
            packet,
            acknowledgement,
            proofs,
            signer,
        }
    }
}

/// Message definition for packet timeout domain type.
///
/// `next_sequence_recv` is only checked on ordered channels, where the
/// proof attests to the destination's next receive sequence instead of the
/// absence of a receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTimeout {
    pub packet: Packet,
    pub next_sequence_recv: Sequence,
    pub proofs: Proofs,
    pub signer: Signer,
}

impl MsgTimeout {
    pub fn new(
        packet: Packet,
        next_sequence_recv: Sequence,
        proofs: Proofs,
        signer: Signer,
    ) -> MsgTimeout {
        Self {
            packet,
            next_sequence_recv,
            proofs,
            signer,
        }
    }
}
