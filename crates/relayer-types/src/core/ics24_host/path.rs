//! Defines all store paths used by IBC
//!
//! Path-space as listed in ICS-024
//! <https://github.com/cosmos/ibc/tree/master/spec/core/ics-024-host-requirements#path-space>.
//! Some of these are implemented in other ICSs, but ICS-024 has a nice summary table.

use derive_more::{Display, From};
use serde_derive::{Deserialize, Serialize};

use crate::core::ics04_channel::packet::Sequence;
use crate::core::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
use crate::Height;

/// The Path enum abstracts out the different sub-paths.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Display, Serialize, Deserialize)]
pub enum Path {
    ClientState(ClientStatePath),
    ClientConsensusState(ClientConsensusStatePath),
    Connections(ConnectionsPath),
    ChannelEnds(ChannelEndsPath),
    SeqSends(SeqSendsPath),
    SeqRecvs(SeqRecvsPath),
    SeqAcks(SeqAcksPath),
    Commitments(CommitmentsPath),
    Acks(AcksPath),
    Receipts(ReceiptsPath),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "clients/{}/clientState", _0)]
pub struct ClientStatePath(pub ClientId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "clients/{}/consensusStates/{}", client_id, height)]
pub struct ClientConsensusStatePath {
    pub client_id: ClientId,
    pub height: Height,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "connections/{}", _0)]
pub struct ConnectionsPath(pub ConnectionId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "channelEnds/ports/{}/channels/{}", _0, _1)]
pub struct ChannelEndsPath(pub PortId, pub ChannelId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "nextSequenceSend/ports/{}/channels/{}", _0, _1)]
pub struct SeqSendsPath(pub PortId, pub ChannelId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "nextSequenceRecv/ports/{}/channels/{}", _0, _1)]
pub struct SeqRecvsPath(pub PortId, pub ChannelId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "nextSequenceAck/ports/{}/channels/{}", _0, _1)]
pub struct SeqAcksPath(pub PortId, pub ChannelId);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(
    fmt = "commitments/ports/{}/channels/{}/sequences/{}",
    port_id,
    channel_id,
    sequence
)]
pub struct CommitmentsPath {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: Sequence,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "acks/ports/{}/channels/{}/sequences/{}", port_id, channel_id, sequence)]
pub struct AcksPath {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: Sequence,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display(
    fmt = "receipts/ports/{}/channels/{}/sequences/{}",
    port_id,
    channel_id,
    sequence
)]
pub struct ReceiptsPath {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: Sequence,
}

impl Path {
    /// Indication if the path is provable.
    pub fn is_provable(&self) -> bool {
        !matches!(&self, Path::ClientState(_))
    }

    /// into_bytes implementation
    pub fn into_bytes(self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}
