use derive_more::From;
use serde_derive::{Deserialize, Serialize};

use crate::core::ics02_client::msgs::{MsgCreateClient, MsgUpdateClient};
use crate::core::ics03_connection::msgs::{
    MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit, MsgConnectionOpenTry,
};
use crate::core::ics04_channel::msgs::{
    MsgAcknowledgement, MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit,
    MsgChannelOpenTry, MsgRecvPacket, MsgTimeout,
};

/// Enumeration of all messages that a chain endpoint is able to route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, From)]
pub enum MsgEnvelope {
    Client(ClientMsg),
    Connection(ConnectionMsg),
    Channel(ChannelMsg),
    Packet(PacketMsg),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, From)]
pub enum ClientMsg {
    CreateClient(MsgCreateClient),
    UpdateClient(MsgUpdateClient),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, From)]
pub enum ConnectionMsg {
    OpenInit(MsgConnectionOpenInit),
    OpenTry(MsgConnectionOpenTry),
    OpenAck(MsgConnectionOpenAck),
    OpenConfirm(MsgConnectionOpenConfirm),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, From)]
pub enum ChannelMsg {
    OpenInit(MsgChannelOpenInit),
    OpenTry(MsgChannelOpenTry),
    OpenAck(MsgChannelOpenAck),
    OpenConfirm(MsgChannelOpenConfirm),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, From)]
pub enum PacketMsg {
    Recv(MsgRecvPacket),
    Ack(MsgAcknowledgement),
    Timeout(MsgTimeout),
}

impl MsgEnvelope {
    pub fn type_url(&self) -> &'static str {
        use crate::tx_msg::Msg;

        match self {
            Self::Client(ClientMsg::CreateClient(m)) => m.type_url(),
            Self::Client(ClientMsg::UpdateClient(m)) => m.type_url(),
            Self::Connection(ConnectionMsg::OpenInit(m)) => m.type_url(),
            Self::Connection(ConnectionMsg::OpenTry(m)) => m.type_url(),
            Self::Connection(ConnectionMsg::OpenAck(m)) => m.type_url(),
            Self::Connection(ConnectionMsg::OpenConfirm(m)) => m.type_url(),
            Self::Channel(ChannelMsg::OpenInit(m)) => m.type_url(),
            Self::Channel(ChannelMsg::OpenTry(m)) => m.type_url(),
            Self::Channel(ChannelMsg::OpenAck(m)) => m.type_url(),
            Self::Channel(ChannelMsg::OpenConfirm(m)) => m.type_url(),
            Self::Packet(PacketMsg::Recv(m)) => m.type_url(),
            Self::Packet(PacketMsg::Ack(m)) => m.type_url(),
            Self::Packet(PacketMsg::Timeout(m)) => m.type_url(),
        }
    }
}
