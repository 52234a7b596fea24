use crate::core::ics02_client::msgs::{MsgCreateClient, MsgUpdateClient};
use crate::core::ics03_connection::msgs::{
    MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit, MsgConnectionOpenTry,
};
use crate::core::ics04_channel::msgs::{
    MsgAcknowledgement, MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit,
    MsgChannelOpenTry, MsgRecvPacket, MsgTimeout,
};
use crate::core::ics26_routing::msgs::{
    ChannelMsg, ClientMsg, ConnectionMsg, MsgEnvelope, PacketMsg,
};

pub trait Msg: Clone {
    /// Unique type identifier for this message.
    const TYPE_URL: &'static str;

    fn type_url(&self) -> &'static str {
        Self::TYPE_URL
    }

    /// Wraps the message into the envelope a chain endpoint accepts.
    fn to_envelope(self) -> MsgEnvelope;
}

macro_rules! impl_msg {
    ($msg:ty, $url:literal, $outer:ident, $inner:ident :: $variant:ident) => {
        impl Msg for $msg {
            const TYPE_URL: &'static str = $url;

            fn to_envelope(self) -> MsgEnvelope {
                MsgEnvelope::$outer($inner::$variant(self))
            }
        }
    };
}

impl_msg!(MsgCreateClient, "/ibc.core.client.v1.MsgCreateClient", Client, ClientMsg::CreateClient);
impl_msg!(MsgUpdateClient, "/ibc.core.client.v1.MsgUpdateClient", Client, ClientMsg::UpdateClient);

impl_msg!(
    MsgConnectionOpenInit,
    "/ibc.core.connection.v1.MsgConnectionOpenInit",
    Connection,
    ConnectionMsg::OpenInit
);
impl_msg!(
    MsgConnectionOpenTry,
    "/ibc.core.connection.v1.MsgConnectionOpenTry",
    Connection,
    ConnectionMsg::OpenTry
);
impl_msg!(
    MsgConnectionOpenAck,
    "/ibc.core.connection.v1.MsgConnectionOpenAck",
    Connection,
    ConnectionMsg::OpenAck
);
impl_msg!(
    MsgConnectionOpenConfirm,
    "/ibc.core.connection.v1.MsgConnectionOpenConfirm",
    Connection,
    ConnectionMsg::OpenConfirm
);

impl_msg!(MsgChannelOpenInit, "/ibc.core.channel.v1.MsgChannelOpenInit", Channel, ChannelMsg::OpenInit);
impl_msg!(MsgChannelOpenTry, "/ibc.core.channel.v1.MsgChannelOpenTry", Channel, ChannelMsg::OpenTry);
impl_msg!(MsgChannelOpenAck, "/ibc.core.channel.v1.MsgChannelOpenAck", Channel, ChannelMsg::OpenAck);
impl_msg!(
    MsgChannelOpenConfirm,
    "/ibc.core.channel.v1.MsgChannelOpenConfirm",
    Channel,
    ChannelMsg::OpenConfirm
);

impl_msg!(MsgRecvPacket, "/ibc.core.channel.v1.MsgRecvPacket", Packet, PacketMsg::Recv);
impl_msg!(MsgAcknowledgement, "/ibc.core.channel.v1.MsgAcknowledgement", Packet, PacketMsg::Ack);
impl_msg!(MsgTimeout, "/ibc.core.channel.v1.MsgTimeout", Packet, PacketMsg::Timeout);
