//! Types for the IBC events emitted by the channel module.

use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::packet::Packet;
use crate::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub port_id: PortId,
    pub channel_id: Option<ChannelId>,
    pub connection_id: ConnectionId,
    pub counterparty_port_id: PortId,
    pub counterparty_channel_id: Option<ChannelId>,
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let channel_id = self
            .channel_id
            .as_ref()
            .map_or_else(|| "None".to_string(), ToString::to_string);

        let counterparty_channel_id = self
            .counterparty_channel_id
            .as_ref()
            .map_or_else(|| "None".to_string(), ToString::to_string);

        write!(
            f,
            "Attributes {{ port_id: {}, channel_id: {}, connection_id: {}, counterparty_port_id: {}, counterparty_channel_id: {} }}",
            self.port_id, channel_id, self.connection_id, self.counterparty_port_id, counterparty_channel_id
        )
    }
}

macro_rules! channel_event {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name(pub Attributes);

        impl $name {
            pub fn attributes(&self) -> &Attributes {
                &self.0
            }

            pub fn channel_id(&self) -> Option<&ChannelId> {
                self.0.channel_id.as_ref()
            }

            pub fn port_id(&self) -> &PortId {
                &self.0.port_id
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
                write!(f, "{}", self.0)
            }
        }
    };
}

channel_event!(OpenInit);
channel_event!(OpenTry);
channel_event!(OpenAck);
channel_event!(OpenConfirm);

macro_rules! packet_event {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub packet: Packet,
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
                write!(f, "{} {{ packet: {} }}", stringify!($name), self.packet)
            }
        }
    };
}

packet_event!(SendPacket);
packet_event!(ReceivePacket);
packet_event!(AcknowledgePacket);
packet_event!(TimeoutPacket);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAcknowledgement {
    pub packet: Packet,
    #[serde(with = "crate::serializers::base64")]
    pub ack: Vec<u8>,
}

impl WriteAcknowledgement {
    /// Decodes the acknowledgement bytes written by the destination chain.
    pub fn acknowledgement(
        &self,
    ) -> Result<Acknowledgement, crate::core::ics04_channel::error::Error> {
        Acknowledgement::from_bytes(&self.ack)
    }
}

impl Display for WriteAcknowledgement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "WriteAcknowledgement {{ packet: {}, ack: {} bytes }}",
            self.packet,
            self.ack.len()
        )
    }
}
