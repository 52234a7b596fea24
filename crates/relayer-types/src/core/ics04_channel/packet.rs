use core::fmt::{Display, Error as FmtError, Formatter};
use core::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::core::ics04_channel::error::Error;
use crate::core::ics04_channel::timeout::TimeoutHeight;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::timestamp::{Expiry::Expired, Timestamp};
use crate::Height;

/// Enumeration of proof carrying ICS4 message, helper for relayer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketMsgType {
    Recv,
    Ack,
    TimeoutUnordered,
    TimeoutOrdered,
}

/// Packet receipt, used over unordered channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Receipt {
    Ok,
}

impl Display for PacketMsgType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            PacketMsgType::Recv => write!(f, "(PacketMsgType::Recv)"),
            PacketMsgType::Ack => write!(f, "(PacketMsgType::Ack)"),
            PacketMsgType::TimeoutUnordered => write!(f, "(PacketMsgType::TimeoutUnordered)"),
            PacketMsgType::TimeoutOrdered => write!(f, "(PacketMsgType::TimeoutOrdered)"),
        }
    }
}

/// The sequence number of a packet enforces ordering among packets from the same source.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
pub struct Sequence(u64);

impl FromStr for Sequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sequence = s.parse::<u64>().map_err(|_| Error::zero_packet_sequence())?;
        Ok(Self::from(sequence))
    }
}

impl Sequence {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn increment(&self) -> Sequence {
        Sequence(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Sequence {
    fn from(seq: u64) -> Self {
        Sequence(seq)
    }
}

impl From<Sequence> for u64 {
    fn from(s: Sequence) -> u64 {
        s.0
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Default, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct Packet {
    pub sequence: Sequence,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub destination_port: PortId,
    pub destination_channel: ChannelId,
    #[serde(with = "crate::serializers::hex")]
    pub data: Vec<u8>,
    pub timeout_height: TimeoutHeight,
    pub timeout_timestamp: Timestamp,
}

struct PacketData<'a>(&'a [u8]);

impl<'a> core::fmt::Debug for PacketData<'a> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(formatter, "{:?}", self.0)
    }
}

impl core::fmt::Debug for Packet {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), FmtError> {
        // Remember: if you alter the definition of `Packet`,
        // 1. update the formatter debug struct builder calls (return object of
        //    this function)
        // 2. update this destructuring assignment accordingly
        let Packet {
            sequence: _,
            source_port: _,
            source_channel: _,
            destination_port: _,
            destination_channel: _,
            data,
            timeout_height: _,
            timeout_timestamp: _,
        } = self;
        let data_wrapper = PacketData(data);

        formatter
            .debug_struct("Packet")
            .field("sequence", &self.sequence)
            .field("source_port", &self.source_port)
            .field("source_channel", &self.source_channel)
            .field("destination_port", &self.destination_port)
            .field("destination_channel", &self.destination_channel)
            .field("data", &data_wrapper)
            .field("timeout_height", &self.timeout_height)
            .field("timeout_timestamp", &self.timeout_timestamp)
            .finish()
    }
}

impl Packet {
    /// Checks whether a packet from a
    /// [`SendPacket`](crate::core::ics04_channel::events::SendPacket)
    /// event is timed-out relative to the current state of the
    /// destination chain.
    ///
    /// Checks both for time-out relative to the destination chain's
    /// current timestamp `dst_chain_ts` as well as relative to
    /// the height `dst_chain_height`. A packet is timed out as soon as
    /// the destination reaches its timeout height or timestamp.
    ///
    /// Note: a timed-out packet should result in a
    /// [`MsgTimeout`](crate::core::ics04_channel::msgs::MsgTimeout),
    /// instead of the common-case where it results in
    /// [`MsgRecvPacket`](crate::core::ics04_channel::msgs::MsgRecvPacket).
    pub fn timed_out(&self, dst_chain_ts: &Timestamp, dst_chain_height: Height) -> bool {
        let height_timed_out = self.timeout_height.has_expired(dst_chain_height);

        let timestamp_timed_out = self.timeout_timestamp != Timestamp::none()
            && dst_chain_ts.check_expiry(&self.timeout_timestamp) == Expired;

        height_timed_out || timestamp_timed_out
    }

    /// Checks that the packet is well formed before it is committed.
    pub fn validate_basic(&self) -> Result<(), Error> {
        if self.sequence.is_zero() {
            return Err(Error::zero_packet_sequence());
        }

        if self.data.is_empty() {
            return Err(Error::zero_packet_data());
        }

        Ok(())
    }
}

/// Custom debug output to omit the packet data
impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "seq:{}, path:{}/{}->{}/{}, toh:{}, tos:{})",
            self.sequence,
            self.source_channel,
            self.source_port,
            self.destination_channel,
            self.destination_port,
            self.timeout_height,
            self.timeout_timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::test_utils::{dummy_packet, height};

    #[test]
    fn sequence_arithmetic() {
        let seq = Sequence::from(1);
        assert_eq!(seq.increment(), Sequence::from(2));
        assert!(Sequence::default().is_zero());
        assert_eq!("17".parse::<Sequence>().unwrap(), Sequence::from(17));
        assert!("x".parse::<Sequence>().is_err());
    }

    #[test]
    fn packet_without_timeout_never_times_out() {
        let packet = dummy_packet(1, TimeoutHeight::Never, Timestamp::none());

        assert!(!packet.timed_out(&Timestamp::from_nanoseconds(u64::MAX), height(u64::MAX)));
    }

    #[test]
    fn packet_times_out_at_timeout_height() {
        let packet = dummy_packet(1, TimeoutHeight::At(height(10)), Timestamp::none());
        let now = Timestamp::from_nanoseconds(1);

        assert!(!packet.timed_out(&now, height(9)));
        assert!(packet.timed_out(&now, height(10)));
        assert!(packet.timed_out(&now, height(11)));
    }

    #[test]
    fn packet_times_out_at_timeout_timestamp() {
        let packet = dummy_packet(1, TimeoutHeight::Never, Timestamp::from_nanoseconds(1_000));

        assert!(!packet.timed_out(&Timestamp::from_nanoseconds(999), height(100)));
        assert!(packet.timed_out(&Timestamp::from_nanoseconds(1_000), height(100)));
    }

    #[test]
    fn packet_validation() {
        let packet = dummy_packet(0, TimeoutHeight::Never, Timestamp::none());
        assert!(packet.validate_basic().is_err());

        let mut packet = dummy_packet(1, TimeoutHeight::Never, Timestamp::none());
        assert!(packet.validate_basic().is_ok());

        packet.data.clear();
        assert!(packet.validate_basic().is_err());
    }
}
