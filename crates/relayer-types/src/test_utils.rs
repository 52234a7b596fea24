use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::timeout::TimeoutHeight;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::timestamp::Timestamp;
use crate::Height;

/// Returns a height on revision 0, for testing only!
pub fn height(revision_height: u64) -> Height {
    Height::new(0, revision_height).unwrap()
}

/// Returns a dummy `Packet`, for testing only!
pub fn dummy_packet(
    sequence: u64,
    timeout_height: TimeoutHeight,
    timeout_timestamp: Timestamp,
) -> Packet {
    Packet {
        sequence: Sequence::from(sequence),
        source_port: PortId::transfer(),
        source_channel: ChannelId::new(0),
        destination_port: PortId::transfer(),
        destination_channel: ChannelId::new(1),
        data: vec![0],
        timeout_height,
        timeout_timestamp,
    }
}
