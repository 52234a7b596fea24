use core::fmt::{Debug, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle_encoding::{Encoding, Hex};

use crate::core::ics04_channel::timeout::TimeoutHeight;
use crate::timestamp::Timestamp;

/// Packet commitment
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketCommitment(Vec<u8>);

impl PacketCommitment {
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PacketCommitment {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Debug for PacketCommitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let hex = Hex::upper_case()
            .encode_to_string(&self.0)
            .map_err(|_| FmtError)?;
        f.debug_tuple("PacketCommitment").field(&hex).finish()
    }
}

/// Acknowledgement commitment to be stored
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcknowledgementCommitment(Vec<u8>);

impl AcknowledgementCommitment {
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for AcknowledgementCommitment {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Debug for AcknowledgementCommitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let hex = Hex::upper_case()
            .encode_to_string(&self.0)
            .map_err(|_| FmtError)?;
        f.debug_tuple("AcknowledgementCommitment").field(&hex).finish()
    }
}

/// Compute the commitment for a packet.
///
/// The commitment is the hash of the timeout timestamp, the timeout height
/// revision number and revision height (all big-endian), followed by the hash
/// of the packet data.
pub fn compute_packet_commitment(
    packet_data: &[u8],
    timeout_height: &TimeoutHeight,
    timeout_timestamp: &Timestamp,
) -> PacketCommitment {
    let mut hash_input = timeout_timestamp.nanoseconds().to_be_bytes().to_vec();

    let revision_number = timeout_height.commitment_revision_number().to_be_bytes();
    hash_input.append(&mut revision_number.to_vec());

    let revision_height = timeout_height.commitment_revision_height().to_be_bytes();
    hash_input.append(&mut revision_height.to_vec());

    let packet_data_hash = Sha256::digest(packet_data);
    hash_input.append(&mut packet_data_hash.to_vec());

    PacketCommitment::from(Sha256::digest(&hash_input).to_vec())
}

/// Compute the commitment for an acknowledgement.
pub fn compute_ack_commitment(ack: &[u8]) -> AcknowledgementCommitment {
    AcknowledgementCommitment::from(Sha256::digest(ack).to_vec())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::test_utils::height;

    #[test]
    fn commitment_binds_timeouts_and_data() {
        let base = compute_packet_commitment(b"data", &TimeoutHeight::Never, &Timestamp::none());

        assert_eq!(base.as_bytes().len(), 32);
        assert_ne!(
            base,
            compute_packet_commitment(b"other", &TimeoutHeight::Never, &Timestamp::none())
        );
        assert_ne!(
            base,
            compute_packet_commitment(b"data", &TimeoutHeight::At(height(1)), &Timestamp::none())
        );
        assert_ne!(
            base,
            compute_packet_commitment(
                b"data",
                &TimeoutHeight::Never,
                &Timestamp::from_nanoseconds(1)
            )
        );
    }

    #[test]
    fn ack_commitment_is_sha256() {
        let commitment = compute_ack_commitment(b"{}");
        assert_eq!(commitment.as_bytes().len(), 32);
        assert_eq!(commitment, compute_ack_commitment(b"{}"));
    }
}
