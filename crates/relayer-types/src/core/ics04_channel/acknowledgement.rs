//! Acknowledgements written by the destination chain after it applies a packet.

use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics04_channel::error::Error;

/// The byte the transfer application returns for a successful packet, before encoding.
pub const ACK_SUCCESS_RESULT: u8 = 0x01;

/// The outcome of applying a packet on the destination chain.
///
/// Encoded as the JSON object `{"result": "<base64>"}` on success and
/// `{"error": "<message>"}` on failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acknowledgement {
    #[serde(rename = "result", with = "crate::serializers::base64")]
    Success(Vec<u8>),
    #[serde(rename = "error")]
    Error(String),
}

impl Acknowledgement {
    /// The success acknowledgement written by the transfer application.
    pub fn success() -> Self {
        Self::Success(vec![ACK_SUCCESS_RESULT])
    }

    pub fn from_error(message: impl Display) -> Self {
        Self::Error(message.to_string())
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Encodes the acknowledgement into the bytes committed to by the destination chain.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::invalid_acknowledgement)
    }

    /// Decodes an acknowledgement from the bytes written by the destination chain.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::empty_acknowledgement());
        }

        serde_json::from_slice(bytes).map_err(Error::invalid_acknowledgement)
    }
}

impl Display for Acknowledgement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Success(result) => write!(f, "success({} bytes)", result.len()),
            Self::Error(message) => write!(f, "error({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::Acknowledgement;

    #[test]
    fn success_wire_format() {
        let bytes = Acknowledgement::success().to_bytes().unwrap();
        assert_eq!(bytes, br#"{"result":"AQ=="}"#.to_vec());

        let decoded = Acknowledgement::from_bytes(&bytes).unwrap();
        assert!(decoded.is_successful());
    }

    #[test]
    fn error_wire_format() {
        let ack = Acknowledgement::from_error("insufficient funds");
        let bytes = ack.to_bytes().unwrap();
        assert_eq!(bytes, br#"{"error":"insufficient funds"}"#.to_vec());

        let decoded = Acknowledgement::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, ack);
        assert!(!decoded.is_successful());
    }

    #[test]
    fn malformed_acknowledgements_are_rejected() {
        assert!(Acknowledgement::from_bytes(b"").is_err());
        assert!(Acknowledgement::from_bytes(b"{}").is_err());
        assert!(Acknowledgement::from_bytes(br#"{"unknown":"x"}"#).is_err());
        assert!(Acknowledgement::from_bytes(br#"{"result":"!!"}"#).is_err());
    }
}
