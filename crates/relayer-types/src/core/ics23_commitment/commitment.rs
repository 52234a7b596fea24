use core::fmt::{Debug, Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};
use subtle_encoding::{Encoding, Hex};

use super::error::Error;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentRoot {
    #[serde(with = "crate::serializers::hex")]
    bytes: Vec<u8>,
}

impl Debug for CommitmentRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let hex = Hex::upper_case()
            .encode_to_string(&self.bytes)
            .map_err(|_| FmtError)?;
        f.debug_tuple("CommitmentRoot").field(&hex).finish()
    }
}

impl CommitmentRoot {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: Vec::from(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for CommitmentRoot {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentProofBytes {
    #[serde(with = "crate::serializers::base64")]
    bytes: Vec<u8>,
}

impl CommitmentProofBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Debug for CommitmentProofBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "CommitmentProofBytes({} bytes)", self.bytes.len())
    }
}

impl TryFrom<Vec<u8>> for CommitmentProofBytes {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.is_empty() {
            Err(Self::Error::empty_merkle_proof())
        } else {
            Ok(Self { bytes })
        }
    }
}

impl From<CommitmentProofBytes> for Vec<u8> {
    fn from(p: CommitmentProofBytes) -> Vec<u8> {
        p.bytes
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentPrefix {
    bytes: Vec<u8>,
}

impl CommitmentPrefix {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for CommitmentPrefix {
    fn default() -> Self {
        Self {
            bytes: b"ibc".to_vec(),
        }
    }
}

impl TryFrom<Vec<u8>> for CommitmentPrefix {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.is_empty() {
            Err(Self::Error::empty_commitment_prefix())
        } else {
            Ok(Self { bytes })
        }
    }
}

impl Debug for CommitmentPrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let converted = core::str::from_utf8(self.as_bytes());
        match converted {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => write!(f, "<not valid UTF8: {:?}>", self.as_bytes()),
        }
    }
}

impl Display for CommitmentPrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn empty_proofs_and_prefixes_are_rejected() {
        assert!(CommitmentProofBytes::try_from(Vec::new()).is_err());
        assert!(CommitmentPrefix::try_from(Vec::new()).is_err());
        assert!(CommitmentProofBytes::try_from(vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn default_prefix_is_ibc() {
        assert_eq!(CommitmentPrefix::default().to_string(), "ibc");
    }

    #[test]
    fn root_serializes_as_hex() {
        let root = CommitmentRoot::from_bytes(&[0xAB, 0x01]);
        let json = serde_json::to_string(&root).unwrap();
        assert_eq!(json, "\"AB01\"");

        let back: CommitmentRoot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
    }
}
