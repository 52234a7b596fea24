use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics23_commitment::commitment::CommitmentRoot;
use crate::core::ics24_host::identifier::ChainId;
use crate::timestamp::Timestamp;
use crate::Height;

/// A signed header of the counterparty chain, submitted in client updates.
///
/// `trusted_height` names the consensus state already stored by the client
/// that the header is verified against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub chain_id: ChainId,
    pub height: Height,
    pub trusted_height: Height,
    pub timestamp: Timestamp,
    pub root: CommitmentRoot,
    #[serde(with = "crate::serializers::hex")]
    pub validators_hash: Vec<u8>,
}

impl Header {
    pub fn height(&self) -> Height {
        self.height
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "Header {{ chain_id: {}, height: {}, trusted_height: {}, timestamp: {} }}",
            self.chain_id, self.height, self.trusted_height, self.timestamp
        )
    }
}
