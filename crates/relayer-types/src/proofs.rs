use flex_error::define_error;
use serde_derive::{Deserialize, Serialize};

use crate::core::ics23_commitment::commitment::CommitmentProofBytes;
use crate::Height;

define_error! {
    ProofError {
        EmptyProof
            | _ | { format_args!("proof cannot be empty") },
    }
}

/// Structure comprising proofs in a message. Proofs are present in messages for
/// handshake protocols, e.g., ICS3 connection (open) handshake or ICS4 channel (open)
/// handshake, as well as for ICS4 packets, timeouts, and acknowledgements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proofs {
    object_proof: CommitmentProofBytes,
    /// Height for the commitment root for proving the proofs above.
    height: Height,
}

impl Proofs {
    pub fn new(object_proof: CommitmentProofBytes, height: Height) -> Result<Self, ProofError> {
        if object_proof.as_bytes().is_empty() {
            return Err(ProofError::empty_proof());
        }

        Ok(Self {
            object_proof,
            height,
        })
    }

    /// Getter for the height field of this proof (i.e., the consensus height where this proof was
    /// created).
    pub fn height(&self) -> Height {
        self.height
    }

    /// Getter for the object-specific proof (e.g., proof for connection state or channel state).
    pub fn object_proof(&self) -> &CommitmentProofBytes {
        &self.object_proof
    }
}
