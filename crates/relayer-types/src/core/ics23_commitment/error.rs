use flex_error::define_error;

define_error! {
    Error {
        EmptyCommitmentPrefix
            |_| { "empty commitment prefix" },

        EmptyMerkleProof
            |_| { "empty merkle proof" },

        EmptyMerkleRoot
            |_| { "empty merkle root" },

        InvalidMerkleProof
            { reason: String }
            |e| { format_args!("invalid merkle proof: {}", e.reason) },

        VerificationFailure
            { path: String }
            |e| { format_args!("failed to verify membership proof for path {}", e.path) },

        NonMembershipFailure
            { path: String }
            |e| { format_args!("failed to verify non-membership proof for path {}", e.path) },

        MismatchedRoot
            |_| { "proof does not match the trusted commitment root" },
    }
}
