use flex_error::{define_error, TraceError};

use crate::core::ics24_host::error::ValidationError;
use crate::core::ics24_host::identifier::ChainId;
use crate::timestamp::Timestamp;
use crate::Height;

define_error! {
    Error {
        UnknownClientType
            { client_type: String }
            | e | { format_args!("unknown client type: {0}", e.client_type) },

        InvalidClientIdentifier
            [ ValidationError ]
            | _ | { "client identifier error" },

        InvalidHeight
            | _ | { "height cannot be zero" },

        InvalidHeightResult
            | _ | { "height cannot end up zero or negative" },

        InvalidRawHeight
            { raw_height: String }
            [ TraceError<core::num::ParseIntError> ]
            | e | { format_args!("cannot convert into a `Height` type from string {0}", e.raw_height) },

        ClientFrozen
            { chain_id: ChainId }
            | e | { format_args!("the light client tracking chain {} is frozen", e.chain_id) },

        MismatchedChainId
            {
                expected: ChainId,
                actual: ChainId,
            }
            | e | {
                format_args!("header chain id {} does not match the client chain id {}",
                    e.actual, e.expected)
            },

        NonIncreasingHeight
            {
                trusted_height: Height,
                header_height: Height,
            }
            | e | {
                format_args!("header height {} must be greater than the trusted height {}",
                    e.header_height, e.trusted_height)
            },

        NonIncreasingTimestamp
            {
                trusted_timestamp: Timestamp,
                header_timestamp: Timestamp,
            }
            | e | {
                format_args!("header timestamp {} must be greater than the trusted timestamp {}",
                    e.header_timestamp, e.trusted_timestamp)
            },

        ValidatorSetMismatch
            { height: Height }
            | e | {
                format_args!("header at height {} is not signed by the trusted validator set",
                    e.height)
            },
    }
}
