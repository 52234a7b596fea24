use flex_error::{define_error, TraceError};

use crate::core::ics04_channel::packet::Sequence;
use crate::core::ics24_host::error::ValidationError;

define_error! {
    Error {
        UnknownState
            { state: i32 }
            | e | { format_args!("channel state unknown: {}", e.state) },

        Identifier
            [ ValidationError ]
            | _ | { "identifier error" },

        UnknownOrderType
            { type_id: String }
            | e | { format_args!("channel order type unknown: {}", e.type_id) },

        InvalidVersion
            | _ | { "invalid version" },

        ZeroPacketSequence
            | _ | { "packet sequence cannot be 0" },

        ZeroPacketData
            | _ | { "packet data bytes cannot be empty" },

        InvalidAcknowledgement
            [ TraceError<serde_json::Error> ]
            | _ | { "invalid acknowledgement encoding" },

        EmptyAcknowledgement
            | _ | { "acknowledgement cannot be empty" },

        InvalidPacketSequence
            {
                given_sequence: Sequence,
                next_sequence: Sequence
            }
            | e | {
                format_args!(
                    "invalid packet sequence {0} ≠ next send sequence {1}",
                    e.given_sequence, e.next_sequence)
            },
    }
}
