use core::num::ParseIntError;

use flex_error::{define_error, TraceError};

define_error! {
    Error {
        InvalidCoin
            { coin: String }
            | e | { format_args!("invalid coin string: {}", e.coin) },

        InvalidPacketData
            [ TraceError<serde_json::Error> ]
            | _ | { "cannot unmarshal ICS-20 transfer packet data" },

        ZeroAmount
            | _ | { "transfer amount cannot be zero" },

        InvalidAmount
            { amount: String }
            [ TraceError<ParseIntError> ]
            | e | { format_args!("invalid amount: {}", e.amount) },
    }
}
