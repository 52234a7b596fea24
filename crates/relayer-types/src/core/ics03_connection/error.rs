use flex_error::define_error;

use crate::core::ics03_connection::version::Version;
use crate::core::ics24_host::error::ValidationError;

define_error! {
    Error {
        InvalidState
            { state: i32 }
            | e | { format_args!("connection state is unknown: {}", e.state) },

        InvalidIdentifier
            [ ValidationError ]
            | _ | { "identifier error" },

        EmptyVersions
            | _ | { "empty supported versions" },

        EmptyFeatures
            | _ | { "empty supported features" },

        NoCommonVersion
            | _ | { "no common version" },

        VersionNotSupported
            { version: Version }
            | e | { format_args!("version \"{}\" not supported", e.version) },
    }
}
