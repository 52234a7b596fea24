//! Message definitions for the connection handshake datagrams.
//!
//! We define each of the four messages in the connection handshake protocol:
//! `MsgConnectionOpenInit` starts the handshake on the first chain,
//! `MsgConnectionOpenTry` answers it on the counterparty with a proof of the
//! `INIT` end, `MsgConnectionOpenAck` opens the first end with a proof of the
//! `TRYOPEN` end, and `MsgConnectionOpenConfirm` opens the counterparty end
//! with a proof of the now `OPEN` end.

use core::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::core::ics03_connection::connection::Counterparty;
use crate::core::ics03_connection::version::Version;
use crate::core::ics24_host::identifier::{ClientId, ConnectionId};
use crate::proofs::Proofs;
use crate::signer::Signer;

/// Per our convention, this message is sent to chain A.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgConnectionOpenInit {
    pub client_id: ClientId,
    pub counterparty: Counterparty,
    pub version: Option<Version>,
    pub delay_period: Duration,
    pub signer: Signer,
}

/// Per our convention, this message is sent to chain B.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgConnectionOpenTry {
    pub client_id: ClientId,
    pub counterparty: Counterparty,
    pub counterparty_versions: Vec<Version>,
    pub proofs: Proofs,
    pub delay_period: Duration,
    pub signer: Signer,
}

/// Per our convention, this message is sent to chain A.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgConnectionOpenAck {
    pub connection_id: ConnectionId,
    pub counterparty_connection_id: ConnectionId,
    pub version: Version,
    pub proofs: Proofs,
    pub signer: Signer,
}

/// Per our convention, this message is sent to chain B.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgConnectionOpenConfirm {
    pub connection_id: ConnectionId,
    pub proofs: Proofs,
    pub signer: Signer,
}
