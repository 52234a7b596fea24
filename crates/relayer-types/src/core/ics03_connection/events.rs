//! Types for the IBC events emitted by the connection module.

use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics24_host::identifier::{ClientId, ConnectionId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub connection_id: Option<ConnectionId>,
    pub client_id: ClientId,
    pub counterparty_connection_id: Option<ConnectionId>,
    pub counterparty_client_id: ClientId,
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match (&self.connection_id, &self.counterparty_connection_id) {
            (Some(connection_id), Some(counterparty_connection_id)) => write!(
                f,
                "Attributes {{ connection_id: {}, client_id: {}, counterparty_connection_id: {}, counterparty_client_id: {} }}",
                connection_id, self.client_id, counterparty_connection_id, self.counterparty_client_id
            ),
            (Some(connection_id), None) => write!(
                f,
                "Attributes {{ connection_id: {}, client_id: {}, counterparty_connection_id: None, counterparty_client_id: {} }}",
                connection_id, self.client_id, self.counterparty_client_id
            ),
            (None, Some(counterparty_connection_id)) => write!(
                f,
                "Attributes {{ connection_id: None, client_id: {}, counterparty_connection_id: {}, counterparty_client_id: {} }}",
                self.client_id, counterparty_connection_id, self.counterparty_client_id
            ),
            (None, None) => write!(
                f,
                "Attributes {{ connection_id: None, client_id: {}, counterparty_connection_id: None, counterparty_client_id: {} }}",
                self.client_id, self.counterparty_client_id
            ),
        }
    }
}

macro_rules! connection_event {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name(pub Attributes);

        impl $name {
            pub fn attributes(&self) -> &Attributes {
                &self.0
            }

            pub fn connection_id(&self) -> Option<&ConnectionId> {
                self.0.connection_id.as_ref()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
                write!(f, "{}", self.0)
            }
        }
    };
}

connection_event!(OpenInit);
connection_event!(OpenTry);
connection_event!(OpenAck);
connection_event!(OpenConfirm);
