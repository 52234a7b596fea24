use core::fmt::{Display, Error as FmtError, Formatter};

use serde::Serialize;

use ibc_relay_types::core::ics02_client::events::CreateClient;
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, ClientId, ConnectionId};
use ibc_relay_types::events::IbcEvent;
use ibc_relay_types::Height;

/// An [`IbcEvent`] together with the height of the block that emitted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IbcEventWithHeight {
    pub event: IbcEvent,
    pub height: Height,
}

impl IbcEventWithHeight {
    pub fn new(event: IbcEvent, height: Height) -> Self {
        Self { event, height }
    }

    pub fn with_height(self, height: Height) -> Self {
        Self {
            event: self.event,
            height,
        }
    }
}

impl Display for IbcEventWithHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{} at height {}", self.event, self.height)
    }
}

pub fn extract_client_id(event: &IbcEvent) -> Option<&ClientId> {
    match event {
        IbcEvent::CreateClient(CreateClient(attributes)) => Some(&attributes.client_id),
        IbcEvent::UpdateClient(ev) => Some(ev.client_id()),
        _ => None,
    }
}

pub fn extract_connection_id(event: &IbcEvent) -> Option<&ConnectionId> {
    event
        .connection_attributes()
        .and_then(|attributes| attributes.connection_id.as_ref())
}

pub fn extract_channel_id(event: &IbcEvent) -> Option<&ChannelId> {
    event
        .channel_attributes()
        .and_then(|attributes| attributes.channel_id.as_ref())
}
