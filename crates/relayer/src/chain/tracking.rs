use core::fmt;

use uuid::Uuid;

use ibc_relay_types::core::ics26_routing::msgs::MsgEnvelope;

#[derive(Copy, Clone, Debug)]
pub enum TrackingId {
    Uuid(Uuid),
    Static(&'static str),
}

impl TrackingId {
    pub fn uuid() -> Self {
        Self::Uuid(Uuid::new_v4())
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingId::Uuid(u) => u.fmt(f),
            TrackingId::Static(s) => s.fmt(f),
        }
    }
}

/// A batch of messages submitted in one transaction, together with an
/// identifier that ties the resulting events back to the operation that
/// built the batch.
#[derive(Debug, Clone)]
pub struct TrackedMsgs {
    pub msgs: Vec<MsgEnvelope>,
    pub tracking_id: TrackingId,
}

impl TrackedMsgs {
    pub fn new(msgs: Vec<MsgEnvelope>, tracking_id: TrackingId) -> Self {
        Self { msgs, tracking_id }
    }

    pub fn new_static(msgs: Vec<MsgEnvelope>, tracking_id: &'static str) -> Self {
        Self {
            msgs,
            tracking_id: TrackingId::Static(tracking_id),
        }
    }

    pub fn new_uuid(msgs: Vec<MsgEnvelope>) -> Self {
        Self {
            msgs,
            tracking_id: TrackingId::uuid(),
        }
    }

    pub fn new_single(msg: MsgEnvelope, tracking_id: &'static str) -> Self {
        Self {
            msgs: vec![msg],
            tracking_id: TrackingId::Static(tracking_id),
        }
    }

    pub fn messages(&self) -> &Vec<MsgEnvelope> {
        &self.msgs
    }

    pub fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }
}
