use core::fmt::{Display, Error as FmtError, Formatter};

use ibc_relay_types::core::ics04_channel::packet::Sequence;
use ibc_relay_types::events::IbcEvent;

use crate::link::error::LinkError;
use crate::util::pretty::PrettySlice;

/// What one pass of a relay path achieved.
#[derive(Debug, Default)]
pub struct RelaySummary {
    pub delivered: Vec<Sequence>,
    pub acknowledged: Vec<Sequence>,
    pub timed_out: Vec<Sequence>,
    /// Sequences another relayer handled first.
    pub duplicates: Vec<Sequence>,
    /// Sequences whose relay failed in this pass, with the reason.
    pub failed: Vec<(Sequence, LinkError)>,
    pub events: Vec<IbcEvent>,
}

impl RelaySummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
            && self.acknowledged.is_empty()
            && self.timed_out.is_empty()
            && self.duplicates.is_empty()
            && self.failed.is_empty()
    }

    pub fn extend(&mut self, other: RelaySummary) {
        self.delivered.extend(other.delivered);
        self.acknowledged.extend(other.acknowledged);
        self.timed_out.extend(other.timed_out);
        self.duplicates.extend(other.duplicates);
        self.failed.extend(other.failed);
        self.events.extend(other.events);
    }
}

impl Display for RelaySummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let failed = self.failed.iter().map(|(s, _)| *s).collect::<Vec<_>>();

        write!(
            f,
            "RelaySummary {{ delivered: {}, acknowledged: {}, timed_out: {}, duplicates: {}, failed: {} }}",
            PrettySlice(&self.delivered),
            PrettySlice(&self.acknowledged),
            PrettySlice(&self.timed_out),
            PrettySlice(&self.duplicates),
            PrettySlice(&failed),
        )
    }
}
