//! Lifecycle of the packets relayed in one direction of a channel.

use core::fmt::{Display, Error as FmtError, Formatter};
use std::collections::BTreeMap;

use serde::Serialize;

use ibc_relay_types::core::ics04_channel::packet::Sequence;

use crate::link::error::LinkError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PacketState {
    /// The source holds a commitment for the packet.
    Committed,
    /// The destination received the packet, the acknowledgement is on its way back.
    Delivered,
    Acknowledged,
    TimedOut,
}

impl PacketState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PacketState::Acknowledged | PacketState::TimedOut)
    }
}

impl Display for PacketState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            PacketState::Committed => write!(f, "committed"),
            PacketState::Delivered => write!(f, "delivered"),
            PacketState::Acknowledged => write!(f, "acknowledged"),
            PacketState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Per-sequence state of the packets seen by a relay path.
///
/// Terminal states are final: a sequence that was acknowledged or timed out
/// never changes state again.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PacketLedger {
    entries: BTreeMap<Sequence, PacketState>,
}

impl PacketLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, sequence: Sequence) -> Option<PacketState> {
        self.entries.get(&sequence).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sequence, PacketState)> + '_ {
        self.entries.iter().map(|(sequence, state)| (*sequence, *state))
    }

    /// Sequences currently in the given state, in ascending order.
    pub fn sequences_in(&self, state: PacketState) -> Vec<Sequence> {
        self.iter()
            .filter(|(_, s)| *s == state)
            .map(|(sequence, _)| sequence)
            .collect()
    }

    /// Records sequences found committed on the source. Known sequences keep
    /// their state.
    pub fn observe_committed(&mut self, sequences: &[Sequence]) {
        for sequence in sequences {
            self.entries
                .entry(*sequence)
                .or_insert(PacketState::Committed);
        }
    }

    pub fn mark_delivered(&mut self, sequence: Sequence) -> Result<(), LinkError> {
        self.transition(sequence, PacketState::Delivered, |from| {
            matches!(from, PacketState::Committed | PacketState::Delivered)
        })
    }

    pub fn mark_acknowledged(&mut self, sequence: Sequence) -> Result<(), LinkError> {
        self.transition(sequence, PacketState::Acknowledged, |from| {
            matches!(from, PacketState::Committed | PacketState::Delivered)
        })
    }

    /// A delivered packet can no longer time out.
    pub fn mark_timed_out(&mut self, sequence: Sequence) -> Result<(), LinkError> {
        self.transition(sequence, PacketState::TimedOut, |from| {
            from == PacketState::Committed
        })
    }

    fn transition(
        &mut self,
        sequence: Sequence,
        to: PacketState,
        allowed_from: impl Fn(PacketState) -> bool,
    ) -> Result<(), LinkError> {
        let from = self
            .entries
            .get(&sequence)
            .copied()
            .unwrap_or(PacketState::Committed);

        if !allowed_from(from) {
            return Err(LinkError::ledger_transition(sequence, from, to));
        }

        self.entries.insert(sequence, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn seq(n: u64) -> Sequence {
        Sequence::from(n)
    }

    #[test]
    fn acknowledged_lifecycle() {
        let mut ledger = PacketLedger::new();
        ledger.observe_committed(&[seq(1), seq(2)]);

        ledger.mark_delivered(seq(1)).unwrap();
        ledger.mark_delivered(seq(1)).unwrap();
        ledger.mark_acknowledged(seq(1)).unwrap();

        assert_eq!(ledger.state(seq(1)), Some(PacketState::Acknowledged));
        assert_eq!(ledger.state(seq(2)), Some(PacketState::Committed));
        assert_eq!(ledger.sequences_in(PacketState::Committed), vec![seq(2)]);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut ledger = PacketLedger::new();
        ledger.observe_committed(&[seq(1), seq(2)]);

        ledger.mark_timed_out(seq(1)).unwrap();
        assert!(ledger.mark_acknowledged(seq(1)).is_err());
        assert!(ledger.mark_delivered(seq(1)).is_err());
        assert!(ledger.mark_timed_out(seq(1)).is_err());

        ledger.mark_acknowledged(seq(2)).unwrap();
        assert!(ledger.mark_timed_out(seq(2)).is_err());

        // observing a terminal sequence again keeps its state
        ledger.observe_committed(&[seq(1), seq(2)]);
        assert_eq!(ledger.state(seq(1)), Some(PacketState::TimedOut));
        assert_eq!(ledger.state(seq(2)), Some(PacketState::Acknowledged));
    }

    #[test]
    fn delivered_packet_cannot_time_out() {
        let mut ledger = PacketLedger::new();
        ledger.mark_delivered(seq(3)).unwrap();

        let err = ledger.mark_timed_out(seq(3)).unwrap_err();
        assert!(err.to_string().contains("cannot move from delivered to timed out"));
    }
}
