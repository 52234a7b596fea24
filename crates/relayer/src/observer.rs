//! Progress notifications emitted by the engine.
//!
//! The engine reports what it does through a [`RelayObserver`], which keeps
//! the handshake and relay logic free of any presentation concern.

use core::fmt::{Display, Error as FmtError, Formatter};

use tracing::{debug, info};

use ibc_relay_types::applications::transfer::coin::{display_coins, Coin};
use ibc_relay_types::core::ics04_channel::acknowledgement::Acknowledgement;
use ibc_relay_types::core::ics04_channel::packet::Packet;
use ibc_relay_types::core::ics24_host::identifier::ChainId;

use crate::link::RelaySummary;

/// A milestone of the handshake that resolves a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeStep {
    /// A complete path was found in the registry and reused.
    PathReused,
    ClientsCreated,
    ConnectionOpen,
    ChannelOpen,
    /// The path identifiers were written to the registry.
    PathSaved,
}

impl Display for HandshakeStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            HandshakeStep::PathReused => write!(f, "path reused"),
            HandshakeStep::ClientsCreated => write!(f, "clients created"),
            HandshakeStep::ConnectionOpen => write!(f, "connection open"),
            HandshakeStep::ChannelOpen => write!(f, "channel open"),
            HandshakeStep::PathSaved => write!(f, "path saved"),
        }
    }
}

/// The outcome of a funding attempt. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaucetOutcome {
    Funded { chain_id: ChainId, coins: Vec<Coin> },
    Skipped { chain_id: ChainId, reason: String },
    Failed { chain_id: ChainId, reason: String },
}

impl FaucetOutcome {
    pub fn chain_id(&self) -> &ChainId {
        match self {
            FaucetOutcome::Funded { chain_id, .. }
            | FaucetOutcome::Skipped { chain_id, .. }
            | FaucetOutcome::Failed { chain_id, .. } => chain_id,
        }
    }

    pub fn is_funded(&self) -> bool {
        matches!(self, FaucetOutcome::Funded { .. })
    }
}

impl Display for FaucetOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            FaucetOutcome::Funded { chain_id, coins } => {
                write!(f, "funded account on {chain_id}: {}", display_coins(coins))
            }
            FaucetOutcome::Skipped { chain_id, reason } => {
                write!(f, "skipped funding on {chain_id}: {reason}")
            }
            FaucetOutcome::Failed { chain_id, reason } => {
                write!(f, "failed to fund account on {chain_id}: {reason}")
            }
        }
    }
}

/// Receives notifications from the handshake, the relay paths and the faucet.
///
/// Every method has an empty default, so implementors only pick the
/// notifications they care about. Notifications may come from several
/// threads at once.
pub trait RelayObserver: Send + Sync {
    fn on_handshake_step(&self, _path_id: &str, _step: &HandshakeStep) {}

    fn on_packet_delivered(&self, _packet: &Packet) {}

    fn on_packet_acknowledged(&self, _packet: &Packet, _ack: &Acknowledgement) {}

    fn on_packet_timed_out(&self, _packet: &Packet) {}

    /// The packet was already handled by another relayer.
    fn on_duplicate_relay(&self, _packet: &Packet) {}

    fn on_relay_summary(&self, _summary: &RelaySummary) {}

    fn on_faucet_outcome(&self, _outcome: &FaucetOutcome) {}
}

/// Discards every notification.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopObserver;

impl RelayObserver for NoopObserver {}

/// Logs every notification through `tracing`.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_handshake_step(&self, path_id: &str, step: &HandshakeStep) {
        info!(path = %path_id, "{}", step);
    }

    fn on_packet_delivered(&self, packet: &Packet) {
        debug!(
            sequence = %packet.sequence,
            src_channel = %packet.source_channel,
            dst_channel = %packet.destination_channel,
            "packet delivered"
        );
    }

    fn on_packet_acknowledged(&self, packet: &Packet, ack: &Acknowledgement) {
        debug!(sequence = %packet.sequence, %ack, "packet acknowledged");
    }

    fn on_packet_timed_out(&self, packet: &Packet) {
        info!(sequence = %packet.sequence, "packet timed out");
    }

    fn on_duplicate_relay(&self, packet: &Packet) {
        debug!(sequence = %packet.sequence, "packet already relayed, skipping");
    }

    fn on_relay_summary(&self, summary: &RelaySummary) {
        if !summary.is_empty() {
            info!("{}", summary);
        }
    }

    fn on_faucet_outcome(&self, outcome: &FaucetOutcome) {
        info!("{}", outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn faucet_outcome_rendering() {
        let chain_id = ChainId::from_string("ibc-0");

        let funded = FaucetOutcome::Funded {
            chain_id: chain_id.clone(),
            coins: vec![Coin::new(100, "token"), Coin::new(5, "stake")],
        };
        assert_eq!(funded.to_string(), "funded account on ibc-0: 100token, 5stake");
        assert!(funded.is_funded());

        let empty = FaucetOutcome::Funded {
            chain_id: chain_id.clone(),
            coins: vec![],
        };
        assert_eq!(empty.to_string(), "funded account on ibc-0: -");

        let failed = FaucetOutcome::Failed {
            chain_id,
            reason: "connection refused".to_string(),
        };
        assert!(!failed.is_funded());
        assert_eq!(failed.chain_id().as_str(), "ibc-0");
    }
}
