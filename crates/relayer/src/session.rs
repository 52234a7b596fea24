//! A relay session: both directions of one established path, run once or
//! as background workers.

use core::mem;
use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error_span, info};

use crate::chain::handle::ChainHandle;
use crate::link::error::LinkError;
use crate::link::{Link, PacketLedger, RelayPath, RelaySummary};
use crate::observer::RelayObserver;
use crate::registry::PathRecord;
use crate::util::task::{spawn_background_task, Next, TaskError, TaskHandle};

/// A cooperative cancellation signal, shared by every clone.
///
/// Relay paths check it before each blocking call. A submission already in
/// flight completes, the steps after it are skipped.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn handle_link_error_in_task(e: LinkError) -> TaskError<LinkError> {
    if e.is_connectivity() {
        TaskError::Ignore(e)
    } else {
        TaskError::Fatal(e)
    }
}

/// The relay state of one path between two chains.
pub struct RelaySession<ChainA: ChainHandle, ChainB: ChainHandle> {
    record: PathRecord,
    link: Arc<Link<ChainA, ChainB>>,
    cancel: CancellationToken,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> RelaySession<ChainA, ChainB> {
    /// Starts a session on the path described by `record`, after checking
    /// that its channel is established on both chains.
    pub fn new(
        a_chain: ChainA,
        b_chain: ChainB,
        record: PathRecord,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Self, LinkError> {
        let cancel = CancellationToken::new();
        let link = Link::new_from_path(a_chain, b_chain, &record, cancel.clone(), observer)?;

        Ok(Self {
            record,
            link: Arc::new(link),
            cancel,
        })
    }

    pub fn record(&self) -> &PathRecord {
        &self.record
    }

    pub fn a_to_b(&self) -> &RelayPath<ChainA, ChainB> {
        &self.link.a_to_b
    }

    pub fn b_to_a(&self) -> &RelayPath<ChainB, ChainA> {
        &self.link.b_to_a
    }

    /// Snapshots of the ledgers of the `a` to `b` and `b` to `a` directions.
    pub fn ledgers(&self) -> (PacketLedger, PacketLedger) {
        (self.link.a_to_b.ledger(), self.link.b_to_a.ledger())
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Relays both directions once. Failures of single packets are part of
    /// the summary, a connectivity failure aborts the pass.
    pub fn relay_once(&self) -> Result<RelaySummary, LinkError> {
        self.link.relay_once()
    }

    /// Spawns one worker per direction, each relaying every `poll_interval`.
    ///
    /// A worker stops on a protocol error and keeps polling through
    /// connectivity errors.
    pub fn spawn(&self, poll_interval: Duration) -> SessionHandle {
        let a_to_b = {
            let link = self.link.clone();
            let path = &link.a_to_b;

            let span = error_span!(
                "worker.packet",
                src_chain = %path.src_chain().id(),
                src_port = %path.src_port_id(),
                src_channel = %path.src_channel_id(),
                dst_chain = %path.dst_chain().id(),
            );

            spawn_background_task(span, Some(poll_interval), move || {
                link.a_to_b
                    .relay_once()
                    .map_err(handle_link_error_in_task)?;
                Ok(Next::Continue)
            })
        };

        let b_to_a = {
            let link = self.link.clone();
            let path = &link.b_to_a;

            let span = error_span!(
                "worker.packet",
                src_chain = %path.src_chain().id(),
                src_port = %path.src_port_id(),
                src_channel = %path.src_channel_id(),
                dst_chain = %path.dst_chain().id(),
            );

            spawn_background_task(span, Some(poll_interval), move || {
                link.b_to_a
                    .relay_once()
                    .map_err(handle_link_error_in_task)?;
                Ok(Next::Continue)
            })
        };

        info!(path = %self.record, "relay workers started");

        SessionHandle {
            cancel: self.cancel.clone(),
            tasks: vec![a_to_b, b_to_a],
        }
    }
}

/// Controls the workers of a session. Dropping it cancels the session and
/// waits for the workers.
pub struct SessionHandle {
    cancel: CancellationToken,
    tasks: Vec<TaskHandle>,
}

impl SessionHandle {
    /// Cancels the session and signals the workers, without waiting.
    pub fn shutdown(&self) {
        self.cancel.cancel();

        for task in &self.tasks {
            task.shutdown();
        }
    }

    /// Waits for both workers to stop.
    pub fn join(mut self) {
        for task in mem::take(&mut self.tasks) {
            task.join();
        }
    }

    pub fn shutdown_and_wait(self) {
        self.shutdown();
        self.join();
    }

    /// Whether every worker stopped, after a shutdown or a fatal error.
    pub fn is_stopped(&self) -> bool {
        self.tasks.iter().all(TaskHandle::is_stopped)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ibc_relay_types::core::ics24_host::identifier::ChainId;
    use test_log::test;

    #[test]
    fn cancellation_is_shared_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn protocol_errors_stop_the_worker() {
        let connectivity = LinkError::query(
            ChainId::from_string("ibc-0"),
            crate::error::Error::connectivity(
                ChainId::from_string("ibc-0"),
                "http://127.0.0.1:26657".to_string(),
                "connection refused".to_string(),
            ),
        );
        assert!(matches!(
            handle_link_error_in_task(connectivity),
            TaskError::Ignore(_)
        ));

        let protocol = LinkError::missing_event("packet-recv".to_string());
        assert!(matches!(
            handle_link_error_in_task(protocol),
            TaskError::Fatal(_)
        ));
    }
}
