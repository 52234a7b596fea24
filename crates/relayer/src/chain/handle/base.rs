use core::fmt::{Debug, Display, Error as FmtError, Formatter};
use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crossbeam_channel as channel;
use tracing::{debug, Span};

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::ChannelEnd;
use ibc_relay_types::core::ics04_channel::packet::{PacketMsgType, Sequence};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ChannelId, ConnectionId, PortId};
use ibc_relay_types::proofs::Proofs;
use ibc_relay_types::signer::Signer;
use ibc_relay_types::Height;

use crate::chain::endpoint::ChainStatus;
use crate::chain::requests::*;
use crate::chain::tracking::TrackedMsgs;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::event::IbcEventWithHeight;
use crate::util::mutex::MutexUtil;
use crate::util::retry::{retry_with_index, ExponentialGrowth, RetryResult};

use super::{reply_channel, ChainHandle, ChainRequest, ReplyTo};

/// Exponential backoff applied to requests that fail for connectivity reasons.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Backoff {
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialGrowth::new(self.initial, self.factor)
            .clamp(self.max_delay, self.max_retries)
            .iter()
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            factor: 2,
            max_delay: Duration::from_secs(5),
            max_retries: 5,
        }
    }
}

type AccountKey = (ChainId, String);

/// Submission locks, one per signing account, owned by the connector serving the chains.
#[derive(Clone, Debug, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<AccountKey, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding submissions signed by `account` on `chain_id`.
    pub fn lock_for(&self, chain_id: &ChainId, account: &str) -> Arc<Mutex<()>> {
        self.locks
            .acquire_mutex()
            .entry((chain_id.clone(), account.to_string()))
            .or_default()
            .clone()
    }
}

/// A basic chain handle implementation.
///
/// Clones share the latest height observed on the chain, so that no clone
/// ever acts on a state older than what another clone already saw.
#[derive(Debug, Clone)]
pub struct BaseChainHandle {
    /// Chain identifier
    chain_id: ChainId,

    /// Serializes the transactions signed by this handle's account
    submission_lock: Arc<Mutex<()>>,

    backoff: Backoff,

    /// Highest height observed on this chain, across all clones
    latest_seen: Arc<Mutex<Option<Height>>>,

    /// The handle's channel for sending requests to the runtime
    runtime_sender: channel::Sender<(Span, ChainRequest)>,
}

impl BaseChainHandle {
    pub fn new(
        chain_id: ChainId,
        submission_lock: Arc<Mutex<()>>,
        backoff: Backoff,
        sender: channel::Sender<(Span, ChainRequest)>,
    ) -> Self {
        Self {
            chain_id,
            submission_lock,
            backoff,
            latest_seen: Arc::new(Mutex::new(None)),
            runtime_sender: sender,
        }
    }

    fn send<F, O>(&self, f: F) -> Result<O, Error>
    where
        F: FnOnce(ReplyTo<O>) -> ChainRequest,
        O: Debug,
    {
        let (sender, receiver) = reply_channel();

        let span = Span::current();
        let input = f(sender);

        self.runtime_sender
            .send((span, input))
            .map_err(Error::send)?;

        receiver.recv().map_err(Error::channel_receive)?
    }

    /// Runs `op` until it succeeds or fails with a non-connectivity error,
    /// sleeping between attempts according to the handle's backoff.
    fn with_retry<O>(&self, mut op: impl FnMut() -> Result<O, Error>) -> Result<O, Error> {
        retry_with_index(self.backoff.delays(), |index| match op() {
            Ok(output) => RetryResult::Ok(output),
            Err(e) if e.is_connectivity() => {
                debug!(chain = %self.chain_id, attempt = index, "retrying request: {e}");
                RetryResult::Retry(e)
            }
            Err(e) => RetryResult::Err(e),
        })
        .map_err(|e| {
            if e.error.is_connectivity() {
                Error::connectivity_exhausted(
                    self.chain_id.clone(),
                    e.tries,
                    e.total_delay,
                    e.error.to_string(),
                )
            } else {
                e.error
            }
        })
    }

    fn latest_seen(&self) -> Option<Height> {
        *self.latest_seen.acquire_mutex()
    }

    /// Records `height` as observed, or rejects it when it lies below an
    /// already observed height.
    fn observe(&self, height: Height) -> Result<(), Error> {
        let mut latest_seen = self.latest_seen.acquire_mutex();

        match *latest_seen {
            Some(seen) if height < seen => Err(Error::stale_query_height(
                self.chain_id.clone(),
                height,
                seen,
            )),
            Some(seen) if height == seen => Ok(()),
            _ => {
                *latest_seen = Some(height);
                Ok(())
            }
        }
    }

    /// Raises the observed height to `height` if it is higher.
    /// Inclusion heights of committed transactions go through here and are never rejected.
    fn advance(&self, height: Height) {
        let mut latest_seen = self.latest_seen.acquire_mutex();

        if latest_seen.map_or(true, |seen| height > seen) {
            *latest_seen = Some(height);
        }
    }

    /// Pins a query for the latest height to the latest observed height.
    fn resolve(&self, height: QueryHeight) -> Result<QueryHeight, Error> {
        match height {
            QueryHeight::Latest => Ok(QueryHeight::Specific(self.query_latest_height()?)),
            specific => Ok(specific),
        }
    }
}

impl Display for BaseChainHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "BaseChainHandle {{ chain_id: {} }}", self.chain_id)
    }
}

impl ChainHandle for BaseChainHandle {
    fn new(
        chain_id: ChainId,
        submission_lock: Arc<Mutex<()>>,
        backoff: Backoff,
        sender: channel::Sender<(Span, ChainRequest)>,
    ) -> Self {
        Self::new(chain_id, submission_lock, backoff, sender)
    }

    fn id(&self) -> ChainId {
        self.chain_id.clone()
    }

    fn shutdown(&self) -> Result<(), Error> {
        self.send(|reply_to| ChainRequest::Shutdown { reply_to })
    }

    fn send_messages_and_wait_commit(
        &self,
        tracked_msgs: TrackedMsgs,
    ) -> Result<Vec<IbcEventWithHeight>, Error> {
        let _guard = self.submission_lock.acquire_mutex();

        let events = self.with_retry(|| {
            self.send(|reply_to| ChainRequest::SendMessagesAndWaitCommit {
                tracked_msgs: tracked_msgs.clone(),
                reply_to,
            })
        })?;

        if let Some(height) = events.iter().map(|ev| ev.height).max() {
            self.advance(height);
        }

        Ok(events)
    }

    fn get_signer(&self) -> Result<Signer, Error> {
        self.send(|reply_to| ChainRequest::Signer { reply_to })
    }

    fn config(&self) -> Result<ChainConfig, Error> {
        self.send(|reply_to| ChainRequest::Config { reply_to })
    }

    fn query_application_status(&self) -> Result<ChainStatus, Error> {
        self.with_retry(|| {
            let status = self.send(|reply_to| ChainRequest::QueryApplicationStatus { reply_to })?;
            self.observe(status.height)?;
            Ok(status)
        })
    }

    fn query_balance(&self, address: Option<Signer>) -> Result<Vec<Coin>, Error> {
        let address = match address {
            Some(address) => address,
            None => self.get_signer()?,
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryBalance {
                address: address.clone(),
                reply_to,
            })
        })
    }

    fn build_header(
        &self,
        trusted_height: Height,
        target_height: Height,
    ) -> Result<Header, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::BuildHeader {
                trusted_height,
                target_height,
                reply_to,
            })
        })
    }

    fn build_client_state(&self, height: Height) -> Result<ClientState, Error> {
        self.with_retry(|| self.send(|reply_to| ChainRequest::BuildClientState { height, reply_to }))
    }

    fn build_consensus_state(&self, height: Height) -> Result<ConsensusState, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::BuildConsensusState { height, reply_to })
        })
    }

    fn build_connection_proofs(
        &self,
        connection_id: &ConnectionId,
        height: Height,
    ) -> Result<Proofs, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::BuildConnectionProofs {
                connection_id: connection_id.clone(),
                height,
                reply_to,
            })
        })
    }

    fn build_channel_proofs(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        height: Height,
    ) -> Result<Proofs, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::BuildChannelProofs {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                height,
                reply_to,
            })
        })
    }

    fn build_packet_proofs(
        &self,
        packet_type: PacketMsgType,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
        height: Height,
    ) -> Result<(Vec<u8>, Proofs), Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::BuildPacketProofs {
                packet_type,
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                sequence,
                height,
                reply_to,
            })
        })
    }

    fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ClientState, Option<CommitmentProofBytes>), Error> {
        let request = QueryClientStateRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryClientState {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConsensusState, Option<CommitmentProofBytes>), Error> {
        let request = QueryConsensusStateRequest {
            query_height: self.resolve(request.query_height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryConsensusState {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
    ) -> Result<Vec<Height>, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryConsensusStateHeights {
                request: request.clone(),
                reply_to,
            })
        })
    }

    fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConnectionEnd, Option<CommitmentProofBytes>), Error> {
        let request = QueryConnectionRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryConnection {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
    ) -> Result<(ChannelEnd, Option<CommitmentProofBytes>), Error> {
        let request = QueryChannelRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryChannel {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let request = QueryPacketCommitmentRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryPacketCommitment {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
    ) -> Result<(Vec<Sequence>, Height), Error> {
        let request = QueryPacketCommitmentsRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryPacketCommitments {
                request: request.clone(),
                reply_to,
            })
        })
    }

    fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let request = QueryPacketReceiptRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryPacketReceipt {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
    ) -> Result<Vec<Sequence>, Error> {
        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryUnreceivedPackets {
                request: request.clone(),
                reply_to,
            })
        })
    }

    fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let request = QueryPacketAcknowledgementRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryPacketAcknowledgement {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
    ) -> Result<(Sequence, Option<CommitmentProofBytes>), Error> {
        let request = QueryNextSequenceReceiveRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryNextSequenceReceive {
                request: request.clone(),
                include_proof,
                reply_to,
            })
        })
    }

    fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
    ) -> Result<Vec<IbcEventWithHeight>, Error> {
        let request = QueryPacketEventDataRequest {
            height: self.resolve(request.height)?,
            ..request
        };

        self.with_retry(|| {
            self.send(|reply_to| ChainRequest::QueryPacketEventData {
                request: request.clone(),
                reply_to,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn default_backoff_delays() {
        let delays = Backoff::default().delays().collect::<Vec<_>>();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1600),
                Duration::from_millis(3200),
            ]
        );
    }

    #[test]
    fn observed_height_never_decreases() {
        let (sender, _receiver) = channel::unbounded();
        let handle = BaseChainHandle::new(
            ChainId::from_string("ibc-0"),
            Arc::new(Mutex::new(())),
            Backoff::default(),
            sender,
        );
        let clone = handle.clone();

        let h = |n| Height::new(0, n).unwrap();

        handle.observe(h(10)).unwrap();
        assert_eq!(clone.latest_seen(), Some(h(10)));

        let err = clone.observe(h(7)).unwrap_err();
        assert!(err.is_connectivity());

        clone.observe(h(12)).unwrap();
        assert_eq!(handle.latest_seen(), Some(h(12)));
    }

    #[test]
    fn account_locks_are_shared_per_account() {
        let chain_id = ChainId::from_string("ibc-0");
        let locks = AccountLocks::new();

        let a = locks.lock_for(&chain_id, "relayer");
        let b = locks.clone().lock_for(&chain_id, "relayer");
        let c = locks.lock_for(&chain_id, "other");
        let d = AccountLocks::new().lock_for(&chain_id, "relayer");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(!Arc::ptr_eq(&a, &d));
    }

    #[test]
    fn committed_heights_advance_without_rejection() {
        let (sender, _receiver) = channel::unbounded();
        let handle = BaseChainHandle::new(
            ChainId::from_string("ibc-0"),
            AccountLocks::new().lock_for(&ChainId::from_string("ibc-0"), "relayer"),
            Backoff::default(),
            sender,
        );

        let h = |n| Height::new(0, n).unwrap();

        handle.observe(h(10)).unwrap();

        handle.advance(h(8));
        assert_eq!(handle.latest_seen(), Some(h(10)));

        handle.advance(h(11));
        assert_eq!(handle.latest_seen(), Some(h(11)));
    }
}
