use core::fmt::{Display, Error as FmtError, Formatter};
use core::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use ibc_relay_types::core::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
use ibc_relay_types::core::ics03_connection::msgs::{
    MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit, MsgConnectionOpenTry,
};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentPrefix;
use ibc_relay_types::core::ics24_host::identifier::{ClientId, ConnectionId};
use ibc_relay_types::core::ics26_routing::msgs::{ConnectionMsg, MsgEnvelope};
use ibc_relay_types::events::IbcEvent;
use ibc_relay_types::Height;

use crate::chain::handle::ChainHandle;
use crate::chain::requests::{IncludeProof, QueryConnectionRequest, QueryHeight};
use crate::chain::tracking::TrackedMsgs;
use crate::error::Error as RelayerError;
use crate::event::IbcEventWithHeight;
use crate::foreign_client::ForeignClient;
use crate::util::pretty::{PrettyDuration, PrettyOption};

mod error;
pub use error::{ConnectionError, ConnectionErrorDetail};

/// Upper bound on the number of handshake steps, crossing relayers included.
const MAX_HANDSHAKE_STEPS: usize = 8;

pub mod handshake_retry {
    //! Provides utility methods and constants to configure the retry behavior
    //! for the channel and connection handshake algorithms.

    use core::time::Duration;

    use tracing::warn;

    use crate::util::retry::{
        clamp_total, retry_with_index, ConstantGrowth, RetryError, RetryResult,
    };

    /// Approximate number of retries per block.
    const PER_BLOCK_RETRIES: u32 = 10;

    /// Defines the increment in delay between subsequent retries.
    /// A value of `0` will make the retry delay constant.
    const DELAY_INCREMENT: u64 = 0;

    /// Maximum retry delay expressed in number of blocks
    const BLOCK_NUMBER_DELAY: u32 = 10;

    /// The default retry strategy.
    /// We retry with a constant backoff strategy. The strategy is parametrized by the
    /// maximum block time expressed as a `Duration`.
    pub fn default_strategy(max_block_times: Duration) -> impl Iterator<Item = Duration> {
        let retry_delay = max_block_times / PER_BLOCK_RETRIES;

        clamp_total(
            ConstantGrowth::new(retry_delay, Duration::from_secs(DELAY_INCREMENT)),
            retry_delay,
            max_block_times * BLOCK_NUMBER_DELAY,
        )
    }

    /// Runs `step` under the default strategy, retrying only the errors
    /// for which `is_retryable` holds. Exhausted retries are turned into an
    /// error by `on_exhausted`.
    pub fn retry_step<T, E>(
        max_block_times: Duration,
        mut step: impl FnMut() -> Result<T, E>,
        is_retryable: impl Fn(&E) -> bool,
        on_exhausted: impl FnOnce(RetryError<E>) -> E,
    ) -> Result<T, E>
    where
        E: core::fmt::Display,
    {
        retry_with_index(default_strategy(max_block_times), |index| match step() {
            Ok(output) => RetryResult::Ok(output),
            Err(e) if is_retryable(&e) => {
                warn!(attempt = index, "handshake step failed, retrying: {e}");
                RetryResult::Retry(e)
            }
            Err(e) => RetryResult::Err(e),
        })
        .map_err(|e| {
            if is_retryable(&e.error) {
                on_exhausted(e)
            } else {
                e.error
            }
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "(): Serialize"))]
pub struct ConnectionSide<Chain: ChainHandle> {
    #[serde(skip)]
    pub(crate) chain: Chain,
    client_id: ClientId,
    connection_id: Option<ConnectionId>,
}

impl<Chain: ChainHandle> Display for ConnectionSide<Chain> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "ConnectionSide {{ chain: {}, client_id: {}, connection_id: {} }}",
            self.chain.id(),
            self.client_id,
            PrettyOption(&self.connection_id)
        )
    }
}

impl<Chain: ChainHandle> ConnectionSide<Chain> {
    pub fn new(chain: Chain, client_id: ClientId, connection_id: Option<ConnectionId>) -> Self {
        Self {
            chain,
            client_id,
            connection_id,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "(): Serialize"))]
pub struct Connection<ChainA: ChainHandle, ChainB: ChainHandle> {
    pub delay_period: Duration,
    pub a_side: ConnectionSide<ChainA>,
    pub b_side: ConnectionSide<ChainB>,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Display for Connection<ChainA, ChainB> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "Connection {{ delay_period: {}, a_side: {}, b_side: {} }}",
            PrettyDuration(&self.delay_period),
            self.a_side,
            self.b_side
        )
    }
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Connection<ChainA, ChainB> {
    /// Create a new connection, ensuring that the handshake has succeeded and the two connection
    /// ends exist on each side.
    pub fn new(
        b_to_a_client: ForeignClient<ChainA, ChainB>,
        a_to_b_client: ForeignClient<ChainB, ChainA>,
        delay_period: Duration,
    ) -> Result<Self, ConnectionError> {
        Self::validate_clients(&b_to_a_client, &a_to_b_client)?;

        let mut c = Self {
            delay_period,
            a_side: ConnectionSide::new(
                b_to_a_client.dst_chain(),
                b_to_a_client.id().clone(),
                None,
            ),
            b_side: ConnectionSide::new(
                a_to_b_client.dst_chain(),
                a_to_b_client.id().clone(),
                None,
            ),
        };

        c.handshake()?;

        Ok(c)
    }

    /// Recreates a connection object from the connection end `a_connection_id`
    /// found on chain `a`, with the counterparty details read from that end.
    pub fn restore_from_state(
        a_chain: ChainA,
        b_chain: ChainB,
        a_connection_id: ConnectionId,
    ) -> Result<Self, ConnectionError> {
        let a_connection = query_connection(&a_chain, &a_connection_id)?;

        Ok(Self {
            delay_period: a_connection.delay_period(),
            a_side: ConnectionSide::new(
                a_chain,
                a_connection.client_id().clone(),
                Some(a_connection_id),
            ),
            b_side: ConnectionSide::new(
                b_chain,
                a_connection.counterparty().client_id().clone(),
                a_connection.counterparty().connection_id().cloned(),
            ),
        })
    }

    // The client on each side must track the chain on the other side.
    fn validate_clients(
        b_to_a_client: &ForeignClient<ChainA, ChainB>,
        a_to_b_client: &ForeignClient<ChainB, ChainA>,
    ) -> Result<(), ConnectionError> {
        if b_to_a_client.src_chain().id() != a_to_b_client.dst_chain().id() {
            return Err(ConnectionError::client_mismatch(
                a_to_b_client.dst_chain().id(),
                b_to_a_client.src_chain().id(),
            ));
        }

        if a_to_b_client.src_chain().id() != b_to_a_client.dst_chain().id() {
            return Err(ConnectionError::client_mismatch(
                b_to_a_client.dst_chain().id(),
                a_to_b_client.src_chain().id(),
            ));
        }

        Ok(())
    }

    pub fn src_chain(&self) -> ChainA {
        self.a_side.chain.clone()
    }

    pub fn dst_chain(&self) -> ChainB {
        self.b_side.chain.clone()
    }

    pub fn a_chain(&self) -> ChainA {
        self.a_side.chain.clone()
    }

    pub fn b_chain(&self) -> ChainB {
        self.b_side.chain.clone()
    }

    pub fn src_client_id(&self) -> &ClientId {
        &self.a_side.client_id
    }

    pub fn dst_client_id(&self) -> &ClientId {
        &self.b_side.client_id
    }

    pub fn src_connection_id(&self) -> Option<&ConnectionId> {
        self.a_side.connection_id()
    }

    pub fn dst_connection_id(&self) -> Option<&ConnectionId> {
        self.b_side.connection_id()
    }

    pub fn a_connection_id(&self) -> Option<&ConnectionId> {
        self.a_side.connection_id()
    }

    pub fn b_connection_id(&self) -> Option<&ConnectionId> {
        self.b_side.connection_id()
    }

    /// Returns a `Duration` representing the maximum value among the
    /// `max_block_time` of the two chains this connection belongs to.
    fn max_block_times(&self) -> Result<Duration, ConnectionError> {
        let a_block_time = self
            .a_chain()
            .config()
            .map_err(ConnectionError::relayer)?
            .max_block_time;
        let b_block_time = self
            .b_chain()
            .config()
            .map_err(ConnectionError::relayer)?
            .max_block_time;
        Ok(a_block_time.max(b_block_time))
    }

    pub fn flipped(&self) -> Connection<ChainB, ChainA> {
        Connection {
            a_side: self.b_side.clone(),
            b_side: self.a_side.clone(),
            delay_period: self.delay_period,
        }
    }

    /// Whether both connection ends exist and are open, and point at each other.
    pub fn is_open(&self) -> Result<bool, ConnectionError> {
        let (Some(a_id), Some(b_id)) = (self.a_connection_id(), self.b_connection_id()) else {
            return Ok(false);
        };

        let a_connection = query_connection(&self.a_chain(), a_id)?;
        let b_connection = query_connection(&self.b_chain(), b_id)?;

        Ok(a_connection.is_open()
            && b_connection.is_open()
            && a_connection.counterparty().connection_id() == Some(b_id)
            && b_connection.counterparty().connection_id() == Some(a_id))
    }

    fn a_connection(
        &self,
        connection_id: Option<&ConnectionId>,
    ) -> Result<ConnectionEnd, ConnectionError> {
        match connection_id {
            Some(id) => query_connection(&self.a_chain(), id),
            None => Ok(ConnectionEnd::uninitialized(self.a_side.client_id.clone())),
        }
    }

    fn b_connection(
        &self,
        connection_id: Option<&ConnectionId>,
    ) -> Result<ConnectionEnd, ConnectionError> {
        match connection_id {
            Some(id) => query_connection(&self.b_chain(), id),
            None => Ok(ConnectionEnd::uninitialized(self.b_side.client_id.clone())),
        }
    }

    /// Queries the chains for latest connection end information. Adopts the
    /// counterparty connection id recorded on chain when the relayer does not
    /// know it yet, which happens when another relayer drove a step.
    /// Returns the states of the two connection ends.
    fn update_connection_and_query_states(&mut self) -> Result<(State, State), ConnectionError> {
        let a_connection = self.a_connection(self.a_side.connection_id())?;

        if let Some(a_counterparty_id) = a_connection.counterparty().connection_id() {
            if self.b_side.connection_id() != Some(a_counterparty_id) {
                warn!(
                    "updating the expected {} of side_b({}) to the counterparty {} recorded on {}",
                    PrettyOption(&self.b_side.connection_id),
                    self.b_chain().id(),
                    a_counterparty_id,
                    self.a_chain().id(),
                );
                self.b_side.connection_id = Some(a_counterparty_id.clone());
            }
        }

        let b_connection = self.b_connection(self.b_side.connection_id())?;

        if let Some(b_counterparty_id) = b_connection.counterparty().connection_id() {
            if self.a_side.connection_id() != Some(b_counterparty_id) {
                warn!(
                    "updating the expected {} of side_a({}) to the counterparty {} recorded on {}",
                    PrettyOption(&self.a_side.connection_id),
                    self.a_chain().id(),
                    b_counterparty_id,
                    self.b_chain().id(),
                );
                self.a_side.connection_id = Some(b_counterparty_id.clone());
            }
        }

        Ok((*a_connection.state(), *b_connection.state()))
    }

    /// Sends a connection open handshake message.
    /// The message sent depends on the chain status of the connection ends.
    /// Returns `true` once both ends are open.
    fn do_conn_open_handshake(&mut self) -> Result<bool, ConnectionError> {
        let (a_state, b_state) = self.update_connection_and_query_states()?;
        debug!(
            "do_conn_open_handshake with connection end states: {}, {}",
            a_state, b_state
        );

        match (a_state, b_state) {
            // send the Init message to chain a (source)
            (State::Uninitialized, State::Uninitialized) => {
                let event = self.flipped().build_conn_init_and_send().map_err(|e| {
                    error!("failed ConnOpenInit {}: {}", self.a_side, e);
                    e
                })?;
                let connection_id = extract_connection_id(&event)?;
                self.a_side.connection_id = Some(connection_id.clone());
            }

            // send the Try message to chain a (source)
            (State::Uninitialized, State::Init) => {
                let event = self.flipped().build_conn_try_and_send().map_err(|e| {
                    error!("failed ConnOpenTry {}: {}", self.a_side, e);
                    e
                })?;

                let connection_id = extract_connection_id(&event)?;
                self.a_side.connection_id = Some(connection_id.clone());
            }

            // send the Try message to chain b (destination)
            (State::Init, State::Uninitialized) => {
                let event = self.build_conn_try_and_send().map_err(|e| {
                    error!("failed ConnOpenTry {}: {}", self.b_side, e);
                    e
                })?;

                let connection_id = extract_connection_id(&event)?;
                self.b_side.connection_id = Some(connection_id.clone());
            }

            // send the Ack message to chain a (source)
            (State::Init, State::TryOpen) => {
                self.flipped().build_conn_ack_and_send().map_err(|e| {
                    error!("failed ConnOpenAck {}: {}", self.a_side, e);
                    e
                })?;
            }

            // send the Ack message to chain b (destination)
            (State::TryOpen, State::Init) => {
                self.build_conn_ack_and_send().map_err(|e| {
                    error!("failed ConnOpenAck {}: {}", self.b_side, e);
                    e
                })?;
            }

            // send the Confirm message to chain b (destination)
            (State::Open, State::TryOpen) => {
                self.build_conn_confirm_and_send().map_err(|e| {
                    error!("failed ConnOpenConfirm {}: {}", self.b_side, e);
                    e
                })?;
            }

            // send the Confirm message to chain a (source)
            (State::TryOpen, State::Open) => {
                self.flipped().build_conn_confirm_and_send().map_err(|e| {
                    error!("failed ConnOpenConfirm {}: {}", self.a_side, e);
                    e
                })?;
            }

            (State::Open, State::Open) => {
                info!("connection handshake already finished for {}", self);
                return Ok(true);
            }

            (a_state, b_state) => {
                return Err(ConnectionError::unexpected_states(a_state, b_state));
            }
        }

        Ok(false)
    }

    /// Executes the connection handshake protocol (ICS003)
    fn handshake(&mut self) -> Result<(), ConnectionError> {
        let max_block_times = self.max_block_times()?;

        for _ in 0..MAX_HANDSHAKE_STEPS {
            let description = format!("failed to finish connection handshake for {self}");

            let done = handshake_retry::retry_step(
                max_block_times,
                || self.do_conn_open_handshake(),
                ConnectionError::is_connectivity,
                |e| {
                    error!("failed to open connection after {} retries", e.tries);
                    ConnectionError::max_retry(
                        description,
                        e.tries,
                        e.total_delay,
                        e.error.to_string(),
                    )
                },
            )?;

            if done {
                return Ok(());
            }
        }

        Err(ConnectionError::handshake_finalize())
    }

    fn counterparty(&self) -> Counterparty {
        Counterparty::new(
            self.src_client_id().clone(),
            self.src_connection_id().cloned(),
            CommitmentPrefix::default(),
        )
    }

    pub fn build_update_client_on_dst(
        &self,
        height: Height,
    ) -> Result<Vec<MsgEnvelope>, ConnectionError> {
        let client = self.restore_dst_client();
        client.build_update_client(height).map_err(|e| {
            ConnectionError::client_operation(
                self.dst_client_id().clone(),
                self.dst_chain().id(),
                e,
            )
        })
    }

    pub fn build_conn_init(&self) -> Result<Vec<MsgEnvelope>, ConnectionError> {
        let signer = self
            .dst_chain()
            .get_signer()
            .map_err(|e| ConnectionError::chain_query(self.dst_chain().id(), e))?;

        let counterparty = Counterparty::new(
            self.src_client_id().clone(),
            None,
            CommitmentPrefix::default(),
        );

        // Let the chain propose every version it supports.
        let new_msg = MsgConnectionOpenInit {
            client_id: self.dst_client_id().clone(),
            counterparty,
            version: None,
            delay_period: self.delay_period,
            signer,
        };

        Ok(vec![ConnectionMsg::OpenInit(new_msg).into()])
    }

    pub fn build_conn_init_and_send(&self) -> Result<IbcEvent, ConnectionError> {
        let dst_msgs = self.build_conn_init()?;

        let result = self.send_and_find_event(dst_msgs, "ConnectionOpenInit", |event| {
            matches!(event, IbcEvent::OpenInitConnection(_))
        })?;

        info!("🥂 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    /// The latest height of the source chain, at which the proofs of a
    /// handshake step are built.
    fn src_proof_height(&self) -> Result<Height, ConnectionError> {
        self.src_chain()
            .query_latest_height()
            .map_err(|e| ConnectionError::chain_query(self.src_chain().id(), e))
    }

    /// Attempts to build a MsgConnOpenTry, preceded by the update of the
    /// destination's client to the proof height.
    pub fn build_conn_try(&self) -> Result<Vec<MsgEnvelope>, ConnectionError> {
        let src_connection_id = self
            .src_connection_id()
            .ok_or_else(ConnectionError::missing_local_connection_id)?;

        let src_connection = query_connection(&self.src_chain(), src_connection_id)?;

        let delay = if src_connection.delay_period() != self.delay_period {
            warn!(
                "`delay_period` for ConnectionEnd @{} is {}s; delay period on local Connection object is set to {}s",
                self.src_chain().id(),
                src_connection.delay_period().as_secs_f64(),
                self.delay_period.as_secs_f64()
            );

            src_connection.delay_period()
        } else {
            self.delay_period
        };

        let query_height = self.src_proof_height()?;

        let proofs = self
            .src_chain()
            .build_connection_proofs(src_connection_id, query_height)
            .map_err(|e| ConnectionError::chain_query(self.src_chain().id(), e))?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let signer = self
            .dst_chain()
            .get_signer()
            .map_err(|e| ConnectionError::chain_query(self.dst_chain().id(), e))?;

        let new_msg = MsgConnectionOpenTry {
            client_id: self.dst_client_id().clone(),
            counterparty: self.counterparty(),
            counterparty_versions: src_connection.versions().to_vec(),
            proofs,
            delay_period: delay,
            signer,
        };

        msgs.push(ConnectionMsg::OpenTry(new_msg).into());

        Ok(msgs)
    }

    pub fn build_conn_try_and_send(&self) -> Result<IbcEvent, ConnectionError> {
        let dst_msgs = self.build_conn_try()?;

        let result = self.send_and_find_event(dst_msgs, "ConnectionOpenTry", |event| {
            matches!(event, IbcEvent::OpenTryConnection(_))
        })?;

        info!("🥂 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    /// Attempts to build a MsgConnOpenAck.
    pub fn build_conn_ack(&self) -> Result<Vec<MsgEnvelope>, ConnectionError> {
        let src_connection_id = self
            .src_connection_id()
            .ok_or_else(ConnectionError::missing_local_connection_id)?;
        let dst_connection_id = self
            .dst_connection_id()
            .ok_or_else(ConnectionError::missing_counterparty_connection_id)?;

        let src_connection = query_connection(&self.src_chain(), src_connection_id)?;

        let version = src_connection
            .versions()
            .first()
            .cloned()
            .ok_or_else(|| ConnectionError::invalid_connection_end(src_connection_id.clone()))?;

        let query_height = self.src_proof_height()?;

        let proofs = self
            .src_chain()
            .build_connection_proofs(src_connection_id, query_height)
            .map_err(|e| ConnectionError::chain_query(self.src_chain().id(), e))?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let signer = self
            .dst_chain()
            .get_signer()
            .map_err(|e| ConnectionError::chain_query(self.dst_chain().id(), e))?;

        let new_msg = MsgConnectionOpenAck {
            connection_id: dst_connection_id.clone(),
            counterparty_connection_id: src_connection_id.clone(),
            version,
            proofs,
            signer,
        };

        msgs.push(ConnectionMsg::OpenAck(new_msg).into());

        Ok(msgs)
    }

    pub fn build_conn_ack_and_send(&self) -> Result<IbcEvent, ConnectionError> {
        let dst_msgs = self.build_conn_ack()?;

        let result = self.send_and_find_event(dst_msgs, "ConnectionOpenAck", |event| {
            matches!(event, IbcEvent::OpenAckConnection(_))
        })?;

        info!("🥂 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    /// Attempts to build a MsgConnOpenConfirm.
    pub fn build_conn_confirm(&self) -> Result<Vec<MsgEnvelope>, ConnectionError> {
        let src_connection_id = self
            .src_connection_id()
            .ok_or_else(ConnectionError::missing_local_connection_id)?;
        let dst_connection_id = self
            .dst_connection_id()
            .ok_or_else(ConnectionError::missing_counterparty_connection_id)?;

        let query_height = self.src_proof_height()?;

        let proofs = self
            .src_chain()
            .build_connection_proofs(src_connection_id, query_height)
            .map_err(|e| ConnectionError::chain_query(self.src_chain().id(), e))?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let signer = self
            .dst_chain()
            .get_signer()
            .map_err(|e| ConnectionError::chain_query(self.dst_chain().id(), e))?;

        let new_msg = MsgConnectionOpenConfirm {
            connection_id: dst_connection_id.clone(),
            proofs,
            signer,
        };

        msgs.push(ConnectionMsg::OpenConfirm(new_msg).into());

        Ok(msgs)
    }

    pub fn build_conn_confirm_and_send(&self) -> Result<IbcEvent, ConnectionError> {
        let dst_msgs = self.build_conn_confirm()?;

        let result = self.send_and_find_event(dst_msgs, "ConnectionOpenConfirm", |event| {
            matches!(event, IbcEvent::OpenConfirmConnection(_))
        })?;

        info!("🥂 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    /// Submits `msgs` to the destination chain and returns the event matching
    /// `is_expected`. Any message rejected by the chain fails the step.
    fn send_and_find_event(
        &self,
        msgs: Vec<MsgEnvelope>,
        tracking_id: &'static str,
        is_expected: impl Fn(&IbcEvent) -> bool,
    ) -> Result<IbcEventWithHeight, ConnectionError> {
        let dst_chain = self.dst_chain();
        let tm = TrackedMsgs::new_static(msgs, tracking_id);

        let events = dst_chain
            .send_messages_and_wait_commit(tm)
            .map_err(|e| ConnectionError::submit(dst_chain.id(), e))?;

        if let Some(e) = events.iter().find_map(|ev| ev.event.chain_error()) {
            return Err(ConnectionError::submit(
                dst_chain.id(),
                RelayerError::tx_rejected(dst_chain.id(), e.clone()),
            ));
        }

        events
            .into_iter()
            .find(|ev| is_expected(&ev.event))
            .ok_or_else(|| ConnectionError::missing_event(tracking_id.to_string()))
    }

    fn restore_dst_client(&self) -> ForeignClient<ChainB, ChainA> {
        ForeignClient::restore(
            self.dst_client_id().clone(),
            self.dst_chain(),
            self.src_chain(),
        )
    }
}

fn query_connection<Chain: ChainHandle>(
    chain: &Chain,
    connection_id: &ConnectionId,
) -> Result<ConnectionEnd, ConnectionError> {
    chain
        .query_connection(
            QueryConnectionRequest {
                connection_id: connection_id.clone(),
                height: QueryHeight::Latest,
            },
            IncludeProof::No,
        )
        .map(|(connection_end, _)| connection_end)
        .map_err(|e| ConnectionError::connection_query(connection_id.clone(), e))
}

pub fn extract_connection_id(event: &IbcEvent) -> Result<&ConnectionId, ConnectionError> {
    crate::event::extract_connection_id(event)
        .ok_or_else(ConnectionError::missing_connection_id_from_event)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn default_strategy_spans_ten_blocks() {
        let delays = handshake_retry::default_strategy(Duration::from_secs(1)).collect::<Vec<_>>();

        assert_eq!(delays.len(), 100);
        assert!(delays.iter().all(|d| *d == Duration::from_millis(100)));
    }

    #[test]
    fn retry_step_only_retries_retryable_errors() {
        let mut calls = 0;

        let result: Result<(), String> = handshake_retry::retry_step(
            Duration::from_millis(10),
            || {
                calls += 1;
                Err("fatal".to_string())
            },
            |e| e != "fatal",
            |e| e.error,
        );

        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_step_gives_up_after_the_strategy() {
        let mut calls = 0;

        let result: Result<(), String> = handshake_retry::retry_step(
            Duration::from_millis(10),
            || {
                calls += 1;
                Err("offline".to_string())
            },
            |_| true,
            |e| format!("gave up after {} tries", e.tries),
        );

        assert_eq!(calls, 101);
        assert_eq!(result.unwrap_err(), "gave up after 101 tries");
    }
}
