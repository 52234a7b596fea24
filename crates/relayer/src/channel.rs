use core::fmt::{Display, Error as FmtError, Formatter};
use core::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use ibc_relay_types::core::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
use ibc_relay_types::core::ics04_channel::msgs::{
    MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit, MsgChannelOpenTry,
};
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};
use ibc_relay_types::core::ics26_routing::msgs::{ChannelMsg, MsgEnvelope};
use ibc_relay_types::events::IbcEvent;
use ibc_relay_types::proofs::Proofs;
use ibc_relay_types::signer::Signer;
use ibc_relay_types::Height;

use crate::chain::handle::ChainHandle;
use crate::chain::requests::{
    IncludeProof, QueryChannelRequest, QueryConnectionRequest, QueryHeight,
};
use crate::chain::tracking::TrackedMsgs;
use crate::connection::{handshake_retry, Connection};
use crate::error::Error as RelayerError;
use crate::event::IbcEventWithHeight;
use crate::foreign_client::ForeignClient;
use crate::util::pretty::{PrettyDuration, PrettyOption};

mod error;
pub use error::{ChannelError, ChannelErrorDetail};

/// Upper bound on the number of handshake steps, crossing relayers included.
const MAX_HANDSHAKE_STEPS: usize = 8;

#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "(): Serialize"))]
pub struct ChannelSide<Chain: ChainHandle> {
    #[serde(skip)]
    pub chain: Chain,
    client_id: ClientId,
    connection_id: ConnectionId,
    port_id: PortId,
    channel_id: Option<ChannelId>,
    version: Option<Version>,
}

impl<Chain: ChainHandle> Display for ChannelSide<Chain> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "ChannelSide {{ chain: {}, client_id: {}, connection_id: {}, port_id: {}, channel_id: {}, version: {} }}",
            self.chain.id(),
            self.client_id,
            self.connection_id,
            self.port_id,
            PrettyOption(&self.channel_id),
            PrettyOption(&self.version),
        )
    }
}

impl<Chain: ChainHandle> ChannelSide<Chain> {
    pub fn new(
        chain: Chain,
        client_id: ClientId,
        connection_id: ConnectionId,
        port_id: PortId,
        channel_id: Option<ChannelId>,
        version: Option<Version>,
    ) -> ChannelSide<Chain> {
        Self {
            chain,
            client_id,
            connection_id,
            port_id,
            channel_id,
            version,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain.id()
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn port_id(&self) -> &PortId {
        &self.port_id
    }

    pub fn channel_id(&self) -> Option<&ChannelId> {
        self.channel_id.as_ref()
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(bound(serialize = "(): Serialize"))]
pub struct Channel<ChainA: ChainHandle, ChainB: ChainHandle> {
    pub ordering: Order,
    pub a_side: ChannelSide<ChainA>,
    pub b_side: ChannelSide<ChainB>,
    pub connection_delay: Duration,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Display for Channel<ChainA, ChainB> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "Channel {{ ordering: {}, a_side: {}, b_side: {}, connection_delay: {} }}",
            self.ordering,
            self.a_side,
            self.b_side,
            PrettyDuration(&self.connection_delay)
        )
    }
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Channel<ChainA, ChainB> {
    /// Creates a new channel on top of the existing connection. If the channel is not already
    /// set-up on both sides of the connection, this functions also fulfils the channel handshake.
    pub fn new(
        connection: Connection<ChainA, ChainB>,
        ordering: Order,
        a_port: PortId,
        b_port: PortId,
        version: Version,
    ) -> Result<Self, ChannelError> {
        let src_connection_id = connection
            .src_connection_id()
            .ok_or_else(|| ChannelError::missing_local_connection(connection.src_chain().id()))?;
        let dst_connection_id = connection
            .dst_connection_id()
            .ok_or_else(|| ChannelError::missing_local_connection(connection.dst_chain().id()))?;

        let mut channel = Self {
            ordering,
            a_side: ChannelSide::new(
                connection.src_chain(),
                connection.src_client_id().clone(),
                src_connection_id.clone(),
                a_port,
                None,
                Some(version.clone()),
            ),
            b_side: ChannelSide::new(
                connection.dst_chain(),
                connection.dst_client_id().clone(),
                dst_connection_id.clone(),
                b_port,
                None,
                Some(version),
            ),
            connection_delay: connection.delay_period,
        };

        channel.handshake()?;

        Ok(channel)
    }

    /// Recreates a channel object from the channel end `a_channel_id` on chain
    /// `a`, following its connection hop for the client identifiers.
    pub fn restore_from_state(
        a_chain: ChainA,
        b_chain: ChainB,
        a_port: PortId,
        a_channel_id: ChannelId,
    ) -> Result<Self, ChannelError> {
        let a_channel = query_channel(&a_chain, &a_port, &a_channel_id)?;

        let a_connection_id = a_channel
            .connection_hops()
            .first()
            .cloned()
            .ok_or_else(|| ChannelError::no_connection_hop(a_port.clone(), a_channel_id.clone()))?;

        let (a_connection, _) = a_chain
            .query_connection(
                QueryConnectionRequest {
                    connection_id: a_connection_id.clone(),
                    height: QueryHeight::Latest,
                },
                IncludeProof::No,
            )
            .map_err(|e| ChannelError::query(a_chain.id(), e))?;

        let b_connection_id = a_connection
            .counterparty()
            .connection_id()
            .cloned()
            .ok_or_else(|| ChannelError::connection_not_open(a_connection_id.clone()))?;

        Ok(Self {
            ordering: *a_channel.ordering(),
            a_side: ChannelSide::new(
                a_chain,
                a_connection.client_id().clone(),
                a_connection_id,
                a_port,
                Some(a_channel_id),
                Some(a_channel.version().clone()),
            ),
            b_side: ChannelSide::new(
                b_chain,
                a_connection.counterparty().client_id().clone(),
                b_connection_id,
                a_channel.counterparty().port_id().clone(),
                a_channel.counterparty().channel_id().cloned(),
                Some(a_channel.version().clone()),
            ),
            connection_delay: a_connection.delay_period(),
        })
    }

    pub fn src_chain(&self) -> &ChainA {
        &self.a_side.chain
    }

    pub fn dst_chain(&self) -> &ChainB {
        &self.b_side.chain
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

    pub fn src_connection_id(&self) -> &ConnectionId {
        &self.a_side.connection_id
    }

    pub fn dst_connection_id(&self) -> &ConnectionId {
        &self.b_side.connection_id
    }

    pub fn src_port_id(&self) -> &PortId {
        &self.a_side.port_id
    }

    pub fn dst_port_id(&self) -> &PortId {
        &self.b_side.port_id
    }

    pub fn src_channel_id(&self) -> Option<&ChannelId> {
        self.a_side.channel_id()
    }

    pub fn dst_channel_id(&self) -> Option<&ChannelId> {
        self.b_side.channel_id()
    }

    pub fn src_version(&self) -> Option<&Version> {
        self.a_side.version.as_ref()
    }

    pub fn dst_version(&self) -> Option<&Version> {
        self.b_side.version.as_ref()
    }

    pub fn flipped(&self) -> Channel<ChainB, ChainA> {
        Channel {
            ordering: self.ordering,
            a_side: self.b_side.clone(),
            b_side: self.a_side.clone(),
            connection_delay: self.connection_delay,
        }
    }

    fn max_block_times(&self) -> Result<Duration, ChannelError> {
        let a_block_time = self
            .a_chain()
            .config()
            .map_err(ChannelError::relayer)?
            .max_block_time;
        let b_block_time = self
            .b_chain()
            .config()
            .map_err(ChannelError::relayer)?
            .max_block_time;
        Ok(a_block_time.max(b_block_time))
    }

    /// Whether both channel ends are open and point at each other.
    pub fn is_open(&self) -> Result<bool, ChannelError> {
        let (Some(a_id), Some(b_id)) = (self.src_channel_id(), self.dst_channel_id()) else {
            return Ok(false);
        };

        let a_channel = query_channel(self.src_chain(), self.src_port_id(), a_id)?;
        let b_channel = query_channel(self.dst_chain(), self.dst_port_id(), b_id)?;

        Ok(a_channel.is_open()
            && b_channel.is_open()
            && a_channel.counterparty().channel_id() == Some(b_id)
            && b_channel.counterparty().channel_id() == Some(a_id))
    }

    /// Checks that an existing channel end agrees with the requested
    /// ordering and version.
    fn check_end<Chain: ChainHandle>(
        &self,
        side: &ChannelSide<Chain>,
        end: &ChannelEnd,
    ) -> Result<(), ChannelError> {
        if end.ordering() != &self.ordering {
            return Err(ChannelError::ordering_mismatch(
                side.chain_id(),
                self.ordering,
                *end.ordering(),
            ));
        }

        if let Some(version) = side.version() {
            if end.version() != version {
                return Err(ChannelError::version_mismatch(
                    side.chain_id(),
                    version.clone(),
                    end.version().clone(),
                ));
            }
        }

        Ok(())
    }

    /// Queries the chains for latest channel end information. It verifies
    /// that the existing ends agree with the requested parameters, and adopts
    /// the counterparty channel id recorded on chain when the relayer does
    /// not know it yet.
    fn update_channel_and_query_states(&mut self) -> Result<(State, State), ChannelError> {
        let a_state = match self.a_side.channel_id.clone() {
            Some(id) => {
                let a_channel = query_channel(self.src_chain(), self.src_port_id(), &id)?;
                self.check_end(&self.a_side, &a_channel)?;

                if let Some(counterparty_id) = a_channel.counterparty().channel_id() {
                    if self.b_side.channel_id() != Some(counterparty_id) {
                        warn!(
                            "updating the expected {} of side_b({}) to the counterparty {} recorded on {}",
                            PrettyOption(&self.b_side.channel_id),
                            self.b_chain().id(),
                            counterparty_id,
                            self.a_chain().id(),
                        );
                        self.b_side.channel_id = Some(counterparty_id.clone());
                    }
                }

                *a_channel.state()
            }
            None => State::Uninitialized,
        };

        let b_state = match self.b_side.channel_id.clone() {
            Some(id) => {
                let b_channel = query_channel(self.dst_chain(), self.dst_port_id(), &id)?;
                self.check_end(&self.b_side, &b_channel)?;

                if let Some(counterparty_id) = b_channel.counterparty().channel_id() {
                    if self.a_side.channel_id() != Some(counterparty_id) {
                        warn!(
                            "updating the expected {} of side_a({}) to the counterparty {} recorded on {}",
                            PrettyOption(&self.a_side.channel_id),
                            self.a_chain().id(),
                            counterparty_id,
                            self.b_chain().id(),
                        );
                        self.a_side.channel_id = Some(counterparty_id.clone());
                    }
                }

                *b_channel.state()
            }
            None => State::Uninitialized,
        };

        Ok((a_state, b_state))
    }

    /// Sends a channel open handshake message.
    /// The message sent depends on the chain status of the channel ends.
    /// Returns `true` once both ends are open.
    fn do_chan_open_handshake(&mut self) -> Result<bool, ChannelError> {
        let (a_state, b_state) = self.update_channel_and_query_states()?;
        debug!(
            "do_chan_open_handshake with channel end states: {}, {}",
            a_state, b_state
        );

        match (a_state, b_state) {
            // send the Init message to chain a (source)
            (State::Uninitialized, State::Uninitialized) => {
                let event = self.flipped().build_chan_open_init_and_send().map_err(|e| {
                    error!("failed ChanOpenInit {}: {}", self.a_side, e);
                    e
                })?;
                let channel_id = extract_channel_id(&event)?;
                self.a_side.channel_id = Some(channel_id.clone());
            }

            // send the Try message to chain a (source)
            (State::Uninitialized, State::Init) => {
                let event = self.flipped().build_chan_open_try_and_send().map_err(|e| {
                    error!("failed ChanOpenTry {}: {}", self.a_side, e);
                    e
                })?;
                let channel_id = extract_channel_id(&event)?;
                self.a_side.channel_id = Some(channel_id.clone());
            }

            // send the Try message to chain b (destination)
            (State::Init, State::Uninitialized) => {
                let event = self.build_chan_open_try_and_send().map_err(|e| {
                    error!("failed ChanOpenTry {}: {}", self.b_side, e);
                    e
                })?;
                let channel_id = extract_channel_id(&event)?;
                self.b_side.channel_id = Some(channel_id.clone());
            }

            // send the Ack message to chain a (source)
            (State::Init, State::TryOpen) => {
                self.flipped().build_chan_open_ack_and_send().map_err(|e| {
                    error!("failed ChanOpenAck {}: {}", self.a_side, e);
                    e
                })?;
            }

            // send the Ack message to chain b (destination)
            (State::TryOpen, State::Init) => {
                self.build_chan_open_ack_and_send().map_err(|e| {
                    error!("failed ChanOpenAck {}: {}", self.b_side, e);
                    e
                })?;
            }

            // send the Confirm message to chain b (destination)
            (State::Open, State::TryOpen) => {
                self.build_chan_open_confirm_and_send().map_err(|e| {
                    error!("failed ChanOpenConfirm {}: {}", self.b_side, e);
                    e
                })?;
            }

            // send the Confirm message to chain a (source)
            (State::TryOpen, State::Open) => {
                self.flipped().build_chan_open_confirm_and_send().map_err(|e| {
                    error!("failed ChanOpenConfirm {}: {}", self.a_side, e);
                    e
                })?;
            }

            (State::Open, State::Open) => {
                info!("channel handshake already finished for {}", self);
                return Ok(true);
            }

            (a_state, b_state) => {
                return Err(ChannelError::unexpected_states(a_state, b_state));
            }
        }

        Ok(false)
    }

    /// Executes the channel handshake protocol (ICS004)
    fn handshake(&mut self) -> Result<(), ChannelError> {
        let max_block_times = self.max_block_times()?;

        for _ in 0..MAX_HANDSHAKE_STEPS {
            let description = format!("failed to finish channel handshake for {self}");

            let done = handshake_retry::retry_step(
                max_block_times,
                || self.do_chan_open_handshake(),
                ChannelError::is_connectivity,
                |e| {
                    error!("failed to open channel after {} retries", e.tries);
                    ChannelError::max_retry(
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

        Err(ChannelError::handshake_finalize())
    }

    /// The version proposed on the destination, which both ends must share.
    fn dst_version_or_default(&self) -> Version {
        self.dst_version()
            .or_else(|| self.src_version())
            .cloned()
            .unwrap_or_else(Version::empty)
    }

    fn dst_signer(&self) -> Result<Signer, ChannelError> {
        self.dst_chain()
            .get_signer()
            .map_err(|e| ChannelError::query(self.dst_chain().id(), e))
    }

    /// The latest height of the source chain, at which the proofs of a
    /// handshake step are built.
    fn src_proof_height(&self) -> Result<Height, ChannelError> {
        self.src_chain()
            .query_latest_height()
            .map_err(|e| ChannelError::query(self.src_chain().id(), e))
    }

    pub fn build_update_client_on_dst(
        &self,
        height: Height,
    ) -> Result<Vec<MsgEnvelope>, ChannelError> {
        let client = ForeignClient::restore(
            self.dst_client_id().clone(),
            self.dst_chain().clone(),
            self.src_chain().clone(),
        );

        client.build_update_client(height).map_err(|e| {
            ChannelError::client_operation(self.dst_client_id().clone(), self.dst_chain().id(), e)
        })
    }

    pub fn build_chan_open_init(&self) -> Result<Vec<MsgEnvelope>, ChannelError> {
        let signer = self.dst_signer()?;

        let counterparty = Counterparty::new(self.src_port_id().clone(), None);

        let channel = ChannelEnd::new(
            State::Init,
            self.ordering,
            counterparty,
            vec![self.dst_connection_id().clone()],
            self.dst_version_or_default(),
        );

        let new_msg = MsgChannelOpenInit {
            port_id: self.dst_port_id().clone(),
            channel,
            signer,
        };

        Ok(vec![ChannelMsg::OpenInit(new_msg).into()])
    }

    pub fn build_chan_open_init_and_send(&self) -> Result<IbcEvent, ChannelError> {
        let dst_msgs = self.build_chan_open_init()?;

        let result = self.send_and_find_event(dst_msgs, "ChannelOpenInit", |event| {
            matches!(event, IbcEvent::OpenInitChannel(_))
        })?;

        info!("🎊 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    /// Retrieves the channel end from the source chain, along with the
    /// proofs of its state at the latest source height.
    fn src_channel_and_proofs(
        &self,
    ) -> Result<(ChannelId, ChannelEnd, Proofs), ChannelError> {
        let src_channel_id = self
            .src_channel_id()
            .ok_or_else(ChannelError::missing_local_channel_id)?;

        let src_channel = query_channel(self.src_chain(), self.src_port_id(), src_channel_id)?;

        let query_height = self.src_proof_height()?;

        let proofs = self
            .src_chain()
            .build_channel_proofs(self.src_port_id(), src_channel_id, query_height)
            .map_err(|e| ChannelError::query(self.src_chain().id(), e))?;

        Ok((src_channel_id.clone(), src_channel, proofs))
    }

    pub fn build_chan_open_try(&self) -> Result<Vec<MsgEnvelope>, ChannelError> {
        let (src_channel_id, src_channel, proofs) = self.src_channel_and_proofs()?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let counterparty = Counterparty::new(self.src_port_id().clone(), Some(src_channel_id));

        let channel = ChannelEnd::new(
            State::TryOpen,
            *src_channel.ordering(),
            counterparty,
            vec![self.dst_connection_id().clone()],
            self.dst_version_or_default(),
        );

        let new_msg = MsgChannelOpenTry {
            port_id: self.dst_port_id().clone(),
            channel,
            counterparty_version: src_channel.version().clone(),
            proofs,
            signer: self.dst_signer()?,
        };

        msgs.push(ChannelMsg::OpenTry(new_msg).into());

        Ok(msgs)
    }

    pub fn build_chan_open_try_and_send(&self) -> Result<IbcEvent, ChannelError> {
        let dst_msgs = self.build_chan_open_try()?;

        let result = self.send_and_find_event(dst_msgs, "ChannelOpenTry", |event| {
            matches!(event, IbcEvent::OpenTryChannel(_))
        })?;

        info!("🎊 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    pub fn build_chan_open_ack(&self) -> Result<Vec<MsgEnvelope>, ChannelError> {
        let dst_channel_id = self
            .dst_channel_id()
            .ok_or_else(ChannelError::missing_counterparty_channel_id)?;

        let (src_channel_id, src_channel, proofs) = self.src_channel_and_proofs()?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let new_msg = MsgChannelOpenAck {
            port_id: self.dst_port_id().clone(),
            channel_id: dst_channel_id.clone(),
            counterparty_channel_id: src_channel_id,
            counterparty_version: src_channel.version().clone(),
            proofs,
            signer: self.dst_signer()?,
        };

        msgs.push(ChannelMsg::OpenAck(new_msg).into());

        Ok(msgs)
    }

    pub fn build_chan_open_ack_and_send(&self) -> Result<IbcEvent, ChannelError> {
        let dst_msgs = self.build_chan_open_ack()?;

        let result = self.send_and_find_event(dst_msgs, "ChannelOpenAck", |event| {
            matches!(event, IbcEvent::OpenAckChannel(_))
        })?;

        info!("🎊 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    pub fn build_chan_open_confirm(&self) -> Result<Vec<MsgEnvelope>, ChannelError> {
        let dst_channel_id = self
            .dst_channel_id()
            .ok_or_else(ChannelError::missing_counterparty_channel_id)?;

        let (_, _, proofs) = self.src_channel_and_proofs()?;

        let mut msgs = self.build_update_client_on_dst(proofs.height())?;

        let new_msg = MsgChannelOpenConfirm {
            port_id: self.dst_port_id().clone(),
            channel_id: dst_channel_id.clone(),
            proofs,
            signer: self.dst_signer()?,
        };

        msgs.push(ChannelMsg::OpenConfirm(new_msg).into());

        Ok(msgs)
    }

    pub fn build_chan_open_confirm_and_send(&self) -> Result<IbcEvent, ChannelError> {
        let dst_msgs = self.build_chan_open_confirm()?;

        let result = self.send_and_find_event(dst_msgs, "ChannelOpenConfirm", |event| {
            matches!(event, IbcEvent::OpenConfirmChannel(_))
        })?;

        info!("🎊 {} => {}", self.dst_chain().id(), result);
        Ok(result.event)
    }

    fn send_and_find_event(
        &self,
        msgs: Vec<MsgEnvelope>,
        tracking_id: &'static str,
        is_expected: impl Fn(&IbcEvent) -> bool,
    ) -> Result<IbcEventWithHeight, ChannelError> {
        let dst_chain = self.dst_chain();

        let events = dst_chain
            .send_messages_and_wait_commit(TrackedMsgs::new_static(msgs, tracking_id))
            .map_err(|e| ChannelError::submit(dst_chain.id(), e))?;

        if let Some(e) = events.iter().find_map(|ev| ev.event.chain_error()) {
            return Err(ChannelError::submit(
                dst_chain.id(),
                RelayerError::tx_rejected(dst_chain.id(), e.clone()),
            ));
        }

        events
            .into_iter()
            .find(|ev| is_expected(&ev.event))
            .ok_or_else(|| ChannelError::missing_event(tracking_id.to_string()))
    }
}

fn query_channel<Chain: ChainHandle>(
    chain: &Chain,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<ChannelEnd, ChannelError> {
    chain
        .query_channel(
            QueryChannelRequest {
                port_id: port_id.clone(),
                channel_id: channel_id.clone(),
                height: QueryHeight::Latest,
            },
            IncludeProof::No,
        )
        .map(|(channel_end, _)| channel_end)
        .map_err(|e| ChannelError::channel_query(port_id.clone(), channel_id.clone(), e))
}

pub fn extract_channel_id(event: &IbcEvent) -> Result<&ChannelId, ChannelError> {
    crate::event::extract_channel_id(event).ok_or_else(ChannelError::missing_channel_id_from_event)
}
