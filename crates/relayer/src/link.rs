use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use ibc_relay_types::core::ics03_connection::connection::State as ConnectionState;
use ibc_relay_types::core::ics04_channel::channel::{ChannelEnd, State as ChannelState};
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, PortId};

use crate::chain::handle::ChainHandle;
use crate::chain::requests::{
    IncludeProof, QueryChannelRequest, QueryConnectionRequest, QueryHeight,
};
use crate::channel::Channel;
use crate::link::error::LinkError;
use crate::observer::RelayObserver;
use crate::registry::PathRecord;
use crate::session::CancellationToken;

pub mod error;
pub mod packet_ledger;

mod relay_path;
mod relay_summary;

pub use packet_ledger::{PacketLedger, PacketState};
pub use relay_path::RelayPath;
pub use relay_summary::RelaySummary;

#[derive(Clone, Debug)]
pub struct LinkParameters {
    pub src_port_id: PortId,
    pub src_channel_id: ChannelId,
}

impl LinkParameters {
    pub fn from_path(record: &PathRecord) -> Self {
        Self {
            src_port_id: record.a_side.port_id.clone(),
            src_channel_id: record.a_side.channel_id.clone(),
        }
    }
}

/// Both directions of packet flow over an open channel.
pub struct Link<ChainA: ChainHandle, ChainB: ChainHandle> {
    pub a_to_b: RelayPath<ChainA, ChainB>,
    pub b_to_a: RelayPath<ChainB, ChainA>,
}

impl<ChainA: ChainHandle, ChainB: ChainHandle> Link<ChainA, ChainB> {
    /// Each direction gets its own, empty, packet ledger.
    pub fn new(
        channel: Channel<ChainA, ChainB>,
        cancel: CancellationToken,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Self, LinkError> {
        let b_to_a = RelayPath::new(
            channel.flipped(),
            Arc::new(Mutex::new(PacketLedger::new())),
            cancel.clone(),
            observer.clone(),
        )?;

        let a_to_b = RelayPath::new(
            channel,
            Arc::new(Mutex::new(PacketLedger::new())),
            cancel,
            observer,
        )?;

        Ok(Self { a_to_b, b_to_a })
    }

    /// Builds the link for the channel end `opts.src_channel_id` on chain `a`,
    /// after checking that both channel ends exist and point at each other.
    ///
    /// A closed channel end is accepted, so that timeouts of an ordered
    /// channel can still be relayed.
    pub fn new_from_opts(
        a_chain: ChainA,
        b_chain: ChainB,
        opts: LinkParameters,
        cancel: CancellationToken,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Link<ChainA, ChainB>, LinkError> {
        let channel = restore_channel(a_chain, b_chain, &opts)?;

        debug!("restored channel for link: {}", channel);

        Link::new(channel, cancel, observer)
    }

    /// Builds the link for a path resolved by the handshake. The channel
    /// found on chain must be the one the record names on both chains.
    pub fn new_from_path(
        a_chain: ChainA,
        b_chain: ChainB,
        record: &PathRecord,
        cancel: CancellationToken,
        observer: Arc<dyn RelayObserver>,
    ) -> Result<Link<ChainA, ChainB>, LinkError> {
        let channel = restore_channel(a_chain, b_chain, &LinkParameters::from_path(record))?;

        if channel.dst_channel_id() != Some(&record.b_side.channel_id)
            || channel.dst_port_id() != &record.b_side.port_id
        {
            return Err(LinkError::counterparty_mismatch(
                record.b_side.chain_id.clone(),
                record.b_side.channel_id.clone(),
            ));
        }

        Link::new(channel, cancel, observer)
    }

    /// Relays both directions once, `a` to `b` first. A failing direction
    /// does not keep the other one from running.
    pub fn relay_once(&self) -> Result<RelaySummary, LinkError> {
        let a_to_b = self.a_to_b.relay_once();
        let b_to_a = self.b_to_a.relay_once();

        combine_directions(a_to_b, b_to_a)
    }
}

/// Merges the outcomes of both directions. When both failed, the
/// connectivity failure is the one reported, so that callers abort the pass.
fn combine_directions(
    a_to_b: Result<RelaySummary, LinkError>,
    b_to_a: Result<RelaySummary, LinkError>,
) -> Result<RelaySummary, LinkError> {
    match (a_to_b, b_to_a) {
        (Ok(mut summary), Ok(other)) => {
            summary.extend(other);
            Ok(summary)
        }
        (Err(e), Ok(summary)) | (Ok(summary), Err(e)) => {
            debug!(
                delivered = summary.delivered.len(),
                acknowledged = summary.acknowledged.len(),
                timed_out = summary.timed_out.len(),
                "one direction relayed before the other failed"
            );
            Err(e)
        }
        (Err(a_to_b), Err(b_to_a)) => {
            let (reported, other) = if b_to_a.is_connectivity() && !a_to_b.is_connectivity() {
                (b_to_a, a_to_b)
            } else {
                (a_to_b, b_to_a)
            };

            warn!("both directions failed, other failure: {other}");
            Err(reported)
        }
    }
}

fn restore_channel<ChainA: ChainHandle, ChainB: ChainHandle>(
    a_chain: ChainA,
    b_chain: ChainB,
    opts: &LinkParameters,
) -> Result<Channel<ChainA, ChainB>, LinkError> {
    let a_port_id = &opts.src_port_id;
    let a_channel_id = &opts.src_channel_id;

    let a_channel = query_channel_end(&a_chain, a_port_id, a_channel_id)?;

    if !a_channel.state_matches(&ChannelState::Open)
        && !a_channel.state_matches(&ChannelState::Closed)
    {
        return Err(LinkError::channel_not_opened(
            a_channel_id.clone(),
            a_chain.id(),
        ));
    }

    let b_channel_id = a_channel
        .counterparty()
        .channel_id()
        .cloned()
        .ok_or_else(|| LinkError::counterparty_channel_not_found(a_channel_id.clone()))?;

    let b_port_id = a_channel.counterparty().port_id().clone();

    // The counterparty must name this very channel end.
    let b_channel = query_channel_end(&b_chain, &b_port_id, &b_channel_id)?;

    if b_channel.counterparty().channel_id() != Some(a_channel_id)
        || b_channel.counterparty().port_id() != a_port_id
    {
        return Err(LinkError::counterparty_mismatch(b_chain.id(), b_channel_id));
    }

    let a_connection_id = a_channel
        .connection_hops()
        .first()
        .cloned()
        .ok_or_else(|| LinkError::channel_not_opened(a_channel_id.clone(), a_chain.id()))?;

    let (a_connection, _) = a_chain
        .query_connection(
            QueryConnectionRequest {
                connection_id: a_connection_id,
                height: QueryHeight::Latest,
            },
            IncludeProof::No,
        )
        .map_err(|e| LinkError::query(a_chain.id(), e))?;

    if !a_connection.state_matches(&ConnectionState::Open) {
        return Err(LinkError::channel_not_opened(
            a_channel_id.clone(),
            a_chain.id(),
        ));
    }

    Channel::restore_from_state(a_chain, b_chain, a_port_id.clone(), a_channel_id.clone())
        .map_err(LinkError::initialization)
}

fn query_channel_end<Chain: ChainHandle>(
    chain: &Chain,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<ChannelEnd, LinkError> {
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
        .map_err(|e| {
            LinkError::channel_not_found(port_id.clone(), channel_id.clone(), chain.id(), e)
        })
}
