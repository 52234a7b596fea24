//! State machine of the mock chain: blocks, stores, port modules and faults.

use core::time::Duration;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::debug;

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::{ChannelEnd, Order};
use ibc_relay_types::core::ics04_channel::packet::{Packet, Sequence};
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};
use ibc_relay_types::core::ics24_host::path::{
    AcksPath, ChannelEndsPath, ClientConsensusStatePath, ClientStatePath, CommitmentsPath,
    ConnectionsPath, Path, ReceiptsPath, SeqRecvsPath,
};
use ibc_relay_types::core::ics26_routing::msgs::{
    ChannelMsg, ClientMsg, ConnectionMsg, MsgEnvelope, PacketMsg,
};
use ibc_relay_types::events::{ChainError, IbcEvent, RejectionCode};
use ibc_relay_types::proofs::Proofs;
use ibc_relay_types::timestamp::Timestamp;
use ibc_relay_types::Height;

use crate::chain::endpoint::ChainStatus;
use crate::chain::requests::*;
use crate::error::Error;
use crate::event::IbcEventWithHeight;

use super::store::VersionedStore;

/// Gas charged for each message of a transaction.
pub const GAS_PER_MSG: u64 = 10_000;

/// The validator set hash of every mock chain. Headers carrying another
/// hash fail verification.
pub const VALIDATORS_HASH: &[u8] = b"mock-validators";

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Time between two consecutive blocks.
    pub block_time: Duration,
    /// Number of past heights whose state can still be queried and proven.
    pub history_window: usize,
    pub genesis_time: Timestamp,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            block_time: Duration::from_secs(1),
            history_window: 100,
            genesis_time: Timestamp::from_nanoseconds(1_700_000_000_000_000_000),
        }
    }
}

/// The application bound to a port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Application {
    /// ICS-20 fungible token transfer.
    Transfer,
    /// Acknowledges every packet with its own payload.
    Echo,
}

/// A module bound to a port, with the channel versions and orderings it accepts.
#[derive(Clone, Debug)]
pub struct PortModule {
    pub application: Application,
    pub versions: Vec<Version>,
    pub orderings: Vec<Order>,
}

impl PortModule {
    pub fn transfer() -> Self {
        Self {
            application: Application::Transfer,
            versions: vec![Version::ics20()],
            orderings: vec![Order::Unordered, Order::Ordered],
        }
    }

    pub fn echo(version: Version) -> Self {
        Self {
            application: Application::Echo,
            versions: vec![version],
            orderings: vec![Order::Unordered, Order::Ordered],
        }
    }

    pub fn with_orderings(self, orderings: Vec<Order>) -> Self {
        Self { orderings, ..self }
    }

    pub(super) fn accepts(&self, ordering: Order, version: &Version) -> Result<(), ChainError> {
        if !self.orderings.contains(&ordering) {
            return Err(ChainError::new(
                RejectionCode::ProtocolViolation,
                format!("ordering {ordering} is not supported by the port module"),
            ));
        }

        if !self.versions.contains(version) {
            return Err(ChainError::new(
                RejectionCode::ProtocolViolation,
                format!("version '{version}' is not supported by the port module"),
            ));
        }

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Faults {
    /// Every call fails with a connectivity error.
    pub offline: bool,
    /// Number of upcoming proof-carrying messages to reject as stale.
    pub stale_proofs: u64,
    /// Number of blocks the reported latest height trails the chain by.
    pub lag: u64,
    /// Number of upcoming requests to fail with a connectivity error.
    pub dropped_requests: u64,
}

#[derive(Debug)]
pub struct MockHost {
    pub(super) chain_id: ChainId,
    pub(super) config: MockConfig,
    pub(super) height: Height,
    pub(super) store: VersionedStore,
    pub(super) consensus_heights: BTreeMap<ClientId, BTreeSet<Height>>,
    pub(super) client_counter: u64,
    pub(super) connection_counter: u64,
    pub(super) channel_counter: u64,
    pub(super) modules: HashMap<PortId, PortModule>,
    pub(super) balances: HashMap<String, BTreeMap<String, u128>>,
    /// Packet events of the retained blocks, oldest first.
    pub(super) packet_events: VecDeque<IbcEventWithHeight>,
    pub(super) recv_counts: HashMap<(PortId, ChannelId, Sequence), u64>,
    pub(super) tx_count: u64,
    pub(super) faults: Faults,
}

impl MockHost {
    pub fn new(chain_id: ChainId, config: MockConfig) -> Result<Self, Error> {
        let genesis = Height::new(chain_id.version(), 1).map_err(Error::client)?;

        let mut store = VersionedStore::new(chain_id.clone(), config.history_window);
        store.commit(genesis);

        let mut modules = HashMap::new();
        modules.insert(PortId::transfer(), PortModule::transfer());

        Ok(Self {
            chain_id,
            config,
            height: genesis,
            store,
            consensus_heights: BTreeMap::new(),
            client_counter: 0,
            connection_counter: 0,
            channel_counter: 0,
            modules,
            balances: HashMap::new(),
            packet_events: VecDeque::new(),
            recv_counts: HashMap::new(),
            tx_count: 0,
            faults: Faults::default(),
        })
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn latest_height(&self) -> Height {
        self.height
    }

    pub fn timestamp_at(&self, height: Height) -> Timestamp {
        let block_nanos = u64::try_from(self.config.block_time.as_nanos()).unwrap_or(u64::MAX);
        let elapsed = block_nanos.saturating_mul(height.revision_height());

        Timestamp::from_nanoseconds(
            self.config
                .genesis_time
                .nanoseconds()
                .saturating_add(elapsed),
        )
    }

    /// The latest height as reported to clients, which trails the chain
    /// when the node lags.
    pub fn reported_height(&self) -> Height {
        let oldest = self.store.oldest_height().unwrap_or(self.height);

        self.height
            .sub(self.faults.lag)
            .map(|height| height.max(oldest))
            .unwrap_or(oldest)
    }

    pub fn status(&self) -> ChainStatus {
        let height = self.reported_height();

        ChainStatus {
            height,
            timestamp: self.timestamp_at(height),
        }
    }

    fn resolve(&self, height: QueryHeight) -> Height {
        height.or(self.reported_height())
    }

    /// Produces a new block, committing the current state at its height.
    /// Packet events of blocks that fell out of the history window are dropped.
    pub fn end_block(&mut self) -> Height {
        self.height = self.height.increment();
        self.store.commit(self.height);

        if let Some(oldest) = self.store.oldest_height() {
            while self
                .packet_events
                .front()
                .map_or(false, |event| event.height < oldest)
            {
                self.packet_events.pop_front();
            }
        }

        self.height
    }

    pub fn bind_port(&mut self, port_id: PortId, module: PortModule) {
        self.modules.insert(port_id, module);
    }

    pub fn credit(&mut self, address: &str, coin: &Coin) {
        let amount = self
            .balances
            .entry(address.to_string())
            .or_default()
            .entry(coin.denom.clone())
            .or_default();

        *amount = amount.saturating_add(coin.amount);
    }

    pub fn balance(&self, address: &str) -> Vec<Coin> {
        self.balances
            .get(address)
            .map(|coins| {
                coins
                    .iter()
                    .map(|(denom, amount)| Coin::new(*amount, denom.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Executes a transaction in a new block. Each message is applied on
    /// its own: a rejected message leaves the state untouched and is
    /// reported as a [`IbcEvent::ChainError`].
    pub fn deliver_tx(&mut self, msgs: Vec<MsgEnvelope>, gas_limit: u64) -> Vec<IbcEventWithHeight> {
        self.tx_count += 1;

        let height = self.height.increment();
        let timestamp = self.timestamp_at(height);
        let gas_wanted = GAS_PER_MSG.saturating_mul(msgs.len() as u64);

        let events = if gas_wanted > gas_limit {
            msgs.iter()
                .map(|_| {
                    IbcEvent::ChainError(ChainError::new(
                        RejectionCode::OutOfGas,
                        format!("out of gas: wanted {gas_wanted}, limit {gas_limit}"),
                    ))
                })
                .collect::<Vec<_>>()
        } else {
            msgs.into_iter()
                .map(|msg| {
                    let type_url = msg.type_url();
                    self.deliver_msg(msg, height, timestamp)
                        .unwrap_or_else(|e| {
                            debug!(chain = %self.chain_id, %type_url, "message rejected: {e}");
                            IbcEvent::ChainError(e)
                        })
                })
                .collect()
        };

        self.end_block();

        events
            .into_iter()
            .map(|event| IbcEventWithHeight::new(event, height))
            .collect()
    }

    fn deliver_msg(
        &mut self,
        msg: MsgEnvelope,
        height: Height,
        timestamp: Timestamp,
    ) -> Result<IbcEvent, ChainError> {
        if carries_proof(&msg) && self.faults.stale_proofs > 0 {
            self.faults.stale_proofs -= 1;

            return Err(ChainError::new(
                RejectionCode::StaleProof,
                "proof height is no longer covered by a consensus state",
            ));
        }

        match msg {
            MsgEnvelope::Client(ClientMsg::CreateClient(msg)) => self.create_client(msg),
            MsgEnvelope::Client(ClientMsg::UpdateClient(msg)) => self.update_client(msg),

            MsgEnvelope::Connection(ConnectionMsg::OpenInit(msg)) => self.conn_open_init(msg),
            MsgEnvelope::Connection(ConnectionMsg::OpenTry(msg)) => self.conn_open_try(msg),
            MsgEnvelope::Connection(ConnectionMsg::OpenAck(msg)) => self.conn_open_ack(msg),
            MsgEnvelope::Connection(ConnectionMsg::OpenConfirm(msg)) => {
                self.conn_open_confirm(msg)
            }

            MsgEnvelope::Channel(ChannelMsg::OpenInit(msg)) => self.chan_open_init(msg),
            MsgEnvelope::Channel(ChannelMsg::OpenTry(msg)) => self.chan_open_try(msg),
            MsgEnvelope::Channel(ChannelMsg::OpenAck(msg)) => self.chan_open_ack(msg),
            MsgEnvelope::Channel(ChannelMsg::OpenConfirm(msg)) => self.chan_open_confirm(msg),

            MsgEnvelope::Packet(PacketMsg::Recv(msg)) => self.recv_packet(msg, height, timestamp),
            MsgEnvelope::Packet(PacketMsg::Ack(msg)) => self.acknowledge_packet(msg),
            MsgEnvelope::Packet(PacketMsg::Timeout(msg)) => self.timeout_packet(msg),
        }
    }

    pub fn build_header(&self, trusted_height: Height, target_height: Height) -> Result<Header, Error> {
        Ok(Header {
            chain_id: self.chain_id.clone(),
            height: target_height,
            trusted_height,
            timestamp: self.timestamp_at(target_height),
            root: self.store.root_at(target_height)?,
            validators_hash: VALIDATORS_HASH.to_vec(),
        })
    }

    pub fn build_client_state(&self, height: Height) -> ClientState {
        ClientState::new(self.chain_id.clone(), height)
    }

    pub fn build_consensus_state(&self, height: Height) -> Result<ConsensusState, Error> {
        Ok(ConsensusState::new(
            self.store.root_at(height)?,
            self.timestamp_at(height),
            VALIDATORS_HASH.to_vec(),
        ))
    }

    /// Drops every consensus state of `client_id` except the latest one.
    pub fn prune_consensus_states(&mut self, client_id: &ClientId) {
        let Some(heights) = self.consensus_heights.get_mut(client_id) else {
            return;
        };

        let latest = heights.last().copied();
        let pruned = heights
            .iter()
            .copied()
            .filter(|height| Some(*height) != latest)
            .collect::<Vec<_>>();

        for height in pruned {
            heights.remove(&height);
            self.store.delete(&Path::from(ClientConsensusStatePath {
                client_id: client_id.clone(),
                height,
            }));
        }
    }

    pub(super) fn record_packet_event(&mut self, event: IbcEvent, height: Height) {
        self.packet_events
            .push_back(IbcEventWithHeight::new(event, height));
    }

    pub(super) fn client_state(&self, client_id: &ClientId) -> Result<ClientState, ChainError> {
        self.store
            .get_json(&ClientStatePath(client_id.clone()).into())
            .map_err(internal)?
            .ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    format!("client {client_id} not found"),
                )
            })
    }

    pub(super) fn consensus_state(
        &self,
        client_id: &ClientId,
        height: Height,
    ) -> Result<ConsensusState, ChainError> {
        self.store
            .get_json(&Path::from(ClientConsensusStatePath {
                client_id: client_id.clone(),
                height,
            }))
            .map_err(internal)?
            .ok_or_else(|| {
                ChainError::new(
                    RejectionCode::StaleProof,
                    format!("client {client_id} has no consensus state at height {height}"),
                )
            })
    }

    pub(super) fn connection_end(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ConnectionEnd, ChainError> {
        self.store
            .get_json(&ConnectionsPath(connection_id.clone()).into())
            .map_err(internal)?
            .ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    format!("connection {connection_id} not found"),
                )
            })
    }

    pub(super) fn channel_end(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ChannelEnd, ChainError> {
        self.store
            .get_json(&ChannelEndsPath(port_id.clone(), channel_id.clone()).into())
            .map_err(internal)?
            .ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    format!("channel {port_id}/{channel_id} not found"),
                )
            })
    }

    pub(super) fn sequence(&self, path: Path) -> Result<Sequence, ChainError> {
        self.store
            .get_json(&path)
            .map_err(internal)?
            .ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    format!("no sequence stored at {path}"),
                )
            })
    }

    /// The client verifying proofs of the counterparty of a channel.
    pub(super) fn channel_client(&self, channel_end: &ChannelEnd) -> Result<ClientId, ChainError> {
        let connection_id = channel_end.connection_hops().first().ok_or_else(|| {
            ChainError::new(RejectionCode::ProtocolViolation, "channel has no connection hop")
        })?;

        Ok(self.connection_end(connection_id)?.client_id().clone())
    }

    /// Verifies that `proofs` attest `value` at `path` on the chain tracked by
    /// `client_id`, or the absence of `path` when `value` is `None`.
    pub(super) fn verify_proof(
        &self,
        client_id: &ClientId,
        proofs: &Proofs,
        path: Path,
        value: Option<&[u8]>,
    ) -> Result<(), ChainError> {
        let client_state = self.client_state(client_id)?;
        let consensus_state = self.consensus_state(client_id, proofs.height())?;

        let verified = match value {
            Some(value) => client_state.verify_membership(
                &consensus_state,
                proofs.object_proof(),
                &path,
                value,
            ),
            None => client_state.verify_non_membership(
                &consensus_state,
                proofs.object_proof(),
                &path,
            ),
        };

        verified.map_err(|e| {
            ChainError::new(
                RejectionCode::InvalidProof,
                format!("proof of {path} at height {}: {e}", proofs.height()),
            )
        })
    }

    fn proof(
        &self,
        include_proof: IncludeProof,
        height: Height,
    ) -> Result<Option<CommitmentProofBytes>, Error> {
        if include_proof.to_bool() {
            self.store.proof_at(height).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ClientState, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let client_state = self
            .store
            .get_json_at(&ClientStatePath(request.client_id.clone()).into(), height)?
            .ok_or_else(|| Error::client_not_found(self.chain_id.clone(), request.client_id))?;

        Ok((client_state, self.proof(include_proof, height)?))
    }

    pub fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConsensusState, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.query_height);

        let path = Path::from(ClientConsensusStatePath {
            client_id: request.client_id.clone(),
            height: request.consensus_height,
        });

        let consensus_state = self
            .store
            .get_json_at(&path, height)?
            .ok_or_else(|| {
                Error::consensus_state_not_found(request.client_id, request.consensus_height)
            })?;

        Ok((consensus_state, self.proof(include_proof, height)?))
    }

    pub fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
    ) -> Result<Vec<Height>, Error> {
        self.consensus_heights
            .get(&request.client_id)
            .map(|heights| heights.iter().copied().collect())
            .ok_or_else(|| Error::client_not_found(self.chain_id.clone(), request.client_id))
    }

    pub fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConnectionEnd, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let connection_end = self
            .store
            .get_json_at(&ConnectionsPath(request.connection_id.clone()).into(), height)?
            .ok_or_else(|| {
                Error::connection_not_found(self.chain_id.clone(), request.connection_id)
            })?;

        Ok((connection_end, self.proof(include_proof, height)?))
    }

    pub fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
    ) -> Result<(ChannelEnd, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let path = Path::from(ChannelEndsPath(
            request.port_id.clone(),
            request.channel_id.clone(),
        ));

        let channel_end = self.store.get_json_at(&path, height)?.ok_or_else(|| {
            Error::channel_not_found(self.chain_id.clone(), request.port_id, request.channel_id)
        })?;

        Ok((channel_end, self.proof(include_proof, height)?))
    }

    pub fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let path = Path::from(CommitmentsPath {
            port_id: request.port_id,
            channel_id: request.channel_id,
            sequence: request.sequence,
        });

        let commitment = self
            .store
            .get_at(&path, height)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Ok((commitment, self.proof(include_proof, height)?))
    }

    pub fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
    ) -> Result<(Vec<Sequence>, Height), Error> {
        let height = self.resolve(request.height);

        let prefix = format!(
            "commitments/ports/{}/channels/{}/sequences/",
            request.port_id, request.channel_id
        );

        let mut sequences = self
            .store
            .keys_with_prefix_at(&prefix, height)?
            .filter_map(|key| key[prefix.len()..].parse::<Sequence>().ok())
            .collect::<Vec<_>>();

        sequences.sort();

        Ok((sequences, height))
    }

    pub fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let path = Path::from(ReceiptsPath {
            port_id: request.port_id,
            channel_id: request.channel_id,
            sequence: request.sequence,
        });

        let receipt = self
            .store
            .get_at(&path, height)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Ok((receipt, self.proof(include_proof, height)?))
    }

    pub fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
    ) -> Result<Vec<Sequence>, Error> {
        let height = self.reported_height();

        let channel_path = Path::from(ChannelEndsPath(
            request.port_id.clone(),
            request.channel_id.clone(),
        ));

        let channel_end: ChannelEnd =
            self.store.get_json_at(&channel_path, height)?.ok_or_else(|| {
                Error::channel_not_found(
                    self.chain_id.clone(),
                    request.port_id.clone(),
                    request.channel_id.clone(),
                )
            })?;

        if channel_end.ordering == Order::Ordered {
            let next_path = Path::from(SeqRecvsPath(
                request.port_id.clone(),
                request.channel_id.clone(),
            ));

            let next: Sequence = self
                .store
                .get_json_at(&next_path, height)?
                .unwrap_or_else(|| Sequence::from(1));

            return Ok(request
                .packet_commitment_sequences
                .into_iter()
                .filter(|sequence| *sequence >= next)
                .collect());
        }

        let mut unreceived = Vec::new();

        for sequence in request.packet_commitment_sequences {
            let path = Path::from(ReceiptsPath {
                port_id: request.port_id.clone(),
                channel_id: request.channel_id.clone(),
                sequence,
            });

            if self.store.get_at(&path, height)?.is_none() {
                unreceived.push(sequence);
            }
        }

        Ok(unreceived)
    }

    pub fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let path = Path::from(AcksPath {
            port_id: request.port_id,
            channel_id: request.channel_id,
            sequence: request.sequence,
        });

        let ack_commitment = self
            .store
            .get_at(&path, height)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Ok((ack_commitment, self.proof(include_proof, height)?))
    }

    pub fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
    ) -> Result<(Sequence, Option<CommitmentProofBytes>), Error> {
        let height = self.resolve(request.height);

        let path = Path::from(SeqRecvsPath(
            request.port_id.clone(),
            request.channel_id.clone(),
        ));

        let sequence = self.store.get_json_at(&path, height)?.ok_or_else(|| {
            Error::channel_not_found(self.chain_id.clone(), request.port_id, request.channel_id)
        })?;

        Ok((sequence, self.proof(include_proof, height)?))
    }

    pub fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
    ) -> Result<Vec<IbcEventWithHeight>, Error> {
        let height = self.resolve(request.height);

        let matches = |packet: &Packet| {
            packet.source_port == request.source_port_id
                && packet.source_channel == request.source_channel_id
                && packet.destination_port == request.destination_port_id
                && packet.destination_channel == request.destination_channel_id
                && request.sequences.contains(&packet.sequence)
        };

        Ok(self
            .packet_events
            .iter()
            .filter(|event| event.height <= height)
            .filter(|event| event.event.event_type() == request.event_id)
            .filter(|event| event.event.packet().map_or(false, matches))
            .cloned()
            .collect())
    }
}

fn carries_proof(msg: &MsgEnvelope) -> bool {
    matches!(
        msg,
        MsgEnvelope::Connection(
            ConnectionMsg::OpenTry(_) | ConnectionMsg::OpenAck(_) | ConnectionMsg::OpenConfirm(_)
        ) | MsgEnvelope::Channel(
            ChannelMsg::OpenTry(_) | ChannelMsg::OpenAck(_) | ChannelMsg::OpenConfirm(_)
        ) | MsgEnvelope::Packet(_)
    )
}

pub(super) fn internal(e: Error) -> ChainError {
    ChainError::new(RejectionCode::ProtocolViolation, e.to_string())
}
