//! An in-process IBC chain, deterministic and fully inspectable, used to run
//! the relayer without external nodes.
//!
//! A [`MockChain`] is the chain itself, shared between the test harness and
//! any number of [`MockEndpoint`]s connected to it through a [`MockNetwork`].

mod handler;
pub mod host;
pub mod network;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard};

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::core::ics02_client::client_state::ClientState;
use ibc_relay_types::core::ics02_client::consensus_state::ConsensusState;
use ibc_relay_types::core::ics02_client::header::Header;
use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::ChannelEnd;
use ibc_relay_types::core::ics04_channel::packet::{Packet, Sequence};
use ibc_relay_types::core::ics04_channel::timeout::TimeoutHeight;
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentProofBytes;
use ibc_relay_types::core::ics24_host::identifier::{
    ChainId, ChannelId, ClientId, ConnectionId, PortId,
};
use ibc_relay_types::core::ics24_host::path::{
    ChannelEndsPath, CommitmentsPath, ConnectionsPath, Path, ReceiptsPath,
};
use ibc_relay_types::signer::Signer;
use ibc_relay_types::timestamp::Timestamp;
use ibc_relay_types::Height;

use crate::chain::endpoint::{ChainEndpoint, ChainStatus};
use crate::chain::requests::*;
use crate::chain::tracking::TrackedMsgs;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::event::IbcEventWithHeight;
use crate::util::mutex::MutexUtil;

pub use host::{Application, MockConfig, PortModule};
pub use network::MockNetwork;

use host::MockHost;

/// A shared handle to an in-process chain.
#[derive(Clone, Debug)]
pub struct MockChain {
    host: Arc<Mutex<MockHost>>,
}

impl MockChain {
    pub fn new(chain_id: ChainId) -> Result<Self, Error> {
        Self::with_config(chain_id, MockConfig::default())
    }

    pub fn with_config(chain_id: ChainId, config: MockConfig) -> Result<Self, Error> {
        Ok(Self {
            host: Arc::new(Mutex::new(MockHost::new(chain_id, config)?)),
        })
    }

    fn host(&self) -> MutexGuard<'_, MockHost> {
        self.host.acquire_mutex()
    }

    pub fn id(&self) -> ChainId {
        self.host().chain_id().clone()
    }

    /// The height of the last committed block, regardless of any lag.
    pub fn latest_height(&self) -> Height {
        self.host().latest_height()
    }

    pub fn latest_timestamp(&self) -> Timestamp {
        let host = self.host();
        host.timestamp_at(host.latest_height())
    }

    pub fn bind_port(&self, port_id: PortId, module: PortModule) {
        self.host().bind_port(port_id, module);
    }

    /// Produces `count` empty blocks.
    pub fn advance_blocks(&self, count: u64) -> Height {
        let mut host = self.host();

        for _ in 0..count {
            host.end_block();
        }

        host.latest_height()
    }

    /// Sends a packet from the local channel end `port_id`/`channel_id`,
    /// as an application on this chain would.
    pub fn send_packet(
        &self,
        port_id: PortId,
        channel_id: ChannelId,
        data: Vec<u8>,
        timeout_height: TimeoutHeight,
        timeout_timestamp: Timestamp,
    ) -> Result<Packet, Error> {
        self.host().send_packet(
            port_id,
            channel_id,
            data,
            timeout_height,
            timeout_timestamp,
        )
    }

    /// Takes the node offline, or brings it back. While offline every
    /// endpoint call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.host().faults.offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.host().faults.offline
    }

    /// Rejects the next `count` proof-carrying messages as stale.
    pub fn reject_next_proofs(&self, count: u64) {
        self.host().faults.stale_proofs = count;
    }

    /// Fails the next `count` requests as a flaky connection would, then
    /// serves again.
    pub fn drop_next_requests(&self, count: u64) {
        self.host().faults.dropped_requests = count;
    }

    /// Makes the node report a latest height `blocks` behind the chain.
    pub fn set_lag(&self, blocks: u64) {
        self.host().faults.lag = blocks;
    }

    /// Drops every consensus state of a hosted client but the latest.
    pub fn prune_consensus_states(&self, client_id: &ClientId) {
        self.host().prune_consensus_states(client_id);
    }

    pub fn credit(&self, address: &str, coin: &Coin) {
        self.host().credit(address, coin);
    }

    pub fn balance(&self, address: &str) -> Vec<Coin> {
        self.host().balance(address)
    }

    /// Number of transactions executed so far.
    pub fn tx_count(&self) -> u64 {
        self.host().tx_count
    }

    /// Number of times the packet with `sequence` was applied on the
    /// local channel end `port_id`/`channel_id`.
    pub fn recv_count(&self, port_id: &PortId, channel_id: &ChannelId, sequence: Sequence) -> u64 {
        self.host()
            .recv_counts
            .get(&(port_id.clone(), channel_id.clone(), sequence))
            .copied()
            .unwrap_or(0)
    }

    pub fn connection_end(&self, connection_id: &ConnectionId) -> Option<ConnectionEnd> {
        self.host()
            .store
            .get_json(&ConnectionsPath(connection_id.clone()).into())
            .ok()
            .flatten()
    }

    pub fn channel_end(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd> {
        self.host()
            .store
            .get_json(&ChannelEndsPath(port_id.clone(), channel_id.clone()).into())
            .ok()
            .flatten()
    }

    pub fn consensus_heights(&self, client_id: &ClientId) -> Vec<Height> {
        self.host()
            .consensus_heights
            .get(client_id)
            .map(|heights| heights.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> bool {
        self.host().store.contains(&Path::from(CommitmentsPath {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        }))
    }

    pub fn has_packet_receipt(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> bool {
        self.host().store.contains(&Path::from(ReceiptsPath {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        }))
    }
}

/// A [`ChainEndpoint`] backed by a [`MockChain`].
pub struct MockEndpoint {
    config: ChainConfig,
    chain: MockChain,
}

impl MockEndpoint {
    pub fn new(config: ChainConfig, chain: MockChain) -> Self {
        Self { config, chain }
    }

    /// Locks the chain, failing as an unreachable RPC endpoint would when
    /// the node is offline.
    fn host(&self) -> Result<MutexGuard<'_, MockHost>, Error> {
        let mut host = self.chain.host();

        let reason = if host.faults.offline {
            "node is offline"
        } else if host.faults.dropped_requests > 0 {
            host.faults.dropped_requests -= 1;
            "connection reset by peer"
        } else {
            return Ok(host);
        };

        Err(Error::connectivity(
            self.config.id.clone(),
            self.config.rpc_addr.to_string(),
            reason.to_string(),
        ))
    }
}

impl ChainEndpoint for MockEndpoint {
    fn id(&self) -> &ChainId {
        &self.config.id
    }

    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn shutdown(self) -> Result<(), Error> {
        Ok(())
    }

    fn health_check(&self) -> Result<(), Error> {
        let host = self.host()?;

        if host.chain_id() != &self.config.id {
            return Err(Error::chain_id_mismatch(
                self.config.id.clone(),
                host.chain_id().clone(),
            ));
        }

        Ok(())
    }

    fn send_messages_and_wait_commit(
        &mut self,
        tracked_msgs: TrackedMsgs,
    ) -> Result<Vec<IbcEventWithHeight>, Error> {
        let gas_limit = self.config.gas_limit;
        let mut host = self.host()?;

        Ok(host.deliver_tx(tracked_msgs.msgs, gas_limit))
    }

    fn query_application_status(&self) -> Result<ChainStatus, Error> {
        Ok(self.host()?.status())
    }

    fn query_balance(&self, address: &Signer) -> Result<Vec<Coin>, Error> {
        Ok(self.host()?.balance(address.as_str()))
    }

    fn build_client_state(&self, height: Height) -> Result<ClientState, Error> {
        Ok(self.host()?.build_client_state(height))
    }

    fn build_consensus_state(&self, height: Height) -> Result<ConsensusState, Error> {
        self.host()?.build_consensus_state(height)
    }

    fn build_header(&self, trusted_height: Height, target_height: Height) -> Result<Header, Error> {
        self.host()?.build_header(trusted_height, target_height)
    }

    fn query_client_state(
        &self,
        request: QueryClientStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ClientState, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_client_state(request, include_proof)
    }

    fn query_consensus_state(
        &self,
        request: QueryConsensusStateRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConsensusState, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_consensus_state(request, include_proof)
    }

    fn query_consensus_state_heights(
        &self,
        request: QueryConsensusStateHeightsRequest,
    ) -> Result<Vec<Height>, Error> {
        self.host()?.query_consensus_state_heights(request)
    }

    fn query_connection(
        &self,
        request: QueryConnectionRequest,
        include_proof: IncludeProof,
    ) -> Result<(ConnectionEnd, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_connection(request, include_proof)
    }

    fn query_channel(
        &self,
        request: QueryChannelRequest,
        include_proof: IncludeProof,
    ) -> Result<(ChannelEnd, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_channel(request, include_proof)
    }

    fn query_packet_commitment(
        &self,
        request: QueryPacketCommitmentRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_packet_commitment(request, include_proof)
    }

    fn query_packet_commitments(
        &self,
        request: QueryPacketCommitmentsRequest,
    ) -> Result<(Vec<Sequence>, Height), Error> {
        self.host()?.query_packet_commitments(request)
    }

    fn query_packet_receipt(
        &self,
        request: QueryPacketReceiptRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        self.host()?.query_packet_receipt(request, include_proof)
    }

    fn query_unreceived_packets(
        &self,
        request: QueryUnreceivedPacketsRequest,
    ) -> Result<Vec<Sequence>, Error> {
        self.host()?.query_unreceived_packets(request)
    }

    fn query_packet_acknowledgement(
        &self,
        request: QueryPacketAcknowledgementRequest,
        include_proof: IncludeProof,
    ) -> Result<(Vec<u8>, Option<CommitmentProofBytes>), Error> {
        self.host()?
            .query_packet_acknowledgement(request, include_proof)
    }

    fn query_next_sequence_receive(
        &self,
        request: QueryNextSequenceReceiveRequest,
        include_proof: IncludeProof,
    ) -> Result<(Sequence, Option<CommitmentProofBytes>), Error> {
        self.host()?
            .query_next_sequence_receive(request, include_proof)
    }

    fn query_packet_events(
        &self,
        request: QueryPacketEventDataRequest,
    ) -> Result<Vec<IbcEventWithHeight>, Error> {
        self.host()?.query_packet_events(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use ibc_relay_types::core::ics02_client::msgs::MsgCreateClient;
    use ibc_relay_types::core::ics26_routing::msgs::{ClientMsg, MsgEnvelope};
    use ibc_relay_types::core::ics04_channel::events::SendPacket;
    use ibc_relay_types::events::{IbcEvent, RejectionCode};

    fn chain(id: &str) -> MockChain {
        MockChain::new(ChainId::from_string(id)).unwrap()
    }

    fn endpoint(chain: &MockChain) -> MockEndpoint {
        MockEndpoint::new(ChainConfig::source(chain.id()), chain.clone())
    }

    fn create_client_msg(counterparty: &MockChain, endpoint: &MockEndpoint) -> MsgEnvelope {
        let counterparty =
            MockEndpoint::new(ChainConfig::target(counterparty.id()), counterparty.clone());
        let height = counterparty.query_application_status().unwrap().height;

        MsgEnvelope::Client(ClientMsg::CreateClient(MsgCreateClient::new(
            counterparty.build_client_state(height).unwrap(),
            counterparty.build_consensus_state(height).unwrap(),
            endpoint.get_signer().unwrap(),
        )))
    }

    #[test]
    fn offline_node_is_unreachable() {
        let chain = chain("ibc-0");
        let endpoint = endpoint(&chain);

        assert!(endpoint.query_application_status().is_ok());

        chain.set_offline(true);
        let e = endpoint.query_application_status().unwrap_err();
        assert!(e.is_connectivity());

        chain.set_offline(false);
        assert!(endpoint.query_application_status().is_ok());
    }

    #[test]
    fn lagging_node_reports_older_height() {
        let chain = chain("ibc-0");
        let endpoint = endpoint(&chain);

        chain.advance_blocks(5);
        assert_eq!(chain.latest_height(), Height::new(0, 6).unwrap());

        chain.set_lag(3);
        let status = endpoint.query_application_status().unwrap();
        assert_eq!(status.height, Height::new(0, 3).unwrap());

        chain.set_lag(0);
        let status = endpoint.query_application_status().unwrap();
        assert_eq!(status.height, chain.latest_height());
        assert_eq!(status.timestamp, chain.latest_timestamp());
    }

    #[test]
    fn each_transaction_produces_a_block() {
        let chain_a = chain("ibc-0");
        let chain_b = chain("ibc-1");
        let mut endpoint = endpoint(&chain_a);

        let before = chain_a.latest_height();
        let msg = create_client_msg(&chain_b, &endpoint);

        let events = endpoint
            .send_messages_and_wait_commit(TrackedMsgs::new_static(vec![msg], "create"))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].height, before.increment());
        assert!(matches!(events[0].event, IbcEvent::CreateClient(_)));
        assert_eq!(chain_a.latest_height(), before.increment());
        assert_eq!(chain_a.tx_count(), 1);
    }

    #[test]
    fn out_of_gas_rejects_every_message() {
        let chain_a = chain("ibc-0");
        let chain_b = chain("ibc-1");

        let mut config = ChainConfig::source(chain_a.id());
        config.gas_limit = host::GAS_PER_MSG;
        let mut endpoint = MockEndpoint::new(config, chain_a.clone());

        let msgs = vec![
            create_client_msg(&chain_b, &endpoint),
            create_client_msg(&chain_b, &endpoint),
        ];

        let events = endpoint
            .send_messages_and_wait_commit(TrackedMsgs::new_static(msgs, "create"))
            .unwrap();

        assert_eq!(events.len(), 2);
        for event in events {
            let e = event.event.chain_error().unwrap();
            assert_eq!(e.code, RejectionCode::OutOfGas);
        }
    }

    #[test]
    fn sending_requires_an_open_channel() {
        let chain = chain("ibc-0");

        let result = chain.send_packet(
            PortId::transfer(),
            ChannelId::new(0),
            b"data".to_vec(),
            TimeoutHeight::Never,
            Timestamp::none(),
        );

        assert!(result.is_err());
        assert_eq!(chain.tx_count(), 0);
    }

    #[test]
    fn missing_connection_is_an_error() {
        let chain = chain("ibc-0");
        let endpoint = endpoint(&chain);

        let result = endpoint.query_connection(
            QueryConnectionRequest {
                connection_id: ConnectionId::new(7),
                height: QueryHeight::Latest,
            },
            IncludeProof::No,
        );

        assert!(result.is_err());
    }

    #[test]
    fn pruned_heights_cannot_be_proven() {
        let chain = MockChain::with_config(
            ChainId::from_string("ibc-0"),
            MockConfig {
                history_window: 3,
                ..MockConfig::default()
            },
        )
        .unwrap();
        let endpoint = endpoint(&chain);

        chain.advance_blocks(5);

        assert!(endpoint.build_consensus_state(Height::new(0, 2).unwrap()).is_err());
        assert!(endpoint.build_consensus_state(chain.latest_height()).is_ok());
    }

    #[test]
    fn dropped_requests_fail_then_the_node_serves_again() {
        let chain = chain("ibc-0");
        let endpoint = endpoint(&chain);

        chain.drop_next_requests(2);

        assert!(endpoint.query_application_status().unwrap_err().is_connectivity());
        assert!(endpoint.query_application_status().unwrap_err().is_connectivity());
        assert!(endpoint.query_application_status().is_ok());
    }

    #[test]
    fn packet_events_follow_the_history_window() {
        let config = MockConfig {
            history_window: 3,
            ..MockConfig::default()
        };
        let chain = MockChain::with_config(ChainId::from_string("ibc-0"), config).unwrap();

        let send_event = |sequence: u64| {
            IbcEvent::SendPacket(SendPacket {
                packet: Packet {
                    sequence: Sequence::from(sequence),
                    ..Packet::default()
                },
            })
        };

        {
            let mut host = chain.host();
            let height = host.latest_height();
            host.record_packet_event(send_event(1), height);
        }

        chain.advance_blocks(1);
        {
            let mut host = chain.host();
            let height = host.latest_height();
            host.record_packet_event(send_event(2), height);
        }

        assert_eq!(chain.host().packet_events.len(), 2);

        // the block of the first event leaves the window, the second one is still retained
        chain.advance_blocks(2);
        let retained = chain
            .host()
            .packet_events
            .iter()
            .filter_map(|event| event.event.packet().map(|packet| packet.sequence))
            .collect::<Vec<_>>();
        assert_eq!(retained, vec![Sequence::from(2)]);

        chain.advance_blocks(3);
        assert!(chain.host().packet_events.is_empty());
    }
}
