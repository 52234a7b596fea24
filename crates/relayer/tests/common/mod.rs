//! Bootstrap shared by the integration tests: two in-process chains served
//! on a mock network, with a handle connected to each.

#![allow(dead_code)]

use core::time::Duration;
use std::sync::{Arc, Mutex};

use ibc_relay::chain::handle::{Backoff, BaseChainHandle};
use ibc_relay::chain::mock::{MockChain, MockNetwork};
use ibc_relay::config::{parse_uri, ChainConfig, GasPrice};
use ibc_relay::handshake::{ConnectOptions, HandshakeCoordinator, PathHandle};
use ibc_relay::observer::{FaucetOutcome, HandshakeStep, RelayObserver};
use ibc_relay::registry::{MemoryPathStore, PathStore};
use ibc_relay::session::RelaySession;
use ibc_relay::spawn::spawn_chain_runtime_with_config;

use ibc_relay_types::applications::transfer::coin::Coin;
use ibc_relay_types::applications::transfer::packet::PacketData;
use ibc_relay_types::core::ics04_channel::acknowledgement::Acknowledgement;
use ibc_relay_types::core::ics04_channel::packet::{Packet, Sequence};
use ibc_relay_types::core::ics04_channel::timeout::TimeoutHeight;
use ibc_relay_types::core::ics24_host::identifier::ChainId;
use ibc_relay_types::timestamp::Timestamp;
use ibc_relay_types::Height;

pub const RPC_A: &str = "http://127.0.0.1:26657";
pub const RPC_B: &str = "http://127.0.0.1:26557";

/// Short delays, so that exhausting the retries takes milliseconds.
pub fn test_backoff() -> Backoff {
    Backoff {
        initial: Duration::from_millis(1),
        factor: 2,
        max_delay: Duration::from_millis(5),
        max_retries: 3,
    }
}

pub fn chain_config(id: &str, rpc_addr: &str) -> ChainConfig {
    let mut config = ChainConfig::with_defaults(
        ChainId::from_string(id),
        parse_uri(rpc_addr).unwrap(),
        GasPrice::new(0.025, "stake".to_string()),
    );

    config.max_block_time = Duration::from_millis(10);
    config.faucet_timeout = Duration::from_secs(2);
    config
}

pub struct TestChains {
    pub network: MockNetwork,
    pub chain_a: MockChain,
    pub chain_b: MockChain,
    pub config_a: ChainConfig,
    pub config_b: ChainConfig,
    pub handle_a: BaseChainHandle,
    pub handle_b: BaseChainHandle,
}

impl TestChains {
    /// A second handle on chain `a`, as a redundant relayer would hold.
    pub fn other_handle_a(&self) -> BaseChainHandle {
        spawn_chain_runtime_with_config(&self.network, &self.config_a, test_backoff()).unwrap()
    }

    pub fn other_handle_b(&self) -> BaseChainHandle {
        spawn_chain_runtime_with_config(&self.network, &self.config_b, test_backoff()).unwrap()
    }
}

pub fn bootstrap() -> TestChains {
    bootstrap_with(chain_config("ibc-0", RPC_A), chain_config("ibc-1", RPC_B))
}

pub fn bootstrap_with(config_a: ChainConfig, config_b: ChainConfig) -> TestChains {
    let network = MockNetwork::new();

    let chain_a = MockChain::new(config_a.id.clone()).unwrap();
    let chain_b = MockChain::new(config_b.id.clone()).unwrap();

    network.register(&config_a.rpc_addr, chain_a.clone());
    network.register(&config_b.rpc_addr, chain_b.clone());

    let handle_a = spawn_chain_runtime_with_config(&network, &config_a, test_backoff()).unwrap();
    let handle_b = spawn_chain_runtime_with_config(&network, &config_b, test_backoff()).unwrap();

    TestChains {
        network,
        chain_a,
        chain_b,
        config_a,
        config_b,
        handle_a,
        handle_b,
    }
}

/// Records every notification, for assertions.
#[derive(Default)]
pub struct RecordingObserver {
    pub steps: Mutex<Vec<HandshakeStep>>,
    pub delivered: Mutex<Vec<Sequence>>,
    pub acknowledged: Mutex<Vec<(Sequence, Acknowledgement)>>,
    pub timed_out: Mutex<Vec<Sequence>>,
    pub duplicates: Mutex<Vec<Sequence>>,
    pub faucet: Mutex<Vec<FaucetOutcome>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn steps(&self) -> Vec<HandshakeStep> {
        self.steps.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<Sequence> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn acknowledged(&self) -> Vec<Sequence> {
        self.acknowledged
            .lock()
            .unwrap()
            .iter()
            .map(|(sequence, _)| *sequence)
            .collect()
    }

    pub fn timed_out(&self) -> Vec<Sequence> {
        self.timed_out.lock().unwrap().clone()
    }

    pub fn duplicates(&self) -> Vec<Sequence> {
        self.duplicates.lock().unwrap().clone()
    }

    pub fn faucet(&self) -> Vec<FaucetOutcome> {
        self.faucet.lock().unwrap().clone()
    }
}

impl RelayObserver for RecordingObserver {
    fn on_handshake_step(&self, _path_id: &str, step: &HandshakeStep) {
        self.steps.lock().unwrap().push(step.clone());
    }

    fn on_packet_delivered(&self, packet: &Packet) {
        self.delivered.lock().unwrap().push(packet.sequence);
    }

    fn on_packet_acknowledged(&self, packet: &Packet, ack: &Acknowledgement) {
        self.acknowledged
            .lock()
            .unwrap()
            .push((packet.sequence, ack.clone()));
    }

    fn on_packet_timed_out(&self, packet: &Packet) {
        self.timed_out.lock().unwrap().push(packet.sequence);
    }

    fn on_duplicate_relay(&self, packet: &Packet) {
        self.duplicates.lock().unwrap().push(packet.sequence);
    }

    fn on_faucet_outcome(&self, outcome: &FaucetOutcome) {
        self.faucet.lock().unwrap().push(outcome.clone());
    }
}

pub fn coordinator(observer: Arc<RecordingObserver>) -> (HandshakeCoordinator, Arc<MemoryPathStore>) {
    let store = Arc::new(MemoryPathStore::new());
    let coordinator = HandshakeCoordinator::new(store.clone() as Arc<dyn PathStore>, observer);
    (coordinator, store)
}

/// Establishes a path with `options` and opens a relay session on it.
pub fn connect_session(
    chains: &TestChains,
    options: &ConnectOptions,
    observer: Arc<RecordingObserver>,
) -> (PathHandle, RelaySession<BaseChainHandle, BaseChainHandle>) {
    let (coordinator, _) = coordinator(observer.clone());

    let path = coordinator
        .connect(&chains.handle_a, &chains.handle_b, options)
        .unwrap();

    let session = RelaySession::new(
        chains.handle_a.clone(),
        chains.handle_b.clone(),
        path.record.clone(),
        observer,
    )
    .unwrap();

    (path, session)
}

pub fn transfer_data(amount: u128) -> Vec<u8> {
    PacketData::new(&Coin::new(amount, "stake"), "alice", "bob").to_bytes()
}

/// Sends a transfer from chain `a` over the path, with no timeout.
pub fn send_from_a(chains: &TestChains, path: &PathHandle, amount: u128) -> Packet {
    send_from_a_with_timeout(chains, path, amount, TimeoutHeight::Never)
}

pub fn send_from_a_with_timeout(
    chains: &TestChains,
    path: &PathHandle,
    amount: u128,
    timeout_height: TimeoutHeight,
) -> Packet {
    chains
        .chain_a
        .send_packet(
            path.record.a_side.port_id.clone(),
            path.record.a_side.channel_id.clone(),
            transfer_data(amount),
            timeout_height,
            Timestamp::none(),
        )
        .unwrap()
}

/// Sends a transfer from chain `b` back over the path, with no timeout.
pub fn send_from_b(chains: &TestChains, path: &PathHandle, amount: u128) -> Packet {
    chains
        .chain_b
        .send_packet(
            path.record.b_side.port_id.clone(),
            path.record.b_side.channel_id.clone(),
            transfer_data(amount),
            TimeoutHeight::Never,
            Timestamp::none(),
        )
        .unwrap()
}

/// A timeout height `blocks` above the current height of chain `b`.
pub fn timeout_in(chains: &TestChains, blocks: u64) -> TimeoutHeight {
    let height: Height = chains.chain_b.latest_height().add(blocks);
    TimeoutHeight::At(height)
}

pub fn seqs(sequences: &[u64]) -> Vec<Sequence> {
    sequences.iter().copied().map(Sequence::from).collect()
}
