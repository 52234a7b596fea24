mod common;

use core::time::Duration;
use std::thread;
use std::time::Instant;

use serial_test::serial;
use test_log::test;

use ibc_relay::chain::mock::{MockChain, MockNetwork};
use ibc_relay::config::{Config, PathStoreConfig};
use ibc_relay::relay::configure;

use ibc_relay_types::core::ics04_channel::packet::Sequence;
use ibc_relay_types::core::ics04_channel::timeout::TimeoutHeight;
use ibc_relay_types::core::ics24_host::identifier::ChainId;
use ibc_relay_types::timestamp::Timestamp;

use common::{chain_config, test_backoff, transfer_data, RecordingObserver, RPC_A, RPC_B};

struct Operator {
    network: MockNetwork,
    chain_a: MockChain,
    chain_b: MockChain,
    config: Config,
}

fn operator(path_store: PathStoreConfig) -> Operator {
    let config_a = chain_config("ibc-0", RPC_A);
    let config_b = chain_config("ibc-1", RPC_B);

    let network = MockNetwork::new();
    let chain_a = MockChain::new(config_a.id.clone()).unwrap();
    let chain_b = MockChain::new(config_b.id.clone()).unwrap();

    network.register(&config_a.rpc_addr, chain_a.clone());
    network.register(&config_b.rpc_addr, chain_b.clone());

    let config = Config {
        path_store,
        chains: vec![config_a, config_b],
        ..Config::default()
    };

    Operator {
        network,
        chain_a,
        chain_b,
        config,
    }
}

fn ids() -> (ChainId, ChainId) {
    (ChainId::from_string("ibc-0"), ChainId::from_string("ibc-1"))
}

#[test]
fn configured_path_relays_packets() {
    let op = operator(PathStoreConfig::Memory);
    let (source, target) = ids();
    let observer = RecordingObserver::new();

    let mut configured = configure(
        &op.network,
        &op.config,
        &source,
        &target,
        test_backoff(),
        observer.clone(),
    )
    .unwrap();

    assert!(!configured.path.reused);
    assert_eq!(configured.path.path_id, "ibc-0-ibc-1");
    assert!(op
        .chain_b
        .channel_end(
            &configured.path.record.b_side.port_id,
            &configured.path.record.b_side.channel_id
        )
        .is_some());

    // nothing serves the guessed faucet addresses, which does not stop the configuration
    let outcomes = configured
        .faucets
        .drain(..)
        .map(|task| task.join())
        .collect::<Vec<_>>();
    let attempted_chains = outcomes
        .iter()
        .map(|outcome| outcome.chain_id().clone())
        .collect::<Vec<_>>();
    assert_eq!(attempted_chains, vec![source.clone(), target.clone()]);
    assert!(outcomes.iter().all(|outcome| !outcome.is_funded()));
    assert_eq!(observer.faucet().len(), 2);

    let record = configured.path.record.clone();
    let packet = op
        .chain_a
        .send_packet(
            record.a_side.port_id.clone(),
            record.a_side.channel_id.clone(),
            transfer_data(7),
            TimeoutHeight::Never,
            Timestamp::none(),
        )
        .unwrap();
    assert_eq!(packet.sequence, Sequence::from(1));

    let handle = configured.start();

    let deadline = Instant::now() + Duration::from_secs(10);
    while op
        .chain_a
        .has_packet_commitment(&record.a_side.port_id, &record.a_side.channel_id, packet.sequence)
    {
        assert!(Instant::now() < deadline, "packet was not relayed in time");
        thread::sleep(Duration::from_millis(10));
    }

    handle.shutdown_and_wait();

    assert_eq!(observer.delivered(), vec![packet.sequence]);
    assert_eq!(observer.acknowledged(), vec![packet.sequence]);
}

#[test]
#[serial]
fn second_run_reuses_the_recorded_path() {
    let dir = tempfile::tempdir().unwrap();
    let op = operator(PathStoreConfig::Sled {
        path: dir.path().to_path_buf(),
    });
    let (source, target) = ids();

    let first = configure(
        &op.network,
        &op.config,
        &source,
        &target,
        test_backoff(),
        RecordingObserver::new(),
    )
    .unwrap();
    assert!(!first.path.reused);

    let txs_a = op.chain_a.tx_count();
    let txs_b = op.chain_b.tx_count();

    let second = configure(
        &op.network,
        &op.config,
        &source,
        &target,
        test_backoff(),
        RecordingObserver::new(),
    )
    .unwrap();

    assert!(second.path.reused);
    assert_eq!(second.path.record, first.path.record);
    assert_eq!(op.chain_a.tx_count(), txs_a);
    assert_eq!(op.chain_b.tx_count(), txs_b);
}

#[test]
fn chain_missing_from_the_configuration_is_reported() {
    let op = operator(PathStoreConfig::Memory);
    let (source, _) = ids();

    let err = configure(
        &op.network,
        &op.config,
        &source,
        &ChainId::from_string("ibc-9"),
        test_backoff(),
        RecordingObserver::new(),
    )
    .err()
    .unwrap();

    assert!(!err.is_connectivity());
    assert!(err.to_string().contains("ibc-9"), "unexpected error: {err}");
}
