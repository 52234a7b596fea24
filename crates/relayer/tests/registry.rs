mod common;

use std::sync::Arc;

use serial_test::serial;
use test_log::test;

use ibc_relay::config::PathStoreConfig;
use ibc_relay::handshake::{ConnectOptions, HandshakeCoordinator};
use ibc_relay::registry::{self, PathStore, SledPathStore};
use ibc_relay::session::RelaySession;

use common::{bootstrap, send_from_a, seqs, RecordingObserver};

#[test]
#[serial]
fn recorded_path_is_reused_after_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let chains = bootstrap();

    let path = {
        let store = Arc::new(SledPathStore::open(dir.path()).unwrap());
        let coordinator = HandshakeCoordinator::new(store.clone(), RecordingObserver::new());

        let path = coordinator
            .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
            .unwrap();

        assert!(!path.reused);
        assert_eq!(store.write_count(), 1);
        path
    };

    let txs_a = chains.chain_a.tx_count();
    let txs_b = chains.chain_b.tx_count();

    let store = Arc::new(SledPathStore::open(dir.path()).unwrap());
    let coordinator = HandshakeCoordinator::new(store.clone(), RecordingObserver::new());

    let reused = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();

    assert!(reused.reused);
    assert_eq!(reused.record, path.record);
    assert_eq!(store.write_count(), 0);
    assert_eq!(chains.chain_a.tx_count(), txs_a);
    assert_eq!(chains.chain_b.tx_count(), txs_b);

    // the reused path relays
    let session = RelaySession::new(
        chains.handle_a.clone(),
        chains.handle_b.clone(),
        reused.record.clone(),
        RecordingObserver::new(),
    )
    .unwrap();

    send_from_a(&chains, &reused, 42);

    let summary = session.relay_once().unwrap();
    assert_eq!(summary.delivered, seqs(&[1]));
}

#[test]
#[serial]
fn store_is_selected_by_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let chains = bootstrap();

    let config = PathStoreConfig::Sled {
        path: dir.path().join("paths"),
    };

    let path = {
        let store = registry::from_config(&config).unwrap();
        let coordinator = HandshakeCoordinator::new(store, RecordingObserver::new());

        coordinator
            .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
            .unwrap()
    };

    let store = registry::from_config(&config).unwrap();
    assert_eq!(store.lookup(&path.record.key()).unwrap(), Some(path.record));

    // the in-memory store starts empty every time
    let memory = registry::from_config(&PathStoreConfig::Memory).unwrap();
    assert_eq!(memory.lookup(&store_key(&chains)).unwrap(), None);
}

fn store_key(chains: &common::TestChains) -> registry::PathKey {
    registry::PathKey::new(
        chains.config_a.id.clone(),
        chains.config_b.id.clone(),
        ibc_relay_types::core::ics24_host::identifier::PortId::transfer(),
    )
}
