mod common;

use core::str::FromStr;
use std::sync::Arc;

use test_log::test;

use ibc_relay::chain::mock::PortModule;
use ibc_relay::handshake::ConnectOptions;
use ibc_relay::observer::HandshakeStep;
use ibc_relay::registry::PathStore;

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::PortId;

use common::{bootstrap, coordinator, RecordingObserver};

#[test]
fn handshake_opens_a_path_and_records_it() {
    let chains = bootstrap();
    let observer = RecordingObserver::new();
    let (coordinator, store) = coordinator(observer.clone());

    let path = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();

    assert!(!path.reused);
    assert_eq!(path.path_id, "ibc-0-ibc-1");
    assert_eq!(path.record.ordering, Order::Unordered);
    assert_eq!(path.record.version, Version::ics20());

    let a_end = chains
        .chain_a
        .channel_end(&path.record.a_side.port_id, &path.record.a_side.channel_id)
        .unwrap();
    let b_end = chains
        .chain_b
        .channel_end(&path.record.b_side.port_id, &path.record.b_side.channel_id)
        .unwrap();

    assert!(a_end.is_open());
    assert!(b_end.is_open());
    assert_eq!(
        a_end.counterparty().channel_id(),
        Some(&path.record.b_side.channel_id)
    );
    assert_eq!(
        b_end.counterparty().channel_id(),
        Some(&path.record.a_side.channel_id)
    );

    assert_eq!(
        observer.steps(),
        vec![
            HandshakeStep::ClientsCreated,
            HandshakeStep::ConnectionOpen,
            HandshakeStep::ChannelOpen,
            HandshakeStep::PathSaved,
        ]
    );

    assert_eq!(store.write_count(), 1);
    assert_eq!(
        store.lookup(&path.record.key()).unwrap(),
        Some(path.record.clone())
    );
}

#[test]
fn second_handshake_reuses_the_path_without_writes() {
    let chains = bootstrap();
    let observer = RecordingObserver::new();
    let (coordinator, store) = coordinator(observer.clone());
    let options = ConnectOptions::default();

    let first = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &options)
        .unwrap();

    let txs_a = chains.chain_a.tx_count();
    let txs_b = chains.chain_b.tx_count();

    let second = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &options)
        .unwrap();

    assert!(second.reused);
    assert_eq!(second.record, first.record);

    assert_eq!(chains.chain_a.tx_count(), txs_a);
    assert_eq!(chains.chain_b.tx_count(), txs_b);
    assert_eq!(store.write_count(), 1);

    assert_eq!(observer.steps().last(), Some(&HandshakeStep::PathReused));
}

#[test]
fn reversed_handshake_reuses_the_flipped_path() {
    let chains = bootstrap();
    let (coordinator, store) = coordinator(RecordingObserver::new());
    let options = ConnectOptions::default();

    let forward = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &options)
        .unwrap();

    let txs_a = chains.chain_a.tx_count();

    let backward = coordinator
        .connect(&chains.handle_b, &chains.handle_a, &options)
        .unwrap();

    assert!(backward.reused);
    assert_eq!(backward.path_id, "ibc-1-ibc-0");
    assert_eq!(backward.record, forward.record.flipped());
    assert_eq!(chains.chain_a.tx_count(), txs_a);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn recorded_path_with_other_ordering_is_not_reused() {
    let chains = bootstrap();
    let (coordinator, store) = coordinator(RecordingObserver::new());

    let unordered = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();

    let ordered = coordinator
        .connect(
            &chains.handle_a,
            &chains.handle_b,
            &ConnectOptions::default().with_ordering(Order::Ordered),
        )
        .unwrap();

    assert!(!ordered.reused);
    assert_eq!(ordered.record.ordering, Order::Ordered);
    assert_ne!(ordered.record.a_side.channel_id, unordered.record.a_side.channel_id);

    let end = chains
        .chain_b
        .channel_end(&ordered.record.b_side.port_id, &ordered.record.b_side.channel_id)
        .unwrap();
    assert_eq!(*end.ordering(), Order::Ordered);

    // the ordered path now overwrites the unordered one
    assert_eq!(store.write_count(), 2);
    assert_eq!(
        store.lookup(&ordered.record.key()).unwrap(),
        Some(ordered.record)
    );
}

#[test]
fn different_versions_fail_before_any_transaction() {
    let chains = bootstrap();
    let (coordinator, store) = coordinator(RecordingObserver::new());

    let options = ConnectOptions {
        b_version: Version::new("ics20-2".to_string()),
        ..ConnectOptions::default()
    };

    let err = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &options)
        .unwrap_err();

    assert!(err.is_protocol());
    assert!(!err.is_connectivity());

    assert_eq!(chains.chain_a.tx_count(), 0);
    assert_eq!(chains.chain_b.tx_count(), 0);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn version_refused_by_the_counterparty_module_is_a_protocol_error() {
    let chains = bootstrap();
    let echo = PortId::from_str("echo").unwrap();

    chains
        .chain_a
        .bind_port(echo.clone(), PortModule::echo(Version::new("echo-1".to_string())));
    chains
        .chain_b
        .bind_port(echo.clone(), PortModule::echo(Version::new("echo-2".to_string())));

    let (coordinator, store) = coordinator(RecordingObserver::new());

    let options = ConnectOptions {
        a_port: echo.clone(),
        b_port: echo,
        ..ConnectOptions::default()
    }
    .with_version(Version::new("echo-1".to_string()));

    let err = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &options)
        .unwrap_err();

    assert!(err.is_protocol(), "unexpected error: {err}");
    assert_eq!(store.write_count(), 0);
}

#[test]
fn ordered_request_against_unordered_module_is_a_protocol_error() {
    let chains = bootstrap();

    chains.chain_b.bind_port(
        PortId::transfer(),
        PortModule::transfer().with_orderings(vec![Order::Unordered]),
    );

    let (coordinator, store) = coordinator(RecordingObserver::new());

    let err = coordinator
        .connect(
            &chains.handle_a,
            &chains.handle_b,
            &ConnectOptions::default().with_ordering(Order::Ordered),
        )
        .unwrap_err();

    assert!(err.is_protocol(), "unexpected error: {err}");
    assert_eq!(store.write_count(), 0);
}

#[test]
fn unreachable_chain_fails_with_a_connectivity_error() {
    let chains = bootstrap();
    chains.chain_b.set_offline(true);

    let (coordinator, store) = coordinator(RecordingObserver::new());

    let err = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap_err();

    assert!(err.is_connectivity(), "unexpected error: {err}");
    assert_eq!(store.write_count(), 0);
}

#[test]
fn path_found_in_a_shared_registry_is_reused_by_another_coordinator() {
    let chains = bootstrap();
    let (first, store) = coordinator(RecordingObserver::new());

    let path = first
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();

    let second = ibc_relay::handshake::HandshakeCoordinator::new(
        store.clone(),
        Arc::new(ibc_relay::observer::NoopObserver),
    );

    let reused = second
        .connect(
            &chains.other_handle_a(),
            &chains.other_handle_b(),
            &ConnectOptions::default(),
        )
        .unwrap();

    assert!(reused.reused);
    assert_eq!(reused.record, path.record);
}
