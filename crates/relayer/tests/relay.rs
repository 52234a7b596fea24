mod common;

use core::time::Duration;
use std::thread;
use std::time::Instant;

use test_log::test;

use ibc_relay::chain::handle::{Backoff, BaseChainHandle, ChainHandle};
use ibc_relay::handshake::ConnectOptions;
use ibc_relay::link::PacketState;
use ibc_relay::session::RelaySession;
use ibc_relay::spawn::spawn_chain_runtime_with_config;

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::packet::Sequence;

use common::{
    bootstrap, connect_session, send_from_a, send_from_a_with_timeout, send_from_b, seqs,
    test_backoff, timeout_in, RecordingObserver,
};

#[test]
fn unordered_packets_are_delivered_and_acknowledged() {
    let chains = bootstrap();
    let observer = RecordingObserver::new();
    let (path, session) = connect_session(&chains, &ConnectOptions::default(), observer.clone());

    for amount in [10, 20, 30] {
        send_from_a(&chains, &path, amount);
    }

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, seqs(&[1, 2, 3]));
    assert_eq!(summary.acknowledged, seqs(&[1, 2, 3]));
    assert!(summary.timed_out.is_empty());
    assert!(summary.failed.is_empty());

    assert_eq!(observer.delivered(), seqs(&[1, 2, 3]));
    assert_eq!(observer.acknowledged(), seqs(&[1, 2, 3]));

    let (a_to_b, b_to_a) = session.ledgers();
    assert_eq!(
        a_to_b.sequences_in(PacketState::Acknowledged),
        seqs(&[1, 2, 3])
    );
    assert!(b_to_a.is_empty());

    for sequence in seqs(&[1, 2, 3]) {
        assert!(!chains.chain_a.has_packet_commitment(
            &path.record.a_side.port_id,
            &path.record.a_side.channel_id,
            sequence
        ));
        assert!(chains.chain_b.has_packet_receipt(
            &path.record.b_side.port_id,
            &path.record.b_side.channel_id,
            sequence
        ));
    }

    // nothing left to do
    let summary = session.relay_once().unwrap();
    assert!(summary.is_empty());
}

#[test]
fn unreachable_destination_aborts_the_pass_and_a_new_session_resumes() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    for amount in [1, 2, 3] {
        send_from_a(&chains, &path, amount);
    }

    chains.chain_b.set_offline(true);

    let err = session.relay_once().unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err}");

    drop(session);
    chains.chain_b.set_offline(false);

    let session = RelaySession::new(
        chains.handle_a.clone(),
        chains.handle_b.clone(),
        path.record.clone(),
        RecordingObserver::new(),
    )
    .unwrap();

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, seqs(&[1, 2, 3]));
    assert_eq!(summary.acknowledged, seqs(&[1, 2, 3]));
}

#[test]
fn restarted_session_acknowledges_without_delivering_again() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    let packet = send_from_a(&chains, &path, 5);

    // the acknowledgement is rejected as stale twice on chain a
    chains.chain_a.reject_next_proofs(2);

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, vec![packet.sequence]);
    assert!(summary.acknowledged.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].1.is_stale_proof());

    let (a_to_b, _) = session.ledgers();
    assert_eq!(a_to_b.state(packet.sequence), Some(PacketState::Delivered));

    drop(session);

    let session = RelaySession::new(
        chains.handle_a.clone(),
        chains.handle_b.clone(),
        path.record.clone(),
        RecordingObserver::new(),
    )
    .unwrap();

    let summary = session.relay_once().unwrap();

    assert!(summary.delivered.is_empty());
    assert_eq!(summary.acknowledged, vec![packet.sequence]);

    assert_eq!(
        chains.chain_b.recv_count(
            &path.record.b_side.port_id,
            &path.record.b_side.channel_id,
            packet.sequence
        ),
        1
    );
}

#[test]
fn ordered_channel_delivers_in_order_then_times_out_the_head() {
    let chains = bootstrap();
    let observer = RecordingObserver::new();
    let (path, session) = connect_session(
        &chains,
        &ConnectOptions::default().with_ordering(Order::Ordered),
        observer.clone(),
    );

    send_from_a(&chains, &path, 1);
    let expiring = send_from_a_with_timeout(&chains, &path, 2, timeout_in(&chains, 2));

    chains.chain_b.advance_blocks(2);

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, seqs(&[1]));
    assert_eq!(summary.acknowledged, seqs(&[1]));
    assert!(summary.timed_out.is_empty());

    let (a_to_b, _) = session.ledgers();
    assert_eq!(a_to_b.state(expiring.sequence), Some(PacketState::Committed));

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.timed_out, vec![expiring.sequence]);
    assert!(summary.delivered.is_empty());
    assert_eq!(observer.timed_out(), vec![expiring.sequence]);

    let (a_to_b, _) = session.ledgers();
    assert_eq!(a_to_b.state(expiring.sequence), Some(PacketState::TimedOut));

    let end = chains
        .chain_a
        .channel_end(&path.record.a_side.port_id, &path.record.a_side.channel_id)
        .unwrap();
    assert!(end.is_closed());

    assert_eq!(
        chains.chain_b.recv_count(
            &path.record.b_side.port_id,
            &path.record.b_side.channel_id,
            expiring.sequence
        ),
        0
    );
}

#[test]
fn ordered_channel_blocks_behind_an_undeliverable_packet() {
    let chains = bootstrap();
    let (path, session) = connect_session(
        &chains,
        &ConnectOptions::default().with_ordering(Order::Ordered),
        RecordingObserver::new(),
    );

    send_from_a(&chains, &path, 1);
    send_from_a(&chains, &path, 2);

    // the first packet fails twice with a stale proof, the second must wait
    chains.chain_b.reject_next_proofs(2);

    let summary = session.relay_once().unwrap();

    assert!(summary.delivered.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, Sequence::from(1));

    let summary = session.relay_once().unwrap();
    assert_eq!(summary.delivered, seqs(&[1, 2]));
}

#[test]
fn packet_times_out_exactly_at_its_timeout_height() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    let packet = send_from_a_with_timeout(&chains, &path, 7, timeout_in(&chains, 2));

    chains.chain_b.advance_blocks(1);

    let summary = session.a_to_b().relay_timeouts().unwrap();
    assert!(summary.timed_out.is_empty());
    assert!(chains.chain_a.has_packet_commitment(
        &path.record.a_side.port_id,
        &path.record.a_side.channel_id,
        packet.sequence
    ));

    chains.chain_b.advance_blocks(1);

    let summary = session.a_to_b().relay_timeouts().unwrap();
    assert_eq!(summary.timed_out, vec![packet.sequence]);
    assert!(!chains.chain_a.has_packet_commitment(
        &path.record.a_side.port_id,
        &path.record.a_side.channel_id,
        packet.sequence
    ));

    // unordered channels stay open
    let end = chains
        .chain_a
        .channel_end(&path.record.a_side.port_id, &path.record.a_side.channel_id)
        .unwrap();
    assert!(end.is_open());
}

#[test]
fn expired_packet_is_not_delivered() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    let expired = send_from_a_with_timeout(&chains, &path, 7, timeout_in(&chains, 1));
    let live = send_from_a(&chains, &path, 8);

    chains.chain_b.advance_blocks(1);

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.timed_out, vec![expired.sequence]);
    assert_eq!(summary.delivered, vec![live.sequence]);
    assert!(!chains.chain_b.has_packet_receipt(
        &path.record.b_side.port_id,
        &path.record.b_side.channel_id,
        expired.sequence
    ));
}

#[test]
fn single_stale_proof_is_retried() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    send_from_a(&chains, &path, 1);
    chains.chain_b.reject_next_proofs(1);

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, seqs(&[1]));
    assert_eq!(summary.acknowledged, seqs(&[1]));
    assert!(summary.failed.is_empty());
}

#[test]
fn repeated_stale_proof_is_a_protocol_failure_of_the_packet() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    send_from_a(&chains, &path, 1);
    chains.chain_b.reject_next_proofs(2);

    let summary = session.relay_once().unwrap();

    assert!(summary.delivered.is_empty());
    assert_eq!(summary.failed.len(), 1);

    let (sequence, err) = &summary.failed[0];
    assert_eq!(*sequence, Sequence::from(1));
    assert!(err.is_stale_proof());
    assert!(err.is_protocol());
    assert!(!err.is_connectivity());

    let (a_to_b, _) = session.ledgers();
    assert_eq!(a_to_b.state(*sequence), Some(PacketState::Committed));

    let summary = session.relay_once().unwrap();
    assert_eq!(summary.delivered, seqs(&[1]));
}

#[test]
fn concurrent_relayers_deliver_each_packet_once() {
    let chains = bootstrap();
    let (path, first) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    let second = RelaySession::new(
        chains.other_handle_a(),
        chains.other_handle_b(),
        path.record.clone(),
        RecordingObserver::new(),
    )
    .unwrap();

    for amount in [1, 2, 3] {
        send_from_a(&chains, &path, amount);
    }

    let mut delivered = thread::scope(|s| {
        let relay = |session: &RelaySession<BaseChainHandle, BaseChainHandle>| {
            session.relay_once().map(|summary| summary.delivered)
        };

        let first = s.spawn(|| relay(&first));
        let second = s.spawn(|| relay(&second));

        let mut delivered = first.join().unwrap().unwrap();
        delivered.extend(second.join().unwrap().unwrap());
        delivered
    });

    delivered.sort();
    assert_eq!(delivered, seqs(&[1, 2, 3]));

    for sequence in seqs(&[1, 2, 3]) {
        assert_eq!(
            chains.chain_b.recv_count(
                &path.record.b_side.port_id,
                &path.record.b_side.channel_id,
                sequence
            ),
            1
        );
    }

    // whatever one relayer lost to the other is finished by the next pass
    first.relay_once().unwrap();

    for sequence in seqs(&[1, 2, 3]) {
        assert!(!chains.chain_a.has_packet_commitment(
            &path.record.a_side.port_id,
            &path.record.a_side.channel_id,
            sequence
        ));
    }
}

#[test]
fn spawned_workers_relay_until_shut_down() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    for amount in [1, 2] {
        send_from_a(&chains, &path, amount);
    }

    let handle = session.spawn(Duration::from_millis(10));

    let deadline = Instant::now() + Duration::from_secs(10);
    let cleared = || {
        seqs(&[1, 2]).into_iter().all(|sequence| {
            !chains.chain_a.has_packet_commitment(
                &path.record.a_side.port_id,
                &path.record.a_side.channel_id,
                sequence,
            )
        })
    };

    while !cleared() {
        assert!(Instant::now() < deadline, "packets were not relayed in time");
        thread::sleep(Duration::from_millis(10));
    }

    assert!(!handle.is_stopped());
    handle.shutdown_and_wait();

    assert!(session.cancel_token().is_cancelled());

    // a cancelled session does nothing
    send_from_a(&chains, &path, 3);
    let summary = session.relay_once().unwrap();
    assert!(summary.is_empty());
}

#[test]
fn failing_direction_does_not_keep_the_other_from_relaying() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    send_from_a(&chains, &path, 1);
    let packet = send_from_b(&chains, &path, 2);

    // enough for the first request of `a` to `b` to exhaust its retries on chain a
    chains
        .chain_a
        .drop_next_requests(test_backoff().max_retries as u64 + 1);

    let err = session.relay_once().unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err}");

    assert_eq!(
        chains.chain_a.recv_count(
            &path.record.a_side.port_id,
            &path.record.a_side.channel_id,
            packet.sequence
        ),
        1
    );

    let (a_to_b, b_to_a) = session.ledgers();
    assert_eq!(
        b_to_a.state(packet.sequence),
        Some(PacketState::Acknowledged)
    );
    assert!(a_to_b.is_empty());

    let summary = session.relay_once().unwrap();
    assert_eq!(summary.delivered, seqs(&[1]));
    assert_eq!(summary.acknowledged, seqs(&[1]));
}

#[test]
fn lagging_node_aborts_the_pass_until_it_catches_up() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    send_from_a(&chains, &path, 1);

    chains.handle_b.query_latest_height().unwrap();
    chains.chain_b.set_lag(3);

    let err = session.relay_once().unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err}");
    assert_eq!(
        chains.chain_b.recv_count(
            &path.record.b_side.port_id,
            &path.record.b_side.channel_id,
            Sequence::from(1)
        ),
        0
    );

    chains.chain_b.set_lag(0);

    let summary = session.relay_once().unwrap();
    assert_eq!(summary.delivered, seqs(&[1]));
    assert_eq!(summary.acknowledged, seqs(&[1]));
}

#[test]
fn lagging_node_is_retried_until_it_catches_up() {
    let chains = bootstrap();
    let (path, _) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    let patient = Backoff {
        initial: Duration::from_millis(10),
        factor: 2,
        max_delay: Duration::from_millis(50),
        max_retries: 10,
    };

    let handle_b: BaseChainHandle =
        spawn_chain_runtime_with_config(&chains.network, &chains.config_b, patient).unwrap();

    let session = RelaySession::new(
        chains.handle_a.clone(),
        handle_b.clone(),
        path.record.clone(),
        RecordingObserver::new(),
    )
    .unwrap();

    send_from_a(&chains, &path, 1);

    handle_b.query_latest_height().unwrap();
    chains.chain_b.set_lag(3);

    let catch_up = {
        let chain_b = chains.chain_b.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            chain_b.set_lag(0);
        })
    };

    let start = Instant::now();
    let summary = session.relay_once().unwrap();
    catch_up.join().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(summary.delivered, seqs(&[1]));
    assert_eq!(summary.acknowledged, seqs(&[1]));
}

#[test]
fn relaying_recovers_after_the_destination_client_was_pruned() {
    let chains = bootstrap();
    let (path, session) =
        connect_session(&chains, &ConnectOptions::default(), RecordingObserver::new());

    send_from_a(&chains, &path, 1);
    session.relay_once().unwrap();

    let client_id = &path.record.b_side.client_id;
    assert!(chains.chain_b.consensus_heights(client_id).len() > 1);

    chains.chain_b.prune_consensus_states(client_id);
    assert_eq!(chains.chain_b.consensus_heights(client_id).len(), 1);

    chains.chain_a.advance_blocks(2);
    send_from_a(&chains, &path, 2);

    let summary = session.relay_once().unwrap();

    assert_eq!(summary.delivered, seqs(&[2]));
    assert_eq!(summary.acknowledged, seqs(&[2]));
    assert!(summary.failed.is_empty());
    assert!(chains.chain_b.consensus_heights(client_id).len() > 1);
}

