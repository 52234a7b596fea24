mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use test_log::test;

use ibc_relay::chain::endpoint::Connector;
use ibc_relay::chain::handle::ChainHandle;
use ibc_relay::foreign_client::ForeignClient;

use common::bootstrap;

const SUBMISSIONS: u64 = 200;

#[test]
fn committed_transactions_succeed_while_clones_observe_newer_heights() {
    let chains = bootstrap();
    let done = Arc::new(AtomicBool::new(false));
    let txs_before = chains.chain_b.tx_count();

    let watcher = {
        let done = done.clone();
        let chain_b = chains.chain_b.clone();
        let handle_b = chains.handle_b.clone();

        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                chain_b.advance_blocks(1);
                // a status racing a commit may be retried, never the commit itself
                let _ = handle_b.query_application_status();
            }
        })
    };

    let failures = (0..SUBMISSIONS)
        .map(|_| ForeignClient::new(chains.handle_b.clone(), chains.handle_a.clone()))
        .filter(Result::is_err)
        .count();

    done.store(true, Ordering::SeqCst);
    watcher.join().unwrap();

    assert_eq!(failures, 0);
    assert_eq!(chains.chain_b.tx_count() - txs_before, SUBMISSIONS);
}

#[test]
fn independent_networks_do_not_share_submission_locks() {
    let first = bootstrap();
    let second = bootstrap();

    let lock = first
        .network
        .account_locks()
        .lock_for(&first.config_b.id, &first.config_b.account);
    let other = second
        .network
        .account_locks()
        .lock_for(&second.config_b.id, &second.config_b.account);
    assert!(!Arc::ptr_eq(&lock, &other));

    // the same account on an unrelated network submits while the first one is held
    let _guard = lock.lock().unwrap();
    ForeignClient::new(second.handle_b.clone(), second.handle_a.clone()).unwrap();
}
