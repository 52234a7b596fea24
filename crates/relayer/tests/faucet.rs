mod common;

use core::time::Duration;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use test_log::test;

use ibc_relay::account::derive_signer;
use ibc_relay::config::parse_uri;
use ibc_relay::faucet::spawn_fund;
use ibc_relay::handshake::ConnectOptions;
use ibc_relay::observer::FaucetOutcome;

use ibc_relay_types::applications::transfer::coin::Coin;

use common::{bootstrap_with, chain_config, coordinator, RecordingObserver, RPC_A, RPC_B};

fn read_request(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0; 1024];

    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            if request.len() >= end + 4 + length {
                return text;
            }
        }
    }

    String::from_utf8_lossy(&request).to_string()
}

/// A faucet answering one request once `release` fires. The request is
/// sent back on the returned receiver.
fn held_faucet(release: mpsc::Receiver<()>, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        request_tx.send(request).unwrap();

        release.recv().unwrap();

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
    });

    (format!("http://{addr}/"), request_rx)
}

#[test]
fn funding_runs_alongside_the_handshake() {
    let (release_tx, release_rx) = mpsc::channel();
    let (faucet_url, requests) = held_faucet(
        release_rx,
        r#"{"error":"","transfers":[{"coin":"10000000stake","status":"ok"}]}"#,
    );

    let mut config_a = chain_config("ibc-0", RPC_A);
    config_a.faucet_addr = Some(parse_uri(&faucet_url).unwrap());
    config_a.faucet_timeout = Duration::from_secs(30);

    let chains = bootstrap_with(config_a.clone(), chain_config("ibc-1", RPC_B));
    let observer = RecordingObserver::new();

    let task = spawn_fund(chains.handle_a.clone(), observer.clone());

    // the faucet has not answered yet, the handshake does not wait for it
    let (coordinator, _) = coordinator(observer.clone());
    let path = coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();
    assert!(!path.reused);

    let request = requests.recv().unwrap();
    let address = derive_signer(&config_a.account, &config_a.address_prefix).unwrap();
    assert!(request.contains(&format!(r#""address":"{address}""#)));

    release_tx.send(()).unwrap();

    let outcome = task.join();
    assert_eq!(
        outcome,
        FaucetOutcome::Funded {
            chain_id: config_a.id.clone(),
            coins: vec![Coin::new(10_000_000, "stake")],
        }
    );
    assert_eq!(observer.faucet(), vec![outcome]);
}

#[test]
fn unreachable_faucet_is_not_fatal() {
    // bind then drop, so that nothing listens on the port
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let mut config_a = chain_config("ibc-0", RPC_A);
    config_a.faucet_addr = Some(parse_uri(&format!("http://{addr}/")).unwrap());

    let chains = bootstrap_with(config_a, chain_config("ibc-1", RPC_B));
    let observer = RecordingObserver::new();

    let task = spawn_fund(chains.handle_a.clone(), observer.clone());

    let (coordinator, _) = coordinator(observer.clone());
    coordinator
        .connect(&chains.handle_a, &chains.handle_b, &ConnectOptions::default())
        .unwrap();

    let outcome = task.join();
    assert!(
        matches!(outcome, FaucetOutcome::Failed { .. }),
        "unexpected outcome: {outcome}"
    );
    assert_eq!(observer.faucet().len(), 1);
}
