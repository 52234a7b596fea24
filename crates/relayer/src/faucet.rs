//! Best-effort funding of the relayer account through a chain's faucet.
//!
//! Funding runs on its own thread and never holds up the handshake or the
//! relay workers: its outcome is only reported to the observer.

use core::str::FromStr;
use core::time::Duration;
use std::sync::Arc;
use std::thread;

use flex_error::{define_error, TraceError};
use http::uri::{Authority, Uri};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use ibc_relay_types::applications::transfer::coin::{display_coins, Coin};
use ibc_relay_types::applications::transfer::error::Error as TransferError;
use ibc_relay_types::core::ics24_host::identifier::ChainId;

use crate::chain::handle::ChainHandle;
use crate::config::ChainConfig;
use crate::error::Error as RelayerError;
use crate::observer::{FaucetOutcome, RelayObserver};

/// Port faucets listen on when no address is configured.
const DEFAULT_FAUCET_PORT: u16 = 4500;

const TRANSFER_OK: &str = "ok";

define_error! {
    FaucetError {
        Relayer
            [ RelayerError ]
            |_| { "failed to read the account to fund" },

        AddressGuess
            { rpc_addr: String }
            |e| { format!("cannot derive a faucet address from RPC address {}", e.rpc_addr) },

        Runtime
            [ TraceError<std::io::Error> ]
            |_| { "failed to start the faucet request runtime" },

        Client
            [ TraceError<reqwest::Error> ]
            |_| { "failed to build the faucet HTTP client" },

        Request
            { url: String }
            [ TraceError<reqwest::Error> ]
            |e| { format!("faucet request to {} failed", e.url) },

        Status
            {
                url: String,
                status: u16,
            }
            |e| { format!("faucet at {} answered with status {}", e.url, e.status) },

        ResponseBody
            { url: String }
            [ TraceError<reqwest::Error> ]
            |e| { format!("faucet at {} sent an unreadable response", e.url) },

        Refused
            {
                url: String,
                reason: String,
            }
            |e| { format!("faucet at {} refused the request: {}", e.url, e.reason) },

        InvalidCoin
            [ TransferError ]
            |_| { "faucet reported an invalid coin" },
    }
}

#[derive(Debug, Serialize)]
struct FaucetRequest<'a> {
    address: &'a str,
    coins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FaucetResponse {
    #[serde(default)]
    transfers: Vec<FaucetTransfer>,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct FaucetTransfer {
    coin: String,
    status: String,
}

/// The faucet address of a chain: the configured one, or the host of its
/// RPC address on the default faucet port.
pub fn faucet_address(config: &ChainConfig) -> Result<Uri, FaucetError> {
    if let Some(addr) = &config.faucet_addr {
        return Ok(addr.clone());
    }

    let rpc_addr = &config.rpc_addr;
    let guess_error = || FaucetError::address_guess(rpc_addr.to_string());

    let host = rpc_addr.host().ok_or_else(guess_error)?;
    let scheme = rpc_addr.scheme_str().unwrap_or("http");

    let authority = Authority::from_str(&format!("{host}:{DEFAULT_FAUCET_PORT}"))
        .map_err(|_| guess_error())?;

    Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query("/")
        .build()
        .map_err(|_| guess_error())
}

/// Asks the faucet at `url` to fund `address`, and returns the coins it
/// reports as transferred.
pub fn request_funds(url: &Uri, address: &str, timeout: Duration) -> Result<Vec<Coin>, FaucetError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(FaucetError::runtime)?;

    let response = runtime.block_on(post_request(url, address, timeout))?;

    if !response.error.is_empty() {
        return Err(FaucetError::refused(url.to_string(), response.error));
    }

    response
        .transfers
        .iter()
        .filter(|transfer| transfer.status == TRANSFER_OK)
        .map(|transfer| Coin::from_str(&transfer.coin).map_err(FaucetError::invalid_coin))
        .collect()
}

async fn post_request(
    url: &Uri,
    address: &str,
    timeout: Duration,
) -> Result<FaucetResponse, FaucetError> {
    let url = url.to_string();

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(FaucetError::client)?;

    let request = FaucetRequest {
        address,
        coins: Vec::new(),
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| FaucetError::request(url.clone(), e))?;

    if !response.status().is_success() {
        return Err(FaucetError::status(url, response.status().as_u16()));
    }

    response
        .json()
        .await
        .map_err(|e| FaucetError::response_body(url, e))
}

fn try_fund<Chain: ChainHandle>(chain: &Chain) -> FaucetOutcome {
    let chain_id = chain.id();

    let config = match chain.config() {
        Ok(config) => config,
        Err(e) => return failed(chain_id, FaucetError::relayer(e)),
    };

    let url = match faucet_address(&config) {
        Ok(url) => url,
        Err(e) => {
            return FaucetOutcome::Skipped {
                chain_id,
                reason: e.to_string(),
            }
        }
    };

    let result = chain
        .get_signer()
        .map_err(FaucetError::relayer)
        .and_then(|signer| {
            debug!(%url, address = %signer, "requesting funds");
            request_funds(&url, signer.as_str(), config.faucet_timeout)
        });

    match result {
        Ok(coins) => FaucetOutcome::Funded { chain_id, coins },
        Err(e) => failed(chain_id, e),
    }
}

fn failed(chain_id: ChainId, e: FaucetError) -> FaucetOutcome {
    FaucetOutcome::Failed {
        chain_id,
        reason: e.to_string(),
    }
}

/// A funding attempt running in the background.
pub struct FaucetTask {
    chain_id: ChainId,
    join_handle: thread::JoinHandle<FaucetOutcome>,
}

impl FaucetTask {
    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Waits for the attempt to finish.
    pub fn join(self) -> FaucetOutcome {
        let chain_id = self.chain_id;

        self.join_handle
            .join()
            .unwrap_or_else(|_| FaucetOutcome::Failed {
                chain_id,
                reason: "funding thread panicked".to_string(),
            })
    }
}

/// Starts funding the relayer account on `chain` and returns immediately.
/// The outcome goes to `observer`, and can also be awaited on the task.
pub fn spawn_fund<Chain: ChainHandle>(chain: Chain, observer: Arc<dyn RelayObserver>) -> FaucetTask {
    let chain_id = chain.id();
    let span = info_span!("faucet", chain = %chain_id);

    let join_handle = thread::spawn(move || {
        let _entered = span.enter();

        let outcome = try_fund(&chain);

        match &outcome {
            FaucetOutcome::Funded { coins, .. } => {
                info!("received {} from faucet", display_coins(coins))
            }
            other => info!("{}", other),
        }

        observer.on_faucet_outcome(&outcome);
        outcome
    });

    FaucetTask {
        chain_id,
        join_handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    use test_log::test;

    use crate::config::{parse_uri, GasPrice};

    fn config(rpc_addr: &str) -> ChainConfig {
        ChainConfig::with_defaults(
            ChainId::from_string("ibc-0"),
            parse_uri(rpc_addr).unwrap(),
            GasPrice::new(0.025, "stake".to_string()),
        )
    }

    /// Reads a whole HTTP request, headers and body.
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

    /// Serves a single HTTP request with `status` and `body`.
    fn serve_once(status: &'static str, body: &'static str) -> Uri {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            let request = read_request(&mut stream);
            assert!(request.starts_with("POST / "));
            assert!(request.contains(r#""address":"cosmos1xyz""#));

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        parse_uri(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn guesses_faucet_address_from_rpc() {
        let guessed = faucet_address(&config("https://rpc.example.com:26657")).unwrap();
        assert_eq!(guessed.to_string(), "https://rpc.example.com:4500/");

        let guessed = faucet_address(&config("http://localhost:26657")).unwrap();
        assert_eq!(guessed.to_string(), "http://localhost:4500/");
    }

    #[test]
    fn configured_faucet_address_wins() {
        let mut config = config("http://localhost:26657");
        config.faucet_addr = Some(parse_uri("http://faucet.example.com:8000/").unwrap());

        assert_eq!(
            faucet_address(&config).unwrap().to_string(),
            "http://faucet.example.com:8000/"
        );
    }

    #[test]
    fn collects_transferred_coins() {
        let url = serve_once(
            "200 OK",
            r#"{"transfers":[{"coin":"100token","status":"ok"},{"coin":"5stake","status":"error"}],"error":""}"#,
        );

        let coins = request_funds(&url, "cosmos1xyz", Duration::from_secs(5)).unwrap();
        assert_eq!(coins, vec![Coin::new(100, "token")]);
    }

    #[test]
    fn faucet_error_field_is_a_failure() {
        let url = serve_once("200 OK", r#"{"transfers":[],"error":"account is rate limited"}"#);

        let err = request_funds(&url, "cosmos1xyz", Duration::from_secs(5)).unwrap_err();
        assert!(err.to_string().contains("account is rate limited"));
    }

    #[test]
    fn non_success_status_is_a_failure() {
        let url = serve_once("503 Service Unavailable", "{}");

        let err = request_funds(&url, "cosmos1xyz", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err.detail(), FaucetErrorDetail::Status(e) if e.status == 503));
    }
}
