use core::time::Duration;
use std::path::PathBuf;

use serial_test::serial;
use test_log::test;

use ibc_relay::config::{self, PathStoreConfig};

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics24_host::identifier::ChainId;

const CONFIG: &str = r#"
[global]
log_level = "debug"

[relay]
ordering = "ordered"
poll_interval = "250ms"

[path_store]
backend = "sled"
path = "/var/lib/relayer/paths"

[[chains]]
id = "ibc-0"
rpc_addr = "http://127.0.0.1:26657"
account = "relayer"
address_prefix = "cosmos"
gas_price = { price = 0.025, denom = "stake" }

[[chains]]
id = "ibc-1"
rpc_addr = "http://127.0.0.1:26557"
account = "relayer"
address_prefix = "cosmos"
gas_price = { price = 0.025, denom = "stake" }
faucet_addr = "http://127.0.0.1:4501"
"#;

#[test]
#[serial]
fn load_and_store_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let loaded = config::load(&path).unwrap();

    assert_eq!(loaded.relay.ordering, Order::Ordered);
    assert_eq!(loaded.relay.poll_interval, Duration::from_millis(250));
    assert_eq!(
        loaded.path_store,
        PathStoreConfig::Sled {
            path: PathBuf::from("/var/lib/relayer/paths")
        }
    );
    assert!(loaded.has_chain(&ChainId::from_string("ibc-1")));

    let copy = dir.path().join("copy.toml");
    config::store(&loaded, &copy).unwrap();

    let reloaded = config::load(&copy).unwrap();
    assert_eq!(reloaded.relay, loaded.relay);
    assert_eq!(reloaded.path_store, loaded.path_store);
    assert_eq!(reloaded.chains, loaded.chains);
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(config::load(dir.path().join("missing.toml")).is_err());
}
