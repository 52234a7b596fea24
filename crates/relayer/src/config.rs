//! Relayer configuration

pub mod error;

use core::cmp::Ordering;
use core::fmt::{Display, Error as FmtError, Formatter};
use core::str::FromStr;
use core::time::Duration;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use http::Uri;
use serde_derive::{Deserialize, Serialize};

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::{ChainId, PortId};

pub use error::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasPrice {
    pub price: f64,
    pub denom: String,
}

impl GasPrice {
    pub const fn new(price: f64, denom: String) -> Self {
        Self { price, denom }
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}{}", self.price, self.denom)
    }
}

impl FromStr for GasPrice {
    type Err = Error;

    fn from_str(price_in: &str) -> Result<Self, Self::Err> {
        let spos = price_in.find(char::is_alphabetic);

        match spos {
            Some(position) => {
                let (price_str, denom) = price_in.split_at(position);

                let price = price_str
                    .parse::<f64>()
                    .map_err(|_| Error::invalid_gas_price(price_in.to_string()))?;

                if !price.is_finite() || price < 0.0 {
                    return Err(Error::invalid_gas_price(price_in.to_string()));
                }

                Ok(GasPrice {
                    price,
                    denom: denom.to_owned(),
                })
            }

            None => Err(Error::invalid_gas_price(price_in.to_string())),
        }
    }
}

// Note: Only `PartialOrd` is implemented for `GasPrice` because gas
// prices must be of the same denomination in order to be compared.
impl PartialOrd for GasPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.denom == other.denom {
            self.price.partial_cmp(&other.price)
        } else {
            None
        }
    }
}

/// Defaults for various fields
pub mod default {
    use super::*;

    pub fn poll_interval() -> Duration {
        Duration::from_secs(1)
    }

    pub fn rpc_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn faucet_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn max_block_time() -> Duration {
        Duration::from_secs(30)
    }

    pub fn gas_limit() -> u64 {
        300_000
    }

    pub fn address_prefix() -> String {
        "cosmos".to_string()
    }

    pub fn account() -> String {
        "default".to_string()
    }

    pub fn port_id() -> PortId {
        PortId::transfer()
    }

    pub fn version() -> Version {
        Version::ics20()
    }

    pub fn ordering() -> Order {
        Order::Unordered
    }

    pub fn source_rpc_addr() -> Uri {
        Uri::from_static("http://localhost:26657")
    }

    pub fn target_rpc_addr() -> Uri {
        Uri::from_static("https://rpc.cosmos.network:443")
    }

    pub fn source_gas_price() -> GasPrice {
        GasPrice::new(0.00025, "stake".to_string())
    }

    pub fn target_gas_price() -> GasPrice {
        GasPrice::new(0.025, "uatom".to_string())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub path_store: PathStoreConfig,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainConfig>,
}

impl Config {
    pub fn has_chain(&self, id: &ChainId) -> bool {
        self.chains.iter().any(|c| c.id == *id)
    }

    pub fn find_chain(&self, id: &ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == *id)
    }

    pub fn find_chain_mut(&mut self, id: &ChainId) -> Option<&mut ChainConfig> {
        self.chains.iter_mut().find(|c| c.id == *id)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

/// How the relay path between the two chains is set up and driven.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default = "default::poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default = "default::ordering")]
    pub ordering: Order,
    #[serde(default = "default::port_id")]
    pub source_port: PortId,
    #[serde(default = "default::port_id")]
    pub target_port: PortId,
    #[serde(default = "default::version")]
    pub source_version: Version,
    #[serde(default = "default::version")]
    pub target_version: Version,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: default::poll_interval(),
            ordering: default::ordering(),
            source_port: default::port_id(),
            target_port: default::port_id(),
            source_version: default::version(),
            target_version: default::version(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase", deny_unknown_fields)]
pub enum PathStoreConfig {
    #[default]
    Memory,
    Sled {
        path: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub id: ChainId,

    #[serde(with = "self::uri")]
    pub rpc_addr: Uri,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "self::uri::option"
    )]
    pub faucet_addr: Option<Uri>,

    #[serde(default = "default::account")]
    pub account: String,

    #[serde(default = "default::gas_limit")]
    pub gas_limit: u64,

    #[serde(default = "default::address_prefix")]
    pub address_prefix: String,

    #[serde(default = "default::max_block_time", with = "humantime_serde")]
    pub max_block_time: Duration,

    #[serde(default = "default::rpc_timeout", with = "humantime_serde")]
    pub rpc_timeout: Duration,

    #[serde(default = "default::faucet_timeout", with = "humantime_serde")]
    pub faucet_timeout: Duration,

    // Tables have to come last when serializing to TOML, and `GasPrice` is one.
    pub gas_price: GasPrice,
}

impl ChainConfig {
    /// A configuration for the source chain of a new path.
    pub fn source(id: ChainId) -> Self {
        Self::with_defaults(id, default::source_rpc_addr(), default::source_gas_price())
    }

    /// A configuration for the target chain of a new path.
    pub fn target(id: ChainId) -> Self {
        Self::with_defaults(id, default::target_rpc_addr(), default::target_gas_price())
    }

    pub fn with_defaults(id: ChainId, rpc_addr: Uri, gas_price: GasPrice) -> Self {
        Self {
            id,
            rpc_addr,
            faucet_addr: None,
            account: default::account(),
            gas_limit: default::gas_limit(),
            address_prefix: default::address_prefix(),
            max_block_time: default::max_block_time(),
            rpc_timeout: default::rpc_timeout(),
            faucet_timeout: default::faucet_timeout(),
            gas_price,
        }
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
    let config_toml = fs::read_to_string(&path).map_err(Error::io)?;

    let config = toml::from_str::<Config>(&config_toml[..]).map_err(Error::decode)?;

    Ok(config)
}

pub fn store(config: &Config, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut file = if path.as_ref().exists() {
        fs::OpenOptions::new().write(true).truncate(true).open(path)
    } else {
        File::create(path)
    }
    .map_err(Error::io)?;

    store_writer(config, &mut file)
}

pub(crate) fn store_writer(config: &Config, mut writer: impl Write) -> Result<(), Error> {
    let toml_config = toml::to_string_pretty(&config).map_err(Error::encode)?;

    writeln!(writer, "{toml_config}").map_err(Error::io)?;

    Ok(())
}

/// Serde support for [`Uri`] fields, through their string form.
pub(crate) mod uri {
    use http::Uri;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(uri: &Uri, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(uri)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uri, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            uri: &Option<Uri>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match uri {
                Some(uri) => serializer.collect_str(uri),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Uri>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            s.map(|s| s.parse().map_err(D::Error::custom)).transpose()
        }
    }
}

/// Parses an URI from configuration or user input.
pub fn parse_uri(uri: &str) -> Result<Uri, Error> {
    uri.parse().map_err(|e| Error::invalid_uri(uri.to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    const CONFIG: &str = r#"
        [global]
        log_level = "debug"

        [relay]
        poll_interval = "250ms"
        ordering = "ordered"

        [path_store]
        backend = "sled"
        path = "/tmp/paths"

        [[chains]]
        id = "ibc-0"
        rpc_addr = "http://127.0.0.1:26657"
        gas_price = { price = 0.025, denom = "stake" }

        [[chains]]
        id = "ibc-1"
        rpc_addr = "http://127.0.0.1:26557"
        faucet_addr = "http://127.0.0.1:4500"
        address_prefix = "osmo"
        gas_limit = 500000
        max_block_time = "10s"
        gas_price = { price = 0.1, denom = "uosmo" }
    "#;

    #[test]
    fn parse_config() {
        let config: Config = toml::from_str(CONFIG).unwrap();

        assert_eq!(config.global.log_level, LogLevel::Debug);
        assert_eq!(config.relay.poll_interval, Duration::from_millis(250));
        assert_eq!(config.relay.ordering, Order::Ordered);
        assert_eq!(config.relay.source_port, PortId::transfer());
        assert_eq!(config.relay.target_version, Version::ics20());
        assert_eq!(
            config.path_store,
            PathStoreConfig::Sled {
                path: PathBuf::from("/tmp/paths")
            }
        );

        let a = config.find_chain(&ChainId::from_string("ibc-0")).unwrap();
        assert_eq!(a.gas_limit, 300_000);
        assert_eq!(a.address_prefix, "cosmos");
        assert_eq!(a.account, "default");
        assert_eq!(a.max_block_time, Duration::from_secs(30));
        assert_eq!(a.faucet_timeout, Duration::from_secs(5));
        assert!(a.faucet_addr.is_none());

        let b = config.find_chain(&ChainId::from_string("ibc-1")).unwrap();
        assert_eq!(b.address_prefix, "osmo");
        assert_eq!(b.gas_limit, 500_000);
        assert_eq!(b.max_block_time, Duration::from_secs(10));
        assert_eq!(
            b.faucet_addr.as_ref().map(ToString::to_string),
            Some("http://127.0.0.1:4500/".to_string())
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.global.log_level, LogLevel::Info);
        assert_eq!(config.relay, RelayConfig::default());
        assert_eq!(config.relay.ordering, Order::Unordered);
        assert_eq!(config.path_store, PathStoreConfig::Memory);
        assert!(config.chains.is_empty());
    }

    #[test]
    fn reject_unknown_fields() {
        assert!(toml::from_str::<Config>("[relay]\nfoo = 1").is_err());
    }

    #[test]
    fn parse_gas_price() {
        let price = GasPrice::from_str("0.025uatom").unwrap();
        assert_eq!(price, GasPrice::new(0.025, "uatom".to_string()));
        assert_eq!(price.to_string(), "0.025uatom");

        assert!(GasPrice::from_str("uatom").is_err());
        assert!(GasPrice::from_str("0.025").is_err());
        assert!(GasPrice::from_str("abc0.1stake").is_err());
        assert!(GasPrice::from_str("-1stake").is_err());
    }

    #[test]
    fn compare_gas_prices() {
        let low = GasPrice::new(0.1, "stake".to_string());
        let high = GasPrice::new(0.2, "stake".to_string());
        let other = GasPrice::new(0.1, "uatom".to_string());

        assert!(low < high);
        assert_eq!(low.partial_cmp(&other), None);
    }

    #[test]
    fn default_chain_configs() {
        let source = ChainConfig::source(ChainId::from_string("ibc-0"));
        assert_eq!(source.rpc_addr.to_string(), "http://localhost:26657/");
        assert_eq!(source.gas_price.to_string(), "0.00025stake");

        let target = ChainConfig::target(ChainId::from_string("ibc-1"));
        assert_eq!(target.rpc_addr.to_string(), "https://rpc.cosmos.network:443/");
        assert_eq!(target.gas_price.to_string(), "0.025uatom");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.chains.push(ChainConfig::source(ChainId::from_string("ibc-0")));

        let mut buffer = Vec::new();
        store_writer(&config, &mut buffer).unwrap();

        let parsed: Config = toml::from_str(core::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(parsed.chains, config.chains);
    }
}
