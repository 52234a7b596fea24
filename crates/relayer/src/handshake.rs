//! Resolution of the path between two chains: reuse of a recorded path, or
//! creation of the clients, connection and channel making up a new one.

use core::fmt::{Display, Error as FmtError, Formatter};
use core::time::Duration;
use std::sync::Arc;

use tracing::{debug, error_span, info};

use ibc_relay_types::core::ics04_channel::channel::Order;
use ibc_relay_types::core::ics04_channel::version::Version;
use ibc_relay_types::core::ics24_host::identifier::PortId;

use crate::chain::handle::ChainHandle;
use crate::channel::Channel;
use crate::config::RelayConfig;
use crate::connection::{handshake_retry, Connection};
use crate::foreign_client::ForeignClient;
use crate::observer::{HandshakeStep, RelayObserver};
use crate::registry::{PathKey, PathRecord, PathSide, PathStore};

mod error;
pub use error::{HandshakeError, HandshakeErrorDetail};

/// What the path between the two chains must look like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    pub ordering: Order,
    pub a_port: PortId,
    pub b_port: PortId,
    pub a_version: Version,
    pub b_version: Version,
    pub connection_delay: Duration,
}

impl ConnectOptions {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            ordering: config.ordering,
            a_port: config.source_port.clone(),
            b_port: config.target_port.clone(),
            a_version: config.source_version.clone(),
            b_version: config.target_version.clone(),
            connection_delay: Duration::ZERO,
        }
    }

    pub fn with_ordering(self, ordering: Order) -> Self {
        Self { ordering, ..self }
    }

    pub fn with_version(self, version: Version) -> Self {
        Self {
            a_version: version.clone(),
            b_version: version,
            ..self
        }
    }

    /// Whether `record` describes a path with the requested ports, ordering
    /// and version.
    fn matches(&self, record: &PathRecord) -> bool {
        record.ordering == self.ordering
            && record.version == self.a_version
            && record.a_side.port_id == self.a_port
            && record.b_side.port_id == self.b_port
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// An established path between two chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathHandle {
    /// `<chain a>-<chain b>`
    pub path_id: String,
    pub record: PathRecord,
    /// Whether the path was found in the registry rather than created.
    pub reused: bool,
}

impl Display for PathHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{} [{}]", self.path_id, self.record)
    }
}

pub struct HandshakeCoordinator {
    registry: Arc<dyn PathStore>,
    observer: Arc<dyn RelayObserver>,
}

impl HandshakeCoordinator {
    pub fn new(registry: Arc<dyn PathStore>, observer: Arc<dyn RelayObserver>) -> Self {
        Self { registry, observer }
    }

    pub fn registry(&self) -> &Arc<dyn PathStore> {
        &self.registry
    }

    /// Returns an open path between `a_chain` and `b_chain` matching `options`.
    ///
    /// A recorded path whose channel is still open on both chains is returned
    /// as is, without submitting anything. Otherwise clients, a connection and
    /// a channel are created, and the new path is recorded before returning.
    pub fn connect<ChainA: ChainHandle, ChainB: ChainHandle>(
        &self,
        a_chain: &ChainA,
        b_chain: &ChainB,
        options: &ConnectOptions,
    ) -> Result<PathHandle, HandshakeError> {
        let path_id = format!("{}-{}", a_chain.id(), b_chain.id());

        let _span = error_span!("handshake", path = %path_id).entered();

        if options.a_version != options.b_version {
            return Err(HandshakeError::version_mismatch(
                options.a_version.clone(),
                options.b_version.clone(),
            ));
        }

        if let Some(record) = self.find_open_path(a_chain, b_chain, options)? {
            info!(path = %record, "reusing established path");
            self.observer
                .on_handshake_step(&path_id, &HandshakeStep::PathReused);

            return Ok(PathHandle {
                path_id,
                record,
                reused: true,
            });
        }

        let record = self.build_path(&path_id, a_chain, b_chain, options)?;

        self.registry
            .save(&record.key(), &record)
            .map_err(HandshakeError::registry)?;

        self.observer
            .on_handshake_step(&path_id, &HandshakeStep::PathSaved);

        info!(path = %record, "🥂 path established");

        Ok(PathHandle {
            path_id,
            record,
            reused: false,
        })
    }

    /// Looks the path up under both orientations, and keeps it only if it
    /// matches the options and its channel is open on both chains.
    fn find_open_path<ChainA: ChainHandle, ChainB: ChainHandle>(
        &self,
        a_chain: &ChainA,
        b_chain: &ChainB,
        options: &ConnectOptions,
    ) -> Result<Option<PathRecord>, HandshakeError> {
        let key = PathKey::new(a_chain.id(), b_chain.id(), options.a_port.clone());

        let record = match self.registry.lookup(&key).map_err(HandshakeError::registry)? {
            Some(record) => Some(record),
            None => self
                .registry
                .lookup(&key.reversed(options.b_port.clone()))
                .map_err(HandshakeError::registry)?
                .map(|record| record.flipped()),
        };

        let Some(record) = record else {
            debug!(%key, "no recorded path");
            return Ok(None);
        };

        if !options.matches(&record) {
            debug!(path = %record, "recorded path does not match the requested options, ignoring it");
            return Ok(None);
        }

        let open = Channel::restore_from_state(
            a_chain.clone(),
            b_chain.clone(),
            record.a_side.port_id.clone(),
            record.a_side.channel_id.clone(),
        )
        .and_then(|channel| {
            let same_counterparty = channel.dst_channel_id() == Some(&record.b_side.channel_id);
            Ok(same_counterparty && channel.is_open()?)
        });

        match open {
            Ok(true) => Ok(Some(record)),
            Ok(false) => {
                debug!(path = %record, "recorded path is not open anymore, ignoring it");
                Ok(None)
            }
            Err(e) if e.is_connectivity() => Err(HandshakeError::channel(e)),
            Err(e) => {
                debug!(path = %record, "recorded path cannot be restored, ignoring it: {e}");
                Ok(None)
            }
        }
    }

    fn build_path<ChainA: ChainHandle, ChainB: ChainHandle>(
        &self,
        path_id: &str,
        a_chain: &ChainA,
        b_chain: &ChainB,
        options: &ConnectOptions,
    ) -> Result<PathRecord, HandshakeError> {
        let max_block_time = max_block_time(a_chain, b_chain)?;

        let b_to_a_client = create_client(a_chain, b_chain, max_block_time)?;
        let a_to_b_client = create_client(b_chain, a_chain, max_block_time)?;

        self.observer
            .on_handshake_step(path_id, &HandshakeStep::ClientsCreated);

        let connection = Connection::new(b_to_a_client, a_to_b_client, options.connection_delay)
            .map_err(HandshakeError::connection)?;

        self.observer
            .on_handshake_step(path_id, &HandshakeStep::ConnectionOpen);

        let channel = Channel::new(
            connection,
            options.ordering,
            options.a_port.clone(),
            options.b_port.clone(),
            options.a_version.clone(),
        )
        .map_err(HandshakeError::channel)?;

        self.observer
            .on_handshake_step(path_id, &HandshakeStep::ChannelOpen);

        let a_channel_id = channel
            .src_channel_id()
            .cloned()
            .ok_or_else(|| HandshakeError::missing_identifier("a channel id on chain a".into()))?;

        let b_channel_id = channel
            .dst_channel_id()
            .cloned()
            .ok_or_else(|| HandshakeError::missing_identifier("a channel id on chain b".into()))?;

        Ok(PathRecord {
            a_side: PathSide {
                chain_id: a_chain.id(),
                client_id: channel.src_client_id().clone(),
                connection_id: channel.src_connection_id().clone(),
                port_id: channel.src_port_id().clone(),
                channel_id: a_channel_id,
            },
            b_side: PathSide {
                chain_id: b_chain.id(),
                client_id: channel.dst_client_id().clone(),
                connection_id: channel.dst_connection_id().clone(),
                port_id: channel.dst_port_id().clone(),
                channel_id: b_channel_id,
            },
            ordering: options.ordering,
            version: channel
                .src_version()
                .cloned()
                .unwrap_or_else(|| options.a_version.clone()),
        })
    }
}

fn max_block_time<ChainA: ChainHandle, ChainB: ChainHandle>(
    a_chain: &ChainA,
    b_chain: &ChainB,
) -> Result<Duration, HandshakeError> {
    let a_config = a_chain
        .config()
        .map_err(|e| HandshakeError::relayer(a_chain.id(), e))?;
    let b_config = b_chain
        .config()
        .map_err(|e| HandshakeError::relayer(b_chain.id(), e))?;

    Ok(a_config.max_block_time.max(b_config.max_block_time))
}

/// Creates a client of `src_chain` on `dst_chain`, retrying through
/// connectivity failures.
fn create_client<DstChain: ChainHandle, SrcChain: ChainHandle>(
    dst_chain: &DstChain,
    src_chain: &SrcChain,
    max_block_time: Duration,
) -> Result<ForeignClient<DstChain, SrcChain>, HandshakeError> {
    handshake_retry::retry_step(
        max_block_time,
        || {
            ForeignClient::new(dst_chain.clone(), src_chain.clone())
                .map_err(|e| HandshakeError::client(dst_chain.id(), e))
        },
        HandshakeError::is_connectivity,
        |e| {
            HandshakeError::max_retry(
                format!("create client of {} on {}", src_chain.id(), dst_chain.id()),
                e.tries,
                e.total_delay,
                e.error.to_string(),
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::registry::tests::record;

    #[test]
    fn default_options() {
        let options = ConnectOptions::default();

        assert_eq!(options.ordering, Order::Unordered);
        assert_eq!(options.a_port, PortId::transfer());
        assert_eq!(options.b_port, PortId::transfer());
        assert_eq!(options.a_version, Version::ics20());
        assert_eq!(options.b_version, Version::ics20());
    }

    #[test]
    fn options_match_records() {
        let record = record("ibc-0", "ibc-1", 0);
        let options = ConnectOptions::default();

        assert!(options.matches(&record));
        assert!(!options.clone().with_ordering(Order::Ordered).matches(&record));
        assert!(!options
            .with_version(Version::new("ics20-2".to_string()))
            .matches(&record));
    }
}
