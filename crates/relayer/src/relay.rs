//! Configuring a path between two chains, end to end.

use core::time::Duration;
use std::sync::Arc;

use flex_error::define_error;
use tracing::{error_span, info};

use ibc_relay_types::core::ics24_host::identifier::ChainId;

use crate::chain::endpoint::Connector;
use crate::chain::handle::{Backoff, BaseChainHandle, ChainHandle};
use crate::config::Config;
use crate::faucet::{spawn_fund, FaucetTask};
use crate::handshake::{ConnectOptions, HandshakeCoordinator, HandshakeError, PathHandle};
use crate::link::error::LinkError;
use crate::observer::RelayObserver;
use crate::registry::{self, PathStoreError};
use crate::session::{RelaySession, SessionHandle};
use crate::spawn::{spawn_chain_runtime, SpawnError};

define_error! {
    ConfigureError {
        Spawn
            { chain_id: ChainId }
            [ SpawnError ]
            |e| { format_args!("cannot resolve chain {}", e.chain_id) },

        PathStore
            [ PathStoreError ]
            |_| { "failed to open the path store" },

        Handshake
            [ HandshakeError ]
            |_| { "failed to establish the path" },

        Session
            [ LinkError ]
            |_| { "failed to start relaying over the path" },
    }
}

impl ConfigureError {
    pub fn is_connectivity(&self) -> bool {
        match self.detail() {
            ConfigureErrorDetail::Spawn(e) => e.source.is_connectivity(),
            ConfigureErrorDetail::PathStore(_) => false,
            ConfigureErrorDetail::Handshake(e) => e.source.is_connectivity(),
            ConfigureErrorDetail::Session(e) => e.source.is_connectivity(),
        }
    }
}

/// A path established between two chains, with a session ready to relay over it.
pub struct ConfiguredPath {
    pub path: PathHandle,
    pub session: RelaySession<BaseChainHandle, BaseChainHandle>,
    /// Funding attempts started for the relayer account on each chain.
    /// They may still be running.
    pub faucets: Vec<FaucetTask>,
    poll_interval: Duration,
}

impl ConfiguredPath {
    /// Starts the relay workers, polling at the configured interval.
    pub fn start(&self) -> SessionHandle {
        self.session.spawn(self.poll_interval)
    }
}

/// Connects to the `source` and `target` chains of `config`, asks their
/// faucets for funds without waiting for the answer, then resolves or
/// creates the path between them with the configured channel options.
pub fn configure<C: Connector>(
    connector: &C,
    config: &Config,
    source: &ChainId,
    target: &ChainId,
    backoff: Backoff,
    observer: Arc<dyn RelayObserver>,
) -> Result<ConfiguredPath, ConfigureError> {
    let _span = error_span!("configure", %source, %target).entered();

    let store = registry::from_config(&config.path_store).map_err(ConfigureError::path_store)?;

    let source_chain = init_chain(connector, config, source, backoff)?;
    let target_chain = init_chain(connector, config, target, backoff)?;

    let faucets = vec![
        spawn_fund(source_chain.clone(), observer.clone()),
        spawn_fund(target_chain.clone(), observer.clone()),
    ];

    let coordinator = HandshakeCoordinator::new(store, observer.clone());
    let path = coordinator
        .connect(
            &source_chain,
            &target_chain,
            &ConnectOptions::from_config(&config.relay),
        )
        .map_err(ConfigureError::handshake)?;

    info!(path = %path.path_id, reused = path.reused, "⛓ configured chains");

    let session = RelaySession::new(source_chain, target_chain, path.record.clone(), observer)
        .map_err(ConfigureError::session)?;

    Ok(ConfiguredPath {
        path,
        session,
        faucets,
        poll_interval: config.relay.poll_interval,
    })
}

fn init_chain<C: Connector>(
    connector: &C,
    config: &Config,
    chain_id: &ChainId,
    backoff: Backoff,
) -> Result<BaseChainHandle, ConfigureError> {
    let handle: BaseChainHandle = spawn_chain_runtime(connector, config, chain_id, backoff)
        .map_err(|e| ConfigureError::spawn(chain_id.clone(), e))?;

    if let Ok(signer) = handle.get_signer() {
        info!(chain = %chain_id, account = %signer, "relayer account");
    }

    Ok(handle)
}
