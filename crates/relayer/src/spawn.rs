//! Connecting to chains and spawning their runtimes.

use flex_error::define_error;
use tracing::{debug, info};

use ibc_relay_types::core::ics24_host::identifier::ChainId;

use crate::account::validate_chain_config;
use crate::chain::endpoint::{ChainEndpoint, Connector};
use crate::chain::handle::{Backoff, ChainHandle};
use crate::chain::runtime::ChainRuntime;
use crate::config::{ChainConfig, Config};
use crate::error::Error as RelayerError;
use crate::util::retry::{retry_with_index, RetryResult};

define_error! {
    SpawnError {
        Relayer
            [ RelayerError ]
            | _ | { "relayer error" },

        MissingChainConfig
            { chain_id: ChainId }
            | e | {
                format_args!("missing chain config for '{}' in configuration file", e.chain_id)
            },
    }
}

impl SpawnError {
    pub fn is_connectivity(&self) -> bool {
        match self.detail() {
            SpawnErrorDetail::Relayer(e) => e.source.is_connectivity(),
            SpawnErrorDetail::MissingChainConfig(_) => false,
        }
    }
}

/// Validates the account and gas settings of `config`, connects to its
/// RPC address through `connector`, and checks that the node serves the
/// configured chain.
///
/// Connectivity failures are retried according to `backoff`.
pub fn connect<C: Connector>(
    connector: &C,
    config: &ChainConfig,
    backoff: Backoff,
) -> Result<C::Endpoint, RelayerError> {
    validate_chain_config(config)?;

    let endpoint = retry_with_index(backoff.delays(), |index| {
        let result = connector.connect(config).and_then(|endpoint| {
            endpoint.health_check()?;
            Ok(endpoint)
        });

        match result {
            Ok(endpoint) => RetryResult::Ok(endpoint),
            Err(e) if e.is_connectivity() => {
                debug!(chain = %config.id, attempt = index, "retrying connection: {e}");
                RetryResult::Retry(e)
            }
            Err(e) => RetryResult::Err(e),
        }
    })
    .map_err(|e| {
        if e.error.is_connectivity() {
            RelayerError::connectivity_exhausted(
                config.id.clone(),
                e.tries,
                e.total_delay,
                e.error.to_string(),
            )
        } else {
            e.error
        }
    })?;

    info!(chain = %config.id, rpc_addr = %config.rpc_addr, "connected to chain");

    Ok(endpoint)
}

/// Spawns a chain runtime for the chain `chain_id` of the configuration.
/// Returns the corresponding handle if successful.
pub fn spawn_chain_runtime<Handle: ChainHandle, C: Connector>(
    connector: &C,
    config: &Config,
    chain_id: &ChainId,
    backoff: Backoff,
) -> Result<Handle, SpawnError> {
    let chain_config = config
        .find_chain(chain_id)
        .cloned()
        .ok_or_else(|| SpawnError::missing_chain_config(chain_id.clone()))?;

    spawn_chain_runtime_with_config(connector, &chain_config, backoff)
}

/// Spawns a chain runtime from the given chain configuration.
/// Returns the corresponding handle if successful.
pub fn spawn_chain_runtime_with_config<Handle: ChainHandle, C: Connector>(
    connector: &C,
    config: &ChainConfig,
    backoff: Backoff,
) -> Result<Handle, SpawnError> {
    let endpoint = connect(connector, config, backoff).map_err(SpawnError::relayer)?;
    let submission_lock = connector
        .account_locks()
        .lock_for(&config.id, &config.account);

    Ok(ChainRuntime::spawn(endpoint, backoff, submission_lock))
}
