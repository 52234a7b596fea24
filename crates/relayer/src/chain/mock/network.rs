use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use http::Uri;

use crate::chain::endpoint::Connector;
use crate::chain::handle::AccountLocks;
use crate::config::ChainConfig;
use crate::error::Error;
use crate::util::mutex::MutexUtil;

use super::{MockChain, MockEndpoint};

/// Maps RPC addresses to in-process chains.
#[derive(Clone, Debug, Default)]
pub struct MockNetwork {
    chains: Arc<Mutex<HashMap<String, MockChain>>>,
    account_locks: AccountLocks,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `chain` at `rpc_addr`, replacing any chain previously served there.
    pub fn register(&self, rpc_addr: &Uri, chain: MockChain) {
        self.chains.acquire_mutex().insert(rpc_addr.to_string(), chain);
    }

    pub fn unregister(&self, rpc_addr: &Uri) -> Option<MockChain> {
        self.chains.acquire_mutex().remove(&rpc_addr.to_string())
    }
}

impl Connector for MockNetwork {
    type Endpoint = MockEndpoint;

    fn connect(&self, config: &ChainConfig) -> Result<MockEndpoint, Error> {
        let chain = self
            .chains
            .acquire_mutex()
            .get(&config.rpc_addr.to_string())
            .cloned()
            .ok_or_else(|| {
                Error::connectivity(
                    config.id.clone(),
                    config.rpc_addr.to_string(),
                    "connection refused".to_string(),
                )
            })?;

        Ok(MockEndpoint::new(config.clone(), chain))
    }

    fn account_locks(&self) -> &AccountLocks {
        &self.account_locks
    }
}
