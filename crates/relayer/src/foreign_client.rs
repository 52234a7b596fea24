//! Light clients hosted on one chain that track the consensus of another.

use core::fmt;

use flex_error::define_error;
use tracing::{debug, info, instrument};

use ibc_relay_types::core::ics02_client::msgs::{MsgCreateClient, MsgUpdateClient};
use ibc_relay_types::core::ics24_host::identifier::{ChainId, ClientId};
use ibc_relay_types::core::ics26_routing::msgs::{ClientMsg, MsgEnvelope};
use ibc_relay_types::events::IbcEvent;
use ibc_relay_types::Height;

use crate::chain::handle::ChainHandle;
use crate::chain::requests::QueryConsensusStateHeightsRequest;
use crate::chain::tracking::TrackedMsgs;
use crate::error::{Error as RelayerError, ErrorDetail as RelayerErrorDetail};
use crate::event::extract_client_id;

define_error! {
    ForeignClientError {
        ClientCreate
            {
                chain_id: ChainId,
                description: String,
            }
            [ RelayerError ]
            |e| {
                format_args!("error raised while creating client on chain {0}: {1}",
                    e.chain_id, e.description)
            },

        ClientUpdate
            {
                chain_id: ChainId,
                description: String,
            }
            [ RelayerError ]
            |e| {
                format_args!("error raised while updating client on chain {0}: {1}",
                    e.chain_id, e.description)
            },

        ClientQuery
            {
                client_id: ClientId,
                chain_id: ChainId,
            }
            [ RelayerError ]
            |e| {
                format_args!("failed while querying for client {0} on chain id {1}",
                    e.client_id, e.chain_id)
            },

        MissingClientIdFromEvent
            { event: IbcEvent }
            |e| {
                format_args!("failed while finding client id in event {}", e.event)
            },

        SameChainId
            { chain_id: ChainId }
            |e| {
                format_args!("the chain ID ({}) at the source and destination chains must be different",
                    e.chain_id)
            },

        MissingSmallerTrustedHeight
            {
                chain_id: ChainId,
                target_height: Height,
            }
            |e| {
                format_args!("chain {} is missing trusted state smaller than target height {}",
                    e.chain_id, e.target_height)
            },
    }
}

impl ForeignClientError {
    pub fn is_connectivity(&self) -> bool {
        self.detail().is_connectivity()
    }

    pub fn is_protocol(&self) -> bool {
        self.detail().is_protocol()
    }

    pub fn is_stale_proof(&self) -> bool {
        self.detail().is_stale_proof()
    }
}

impl ForeignClientErrorDetail {
    fn relayer_source(&self) -> Option<&RelayerErrorDetail> {
        match self {
            Self::ClientCreate(e) => Some(&e.source),
            Self::ClientUpdate(e) => Some(&e.source),
            Self::ClientQuery(e) => Some(&e.source),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        self.relayer_source()
            .map_or(false, RelayerErrorDetail::is_connectivity)
    }

    pub fn is_protocol(&self) -> bool {
        match self {
            Self::SameChainId(_) | Self::MissingSmallerTrustedHeight(_) => true,
            _ => self
                .relayer_source()
                .map_or(false, RelayerErrorDetail::is_protocol),
        }
    }

    pub fn is_stale_proof(&self) -> bool {
        self.relayer_source()
            .map_or(false, RelayerErrorDetail::is_stale_proof)
    }
}

/// A light client of `src_chain` hosted on `dst_chain`.
#[derive(Clone, Debug)]
pub struct ForeignClient<DstChain: ChainHandle, SrcChain: ChainHandle> {
    /// The identifier of this client, as assigned by the hosting chain.
    pub id: ClientId,

    /// A handle to the chain hosting this client, i.e., destination chain.
    pub dst_chain: DstChain,

    /// A handle to the chain whose headers this client is verifying, aka the source chain.
    pub src_chain: SrcChain,
}

/// Formats as `{SRC-CHAIN}->{DST-CHAIN}:{CLIENT}`.
impl<DstChain: ChainHandle, SrcChain: ChainHandle> fmt::Display
    for ForeignClient<DstChain, SrcChain>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}",
            self.src_chain.id(),
            self.dst_chain.id(),
            self.id
        )
    }
}

impl<DstChain: ChainHandle, SrcChain: ChainHandle> ForeignClient<DstChain, SrcChain> {
    /// Creates a new foreign client on `dst_chain`. Blocks until the client is created, or
    /// an error occurs.
    /// Post-condition: `dst_chain` hosts an IBC client for `src_chain`.
    pub fn new(
        dst_chain: DstChain,
        src_chain: SrcChain,
    ) -> Result<ForeignClient<DstChain, SrcChain>, ForeignClientError> {
        if src_chain.id() == dst_chain.id() {
            return Err(ForeignClientError::same_chain_id(src_chain.id()));
        }

        let id = Self::create(&dst_chain, &src_chain)?;

        Ok(ForeignClient {
            id,
            dst_chain,
            src_chain,
        })
    }

    pub fn restore(
        id: ClientId,
        dst_chain: DstChain,
        src_chain: SrcChain,
    ) -> ForeignClient<DstChain, SrcChain> {
        ForeignClient {
            id,
            dst_chain,
            src_chain,
        }
    }

    pub fn dst_chain(&self) -> DstChain {
        self.dst_chain.clone()
    }

    pub fn src_chain(&self) -> SrcChain {
        self.src_chain.clone()
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Builds the message creating a client of `src_chain` on `dst_chain`,
    /// checkpointed at the latest height of `src_chain`.
    pub fn build_create_client(
        dst_chain: &DstChain,
        src_chain: &SrcChain,
    ) -> Result<MsgCreateClient, ForeignClientError> {
        let create_error = |description: &str| {
            let chain_id = dst_chain.id();
            let description = description.to_string();
            move |e| ForeignClientError::client_create(chain_id, description, e)
        };

        let signer = dst_chain
            .get_signer()
            .map_err(create_error("failed while fetching the dst chain signer"))?;

        let latest_height = src_chain
            .query_latest_height()
            .map_err(create_error("failed while querying src chain for latest height"))?;

        let client_state = src_chain
            .build_client_state(latest_height)
            .map_err(create_error("failed when building client state"))?;

        let consensus_state = src_chain
            .build_consensus_state(latest_height)
            .map_err(create_error("failed while building client consensus state"))?;

        Ok(MsgCreateClient::new(client_state, consensus_state, signer))
    }

    #[instrument(
        name = "foreign_client.create",
        level = "error",
        skip_all,
        fields(src_chain = %src_chain.id(), dst_chain = %dst_chain.id())
    )]
    fn create(dst_chain: &DstChain, src_chain: &SrcChain) -> Result<ClientId, ForeignClientError> {
        let msg = Self::build_create_client(dst_chain, src_chain)?;

        let tm = TrackedMsgs::new_single(
            MsgEnvelope::Client(ClientMsg::CreateClient(msg)),
            "create client",
        );

        let events = dst_chain.send_messages_and_wait_commit(tm).map_err(|e| {
            ForeignClientError::client_create(
                dst_chain.id(),
                "failed sending message to dst chain".to_string(),
                e,
            )
        })?;

        let event = events
            .into_iter()
            .next()
            .map(|ev| ev.event)
            .ok_or_else(|| {
                ForeignClientError::client_create(
                    dst_chain.id(),
                    "no event in create client transaction".to_string(),
                    RelayerError::other("empty transaction result".to_string()),
                )
            })?;

        if let IbcEvent::ChainError(e) = event {
            return Err(ForeignClientError::client_create(
                dst_chain.id(),
                "tx response event consists of an error".to_string(),
                RelayerError::tx_rejected(dst_chain.id(), e),
            ));
        }

        let id = extract_client_id(&event)
            .cloned()
            .ok_or_else(|| ForeignClientError::missing_client_id_from_event(event.clone()))?;

        info!(%id, "🍭 client was created successfully");

        Ok(id)
    }

    /// Returns a trusted height that is lower than the target height, so
    /// that the client can be updated to the target height from the
    /// consensus state stored at the returned trusted height.
    fn solve_trusted_height(&self, target_height: Height) -> Result<Height, ForeignClientError> {
        let cs_heights = self.fetch_consensus_state_heights()?;

        cs_heights
            .into_iter()
            .find(|h| h < &target_height)
            .ok_or_else(|| {
                ForeignClientError::missing_smaller_trusted_height(
                    self.dst_chain.id(),
                    target_height,
                )
            })
    }

    /// Builds the messages updating this client to `target_height`. Returns no
    /// message when the client already stores a consensus state at that height.
    #[instrument(
        name = "foreign_client.build_update_client",
        level = "error",
        skip_all,
        fields(client = %self, %target_height)
    )]
    pub fn build_update_client(
        &self,
        target_height: Height,
    ) -> Result<Vec<MsgEnvelope>, ForeignClientError> {
        let cs_heights = self.fetch_consensus_state_heights()?;

        if cs_heights.contains(&target_height) {
            debug!("skipping update: consensus state already present at target height");
            return Ok(vec![]);
        }

        let trusted_height = self.solve_trusted_height(target_height)?;

        let header = self
            .src_chain
            .build_header(trusted_height, target_height)
            .map_err(|e| {
                ForeignClientError::client_update(
                    self.dst_chain.id(),
                    "failed building header with error".to_string(),
                    e,
                )
            })?;

        let signer = self.dst_chain.get_signer().map_err(|e| {
            ForeignClientError::client_update(
                self.dst_chain.id(),
                "failed getting signer for dst chain".to_string(),
                e,
            )
        })?;

        debug!(
            "building a MsgUpdateClient from trusted height {} to target height {}",
            trusted_height, target_height,
        );

        Ok(vec![MsgEnvelope::Client(ClientMsg::UpdateClient(
            MsgUpdateClient::new(self.id.clone(), header, signer),
        ))])
    }

    /// Heights of the consensus states stored by this client, highest first.
    fn fetch_consensus_state_heights(&self) -> Result<Vec<Height>, ForeignClientError> {
        let mut heights = self
            .dst_chain
            .query_consensus_state_heights(QueryConsensusStateHeightsRequest {
                client_id: self.id.clone(),
            })
            .map_err(|e| {
                ForeignClientError::client_query(self.id.clone(), self.dst_chain.id(), e)
            })?;

        heights.sort_by_key(|&h| core::cmp::Reverse(h));

        Ok(heights)
    }
}
