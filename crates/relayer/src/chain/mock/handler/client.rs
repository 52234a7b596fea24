use ibc_relay_types::core::ics02_client::client_type::ClientType;
use ibc_relay_types::core::ics02_client::events::{Attributes, CreateClient, UpdateClient};
use ibc_relay_types::core::ics02_client::msgs::{MsgCreateClient, MsgUpdateClient};
use ibc_relay_types::core::ics24_host::identifier::ClientId;
use ibc_relay_types::core::ics24_host::path::{ClientConsensusStatePath, ClientStatePath, Path};
use ibc_relay_types::events::{ChainError, IbcEvent, RejectionCode};

use crate::chain::mock::host::{internal, MockHost};

impl MockHost {
    pub(crate) fn create_client(&mut self, msg: MsgCreateClient) -> Result<IbcEvent, ChainError> {
        let client_id = ClientId::new(ClientType::Mock, self.client_counter).map_err(|e| {
            ChainError::new(RejectionCode::ProtocolViolation, e.to_string())
        })?;

        let consensus_height = msg.client_state.latest_height();

        self.store
            .set_json(ClientStatePath(client_id.clone()).into(), &msg.client_state)
            .map_err(internal)?;

        self.store
            .set_json(
                Path::from(ClientConsensusStatePath {
                    client_id: client_id.clone(),
                    height: consensus_height,
                }),
                &msg.consensus_state,
            )
            .map_err(internal)?;

        self.consensus_heights
            .entry(client_id.clone())
            .or_default()
            .insert(consensus_height);

        self.client_counter += 1;

        Ok(IbcEvent::CreateClient(CreateClient(Attributes {
            client_id,
            client_type: ClientType::Mock,
            consensus_height,
        })))
    }

    pub(crate) fn update_client(&mut self, msg: MsgUpdateClient) -> Result<IbcEvent, ChainError> {
        let client_id = msg.client_id;
        let client_state = self.client_state(&client_id)?;
        let target_height = msg.header.height();

        let attributes = Attributes {
            client_id: client_id.clone(),
            client_type: ClientType::Mock,
            consensus_height: target_height,
        };

        // Already updated to that height
        if self
            .consensus_heights
            .get(&client_id)
            .map_or(false, |heights| heights.contains(&target_height))
        {
            return Ok(IbcEvent::UpdateClient(UpdateClient { common: attributes }));
        }

        let trusted = self.consensus_state(&client_id, msg.header.trusted_height)?;

        let (client_state, consensus_state) = client_state
            .check_header_and_update_state(&trusted, msg.header)
            .map_err(|e| ChainError::new(RejectionCode::InvalidProof, e.to_string()))?;

        self.store
            .set_json(ClientStatePath(client_id.clone()).into(), &client_state)
            .map_err(internal)?;

        self.store
            .set_json(
                Path::from(ClientConsensusStatePath {
                    client_id: client_id.clone(),
                    height: target_height,
                }),
                &consensus_state,
            )
            .map_err(internal)?;

        self.consensus_heights
            .entry(client_id)
            .or_default()
            .insert(target_height);

        Ok(IbcEvent::UpdateClient(UpdateClient { common: attributes }))
    }
}
