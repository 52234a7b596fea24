use ibc_relay_types::core::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
use ibc_relay_types::core::ics03_connection::events::{
    Attributes, OpenAck, OpenConfirm, OpenInit, OpenTry,
};
use ibc_relay_types::core::ics03_connection::msgs::{
    MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit, MsgConnectionOpenTry,
};
use ibc_relay_types::core::ics03_connection::version::{get_compatible_versions, pick_version};
use ibc_relay_types::core::ics23_commitment::commitment::CommitmentPrefix;
use ibc_relay_types::core::ics24_host::identifier::ConnectionId;
use ibc_relay_types::core::ics24_host::path::ConnectionsPath;
use ibc_relay_types::events::{ChainError, IbcEvent, RejectionCode};

use crate::chain::mock::host::{internal, MockHost};

fn encode(end: &ConnectionEnd) -> Result<Vec<u8>, ChainError> {
    serde_json::to_vec(end)
        .map_err(|e| ChainError::new(RejectionCode::ProtocolViolation, e.to_string()))
}

fn expect_state(
    connection_id: &ConnectionId,
    end: &ConnectionEnd,
    expected: State,
) -> Result<(), ChainError> {
    if end.state_matches(&expected) {
        Ok(())
    } else {
        Err(ChainError::new(
            RejectionCode::ProtocolViolation,
            format!(
                "connection {connection_id} is in state {} instead of {expected}",
                end.state
            ),
        ))
    }
}

fn attributes(connection_id: ConnectionId, end: &ConnectionEnd) -> Attributes {
    Attributes {
        connection_id: Some(connection_id),
        client_id: end.client_id().clone(),
        counterparty_connection_id: end.counterparty().connection_id().cloned(),
        counterparty_client_id: end.counterparty().client_id().clone(),
    }
}

impl MockHost {
    pub(crate) fn conn_open_init(
        &mut self,
        msg: MsgConnectionOpenInit,
    ) -> Result<IbcEvent, ChainError> {
        self.client_state(&msg.client_id)?;

        let versions = match msg.version {
            Some(version) => vec![version],
            None => get_compatible_versions(),
        };

        let connection_id = ConnectionId::new(self.connection_counter);
        let end = ConnectionEnd::new(
            State::Init,
            msg.client_id,
            msg.counterparty,
            versions,
            msg.delay_period,
        );

        self.store
            .set_json(ConnectionsPath(connection_id.clone()).into(), &end)
            .map_err(internal)?;

        self.connection_counter += 1;

        Ok(IbcEvent::OpenInitConnection(OpenInit(attributes(
            connection_id,
            &end,
        ))))
    }

    pub(crate) fn conn_open_try(&mut self, msg: MsgConnectionOpenTry) -> Result<IbcEvent, ChainError> {
        let counterparty_connection_id =
            msg.counterparty.connection_id().cloned().ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    "counterparty connection id is missing",
                )
            })?;

        let version = pick_version(&get_compatible_versions(), &msg.counterparty_versions)
            .map_err(|e| ChainError::new(RejectionCode::ProtocolViolation, e.to_string()))?;

        let expected = ConnectionEnd::new(
            State::Init,
            msg.counterparty.client_id().clone(),
            Counterparty::new(msg.client_id.clone(), None, CommitmentPrefix::default()),
            msg.counterparty_versions.clone(),
            msg.delay_period,
        );

        self.verify_proof(
            &msg.client_id,
            &msg.proofs,
            ConnectionsPath(counterparty_connection_id).into(),
            Some(&encode(&expected)?),
        )?;

        let connection_id = ConnectionId::new(self.connection_counter);
        let end = ConnectionEnd::new(
            State::TryOpen,
            msg.client_id,
            msg.counterparty,
            vec![version],
            msg.delay_period,
        );

        self.store
            .set_json(ConnectionsPath(connection_id.clone()).into(), &end)
            .map_err(internal)?;

        self.connection_counter += 1;

        Ok(IbcEvent::OpenTryConnection(OpenTry(attributes(
            connection_id,
            &end,
        ))))
    }

    pub(crate) fn conn_open_ack(&mut self, msg: MsgConnectionOpenAck) -> Result<IbcEvent, ChainError> {
        let mut end = self.connection_end(&msg.connection_id)?;
        expect_state(&msg.connection_id, &end, State::Init)?;

        if !end.versions().contains(&msg.version) {
            return Err(ChainError::new(
                RejectionCode::ProtocolViolation,
                format!(
                    "version {} was not proposed by connection {}",
                    msg.version, msg.connection_id
                ),
            ));
        }

        let expected = ConnectionEnd::new(
            State::TryOpen,
            end.counterparty().client_id().clone(),
            Counterparty::new(
                end.client_id().clone(),
                Some(msg.connection_id.clone()),
                CommitmentPrefix::default(),
            ),
            vec![msg.version.clone()],
            end.delay_period(),
        );

        self.verify_proof(
            end.client_id(),
            &msg.proofs,
            ConnectionsPath(msg.counterparty_connection_id.clone()).into(),
            Some(&encode(&expected)?),
        )?;

        end.set_state(State::Open);
        end.set_version(msg.version);
        end.set_counterparty(Counterparty::new(
            end.counterparty().client_id().clone(),
            Some(msg.counterparty_connection_id),
            end.counterparty().prefix().clone(),
        ));

        self.store
            .set_json(ConnectionsPath(msg.connection_id.clone()).into(), &end)
            .map_err(internal)?;

        Ok(IbcEvent::OpenAckConnection(OpenAck(attributes(
            msg.connection_id,
            &end,
        ))))
    }

    pub(crate) fn conn_open_confirm(
        &mut self,
        msg: MsgConnectionOpenConfirm,
    ) -> Result<IbcEvent, ChainError> {
        let mut end = self.connection_end(&msg.connection_id)?;
        expect_state(&msg.connection_id, &end, State::TryOpen)?;

        let counterparty_connection_id =
            end.counterparty().connection_id().cloned().ok_or_else(|| {
                ChainError::new(
                    RejectionCode::ProtocolViolation,
                    "counterparty connection id is missing",
                )
            })?;

        let expected = ConnectionEnd::new(
            State::Open,
            end.counterparty().client_id().clone(),
            Counterparty::new(
                end.client_id().clone(),
                Some(msg.connection_id.clone()),
                CommitmentPrefix::default(),
            ),
            end.versions().to_vec(),
            end.delay_period(),
        );

        self.verify_proof(
            end.client_id(),
            &msg.proofs,
            ConnectionsPath(counterparty_connection_id).into(),
            Some(&encode(&expected)?),
        )?;

        end.set_state(State::Open);

        self.store
            .set_json(ConnectionsPath(msg.connection_id.clone()).into(), &end)
            .map_err(internal)?;

        Ok(IbcEvent::OpenConfirmConnection(OpenConfirm(attributes(
            msg.connection_id,
            &end,
        ))))
    }
}
