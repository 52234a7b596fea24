use ibc_relay_types::core::ics03_connection::connection::ConnectionEnd;
use ibc_relay_types::core::ics04_channel::channel::{ChannelEnd, Counterparty, State};
use ibc_relay_types::core::ics04_channel::events::{
    Attributes, OpenAck, OpenConfirm, OpenInit, OpenTry,
};
use ibc_relay_types::core::ics04_channel::msgs::{
    MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit, MsgChannelOpenTry,
};
use ibc_relay_types::core::ics04_channel::packet::Sequence;
use ibc_relay_types::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use ibc_relay_types::core::ics24_host::path::{
    ChannelEndsPath, SeqAcksPath, SeqRecvsPath, SeqSendsPath,
};
use ibc_relay_types::events::{ChainError, IbcEvent, RejectionCode};

use crate::chain::mock::host::{internal, MockHost, PortModule};

fn violation(log: impl Into<String>) -> ChainError {
    ChainError::new(RejectionCode::ProtocolViolation, log)
}

fn encode(end: &ChannelEnd) -> Result<Vec<u8>, ChainError> {
    serde_json::to_vec(end).map_err(|e| violation(e.to_string()))
}

fn expect_state(
    port_id: &PortId,
    channel_id: &ChannelId,
    end: &ChannelEnd,
    expected: State,
) -> Result<(), ChainError> {
    if end.state_matches(&expected) {
        Ok(())
    } else {
        Err(violation(format!(
            "channel {port_id}/{channel_id} is in state {} instead of {expected}",
            end.state
        )))
    }
}

fn attributes(port_id: PortId, channel_id: ChannelId, end: &ChannelEnd) -> Attributes {
    Attributes {
        port_id,
        channel_id: Some(channel_id),
        connection_id: end.connection_hops().first().cloned().unwrap_or_default(),
        counterparty_port_id: end.counterparty().port_id().clone(),
        counterparty_channel_id: end.counterparty().channel_id().cloned(),
    }
}

impl MockHost {
    fn port_module(&self, port_id: &PortId) -> Result<&PortModule, ChainError> {
        self.modules
            .get(port_id)
            .ok_or_else(|| violation(format!("no module is bound to port {port_id}")))
    }

    /// The single connection hop of `end`, required to be open when `require_open` is set.
    fn channel_connection(
        &self,
        end: &ChannelEnd,
        require_open: bool,
    ) -> Result<(ConnectionId, ConnectionEnd), ChainError> {
        let connection_id = match end.connection_hops().as_slice() {
            [connection_id] => connection_id.clone(),
            hops => {
                return Err(violation(format!(
                    "expected exactly one connection hop, found {}",
                    hops.len()
                )))
            }
        };

        let connection = self.connection_end(&connection_id)?;

        if require_open && !connection.is_open() {
            return Err(violation(format!("connection {connection_id} is not open")));
        }

        Ok((connection_id, connection))
    }

    fn counterparty_hops(connection: &ConnectionEnd) -> Result<Vec<ConnectionId>, ChainError> {
        connection
            .counterparty()
            .connection_id()
            .map(|id| vec![id.clone()])
            .ok_or_else(|| violation("counterparty connection id is missing"))
    }

    fn store_new_channel(
        &mut self,
        port_id: &PortId,
        end: &ChannelEnd,
    ) -> Result<ChannelId, ChainError> {
        let channel_id = ChannelId::new(self.channel_counter);

        self.store
            .set_json(
                ChannelEndsPath(port_id.clone(), channel_id.clone()).into(),
                end,
            )
            .map_err(internal)?;

        for path in [
            SeqSendsPath(port_id.clone(), channel_id.clone()).into(),
            SeqRecvsPath(port_id.clone(), channel_id.clone()).into(),
            SeqAcksPath(port_id.clone(), channel_id.clone()).into(),
        ] {
            self.store
                .set_json(path, &Sequence::from(1))
                .map_err(internal)?;
        }

        self.channel_counter += 1;

        Ok(channel_id)
    }

    pub(crate) fn chan_open_init(&mut self, msg: MsgChannelOpenInit) -> Result<IbcEvent, ChainError> {
        self.port_module(&msg.port_id)?
            .accepts(msg.channel.ordering, &msg.channel.version)?;

        self.channel_connection(&msg.channel, false)?;

        let mut end = msg.channel;
        end.set_state(State::Init);

        let channel_id = self.store_new_channel(&msg.port_id, &end)?;

        Ok(IbcEvent::OpenInitChannel(OpenInit(attributes(
            msg.port_id,
            channel_id,
            &end,
        ))))
    }

    pub(crate) fn chan_open_try(&mut self, msg: MsgChannelOpenTry) -> Result<IbcEvent, ChainError> {
        self.port_module(&msg.port_id)?
            .accepts(msg.channel.ordering, &msg.channel.version)?;

        if msg.channel.version != msg.counterparty_version {
            return Err(violation(format!(
                "channel version '{}' differs from the counterparty version '{}'",
                msg.channel.version, msg.counterparty_version
            )));
        }

        let (_, connection) = self.channel_connection(&msg.channel, true)?;

        let counterparty_channel_id = msg
            .channel
            .counterparty()
            .channel_id()
            .cloned()
            .ok_or_else(|| violation("counterparty channel id is missing"))?;

        let expected = ChannelEnd::new(
            State::Init,
            msg.channel.ordering,
            Counterparty::new(msg.port_id.clone(), None),
            Self::counterparty_hops(&connection)?,
            msg.counterparty_version.clone(),
        );

        self.verify_proof(
            connection.client_id(),
            &msg.proofs,
            ChannelEndsPath(
                msg.channel.counterparty().port_id().clone(),
                counterparty_channel_id,
            )
            .into(),
            Some(&encode(&expected)?),
        )?;

        let mut end = msg.channel;
        end.set_state(State::TryOpen);

        let channel_id = self.store_new_channel(&msg.port_id, &end)?;

        Ok(IbcEvent::OpenTryChannel(OpenTry(attributes(
            msg.port_id,
            channel_id,
            &end,
        ))))
    }

    pub(crate) fn chan_open_ack(&mut self, msg: MsgChannelOpenAck) -> Result<IbcEvent, ChainError> {
        let mut end = self.channel_end(&msg.port_id, &msg.channel_id)?;
        expect_state(&msg.port_id, &msg.channel_id, &end, State::Init)?;

        if end.version() != &msg.counterparty_version {
            return Err(violation(format!(
                "counterparty version '{}' differs from the proposed version '{}'",
                msg.counterparty_version,
                end.version()
            )));
        }

        let (_, connection) = self.channel_connection(&end, true)?;

        let expected = ChannelEnd::new(
            State::TryOpen,
            end.ordering,
            Counterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
            Self::counterparty_hops(&connection)?,
            msg.counterparty_version.clone(),
        );

        self.verify_proof(
            connection.client_id(),
            &msg.proofs,
            ChannelEndsPath(
                end.counterparty().port_id().clone(),
                msg.counterparty_channel_id.clone(),
            )
            .into(),
            Some(&encode(&expected)?),
        )?;

        end.set_state(State::Open);
        end.set_counterparty_channel_id(msg.counterparty_channel_id);

        self.store
            .set_json(
                ChannelEndsPath(msg.port_id.clone(), msg.channel_id.clone()).into(),
                &end,
            )
            .map_err(internal)?;

        Ok(IbcEvent::OpenAckChannel(OpenAck(attributes(
            msg.port_id,
            msg.channel_id,
            &end,
        ))))
    }

    pub(crate) fn chan_open_confirm(
        &mut self,
        msg: MsgChannelOpenConfirm,
    ) -> Result<IbcEvent, ChainError> {
        let mut end = self.channel_end(&msg.port_id, &msg.channel_id)?;
        expect_state(&msg.port_id, &msg.channel_id, &end, State::TryOpen)?;

        let (_, connection) = self.channel_connection(&end, true)?;

        let counterparty_channel_id = end
            .counterparty()
            .channel_id()
            .cloned()
            .ok_or_else(|| violation("counterparty channel id is missing"))?;

        let expected = ChannelEnd::new(
            State::Open,
            end.ordering,
            Counterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
            Self::counterparty_hops(&connection)?,
            end.version().clone(),
        );

        self.verify_proof(
            connection.client_id(),
            &msg.proofs,
            ChannelEndsPath(end.counterparty().port_id().clone(), counterparty_channel_id).into(),
            Some(&encode(&expected)?),
        )?;

        end.set_state(State::Open);

        self.store
            .set_json(
                ChannelEndsPath(msg.port_id.clone(), msg.channel_id.clone()).into(),
                &end,
            )
            .map_err(internal)?;

        Ok(IbcEvent::OpenConfirmChannel(OpenConfirm(attributes(
            msg.port_id,
            msg.channel_id,
            &end,
        ))))
    }
}
