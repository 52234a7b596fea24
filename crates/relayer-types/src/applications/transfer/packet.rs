use core::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use super::coin::Coin;
use super::error::Error;

/// The payload carried by an ICS20 transfer packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketData {
    pub denom: String,
    /// Decimal string, as the amount may exceed 64 bits.
    pub amount: String,
    pub sender: String,
    pub receiver: String,
}

impl PacketData {
    pub fn new(coin: &Coin, sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            denom: coin.denom.clone(),
            amount: coin.amount.to_string(),
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of strings cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(Error::invalid_packet_data)
    }

    /// Returns the transferred coin, rejecting zero amounts.
    pub fn coin(&self) -> Result<Coin, Error> {
        let coin = Coin::from_str(&format!("{}{}", self.amount, self.denom))?;

        if coin.amount == 0 {
            return Err(Error::zero_amount());
        }

        Ok(coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn decode_packet_data() {
        let data = PacketData::new(&Coin::new(100, "stake"), "alice", "bob");
        let decoded = PacketData::from_bytes(&data.to_bytes()).unwrap();

        assert_eq!(decoded.coin().unwrap(), Coin::new(100, "stake"));
        assert_eq!(decoded.receiver, "bob");
    }

    #[test]
    fn reject_bad_packet_data() {
        assert!(PacketData::from_bytes(b"").is_err());
        assert!(PacketData::from_bytes(b"not json").is_err());

        let zero = PacketData::new(&Coin::new(0, "stake"), "alice", "bob");
        assert!(zero.coin().is_err());
    }
}
