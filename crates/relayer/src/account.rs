//! Derivation of the relayer's on-chain address, and validation of the
//! account and gas settings of a chain.

use core::str::FromStr;

use bech32::{ToBase32, Variant};
use sha2::{Digest, Sha256};

use ibc_relay_types::signer::Signer;

use crate::config::{ChainConfig, GasPrice};
use crate::error::Error;

/// Length of an account address, in bytes.
const ADDRESS_LENGTH: usize = 20;

/// Checks that `prefix` can be used as the human-readable part of a bech32 address.
pub fn validate_address_prefix(prefix: &str) -> Result<(), Error> {
    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_address_prefix(prefix.to_string()))
    }
}

pub fn validate_gas_price(gas_price: &GasPrice) -> Result<(), Error> {
    let valid = gas_price.price.is_finite()
        && gas_price.price >= 0.0
        && !gas_price.denom.is_empty()
        && gas_price.denom.chars().all(|c| c.is_ascii_alphanumeric() || c == '/');

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_gas_price(gas_price.to_string()))
    }
}

/// Validates the account, gas and address settings of a chain before connecting to it.
pub fn validate_chain_config(config: &ChainConfig) -> Result<(), Error> {
    validate_gas_price(&config.gas_price)?;

    if config.gas_limit == 0 {
        return Err(Error::invalid_gas_limit(config.gas_limit));
    }

    validate_address_prefix(&config.address_prefix)
}

/// Derives the address of `account` under `prefix`.
///
/// The address bytes are the first 20 bytes of the SHA-256 digest of the
/// account reference, so the same account yields the same address bytes on
/// every chain and only the human-readable part differs.
pub fn derive_signer(account: &str, prefix: &str) -> Result<Signer, Error> {
    validate_address_prefix(prefix)?;

    let digest = Sha256::digest(account.as_bytes());
    let address = bech32::encode(
        prefix,
        digest[..ADDRESS_LENGTH].to_base32(),
        Variant::Bech32,
    )
    .map_err(Error::bech32_encoding)?;

    Signer::from_str(&address).map_err(Error::signer)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn derived_address_uses_prefix() {
        let signer = derive_signer("default", "cosmos").unwrap();
        assert!(signer.as_str().starts_with("cosmos1"));

        let osmo = derive_signer("default", "osmo").unwrap();
        assert!(osmo.as_str().starts_with("osmo1"));
        assert_ne!(signer, osmo);

        assert_eq!(signer, derive_signer("default", "cosmos").unwrap());
        assert_ne!(signer, derive_signer("other", "cosmos").unwrap());
    }

    #[test]
    fn derived_address_round_trips_through_bech32() {
        let signer = derive_signer("relayer", "cosmos").unwrap();
        let (hrp, data, variant) = bech32::decode(signer.as_str()).unwrap();

        assert_eq!(hrp, "cosmos");
        assert_eq!(variant, Variant::Bech32);
        assert_eq!(
            <Vec<u8> as bech32::FromBase32>::from_base32(&data).unwrap().len(),
            ADDRESS_LENGTH
        );
    }

    #[test]
    fn reject_invalid_prefixes() {
        assert!(validate_address_prefix("").is_err());
        assert!(validate_address_prefix("Cosmos").is_err());
        assert!(validate_address_prefix("cos mos").is_err());
        assert!(validate_address_prefix("cosmos1").is_ok());
        assert!(derive_signer("default", "").is_err());
    }

    #[test]
    fn reject_invalid_gas_settings() {
        use ibc_relay_types::core::ics24_host::identifier::ChainId;

        let mut config = ChainConfig::source(ChainId::from_string("ibc-0"));
        assert!(validate_chain_config(&config).is_ok());

        config.gas_limit = 0;
        assert!(validate_chain_config(&config).is_err());

        config.gas_limit = 1;
        config.gas_price = GasPrice::new(-1.0, "stake".to_string());
        assert!(validate_chain_config(&config).is_err());

        config.gas_price = GasPrice::new(0.1, String::new());
        assert!(validate_chain_config(&config).is_err());
    }
}
