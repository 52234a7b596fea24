use core::str::FromStr;

use derive_more::Display;
use flex_error::define_error;
use serde_derive::{Deserialize, Serialize};

define_error! {
    SignerError {
        EmptySigner
            | _ | { "signer cannot be empty" },
    }
}

/// The bech32 address of the account signing a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub struct Signer(String);

impl Signer {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Signer {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_string();
        if s.trim().is_empty() {
            return Err(SignerError::empty_signer());
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for Signer {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn empty_signer_is_rejected() {
        assert!(Signer::from_str("").is_err());
        assert!(Signer::from_str("   ").is_err());
        assert_eq!(
            Signer::from_str("cosmos1abc").unwrap().as_str(),
            "cosmos1abc"
        );
    }
}
