//! Defines coin types; the objects that are being transferred.

use core::fmt::{Display, Error as FmtError, Formatter};
use core::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use super::error::Error;

/// Coin defines a token with a denomination and an amount.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn from_string_list(coin_str: &str) -> Result<Vec<Self>, Error> {
        coin_str.split(',').map(FromStr::from_str).collect()
    }
}

impl FromStr for Coin {
    type Err = Error;

    fn from_str(coin_str: &str) -> Result<Self, Error> {
        // Denominations start after the leading digits and only carry letters,
        // digits and the separators '/', ':', '.', '_' or '-'.
        let (amount, denom) = coin_str
            .chars()
            .position(|x| !x.is_ascii_digit())
            .map(|index| coin_str.split_at(index))
            .filter(|(amount, denom)| !amount.is_empty() && !denom.is_empty())
            .filter(|(_, denom)| {
                !denom.contains(|x| {
                    !matches!(x, 'a'..='z' | 'A'..='Z' | '0'..='9' | '/' | ':' | '.' | '_' | '-')
                })
            })
            .ok_or_else(|| Error::invalid_coin(coin_str.to_string()))?;

        let amount = amount
            .parse()
            .map_err(|e| Error::invalid_amount(amount.to_string(), e))?;

        Ok(Coin {
            denom: denom.to_string(),
            amount,
        })
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Renders a list of coins comma-separated, or `-` when there is nothing to show.
pub fn display_coins(coins: &[Coin]) -> String {
    if coins.is_empty() {
        return "-".to_string();
    }

    coins
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn parse_raw_coin() {
        assert_eq!(Coin::from_str("123stake").unwrap(), Coin::new(123, "stake"));
        assert_eq!(Coin::from_str("1a1").unwrap(), Coin::new(1, "a1"));
        assert_eq!(
            Coin::from_str("10ibc/ABCD").unwrap(),
            Coin::new(10, "ibc/ABCD")
        );
    }

    #[test]
    fn reject_malformed_coin() {
        assert!(Coin::from_str("0x!").is_err());
        assert!(Coin::from_str("stake").is_err());
        assert!(Coin::from_str("100").is_err());
        assert!(Coin::from_str("").is_err());
    }

    #[test]
    fn parse_coin_list() {
        let coins = Coin::from_string_list("123stake,1a1,999den0m").unwrap();
        assert_eq!(
            coins,
            vec![
                Coin::new(123, "stake"),
                Coin::new(1, "a1"),
                Coin::new(999, "den0m")
            ]
        );
    }

    #[test]
    fn display_coin_list() {
        assert_eq!(display_coins(&[]), "-");
        assert_eq!(
            display_coins(&[Coin::new(100, "token"), Coin::new(5, "stake")]),
            "100token, 5stake"
        );
    }
}
