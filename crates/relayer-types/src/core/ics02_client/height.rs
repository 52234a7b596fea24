use core::cmp::Ordering;
use core::fmt::{Debug, Display, Error as FmtError, Formatter};
use core::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::core::ics02_client::error::Error;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Height {
    /// Previously known as "epoch"
    revision_number: u64,

    /// The height of a block
    revision_height: u64,
}

impl Height {
    pub fn new(revision_number: u64, revision_height: u64) -> Result<Self, Error> {
        if revision_height == 0 {
            return Err(Error::invalid_height());
        }

        Ok(Self {
            revision_number,
            revision_height,
        })
    }

    pub fn revision_number(&self) -> u64 {
        self.revision_number
    }

    pub fn revision_height(&self) -> u64 {
        self.revision_height
    }

    pub fn add(&self, delta: u64) -> Height {
        Height {
            revision_number: self.revision_number,
            revision_height: self.revision_height + delta,
        }
    }

    pub fn increment(&self) -> Height {
        self.add(1)
    }

    pub fn sub(&self, delta: u64) -> Result<Height, Error> {
        if self.revision_height <= delta {
            return Err(Error::invalid_height_result());
        }

        Ok(Height {
            revision_number: self.revision_number,
            revision_height: self.revision_height - delta,
        })
    }

    pub fn decrement(&self) -> Result<Height, Error> {
        self.sub(1)
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.revision_number < other.revision_number {
            Ordering::Less
        } else if self.revision_number > other.revision_number {
            Ordering::Greater
        } else if self.revision_height < other.revision_height {
            Ordering::Less
        } else if self.revision_height > other.revision_height {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl Debug for Height {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("Height")
            .field("revision", &self.revision_number)
            .field("height", &self.revision_height)
            .finish()
    }
}

impl Display for Height {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl TryFrom<&str> for Height {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (revision_number, revision_height) = value
            .split_once('-')
            .ok_or_else(Error::invalid_height)?;

        let revision_number = revision_number
            .parse::<u64>()
            .map_err(|e| Error::invalid_raw_height(value.to_owned(), e))?;

        let revision_height = revision_height
            .parse::<u64>()
            .map_err(|e| Error::invalid_raw_height(value.to_owned(), e))?;

        Height::new(revision_number, revision_height)
    }
}

impl From<Height> for String {
    fn from(height: Height) -> Self {
        format!("{}-{}", height.revision_number, height.revision_height)
    }
}

impl FromStr for Height {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Height::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn zero_height_is_rejected() {
        assert!(Height::new(0, 0).is_err());
        assert!(Height::new(1, 0).is_err());
        assert!(Height::new(0, 1).is_ok());
    }

    #[test]
    fn height_ordering_is_lexicographic() {
        let low = Height::new(0, 100).unwrap();
        let high = Height::new(1, 1).unwrap();

        assert!(low < high);
        assert!(low.increment() > low);
        assert_eq!(low.add(5).revision_height(), 105);
    }

    #[test]
    fn height_cannot_decrement_to_zero() {
        let one = Height::new(0, 1).unwrap();
        assert!(one.decrement().is_err());

        let two = Height::new(0, 2).unwrap();
        assert_eq!(two.decrement().unwrap(), one);
    }

    #[test]
    fn parse_height_from_string() {
        let height: Height = "1-42".parse().unwrap();
        assert_eq!(height.revision_number(), 1);
        assert_eq!(height.revision_height(), 42);
        assert_eq!(height.to_string(), "1-42");

        assert!("1-0".parse::<Height>().is_err());
        assert!("abc".parse::<Height>().is_err());
        assert!("1-x".parse::<Height>().is_err());
    }
}
