use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::Height;

/// Indicates a consensus height on the destination chain after which the packet
/// will no longer be processed, and will instead count as having timed-out.
///
/// `TimeoutHeight` is treated differently from other heights because a zero
/// timeout height is legal and meaningful: it means "no timeout".
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimeoutHeight {
    #[default]
    Never,
    At(Height),
}

impl TimeoutHeight {
    pub fn no_timeout() -> Self {
        Self::Never
    }

    /// Revision number to be used in packet commitment computation
    pub fn commitment_revision_number(&self) -> u64 {
        match self {
            Self::At(height) => height.revision_number(),
            Self::Never => 0,
        }
    }

    /// Revision height to be used in packet commitment computation
    pub fn commitment_revision_height(&self) -> u64 {
        match self {
            Self::At(height) => height.revision_height(),
            Self::Never => 0,
        }
    }

    /// Check if a height has reached the timeout height, and thus is
    /// deemed expired. A packet can only be received while the
    /// destination height is strictly below its timeout height.
    pub fn has_expired(&self, height: Height) -> bool {
        match self {
            Self::At(timeout_height) => height >= *timeout_height,
            // When there's no timeout, heights are never expired
            Self::Never => false,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl From<Height> for TimeoutHeight {
    fn from(height: Height) -> Self {
        Self::At(height)
    }
}

impl Display for TimeoutHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            TimeoutHeight::At(timeout_height) => write!(f, "{timeout_height}"),
            TimeoutHeight::Never => write!(f, "no timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::TimeoutHeight;
    use crate::test_utils::height;

    #[test]
    fn expiry_is_inclusive_of_the_timeout_height() {
        let timeout = TimeoutHeight::At(height(5));

        assert!(!timeout.has_expired(height(4)));
        assert!(timeout.has_expired(height(5)));
        assert!(timeout.has_expired(height(6)));
    }

    #[test]
    fn no_timeout_never_expires() {
        let timeout = TimeoutHeight::no_timeout();

        assert!(!timeout.is_set());
        assert!(!timeout.has_expired(height(u64::MAX)));
        assert_eq!(timeout.commitment_revision_height(), 0);
    }
}
