use core::fmt::{Display, Error as FmtError, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::core::ics03_connection::error::Error;
use crate::core::ics04_channel::channel::Order;

/// Stores the identifier and the features supported by a version
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// unique version identifier
    identifier: String,
    /// list of features compatible with the specified identifier
    features: Vec<String>,
}

impl Version {
    /// Checks whether or not the given feature is supported in this version
    pub fn is_supported_feature(&self, feature: String) -> bool {
        self.features.contains(&feature)
    }

    /// Checks that the version has an identifier and at least one feature.
    pub fn validate(&self) -> Result<(), Error> {
        if self.identifier.trim().is_empty() {
            return Err(Error::empty_versions());
        }

        if self.features.is_empty() {
            return Err(Error::empty_features());
        }

        Ok(())
    }
}

impl Default for Version {
    fn default() -> Self {
        Version {
            identifier: "1".to_string(),
            features: vec![
                Order::Ordered.as_str().to_owned(),
                Order::Unordered.as_str().to_owned(),
            ],
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}", self.identifier)
    }
}

/// Returns the lists of supported versions
pub fn get_compatible_versions() -> Vec<Version> {
    vec![Version::default()]
}

/// Selects a version from the intersection of locally supported and counterparty versions.
pub fn pick_version(
    supported_versions: &[Version],
    counterparty_versions: &[Version],
) -> Result<Version, Error> {
    let mut intersection: Vec<Version> = Vec::new();

    for supported_version in supported_versions.iter() {
        for counterparty_version in counterparty_versions.iter() {
            let supported_id = supported_version.identifier.clone();
            if supported_id == counterparty_version.identifier {
                let features = supported_version
                    .features
                    .iter()
                    .filter(|feature| counterparty_version.features.contains(feature))
                    .cloned()
                    .collect::<Vec<_>>();

                if features.is_empty() {
                    continue;
                }

                intersection.push(Version {
                    identifier: supported_id,
                    features,
                });
            }
        }
    }

    intersection.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    intersection
        .into_iter()
        .next()
        .ok_or_else(Error::no_common_version)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{get_compatible_versions, pick_version, Version};

    fn version(identifier: &str, features: &[&str]) -> Version {
        Version {
            identifier: identifier.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn pick_default_version() {
        let picked = pick_version(&get_compatible_versions(), &get_compatible_versions());
        assert_eq!(picked.unwrap(), Version::default());
    }

    #[test]
    fn pick_intersects_features() {
        let counterparty = vec![version("1", &["ORDER_UNORDERED"])];
        let picked = pick_version(&get_compatible_versions(), &counterparty).unwrap();

        assert!(picked.is_supported_feature("ORDER_UNORDERED".to_string()));
        assert!(!picked.is_supported_feature("ORDER_ORDERED".to_string()));
    }

    #[test]
    fn pick_fails_without_common_version() {
        let counterparty = vec![version("2", &["ORDER_UNORDERED"])];
        assert!(pick_version(&get_compatible_versions(), &counterparty).is_err());

        let counterparty = vec![version("1", &["ORDER_DAG"])];
        assert!(pick_version(&get_compatible_versions(), &counterparty).is_err());
    }

    #[test]
    fn empty_version_is_invalid() {
        assert!(version("", &["ORDER_UNORDERED"]).validate().is_err());
        assert!(version("1", &[]).validate().is_err());
        assert!(Version::default().validate().is_ok());
    }
}
