//! Custom serde helpers for byte fields.

pub mod hex {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use subtle_encoding::{Encoding, Hex};

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex = Hex::upper_case()
            .encode_to_string(data)
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hex::upper_case()
            .decode(s.to_uppercase().as_bytes())
            .map_err(D::Error::custom)
    }
}

pub mod base64 {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = subtle_encoding::base64::encode(data);
        let s = String::from_utf8(encoded).map_err(S::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        subtle_encoding::base64::decode(s.as_bytes()).map_err(D::Error::custom)
    }
}
