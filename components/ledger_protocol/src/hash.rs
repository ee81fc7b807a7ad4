use std::error;
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a hash from its hex encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum HashParseError {
    /// The input was not valid hex.
    InvalidHex(hex::FromHexError),
    /// The input decoded to the wrong number of bytes.
    InvalidLength { expected: usize, actual: usize },
}

impl fmt::Display for HashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashParseError::InvalidHex(e) => write!(f, "Invalid hex encoding: {}", e),
            HashParseError::InvalidLength { expected, actual } => write!(
                f,
                "Expected a {}-byte hash, got {} bytes",
                expected, actual
            ),
        }
    }
}

impl error::Error for HashParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            HashParseError::InvalidHex(e) => Some(e),
            HashParseError::InvalidLength { .. } => None,
        }
    }
}

macro_rules! define_hash {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            /// The length of this hash, in bytes.
            pub const LEN: usize = $len;

            /// Wraps the given byte array.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            /// Returns the raw bytes of this hash.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parses a hash from a byte slice of exactly the right length.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, HashParseError> {
                <[u8; $len]>::try_from(bytes)
                    .map($name)
                    .map_err(|_| HashParseError::InvalidLength {
                        expected: $len,
                        actual: bytes.len(),
                    })
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&hex::encode(self.0))
                    .finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(HashParseError::InvalidHex)?;
                Self::from_slice(&bytes)
            }
        }

        impl AsRef<[u8; $len]> for $name {
            fn as_ref(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_hash!(
    /// The identifier of a transaction: the BLAKE2b-256 hash of its body.
    TxHash,
    32
);

define_hash!(
    /// The BLAKE2b-224 hash of a verification key.
    KeyHash,
    28
);

define_hash!(
    /// The BLAKE2b-224 hash of a script (native or Plutus).
    ScriptHash,
    28
);

/// A minting policy is identified by the hash of the script that authorizes it.
pub type PolicyId = ScriptHash;

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use proptest::prelude::*;

    use super::{KeyHash, ScriptHash, TxHash};

    prop_compose! {
        pub fn arb_tx_hash()(bytes in prop::array::uniform32(any::<u8>())) -> TxHash {
            TxHash::from_bytes(bytes)
        }
    }

    prop_compose! {
        pub fn arb_key_hash()(bytes in prop::collection::vec(any::<u8>(), 28)) -> KeyHash {
            KeyHash::from_slice(&bytes).unwrap()
        }
    }

    prop_compose! {
        pub fn arb_script_hash()(bytes in prop::collection::vec(any::<u8>(), 28)) -> ScriptHash {
            ScriptHash::from_slice(&bytes).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{HashParseError, KeyHash, TxHash};

    #[test]
    fn hex_round_trip_is_not_byte_flipped() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hash = TxHash::from_bytes(bytes);
        let encoded = hash.to_string();
        assert!(encoded.starts_with("ab"));
        assert!(encoded.ends_with("01"));
        assert_eq!(encoded.parse::<TxHash>().unwrap(), hash);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_matches!(
            "00ff".parse::<KeyHash>(),
            Err(HashParseError::InvalidLength {
                expected: 28,
                actual: 2
            })
        );
        assert_matches!("zz".parse::<KeyHash>(), Err(HashParseError::InvalidHex(_)));
    }
}
