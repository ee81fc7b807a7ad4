use std::error;
use std::fmt;
use std::str::FromStr;

use crate::hash::{HashParseError, TxHash};

/// A reference to an output of a previous transaction.
///
/// The derived ordering (transaction hash, then output index) is the canonical order in
/// which the ledger sorts the inputs of a transaction body, and therefore the order that
/// redeemer indices refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TxInputRef {
    tx_hash: TxHash,
    index: u32,
}

impl TxInputRef {
    /// Constructs a `TxInputRef` for the output at `index` in the transaction with the
    /// given hash.
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        TxInputRef { tx_hash, index }
    }

    /// Constructs a fake `TxInputRef` for use in tests.
    #[cfg(any(test, feature = "test-dependencies"))]
    pub const fn fake(n: u8) -> Self {
        TxInputRef {
            tx_hash: TxHash::from_bytes([n; 32]),
            index: n as u32,
        }
    }

    /// Returns the hash of the transaction containing the referenced output.
    pub fn tx_hash(&self) -> &TxHash {
        &self.tx_hash
    }

    /// Returns the index of the referenced output within its transaction.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for TxInputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// Errors that can occur when parsing a [`TxInputRef`] from its `<hash>#<index>` form.
#[derive(Clone, Debug, PartialEq)]
pub enum TxInputRefParseError {
    MissingSeparator,
    InvalidHash(HashParseError),
    InvalidIndex,
}

impl fmt::Display for TxInputRefParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxInputRefParseError::MissingSeparator => {
                write!(f, "Expected an output reference of the form <hash>#<index>")
            }
            TxInputRefParseError::InvalidHash(e) => write!(f, "Invalid transaction hash: {}", e),
            TxInputRefParseError::InvalidIndex => write!(f, "Invalid output index"),
        }
    }
}

impl error::Error for TxInputRefParseError {}

impl FromStr for TxInputRef {
    type Err = TxInputRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s
            .split_once('#')
            .ok_or(TxInputRefParseError::MissingSeparator)?;
        let tx_hash = hash.parse().map_err(TxInputRefParseError::InvalidHash)?;
        let index = index
            .parse()
            .map_err(|_| TxInputRefParseError::InvalidIndex)?;
        Ok(TxInputRef::new(tx_hash, index))
    }
}

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use proptest::prelude::*;

    use super::TxInputRef;
    use crate::hash::testing::arb_tx_hash;

    prop_compose! {
        pub fn arb_tx_input_ref()(tx_hash in arb_tx_hash(), index in 0..100u32) -> TxInputRef {
            TxInputRef::new(tx_hash, index)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{TxInputRef, TxInputRefParseError};
    use crate::hash::TxHash;

    #[test]
    fn parses_hash_and_index() {
        let s = format!("{}#7", "ab".repeat(32));
        let parsed: TxInputRef = s.parse().unwrap();
        assert_eq!(parsed.index(), 7);
        assert_eq!(parsed.tx_hash(), &TxHash::from_bytes([0xab; 32]));
        assert_eq!(parsed.to_string(), s);
    }

    #[test]
    fn rejects_malformed_references() {
        assert_matches!(
            "abcd".parse::<TxInputRef>(),
            Err(TxInputRefParseError::MissingSeparator)
        );
        assert_matches!(
            "abcd#0".parse::<TxInputRef>(),
            Err(TxInputRefParseError::InvalidHash(_))
        );
        assert_matches!(
            format!("{}#x", "00".repeat(32)).parse::<TxInputRef>(),
            Err(TxInputRefParseError::InvalidIndex)
        );
    }

    #[test]
    fn orders_by_hash_then_index() {
        let a = TxInputRef::new(TxHash::from_bytes([1; 32]), 5);
        let b = TxInputRef::new(TxHash::from_bytes([1; 32]), 6);
        let c = TxInputRef::new(TxHash::from_bytes([2; 32]), 0);
        let mut refs = vec![c, b, a];
        refs.sort();
        assert_eq!(refs, vec![a, b, c]);
    }
}
