//! Script language versions, redeemer purposes and execution budgets.

use std::error;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// The Plutus language version a script is written against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum LanguageVersion {
    V1,
    V2,
    V3,
}

impl LanguageVersion {
    /// Returns whether scripts of this version can read inline datums and reference
    /// inputs.
    pub fn supports_reference_inputs(self) -> bool {
        !matches!(self, LanguageVersion::V1)
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageVersion::V1 => write!(f, "V1"),
            LanguageVersion::V2 => write!(f, "V2"),
            LanguageVersion::V3 => write!(f, "V3"),
        }
    }
}

/// An error indicating that a string does not name a known language version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownLanguageVersion(pub String);

impl fmt::Display for UnknownLanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown Plutus language version: {}", self.0)
    }
}

impl error::Error for UnknownLanguageVersion {}

impl FromStr for LanguageVersion {
    type Err = UnknownLanguageVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V1" | "v1" => Ok(LanguageVersion::V1),
            "V2" | "v2" => Ok(LanguageVersion::V2),
            "V3" | "v3" => Ok(LanguageVersion::V3),
            _ => Err(UnknownLanguageVersion(s.to_owned())),
        }
    }
}

/// The purpose a redeemer serves, which determines what its index refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum RedeemerTag {
    /// Unlocks a script-locked input; indexes the sorted set of spent inputs.
    Spend,
    /// Authorizes a mint or burn; indexes the sorted set of minted policies.
    Mint,
    /// Authorizes a certificate; indexes the certificate list.
    Cert,
    /// Authorizes a reward withdrawal; indexes the sorted set of reward addresses.
    Reward,
}

impl fmt::Display for RedeemerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedeemerTag::Spend => write!(f, "spend"),
            RedeemerTag::Mint => write!(f, "mint"),
            RedeemerTag::Cert => write!(f, "cert"),
            RedeemerTag::Reward => write!(f, "reward"),
        }
    }
}

/// An execution budget: the memory and CPU steps a script may consume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

/// The budget given to a redeemer when the caller does not supply one.
pub const DEFAULT_REDEEMER_BUDGET: ExUnits = ExUnits {
    mem: 7_000_000,
    steps: 3_000_000_000,
};

impl ExUnits {
    pub const ZERO: ExUnits = ExUnits { mem: 0, steps: 0 };

    pub const fn new(mem: u64, steps: u64) -> Self {
        ExUnits { mem, steps }
    }

    /// Returns whether this budget fits within `limit` in both dimensions.
    pub fn fits_within(&self, limit: &ExUnits) -> bool {
        self.mem <= limit.mem && self.steps <= limit.steps
    }
}

impl Add for ExUnits {
    type Output = Option<ExUnits>;

    fn add(self, rhs: ExUnits) -> Option<ExUnits> {
        Some(ExUnits {
            mem: self.mem.checked_add(rhs.mem)?,
            steps: self.steps.checked_add(rhs.steps)?,
        })
    }
}

impl fmt::Display for ExUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mem / {} steps", self.mem, self.steps)
    }
}

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use proptest::prelude::*;

    use super::{ExUnits, LanguageVersion};

    pub fn arb_language_version() -> impl Strategy<Value = LanguageVersion> {
        prop_oneof![
            Just(LanguageVersion::V1),
            Just(LanguageVersion::V2),
            Just(LanguageVersion::V3),
        ]
    }

    prop_compose! {
        pub fn arb_ex_units()(mem in 0u64..14_000_000, steps in 0u64..10_000_000_000) -> ExUnits {
            ExUnits::new(mem, steps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExUnits, LanguageVersion, DEFAULT_REDEEMER_BUDGET};

    #[test]
    fn parses_language_versions() {
        assert_eq!("V2".parse::<LanguageVersion>().unwrap(), LanguageVersion::V2);
        assert_eq!("v3".parse::<LanguageVersion>().unwrap(), LanguageVersion::V3);
        assert!("V4".parse::<LanguageVersion>().is_err());
        assert!(!LanguageVersion::V1.supports_reference_inputs());
    }

    #[test]
    fn budgets_add_and_compare() {
        let total = (DEFAULT_REDEEMER_BUDGET + DEFAULT_REDEEMER_BUDGET).unwrap();
        assert_eq!(total, ExUnits::new(14_000_000, 6_000_000_000));
        assert!(total.fits_within(&ExUnits::new(14_000_000, 10_000_000_000)));
        assert!(!total.fits_within(&ExUnits::new(13_999_999, 10_000_000_000)));
        assert_eq!(ExUnits::new(u64::MAX, 0) + ExUnits::new(1, 0), None);
    }
}
