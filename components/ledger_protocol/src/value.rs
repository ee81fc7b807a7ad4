//! The multi-asset value model.

use std::error;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::hash::{HashParseError, PolicyId};

/// The number of lovelace in one unit of the native currency.
pub const COIN: u64 = 1_000_000;
/// The total supply of the native currency, in lovelace.
pub const MAX_LOVELACE: u64 = 45_000_000_000 * COIN;
/// The maximum length of an asset name, in bytes.
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// A type for balance violations in value addition and subtraction
/// (overflow and underflow of allowed ranges)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BalanceError {
    Overflow,
    Underflow,
}

impl error::Error for BalanceError {}

impl fmt::Display for BalanceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            BalanceError::Overflow => {
                write!(f, "Value addition resulted in a value outside the valid range.")
            }
            BalanceError::Underflow => write!(
                f,
                "Value subtraction resulted in a value outside the valid range."
            ),
        }
    }
}

/// A type-safe representation of some nonnegative amount of the native currency.
///
/// A `Lovelace` can only be constructed from an integer that is within the valid
/// monetary range of `{0..MAX_LOVELACE}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Lovelace(u64);

impl Lovelace {
    /// Returns the identity `Lovelace`
    pub const ZERO: Self = Lovelace(0);

    /// Returns this amount as a u64.
    pub fn into_u64(self) -> u64 {
        self.0
    }

    /// Creates a `Lovelace` from a u64.
    ///
    /// Returns an error if the amount is outside the range `{0..MAX_LOVELACE}`.
    pub fn from_u64(amount: u64) -> Result<Self, BalanceError> {
        if amount <= MAX_LOVELACE {
            Ok(Lovelace(amount))
        } else {
            Err(BalanceError::Overflow)
        }
    }

    /// Creates a constant `Lovelace` from a u64.
    ///
    /// Panics: if the amount is outside the range `{0..MAX_LOVELACE}`.
    pub const fn const_from_u64(amount: u64) -> Self {
        assert!(amount <= MAX_LOVELACE); // contains is not const
        Lovelace(amount)
    }

    /// Returns whether or not this `Lovelace` is the zero value.
    pub fn is_zero(&self) -> bool {
        self == &Lovelace::ZERO
    }
}

impl TryFrom<u64> for Lovelace {
    type Error = BalanceError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Lovelace::from_u64(value)
    }
}

impl From<Lovelace> for u64 {
    fn from(value: Lovelace) -> Self {
        value.0
    }
}

impl Add<Lovelace> for Lovelace {
    type Output = Option<Lovelace>;

    fn add(self, rhs: Lovelace) -> Option<Lovelace> {
        Lovelace::from_u64(self.0.checked_add(rhs.0)?).ok()
    }
}

impl Add<Lovelace> for Option<Lovelace> {
    type Output = Self;

    fn add(self, rhs: Lovelace) -> Option<Lovelace> {
        self.and_then(|lhs| lhs + rhs)
    }
}

impl Sub<Lovelace> for Lovelace {
    type Output = Option<Lovelace>;

    fn sub(self, rhs: Lovelace) -> Option<Lovelace> {
        Lovelace::from_u64(self.0.checked_sub(rhs.0)?).ok()
    }
}

impl Sum<Lovelace> for Option<Lovelace> {
    fn sum<I: Iterator<Item = Lovelace>>(iter: I) -> Self {
        iter.fold(Some(Lovelace::ZERO), |acc, a| acc? + a)
    }
}

impl fmt::Display for Lovelace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lovelace", self.0)
    }
}

/// The name of a token under a minting policy: between zero and 32 arbitrary bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    /// Creates an asset name, returning `None` if it is longer than
    /// [`MAX_ASSET_NAME_LEN`] bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        (bytes.len() <= MAX_ASSET_NAME_LEN).then_some(AssetName(bytes))
    }

    /// Parses an asset name from its hex encoding.
    pub fn from_hex(s: &str) -> Option<Self> {
        hex::decode(s).ok().and_then(AssetName::new)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.chars().all(|c| c.is_ascii_graphic()) => {
                f.debug_tuple("AssetName").field(&s).finish()
            }
            _ => f
                .debug_tuple("AssetName")
                .field(&hex::encode(&self.0))
                .finish(),
        }
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Identifies one kind of asset that a [`Value`] can hold.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum AssetUnit {
    /// The ledger-native currency.
    Lovelace,
    /// A token minted under a policy.
    Token { policy: PolicyId, name: AssetName },
}

impl AssetUnit {
    pub fn token(policy: PolicyId, name: AssetName) -> Self {
        AssetUnit::Token { policy, name }
    }
}

/// Displays the unit the way data providers key their asset maps: `lovelace`, or the
/// hex policy id immediately followed by the hex asset name.
impl fmt::Display for AssetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetUnit::Lovelace => f.write_str("lovelace"),
            AssetUnit::Token { policy, name } => write!(f, "{}{}", policy, name),
        }
    }
}

/// Errors that can occur when parsing an [`AssetUnit`].
#[derive(Clone, Debug, PartialEq)]
pub enum AssetUnitParseError {
    /// The unit contains characters outside the hex alphabet.
    NotHex,
    InvalidPolicy(HashParseError),
    InvalidAssetName,
}

impl fmt::Display for AssetUnitParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetUnitParseError::NotHex => write!(f, "Asset unit is not hex-encoded"),
            AssetUnitParseError::InvalidPolicy(e) => write!(f, "Invalid policy id: {}", e),
            AssetUnitParseError::InvalidAssetName => write!(f, "Invalid asset name"),
        }
    }
}

impl error::Error for AssetUnitParseError {}

impl FromStr for AssetUnit {
    type Err = AssetUnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "lovelace" || s.is_empty() {
            return Ok(AssetUnit::Lovelace);
        }
        if !s.is_ascii() {
            return Err(AssetUnitParseError::NotHex);
        }
        let split = (PolicyId::LEN * 2).min(s.len());
        let (policy, name) = s.split_at(split);
        let policy = policy.parse().map_err(AssetUnitParseError::InvalidPolicy)?;
        let name = AssetName::from_hex(name).ok_or(AssetUnitParseError::InvalidAssetName)?;
        Ok(AssetUnit::Token { policy, name })
    }
}

/// An amount of the native currency together with zero or more other tokens.
///
/// Represented as an ordered list of `(unit, quantity)` pairs. The order is the order in
/// which units were first added; each unit appears at most once, and zero quantities are
/// not stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<(AssetUnit, u64)>")]
pub struct Value(Vec<(AssetUnit, u64)>);

/// Errors that can occur when building a [`Value`] from a list of entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueError {
    DuplicateUnit(AssetUnit),
    ZeroQuantity(AssetUnit),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::DuplicateUnit(unit) => write!(f, "Unit {} appears more than once", unit),
            ValueError::ZeroQuantity(unit) => write!(f, "Unit {} has a zero quantity", unit),
        }
    }
}

impl error::Error for ValueError {}

impl TryFrom<Vec<(AssetUnit, u64)>> for Value {
    type Error = ValueError;

    fn try_from(entries: Vec<(AssetUnit, u64)>) -> Result<Self, Self::Error> {
        for (i, (unit, quantity)) in entries.iter().enumerate() {
            if *quantity == 0 {
                return Err(ValueError::ZeroQuantity(unit.clone()));
            }
            if entries[..i].iter().any(|(u, _)| u == unit) {
                return Err(ValueError::DuplicateUnit(unit.clone()));
            }
        }
        Ok(Value(entries))
    }
}

impl Value {
    /// The empty value.
    pub fn zero() -> Self {
        Value(vec![])
    }

    /// A value consisting only of the given amount of lovelace.
    pub fn lovelace(amount: u64) -> Self {
        let mut value = Value::zero();
        if amount > 0 {
            value.0.push((AssetUnit::Lovelace, amount));
        }
        value
    }

    /// Returns this value with `quantity` more of `unit`, or an error if the quantity of
    /// `unit` would overflow.
    pub fn with(mut self, unit: AssetUnit, quantity: u64) -> Result<Self, BalanceError> {
        self.add_quantity(unit, quantity)?;
        Ok(self)
    }

    fn add_quantity(&mut self, unit: AssetUnit, quantity: u64) -> Result<(), BalanceError> {
        if quantity == 0 {
            return Ok(());
        }
        match self.0.iter_mut().find(|(u, _)| u == &unit) {
            Some((_, existing)) => {
                *existing = existing
                    .checked_add(quantity)
                    .ok_or(BalanceError::Overflow)?;
            }
            None => self.0.push((unit, quantity)),
        }
        Ok(())
    }

    /// Returns the sum of `self` and `other`, preserving the unit order of `self` and
    /// appending units that only `other` holds.
    pub fn checked_add(&self, other: &Value) -> Result<Value, BalanceError> {
        let mut result = self.clone();
        for (unit, quantity) in &other.0 {
            result.add_quantity(unit.clone(), *quantity)?;
        }
        Ok(result)
    }

    /// Returns `self` minus `other`, failing if any unit would go negative.
    pub fn checked_sub(&self, other: &Value) -> Result<Value, BalanceError> {
        let mut result = self.clone();
        for (unit, quantity) in &other.0 {
            if *quantity == 0 {
                continue;
            }
            let position = result
                .0
                .iter()
                .position(|(u, _)| u == unit)
                .ok_or(BalanceError::Underflow)?;
            let existing = &mut result.0[position].1;
            *existing = existing
                .checked_sub(*quantity)
                .ok_or(BalanceError::Underflow)?;
            if *existing == 0 {
                result.0.remove(position);
            }
        }
        Ok(result)
    }

    /// Returns the quantity of `unit` held by this value.
    pub fn quantity_of(&self, unit: &AssetUnit) -> u64 {
        self.0
            .iter()
            .find(|(u, _)| u == unit)
            .map(|(_, q)| *q)
            .unwrap_or(0)
    }

    /// Returns the amount of the native currency held by this value.
    pub fn coin(&self) -> u64 {
        self.quantity_of(&AssetUnit::Lovelace)
    }

    /// Returns the non-native tokens held by this value, in order.
    pub fn tokens(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        self.0.iter().filter_map(|(unit, q)| match unit {
            AssetUnit::Lovelace => None,
            AssetUnit::Token { policy, name } => Some((policy, name, *q)),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AssetUnit, u64)> {
        self.0.iter()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::{AssetName, AssetUnit, Lovelace, Value, MAX_LOVELACE};
    use crate::hash::testing::arb_script_hash;

    prop_compose! {
        pub fn arb_lovelace()(amt in 0u64..MAX_LOVELACE) -> Lovelace {
            Lovelace::from_u64(amt).unwrap()
        }
    }

    prop_compose! {
        pub fn arb_asset_name()(bytes in vec(any::<u8>(), 0..=32)) -> AssetName {
            AssetName::new(bytes).unwrap()
        }
    }

    prop_compose! {
        pub fn arb_token_unit()(policy in arb_script_hash(), name in arb_asset_name()) -> AssetUnit {
            AssetUnit::token(policy, name)
        }
    }

    prop_compose! {
        pub fn arb_value()(
            coin in 1u64..1_000_000_000_000,
            tokens in vec((arb_token_unit(), 1u64..1_000_000), 0..4),
        ) -> Value {
            tokens
                .into_iter()
                .fold(Value::lovelace(coin), |acc, (unit, q)| acc.with(unit, q).unwrap())
        }
    }
}
