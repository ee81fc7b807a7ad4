//! Addresses, and the decoding of reward addresses.

use std::cmp::Ordering;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The human-readable prefix of mainnet reward addresses.
pub const HRP_REWARD_MAINNET: &str = "stake";
/// The human-readable prefix of reward addresses on every test network.
pub const HRP_REWARD_TESTNET: &str = "stake_test";

/// The length of a reward account: a header byte followed by a 28-byte credential.
const REWARD_ACCOUNT_LEN: usize = 29;

/// A destination on the ledger, in its bech32 text encoding.
///
/// Payment addresses are carried opaquely; decoding them and checking their network is
/// the responsibility of the ledger engine that encodes the final transaction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps the given encoded address.
    pub fn new(encoded: impl Into<String>) -> Self {
        Address(encoded.into())
    }

    /// Returns the encoded form of this address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An error while decoding a [`RewardAddress`].
#[derive(Debug)]
pub enum AddressError {
    /// The string is not valid bech32.
    Bech32(bech32::DecodeError),
    /// The human-readable prefix is not one used by reward addresses, or does not match
    /// the network in the header.
    UnexpectedHrp(String),
    /// The decoded payload has the wrong length.
    InvalidLength(usize),
    /// The header byte does not describe a reward address.
    NotRewardAddress(u8),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Bech32(e) => write!(f, "Invalid bech32 encoding: {}", e),
            AddressError::UnexpectedHrp(hrp) => {
                write!(f, "Unexpected human-readable prefix {:?}", hrp)
            }
            AddressError::InvalidLength(len) => write!(
                f,
                "Reward accounts are {} bytes, got {}",
                REWARD_ACCOUNT_LEN, len
            ),
            AddressError::NotRewardAddress(header) => {
                write!(f, "Header {:#04x} is not a reward address header", header)
            }
        }
    }
}

impl error::Error for AddressError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            AddressError::Bech32(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bech32::DecodeError> for AddressError {
    fn from(e: bech32::DecodeError) -> Self {
        AddressError::Bech32(e)
    }
}

/// A reward address, decoded into the reward account it names.
///
/// Reward addresses compare and order by their account bytes, which is the order the
/// ledger keeps withdrawals in. This differs from the order of their text encodings.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RewardAddress {
    encoded: Address,
    account: Vec<u8>,
}

impl RewardAddress {
    /// Decodes a bech32 reward address.
    pub fn parse(encoded: &str) -> Result<Self, AddressError> {
        let (hrp, account) = bech32::decode(encoded)?;
        if account.len() != REWARD_ACCOUNT_LEN {
            return Err(AddressError::InvalidLength(account.len()));
        }
        let header = account[0];
        if header >> 5 != 0b111 {
            return Err(AddressError::NotRewardAddress(header));
        }
        let expected_hrp = match header & 0x0f {
            1 => HRP_REWARD_MAINNET,
            _ => HRP_REWARD_TESTNET,
        };
        if hrp.as_str() != expected_hrp {
            return Err(AddressError::UnexpectedHrp(hrp.as_str().to_owned()));
        }

        Ok(RewardAddress {
            encoded: Address::new(encoded),
            account,
        })
    }

    /// Returns the reward account bytes: the header followed by the stake credential.
    pub fn account(&self) -> &[u8] {
        &self.account
    }

    /// Returns whether the stake credential is a script hash.
    pub fn is_script(&self) -> bool {
        self.account[0] & 0x10 != 0
    }

    /// Returns the network id carried in the header.
    pub fn network_id(&self) -> u8 {
        self.account[0] & 0x0f
    }

    pub fn as_address(&self) -> &Address {
        &self.encoded
    }
}

impl PartialEq for RewardAddress {
    fn eq(&self, other: &Self) -> bool {
        self.account == other.account
    }
}

impl Eq for RewardAddress {}

impl Hash for RewardAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.account.hash(state);
    }
}

impl Ord for RewardAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.account.cmp(&other.account)
    }
}

impl PartialOrd for RewardAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::str::FromStr for RewardAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RewardAddress::parse(s)
    }
}

impl TryFrom<String> for RewardAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RewardAddress::parse(&value)
    }
}

impl From<RewardAddress> for String {
    fn from(value: RewardAddress) -> Self {
        value.encoded.0
    }
}

impl fmt::Display for RewardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoded.as_str())
    }
}
