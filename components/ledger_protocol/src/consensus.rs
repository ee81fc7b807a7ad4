//! Networks and the slot clock.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A slot number: the unit of time in which transaction validity intervals are
/// expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Slot(u64);

impl Slot {
    pub const fn from_u64(v: u64) -> Slot {
        Slot(v)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for Slot {
    fn from(value: u64) -> Self {
        Slot(value)
    }
}

impl From<Slot> for u64 {
    fn from(value: Slot) -> u64 {
        value.0
    }
}

impl Add<u64> for Slot {
    type Output = Self;

    fn add(self, other: u64) -> Self {
        Slot(self.0.saturating_add(other))
    }
}

impl Sub<u64> for Slot {
    type Output = Self;

    fn sub(self, other: u64) -> Self {
        Slot(self.0.saturating_sub(other))
    }
}

/// The mapping between wall-clock time and slots for a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotConfig {
    /// Unix time in milliseconds at the start of `zero_slot`.
    pub zero_time: u64,
    /// The first slot from which slots have had length `slot_length`.
    pub zero_slot: u64,
    /// Slot length in milliseconds.
    pub slot_length: u64,
}

/// The networks a transaction can be built for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Preprod,
    Preview,
    /// The legacy public testnet.
    Testnet,
}

impl Network {
    /// Returns the network id that addresses and transaction bodies carry for this
    /// network.
    pub fn network_id(self) -> u8 {
        match self {
            Network::Mainnet => 1,
            Network::Preprod | Network::Preview | Network::Testnet => 0,
        }
    }

    /// Returns the slot clock of this network.
    pub fn slot_config(self) -> SlotConfig {
        match self {
            Network::Mainnet => SlotConfig {
                zero_time: 1_596_059_091_000,
                zero_slot: 4_492_800,
                slot_length: 1000,
            },
            Network::Preprod => SlotConfig {
                zero_time: 1_655_769_600_000,
                zero_slot: 86_400,
                slot_length: 1000,
            },
            Network::Preview => SlotConfig {
                zero_time: 1_666_656_000_000,
                zero_slot: 0,
                slot_length: 1000,
            },
            Network::Testnet => SlotConfig {
                zero_time: 1_595_967_616_000,
                zero_slot: 1_598_400,
                slot_length: 1000,
            },
        }
    }

    /// Returns the slot containing the given Unix time in milliseconds.
    ///
    /// Times before the start of the slot clock map to its first slot.
    pub fn slot_at(self, unix_millis: u64) -> Slot {
        let config = self.slot_config();
        let elapsed = unix_millis.saturating_sub(config.zero_time);
        Slot(config.zero_slot.saturating_add(elapsed / config.slot_length))
    }

    /// Returns the Unix time in milliseconds at which `slot` begins, or `None` if that
    /// time cannot be represented.
    pub fn slot_start(self, slot: Slot) -> Option<u64> {
        let config = self.slot_config();
        let elapsed = slot.0.saturating_sub(config.zero_slot);
        elapsed
            .checked_mul(config.slot_length)?
            .checked_add(config.zero_time)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Preprod => write!(f, "preprod"),
            Network::Preview => write!(f, "preview"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}
