//! *A crate for UTXO-model ledger protocol types.*
//!
//! `ledger_protocol` contains the Rust structs, traits and functions shared by everything
//! that assembles transactions for a UTXO-model ledger with Plutus-style scripts: the
//! multi-asset value model, hash and identifier types, references to transaction
//! outputs, script and datum payloads, redeemer budgets, and the network and protocol
//! parameters that configure a transaction builder.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// Catch documentation errors caused by code changes.
#![deny(rustdoc::broken_intra_doc_links)]

pub mod consensus;
pub mod data;
pub mod params;
pub mod script;
pub mod value;

mod address;
pub use address::{Address, AddressError, RewardAddress, HRP_REWARD_MAINNET, HRP_REWARD_TESTNET};

mod hash;
pub use hash::{HashParseError, KeyHash, PolicyId, ScriptHash, TxHash};

mod txin;
pub use txin::{TxInputRef, TxInputRefParseError};

/// Strategies for generating hashes and output references in property tests.
#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    pub use crate::hash::testing::*;
    pub use crate::txin::testing::*;
}
