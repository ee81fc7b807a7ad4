//! *A staged transaction builder for UTXO-model ledgers.*
//!
//! Transactions are described through a sequence of directives on a
//! [`TxBuilder`](builder::TxBuilder), and then handed to a native ledger engine for
//! balancing, encoding and hashing. The roles involved are:
//! - Builder (single entity)
//!   - Stages and validates inputs, outputs, mint items, withdrawals and certificates,
//!     and commits them only once their witnesses are complete.
//! - Ledger engine (a [`LedgerEngine`](engine::LedgerEngine) implementation)
//!   - Encodes and hashes the finalized body, and signs body hashes.
//! - Signers (anyone holding a required key)
//!   - Sign the finalized body hash, in any order. Their signatures are merged into the
//!     engine's witness set when the transaction is completed.
//! - UTXO fetcher (optional, a [`UtxoFetcher`](engine::UtxoFetcher) implementation)
//!   - Resolves the value and address of inputs the caller named only by reference.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// Catch documentation errors caused by code changes.
#![deny(rustdoc::broken_intra_doc_links)]

pub mod body;
pub mod builder;
pub mod certificate;
pub mod engine;
pub mod error;
pub mod input;
pub mod mint;
pub mod output;
pub mod signing;
pub mod withdrawal;
pub mod witness;

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing;

pub use builder::{Mode, TxBuilder};
pub use error::{BuildError, Error, ResolveError};
