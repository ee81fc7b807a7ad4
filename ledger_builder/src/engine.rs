//! The collaborators the builder relies on: a ledger engine that encodes, hashes and
//! signs transactions, and a fetcher that resolves the outputs being spent.

use ledger_protocol::{params::ProtocolParameters, value::Value, Address, TxHash, TxInputRef};

use crate::{
    body::{AuxiliaryData, TxBody},
    signing::{Signature, WitnessSet},
};

/// A transaction body as encoded by a [`LedgerEngine`], before any key has signed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedBody {
    /// The engine's encoding of the body. This is what gets hashed and signed.
    pub body: Vec<u8>,
    /// The witnesses the engine derived from the body itself: scripts, datums and
    /// redeemers. Key witnesses are added when the transaction is signed.
    pub witness_set: WitnessSet,
}

/// A native ledger implementation.
///
/// The engine performs the parts of transaction construction that depend on the exact
/// ledger rules and binary format: balancing, fee computation, encoding, hashing and
/// signing. The builder hands it complete, validated collections.
pub trait LedgerEngine {
    type Error;

    /// Encodes the given body, balancing it against the given protocol parameters.
    fn build_transaction_body(
        &self,
        body: &TxBody,
        params: &ProtocolParameters,
    ) -> Result<UnsignedBody, Self::Error>;

    /// Computes the hash that identifies the transaction and that signers sign.
    fn hash_transaction_body(&self, unsigned: &UnsignedBody) -> Result<TxHash, Self::Error>;

    /// Signs a body hash with the given private key.
    fn sign(&self, hash: &TxHash, private_key: &[u8]) -> Result<Signature, Self::Error>;

    /// Encodes the complete signed transaction.
    fn encode_transaction(
        &self,
        unsigned: &UnsignedBody,
        witness_set: &WitnessSet,
        auxiliary_data: Option<&AuxiliaryData>,
    ) -> Result<Vec<u8>, Self::Error>;
}

impl<E: LedgerEngine> LedgerEngine for &E {
    type Error = E::Error;

    fn build_transaction_body(
        &self,
        body: &TxBody,
        params: &ProtocolParameters,
    ) -> Result<UnsignedBody, Self::Error> {
        (*self).build_transaction_body(body, params)
    }

    fn hash_transaction_body(&self, unsigned: &UnsignedBody) -> Result<TxHash, Self::Error> {
        (*self).hash_transaction_body(unsigned)
    }

    fn sign(&self, hash: &TxHash, private_key: &[u8]) -> Result<Signature, Self::Error> {
        (*self).sign(hash, private_key)
    }

    fn encode_transaction(
        &self,
        unsigned: &UnsignedBody,
        witness_set: &WitnessSet,
        auxiliary_data: Option<&AuxiliaryData>,
    ) -> Result<Vec<u8>, Self::Error> {
        (*self).encode_transaction(unsigned, witness_set, auxiliary_data)
    }
}

/// A source of information about the outputs a transaction spends, such as a chain
/// indexer.
pub trait UtxoFetcher {
    type Error;

    /// Returns the address and value of the output `tx_ref`.
    fn resolve_input_value(&self, tx_ref: &TxInputRef) -> Result<(Address, Value), Self::Error>;
}

impl<F: UtxoFetcher> UtxoFetcher for &F {
    type Error = F::Error;

    fn resolve_input_value(&self, tx_ref: &TxInputRef) -> Result<(Address, Value), Self::Error> {
        (*self).resolve_input_value(tx_ref)
    }
}
