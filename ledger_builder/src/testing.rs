//! In-memory collaborators and strategies for testing code that builds transactions.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::fmt;

use ledger_protocol::{
    params::ProtocolParameters,
    value::{Lovelace, Value},
    Address, TxHash, TxInputRef,
};
use proptest::prelude::*;

use crate::{
    body::{AuxiliaryData, TxBody},
    certificate::Certificate,
    engine::{LedgerEngine, UnsignedBody, UtxoFetcher},
    input::TxInput,
    mint::MintScript,
    output::OutputDatum,
    signing::{Signature, WitnessSet},
    withdrawal::Withdrawal,
    witness::{DatumSource, ScriptSource, SimpleScriptSource},
};

/// Errors produced by [`MockEngine`].
#[derive(Debug)]
pub enum MockEngineError {
    /// The engine was configured to reject every body.
    Rejected,
    Encoding(postcard::Error),
    Metadata(serde_json::Error),
    /// Private keys longer than 64 bytes cannot be used as a BLAKE2b key.
    KeyTooLong(usize),
    /// The fee of the body does not fit in a coin amount.
    FeeOverflow,
}

impl fmt::Display for MockEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockEngineError::Rejected => write!(f, "Transaction body rejected"),
            MockEngineError::Encoding(e) => write!(f, "Encoding failed: {}", e),
            MockEngineError::Metadata(e) => write!(f, "Metadata encoding failed: {}", e),
            MockEngineError::KeyTooLong(len) => {
                write!(f, "Private key of {} bytes is too long", len)
            }
            MockEngineError::FeeOverflow => write!(f, "Fee overflows the coin range"),
        }
    }
}

impl error::Error for MockEngineError {}

/// A ledger engine that encodes with `postcard`, hashes with BLAKE2b-256, and "signs" by
/// keying BLAKE2b-512 with the private key.
///
/// Every body it is asked to build and every witness set it is asked to encode is
/// recorded, so tests can inspect exactly what the builder handed over.
#[derive(Debug, Default)]
pub struct MockEngine {
    reject: bool,
    bodies: RefCell<Vec<TxBody>>,
    fees: RefCell<Vec<FeeEstimate>>,
    witness_sets: RefCell<Vec<WitnessSet>>,
}

/// The fee and collateral [`MockEngine`] computed for a body it built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeEstimate {
    /// The size-based fee of the encoded body plus the price of its execution budget.
    pub fee: Lovelace,
    /// The collateral the fee requires, if the body runs Plutus scripts.
    pub collateral: Option<Lovelace>,
}

impl FeeEstimate {
    fn for_body(body: &TxBody, encoded_len: usize, params: &ProtocolParameters) -> Option<Self> {
        let size_fee = params.min_fee(u64::try_from(encoded_len).ok()?)?;
        let fee = (size_fee + params.script_fee(&body.total_ex_units()?)?)?;
        let collateral = if body.has_plutus_scripts() {
            Some(params.min_collateral(fee)?)
        } else {
            None
        };
        Some(FeeEstimate { fee, collateral })
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that fails to build any body.
    pub fn rejecting() -> Self {
        MockEngine {
            reject: true,
            ..Self::default()
        }
    }

    /// Returns every body passed to [`LedgerEngine::build_transaction_body`], in order.
    pub fn built_bodies(&self) -> Vec<TxBody> {
        self.bodies.borrow().clone()
    }

    /// Returns the fee estimate of every body successfully built, in order.
    pub fn fee_estimates(&self) -> Vec<FeeEstimate> {
        self.fees.borrow().clone()
    }

    /// Returns every witness set passed to [`LedgerEngine::encode_transaction`], in order.
    pub fn encoded_witness_sets(&self) -> Vec<WitnessSet> {
        self.witness_sets.borrow().clone()
    }
}

/// Collects the scripts, datums and redeemers a body needs in its witness set.
///
/// Mint items under one policy share a single script and redeemer.
fn derive_witness_set(body: &TxBody) -> WitnessSet {
    fn add_plutus(source: &ScriptSource, set: &mut WitnessSet) {
        if let ScriptSource::Provided(script) = source {
            set.plutus_scripts.push(script.clone());
        }
    }
    fn add_native(source: &SimpleScriptSource, set: &mut WitnessSet) {
        if let SimpleScriptSource::Provided(code) = source {
            set.native_scripts.push(code.clone());
        }
    }

    let mut set = WitnessSet {
        redeemers: body.redeemers().cloned().collect(),
        ..WitnessSet::default()
    };

    for input in &body.inputs {
        match input {
            TxInput::PubKey(_) => (),
            TxInput::SimpleScript { script, .. } => add_native(script, &mut set),
            TxInput::Script { witness, .. } => {
                add_plutus(&witness.script, &mut set);
                if let DatumSource::Provided(data) = &witness.datum {
                    set.plutus_data.push(data.clone());
                }
            }
        }
    }
    for output in &body.outputs {
        if let Some(OutputDatum::Embed(data)) = &output.datum {
            set.plutus_data.push(data.clone());
        }
    }
    let mut policies = BTreeSet::new();
    for mint in body.mints.iter().filter(|m| policies.insert(m.policy)) {
        match &mint.script {
            MintScript::Native(code) => set.native_scripts.push(code.clone()),
            MintScript::Plutus { source, .. } => add_plutus(source, &mut set),
        }
    }
    for withdrawal in &body.withdrawals {
        match withdrawal {
            Withdrawal::PubKey { .. } => (),
            Withdrawal::SimpleScript { script, .. } => add_native(script, &mut set),
            Withdrawal::Script { script, .. } => add_plutus(script, &mut set),
        }
    }
    for certificate in &body.certificates {
        match certificate {
            Certificate::Basic(_) => (),
            Certificate::SimpleScript { script, .. } => add_native(script, &mut set),
            Certificate::Script { script, .. } => add_plutus(script, &mut set),
        }
    }
    set
}

impl LedgerEngine for MockEngine {
    type Error = MockEngineError;

    fn build_transaction_body(
        &self,
        body: &TxBody,
        params: &ProtocolParameters,
    ) -> Result<UnsignedBody, Self::Error> {
        self.bodies.borrow_mut().push(body.clone());
        if self.reject {
            return Err(MockEngineError::Rejected);
        }
        let encoded = postcard::to_allocvec(body).map_err(MockEngineError::Encoding)?;
        let fee = FeeEstimate::for_body(body, encoded.len(), params)
            .ok_or(MockEngineError::FeeOverflow)?;
        self.fees.borrow_mut().push(fee);
        Ok(UnsignedBody {
            body: encoded,
            witness_set: derive_witness_set(body),
        })
    }

    fn hash_transaction_body(&self, unsigned: &UnsignedBody) -> Result<TxHash, Self::Error> {
        let hash = blake2b_simd::Params::new()
            .hash_length(32)
            .hash(&unsigned.body);
        let mut bytes = [0; 32];
        bytes.copy_from_slice(hash.as_bytes());
        Ok(TxHash::from_bytes(bytes))
    }

    fn sign(&self, hash: &TxHash, private_key: &[u8]) -> Result<Signature, Self::Error> {
        if private_key.len() > blake2b_simd::KEYBYTES {
            return Err(MockEngineError::KeyTooLong(private_key.len()));
        }
        let signature = blake2b_simd::Params::new()
            .hash_length(64)
            .key(private_key)
            .hash(hash.as_bytes());
        Ok(Signature(signature.as_bytes().to_vec()))
    }

    fn encode_transaction(
        &self,
        unsigned: &UnsignedBody,
        witness_set: &WitnessSet,
        auxiliary_data: Option<&AuxiliaryData>,
    ) -> Result<Vec<u8>, Self::Error> {
        self.witness_sets.borrow_mut().push(witness_set.clone());
        let metadata = auxiliary_data
            .map(|aux| serde_json::to_string(&aux.metadata))
            .transpose()
            .map_err(MockEngineError::Metadata)?;
        postcard::to_allocvec(&(&unsigned.body, witness_set, metadata))
            .map_err(MockEngineError::Encoding)
    }
}

/// Errors produced by [`MockFetcher`].
#[derive(Debug, PartialEq, Eq)]
pub enum MockFetcherError {
    NotFound(TxInputRef),
}

impl fmt::Display for MockFetcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockFetcherError::NotFound(tx_ref) => write!(f, "Output {} not found", tx_ref),
        }
    }
}

impl error::Error for MockFetcherError {}

/// A UTXO fetcher backed by a map.
#[derive(Clone, Debug, Default)]
pub struct MockFetcher {
    utxos: BTreeMap<TxInputRef, (Address, Value)>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utxo(mut self, tx_ref: TxInputRef, address: impl Into<Address>, value: Value) -> Self {
        self.utxos.insert(tx_ref, (address.into(), value));
        self
    }
}

impl UtxoFetcher for MockFetcher {
    type Error = MockFetcherError;

    fn resolve_input_value(&self, tx_ref: &TxInputRef) -> Result<(Address, Value), Self::Error> {
        self.utxos
            .get(tx_ref)
            .cloned()
            .ok_or(MockFetcherError::NotFound(*tx_ref))
    }
}

/// Returns a deterministic `(private key, verification key)` pair.
pub fn key_pair(n: u8) -> (Vec<u8>, Vec<u8>) {
    (vec![n; 32], vec![n ^ 0xff; 32])
}

prop_compose! {
    /// Generates between one and `max` distinct key pairs.
    pub fn arb_key_pairs(max: usize)(
        seeds in prop::collection::btree_set(any::<u8>(), 1..=max)
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        seeds.into_iter().map(key_pair).collect()
    }
}
