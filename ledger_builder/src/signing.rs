//! Witness sets and the accumulation of signatures.
//!
//! Each party that must authorize a transaction signs the same body hash independently.
//! The [`WitnessAccumulator`] collects their `(verification key, signature)` pairs keyed
//! by verification key, so the order in which parties sign has no effect on the result,
//! and merges them into the witness set produced by the ledger engine.

use std::collections::BTreeMap;
use std::fmt;

use ledger_protocol::data::BuilderData;

use crate::{
    error::Error,
    witness::{PlutusScript, Redeemer},
};

/// A verification key, in the engine's encoding.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct VerificationKey(Vec<u8>);

impl VerificationKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        (!bytes.is_empty()).then_some(VerificationKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VerificationKey")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl fmt::Display for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A signature over a transaction body hash.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Signature(pub Vec<u8>);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

/// The witnesses that authorize a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WitnessSet {
    pub vkey_witnesses: BTreeMap<VerificationKey, Signature>,
    pub native_scripts: Vec<Vec<u8>>,
    pub plutus_scripts: Vec<PlutusScript>,
    pub plutus_data: Vec<BuilderData>,
    pub redeemers: Vec<Redeemer>,
}

/// Signatures collected for a finalized transaction.
#[derive(Clone, Debug, Default)]
pub struct WitnessAccumulator {
    witnesses: BTreeMap<VerificationKey, Signature>,
}

impl WitnessAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signature.
    ///
    /// Recording the same signature again is a no-op; recording a different signature
    /// for a key that has already signed is an error.
    pub fn add(&mut self, vkey: VerificationKey, signature: Signature) -> Result<(), Error> {
        match self.witnesses.get(&vkey) {
            Some(existing) if existing == &signature => Ok(()),
            Some(_) => Err(Error::ConflictingWitness(vkey)),
            None => {
                self.witnesses.insert(vkey, signature);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    pub fn clear(&mut self) {
        self.witnesses.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VerificationKey, &Signature)> {
        self.witnesses.iter()
    }

    /// Returns `base` extended with the collected signatures.
    ///
    /// Signatures already present in `base` must agree with the collected ones.
    pub fn merge_into(&self, base: &WitnessSet) -> Result<WitnessSet, Error> {
        let mut merged = base.clone();
        for (vkey, signature) in &self.witnesses {
            match merged.vkey_witnesses.get(vkey) {
                Some(existing) if existing != signature => {
                    return Err(Error::ConflictingWitness(vkey.clone()));
                }
                Some(_) => (),
                None => {
                    merged.vkey_witnesses.insert(vkey.clone(), signature.clone());
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::{Signature, VerificationKey, WitnessAccumulator, WitnessSet};
    use crate::error::Error;

    fn vkey(n: u8) -> VerificationKey {
        VerificationKey::from_bytes(vec![n; 32]).unwrap()
    }

    #[test]
    fn duplicate_signatures_are_deduplicated() {
        let mut acc = WitnessAccumulator::new();
        acc.add(vkey(1), Signature(vec![1])).unwrap();
        acc.add(vkey(1), Signature(vec![1])).unwrap();
        assert_eq!(acc.len(), 1);
        assert_matches!(
            acc.add(vkey(1), Signature(vec![2])),
            Err(Error::ConflictingWitness(k)) if k == vkey(1)
        );
        assert!(VerificationKey::from_bytes(vec![]).is_none());
    }

    #[test]
    fn merge_keeps_engine_witnesses() {
        let mut base = WitnessSet::default();
        base.vkey_witnesses.insert(vkey(9), Signature(vec![9]));
        base.native_scripts.push(vec![0x82]);

        let mut acc = WitnessAccumulator::new();
        acc.add(vkey(1), Signature(vec![1])).unwrap();
        acc.add(vkey(9), Signature(vec![9])).unwrap();
        let merged = acc.merge_into(&base).unwrap();
        assert_eq!(merged.vkey_witnesses.len(), 2);
        assert_eq!(merged.native_scripts, base.native_scripts);

        let mut conflicting = WitnessAccumulator::new();
        conflicting.add(vkey(9), Signature(vec![0])).unwrap();
        assert_matches!(conflicting.merge_into(&base), Err(Error::ConflictingWitness(_)));
    }

    proptest! {
        #[test]
        fn signing_order_does_not_matter(
            keys in prop::collection::btree_set(1u8..=255, 0..8)
                .prop_map(|keys| keys.into_iter().collect::<Vec<_>>())
                .prop_shuffle()
        ) {
            let mut forward = WitnessAccumulator::new();
            let mut backward = WitnessAccumulator::new();
            for k in &keys {
                forward.add(vkey(*k), Signature(vec![*k])).unwrap();
            }
            for k in keys.iter().rev() {
                backward.add(vkey(*k), Signature(vec![*k])).unwrap();
            }
            prop_assert_eq!(forward.len(), keys.len());
            prop_assert_eq!(
                forward.merge_into(&WitnessSet::default()).unwrap(),
                backward.merge_into(&WitnessSet::default()).unwrap()
            );
        }
    }
}
