//! The committed contents of a transaction.

use std::collections::{BTreeMap, BTreeSet};

use ledger_protocol::{
    consensus::{Network, Slot},
    script::ExUnits,
    Address, KeyHash, PolicyId, RewardAddress, TxInputRef,
};

use crate::{
    certificate::Certificate,
    input::{ReferenceInput, ResolvedInput, TxInput},
    mint::{MintItem, MintScript},
    output::TxOutput,
    withdrawal::Withdrawal,
    witness::Redeemer,
};

/// The slots between which a transaction may be included in a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidityInterval {
    /// The first slot in which the transaction is valid.
    pub invalid_before: Option<Slot>,
    /// The first slot in which the transaction is no longer valid.
    pub invalid_hereafter: Option<Slot>,
}

impl ValidityInterval {
    /// Returns whether some slot satisfies both bounds.
    pub fn is_satisfiable(&self) -> bool {
        match (self.invalid_before, self.invalid_hereafter) {
            (Some(before), Some(hereafter)) => before < hereafter,
            _ => true,
        }
    }
}

/// Auxiliary data carried alongside the transaction body.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct AuxiliaryData {
    pub metadata: BTreeMap<u64, serde_json::Value>,
}

/// Every item committed to a transaction, in the form handed to the ledger engine.
///
/// Inputs, outputs, mints and withdrawals are kept in the order their directives were
/// issued; the engine is responsible for putting them in canonical order when encoding.
/// Certificates are kept in directive order, which is also their order on the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub collaterals: Vec<ResolvedInput>,
    pub reference_inputs: Vec<ReferenceInput>,
    pub mints: Vec<MintItem>,
    pub withdrawals: Vec<Withdrawal>,
    pub certificates: Vec<Certificate>,
    pub required_signers: BTreeSet<KeyHash>,
    pub validity: ValidityInterval,
    pub change_address: Option<Address>,
    pub network: Network,
}

impl TxBody {
    /// Assigns each redeemer the index the ledger will look it up by.
    ///
    /// A spend redeemer points at its input's position among all spent inputs sorted by
    /// reference; a mint redeemer at its policy's position among the sorted distinct
    /// minted policies; a reward redeemer at its account's position among the withdrawn
    /// reward accounts sorted by their bytes; a certificate redeemer at its certificate's
    /// position in the certificate list.
    pub(crate) fn assign_redeemer_indices(&mut self) {
        let spent: BTreeSet<TxInputRef> = self.inputs.iter().map(|i| *i.tx_ref()).collect();
        let policies: BTreeSet<PolicyId> = self.mints.iter().map(|m| m.policy).collect();
        let reward_addresses: BTreeSet<RewardAddress> = self
            .withdrawals
            .iter()
            .map(|w| w.address().clone())
            .collect();

        for input in &mut self.inputs {
            if let TxInput::Script { input, witness } = input {
                witness.redeemer.index = position(&spent, &input.tx_ref);
            }
        }
        for mint in &mut self.mints {
            if let MintScript::Plutus { redeemer, .. } = &mut mint.script {
                redeemer.index = position(&policies, &mint.policy);
            }
        }
        for withdrawal in &mut self.withdrawals {
            if let Withdrawal::Script {
                address, redeemer, ..
            } = withdrawal
            {
                redeemer.index = position(&reward_addresses, address);
            }
        }
        for (index, certificate) in self.certificates.iter_mut().enumerate() {
            if let Certificate::Script { redeemer, .. } = certificate {
                redeemer.index = index.try_into().ok();
            }
        }
    }

    /// Returns every redeemer in the body. Mint items under one policy share one
    /// redeemer, which is returned once.
    pub fn redeemers(&self) -> impl Iterator<Item = &Redeemer> {
        let spends = self.inputs.iter().filter_map(|input| match input {
            TxInput::Script { witness, .. } => Some(&witness.redeemer),
            _ => None,
        });
        let mut policies = BTreeSet::new();
        let mints = self
            .mints
            .iter()
            .filter(move |m| policies.insert(m.policy))
            .filter_map(MintItem::redeemer);
        let rewards = self.withdrawals.iter().filter_map(|w| match w {
            Withdrawal::Script { redeemer, .. } => Some(redeemer),
            _ => None,
        });
        spends
            .chain(mints)
            .chain(rewards)
            .chain(self.certificates.iter().filter_map(Certificate::redeemer))
    }

    /// Returns the combined budget of every redeemer, or `None` on overflow.
    pub fn total_ex_units(&self) -> Option<ExUnits> {
        self.redeemers()
            .try_fold(ExUnits::ZERO, |total, r| total + r.ex_units)
    }

    /// Returns whether any committed item is authorized by a Plutus script.
    pub fn has_plutus_scripts(&self) -> bool {
        self.inputs
            .iter()
            .any(|i| matches!(i, TxInput::Script { .. }))
            || self.mints.iter().any(|m| m.redeemer().is_some())
            || self
                .withdrawals
                .iter()
                .any(|w| matches!(w, Withdrawal::Script { .. }))
            || self.certificates.iter().any(|c| c.redeemer().is_some())
    }
}

fn position<T: Ord>(set: &BTreeSet<T>, item: &T) -> Option<u32> {
    set.range(..item)
        .count()
        .try_into()
        .ok()
        .filter(|_| set.contains(item))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{position, ValidityInterval};
    use ledger_protocol::consensus::Slot;

    #[test]
    fn position_in_sorted_set() {
        let set: BTreeSet<u8> = [9, 3, 5].into_iter().collect();
        assert_eq!(position(&set, &3), Some(0));
        assert_eq!(position(&set, &9), Some(2));
        assert_eq!(position(&set, &4), None);
    }

    #[test]
    fn validity_interval() {
        let mut interval = ValidityInterval::default();
        assert!(interval.is_satisfiable());
        interval.invalid_before = Some(Slot::from_u64(10));
        interval.invalid_hereafter = Some(Slot::from_u64(10));
        assert!(!interval.is_satisfiable());
        interval.invalid_hereafter = Some(Slot::from_u64(11));
        assert!(interval.is_satisfiable());
    }
}
