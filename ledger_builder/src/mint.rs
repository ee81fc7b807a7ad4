//! Minting and burning, and the staging of mint items.

use ledger_protocol::{
    data::BuilderData,
    script::{ExUnits, LanguageVersion, RedeemerTag},
    value::AssetName,
    PolicyId, ScriptHash, TxInputRef,
};

use crate::{
    error::{Error, MissingField},
    witness::{require_reference_support, PlutusScript, Redeemer, ScriptSource},
};

/// The script authorizing a mint item.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MintScript {
    /// A native script, which needs no redeemer.
    Native(Vec<u8>),
    Plutus {
        source: ScriptSource,
        redeemer: Redeemer,
    },
}

/// A committed mint (positive quantity) or burn (negative quantity) of one asset.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MintItem {
    pub policy: PolicyId,
    pub asset_name: AssetName,
    pub quantity: i64,
    pub script: MintScript,
}

impl MintItem {
    pub fn redeemer(&self) -> Option<&Redeemer> {
        match &self.script {
            MintScript::Native(_) => None,
            MintScript::Plutus { redeemer, .. } => Some(redeemer),
        }
    }

    /// Returns whether `other`, under the same policy, can share this item's witness:
    /// both are native, or both are Plutus with the same redeemer.
    pub(crate) fn shares_witness_with(&self, other: &MintItem) -> bool {
        match (self.redeemer(), other.redeemer()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.data == b.data && a.ex_units == b.ex_units,
            _ => false,
        }
    }
}

/// The script kind of a pending mint item, fixed when the item is named.
#[derive(Clone, Debug)]
pub(crate) enum PendingMintScript {
    Native(Option<Vec<u8>>),
    Plutus {
        version: LanguageVersion,
        source: Option<ScriptSource>,
        redeemer: Option<Redeemer>,
    },
}

/// A mint item that has been named but not yet committed.
#[derive(Clone, Debug)]
pub(crate) struct PendingMint {
    policy: PolicyId,
    asset_name: AssetName,
    quantity: i64,
    script: PendingMintScript,
}

impl PendingMint {
    pub(crate) fn native(policy: PolicyId, asset_name: AssetName, quantity: i64) -> Self {
        PendingMint {
            policy,
            asset_name,
            quantity,
            script: PendingMintScript::Native(None),
        }
    }

    pub(crate) fn plutus(
        policy: PolicyId,
        asset_name: AssetName,
        quantity: i64,
        version: LanguageVersion,
    ) -> Self {
        PendingMint {
            policy,
            asset_name,
            quantity,
            script: PendingMintScript::Plutus {
                version,
                source: None,
                redeemer: None,
            },
        }
    }

    pub(crate) fn set_script(&mut self, code: Vec<u8>) {
        match &mut self.script {
            PendingMintScript::Native(script) => *script = Some(code),
            PendingMintScript::Plutus {
                version, source, ..
            } => {
                *source = Some(ScriptSource::Provided(PlutusScript {
                    code,
                    version: *version,
                }))
            }
        }
    }

    pub(crate) fn set_script_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        version: LanguageVersion,
        script_size: Option<usize>,
    ) -> Result<(), Error> {
        match &mut self.script {
            PendingMintScript::Plutus { source, .. } => {
                require_reference_support(version, "reference scripts")?;
                *source = Some(ScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    version,
                    script_size,
                });
                Ok(())
            }
            PendingMintScript::Native(_) => Err(Error::UnsupportedScriptKind {
                operation: "mint_tx_in_reference",
            }),
        }
    }

    pub(crate) fn set_redeemer(&mut self, data: BuilderData, ex_units: ExUnits) -> Result<(), Error> {
        match &mut self.script {
            PendingMintScript::Plutus { redeemer, .. } => {
                *redeemer = Some(Redeemer::new(RedeemerTag::Mint, data, ex_units));
                Ok(())
            }
            PendingMintScript::Native(_) => Err(Error::UnsupportedScriptKind {
                operation: "mint_redeemer_value",
            }),
        }
    }

    /// Validates this item and converts it into its committed form.
    pub(crate) fn commit(self) -> Result<MintItem, Error> {
        let PendingMint {
            policy,
            asset_name,
            quantity,
            script,
        } = self;
        let incomplete = |missing| Error::IncompleteMintItem {
            policy,
            asset_name: asset_name.clone(),
            missing,
        };

        let script = match script {
            PendingMintScript::Native(code) => {
                MintScript::Native(code.ok_or_else(|| incomplete(MissingField::Script))?)
            }
            PendingMintScript::Plutus {
                source, redeemer, ..
            } => MintScript::Plutus {
                source: source.ok_or_else(|| incomplete(MissingField::Script))?,
                redeemer: redeemer.ok_or_else(|| incomplete(MissingField::Redeemer))?,
            },
        };
        if quantity == 0 {
            return Err(incomplete(MissingField::Quantity));
        }

        Ok(MintItem {
            policy,
            asset_name,
            quantity,
            script,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ledger_protocol::{
        data::PlutusData,
        script::{LanguageVersion, DEFAULT_REDEEMER_BUDGET},
        value::AssetName,
        ScriptHash, TxInputRef,
    };

    use super::{MintScript, PendingMint};
    use crate::{
        error::{Error, MissingField},
        witness::ScriptSource,
    };

    fn policy() -> ScriptHash {
        ScriptHash::from_bytes([7; 28])
    }

    fn name() -> AssetName {
        AssetName::new(b"MeshToken".to_vec()).unwrap()
    }

    #[test]
    fn native_item_needs_no_redeemer() {
        let mut pending = PendingMint::native(policy(), name(), 1);
        assert_matches!(
            pending.set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET),
            Err(Error::UnsupportedScriptKind { operation: "mint_redeemer_value" })
        );
        assert_matches!(
            pending.set_script_reference(TxInputRef::fake(1), policy(), LanguageVersion::V2, None),
            Err(Error::UnsupportedScriptKind { .. })
        );
        pending.set_script(vec![0x82]);
        let item = pending.commit().unwrap();
        assert_eq!(item.script, MintScript::Native(vec![0x82]));
        assert!(item.redeemer().is_none());
    }

    #[test]
    fn plutus_item_needs_a_redeemer() {
        let mut pending = PendingMint::plutus(policy(), name(), -5, LanguageVersion::V3);
        pending.set_script(vec![0x4d]);
        assert_matches!(
            pending.clone().commit(),
            Err(Error::IncompleteMintItem { missing: MissingField::Redeemer, .. })
        );

        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        let item = pending.commit().unwrap();
        assert_eq!(item.quantity, -5);
        assert_matches!(
            item.script,
            MintScript::Plutus { source: ScriptSource::Provided(script), .. } => {
                assert_eq!(script.version, LanguageVersion::V3);
            }
        );
    }

    #[test]
    fn reference_script_takes_its_own_version() {
        let mut pending = PendingMint::plutus(policy(), name(), 1, LanguageVersion::V2);
        pending
            .set_script_reference(TxInputRef::fake(9), policy(), LanguageVersion::V3, Some(120))
            .unwrap();
        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        let item = pending.commit().unwrap();
        assert_matches!(
            item.script,
            MintScript::Plutus { source, .. } => assert_eq!(source.version(), LanguageVersion::V3)
        );
    }

    #[test]
    fn items_under_one_policy_share_a_witness() {
        let plutus = |name: &[u8], data: PlutusData| {
            let mut pending =
                PendingMint::plutus(policy(), AssetName::new(name).unwrap(), 1, LanguageVersion::V2);
            pending.set_script(vec![0x4d]);
            pending.set_redeemer(data.into(), DEFAULT_REDEEMER_BUDGET).unwrap();
            pending.commit().unwrap()
        };
        let first = plutus(b"a", PlutusData::unit());
        assert!(first.shares_witness_with(&plutus(b"b", PlutusData::unit())));
        assert!(!first.shares_witness_with(&plutus(b"b", PlutusData::Int(1))));

        let mut native = PendingMint::native(policy(), name(), 1);
        native.set_script(vec![0x82]);
        assert!(!first.shares_witness_with(&native.commit().unwrap()));
    }

    #[test]
    fn v1_policies_cannot_be_referenced() {
        let mut pending = PendingMint::plutus(policy(), name(), 1, LanguageVersion::V2);
        assert_matches!(
            pending.set_script_reference(TxInputRef::fake(1), policy(), LanguageVersion::V1, None),
            Err(Error::UnsupportedByLanguage { version: LanguageVersion::V1, .. })
        );
    }

    #[test]
    fn zero_quantity_is_incomplete() {
        let mut pending = PendingMint::native(policy(), name(), 0);
        pending.set_script(vec![0x82]);
        assert_matches!(
            pending.commit(),
            Err(Error::IncompleteMintItem { missing: MissingField::Quantity, .. })
        );
    }
}
