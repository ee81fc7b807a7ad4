//! Transaction inputs, and the staging of script-locked inputs.

use ledger_protocol::{
    data::BuilderData,
    script::{ExUnits, LanguageVersion, RedeemerTag},
    value::Value,
    Address, ScriptHash, TxInputRef,
};

use crate::{
    error::{Error, MissingField, PendingKind},
    witness::{
        require_reference_support, DatumSource, PlutusScript, Redeemer, ScriptSource,
        ScriptWitness, SimpleScriptSource,
    },
};

/// A reference to an output being consumed, with whatever is known about it.
///
/// Key-locked inputs are usually named together with their value and address; a
/// script-locked input's value may instead be filled in later from a
/// [`UtxoFetcher`](crate::engine::UtxoFetcher).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedInput {
    pub tx_ref: TxInputRef,
    pub value: Option<Value>,
    pub address: Option<Address>,
}

impl ResolvedInput {
    pub fn new(tx_ref: TxInputRef, value: Option<Value>, address: Option<Address>) -> Self {
        ResolvedInput {
            tx_ref,
            value,
            address,
        }
    }

    /// Returns whether both the value and the address of this input are known.
    pub fn is_resolved(&self) -> bool {
        self.value.is_some() && self.address.is_some()
    }

    /// Fills in whichever of the value and address are not yet known.
    pub(crate) fn resolve_with(&mut self, address: Address, value: Value) {
        self.address.get_or_insert(address);
        self.value.get_or_insert(value);
    }
}

/// A committed transaction input.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxInput {
    /// Locked by a verification key.
    PubKey(ResolvedInput),
    /// Locked by a native script.
    SimpleScript {
        input: ResolvedInput,
        script: SimpleScriptSource,
    },
    /// Locked by a Plutus script.
    Script {
        input: ResolvedInput,
        witness: ScriptWitness,
    },
}

impl TxInput {
    pub fn input(&self) -> &ResolvedInput {
        match self {
            TxInput::PubKey(input)
            | TxInput::SimpleScript { input, .. }
            | TxInput::Script { input, .. } => input,
        }
    }

    pub(crate) fn input_mut(&mut self) -> &mut ResolvedInput {
        match self {
            TxInput::PubKey(input)
            | TxInput::SimpleScript { input, .. }
            | TxInput::Script { input, .. } => input,
        }
    }

    pub fn tx_ref(&self) -> &TxInputRef {
        &self.input().tx_ref
    }
}

/// An output that scripts in the transaction may read but that is not spent.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceInput {
    pub tx_ref: TxInputRef,
    /// The size of the reference script carried by the output, if any.
    pub script_size: Option<usize>,
}

/// An input that has been named but not yet committed.
#[derive(Clone, Debug)]
pub(crate) enum PendingInput {
    PubKey {
        input: ResolvedInput,
        simple_script: Option<SimpleScriptSource>,
    },
    Script {
        input: ResolvedInput,
        version: LanguageVersion,
        script: Option<ScriptSource>,
        datum: Option<DatumSource>,
        redeemer: Option<Redeemer>,
    },
}

impl PendingInput {
    pub(crate) fn input_mut(&mut self) -> &mut ResolvedInput {
        match self {
            PendingInput::PubKey { input, .. } | PendingInput::Script { input, .. } => input,
        }
    }

    /// Attaches script bytes: a Plutus script of the armed version for a script input,
    /// or a native script that turns a key-locked input into a native-script input.
    ///
    /// A native-script input keeps the first script it was given.
    pub(crate) fn set_script(&mut self, code: Vec<u8>) -> Result<(), Error> {
        match self {
            PendingInput::PubKey {
                simple_script: Some(_),
                ..
            } => {
                return Err(Error::ScriptAlreadySet {
                    operation: "tx_in_script",
                })
            }
            PendingInput::PubKey { simple_script, .. } => {
                *simple_script = Some(SimpleScriptSource::Provided(code));
            }
            PendingInput::Script {
                version, script, ..
            } => {
                *script = Some(ScriptSource::Provided(PlutusScript {
                    code,
                    version: *version,
                }));
            }
        }
        Ok(())
    }

    pub(crate) fn set_script_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<(), Error> {
        match self {
            PendingInput::Script {
                version, script, ..
            } => {
                require_reference_support(*version, "reference scripts")?;
                *script = Some(ScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    version: *version,
                    script_size,
                });
                Ok(())
            }
            PendingInput::PubKey { .. } => Err(Error::UnsupportedScriptKind {
                operation: "spending_tx_in_reference",
            }),
        }
    }

    pub(crate) fn set_simple_script_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<(), Error> {
        match self {
            PendingInput::PubKey {
                simple_script: Some(_),
                ..
            } => Err(Error::ScriptAlreadySet {
                operation: "simple_script_tx_in_reference",
            }),
            PendingInput::PubKey { simple_script, .. } => {
                *simple_script = Some(SimpleScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    script_size,
                });
                Ok(())
            }
            PendingInput::Script { .. } => Err(Error::UnsupportedScriptKind {
                operation: "simple_script_tx_in_reference",
            }),
        }
    }

    pub(crate) fn set_datum(&mut self, source: DatumSource) -> Result<(), Error> {
        match self {
            PendingInput::Script { datum, .. } => {
                *datum = Some(source);
                Ok(())
            }
            PendingInput::PubKey { .. } => {
                Err(Error::MissingPendingRecord(PendingKind::ScriptInput))
            }
        }
    }

    /// Marks the datum as stored inline in the output this input spends.
    pub(crate) fn set_inline_datum(&mut self) -> Result<(), Error> {
        match self {
            PendingInput::Script {
                input,
                version,
                datum,
                ..
            } => {
                require_reference_support(*version, "inline datums")?;
                *datum = Some(DatumSource::Inline(input.tx_ref));
                Ok(())
            }
            PendingInput::PubKey { .. } => {
                Err(Error::MissingPendingRecord(PendingKind::ScriptInput))
            }
        }
    }

    pub(crate) fn set_redeemer(&mut self, data: BuilderData, ex_units: ExUnits) -> Result<(), Error> {
        match self {
            PendingInput::Script { redeemer, .. } => {
                *redeemer = Some(Redeemer::new(RedeemerTag::Spend, data, ex_units));
                Ok(())
            }
            PendingInput::PubKey { .. } => {
                Err(Error::MissingPendingRecord(PendingKind::ScriptInput))
            }
        }
    }

    /// Validates this input and converts it into its committed form.
    ///
    /// A script input's witness is checked in the order datum, redeemer, script, and the
    /// first missing part is reported.
    pub(crate) fn commit(self) -> Result<TxInput, Error> {
        match self {
            PendingInput::PubKey {
                input,
                simple_script: None,
            } => Ok(TxInput::PubKey(input)),
            PendingInput::PubKey {
                input,
                simple_script: Some(script),
            } => Ok(TxInput::SimpleScript { input, script }),
            PendingInput::Script {
                input,
                script,
                datum,
                redeemer,
                ..
            } => {
                let incomplete = |missing| Error::IncompleteScriptInput {
                    input: input.tx_ref,
                    missing,
                };
                let datum = datum.ok_or_else(|| incomplete(MissingField::Datum))?;
                let redeemer = redeemer.ok_or_else(|| incomplete(MissingField::Redeemer))?;
                let script = script.ok_or_else(|| incomplete(MissingField::Script))?;
                Ok(TxInput::Script {
                    input,
                    witness: ScriptWitness {
                        script,
                        datum,
                        redeemer,
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ledger_protocol::{
        data::PlutusData,
        script::{LanguageVersion, DEFAULT_REDEEMER_BUDGET},
        ScriptHash, TxInputRef,
    };

    use super::{PendingInput, ResolvedInput, TxInput};
    use crate::{
        error::{Error, MissingField, PendingKind},
        witness::{DatumSource, SimpleScriptSource},
    };

    fn script_input(n: u8) -> PendingInput {
        PendingInput::Script {
            input: ResolvedInput::new(TxInputRef::fake(n), None, None),
            version: LanguageVersion::V2,
            script: None,
            datum: None,
            redeemer: None,
        }
    }

    #[test]
    fn reports_missing_datum_before_redeemer_and_script() {
        assert_matches!(
            script_input(1).commit(),
            Err(Error::IncompleteScriptInput { missing: MissingField::Datum, .. })
        );

        let mut pending = script_input(1);
        pending.set_inline_datum().unwrap();
        assert_matches!(
            pending.clone().commit(),
            Err(Error::IncompleteScriptInput { missing: MissingField::Redeemer, .. })
        );

        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        assert_matches!(
            pending.clone().commit(),
            Err(Error::IncompleteScriptInput { missing: MissingField::Script, .. })
        );

        pending.set_script(vec![1, 2, 3]).unwrap();
        let committed = pending.commit().unwrap();
        assert_matches!(&committed, TxInput::Script { witness, .. } => {
            assert_eq!(witness.datum, DatumSource::Inline(TxInputRef::fake(1)));
            assert_eq!(witness.script.version(), LanguageVersion::V2);
            assert_eq!(witness.redeemer.index, None);
        });
    }

    #[test]
    fn key_locked_input_becomes_native_script_input() {
        let mut pending = PendingInput::PubKey {
            input: ResolvedInput::new(TxInputRef::fake(2), None, None),
            simple_script: None,
        };
        assert_matches!(
            pending.set_datum(DatumSource::Inline(TxInputRef::fake(2))),
            Err(Error::MissingPendingRecord(PendingKind::ScriptInput))
        );
        assert_matches!(
            pending.set_script_reference(TxInputRef::fake(3), ScriptHash::from_bytes([0; 28]), None),
            Err(Error::UnsupportedScriptKind { .. })
        );

        pending
            .set_simple_script_reference(TxInputRef::fake(3), ScriptHash::from_bytes([0; 28]), Some(40))
            .unwrap();
        assert_matches!(
            pending.commit(),
            Ok(TxInput::SimpleScript {
                script: SimpleScriptSource::Reference { script_size: Some(40), .. },
                ..
            })
        );
    }

    #[test]
    fn native_script_is_not_replaced() {
        let mut pending = PendingInput::PubKey {
            input: ResolvedInput::new(TxInputRef::fake(2), None, None),
            simple_script: None,
        };
        pending.set_script(vec![0x82, 0x00]).unwrap();
        assert_matches!(
            pending.set_simple_script_reference(TxInputRef::fake(3), ScriptHash::from_bytes([0; 28]), None),
            Err(Error::ScriptAlreadySet { operation: "simple_script_tx_in_reference" })
        );
        assert_matches!(
            pending.set_script(vec![0x82, 0x01]),
            Err(Error::ScriptAlreadySet { operation: "tx_in_script" })
        );
        assert_matches!(
            pending.commit(),
            Ok(TxInput::SimpleScript { script: SimpleScriptSource::Provided(code), .. })
                if code == vec![0x82, 0x00]
        );
    }

    #[test]
    fn v1_scripts_cannot_use_reference_features() {
        let mut pending = PendingInput::Script {
            input: ResolvedInput::new(TxInputRef::fake(4), None, None),
            version: LanguageVersion::V1,
            script: None,
            datum: None,
            redeemer: None,
        };
        assert_matches!(
            pending.set_inline_datum(),
            Err(Error::UnsupportedByLanguage { version: LanguageVersion::V1, feature: "inline datums" })
        );
        assert_matches!(
            pending.set_script_reference(TxInputRef::fake(5), ScriptHash::from_bytes([1; 28]), None),
            Err(Error::UnsupportedByLanguage { feature: "reference scripts", .. })
        );

        // A V1 script supplied in full, with its datum, is fine.
        pending.set_script(vec![0x4d]).unwrap();
        pending
            .set_datum(DatumSource::Provided(PlutusData::unit().into()))
            .unwrap();
        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        assert_matches!(pending.commit(), Ok(TxInput::Script { .. }));
    }
}
