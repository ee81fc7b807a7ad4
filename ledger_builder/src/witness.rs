//! Script witnesses: how a script-locked input, a minting policy or a reward withdrawal
//! is satisfied.

use ledger_protocol::{
    data::BuilderData,
    script::{ExUnits, LanguageVersion, RedeemerTag},
    ScriptHash, TxInputRef,
};

use crate::error::Error;

/// Fails if scripts of `version` cannot use `feature`, which relies on reference inputs
/// or inline datums.
pub(crate) fn require_reference_support(
    version: LanguageVersion,
    feature: &'static str,
) -> Result<(), Error> {
    if version.supports_reference_inputs() {
        Ok(())
    } else {
        Err(Error::UnsupportedByLanguage { version, feature })
    }
}

/// A Plutus script supplied in full.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlutusScript {
    pub code: Vec<u8>,
    pub version: LanguageVersion,
}

/// Where the ledger finds a Plutus script.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScriptSource {
    /// The script is included in the transaction's witness set.
    Provided(PlutusScript),
    /// The script is carried as a reference script by the output `tx_ref`.
    Reference {
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        version: LanguageVersion,
        script_size: Option<usize>,
    },
}

impl ScriptSource {
    pub fn version(&self) -> LanguageVersion {
        match self {
            ScriptSource::Provided(script) => script.version,
            ScriptSource::Reference { version, .. } => *version,
        }
    }
}

/// Where the ledger finds a native script.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimpleScriptSource {
    Provided(Vec<u8>),
    Reference {
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    },
}

/// Where the ledger finds the datum of a script-locked input.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DatumSource {
    /// The datum is included in the transaction's witness set.
    Provided(BuilderData),
    /// The datum is stored inline in the referenced output.
    Inline(TxInputRef),
}

/// The argument passed to a script, with the budget it may spend.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    /// The position of the redeemed item among the items of its kind. Assigned when the
    /// transaction is finalized.
    pub index: Option<u32>,
    pub data: BuilderData,
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub(crate) fn new(tag: RedeemerTag, data: BuilderData, ex_units: ExUnits) -> Self {
        Redeemer {
            tag,
            index: None,
            data,
            ex_units,
        }
    }
}

/// Everything needed to unlock a Plutus-locked input.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptWitness {
    pub script: ScriptSource,
    pub datum: DatumSource,
    pub redeemer: Redeemer,
}
