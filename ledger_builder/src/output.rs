//! Transaction outputs.

use ledger_protocol::{data::BuilderData, value::Value, Address};

use crate::witness::PlutusScript;

/// The datum attached to an output.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputDatum {
    /// Only the hash of the datum is stored in the output.
    Hash(BuilderData),
    /// The datum is stored in the output itself.
    Inline(BuilderData),
    /// Only the hash is stored in the output, and the datum itself is carried in this
    /// transaction's witness set.
    Embed(BuilderData),
}

impl OutputDatum {
    pub fn data(&self) -> &BuilderData {
        match self {
            OutputDatum::Hash(d) | OutputDatum::Inline(d) | OutputDatum::Embed(d) => d,
        }
    }
}

/// An output of the transaction being built.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub amount: Value,
    pub datum: Option<OutputDatum>,
    pub reference_script: Option<PlutusScript>,
}

impl TxOutput {
    pub fn new(address: Address, amount: Value) -> Self {
        TxOutput {
            address,
            amount,
            datum: None,
            reference_script: None,
        }
    }
}
