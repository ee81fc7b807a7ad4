//! Reward withdrawals, and their staging.

use ledger_protocol::{
    data::BuilderData,
    script::{ExUnits, LanguageVersion, RedeemerTag},
    value::Lovelace,
    RewardAddress, ScriptHash, TxInputRef,
};

use crate::{
    error::{Error, MissingField},
    witness::{require_reference_support, PlutusScript, Redeemer, ScriptSource, SimpleScriptSource},
};

/// A committed withdrawal of rewards from a reward address.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Withdrawal {
    /// The reward address is controlled by a verification key.
    PubKey { address: RewardAddress, coin: Lovelace },
    /// The reward address is controlled by a native script.
    SimpleScript {
        address: RewardAddress,
        coin: Lovelace,
        script: SimpleScriptSource,
    },
    /// The reward address is controlled by a Plutus script.
    Script {
        address: RewardAddress,
        coin: Lovelace,
        script: ScriptSource,
        redeemer: Redeemer,
    },
}

impl Withdrawal {
    pub fn address(&self) -> &RewardAddress {
        match self {
            Withdrawal::PubKey { address, .. }
            | Withdrawal::SimpleScript { address, .. }
            | Withdrawal::Script { address, .. } => address,
        }
    }

    pub fn coin(&self) -> Lovelace {
        match self {
            Withdrawal::PubKey { coin, .. }
            | Withdrawal::SimpleScript { coin, .. }
            | Withdrawal::Script { coin, .. } => *coin,
        }
    }
}

#[derive(Clone, Debug)]
enum PendingWithdrawalScript {
    PubKey(Option<SimpleScriptSource>),
    Plutus {
        version: LanguageVersion,
        source: Option<ScriptSource>,
        redeemer: Option<Redeemer>,
    },
}

/// A withdrawal that has been named but not yet committed.
#[derive(Clone, Debug)]
pub(crate) struct PendingWithdrawal {
    address: RewardAddress,
    coin: Lovelace,
    script: PendingWithdrawalScript,
}

impl PendingWithdrawal {
    pub(crate) fn pub_key(address: RewardAddress, coin: Lovelace) -> Self {
        PendingWithdrawal {
            address,
            coin,
            script: PendingWithdrawalScript::PubKey(None),
        }
    }

    pub(crate) fn plutus(address: RewardAddress, coin: Lovelace, version: LanguageVersion) -> Self {
        PendingWithdrawal {
            address,
            coin,
            script: PendingWithdrawalScript::Plutus {
                version,
                source: None,
                redeemer: None,
            },
        }
    }

    pub(crate) fn set_script(&mut self, code: Vec<u8>) {
        match &mut self.script {
            PendingWithdrawalScript::PubKey(script) => {
                *script = Some(SimpleScriptSource::Provided(code))
            }
            PendingWithdrawalScript::Plutus {
                version, source, ..
            } => {
                *source = Some(ScriptSource::Provided(PlutusScript {
                    code,
                    version: *version,
                }))
            }
        }
    }

    /// Points the withdrawal at a reference script: a native script for a key-style
    /// withdrawal, or a Plutus script of the armed version.
    pub(crate) fn set_script_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<(), Error> {
        match &mut self.script {
            PendingWithdrawalScript::PubKey(script) => {
                *script = Some(SimpleScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    script_size,
                })
            }
            PendingWithdrawalScript::Plutus {
                version, source, ..
            } => {
                require_reference_support(*version, "reference scripts")?;
                *source = Some(ScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    version: *version,
                    script_size,
                })
            }
        }
        Ok(())
    }

    pub(crate) fn set_redeemer(&mut self, data: BuilderData, ex_units: ExUnits) -> Result<(), Error> {
        match &mut self.script {
            PendingWithdrawalScript::Plutus { redeemer, .. } => {
                *redeemer = Some(Redeemer::new(RedeemerTag::Reward, data, ex_units));
                Ok(())
            }
            PendingWithdrawalScript::PubKey(_) => Err(Error::UnsupportedScriptKind {
                operation: "withdrawal_redeemer_value",
            }),
        }
    }

    pub(crate) fn commit(self) -> Result<Withdrawal, Error> {
        let PendingWithdrawal {
            address,
            coin,
            script,
        } = self;
        match script {
            PendingWithdrawalScript::PubKey(None) => Ok(Withdrawal::PubKey { address, coin }),
            PendingWithdrawalScript::PubKey(Some(script)) => Ok(Withdrawal::SimpleScript {
                address,
                coin,
                script,
            }),
            PendingWithdrawalScript::Plutus {
                source, redeemer, ..
            } => match (source, redeemer) {
                (Some(script), Some(redeemer)) => Ok(Withdrawal::Script {
                    address,
                    coin,
                    script,
                    redeemer,
                }),
                (None, _) => Err(Error::IncompleteWithdrawal {
                    address,
                    missing: MissingField::Script,
                }),
                (Some(_), None) => Err(Error::IncompleteWithdrawal {
                    address,
                    missing: MissingField::Redeemer,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ledger_protocol::{
        data::PlutusData,
        script::{LanguageVersion, DEFAULT_REDEEMER_BUDGET},
        value::Lovelace,
        RewardAddress, ScriptHash, TxInputRef,
    };

    use super::{PendingWithdrawal, Withdrawal};
    use crate::error::{Error, MissingField};

    fn stake_address() -> RewardAddress {
        RewardAddress::parse("stake_test1uzx0ksy9f4qnj2mzfdncqyjy84sszh64w43853nug5pedjgytgke9")
            .unwrap()
    }

    #[test]
    fn plutus_withdrawal_requires_script_and_redeemer() {
        let coin = Lovelace::const_from_u64(5_000_000);
        let mut pending = PendingWithdrawal::plutus(stake_address(), coin, LanguageVersion::V2);
        assert_matches!(
            pending.clone().commit(),
            Err(Error::IncompleteWithdrawal { missing: MissingField::Script, .. })
        );
        pending
            .set_script_reference(TxInputRef::fake(4), ScriptHash::from_bytes([1; 28]), None)
            .unwrap();
        assert_matches!(
            pending.clone().commit(),
            Err(Error::IncompleteWithdrawal { missing: MissingField::Redeemer, .. })
        );
        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        let withdrawal = pending.commit().unwrap();
        assert_eq!(withdrawal.coin(), coin);
        assert_matches!(withdrawal, Withdrawal::Script { .. });
    }

    #[test]
    fn key_withdrawal_rejects_redeemer() {
        let mut pending = PendingWithdrawal::pub_key(stake_address(), Lovelace::ZERO);
        assert_matches!(
            pending.set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET),
            Err(Error::UnsupportedScriptKind { .. })
        );
        assert_matches!(pending.clone().commit(), Ok(Withdrawal::PubKey { .. }));
        pending.set_script(vec![0x82, 0x00]);
        assert_matches!(pending.commit(), Ok(Withdrawal::SimpleScript { .. }));
    }

    #[test]
    fn v1_withdrawal_scripts_cannot_be_referenced() {
        let mut pending = PendingWithdrawal::plutus(stake_address(), Lovelace::ZERO, LanguageVersion::V1);
        assert_matches!(
            pending.set_script_reference(TxInputRef::fake(4), ScriptHash::from_bytes([1; 28]), None),
            Err(Error::UnsupportedByLanguage { feature: "reference scripts", .. })
        );
    }
}
