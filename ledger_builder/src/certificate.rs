//! Stake certificates, and their staging.

use std::fmt;

use ledger_protocol::{
    data::BuilderData,
    script::{ExUnits, LanguageVersion, RedeemerTag},
    KeyHash, RewardAddress, ScriptHash, TxInputRef,
};

use crate::{
    error::{Error, MissingField},
    witness::{require_reference_support, PlutusScript, Redeemer, ScriptSource, SimpleScriptSource},
};

/// What a certificate does.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CertificateKind {
    /// Registers a stake credential, paying the key deposit.
    RegisterStake { address: RewardAddress },
    /// Delegates a registered stake credential to a pool.
    DelegateStake {
        address: RewardAddress,
        pool_id: KeyHash,
    },
    /// Deregisters a stake credential, reclaiming the key deposit.
    DeregisterStake { address: RewardAddress },
    /// Announces that a pool retires at the start of the given epoch.
    RetirePool { pool_id: KeyHash, epoch: u64 },
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateKind::RegisterStake { address } => {
                write!(f, "registration of {}", address)
            }
            CertificateKind::DelegateStake { address, pool_id } => {
                write!(f, "delegation of {} to {}", address, pool_id)
            }
            CertificateKind::DeregisterStake { address } => {
                write!(f, "deregistration of {}", address)
            }
            CertificateKind::RetirePool { pool_id, epoch } => {
                write!(f, "retirement of pool {} in epoch {}", pool_id, epoch)
            }
        }
    }
}

/// A committed certificate, with the witness of the credential it acts on.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Certificate {
    /// Witnessed by a verification key, or needing no witness.
    Basic(CertificateKind),
    /// The credential is a native script.
    SimpleScript {
        kind: CertificateKind,
        script: SimpleScriptSource,
    },
    /// The credential is a Plutus script.
    Script {
        kind: CertificateKind,
        script: ScriptSource,
        redeemer: Redeemer,
    },
}

impl Certificate {
    pub fn kind(&self) -> &CertificateKind {
        match self {
            Certificate::Basic(kind)
            | Certificate::SimpleScript { kind, .. }
            | Certificate::Script { kind, .. } => kind,
        }
    }

    pub fn redeemer(&self) -> Option<&Redeemer> {
        match self {
            Certificate::Script { redeemer, .. } => Some(redeemer),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
enum PendingCertificateScript {
    None,
    Simple(SimpleScriptSource),
    Plutus {
        source: ScriptSource,
        redeemer: Option<Redeemer>,
    },
}

/// A certificate that has been named but not yet committed.
///
/// Unlike inputs, mints and withdrawals, the kind of script witnessing a certificate is
/// not armed beforehand: supplying a script with a language version makes it a Plutus
/// certificate, and supplying one without makes it a native-script certificate. A
/// redeemer supplied before the script is replaced is kept.
#[derive(Clone, Debug)]
pub(crate) struct PendingCertificate {
    kind: CertificateKind,
    script: PendingCertificateScript,
}

impl PendingCertificate {
    pub(crate) fn new(kind: CertificateKind) -> Self {
        PendingCertificate {
            kind,
            script: PendingCertificateScript::None,
        }
    }

    fn take_redeemer(&mut self) -> Option<Redeemer> {
        match &mut self.script {
            PendingCertificateScript::Plutus { redeemer, .. } => redeemer.take(),
            _ => None,
        }
    }

    pub(crate) fn set_script(&mut self, code: Vec<u8>, version: Option<LanguageVersion>) {
        let redeemer = self.take_redeemer();
        self.script = match version {
            Some(version) => PendingCertificateScript::Plutus {
                source: ScriptSource::Provided(PlutusScript { code, version }),
                redeemer,
            },
            None => PendingCertificateScript::Simple(SimpleScriptSource::Provided(code)),
        };
    }

    pub(crate) fn set_script_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        version: Option<LanguageVersion>,
        script_size: Option<usize>,
    ) -> Result<(), Error> {
        if let Some(version) = version {
            require_reference_support(version, "reference scripts")?;
        }
        let redeemer = self.take_redeemer();
        self.script = match version {
            Some(version) => PendingCertificateScript::Plutus {
                source: ScriptSource::Reference {
                    tx_ref,
                    script_hash,
                    version,
                    script_size,
                },
                redeemer,
            },
            None => PendingCertificateScript::Simple(SimpleScriptSource::Reference {
                tx_ref,
                script_hash,
                script_size,
            }),
        };
        Ok(())
    }

    pub(crate) fn set_redeemer(&mut self, data: BuilderData, ex_units: ExUnits) -> Result<(), Error> {
        match &mut self.script {
            PendingCertificateScript::Plutus { redeemer, .. } => {
                *redeemer = Some(Redeemer::new(RedeemerTag::Cert, data, ex_units));
                Ok(())
            }
            _ => Err(Error::UnsupportedScriptKind {
                operation: "certificate_redeemer_value",
            }),
        }
    }

    pub(crate) fn commit(self) -> Result<Certificate, Error> {
        let PendingCertificate { kind, script } = self;
        match script {
            PendingCertificateScript::None => Ok(Certificate::Basic(kind)),
            PendingCertificateScript::Simple(script) => {
                Ok(Certificate::SimpleScript { kind, script })
            }
            PendingCertificateScript::Plutus {
                source,
                redeemer: Some(redeemer),
            } => Ok(Certificate::Script {
                kind,
                script: source,
                redeemer,
            }),
            PendingCertificateScript::Plutus { redeemer: None, .. } => {
                Err(Error::IncompleteCertificate {
                    certificate: kind,
                    missing: MissingField::Redeemer,
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
        KeyHash, RewardAddress, ScriptHash, TxInputRef,
    };

    use super::{Certificate, CertificateKind, PendingCertificate};
    use crate::{
        error::{Error, MissingField},
        witness::{ScriptSource, SimpleScriptSource},
    };

    fn delegation() -> CertificateKind {
        CertificateKind::DelegateStake {
            address: RewardAddress::parse(
                "stake_test17rphkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtcljw6kf",
            )
            .unwrap(),
            pool_id: KeyHash::from_bytes([5; 28]),
        }
    }

    #[test]
    fn basic_certificate_needs_no_witness() {
        let mut pending = PendingCertificate::new(delegation());
        assert_matches!(
            pending.set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET),
            Err(Error::UnsupportedScriptKind { operation: "certificate_redeemer_value" })
        );
        assert_eq!(pending.commit().unwrap(), Certificate::Basic(delegation()));
    }

    #[test]
    fn script_version_selects_the_witness_kind() {
        let mut native = PendingCertificate::new(delegation());
        native.set_script(vec![0x82], None);
        assert_matches!(
            native.commit(),
            Ok(Certificate::SimpleScript { script: SimpleScriptSource::Provided(code), .. })
                if code == vec![0x82]
        );

        let mut plutus = PendingCertificate::new(delegation());
        plutus.set_script_reference(
            TxInputRef::fake(2),
            ScriptHash::from_bytes([9; 28]),
            Some(LanguageVersion::V3),
            Some(400),
        )
        .unwrap();
        assert_matches!(
            plutus.clone().commit(),
            Err(Error::IncompleteCertificate { missing: MissingField::Redeemer, .. })
        );
        plutus
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        let certificate = plutus.commit().unwrap();
        assert_matches!(&certificate, Certificate::Script { script, redeemer, .. } => {
            assert_matches!(script, ScriptSource::Reference { version: LanguageVersion::V3, .. });
            assert_eq!(redeemer.index, None);
        });
        assert_eq!(certificate.kind(), &delegation());
    }

    #[test]
    fn v1_certificate_scripts_cannot_be_referenced() {
        let mut pending = PendingCertificate::new(delegation());
        assert_matches!(
            pending.set_script_reference(
                TxInputRef::fake(2),
                ScriptHash::from_bytes([9; 28]),
                Some(LanguageVersion::V1),
                None,
            ),
            Err(Error::UnsupportedByLanguage { version: LanguageVersion::V1, .. })
        );
        // Native scripts have no language version to check.
        pending
            .set_script_reference(TxInputRef::fake(2), ScriptHash::from_bytes([9; 28]), None, None)
            .unwrap();
        assert_matches!(pending.commit(), Ok(Certificate::SimpleScript { .. }));
    }

    #[test]
    fn replacing_the_script_keeps_the_redeemer() {
        let mut pending = PendingCertificate::new(delegation());
        pending.set_script(vec![0x4e], Some(LanguageVersion::V2));
        pending
            .set_redeemer(PlutusData::unit().into(), DEFAULT_REDEEMER_BUDGET)
            .unwrap();
        pending.set_script(vec![0x4f], Some(LanguageVersion::V3));
        assert_matches!(
            pending.commit(),
            Ok(Certificate::Script { script: ScriptSource::Provided(script), .. })
                if script.version == LanguageVersion::V3
        );
    }
}
