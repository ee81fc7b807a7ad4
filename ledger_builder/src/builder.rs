//! Structs for building transactions.
//!
//! A [`TxBuilder`] is driven by a sequence of directives. Items that take several
//! directives to describe (outputs, inputs, mint items, withdrawals and certificates) are
//! staged in a
//! pending slot, one per kind, and committed when the next item of the same kind is
//! named, when the slot is flushed explicitly, or when the transaction is finalized.
//! Script-locked items are validated as they are committed: an item that is missing part
//! of its witness is discarded and reported, never committed.

use std::collections::BTreeSet;
use std::fmt;

use ledger_protocol::{
    consensus::{Network, Slot},
    data::BuilderData,
    params::ProtocolParameters,
    script::{ExUnits, LanguageVersion, DEFAULT_REDEEMER_BUDGET},
    value::{AssetName, Lovelace, Value},
    Address, KeyHash, PolicyId, RewardAddress, ScriptHash, TxHash, TxInputRef,
};
use tracing::{debug, trace, warn};

use crate::{
    body::{AuxiliaryData, TxBody, ValidityInterval},
    certificate::{CertificateKind, PendingCertificate},
    engine::{LedgerEngine, UnsignedBody, UtxoFetcher},
    error::{BuildError, Error, PendingKind, ResolveError},
    input::{PendingInput, ReferenceInput, ResolvedInput, TxInput},
    mint::PendingMint,
    output::{OutputDatum, TxOutput},
    signing::{VerificationKey, WitnessAccumulator, WitnessSet},
    withdrawal::PendingWithdrawal,
    witness::{DatumSource, PlutusScript},
};

/// Determines how the next structural directive is interpreted.
///
/// A mode is armed by one of the `*_plutus_script` directives and consumed by the next
/// directive that names an item of the matching kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    /// The next [`TxBuilder::tx_in`] names a Plutus-locked input.
    AwaitingScriptInput(LanguageVersion),
    /// The next [`TxBuilder::mint`] names an item authorized by a Plutus policy.
    AwaitingMintDetails(LanguageVersion),
    /// The next [`TxBuilder::withdrawal`] names a Plutus-controlled withdrawal.
    AwaitingWithdrawal(LanguageVersion),
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "no item mode is armed"),
            Mode::AwaitingScriptInput(v) => write!(f, "a Plutus {} script input is expected", v),
            Mode::AwaitingMintDetails(v) => write!(f, "a Plutus {} mint item is expected", v),
            Mode::AwaitingWithdrawal(v) => write!(f, "a Plutus {} withdrawal is expected", v),
        }
    }
}

#[derive(Debug)]
struct Finalized {
    hash: TxHash,
    unsigned: UnsignedBody,
}

/// Generates a transaction from its inputs, outputs, mints and witnesses.
///
/// One builder corresponds to one transaction. Once [`TxBuilder::finalize`] succeeds the
/// transaction can only be signed; every directive that would change it returns
/// [`Error::AlreadyFinalized`].
#[derive(Debug)]
pub struct TxBuilder<E> {
    engine: E,
    params: ProtocolParameters,
    mode: Mode,
    body: TxBody,
    auxiliary_data: AuxiliaryData,
    pending_output: Option<TxOutput>,
    pending_input: Option<PendingInput>,
    pending_mint: Option<PendingMint>,
    pending_withdrawal: Option<PendingWithdrawal>,
    pending_certificate: Option<PendingCertificate>,
    finalized: Option<Finalized>,
    witnesses: WitnessAccumulator,
}

impl<E> TxBuilder<E> {
    /// Returns the ledger engine this builder finalizes and signs with.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the protocol parameters the transaction will be balanced against.
    pub fn params(&self) -> &ProtocolParameters {
        &self.params
    }

    /// Returns the currently armed mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the items committed so far.
    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn auxiliary_data(&self) -> &AuxiliaryData {
        &self.auxiliary_data
    }

    /// Returns the kinds of item currently staged and not yet committed.
    pub fn pending(&self) -> Vec<PendingKind> {
        [
            self.pending_output.as_ref().map(|_| PendingKind::Output),
            self.pending_input.as_ref().map(|_| PendingKind::Input),
            self.pending_mint.as_ref().map(|_| PendingKind::Mint),
            self.pending_withdrawal
                .as_ref()
                .map(|_| PendingKind::Withdrawal),
            self.pending_certificate
                .as_ref()
                .map(|_| PendingKind::Certificate),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// Returns the hash of the finalized transaction body.
    pub fn body_hash(&self) -> Option<&TxHash> {
        self.finalized.as_ref().map(|f| &f.hash)
    }

    /// Returns the finalized transaction body.
    pub fn unsigned_body(&self) -> Option<&UnsignedBody> {
        self.finalized.as_ref().map(|f| &f.unsigned)
    }

    /// Returns the signatures collected so far.
    pub fn witnesses(&self) -> &WitnessAccumulator {
        &self.witnesses
    }

    fn ensure_mutable(&self) -> Result<(), Error> {
        if self.finalized.is_some() {
            Err(Error::AlreadyFinalized)
        } else {
            Ok(())
        }
    }

    fn arm(&mut self, mode: Mode, directive: &'static str) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        if self.mode != Mode::Idle {
            return Err(Error::UnexpectedDirective {
                armed: self.mode,
                directive,
            });
        }
        trace!("Armed mode: {}", mode);
        self.mode = mode;
        Ok(self)
    }

    /// Returns the version carried by the armed mode if `expected` accepts it, `None` if
    /// no mode is armed, or an error if a mode for another kind of item is armed.
    fn armed_version(
        &self,
        expected: fn(Mode) -> Option<LanguageVersion>,
        directive: &'static str,
    ) -> Result<Option<LanguageVersion>, Error> {
        match self.mode {
            Mode::Idle => Ok(None),
            armed => expected(armed)
                .map(Some)
                .ok_or(Error::UnexpectedDirective { armed, directive }),
        }
    }

    //
    // Inputs
    //

    /// Declares that the next input named by [`TxBuilder::tx_in`] is locked by a Plutus
    /// script of the given version.
    pub fn spending_plutus_script(&mut self, version: LanguageVersion) -> Result<&mut Self, Error> {
        self.arm(Mode::AwaitingScriptInput(version), "spending_plutus_script")
    }

    /// Names an input to spend, committing the previously named input.
    ///
    /// The input is key-locked unless [`TxBuilder::spending_plutus_script`] was called
    /// first. Its value and address may be supplied now or resolved later with
    /// [`TxBuilder::resolve_inputs`].
    pub fn tx_in(
        &mut self,
        tx_ref: TxInputRef,
        value: Option<Value>,
        address: Option<Address>,
    ) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let version = self.armed_version(
            |mode| match mode {
                Mode::AwaitingScriptInput(v) => Some(v),
                _ => None,
            },
            "tx_in",
        )?;
        self.flush_input()?;

        let input = ResolvedInput::new(tx_ref, value, address);
        self.pending_input = Some(match version {
            None => PendingInput::PubKey {
                input,
                simple_script: None,
            },
            Some(version) => PendingInput::Script {
                input,
                version,
                script: None,
                datum: None,
                redeemer: None,
            },
        });
        self.mode = Mode::Idle;
        Ok(self)
    }

    fn pending_input_mut(&mut self, kind: PendingKind) -> Result<&mut PendingInput, Error> {
        self.ensure_mutable()?;
        self.pending_input
            .as_mut()
            .ok_or(Error::MissingPendingRecord(kind))
    }

    /// Supplies the script locking the open input.
    ///
    /// For a Plutus-locked input this is the Plutus script, of the version given to
    /// [`TxBuilder::spending_plutus_script`]. For a key-locked input this is a native
    /// script, and the input becomes a native-script input.
    pub fn tx_in_script(&mut self, code: impl Into<Vec<u8>>) -> Result<&mut Self, Error> {
        self.pending_input_mut(PendingKind::Input)?
            .set_script(code.into())?;
        Ok(self)
    }

    /// Supplies the open Plutus-locked input's script by reference to an output carrying
    /// it.
    pub fn spending_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.pending_input_mut(PendingKind::ScriptInput)?
            .set_script_reference(tx_ref, script_hash, script_size)?;
        Ok(self)
    }

    /// Supplies the open input's native script by reference to an output carrying it.
    pub fn simple_script_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.pending_input_mut(PendingKind::Input)?
            .set_simple_script_reference(tx_ref, script_hash, script_size)?;
        Ok(self)
    }

    /// Supplies the datum of the open Plutus-locked input.
    pub fn tx_in_datum_value(&mut self, data: impl Into<BuilderData>) -> Result<&mut Self, Error> {
        self.pending_input_mut(PendingKind::ScriptInput)?
            .set_datum(DatumSource::Provided(data.into()))?;
        Ok(self)
    }

    /// Declares that the open Plutus-locked input's datum is stored inline in the output
    /// it spends.
    pub fn tx_in_inline_datum_present(&mut self) -> Result<&mut Self, Error> {
        self.pending_input_mut(PendingKind::ScriptInput)?
            .set_inline_datum()?;
        Ok(self)
    }

    /// Supplies the spend redeemer of the open Plutus-locked input.
    ///
    /// If no budget is given, [`DEFAULT_REDEEMER_BUDGET`] is used. A budget larger than
    /// the protocol's per-transaction limit is rejected.
    pub fn tx_in_redeemer_value(
        &mut self,
        data: impl Into<BuilderData>,
        budget: Option<ExUnits>,
    ) -> Result<&mut Self, Error> {
        let limit = self.params.max_tx_ex_units();
        self.pending_input_mut(PendingKind::ScriptInput)?
            .set_redeemer(data.into(), checked_budget(budget, limit)?)?;
        Ok(self)
    }

    /// Pledges an input as collateral against script failure.
    pub fn tx_in_collateral(
        &mut self,
        tx_ref: TxInputRef,
        value: Option<Value>,
        address: Option<Address>,
    ) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        debug!("Committed collateral input {}", tx_ref);
        self.body
            .collaterals
            .push(ResolvedInput::new(tx_ref, value, address));
        Ok(self)
    }

    /// Makes an output visible to the transaction's scripts without spending it.
    pub fn read_only_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        debug!("Committed reference input {}", tx_ref);
        self.body.reference_inputs.push(ReferenceInput {
            tx_ref,
            script_size,
        });
        Ok(self)
    }

    //
    // Outputs
    //

    /// Names an output, committing the previously named output.
    pub fn tx_out(&mut self, address: impl Into<Address>, amount: Value) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.flush_output()?;
        self.pending_output = Some(TxOutput::new(address.into(), amount));
        Ok(self)
    }

    fn pending_output_mut(&mut self) -> Result<&mut TxOutput, Error> {
        self.ensure_mutable()?;
        self.pending_output
            .as_mut()
            .ok_or(Error::MissingPendingRecord(PendingKind::Output))
    }

    /// Attaches a datum to the open output by hash.
    pub fn tx_out_datum_hash_value(&mut self, data: impl Into<BuilderData>) -> Result<&mut Self, Error> {
        self.pending_output_mut()?.datum = Some(OutputDatum::Hash(data.into()));
        Ok(self)
    }

    /// Stores a datum inline in the open output.
    pub fn tx_out_inline_datum_value(
        &mut self,
        data: impl Into<BuilderData>,
    ) -> Result<&mut Self, Error> {
        self.pending_output_mut()?.datum = Some(OutputDatum::Inline(data.into()));
        Ok(self)
    }

    /// Attaches a datum to the open output by hash, and carries the datum itself in the
    /// witness set.
    pub fn tx_out_datum_embed_value(
        &mut self,
        data: impl Into<BuilderData>,
    ) -> Result<&mut Self, Error> {
        self.pending_output_mut()?.datum = Some(OutputDatum::Embed(data.into()));
        Ok(self)
    }

    /// Stores a reference script in the open output.
    pub fn tx_out_reference_script(
        &mut self,
        code: impl Into<Vec<u8>>,
        version: LanguageVersion,
    ) -> Result<&mut Self, Error> {
        self.pending_output_mut()?.reference_script = Some(PlutusScript {
            code: code.into(),
            version,
        });
        Ok(self)
    }

    //
    // Minting
    //

    /// Declares that the next item named by [`TxBuilder::mint`] is authorized by a Plutus
    /// policy of the given version.
    pub fn mint_plutus_script(&mut self, version: LanguageVersion) -> Result<&mut Self, Error> {
        self.arm(Mode::AwaitingMintDetails(version), "mint_plutus_script")
    }

    /// Names an asset to mint (positive quantity) or burn (negative quantity), committing
    /// the previously named mint item.
    ///
    /// The item is authorized by a native script unless [`TxBuilder::mint_plutus_script`]
    /// was called first.
    pub fn mint(
        &mut self,
        quantity: i64,
        policy: PolicyId,
        asset_name: impl AsRef<[u8]>,
    ) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let version = self.armed_version(
            |mode| match mode {
                Mode::AwaitingMintDetails(v) => Some(v),
                _ => None,
            },
            "mint",
        )?;
        let asset_name = asset_name.as_ref();
        let asset_name =
            AssetName::new(asset_name).ok_or(Error::InvalidAssetName(asset_name.len()))?;
        self.flush_mint()?;

        self.pending_mint = Some(match version {
            None => PendingMint::native(policy, asset_name, quantity),
            Some(version) => PendingMint::plutus(policy, asset_name, quantity, version),
        });
        self.mode = Mode::Idle;
        Ok(self)
    }

    fn pending_mint_mut(&mut self) -> Result<&mut PendingMint, Error> {
        self.ensure_mutable()?;
        self.pending_mint
            .as_mut()
            .ok_or(Error::MissingPendingRecord(PendingKind::Mint))
    }

    /// Supplies the script authorizing the open mint item. Whether it is read as a
    /// native or a Plutus script was fixed when the item was named.
    pub fn minting_script(&mut self, code: impl Into<Vec<u8>>) -> Result<&mut Self, Error> {
        self.pending_mint_mut()?.set_script(code.into());
        Ok(self)
    }

    /// Supplies the Plutus policy of the open mint item by reference to an output
    /// carrying it.
    pub fn mint_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        version: LanguageVersion,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.pending_mint_mut()?
            .set_script_reference(tx_ref, script_hash, version, script_size)?;
        Ok(self)
    }

    /// Supplies the mint redeemer of the open Plutus mint item.
    pub fn mint_redeemer_value(
        &mut self,
        data: impl Into<BuilderData>,
        budget: Option<ExUnits>,
    ) -> Result<&mut Self, Error> {
        let limit = self.params.max_tx_ex_units();
        self.pending_mint_mut()?
            .set_redeemer(data.into(), checked_budget(budget, limit)?)?;
        Ok(self)
    }

    //
    // Withdrawals
    //

    /// Declares that the next withdrawal named by [`TxBuilder::withdrawal`] is from a
    /// reward address controlled by a Plutus script of the given version.
    pub fn withdrawal_plutus_script(&mut self, version: LanguageVersion) -> Result<&mut Self, Error> {
        self.arm(Mode::AwaitingWithdrawal(version), "withdrawal_plutus_script")
    }

    /// Names a reward withdrawal from a bech32 reward address, committing the previously
    /// named withdrawal.
    pub fn withdrawal(&mut self, address: impl AsRef<str>, coin: u64) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let version = self.armed_version(
            |mode| match mode {
                Mode::AwaitingWithdrawal(v) => Some(v),
                _ => None,
            },
            "withdrawal",
        )?;
        let address = RewardAddress::parse(address.as_ref())?;
        let coin = Lovelace::from_u64(coin)?;
        self.flush_withdrawal()?;

        self.pending_withdrawal = Some(match version {
            None => PendingWithdrawal::pub_key(address, coin),
            Some(version) => PendingWithdrawal::plutus(address, coin, version),
        });
        self.mode = Mode::Idle;
        Ok(self)
    }

    fn pending_withdrawal_mut(&mut self) -> Result<&mut PendingWithdrawal, Error> {
        self.ensure_mutable()?;
        self.pending_withdrawal
            .as_mut()
            .ok_or(Error::MissingPendingRecord(PendingKind::Withdrawal))
    }

    /// Supplies the script controlling the open withdrawal's reward address.
    pub fn withdrawal_script(&mut self, code: impl Into<Vec<u8>>) -> Result<&mut Self, Error> {
        self.pending_withdrawal_mut()?.set_script(code.into());
        Ok(self)
    }

    /// Supplies the script controlling the open withdrawal's reward address by reference
    /// to an output carrying it.
    pub fn withdrawal_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.pending_withdrawal_mut()?
            .set_script_reference(tx_ref, script_hash, script_size)?;
        Ok(self)
    }

    /// Supplies the reward redeemer of the open Plutus withdrawal.
    pub fn withdrawal_redeemer_value(
        &mut self,
        data: impl Into<BuilderData>,
        budget: Option<ExUnits>,
    ) -> Result<&mut Self, Error> {
        let limit = self.params.max_tx_ex_units();
        self.pending_withdrawal_mut()?
            .set_redeemer(data.into(), checked_budget(budget, limit)?)?;
        Ok(self)
    }

    //
    // Certificates
    //

    fn name_certificate(&mut self, kind: CertificateKind) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.flush_certificate()?;
        self.pending_certificate = Some(PendingCertificate::new(kind));
        Ok(self)
    }

    /// Names a certificate registering the stake credential of a reward address,
    /// committing the previously named certificate.
    pub fn register_stake_certificate(&mut self, address: impl AsRef<str>) -> Result<&mut Self, Error> {
        let address = RewardAddress::parse(address.as_ref())?;
        self.name_certificate(CertificateKind::RegisterStake { address })
    }

    /// Names a certificate delegating the stake credential of a reward address to a pool.
    pub fn delegate_stake_certificate(
        &mut self,
        address: impl AsRef<str>,
        pool_id: KeyHash,
    ) -> Result<&mut Self, Error> {
        let address = RewardAddress::parse(address.as_ref())?;
        self.name_certificate(CertificateKind::DelegateStake { address, pool_id })
    }

    /// Names a certificate deregistering the stake credential of a reward address.
    pub fn deregister_stake_certificate(&mut self, address: impl AsRef<str>) -> Result<&mut Self, Error> {
        let address = RewardAddress::parse(address.as_ref())?;
        self.name_certificate(CertificateKind::DeregisterStake { address })
    }

    /// Names a certificate retiring a pool at the start of `epoch`.
    pub fn retire_pool_certificate(&mut self, pool_id: KeyHash, epoch: u64) -> Result<&mut Self, Error> {
        self.name_certificate(CertificateKind::RetirePool { pool_id, epoch })
    }

    fn pending_certificate_mut(&mut self) -> Result<&mut PendingCertificate, Error> {
        self.ensure_mutable()?;
        self.pending_certificate
            .as_mut()
            .ok_or(Error::MissingPendingRecord(PendingKind::Certificate))
    }

    /// Supplies the script witnessing the open certificate: a Plutus script if a version
    /// is given, and a native script otherwise.
    pub fn certificate_script(
        &mut self,
        code: impl Into<Vec<u8>>,
        version: Option<LanguageVersion>,
    ) -> Result<&mut Self, Error> {
        self.pending_certificate_mut()?
            .set_script(code.into(), version);
        Ok(self)
    }

    /// Supplies the script witnessing the open certificate by reference to an output
    /// carrying it.
    pub fn certificate_tx_in_reference(
        &mut self,
        tx_ref: TxInputRef,
        script_hash: ScriptHash,
        version: Option<LanguageVersion>,
        script_size: Option<usize>,
    ) -> Result<&mut Self, Error> {
        self.pending_certificate_mut()?
            .set_script_reference(tx_ref, script_hash, version, script_size)?;
        Ok(self)
    }

    /// Supplies the certificate redeemer of the open Plutus-witnessed certificate.
    pub fn certificate_redeemer_value(
        &mut self,
        data: impl Into<BuilderData>,
        budget: Option<ExUnits>,
    ) -> Result<&mut Self, Error> {
        let limit = self.params.max_tx_ex_units();
        self.pending_certificate_mut()?
            .set_redeemer(data.into(), checked_budget(budget, limit)?)?;
        Ok(self)
    }

    //
    // Everything else
    //

    /// Requires the holder of the given key to sign the transaction.
    pub fn required_signer_hash(&mut self, key_hash: KeyHash) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.body.required_signers.insert(key_hash);
        Ok(self)
    }

    /// Makes the transaction invalid before the given slot.
    pub fn invalid_before(&mut self, slot: Slot) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let mut validity = self.body.validity;
        validity.invalid_before = Some(slot);
        self.set_validity(validity)
    }

    /// Makes the transaction invalid from the given slot onwards.
    pub fn invalid_hereafter(&mut self, slot: Slot) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let mut validity = self.body.validity;
        validity.invalid_hereafter = Some(slot);
        self.set_validity(validity)
    }

    /// Makes the transaction invalid before the slot containing the given Unix time in
    /// milliseconds, on the network set so far.
    pub fn invalid_before_time(&mut self, unix_millis: u64) -> Result<&mut Self, Error> {
        let slot = self.body.network.slot_at(unix_millis);
        self.invalid_before(slot)
    }

    /// Makes the transaction invalid from the slot containing the given Unix time in
    /// milliseconds, on the network set so far.
    pub fn invalid_hereafter_time(&mut self, unix_millis: u64) -> Result<&mut Self, Error> {
        let slot = self.body.network.slot_at(unix_millis);
        self.invalid_hereafter(slot)
    }

    fn set_validity(&mut self, validity: ValidityInterval) -> Result<&mut Self, Error> {
        match (validity.invalid_before, validity.invalid_hereafter) {
            (Some(invalid_before), Some(invalid_hereafter)) if !validity.is_satisfiable() => {
                Err(Error::InvalidValidityInterval {
                    invalid_before,
                    invalid_hereafter,
                })
            }
            _ => {
                self.body.validity = validity;
                Ok(self)
            }
        }
    }

    /// Sets the address the ledger engine sends change to.
    pub fn change_address(&mut self, address: impl Into<Address>) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.body.change_address = Some(address.into());
        Ok(self)
    }

    /// Attaches metadata under the given label, replacing any metadata already there.
    pub fn metadata_value<T: serde::Serialize + ?Sized>(
        &mut self,
        label: u64,
        value: &T,
    ) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let value = serde_json::to_value(value)?;
        if self
            .auxiliary_data
            .metadata
            .insert(label, value)
            .is_some()
        {
            debug!("Replaced metadata under label {}", label);
        }
        Ok(self)
    }

    /// Sets the network the transaction is built for.
    pub fn network(&mut self, network: Network) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.body.network = network;
        Ok(self)
    }

    /// Sets the protocol parameters the transaction is balanced against.
    pub fn protocol_params(&mut self, params: ProtocolParameters) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        self.params = params;
        Ok(self)
    }

    //
    // Flushing
    //

    /// Commits the open output, if any.
    pub fn flush_output(&mut self) -> Result<&mut Self, Error> {
        if let Some(output) = self.pending_output.take() {
            debug!("Committed output to {}", output.address);
            self.body.outputs.push(output);
        }
        Ok(self)
    }

    /// Validates and commits the open input, if any.
    ///
    /// An incomplete input is discarded and the reason is returned.
    pub fn flush_input(&mut self) -> Result<&mut Self, Error> {
        if let Some(pending) = self.pending_input.take() {
            let input = pending.commit().inspect_err(|e| debug!("{}", e))?;
            debug!("Committed input {}", input.tx_ref());
            self.body.inputs.push(input);
        }
        Ok(self)
    }

    /// Validates and commits the open mint item, if any.
    ///
    /// An incomplete item is discarded and the reason is returned.
    pub fn flush_mint(&mut self) -> Result<&mut Self, Error> {
        if let Some(pending) = self.pending_mint.take() {
            let item = pending.commit().inspect_err(|e| debug!("{}", e))?;
            if self
                .body
                .mints
                .iter()
                .any(|m| m.policy == item.policy && !m.shares_witness_with(&item))
            {
                let e = Error::ConflictingMintWitness {
                    policy: item.policy,
                };
                debug!("{}", e);
                return Err(e);
            }
            debug!(
                "Committed mint of {} {}.{}",
                item.quantity, item.policy, item.asset_name
            );
            self.body.mints.push(item);
        }
        Ok(self)
    }

    /// Validates and commits the open withdrawal, if any.
    ///
    /// An incomplete withdrawal is discarded and the reason is returned.
    pub fn flush_withdrawal(&mut self) -> Result<&mut Self, Error> {
        if let Some(pending) = self.pending_withdrawal.take() {
            let withdrawal = pending.commit().inspect_err(|e| debug!("{}", e))?;
            debug!("Committed withdrawal from {}", withdrawal.address());
            self.body.withdrawals.push(withdrawal);
        }
        Ok(self)
    }

    /// Validates and commits the open certificate, if any.
    ///
    /// An incomplete certificate is discarded and the reason is returned.
    pub fn flush_certificate(&mut self) -> Result<&mut Self, Error> {
        if let Some(pending) = self.pending_certificate.take() {
            let certificate = pending.commit().inspect_err(|e| debug!("{}", e))?;
            debug!("Committed certificate for {}", certificate.kind());
            self.body.certificates.push(certificate);
        }
        Ok(self)
    }

    /// Commits every open item: the output, then the input, then the mint item, then the
    /// withdrawal, then the certificate. Stops at the first item that fails validation.
    pub fn flush_all(&mut self) -> Result<&mut Self, Error> {
        self.flush_output()?
            .flush_input()?
            .flush_mint()?
            .flush_withdrawal()?
            .flush_certificate()
    }

    /// Removes committed inputs that spend an output already spent by an earlier input.
    pub fn remove_duplicate_inputs(&mut self) -> Result<&mut Self, Error> {
        self.ensure_mutable()?;
        let mut seen = BTreeSet::new();
        self.body.inputs.retain(|input| {
            let first = seen.insert(*input.tx_ref());
            if !first {
                warn!("Dropping duplicate input {}", input.tx_ref());
            }
            first
        });
        Ok(self)
    }

    /// Fills in the value and address of every input and collateral input, committed or
    /// open, for which they were not supplied.
    pub fn resolve_inputs<F: UtxoFetcher>(
        &mut self,
        fetcher: &F,
    ) -> Result<&mut Self, ResolveError<F::Error>> {
        self.ensure_mutable()?;
        let unresolved = self
            .body
            .inputs
            .iter_mut()
            .map(TxInput::input_mut)
            .chain(self.body.collaterals.iter_mut())
            .chain(self.pending_input.as_mut().map(PendingInput::input_mut))
            .filter(|input| !input.is_resolved());
        for input in unresolved {
            let (address, value) = fetcher
                .resolve_input_value(&input.tx_ref)
                .map_err(ResolveError::Fetcher)?;
            debug!("Resolved input {} at {}", input.tx_ref, address);
            input.resolve_with(address, value);
        }
        Ok(self)
    }

    /// Returns the witness set that [`TxBuilder::complete_signing`] would encode: the
    /// ledger engine's witnesses together with every signature collected so far.
    pub fn signed_witness_set(&self) -> Result<WitnessSet, Error> {
        let finalized = self.finalized.as_ref().ok_or(Error::NotFinalized)?;
        self.witnesses.merge_into(&finalized.unsigned.witness_set)
    }
}

impl<E: LedgerEngine> TxBuilder<E> {
    /// Creates a builder for a mainnet transaction, using the default protocol
    /// parameters.
    pub fn new(engine: E) -> Self {
        TxBuilder {
            engine,
            params: ProtocolParameters::default(),
            mode: Mode::Idle,
            body: TxBody::default(),
            auxiliary_data: AuxiliaryData::default(),
            pending_output: None,
            pending_input: None,
            pending_mint: None,
            pending_withdrawal: None,
            pending_certificate: None,
            finalized: None,
            witnesses: WitnessAccumulator::new(),
        }
    }

    /// Commits every open item, assigns redeemer indices, and has the ledger engine
    /// encode and hash the transaction body.
    ///
    /// Finalizing again without any change in between hands the engine the same body.
    pub fn finalize(&mut self) -> Result<TxHash, BuildError<E::Error>> {
        if self.mode != Mode::Idle {
            return Err(Error::UnexpectedDirective {
                armed: self.mode,
                directive: "finalize",
            }
            .into());
        }
        self.flush_all()?;
        self.body.assign_redeemer_indices();

        let unsigned = self
            .engine
            .build_transaction_body(&self.body, &self.params)
            .map_err(BuildError::Engine)?;
        let hash = self
            .engine
            .hash_transaction_body(&unsigned)
            .map_err(BuildError::Engine)?;

        if let Some(previous) = &self.finalized {
            if previous.hash != hash && !self.witnesses.is_empty() {
                warn!(
                    "Transaction body changed from {} to {}; discarding {} signatures",
                    previous.hash,
                    hash,
                    self.witnesses.len()
                );
                self.witnesses.clear();
            }
        }

        debug!(
            "Finalized transaction {} with {} inputs, {} outputs, {} mints, {} withdrawals and {} certificates",
            hash,
            self.body.inputs.len(),
            self.body.outputs.len(),
            self.body.mints.len(),
            self.body.withdrawals.len(),
            self.body.certificates.len(),
        );
        self.finalized = Some(Finalized { hash, unsigned });
        Ok(hash)
    }

    /// Signs the finalized transaction body with the given private key, and records the
    /// signature under the given verification key.
    ///
    /// May be called once per signing party, in any order.
    pub fn sign(
        &mut self,
        private_key: &[u8],
        verification_key: &[u8],
    ) -> Result<&mut Self, BuildError<E::Error>> {
        let finalized = self.finalized.as_ref().ok_or(Error::NotFinalized)?;
        if private_key.is_empty() {
            return Err(Error::InvalidKey.into());
        }
        let vkey = VerificationKey::from_bytes(verification_key).ok_or(Error::InvalidKey)?;
        let signature = self
            .engine
            .sign(&finalized.hash, private_key)
            .map_err(BuildError::Engine)?;

        debug!("Collected signature from {}", vkey);
        self.witnesses.add(vkey, signature)?;
        Ok(self)
    }

    /// Encodes the signed transaction, returning it hex-encoded.
    ///
    /// This does not consume the collected signatures; calling it again yields the same
    /// transaction unless more signatures were collected in between.
    pub fn complete_signing(&self) -> Result<String, BuildError<E::Error>> {
        let witness_set = self.signed_witness_set()?;
        let finalized = self.finalized.as_ref().ok_or(Error::NotFinalized)?;
        let auxiliary_data =
            (!self.auxiliary_data.metadata.is_empty()).then_some(&self.auxiliary_data);

        let tx = self
            .engine
            .encode_transaction(&finalized.unsigned, &witness_set, auxiliary_data)
            .map_err(BuildError::Engine)?;
        debug!(
            "Encoded transaction {} with {} key witnesses",
            finalized.hash,
            witness_set.vkey_witnesses.len()
        );
        Ok(hex::encode(tx))
    }
}

/// Applies the default budget if none was given, and rejects a budget larger than
/// `limit`.
fn checked_budget(budget: Option<ExUnits>, limit: ExUnits) -> Result<ExUnits, Error> {
    let budget = budget.unwrap_or(DEFAULT_REDEEMER_BUDGET);
    if budget.fits_within(&limit) {
        Ok(budget)
    } else {
        Err(Error::ExUnitsExceeded { budget, limit })
    }
}
