//! Errors that can occur while staging, finalizing and signing a transaction.

use std::error;
use std::fmt;

use ledger_protocol::{
    consensus::Slot,
    data::DataError,
    script::{ExUnits, LanguageVersion},
    value::AssetName,
    value::BalanceError,
    AddressError, PolicyId, RewardAddress, TxInputRef,
};

use crate::builder::Mode;
use crate::certificate::CertificateKind;
use crate::signing::VerificationKey;

/// The part of a staged item that was never supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingField {
    Script,
    Datum,
    Redeemer,
    /// A mint item's quantity was zero.
    Quantity,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Script => write!(f, "script"),
            MissingField::Datum => write!(f, "datum"),
            MissingField::Redeemer => write!(f, "redeemer"),
            MissingField::Quantity => write!(f, "non-zero quantity"),
        }
    }
}

/// The kinds of item the builder stages before committing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingKind {
    Output,
    /// Any input, whether key-locked or script-locked.
    Input,
    /// A Plutus-locked input.
    ScriptInput,
    Mint,
    Withdrawal,
    Certificate,
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingKind::Output => write!(f, "output"),
            PendingKind::Input => write!(f, "input"),
            PendingKind::ScriptInput => write!(f, "script input"),
            PendingKind::Mint => write!(f, "mint item"),
            PendingKind::Withdrawal => write!(f, "withdrawal"),
            PendingKind::Certificate => write!(f, "certificate"),
        }
    }
}

/// Errors caused by the sequence of directives given to a
/// [`TxBuilder`](crate::builder::TxBuilder).
#[derive(Debug)]
pub enum Error {
    /// A Plutus-locked input was closed before all of its witness was supplied. The input
    /// was discarded.
    IncompleteScriptInput {
        input: TxInputRef,
        missing: MissingField,
    },
    /// A mint item was closed before it was complete. The item was discarded.
    IncompleteMintItem {
        policy: PolicyId,
        asset_name: AssetName,
        missing: MissingField,
    },
    /// A Plutus withdrawal was closed before it was complete. The withdrawal was
    /// discarded.
    IncompleteWithdrawal {
        address: RewardAddress,
        missing: MissingField,
    },
    /// A Plutus-witnessed certificate was closed without its redeemer. The certificate
    /// was discarded.
    IncompleteCertificate {
        certificate: CertificateKind,
        missing: MissingField,
    },
    /// A directive that modifies a staged item was called while no item of the required
    /// kind was open.
    MissingPendingRecord(PendingKind),
    /// A directive that applies to only one kind of script was called on an item
    /// authorized by the other kind.
    UnsupportedScriptKind { operation: &'static str },
    /// The open item already has a script, and this directive would replace it.
    ScriptAlreadySet { operation: &'static str },
    /// Scripts of this language version cannot use the given ledger feature.
    UnsupportedByLanguage {
        version: LanguageVersion,
        feature: &'static str,
    },
    /// Two mint items under one policy disagree on how the policy is satisfied. The
    /// later item was discarded.
    ConflictingMintWitness { policy: PolicyId },
    /// A structural directive was called while a mode for a different kind of item was
    /// armed.
    UnexpectedDirective {
        armed: Mode,
        directive: &'static str,
    },
    /// The transaction was already finalized and can no longer be modified.
    AlreadyFinalized,
    /// Signing requires a finalized transaction.
    NotFinalized,
    /// An asset name was longer than 32 bytes; the length is given.
    InvalidAssetName(usize),
    /// The validity interval would be empty.
    InvalidValidityInterval {
        invalid_before: Slot,
        invalid_hereafter: Slot,
    },
    /// A datum, redeemer or metadata payload could not be interpreted.
    InvalidData(DataError),
    /// An empty signing or verification key was supplied.
    InvalidKey,
    /// The same verification key was used to produce two different signatures.
    ConflictingWitness(VerificationKey),
    /// An amount was outside the valid monetary range.
    Balance(BalanceError),
    /// A reward address could not be decoded.
    InvalidAddress(AddressError),
    /// A redeemer budget exceeds what a whole transaction may spend.
    ExUnitsExceeded { budget: ExUnits, limit: ExUnits },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IncompleteScriptInput { input, missing } => write!(
                f,
                "Script input {} is missing its {} and was discarded",
                input, missing
            ),
            Error::IncompleteMintItem {
                policy,
                asset_name,
                missing,
            } => write!(
                f,
                "Mint of {}.{} is missing its {} and was discarded",
                policy, asset_name, missing
            ),
            Error::IncompleteWithdrawal { address, missing } => write!(
                f,
                "Withdrawal from {} is missing its {} and was discarded",
                address, missing
            ),
            Error::IncompleteCertificate {
                certificate,
                missing,
            } => write!(
                f,
                "Certificate for {} is missing its {} and was discarded",
                certificate, missing
            ),
            Error::MissingPendingRecord(kind) => write!(f, "No {} is open", kind),
            Error::UnsupportedScriptKind { operation } => write!(
                f,
                "{} is not supported for the kind of script authorizing the open item",
                operation
            ),
            Error::ScriptAlreadySet { operation } => write!(
                f,
                "{} would replace the script already set on the open item",
                operation
            ),
            Error::UnsupportedByLanguage { version, feature } => {
                write!(f, "Plutus {} scripts cannot use {}", version, feature)
            }
            Error::ConflictingMintWitness { policy } => write!(
                f,
                "Mint items under policy {} must share one script kind and redeemer",
                policy
            ),
            Error::UnexpectedDirective { armed, directive } => {
                write!(f, "Cannot call {} while {}", directive, armed)
            }
            Error::AlreadyFinalized => write!(f, "The transaction has already been finalized"),
            Error::NotFinalized => write!(f, "The transaction must be finalized first"),
            Error::InvalidAssetName(len) => write!(
                f,
                "Asset names are at most 32 bytes, got {} bytes",
                len
            ),
            Error::InvalidValidityInterval {
                invalid_before,
                invalid_hereafter,
            } => write!(
                f,
                "Validity interval [{}, {}) is empty",
                invalid_before, invalid_hereafter
            ),
            Error::InvalidData(e) => write!(f, "Invalid data: {}", e),
            Error::InvalidKey => write!(f, "Keys must not be empty"),
            Error::ConflictingWitness(vkey) => write!(
                f,
                "Verification key {} already has a different signature",
                vkey
            ),
            Error::Balance(e) => write!(f, "Invalid amount: {}", e),
            Error::InvalidAddress(e) => write!(f, "Invalid reward address: {}", e),
            Error::ExUnitsExceeded { budget, limit } => write!(
                f,
                "Redeemer budget of {} exceeds the transaction limit of {}",
                budget, limit
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::InvalidData(e) => Some(e),
            Error::Balance(e) => Some(e),
            Error::InvalidAddress(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BalanceError> for Error {
    fn from(e: BalanceError) -> Self {
        Error::Balance(e)
    }
}

impl From<AddressError> for Error {
    fn from(e: AddressError) -> Self {
        Error::InvalidAddress(e)
    }
}

impl From<DataError> for Error {
    fn from(e: DataError) -> Self {
        Error::InvalidData(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidData(DataError::Json(e))
    }
}

/// Errors that can occur while finalizing or signing, where the ledger engine is
/// involved.
#[derive(Debug)]
pub enum BuildError<EngineError> {
    /// The builder rejected the operation.
    Builder(Error),
    /// The ledger engine failed.
    Engine(EngineError),
}

impl<EE: fmt::Display> fmt::Display for BuildError<EE> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::Builder(e) => write!(f, "{}", e),
            BuildError::Engine(e) => write!(f, "The ledger engine failed: {}", e),
        }
    }
}

impl<EE: fmt::Debug + fmt::Display> error::Error for BuildError<EE> {}

impl<EE> From<Error> for BuildError<EE> {
    fn from(e: Error) -> Self {
        BuildError::Builder(e)
    }
}

/// Errors that can occur while resolving inputs through a
/// [`UtxoFetcher`](crate::engine::UtxoFetcher).
#[derive(Debug)]
pub enum ResolveError<FetcherError> {
    /// The builder rejected the operation.
    Builder(Error),
    /// The fetcher failed to resolve an input.
    Fetcher(FetcherError),
}

impl<FE: fmt::Display> fmt::Display for ResolveError<FE> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolveError::Builder(e) => write!(f, "{}", e),
            ResolveError::Fetcher(e) => write!(f, "Could not resolve an input: {}", e),
        }
    }
}

impl<FE: fmt::Debug + fmt::Display> error::Error for ResolveError<FE> {}

impl<FE> From<Error> for ResolveError<FE> {
    fn from(e: Error) -> Self {
        ResolveError::Builder(e)
    }
}
