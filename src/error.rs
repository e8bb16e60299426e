use crate::domain::kyc::GateResult;
use crate::domain::selection::LifecyclePhase;
use rust_decimal::Decimal;
use thiserror::Error;

/// Which side of a bound an amount fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundViolation {
    BelowMinimum,
    AboveMaximum,
}

/// User-correctable input problems, shown inline next to the field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Enter a valid amount")]
    InvalidNumber,
    #[error("Amount must be between {min} and {max}")]
    OutOfGlobalRange { min: Decimal, max: Decimal },
    #[error("{}", country_range_message(.violation, .limit, .currency))]
    OutOfCountryRange {
        violation: BoundViolation,
        limit: Decimal,
        currency: String,
    },
    #[error("Account number must be at least {0} digits")]
    AccountNumberTooShort(usize),
    #[error("Mobile number must be at least {0} digits")]
    MobileNumberTooShort(usize),
    #[error("Account number is required")]
    MissingAccountNumber,
    #[error("Invalid wallet address format")]
    InvalidWalletAddress,
}

fn country_range_message(violation: &BoundViolation, limit: &Decimal, currency: &str) -> String {
    match violation {
        BoundViolation::BelowMinimum => format!("Minimum is {} {}", limit, currency),
        BoundViolation::AboveMaximum => format!("Maximum is {} {}", limit, currency),
    }
}

/// KYC is not verified; the user has to go through the verification flow.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("KYC verification required ({result:?})")]
pub struct GateError {
    pub result: GateResult,
    pub verification_link: Option<String>,
}

/// The session does not carry enough data to shape a backend request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("no institution selected")]
    MissingInstitution,
    #[error("no verified KYC record")]
    MissingKyc,
    #[error("no country selected")]
    MissingCountry,
    #[error("no network selected")]
    MissingNetwork,
    #[error("no wallet address available")]
    MissingWalletAddress,
}

/// Failure reported by one of the quote, transfer, KYC, rate or institution backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum RampError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Network error after {attempts} attempts: {source}")]
    NetworkTransient {
        attempts: u32,
        #[source]
        source: BackendError,
    },
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),
    #[error("Cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },
    #[error("A submission is already in flight: {0}")]
    SubmissionInProgress(String),
    #[error("Session was reset before the operation completed")]
    StaleSession,
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RampError>;
