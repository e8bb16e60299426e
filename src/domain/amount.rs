use super::country::{Bounds, Country};
use super::selection::PaymentMethod;
use crate::error::{BoundViolation, ValidationError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::str::FromStr;

/// Keeps digits and the first decimal point only.
fn strip(raw: &str) -> String {
    let mut seen_point = false;
    raw.chars()
        .filter(|c| {
            if c.is_ascii_digit() {
                true
            } else if *c == '.' && !seen_point {
                seen_point = true;
                true
            } else {
                false
            }
        })
        .collect()
}

/// Display form of a raw amount: at most one decimal point, at most 2 fractional digits.
pub fn normalize(raw: &str) -> String {
    let cleaned = strip(raw);
    match cleaned.split_once('.') {
        Some((integer, fraction)) => {
            let end = fraction.len().min(2);
            format!("{}.{}", integer, &fraction[..end])
        }
        None => cleaned,
    }
}

/// Numeric value of the raw input before any display truncation.
pub fn parse_unrounded(raw: &str) -> Option<Decimal> {
    let cleaned = strip(raw);
    if cleaned.is_empty() || cleaned == "." {
        return None;
    }
    let cleaned = if cleaned.starts_with('.') {
        format!("0{}", cleaned)
    } else {
        cleaned
    };
    Decimal::from_str(cleaned.trim_end_matches('.')).ok()
}

/// Outcome of validating one raw amount against the current bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountCheck {
    pub normalized: String,
    pub value: Option<Decimal>,
    pub is_valid: bool,
    pub message: Option<String>,
    #[serde(skip)]
    pub error: Option<ValidationError>,
}

#[derive(Debug, Clone)]
pub struct AmountValidator {
    global: Bounds,
}

impl AmountValidator {
    pub fn new(global: Bounds) -> Self {
        Self { global }
    }

    pub fn global_bounds(&self) -> Bounds {
        self.global
    }

    /// Checks a numeric amount against the global bound, then the country's.
    pub fn check(&self, value: Decimal, country: Option<&Country>) -> Result<(), ValidationError> {
        if !self.global.contains(value) {
            return Err(ValidationError::OutOfGlobalRange {
                min: self.global.min,
                max: self.global.max,
            });
        }
        if let Some(country) = country {
            let bounds = country.crypto_min_max;
            let violation = if value < bounds.min {
                Some((BoundViolation::BelowMinimum, bounds.min))
            } else if value > bounds.max {
                Some((BoundViolation::AboveMaximum, bounds.max))
            } else {
                None
            };
            if let Some((violation, limit)) = violation {
                return Err(ValidationError::OutOfCountryRange {
                    violation,
                    limit,
                    currency: country.currency.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validates user input. An empty input is not valid but carries no message.
    pub fn validate(&self, raw: &str, country: Option<&Country>) -> AmountCheck {
        let normalized = normalize(raw);
        let value = parse_unrounded(raw);
        let (error, message) = match value {
            None if normalized.is_empty() || normalized == "." => {
                (Some(ValidationError::InvalidNumber), None)
            }
            None => (
                Some(ValidationError::InvalidNumber),
                Some(ValidationError::InvalidNumber.to_string()),
            ),
            Some(v) => match self.check(v, country) {
                Ok(()) => (None, None),
                Err(e) => {
                    let message = e.to_string();
                    (Some(e), Some(message))
                }
            },
        };
        AmountCheck {
            normalized,
            value,
            is_valid: error.is_none(),
            message,
            error,
        }
    }
}

/// Crypto to fiat at `rate`, rounded half-up to 2 decimals.
pub fn convert(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn validate_account_number(
    account_number: &str,
    country: &Country,
    method: Option<PaymentMethod>,
) -> Result<(), ValidationError> {
    if account_number.is_empty() {
        return Err(ValidationError::MissingAccountNumber);
    }
    let Some(lengths) = country.account_number_length else {
        return Ok(());
    };
    match method {
        Some(PaymentMethod::Bank) if account_number.len() < lengths.bank_length => Err(
            ValidationError::AccountNumberTooShort(lengths.bank_length),
        ),
        Some(PaymentMethod::Momo) if account_number.len() < lengths.mobile_length => Err(
            ValidationError::MobileNumberTooShort(lengths.mobile_length),
        ),
        _ => Ok(()),
    }
}

/// `0x` followed by 40 (EVM account) or 64 (hash-style) hex digits.
pub fn validate_wallet_address(address: &str) -> Result<(), ValidationError> {
    let hex = address
        .strip_prefix("0x")
        .ok_or(ValidationError::InvalidWalletAddress)?;
    let well_formed =
        (hex.len() == 40 || hex.len() == 64) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidWalletAddress)
    }
}
