//! Shapes session state and a verified KYC record into the request bodies the
//! quote and transfer backends expect.
//!
//! Country-specific behaviour comes from [`CountryRule`]; nothing here
//! branches on country codes directly.

use super::country::{CountryRule, PayloadShape};
use super::kyc::{FullKyc, KycRecord};
use super::quote::{QuoteRequest, TransferType};
use super::selection::{PaymentMethod, SessionSelection};
use crate::error::PayloadError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub name: String,
    pub country: String,
    pub address: String,
    pub phone: String,
    pub dob: String,
    pub id_number: String,
    pub id_type: String,
    pub additional_id_type: String,
    pub additional_id_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub code: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Recipient {
    Bank { bank: BankDetails },
    Mobile { phone: String },
}

/// Transfer request body. The quote id is attached once a quote exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(flatten)]
    pub recipient: Recipient,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    pub user_details: UserDetails,
}

impl RequestPayload {
    pub fn with_quote(mut self, quote_id: impl Into<String>) -> Self {
        self.quote_id = Some(quote_id.into());
        self
    }
}

/// Generic document-type mapping, before any country override.
pub fn normalize_document_type(document_type: &str) -> &'static str {
    match document_type {
        "ID" => "NIN",
        "P" => "Passport",
        _ => "License",
    }
}

/// Country phone prefix followed by the account number without leading zeros.
pub fn international_phone(phone_code: &str, account_number: &str) -> String {
    format!("{}{}", phone_code, account_number.trim_start_matches('0'))
}

fn account_name(selection: &SessionSelection, identity: &FullKyc) -> String {
    if selection.use_kyc_name_as_account_name {
        return identity.full_name.clone();
    }
    selection
        .account_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&identity.full_name)
        .to_string()
}

/// Builds the transfer payload for `direction`.
///
/// NG and ZA buy flows have no recipient panel, so they are the only case
/// where a missing institution is accepted.
pub fn build(
    selection: &SessionSelection,
    kyc: Option<&KycRecord>,
    direction: TransferType,
) -> Result<RequestPayload, PayloadError> {
    let country = selection
        .country
        .as_ref()
        .ok_or(PayloadError::MissingCountry)?;
    let rule = CountryRule::for_code(&country.country_code);
    let institution = selection.institution.as_ref();
    let recipient_optional = rule.is_bank_only() && direction == TransferType::TransferIn;
    if institution.is_none() && !recipient_optional {
        return Err(PayloadError::MissingInstitution);
    }
    let identity = kyc
        .and_then(KycRecord::verified_identity)
        .ok_or(PayloadError::MissingKyc)?;

    let (id_type, sub_type) = match rule.document_overrides {
        Some(overrides) => (
            overrides.id_type.to_string(),
            overrides.sub_type.to_string(),
        ),
        None => (
            normalize_document_type(&identity.document_type).to_string(),
            identity.document_sub_type.clone(),
        ),
    };

    let account_number = selection.account_number.clone();
    let mut user_details = UserDetails {
        name: identity.full_name.clone(),
        country: country.country_code.clone(),
        address: identity
            .nationality
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| country.name.clone()),
        phone: account_number.clone(),
        dob: identity.date_of_birth.clone(),
        id_number: identity.document_number.clone(),
        id_type: id_type.clone(),
        additional_id_type: id_type,
        additional_id_number: sub_type,
    };

    let bank_details = || BankDetails {
        code: institution.map(|i| i.code.clone()).unwrap_or_default(),
        account_number: account_number.clone(),
        account_name: account_name(selection, identity),
    };

    let (recipient, operator) = match (rule.payload_shape, selection.payment_method) {
        (PayloadShape::Bank, Some(PaymentMethod::Bank)) if institution.is_some() => {
            user_details.phone = identity.phone_number.clone();
            (
                Recipient::Bank {
                    bank: bank_details(),
                },
                "bank".to_string(),
            )
        }
        (PayloadShape::Bank, _) => (
            Recipient::Bank {
                bank: BankDetails::default(),
            },
            "bank".to_string(),
        ),
        (PayloadShape::InstitutionOperator, method) => {
            let operator = institution
                .map(|i| i.name.to_lowercase())
                .ok_or(PayloadError::MissingInstitution)?;
            let recipient = match method {
                Some(PaymentMethod::Bank) => Recipient::Bank {
                    bank: bank_details(),
                },
                Some(PaymentMethod::Momo) | None => Recipient::Mobile {
                    phone: international_phone(&country.phone_code, &account_number),
                },
            };
            (recipient, operator)
        }
    };

    Ok(RequestPayload {
        recipient,
        operator,
        quote_id: None,
        user_details,
    })
}

/// Builds the quote request for the current selection and entered crypto amount.
pub fn build_quote_request(
    selection: &SessionSelection,
    crypto_amount: &str,
    default_asset: &str,
) -> Result<QuoteRequest, PayloadError> {
    let country = selection
        .country
        .as_ref()
        .ok_or(PayloadError::MissingCountry)?;
    let network = selection
        .network
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(PayloadError::MissingNetwork)?;
    let address = selection
        .effective_address()
        .ok_or(PayloadError::MissingWalletAddress)?;

    Ok(QuoteRequest {
        address: address.to_string(),
        country: country.country_code.clone(),
        crypto_amount: crypto_amount.to_string(),
        crypto_type: selection
            .asset
            .clone()
            .unwrap_or_else(|| default_asset.to_string()),
        fiat_type: country.currency.clone(),
        network: network.to_lowercase(),
    })
}
