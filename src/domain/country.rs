use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl Bounds {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Minimum recipient number length per payment rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumberLength {
    pub bank_length: usize,
    pub mobile_length: usize,
}

/// Country reference data, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub country_code: String,
    pub name: String,
    pub currency: String,
    pub phone_code: String,
    /// Bounds applied to the user-entered crypto amount.
    pub crypto_min_max: Bounds,
    #[serde(default)]
    pub account_number_length: Option<AccountNumberLength>,
}

impl Country {
    pub fn rule(&self) -> CountryRule {
        CountryRule::for_code(&self.country_code)
    }
}

/// How the recipient part of a transfer payload is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Always `operator: "bank"`, whatever institution was picked.
    Bank,
    /// Operator is the selected institution's name, lower-cased.
    InstitutionOperator,
}

/// Identity document fields forced for a country, overriding the generic mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOverrides {
    pub id_type: &'static str,
    pub sub_type: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRule {
    pub payload_shape: PayloadShape,
    pub document_overrides: Option<DocumentOverrides>,
}

const DEFAULT_RULE: CountryRule = CountryRule {
    payload_shape: PayloadShape::InstitutionOperator,
    document_overrides: None,
};

const RULES: &[(&str, CountryRule)] = &[
    (
        "NG",
        CountryRule {
            payload_shape: PayloadShape::Bank,
            document_overrides: Some(DocumentOverrides {
                id_type: "NIN",
                sub_type: "BVN",
            }),
        },
    ),
    (
        "ZA",
        CountryRule {
            payload_shape: PayloadShape::Bank,
            document_overrides: None,
        },
    ),
];

impl CountryRule {
    pub fn for_code(code: &str) -> Self {
        RULES
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, rule)| *rule)
            .unwrap_or(DEFAULT_RULE)
    }

    pub fn is_bank_only(&self) -> bool {
        self.payload_shape == PayloadShape::Bank
    }
}
