use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Unverified,
    InReview,
    Rejected,
    Verified,
}

/// Identity fields collected during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullKyc {
    pub full_name: String,
    #[serde(default)]
    pub nationality: Option<String>,
    pub date_of_birth: String,
    pub document_number: String,
    pub document_type: String,
    #[serde(default)]
    pub document_sub_type: String,
    #[serde(default)]
    pub phone_number: String,
}

/// KYC state for one wallet address, as returned by the KYC backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRecord {
    pub kyc_status: KycStatus,
    #[serde(default)]
    pub full_kyc: Option<FullKyc>,
    #[serde(default)]
    pub verification_link: Option<String>,
}

impl KycRecord {
    /// The identity fields, only when the record is verified.
    pub fn verified_identity(&self) -> Option<&FullKyc> {
        match self.kyc_status {
            KycStatus::Verified => self.full_kyc.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateResult {
    Pass,
    #[default]
    BlockedUnverified,
    BlockedReview,
    BlockedRejected,
}

impl GateResult {
    pub fn is_pass(&self) -> bool {
        *self == GateResult::Pass
    }
}

/// Decides whether the holder of `record` may move funds.
///
/// A missing record is treated the same as an unverified one.
pub fn check_gate(record: Option<&KycRecord>) -> GateResult {
    match record.map(|r| r.kyc_status) {
        Some(KycStatus::Verified) => GateResult::Pass,
        Some(KycStatus::InReview) => GateResult::BlockedReview,
        Some(KycStatus::Rejected) => GateResult::BlockedRejected,
        Some(KycStatus::Unverified) | None => GateResult::BlockedUnverified,
    }
}
