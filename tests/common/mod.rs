#![allow(dead_code)]

use ramp_orchestrator::application::ramp::{Backends, RampSession};
use ramp_orchestrator::config::EngineConfig;
use ramp_orchestrator::domain::country::{AccountNumberLength, Bounds, Country};
use ramp_orchestrator::domain::kyc::{FullKyc, KycRecord, KycStatus};
use ramp_orchestrator::domain::selection::Institution;
use ramp_orchestrator::infrastructure::in_memory::InMemoryBackend;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const WALLET: &str = "0x1111111111111111111111111111111111111111";

pub fn kenya() -> Country {
    Country {
        country_code: "KE".to_string(),
        name: "Kenya".to_string(),
        currency: "KES".to_string(),
        phone_code: "+254".to_string(),
        crypto_min_max: Bounds::new(dec!(10), dec!(2000)),
        account_number_length: Some(AccountNumberLength {
            bank_length: 10,
            mobile_length: 9,
        }),
    }
}

pub fn nigeria() -> Country {
    Country {
        country_code: "NG".to_string(),
        name: "Nigeria".to_string(),
        currency: "NGN".to_string(),
        phone_code: "+234".to_string(),
        crypto_min_max: Bounds::new(dec!(5), dec!(5000)),
        account_number_length: Some(AccountNumberLength {
            bank_length: 10,
            mobile_length: 10,
        }),
    }
}

pub fn mpesa() -> Institution {
    Institution {
        name: "M-Pesa".to_string(),
        code: "MPESA".to_string(),
        r#type: Some("MOBILE_MONEY".to_string()),
        account_number_type: None,
    }
}

pub fn access_bank() -> Institution {
    Institution {
        name: "Access Bank".to_string(),
        code: "044".to_string(),
        r#type: Some("bank".to_string()),
        account_number_type: None,
    }
}

pub fn kyc(status: KycStatus) -> KycRecord {
    KycRecord {
        kyc_status: status,
        full_kyc: Some(FullKyc {
            full_name: "Amina Njeri".to_string(),
            nationality: Some("Kenyan".to_string()),
            date_of_birth: "1992-04-12".to_string(),
            document_number: "A1234567".to_string(),
            document_type: "ID".to_string(),
            document_sub_type: "NATIONAL_ID".to_string(),
            phone_number: "+254700000001".to_string(),
        }),
        verification_link: Some("https://kyc.example/continue".to_string()),
    }
}

pub fn session(backend: &Arc<InMemoryBackend>) -> RampSession {
    RampSession::new(EngineConfig::default(), Backends::shared(backend.clone()))
}

/// A Kenyan mobile-money sell of 100 USDC, ready to submit.
pub async fn kenyan_sell(backend: &Arc<InMemoryBackend>, status: KycStatus) -> RampSession {
    backend.set_rate("KE", dec!(129.5)).await;
    backend.set_kyc(WALLET, kyc(status)).await;
    let session = session(backend);
    session.connect_wallet(WALLET).await.unwrap();
    session.select_country(kenya()).await.unwrap();
    session.select_institution(mpesa()).await.unwrap();
    session.set_account_number("0712345678").await;
    session.select_asset("USDC", "Base").await;
    session.enter_amount("100").await;
    session
}
