//! Fiat/crypto on- and off-ramp orchestration.
//!
//! The crate follows a hexagonal layout: `domain` holds value types, pure
//! rules and backend ports; `application` owns the session state and the
//! components that drive a payment; `infrastructure` provides port adapters;
//! `interfaces` translates scenario files and timelines.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
