//! Domain layer: value types, pure rules and the ports the application layer
//! talks through. Nothing in here performs I/O.

pub mod amount;
pub mod country;
pub mod kyc;
pub mod payload;
pub mod ports;
pub mod quote;
pub mod selection;
