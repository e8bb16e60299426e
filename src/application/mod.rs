//! Application layer: the session store and the components that act on it.
//!
//! Every component receives only the store view for the fields it owns
//! (rate for the converter, KYC for the identity gate, lifecycle for the
//! orchestrator and poller) plus a read-only [`session::SessionReader`].
//! [`ramp::RampSession`] wires them together for one user session.

pub mod converter;
pub mod gate;
pub mod orchestrator;
pub mod poller;
pub mod prefetch;
pub mod ramp;
pub mod retry;
pub mod session;
