//! Authentication: token exchanges, request decoration, capability gating

pub mod authenticator;
pub mod coordinator;
pub mod gate;
pub mod ports;

pub use authenticator::RequestAuthenticator;
pub use coordinator::{AuthCoordinator, RefreshOutcome};
pub use gate::{CapabilityGate, GateRejection};
