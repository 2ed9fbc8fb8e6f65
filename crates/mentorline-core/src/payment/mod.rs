//! Payment reconciliation against the external payment gateway.
//!
//! The gateway is never called from here. Orders are recorded as pending
//! credits and settled when the client returns with a signed confirmation.

pub mod reconciler;
pub mod signature;

pub use reconciler::{PaymentReconciler, Settlement};
pub use signature::{sign_payment, verify_payment_signature};
