//! Signed CI webhook intake

pub mod intake;
pub mod signature;

pub use intake::WebhookIntake;
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
    WebhookVerifier,
};
