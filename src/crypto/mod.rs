pub mod canonical;
pub mod fingerprint;

pub use canonical::canonical_json;
pub use fingerprint::{fingerprint, webhook_signature};
