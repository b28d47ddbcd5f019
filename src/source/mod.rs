pub mod http;
pub mod mock;
pub mod noop;
pub mod variant;

pub use http::HttpDocumentSource;
pub use mock::MockSource;
pub use noop::NoopSource;
pub use variant::DocumentSourceVariant;
