pub mod http;
pub mod mock;
pub mod noop;
pub mod variant;

pub use http::HttpAnchorClient;
pub use mock::MockAnchorNetwork;
pub use noop::NoopAnchorNetwork;
pub use variant::AnchorNetworkVariant;
