pub mod http;
pub mod mock;
pub mod noop;
pub mod variant;

pub use http::WebhookIntake;
pub use mock::MockIntake;
pub use noop::NoopIntake;
pub use variant::IntakeVariant;
