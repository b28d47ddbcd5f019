pub mod intake;
pub mod network;
pub mod source;

pub use intake::EventIntake;
pub use network::AnchorNetwork;
pub use source::DocumentSource;
