pub mod presence;
pub mod relay;
pub mod session;
pub mod signaling;
pub mod state;
