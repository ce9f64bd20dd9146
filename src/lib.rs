// Hybrid move-selection core: external UCI engine + learned policy network.
pub mod agents;
pub mod board;
pub mod encoder;
pub mod network;
pub mod session;

pub use board::Position;
pub use session::{GameSession, SessionConfig, SessionError};
