//! Arena core
//!
//! Types shared by the match runner and the tournament crate:
//! - identifiers, game modes and time controls
//! - match outcomes and the events handed to the transport
//! - the error taxonomy
//! - contracts for the external collaborators (persistence, broadcast,
//!   rating lookup) plus in-memory implementations
//! - TOML configuration

pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod ids;
pub mod memory;
pub mod mode;
pub mod outcome;

pub use config::*;
pub use error::*;
pub use event::*;
pub use gateway::*;
pub use ids::*;
pub use memory::{MemoryGateway, RecordingBroadcaster};
pub use mode::*;
pub use outcome::*;

pub use chess_core::Color;
