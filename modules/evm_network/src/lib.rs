// === MODULE DEFINITION ===
pub mod module;
pub use module::{Connection, EvmNetwork};

pub mod config;
pub mod errors;
pub mod events;

pub use errors::EvmError;
pub use events::{EvmEvent, EvmEventKind};
