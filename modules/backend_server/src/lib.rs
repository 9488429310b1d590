// === MODULE DEFINITION ===
pub mod module;
pub use module::BackendServer;

pub mod config;
pub mod errors;
pub mod events;

pub use errors::ServerError;
pub use events::{ServerEvent, ServerEventKind};
