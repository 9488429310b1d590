pub mod config;
pub mod logging;
pub mod paths;
pub mod runner;
pub mod signals;

pub use config::*;
pub use logging::*;
pub use signals::*;
