//! Configuration, paths and logging for the auth hydration tools.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, LogFormat, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
