//! Runtime plumbing for conflux processes.
//!
//! - [`RuntimeConfig`]: settings read from `CONFLUX_*` environment variables
//! - [`TracingConfig`]: installs the `tracing` subscriber
//!
//! Library crates never install a subscriber; binaries call
//! [`TracingConfig::init`] once at startup.
//!
//! ```no_run
//! use conflux_core::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env()?;
//! config.tracing().init();
//! # Ok::<(), conflux_core::ConfigError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::RuntimeConfig;
pub use error::ConfigError;
pub use logging::{TracingConfig, TracingFormat};
