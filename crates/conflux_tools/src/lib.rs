//! Tools for conflux generation requests.
//!
//! This crate provides the pieces a caller needs to let a model call
//! functions mid-generation: tool definitions with JSON schemas, executors,
//! and a per-request [`ToolSet`] that validates arguments before dispatch.
//!
//! # Quick Start
//!
//! ```
//! use conflux_tools::{FunctionTool, ToolError, ToolSet};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, schemars::JsonSchema)]
//! struct Forecast {
//!     /// City name.
//!     city: String,
//! }
//!
//! let tools = ToolSet::new().with(FunctionTool::typed(
//!     "forecast",
//!     "Weather forecast for a city.",
//!     |args: Forecast| async move { Ok::<_, ToolError>(format!("sunny in {}", args.city)) },
//! ));
//!
//! assert_eq!(tools.names(), vec!["forecast"]);
//! ```
//!
//! # Architecture
//!
//! - [`Tool`]: trait for executable tools with JSON schema
//! - [`FunctionTool`]: closure-backed tool
//! - [`ToolSet`]: stores, validates and dispatches tools
//! - [`ToolArguments`]: typed access to call arguments
//! - [`FunctionMetadata`] / [`ParameterInfo`]: schema building

pub mod error;
pub mod param;
pub mod schema;
pub mod tool;
pub mod toolset;

pub use error::ToolError;
pub use param::ToolArguments;
pub use schema::{FunctionMetadata, ParameterInfo};
pub use tool::{FunctionTool, Tool};
pub use toolset::ToolSet;
