//! Logging and tracing setup for the orchestration pipeline.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup with multiple output formats
//! - A correlation-id context threaded through one work item's path across
//!   ingress, the Session Queue, the Run Dispatcher, and the Effect Outbox
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), switchyard_telemetry::TelemetryError> {
//! let config = LogConfig::new("info").with_format(LogFormat::Json);
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("ingress").with_operation("route_webhook");
//! let _guard = ctx.span().entered();
//! tracing::info!("routing webhook");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{setup_default_logging, setup_logging, LogConfig, LogFormat};
