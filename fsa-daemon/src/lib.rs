#![doc = include_str!("../README.md")]
//!
//! # Modules
//!
//! - [`cli`]: command-line arguments
//! - [`executor`]: bounded scan executor with per-scan timeout
//! - [`handler`]: request body to result envelope
//! - [`listener`]: connection-limited TCP listener
//! - [`logging`]: tracing subscriber setup
//! - [`metrics_server`]: Prometheus recorder installation
//! - [`server`]: HTTP routes and status mapping
//! - [`service`]: assembly and lifecycle

pub mod cli;
pub mod executor;
pub mod handler;
pub mod listener;
pub mod logging;
pub mod metrics_server;
pub mod server;
pub mod service;

pub use executor::{ExecutorError, ScanExecutor, ScanHandle};
pub use handler::{AnalyzeReply, RequestHandler};
pub use listener::LimitedListener;
pub use server::WELCOME_MESSAGE;
pub use service::FsaService;
