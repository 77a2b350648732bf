//! E2E tests for fsa-daemon.
//!
//! Each scenario binds a real service on `127.0.0.1:0` and talks to it
//! over raw TCP, so status lines, headers and bodies are checked exactly
//! as a client sees them.
//!
//! # Test Structure
//!
//! - `helpers/` -- config builder, raw HTTP client, scan task doubles
//! - `scenarios/` -- test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p fsa-daemon --test e2e
//! ```

mod helpers;
mod scenarios;
