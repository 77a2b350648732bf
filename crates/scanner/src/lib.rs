#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScannerError`)
//! - [`config`]: Scanner configuration (`ScannerConfig`, builder)
//! - [`checkout`]: Per-scan temporary checkout directory (`Checkout`)
//! - [`fetch`]: Source retrieval (`SourceFetcher` trait, `CommandFetcher`)
//! - [`walker`]: Glob filtering and lazy tree walking (`FileFilter`, `SourceWalker`)
//! - [`resolver`]: Dependency resolvers (`DependencyResolver` trait, `ResolverSet`)
//! - [`task`]: Default scan task (`DependencyScanTask`, `ScanTask` impl)
//!
//! # Architecture
//!
//! ```text
//! ScanRequest --> Checkout + SourceFetcher (scm only)
//!                         |
//!                   SourceWalker --> FileFilter
//!                         |
//!              project roots (one per directory)
//!                         |
//!                   ResolverSet --> Vec<ProjectDescriptor>
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod fetch;
pub mod resolver;
pub mod task;
pub mod walker;

// --- Public API Re-exports ---

// Scan task
pub use task::DependencyScanTask;

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::ScannerError;

// Source retrieval
pub use checkout::Checkout;
pub use fetch::{CommandFetcher, SourceFetcher};

// Walking
pub use walker::{FileFilter, SourceWalker, WalkedFile};

// Resolvers
pub use resolver::archive::ArchiveFingerprinter;
pub use resolver::cargo::CargoLockResolver;
pub use resolver::npm::NpmLockResolver;
pub use resolver::{DependencyResolver, Ecosystem, ResolverSet};
