#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Storewatch dashboard server wiring.
//!
//! Layout: `config.rs` (environment settings), `host.rs` (mounted page
//! controllers), `server.rs` (axum router and request metrics), `bootstrap.rs`
//! (startup sequence).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Environment-driven configuration.
pub mod config;
/// Application error type.
pub mod error;
/// Page controller host.
pub mod host;
/// HTTP router and listener.
pub mod server;

pub use bootstrap::run_app;
pub use config::DashboardConfig;
pub use error::{AppError, AppResult};
pub use host::{PageHost, RenderedPage};
pub use server::DashboardServer;
