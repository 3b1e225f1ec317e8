//! vconf HTTP Server
//!
//! Reads and incrementally updates Vector pipeline configs held in a
//! versioned record store.
//!
//! # Layers
//!
//! - [`wire`]: JSON request and response shapes
//! - [`ConfigService`]: fetch and the optimistic update loop
//! - [`routes()`]: warp filters mapping HTTP onto the service
//! - [`Settings`]: layered server settings
//!
//! Every failure surfaces as one [`ApiError`] variant rendered as
//! `{"error": "..."}` with status 400 (caller input) or 500 (everything else).

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod settings;
pub mod telemetry;
pub mod wire;

pub use error::{ApiError, ErrorBody};
pub use handlers::{ConfigService, RequestContext};
pub use routes::routes;
pub use settings::{SeedRecord, Settings, SettingsError, StoreSettings};
pub use telemetry::LogFormat;
pub use wire::{ConfigResponse, FetchRequest, UpdateRequest};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
