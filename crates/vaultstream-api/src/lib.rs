//! VaultStream API
//!
//! The HTTP surface of the service: upload intake, the access gate, and
//! the token-guarded HLS delivery path.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod hls;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod token;
