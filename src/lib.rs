//! # RelayKV
//!
//! A minimal distributed key-value service:
//! - In-memory store owned by a single server thread
//! - Custom binary wire protocol (envelope + length-prefixed fields)
//! - Identity-addressed transport: one server endpoint, many clients
//! - Strict request/reply; every request gets exactly one answer
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │   Client A   │   │   Client B   │      Client: submit + ResponseListener
//! │ (identity A) │   │ (identity B) │
//! └──────┬───────┘   └──────┬───────┘
//!        │ frames           │ frames
//! ┌──────▼──────────────────▼───────┐
//! │          ServerSession          │      (identity, payload) in,
//! │     routes replies by identity  │      payload out to identity
//! └────────────────┬────────────────┘
//!                  │
//! ┌────────────────▼────────────────┐
//! │     Codec → Dispatcher → Codec  │      one request at a time
//! └────────────────┬────────────────┘
//!                  │
//!           ┌──────▼──────┐
//!           │    Store    │
//!           │  (HashMap)  │
//!           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod store;
pub mod dispatcher;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RelayError, Result};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RelayKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
