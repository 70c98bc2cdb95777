//! Network Module
//!
//! Server loop and client built on the transport sessions.
//!
//! ## Architecture
//! - `Server`: single polling thread, dispatches requests in arrival order
//! - `Client`: command submission from the caller's thread
//! - `ResponseListener`: background thread rendering replies

mod server;
mod client;
mod listener;

pub use server::Server;
pub use client::{generate_identity, parse_command_line, Client};
pub use listener::{Reply, ResponseListener};
