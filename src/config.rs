//! Configuration for RelayKV
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{RelayError, Result};

/// Main configuration shared by the server and the client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// Address the server session binds to (host:port)
    pub listen_addr: String,

    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Address the client session connects to (host:port)
    pub server_addr: String,

    /// Client identity. A random `client_<n>` name is generated when unset.
    pub identity: Option<String>,

    // -------------------------------------------------------------------------
    // Transport Configuration
    // -------------------------------------------------------------------------
    /// Sleep between empty polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Largest frame accepted from a peer before the connection is closed
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:45678".to_string(),
            server_addr: "127.0.0.1:45678".to_string(),
            identity: None,
            poll_interval_ms: 33,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the transport cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(RelayError::Config(
                "max_frame_size must be greater than zero".to_string(),
            ));
        }
        if matches!(self.identity.as_deref(), Some("")) {
            return Err(RelayError::Config("identity must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the address clients connect to
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set a fixed client identity
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.config.identity = Some(identity.into());
        self
    }

    /// Set the poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the maximum frame size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
