//! Server
//!
//! Polls the server session and dispatches requests one at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::store::Store;
use crate::transport::{Context, ServerSession};

/// Key-value server
///
/// ## Concurrency Model
/// A single thread runs `run` (or `poll_once`): at most one request is
/// handled at a time, so the Store is never accessed concurrently. The
/// transport's I/O threads only feed the inbound queue.
pub struct Server {
    config: Config,
    session: ServerSession,
    dispatcher: Dispatcher,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the server session to `config.listen_addr`
    pub fn bind(ctx: &Context, config: Config) -> Result<Self> {
        config.validate()?;
        let session = ServerSession::bind(ctx, &config.listen_addr)?;

        Ok(Self {
            config,
            session,
            dispatcher: Dispatcher::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.session.local_addr()
    }

    /// Flag observed at the top of every loop iteration
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to stop after the current iteration
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Handle at most one inbound request
    ///
    /// Returns true if a message was taken off the transport, whether or not
    /// it decoded. Malformed requests are discarded without a reply.
    pub fn poll_once(&mut self) -> bool {
        let Some((identity, frame)) = self.session.try_receive() else {
            return false;
        };

        match self.dispatcher.handle_frame(&frame) {
            Ok((envelope, reply)) => {
                tracing::debug!(
                    "Replying to request {} from {}",
                    envelope.correlation_id,
                    String::from_utf8_lossy(&identity)
                );
                self.session.send(&identity, reply);
            }
            Err(e) => {
                tracing::debug!(
                    "Discarding malformed request from {}: {}",
                    String::from_utf8_lossy(&identity),
                    e
                );
            }
        }
        true
    }

    /// Run the polling loop until shutdown is signalled
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Server started on {}", self.local_addr());

        while !self.shutdown.load(Ordering::Acquire) {
            if !self.poll_once() {
                thread::sleep(self.config.poll_interval());
            }
        }

        tracing::info!(
            "Server stopping with {} items in store",
            self.dispatcher.store().len()
        );
        Ok(())
    }

    pub fn store(&self) -> &Store {
        self.dispatcher.store()
    }

    pub fn session(&self) -> &ServerSession {
        &self.session
    }
}
