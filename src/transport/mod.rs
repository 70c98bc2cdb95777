//! Transport Module
//!
//! Identity-addressed messaging over TCP.
//!
//! ## Architecture
//! - One `Context` per process owns every I/O thread
//! - `ServerSession`: single bound endpoint, many clients, replies routed
//!   by the identity each client presented when it connected
//! - `ClientSession`: one connection carrying a fixed identity
//! - Per connection: one reader thread and one writer thread, joined to the
//!   session through crossbeam channels so `send` and `try_receive` never block
//!
//! Delivery is best-effort. Nothing is acknowledged or retried; a message for
//! an unreachable peer is dropped.

mod context;
mod frame;
mod server;
mod client;

pub use context::Context;
pub use frame::FRAME_HEADER_SIZE;
pub use server::ServerSession;
pub use client::ClientSession;

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{Receiver, RecvTimeoutError};

use context::Shared;

/// Opaque client address token
pub type Identity = Bytes;

/// How long an I/O thread blocks before re-checking its stop flags
pub(crate) const IO_TICK: Duration = Duration::from_millis(20);

/// Stop condition for the I/O threads of one session
#[derive(Clone)]
pub(crate) struct StopSignal {
    context: Arc<Shared>,
    session: Arc<AtomicBool>,
}

impl StopSignal {
    fn new(context: Arc<Shared>) -> Self {
        Self {
            context,
            session: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_set(&self) -> bool {
        self.session.load(Ordering::Acquire) || self.context.is_terminated()
    }

    /// Stop this session only
    fn raise(&self) {
        self.session.store(true, Ordering::Release);
    }
}

/// Configure a connected stream for the reader/writer thread pair
fn prepare_stream(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(IO_TICK))?;
    Ok(())
}

/// Drain outgoing frames onto the stream until the channel closes,
/// a write fails, or the session stops
fn write_loop(mut stream: TcpStream, outbound: Receiver<Bytes>, stop: StopSignal, peer: String) {
    while !stop.is_set() {
        match outbound.recv_timeout(IO_TICK) {
            Ok(frame) => {
                if let Err(e) = frame::write_frame(&mut stream, &frame) {
                    tracing::debug!("Write to {} failed, dropping connection: {}", peer, e);
                    break;
                }
                tracing::trace!("Wrote {} byte frame to {}", frame.len(), peer);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}
