//! Client session
//!
//! A single connection to the server that announces the client's identity
//! as its first frame.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};

use super::frame::{self, FrameReader, ReadOutcome};
use super::{prepare_stream, write_loop, Context, Identity, StopSignal};
use crate::error::{RelayError, Result};

/// Client side of the transport
///
/// `send` and `try_receive` may be called from different threads.
pub struct ClientSession {
    identity: Identity,
    peer_addr: SocketAddr,
    outbound: Sender<Bytes>,
    inbound: Receiver<Bytes>,
    stop: StopSignal,
}

impl ClientSession {
    /// Connect to `addr` presenting `identity`
    ///
    /// Fails with `InvalidIdentity` for an empty identity and with `Startup`
    /// when the server cannot be reached.
    pub fn connect(ctx: &Context, identity: impl Into<Identity>, addr: &str) -> Result<Self> {
        let identity = identity.into();
        if identity.is_empty() {
            return Err(RelayError::InvalidIdentity);
        }

        let startup = |source| RelayError::Startup {
            addr: addr.to_string(),
            source,
        };
        let mut stream = TcpStream::connect(addr).map_err(startup)?;
        prepare_stream(&stream).map_err(startup)?;
        let peer_addr = stream.peer_addr().map_err(startup)?;

        frame::write_frame(&mut stream, &identity)?;

        let shared = ctx.shared();
        let stop = StopSignal::new(Arc::clone(&shared));
        let label = String::from_utf8_lossy(&identity).into_owned();

        let (outbound, outbound_rx) = channel::unbounded();
        let write_stream = stream.try_clone()?;
        let writer_stop = stop.clone();
        let writer_label = label.clone();
        shared.spawn(format!("relaykv-writer-{}", label), move || {
            write_loop(write_stream, outbound_rx, writer_stop, writer_label)
        })?;

        let (inbound_tx, inbound) = channel::unbounded();
        let reader = FrameReader::new(stream, shared.max_frame_size());
        let reader_stop = stop.clone();
        shared.spawn(format!("relaykv-reader-{}", label), move || {
            read_loop(reader, inbound_tx, reader_stop, peer_addr)
        })?;

        tracing::info!("{} connected to {}", label, peer_addr);

        Ok(Self {
            identity,
            peer_addr,
            outbound,
            inbound,
            stop,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queue `payload` for the server
    ///
    /// Never blocks. If the connection is gone the message is dropped.
    pub fn send(&self, payload: Bytes) {
        if self.outbound.send(payload).is_err() {
            tracing::debug!("Connection to {} is closed, message dropped", self.peer_addr);
        }
    }

    /// Next inbound payload, if one is waiting
    pub fn try_receive(&self) -> Option<Bytes> {
        self.inbound.try_recv().ok()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.stop.raise();
    }
}

fn read_loop(
    mut reader: FrameReader<TcpStream>,
    inbound: Sender<Bytes>,
    stop: StopSignal,
    peer_addr: SocketAddr,
) {
    while !stop.is_set() {
        match reader.poll_frame() {
            Ok(ReadOutcome::Frame(payload)) => {
                if payload.is_empty() {
                    continue;
                }
                if inbound.send(payload).is_err() {
                    return;
                }
            }
            Ok(ReadOutcome::Idle) => continue,
            Ok(ReadOutcome::Closed) => {
                tracing::warn!("Server {} closed the connection", peer_addr);
                return;
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", peer_addr, e);
                return;
            }
        }
    }
}
