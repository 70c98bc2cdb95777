//! Stream framing
//!
//! Each frame on a TCP stream is a 4 byte big-endian length followed by
//! that many bytes. The first frame a client sends is its identity.

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{RelayError, Result};

/// Frame header size: 4 byte length
pub const FRAME_HEADER_SIZE: usize = 4;

const READ_CHUNK: usize = 4096;

/// Result of polling a stream for the next frame
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Frame(Bytes),
    /// No complete frame before the read timeout
    Idle,
    /// Peer closed the stream
    Closed,
}

/// Incremental frame reader
///
/// Tolerates read timeouts in the middle of a frame: partial input stays
/// buffered until the rest arrives.
pub(crate) struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame_size: usize,
}

impl<R: Read> FrameReader<R> {
    pub(crate) fn new(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            max_frame_size,
        }
    }

    pub(crate) fn poll_frame(&mut self) -> Result<ReadOutcome> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.split_frame()? {
                return Ok(ReadOutcome::Frame(frame));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(ReadOutcome::Idle)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::UnexpectedEof
                    ) =>
                {
                    return Ok(ReadOutcome::Closed)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn split_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len > self.max_frame_size {
            return Err(RelayError::Network(format!(
                "Frame too large: {} bytes (max {})",
                len, self.max_frame_size
            )));
        }

        if self.buf.len() < FRAME_HEADER_SIZE + len {
            return Ok(None);
        }

        self.buf.advance(FRAME_HEADER_SIZE);
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}

/// Write one frame and flush
pub(crate) fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    let len = u32::try_from(frame.len())
        .map_err(|_| RelayError::Network(format!("Frame too large: {} bytes", frame.len())))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}
