//! The two physical primitives every connection is built from: a reusable
//! receive buffer that assembles one Event-Stream frame at a time, and a
//! mutex-guarded send half so concurrent responses and stream events never
//! interleave their bytes.

use crate::error::CoreBusError;
use std::io::{Read, Write};
use std::sync::Mutex;

const INITIAL_CAPACITY: usize = 4096;

/// Reads whole frames off a byte stream. Bounds the claimed `total_len`
/// against `max_len` before reading the rest of the frame, so an attacker
/// that announces an oversize frame never causes an unbounded read.
pub struct RecvBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl Default for RecvBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecvBuffer {
    pub fn new() -> Self {
        RecvBuffer {
            buf: vec![0u8; INITIAL_CAPACITY],
            filled: 0,
        }
    }

    /// Read the next frame. `Ok(None)` means the peer closed the connection
    /// cleanly at a frame boundary.
    pub fn read_frame(
        &mut self,
        stream: &mut impl Read,
        max_len: usize,
    ) -> Result<Option<Vec<u8>>, CoreBusError> {
        const PRELUDE_LEN: usize = 12;
        if !self.fill_at_least(stream, PRELUDE_LEN)? {
            return Ok(None);
        }

        let total_len = u32::from_be_bytes(self.buf[0..4].try_into().unwrap()) as usize;
        if total_len > max_len {
            return Err(CoreBusError::OversizeFrame);
        }

        if !self.fill_at_least(stream, total_len)? {
            // We had the prelude but the peer vanished before the rest of
            // the frame arrived — a truncated frame, not a clean close.
            return Err(CoreBusError::Framing(
                gg_eventstream::EventStreamError::Truncated,
            ));
        }

        let frame = self.buf[..total_len].to_vec();
        self.buf.drain(0..total_len);
        self.filled -= total_len;
        Ok(Some(frame))
    }

    /// Reads until at least `want` bytes are buffered. Returns `Ok(false)`
    /// only for a clean EOF with zero bytes read so far (a frame boundary);
    /// an EOF after partial bytes is a genuine `Truncated` condition and is
    /// surfaced to the caller as `Ok(true)` not being reached (caller must
    /// check `filled >= want` itself is implied by returning `Ok(true)`).
    fn fill_at_least(&mut self, stream: &mut impl Read, want: usize) -> Result<bool, CoreBusError> {
        if self.buf.len() < want {
            self.buf.resize(want.max(self.buf.len() * 2), 0);
        }
        while self.filled < want {
            let read = stream.read(&mut self.buf[self.filled..])?;
            if read == 0 {
                return Ok(self.filled >= want);
            }
            self.filled += read;
        }
        Ok(true)
    }
}

/// A mutex-guarded writer. Any thread holding a clone of this handle may
/// send a frame; the lock guarantees one frame's bytes are never split by
/// another thread's frame.
pub struct SendHalf<W> {
    writer: Mutex<W>,
}

impl<W: Write> SendHalf<W> {
    pub fn new(writer: W) -> Self {
        SendHalf {
            writer: Mutex::new(writer),
        }
    }

    pub fn send(&self, frame: &[u8]) -> Result<(), CoreBusError> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        match writer.write_all(frame) {
            Ok(()) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                Err(CoreBusError::Timeout)
            }
            Err(e) => Err(CoreBusError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_exactly_one_frame_per_call() {
        let headers = [gg_eventstream::Header::new(
            ":message-type",
            gg_eventstream::HeaderValue::String("request"),
        )];
        let mut buf = [0u8; 128];
        let len = gg_eventstream::encode(&headers, b"hi", &mut buf).unwrap();
        let mut two_frames = buf[..len].to_vec();
        two_frames.extend_from_slice(&buf[..len]);

        let mut cursor = Cursor::new(two_frames);
        let mut recv = RecvBuffer::new();
        let first = recv.read_frame(&mut cursor, 10_000).unwrap().unwrap();
        assert_eq!(first.len(), len);
        let second = recv.read_frame(&mut cursor, 10_000).unwrap().unwrap();
        assert_eq!(second.len(), len);
        assert!(recv.read_frame(&mut cursor, 10_000).unwrap().is_none());
    }

    #[test]
    fn oversize_frame_is_rejected_before_reading_body() {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&20_000u32.to_be_bytes());
        let mut cursor = Cursor::new(buf.to_vec());
        let mut recv = RecvBuffer::new();
        assert!(matches!(
            recv.read_frame(&mut cursor, 10_000),
            Err(CoreBusError::OversizeFrame)
        ));
    }
}
