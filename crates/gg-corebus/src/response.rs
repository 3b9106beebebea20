//! `ResponseHandle` and `StreamHandle`: the two capabilities a server
//! handler is given to answer a call. Ownership, not a runtime flag, is
//! what "respond exactly once" compiles down to —
//! `ResponseHandle::respond`/`respond_error`/`sub_accept` all consume
//! `self` by value, so a handler cannot call two of them. A handler that
//! drops the handle without calling any of them is a protocol violation
//! caught by `Drop`, which synthesises the `Internal` error response and
//! tears the connection down itself — scope-bound release, not a manual
//! teardown call threaded through every handler.

use crate::error::{CoreBusError, ErrorKind};
use crate::frame::{build_frame, encode_payload, MessageType};
use crate::transport::SendHalf;
use gg_object::Object;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Arc;

pub struct ResponseHandle {
    correlation_id: i64,
    send: Arc<SendHalf<UnixStream>>,
    shutdown_stream: UnixStream,
    responded: bool,
}

impl ResponseHandle {
    pub(crate) fn new(
        correlation_id: i64,
        send: Arc<SendHalf<UnixStream>>,
        shutdown_stream: UnixStream,
    ) -> Self {
        ResponseHandle {
            correlation_id,
            send,
            shutdown_stream,
            responded: false,
        }
    }

    /// Send a single response and close the correlation.
    pub fn respond(mut self, obj: &Object<'_>) -> Result<(), CoreBusError> {
        self.responded = true;
        let payload = encode_payload(obj)?;
        let frame = build_frame(
            MessageType::Response,
            self.correlation_id,
            None,
            None,
            None,
            None,
            &payload,
        )?;
        self.send.send(&frame)
    }

    /// Send an error response and close the correlation.
    pub fn respond_error(
        mut self,
        kind: ErrorKind,
        message: Option<&str>,
    ) -> Result<(), CoreBusError> {
        self.responded = true;
        let frame = build_frame(
            MessageType::Error,
            self.correlation_id,
            None,
            None,
            Some(kind.as_str()),
            message,
            &[],
        )?;
        self.send.send(&frame)
    }

    /// Upgrade this call to a stream: no reply is sent now, but the
    /// returned handle may send any number of `stream-event` frames
    /// followed by exactly one `stream-close`.
    pub fn sub_accept(mut self) -> StreamHandle {
        self.responded = true;
        StreamHandle {
            correlation_id: self.correlation_id,
            send: Arc::clone(&self.send),
        }
    }
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        if self.responded {
            return;
        }
        self.responded = true;
        tracing::error!(
            correlation_id = self.correlation_id,
            "handler returned without responding or opening a stream; tearing down connection"
        );
        if let Ok(frame) = build_frame(
            MessageType::Error,
            self.correlation_id,
            None,
            None,
            Some(ErrorKind::Internal.as_str()),
            Some("handler invariant violated"),
            &[],
        ) {
            let _ = self.send.send(&frame);
        }
        let _ = self.shutdown_stream.shutdown(Shutdown::Both);
    }
}

/// A live stream opened by `ResponseHandle::sub_accept`. Cloning shares the
/// same underlying connection send lock, so a handler may hand clones to
/// background threads that push events independently of the dispatch loop.
#[derive(Clone)]
pub struct StreamHandle {
    correlation_id: i64,
    send: Arc<SendHalf<UnixStream>>,
}

impl StreamHandle {
    pub fn sub_response(&self, obj: &Object<'_>) -> Result<(), CoreBusError> {
        let payload = encode_payload(obj)?;
        let frame = build_frame(
            MessageType::StreamEvent,
            self.correlation_id,
            None,
            None,
            None,
            None,
            &payload,
        )?;
        self.send.send(&frame)
    }

    /// Terminate the stream. `error` is `None` for a clean `Ok` close.
    pub fn sub_close(&self, error: Option<(ErrorKind, &str)>) -> Result<(), CoreBusError> {
        let (error_code, message) = match error {
            Some((kind, msg)) => (Some(kind.as_str()), Some(msg)),
            None => (None, None),
        };
        let frame = build_frame(
            MessageType::StreamClose,
            self.correlation_id,
            None,
            None,
            error_code,
            message,
            &[],
        )?;
        self.send.send(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream as StdUnixStream;

    fn pair() -> (UnixStream, UnixStream) {
        StdUnixStream::pair().unwrap()
    }

    #[test]
    fn dropping_without_responding_sends_internal_error_and_closes() {
        let (server_side, client_side) = pair();
        let send = Arc::new(SendHalf::new(server_side.try_clone().unwrap()));
        {
            let _handle = ResponseHandle::new(1, send, server_side);
            // dropped without calling respond/respond_error/sub_accept
        }

        let mut recv = crate::transport::RecvBuffer::new();
        let mut reader = client_side;
        let frame = recv.read_frame(&mut reader, 10_000).unwrap().unwrap();
        let parsed = crate::frame::parse_frame(&frame).unwrap();
        assert_eq!(parsed.message_type, MessageType::Error);
        assert_eq!(parsed.error_code.as_deref(), Some(ErrorKind::Internal.as_str()));
    }

    #[test]
    fn respond_marks_handled_and_drop_is_a_no_op() {
        let (server_side, client_side) = pair();
        let send = Arc::new(SendHalf::new(server_side.try_clone().unwrap()));
        let handle = ResponseHandle::new(42, send, server_side);
        handle.respond(&Object::I64(7)).unwrap();

        let mut recv = crate::transport::RecvBuffer::new();
        let mut reader = client_side;
        let frame = recv.read_frame(&mut reader, 10_000).unwrap().unwrap();
        let parsed = crate::frame::parse_frame(&frame).unwrap();
        assert_eq!(parsed.message_type, MessageType::Response);
        assert_eq!(parsed.correlation_id, 42);
    }
}
