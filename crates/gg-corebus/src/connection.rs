//! The server-side connection state machine:
//! `Closed → Open → (first request) → Authenticated → Open* → Closed`.
//!
//! One OS thread owns one connection end to end: it is simultaneously the
//! single reader and the thread a blocking handler body runs on. The
//! per-connection send lock (`SendHalf`) is what lets a handler's
//! background stream-pusher thread and this reader thread write to the
//! same socket without interleaving bytes.

use crate::error::{CoreBusError, ErrorKind};
use crate::frame::{build_frame, parse_frame, MessageType, ParsedFrame, AUTH_METHOD};
use crate::method::{HandlerContext, MethodTable};
use crate::response::ResponseHandle;
use crate::transport::{RecvBuffer, SendHalf};
use gg_eventstream::decode_object;
use gg_ipc_auth::{PeerCredentials, ProcessContext, Svcuid};
use gg_object::Arena;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

enum ConnState {
    Open,
    Authenticated { handle: u16 },
}

/// Runs until the peer disconnects or a protocol violation forces
/// teardown. The `Err` return is purely diagnostic for the accept loop's
/// logging — by the time this returns, the socket is always already
/// closed (directly, or because the peer closed it first).
pub(crate) fn handle_connection(
    stream: UnixStream,
    methods: &MethodTable,
    ctx: &ProcessContext,
    max_msg_len: usize,
    send_timeout: Duration,
) -> Result<(), CoreBusError> {
    let peer_cred = stream.peer_cred()?;
    let peer = PeerCredentials {
        pid: peer_cred.pid.unwrap_or(0) as u32,
        uid: peer_cred.uid,
    };

    stream.set_write_timeout(Some(send_timeout))?;
    let send = Arc::new(SendHalf::new(stream.try_clone()?));
    let shutdown_handle = stream.try_clone()?;
    let mut reader = stream;
    let mut recv = RecvBuffer::new();
    let mut state = ConnState::Open;

    loop {
        let frame_bytes = match recv.read_frame(&mut reader, max_msg_len) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(()),
            Err(e) => {
                let _ = shutdown_handle.shutdown(Shutdown::Both);
                return Err(e);
            }
        };

        let parsed = match parse_frame(&frame_bytes) {
            Ok(p) => p,
            Err(e) => {
                let _ = shutdown_handle.shutdown(Shutdown::Both);
                return Err(e);
            }
        };

        if parsed.message_type != MessageType::Request {
            let _ = shutdown_handle.shutdown(Shutdown::Both);
            return Err(CoreBusError::MalformedRequest);
        }

        state = match state {
            ConnState::Open => {
                match authenticate(&parsed, ctx, &send) {
                    Ok(handle) => ConnState::Authenticated { handle },
                    Err(e) => {
                        let _ = shutdown_handle.shutdown(Shutdown::Both);
                        return Err(e);
                    }
                }
            }
            ConnState::Authenticated { handle } => {
                if let Err(e) = dispatch(
                    &parsed,
                    handle,
                    &peer,
                    ctx,
                    methods,
                    &send,
                    &shutdown_handle,
                    max_msg_len,
                ) {
                    let _ = shutdown_handle.shutdown(Shutdown::Both);
                    return Err(e);
                }
                ConnState::Authenticated { handle }
            }
        };
    }
}

/// The zero-argument "get auth" exchange: the first request on a
/// connection must name `AUTH_METHOD` and carry a `:svcuid` header. A
/// connection that sends anything else first, or an unrecognised svcuid,
/// is rejected with `NotAuthenticated` and closed.
fn authenticate(
    parsed: &ParsedFrame,
    ctx: &ProcessContext,
    send: &Arc<SendHalf<UnixStream>>,
) -> Result<u16, CoreBusError> {
    if parsed.method.as_deref() != Some(AUTH_METHOD) {
        send_error(send, parsed.correlation_id, ErrorKind::NotAuthenticated, None)?;
        return Err(CoreBusError::NotAuthenticated);
    }
    let Some(svcuid_bytes) = parsed.svcuid else {
        send_error(
            send,
            parsed.correlation_id,
            ErrorKind::NotAuthenticated,
            Some("missing :svcuid header"),
        )?;
        return Err(CoreBusError::NotAuthenticated);
    };

    let svcuid = Svcuid::from_bytes(svcuid_bytes);
    match ctx.lookup_handle(&svcuid) {
        Ok(handle) => {
            let name = ctx.name_of(handle).unwrap_or(&[]);
            let arena = Arena::new(256 + name.len());
            let entries = arena
                .alloc_slice_copy(&[(
                    gg_object::Buffer::from("component_name"),
                    gg_object::Object::Buf(gg_object::Buffer::new(name)),
                )])
                .map_err(gg_eventstream::EventStreamError::from)?;
            let response = gg_object::Object::Map(entries);
            send_response(send, parsed.correlation_id, &response)?;
            Ok(handle)
        }
        Err(_) => {
            send_error(
                send,
                parsed.correlation_id,
                ErrorKind::NotAuthenticated,
                Some("svcuid not recognised"),
            )?;
            Err(CoreBusError::NotAuthenticated)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch(
    parsed: &ParsedFrame,
    handle: u16,
    peer: &PeerCredentials,
    ctx: &ProcessContext,
    methods: &MethodTable,
    send: &Arc<SendHalf<UnixStream>>,
    shutdown_handle: &UnixStream,
    max_msg_len: usize,
) -> Result<(), CoreBusError> {
    // A request's :method header is mandatory (enforced by parse_frame);
    // the unwrap below can never panic.
    let method_name = parsed.method.as_deref().expect("request carries :method");

    let arena = Arena::new((parsed.payload.len() * 4).max(max_msg_len));
    let object = match decode_object(&parsed.payload, &arena) {
        Ok((obj, _consumed)) => obj,
        Err(_) => return Err(CoreBusError::MalformedRequest),
    };
    if object.as_map().is_none() {
        return Err(CoreBusError::MalformedRequest);
    }

    let Some(method) = methods.find(method_name) else {
        // Unknown method: not fatal to the connection.
        return send_error(send, parsed.correlation_id, ErrorKind::MethodNotFound, None);
    };

    let hctx = HandlerContext {
        peer_pid: peer.pid,
        peer_uid: peer.uid,
        component_handle: handle,
        component_name: ctx.name_of(handle),
    };

    match &method.handler {
        crate::method::MethodHandler::Notification(f) => {
            // A panicking handler must not take the process down with it;
            // it's treated the same as any other handler-side failure.
            match panic::catch_unwind(AssertUnwindSafe(|| f(&hctx, object))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(method = method_name, error = %e, "notification handler failed");
                }
                Err(_) => tracing::error!(method = method_name, "notification handler panicked"),
            }
            Ok(())
        }
        crate::method::MethodHandler::Call(f) => {
            let response_handle =
                ResponseHandle::new(parsed.correlation_id, Arc::clone(send), shutdown_handle.try_clone()?);
            // If `f` panics before consuming `response_handle`, its `Drop`
            // runs during unwinding and synthesizes the `Internal` error
            // response itself; this boundary only needs to keep the
            // connection's thread alive and log the failure.
            match panic::catch_unwind(AssertUnwindSafe(|| f(&hctx, object, response_handle))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(method = method_name, error = %e, "call handler returned an error");
                }
                Err(_) => tracing::error!(method = method_name, "call handler panicked"),
            }
            Ok(())
        }
    }
}

fn send_response(
    send: &SendHalf<UnixStream>,
    correlation_id: i64,
    obj: &gg_object::Object<'_>,
) -> Result<(), CoreBusError> {
    let payload = crate::frame::encode_payload(obj)?;
    let frame = build_frame(MessageType::Response, correlation_id, None, None, None, None, &payload)?;
    send.send(&frame)
}

fn send_error(
    send: &SendHalf<UnixStream>,
    correlation_id: i64,
    kind: ErrorKind,
    message: Option<&str>,
) -> Result<(), CoreBusError> {
    let frame = build_frame(
        MessageType::Error,
        correlation_id,
        None,
        None,
        Some(kind.as_str()),
        message,
        &[],
    )?;
    send.send(&frame)
}
