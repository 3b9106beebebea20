//! Core-Bus client: one connection, one reader thread that demultiplexes
//! by correlation id into either a blocking `call` waiter or a
//! `subscribe` callback. Correlation ids are assigned monotonically and
//! wrap modulo 2⁶⁴.

use crate::error::{CoreBusError, ErrorKind};
use crate::frame::{build_frame, encode_payload, parse_frame, MessageType, ParsedFrame, AUTH_METHOD};
use crate::transport::{RecvBuffer, SendHalf};
use gg_eventstream::decode_object;
use gg_object::{Arena, Object};
use std::collections::HashMap;
use std::io;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type EventCallback = dyn for<'a> Fn(Object<'a>) + Send + Sync;
type CloseCallback = dyn FnOnce(Result<(), CoreBusError>) + Send;

struct Subscription {
    on_event: Box<EventCallback>,
    on_close: Box<CloseCallback>,
}

struct Shared {
    waiters: Mutex<HashMap<i64, mpsc::Sender<Result<Vec<u8>, CoreBusError>>>>,
    subs: Mutex<HashMap<i64, Subscription>>,
}

/// A connected client. Dropping it closes the socket and joins the reader
/// thread, failing any still-outstanding `call`s and subscriptions.
pub struct Client {
    send: Arc<SendHalf<UnixStream>>,
    shutdown_stream: UnixStream,
    next_correlation: AtomicU64,
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
    max_msg_len: usize,
}

/// A handle returned by `subscribe`; `close_sub` stops delivering events to
/// its callbacks without affecting the rest of the connection.
pub struct SubHandle {
    correlation_id: i64,
    shared: Arc<Shared>,
}

impl Client {
    /// Connect and perform the zero-argument auth exchange using the
    /// component's bootstrap `SVCUID` environment variable, decoded from
    /// its 32-character hex representation.
    pub fn connect(socket_path: impl AsRef<Path>) -> Result<Self, CoreBusError> {
        let svcuid_hex = std::env::var("SVCUID")
            .map_err(|_| CoreBusError::Internal("SVCUID environment variable not set".into()))?;
        let svcuid = parse_hex_svcuid(&svcuid_hex)
            .ok_or_else(|| CoreBusError::Internal("SVCUID is not 32 hex characters".into()))?;
        Self::connect_with_svcuid(socket_path, svcuid)
    }

    /// Connect using an explicit 16-byte svcuid, bypassing the environment
    /// variable contract — the primitive real component bootstrap is built
    /// on, and the one tests use directly.
    pub fn connect_with_svcuid(
        socket_path: impl AsRef<Path>,
        svcuid: [u8; 16],
    ) -> Result<Self, CoreBusError> {
        Self::connect_with_max_len(socket_path, svcuid, crate::server::DEFAULT_MAX_MSG_LEN)
    }

    pub fn connect_with_max_len(
        socket_path: impl AsRef<Path>,
        svcuid: [u8; 16],
        max_msg_len: usize,
    ) -> Result<Self, CoreBusError> {
        let stream = UnixStream::connect(socket_path)?;
        stream.set_write_timeout(Some(crate::server::SEND_TIMEOUT))?;
        let send = Arc::new(SendHalf::new(stream.try_clone()?));
        let shutdown_stream = stream.try_clone()?;
        let shared = Arc::new(Shared {
            waiters: Mutex::new(HashMap::new()),
            subs: Mutex::new(HashMap::new()),
        });

        let reader_shared = Arc::clone(&shared);
        let reader_stream = stream.try_clone()?;
        let reader = thread::spawn(move || reader_loop(reader_stream, reader_shared, max_msg_len));

        let client = Client {
            send,
            shutdown_stream,
            next_correlation: AtomicU64::new(1),
            shared,
            reader: Some(reader),
            max_msg_len,
        };

        let empty_map = Object::Map(&[]);
        let correlation_id = client.next_id();
        let payload = encode_payload(&empty_map)?;
        let frame = build_frame(
            MessageType::Request,
            correlation_id,
            Some(AUTH_METHOD),
            Some(svcuid),
            None,
            None,
            &payload,
        )?;
        let (tx, rx) = mpsc::channel();
        client.shared.waiters.lock().unwrap().insert(correlation_id, tx);
        client.send.send(&frame)?;
        match rx.recv() {
            Ok(Ok(_payload)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(CoreBusError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "connection closed during authentication",
                )))
            }
        }
        Ok(client)
    }

    fn next_id(&self) -> i64 {
        self.next_correlation.fetch_add(1, Ordering::Relaxed) as i64
    }

    /// Blocking request/response. The response `Object` is decoded into
    /// `arena`, which must outlive the returned value.
    pub fn call<'a>(
        &self,
        method: &str,
        params: &Object<'_>,
        arena: &'a Arena,
    ) -> Result<Object<'a>, CoreBusError> {
        let correlation_id = self.next_id();
        let (tx, rx) = mpsc::channel();
        self.shared.waiters.lock().unwrap().insert(correlation_id, tx);

        let payload = encode_payload(params)?;
        let frame = build_frame(
            MessageType::Request,
            correlation_id,
            Some(method),
            None,
            None,
            None,
            &payload,
        )?;
        if let Err(e) = self.send.send(&frame) {
            self.shared.waiters.lock().unwrap().remove(&correlation_id);
            return Err(e);
        }

        // No per-call deadline at the bus layer: cancellation is
        // socket-scoped. `reader_loop` fails every outstanding waiter
        // once the connection dies, so this never blocks forever on a
        // connection that is actually gone.
        match rx.recv() {
            Ok(Ok(raw_payload)) => {
                // `decode_object` ties its buffer and arena to the same
                // lifetime, so the wire bytes must live in `arena` before
                // decoding — `raw_payload` itself is local to this call and
                // would not outlive the `Object<'a>` this function returns.
                let payload_in_arena = arena.alloc_bytes(&raw_payload)?;
                let (obj, _) = decode_object(payload_in_arena, arena)?;
                Ok(obj)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CoreBusError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection closed while awaiting response",
            ))),
        }
    }

    /// Fire-and-forget: no reply is read for this correlation id.
    pub fn notify(&self, method: &str, params: &Object<'_>) -> Result<(), CoreBusError> {
        let correlation_id = self.next_id();
        let payload = encode_payload(params)?;
        let frame = build_frame(
            MessageType::Request,
            correlation_id,
            Some(method),
            None,
            None,
            None,
            &payload,
        )?;
        self.send.send(&frame)
    }

    /// Open a stream: `on_event` fires for every `stream-event` frame (in
    /// order), `on_close` fires exactly once when the stream ends, whether
    /// by a `stream-close` frame or the connection dying.
    pub fn subscribe(
        &self,
        method: &str,
        params: &Object<'_>,
        on_event: impl for<'a> Fn(Object<'a>) + Send + Sync + 'static,
        on_close: impl FnOnce(Result<(), CoreBusError>) + Send + 'static,
    ) -> Result<SubHandle, CoreBusError> {
        let correlation_id = self.next_id();
        self.shared.subs.lock().unwrap().insert(
            correlation_id,
            Subscription {
                on_event: Box::new(on_event),
                on_close: Box::new(on_close),
            },
        );

        let payload = encode_payload(params)?;
        let frame = build_frame(
            MessageType::Request,
            correlation_id,
            Some(method),
            None,
            None,
            None,
            &payload,
        )?;
        if let Err(e) = self.send.send(&frame) {
            self.shared.subs.lock().unwrap().remove(&correlation_id);
            return Err(e);
        }

        Ok(SubHandle {
            correlation_id,
            shared: Arc::clone(&self.shared),
        })
    }
}

impl SubHandle {
    /// Stop delivering events for this subscription. Does not notify the
    /// server — cancellation below the connection level is out of scope
    /// (see `DESIGN.md`); the subscription is simply forgotten locally.
    pub fn close_sub(self) {
        self.shared.subs.lock().unwrap().remove(&self.correlation_id);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.shutdown_stream.shutdown(Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn reader_loop(mut stream: UnixStream, shared: Arc<Shared>, max_msg_len: usize) {
    let mut recv = RecvBuffer::new();
    loop {
        match recv.read_frame(&mut stream, max_msg_len) {
            Ok(Some(bytes)) => {
                let Ok(parsed) = parse_frame(&bytes) else {
                    break;
                };
                route(&shared, parsed, max_msg_len);
            }
            Ok(None) | Err(_) => break,
        }
    }
    fail_all_outstanding(&shared);
}

fn route(shared: &Shared, parsed: ParsedFrame, max_msg_len: usize) {
    match parsed.message_type {
        MessageType::Response | MessageType::Error => {
            let waiter = shared.waiters.lock().unwrap().remove(&parsed.correlation_id);
            if let Some(tx) = waiter {
                let _ = tx.send(result_for(&parsed));
                return;
            }
            // Not a `call` waiter — perhaps a `subscribe` whose handler
            // answered directly instead of streaming.
            if let Some(sub) = shared.subs.lock().unwrap().remove(&parsed.correlation_id) {
                (sub.on_close)(result_for(&parsed).map(|_| ()));
            }
        }
        MessageType::StreamEvent => {
            let subs = shared.subs.lock().unwrap();
            if let Some(sub) = subs.get(&parsed.correlation_id) {
                let arena = Arena::new((parsed.payload.len() * 2 + 64).max(max_msg_len));
                if let Ok((obj, _)) = decode_object(&parsed.payload, &arena) {
                    (sub.on_event)(obj);
                }
            }
        }
        MessageType::StreamClose => {
            if let Some(sub) = shared.subs.lock().unwrap().remove(&parsed.correlation_id) {
                let result = if parsed.error_code.is_some() {
                    result_for(&parsed).map(|_| ())
                } else {
                    Ok(())
                };
                (sub.on_close)(result);
            }
        }
        MessageType::Request => {}
    }
}

fn result_for(parsed: &ParsedFrame) -> Result<Vec<u8>, CoreBusError> {
    match &parsed.error_code {
        Some(code) => Err(CoreBusError::Remote(
            ErrorKind::parse(code),
            parsed.message.clone().unwrap_or_default(),
        )),
        None => Ok(parsed.payload.clone()),
    }
}

fn fail_all_outstanding(shared: &Shared) {
    let err = || {
        CoreBusError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "connection closed",
        ))
    };
    for (_, tx) in shared.waiters.lock().unwrap().drain() {
        let _ = tx.send(Err(err()));
    }
    for (_, sub) in shared.subs.lock().unwrap().drain() {
        (sub.on_close)(Err(err()));
    }
}

fn parse_hex_svcuid(s: &str) -> Option<[u8; 16]> {
    if s.len() != 32 {
        return None;
    }
    let mut bytes = [0u8; 16];
    for (i, chunk) in bytes.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_svcuid_round_trips() {
        let hex = "0102030405060708090a0b0c0d0e0f10";
        let bytes = parse_hex_svcuid(hex).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
    }

    #[test]
    fn wrong_length_hex_is_rejected() {
        assert!(parse_hex_svcuid("abcd").is_none());
    }
}
