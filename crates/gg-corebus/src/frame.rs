//! Core-Bus frame shape: an Event-Stream message whose headers carry
//! `:message-type`, `:correlation-id`, and (for requests) `:method`.

use crate::error::CoreBusError;
use gg_eventstream::{decode, encode, encode_object, Header, HeaderValue};
use gg_object::Object;

const H_MESSAGE_TYPE: &str = ":message-type";
const H_CORRELATION_ID: &str = ":correlation-id";
const H_METHOD: &str = ":method";
const H_ERROR_CODE: &str = ":error-code";
const H_MESSAGE: &str = ":message";
const H_SVCUID: &str = ":svcuid";

/// The reserved, connection-bootstrap method name: the zero-argument
/// "get auth" exchange every connection's first request must be. Not
/// present in any embedder's `methods[]` table — the dispatch loop
/// intercepts it before a connection reaches `Authenticated`.
pub const AUTH_METHOD: &str = "auth.get_auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Error,
    StreamEvent,
    StreamClose,
}

impl MessageType {
    fn as_str(self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Error => "error",
            MessageType::StreamEvent => "stream-event",
            MessageType::StreamClose => "stream-close",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "request" => MessageType::Request,
            "response" => MessageType::Response,
            "error" => MessageType::Error,
            "stream-event" => MessageType::StreamEvent,
            "stream-close" => MessageType::StreamClose,
            _ => return None,
        })
    }
}

/// A decoded frame with its headers copied out as owned values — the
/// connection's read buffer is reused across frames, so nothing here
/// borrows from it.
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub message_type: MessageType,
    pub correlation_id: i64,
    pub method: Option<String>,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub svcuid: Option<[u8; 16]>,
    pub payload: Vec<u8>,
}

pub fn parse_frame(buf: &[u8]) -> Result<ParsedFrame, CoreBusError> {
    let msg = decode(buf)?;

    let mut message_type = None;
    let mut correlation_id = None;
    let mut method = None;
    let mut error_code = None;
    let mut message = None;
    let mut svcuid = None;

    for header in msg.headers() {
        match (header.name.as_str().ok(), header.value) {
            (Ok(H_MESSAGE_TYPE), HeaderValue::String(s)) => {
                message_type = MessageType::parse(s);
            }
            (Ok(H_CORRELATION_ID), HeaderValue::Int64(v)) => correlation_id = Some(v),
            (Ok(H_METHOD), HeaderValue::String(s)) => method = Some(s.to_string()),
            (Ok(H_ERROR_CODE), HeaderValue::String(s)) => error_code = Some(s.to_string()),
            (Ok(H_MESSAGE), HeaderValue::String(s)) => message = Some(s.to_string()),
            (Ok(H_SVCUID), HeaderValue::ByteBuffer(b)) if b.len() == 16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(b);
                svcuid = Some(bytes);
            }
            _ => {}
        }
    }

    let message_type = message_type.ok_or(CoreBusError::Framing(
        gg_eventstream::EventStreamError::BadHeader,
    ))?;
    let correlation_id = correlation_id.ok_or(CoreBusError::Framing(
        gg_eventstream::EventStreamError::BadHeader,
    ))?;
    if message_type == MessageType::Request && method.is_none() {
        return Err(CoreBusError::Framing(
            gg_eventstream::EventStreamError::BadHeader,
        ));
    }

    Ok(ParsedFrame {
        message_type,
        correlation_id,
        method,
        error_code,
        message,
        svcuid,
        payload: msg.payload.to_vec(),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn build_frame(
    message_type: MessageType,
    correlation_id: i64,
    method: Option<&str>,
    svcuid: Option<[u8; 16]>,
    error_code: Option<&str>,
    message: Option<&str>,
    payload: &[u8],
) -> Result<Vec<u8>, CoreBusError> {
    let mut headers = vec![
        Header::new(H_MESSAGE_TYPE, HeaderValue::String(message_type.as_str())),
        Header::new(H_CORRELATION_ID, HeaderValue::Int64(correlation_id)),
    ];
    if let Some(method) = method {
        headers.push(Header::new(H_METHOD, HeaderValue::String(method)));
    }
    if let Some(svcuid) = &svcuid {
        headers.push(Header::new(H_SVCUID, HeaderValue::ByteBuffer(svcuid)));
    }
    if let Some(error_code) = error_code {
        headers.push(Header::new(H_ERROR_CODE, HeaderValue::String(error_code)));
    }
    if let Some(message) = message {
        headers.push(Header::new(H_MESSAGE, HeaderValue::String(message)));
    }

    let mut capacity = 256 + payload.len();
    loop {
        let mut out = vec![0u8; capacity];
        match encode(&headers, payload, &mut out) {
            Ok(len) => {
                out.truncate(len);
                return Ok(out);
            }
            Err(gg_eventstream::EventStreamError::NoSpace) if capacity < 1 << 20 => {
                capacity *= 2;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Encode an `Object` payload into an owned buffer, growing it until it
/// fits. Mirrors `build_frame`'s own doubling loop — the payload and the
/// frame around it are sized independently since a handler's response may
/// be much larger than its headers.
pub fn encode_payload(obj: &Object<'_>) -> Result<Vec<u8>, CoreBusError> {
    let mut capacity = 256;
    loop {
        let mut out = vec![0u8; capacity];
        match encode_object(obj, &mut out) {
            Ok(len) => {
                out.truncate(len);
                return Ok(out);
            }
            Err(gg_eventstream::EventStreamError::NoSpace) if capacity < 1 << 20 => {
                capacity *= 2;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_request_with_svcuid() {
        let frame = build_frame(
            MessageType::Request,
            7,
            Some("echo"),
            Some([9u8; 16]),
            None,
            None,
            b"payload",
        )
        .unwrap();
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.message_type, MessageType::Request);
        assert_eq!(parsed.correlation_id, 7);
        assert_eq!(parsed.method.as_deref(), Some("echo"));
        assert_eq!(parsed.svcuid, Some([9u8; 16]));
        assert_eq!(parsed.payload, b"payload");
    }

    #[test]
    fn round_trips_an_error_response() {
        let frame = build_frame(
            MessageType::Error,
            3,
            None,
            None,
            Some("NotAuthenticated"),
            Some("unknown svcuid"),
            &[],
        )
        .unwrap();
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.message_type, MessageType::Error);
        assert_eq!(parsed.error_code.as_deref(), Some("NotAuthenticated"));
        assert_eq!(parsed.message.as_deref(), Some("unknown svcuid"));
    }

    #[test]
    fn request_without_method_is_rejected() {
        let headers = vec![
            Header::new(H_MESSAGE_TYPE, HeaderValue::String("request")),
            Header::new(H_CORRELATION_ID, HeaderValue::Int64(1)),
        ];
        let mut out = vec![0u8; 256];
        let len = encode(&headers, &[], &mut out).unwrap();
        out.truncate(len);
        assert!(parse_frame(&out).is_err());
    }

    #[test]
    fn encode_payload_grows_past_the_initial_capacity() {
        let arena = gg_object::Arena::new(1 << 16);
        let big = arena.alloc_bytes(&vec![b'x'; 4096]).unwrap();
        let obj = Object::Buf(gg_object::Buffer::new(big));
        let encoded = encode_payload(&obj).unwrap();
        assert!(encoded.len() > 4096);
    }
}
