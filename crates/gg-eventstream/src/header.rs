//! EventStream header: `{ name_len u8, name bytes, type u8, value }`.

use crate::error::EventStreamError;
use gg_object::Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderValueType {
    TrueBool = 0,
    FalseBool = 1,
    Byte = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    ByteBuffer = 6,
    String = 7,
    Timestamp = 8,
    Uuid = 9,
}

impl TryFrom<u8> for HeaderValueType {
    type Error = EventStreamError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        use HeaderValueType::*;
        Ok(match tag {
            0 => TrueBool,
            1 => FalseBool,
            2 => Byte,
            3 => Int16,
            4 => Int32,
            5 => Int64,
            6 => ByteBuffer,
            7 => String,
            8 => Timestamp,
            9 => Uuid,
            _ => return Err(EventStreamError::BadHeader),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderValue<'a> {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    ByteBuffer(&'a [u8]),
    String(&'a str),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue<'_> {
    fn value_type(&self) -> HeaderValueType {
        match self {
            HeaderValue::Bool(true) => HeaderValueType::TrueBool,
            HeaderValue::Bool(false) => HeaderValueType::FalseBool,
            HeaderValue::Byte(_) => HeaderValueType::Byte,
            HeaderValue::Int16(_) => HeaderValueType::Int16,
            HeaderValue::Int32(_) => HeaderValueType::Int32,
            HeaderValue::Int64(_) => HeaderValueType::Int64,
            HeaderValue::ByteBuffer(_) => HeaderValueType::ByteBuffer,
            HeaderValue::String(_) => HeaderValueType::String,
            HeaderValue::Timestamp(_) => HeaderValueType::Timestamp,
            HeaderValue::Uuid(_) => HeaderValueType::Uuid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header<'a> {
    pub name: Buffer<'a>,
    pub value: HeaderValue<'a>,
}

impl<'a> Header<'a> {
    pub fn new(name: &'a str, value: HeaderValue<'a>) -> Self {
        Header {
            name: Buffer::from(name),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding — callers only reach this after `decode` has bounds-checked the
// headers region, so parse errors here indicate a prior validation bug, not
// a new failure mode.
// ---------------------------------------------------------------------------

pub(crate) fn parse_header(bytes: &[u8]) -> Result<(Header<'_>, &[u8]), EventStreamError> {
    let name_len = *bytes.first().ok_or(EventStreamError::BadHeader)? as usize;
    let mut pos = 1usize;
    let name_end = pos
        .checked_add(name_len)
        .ok_or(EventStreamError::BadHeader)?;
    let name_bytes = bytes.get(pos..name_end).ok_or(EventStreamError::BadHeader)?;
    pos = name_end;

    let type_byte = *bytes.get(pos).ok_or(EventStreamError::BadHeader)?;
    pos += 1;
    let value_type = HeaderValueType::try_from(type_byte)?;

    let (value, new_pos) = parse_value(bytes, pos, value_type)?;
    let rest = bytes.get(new_pos..).ok_or(EventStreamError::BadHeader)?;

    Ok((
        Header {
            name: Buffer::new(name_bytes),
            value,
        },
        rest,
    ))
}

fn parse_value(
    bytes: &[u8],
    pos: usize,
    value_type: HeaderValueType,
) -> Result<(HeaderValue<'_>, usize), EventStreamError> {
    use HeaderValueType::*;
    match value_type {
        TrueBool => Ok((HeaderValue::Bool(true), pos)),
        FalseBool => Ok((HeaderValue::Bool(false), pos)),
        Byte => {
            let b = *bytes.get(pos).ok_or(EventStreamError::BadHeader)?;
            Ok((HeaderValue::Byte(b as i8), pos + 1))
        }
        Int16 => {
            let end = pos + 2;
            let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
            Ok((
                HeaderValue::Int16(i16::from_be_bytes(raw.try_into().unwrap())),
                end,
            ))
        }
        Int32 => {
            let end = pos + 4;
            let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
            Ok((
                HeaderValue::Int32(i32::from_be_bytes(raw.try_into().unwrap())),
                end,
            ))
        }
        Int64 => {
            let end = pos + 8;
            let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
            Ok((
                HeaderValue::Int64(i64::from_be_bytes(raw.try_into().unwrap())),
                end,
            ))
        }
        Timestamp => {
            let end = pos + 8;
            let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
            Ok((
                HeaderValue::Timestamp(i64::from_be_bytes(raw.try_into().unwrap())),
                end,
            ))
        }
        Uuid => {
            let end = pos + 16;
            let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
            let mut uuid = [0u8; 16];
            uuid.copy_from_slice(raw);
            Ok((HeaderValue::Uuid(uuid), end))
        }
        ByteBuffer => {
            let (len, body_start) = read_u16_len(bytes, pos)?;
            let end = body_start
                .checked_add(len)
                .ok_or(EventStreamError::BadHeader)?;
            let raw = bytes
                .get(body_start..end)
                .ok_or(EventStreamError::BadHeader)?;
            Ok((HeaderValue::ByteBuffer(raw), end))
        }
        String => {
            let (len, body_start) = read_u16_len(bytes, pos)?;
            let end = body_start
                .checked_add(len)
                .ok_or(EventStreamError::BadHeader)?;
            let raw = bytes
                .get(body_start..end)
                .ok_or(EventStreamError::BadHeader)?;
            let s = std::str::from_utf8(raw).map_err(|_| EventStreamError::BadHeader)?;
            Ok((HeaderValue::String(s), end))
        }
    }
}

fn read_u16_len(bytes: &[u8], pos: usize) -> Result<(usize, usize), EventStreamError> {
    let end = pos + 2;
    let raw = bytes.get(pos..end).ok_or(EventStreamError::BadHeader)?;
    Ok((u16::from_be_bytes(raw.try_into().unwrap()) as usize, end))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub(crate) fn write_header(out: &mut [u8], pos: usize, header: &Header<'_>) -> Result<usize, EventStreamError> {
    let name_bytes = header.name.as_bytes();
    if name_bytes.len() > u8::MAX as usize {
        return Err(EventStreamError::NoSpace);
    }
    let mut pos = write_bytes(out, pos, &[name_bytes.len() as u8])?;
    pos = write_bytes(out, pos, name_bytes)?;
    pos = write_bytes(out, pos, &[header.value.value_type() as u8])?;
    write_value(out, pos, &header.value)
}

fn write_value(out: &mut [u8], pos: usize, value: &HeaderValue<'_>) -> Result<usize, EventStreamError> {
    match value {
        HeaderValue::Bool(_) => Ok(pos),
        HeaderValue::Byte(b) => write_bytes(out, pos, &[*b as u8]),
        HeaderValue::Int16(v) => write_bytes(out, pos, &v.to_be_bytes()),
        HeaderValue::Int32(v) => write_bytes(out, pos, &v.to_be_bytes()),
        HeaderValue::Int64(v) => write_bytes(out, pos, &v.to_be_bytes()),
        HeaderValue::Timestamp(v) => write_bytes(out, pos, &v.to_be_bytes()),
        HeaderValue::Uuid(v) => write_bytes(out, pos, v),
        HeaderValue::ByteBuffer(bytes) => write_length_prefixed(out, pos, bytes),
        HeaderValue::String(s) => write_length_prefixed(out, pos, s.as_bytes()),
    }
}

fn write_length_prefixed(out: &mut [u8], pos: usize, bytes: &[u8]) -> Result<usize, EventStreamError> {
    if bytes.len() > u16::MAX as usize {
        return Err(EventStreamError::NoSpace);
    }
    let pos = write_bytes(out, pos, &(bytes.len() as u16).to_be_bytes())?;
    write_bytes(out, pos, bytes)
}

fn write_bytes(out: &mut [u8], pos: usize, bytes: &[u8]) -> Result<usize, EventStreamError> {
    let end = pos.checked_add(bytes.len()).ok_or(EventStreamError::NoSpace)?;
    let dest = out.get_mut(pos..end).ok_or(EventStreamError::NoSpace)?;
    dest.copy_from_slice(bytes);
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_value_type() {
        let values = [
            HeaderValue::Bool(true),
            HeaderValue::Bool(false),
            HeaderValue::Byte(-7),
            HeaderValue::Int16(-1234),
            HeaderValue::Int32(123_456),
            HeaderValue::Int64(-9_876_543_210),
            HeaderValue::ByteBuffer(&[1, 2, 3]),
            HeaderValue::String("hello"),
            HeaderValue::Timestamp(1_700_000_000_000),
            HeaderValue::Uuid([7u8; 16]),
        ];
        for value in values {
            let header = Header::new(":kind", value);
            let mut buf = [0u8; 64];
            let end = write_header(&mut buf, 0, &header).unwrap();
            let (decoded, rest) = parse_header(&buf[..end]).unwrap();
            assert_eq!(decoded, header);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn string_with_invalid_utf8_is_rejected() {
        let mut buf = [0u8; 32];
        // name_len=0, type=String(7), len=2, bytes=[0xff,0xfe]
        buf[0] = 0;
        buf[1] = HeaderValueType::String as u8;
        buf[2..4].copy_from_slice(&2u16.to_be_bytes());
        buf[4] = 0xff;
        buf[5] = 0xfe;
        assert_eq!(parse_header(&buf[..6]), Err(EventStreamError::BadHeader));
    }
}
