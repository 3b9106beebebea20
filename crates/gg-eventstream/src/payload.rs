//! The canonical payload sub-encoding: a Core-Bus frame's payload is an
//! `Object` tree serialized with the same big-endian, length-prefixed
//! conventions as EventStream header values, extended with container tags
//! for `List`/`Map`. This is the one payload tag-scheme the whole workspace
//! uses — one codec, not a second TLV format layered on top of the header
//! wire format.

use crate::error::EventStreamError;
use gg_object::{Arena, Buffer, Object, MAX_DEPTH};

const TAG_NULL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_I64: u8 = 3;
const TAG_F64: u8 = 4;
const TAG_BUF: u8 = 5;
const TAG_LIST: u8 = 6;
const TAG_MAP: u8 = 7;

/// Decode an `Object` tree from the front of `buf`, returning the object and
/// the number of bytes consumed. List/map entries are materialized into
/// `arena`; `Buf` leaves borrow directly from `buf` with no copy.
pub fn decode_object<'a>(
    buf: &'a [u8],
    arena: &'a Arena,
) -> Result<(Object<'a>, usize), EventStreamError> {
    decode_at_depth(buf, arena, 0)
}

fn decode_at_depth<'a>(
    buf: &'a [u8],
    arena: &'a Arena,
    depth: u8,
) -> Result<(Object<'a>, usize), EventStreamError> {
    if depth > MAX_DEPTH {
        return Err(EventStreamError::Nesting);
    }
    let tag = *buf.first().ok_or(EventStreamError::Truncated)?;
    let mut pos = 1usize;
    let obj = match tag {
        TAG_NULL => Object::Null,
        TAG_FALSE => Object::Bool(false),
        TAG_TRUE => Object::Bool(true),
        TAG_I64 => {
            let raw = take(buf, &mut pos, 8)?;
            Object::I64(i64::from_be_bytes(raw.try_into().unwrap()))
        }
        TAG_F64 => {
            let raw = take(buf, &mut pos, 8)?;
            Object::F64(f64::from_bits(u64::from_be_bytes(raw.try_into().unwrap())))
        }
        TAG_BUF => {
            let len = read_u32(buf, &mut pos)? as usize;
            let bytes = take(buf, &mut pos, len)?;
            Object::Buf(Buffer::new(bytes))
        }
        TAG_LIST => {
            let count = read_u32(buf, &mut pos)?;
            let mut items = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                let (item, consumed) = decode_at_depth(&buf[pos..], arena, depth + 1)?;
                items.push(item);
                pos += consumed;
            }
            let slice = arena.alloc_slice_copy(&items)?;
            Object::List(slice)
        }
        TAG_MAP => {
            let count = read_u32(buf, &mut pos)?;
            let mut entries = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                let key_len = *buf.get(pos).ok_or(EventStreamError::Truncated)? as usize;
                pos += 1;
                let key_bytes = take(buf, &mut pos, key_len)?;
                let (value, consumed) = decode_at_depth(&buf[pos..], arena, depth + 1)?;
                pos += consumed;
                entries.push((Buffer::new(key_bytes), value));
            }
            let slice = arena.alloc_slice_copy(&entries)?;
            Object::Map(slice)
        }
        _ => return Err(EventStreamError::BadHeader),
    };
    Ok((obj, pos))
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], EventStreamError> {
    let start = *pos;
    let end = start.checked_add(len).ok_or(EventStreamError::Truncated)?;
    let slice = buf.get(start..end).ok_or(EventStreamError::Truncated)?;
    *pos = end;
    Ok(slice)
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32, EventStreamError> {
    let raw = take(buf, pos, 4)?;
    Ok(u32::from_be_bytes(raw.try_into().unwrap()))
}

/// Encode `obj` into the front of `out`, returning the number of bytes
/// written. Fails `NoSpace` if `out` is too small.
pub fn encode_object(obj: &Object<'_>, out: &mut [u8]) -> Result<usize, EventStreamError> {
    encode_at(obj, out, 0)
}

fn encode_at(obj: &Object<'_>, out: &mut [u8], pos: usize) -> Result<usize, EventStreamError> {
    match obj {
        Object::Null => put(out, pos, &[TAG_NULL]),
        Object::Bool(false) => put(out, pos, &[TAG_FALSE]),
        Object::Bool(true) => put(out, pos, &[TAG_TRUE]),
        Object::I64(v) => {
            let pos = put(out, pos, &[TAG_I64])?;
            put(out, pos, &v.to_be_bytes())
        }
        Object::F64(v) => {
            let pos = put(out, pos, &[TAG_F64])?;
            put(out, pos, &v.to_bits().to_be_bytes())
        }
        Object::Buf(buffer) => {
            let bytes = buffer.as_bytes();
            if bytes.len() > u32::MAX as usize {
                return Err(EventStreamError::NoSpace);
            }
            let pos = put(out, pos, &[TAG_BUF])?;
            let pos = put(out, pos, &(bytes.len() as u32).to_be_bytes())?;
            put(out, pos, bytes)
        }
        Object::List(items) => {
            if items.len() > u32::MAX as usize {
                return Err(EventStreamError::NoSpace);
            }
            let mut pos = put(out, pos, &[TAG_LIST])?;
            pos = put(out, pos, &(items.len() as u32).to_be_bytes())?;
            for item in *items {
                pos = encode_at(item, out, pos)?;
            }
            Ok(pos)
        }
        Object::Map(entries) => {
            if entries.len() > u32::MAX as usize {
                return Err(EventStreamError::NoSpace);
            }
            let mut pos = put(out, pos, &[TAG_MAP])?;
            pos = put(out, pos, &(entries.len() as u32).to_be_bytes())?;
            for (key, value) in *entries {
                let key_bytes = key.as_bytes();
                if key_bytes.len() > u8::MAX as usize {
                    return Err(EventStreamError::NoSpace);
                }
                pos = put(out, pos, &[key_bytes.len() as u8])?;
                pos = put(out, pos, key_bytes)?;
                pos = encode_at(value, out, pos)?;
            }
            Ok(pos)
        }
    }
}

fn put(out: &mut [u8], pos: usize, bytes: &[u8]) -> Result<usize, EventStreamError> {
    let end = pos.checked_add(bytes.len()).ok_or(EventStreamError::NoSpace)?;
    let dest = out.get_mut(pos..end).ok_or(EventStreamError::NoSpace)?;
    dest.copy_from_slice(bytes);
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_nested_map() {
        let arena = Arena::new(4096);
        let entries = [
            (Buffer::from("ping"), Object::Buf(Buffer::from("hi"))),
            (Buffer::from("n"), Object::I64(-5)),
            (
                Buffer::from("list"),
                Object::List(
                    arena
                        .alloc_slice_copy(&[Object::Bool(true), Object::Null])
                        .unwrap(),
                ),
            ),
        ];
        let map = Object::Map(arena.alloc_slice_copy(&entries).unwrap());

        let mut buf = [0u8; 512];
        let len = encode_object(&map, &mut buf).unwrap();

        let decode_arena = Arena::new(4096);
        let (decoded, consumed) = decode_object(&buf[..len], &decode_arena).unwrap();
        assert_eq!(consumed, len);
        assert_eq!(decoded, map);
    }

    #[test]
    fn depth_limit_is_enforced_on_decode() {
        // 16 nested single-element lists, tag-encoded by hand.
        let mut buf = Vec::new();
        for _ in 0..16 {
            buf.push(TAG_LIST);
            buf.extend_from_slice(&1u32.to_be_bytes());
        }
        buf.push(TAG_NULL);
        let arena = Arena::new(4096);
        assert_eq!(
            decode_object(&buf, &arena),
            Err(EventStreamError::Nesting)
        );
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let arena = Arena::new(64);
        assert_eq!(decode_object(&[TAG_BUF, 0, 0, 0, 5], &arena), Err(EventStreamError::Truncated));
    }
}
