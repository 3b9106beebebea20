//! Linear-scan lookup over an `Object::Map`'s backing slice.
//!
//! Designed for small maps (a few dozen entries): first match wins, and
//! duplicate keys are a caller programming error that is not detected here
//! (mirrors `ggl_map_get`'s `GGL_MAP_FOREACH` scan).

use crate::buffer::{buffer_equals, Buffer};
use crate::object::Object;

pub fn map_get<'a, 'b>(
    map: &'b [(Buffer<'a>, Object<'a>)],
    key: Buffer<'_>,
) -> Option<&'b Object<'a>> {
    map.iter()
        .find(|(k, _)| buffer_equals(*k, key))
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_match() {
        let entries = [
            (Buffer::new(b"a"), Object::I64(1)),
            (Buffer::new(b"b"), Object::I64(2)),
            (Buffer::new(b"a"), Object::I64(3)),
        ];
        assert_eq!(map_get(&entries, Buffer::new(b"a")), Some(&Object::I64(1)));
        assert_eq!(map_get(&entries, Buffer::new(b"b")), Some(&Object::I64(2)));
    }

    #[test]
    fn missing_key_returns_none() {
        let entries = [(Buffer::new(b"a"), Object::I64(1))];
        assert_eq!(map_get(&entries, Buffer::new(b"z")), None);
    }
}
