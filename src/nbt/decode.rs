use std::borrow::Cow;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use super::tag::{NamedTag, Tag, TagKind};

/// Deepest list/compound nesting accepted before giving up.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("unknown tag kind {kind:#04x} at offset {offset}")]
    UnknownKind { kind: u8, offset: usize },

    #[error("length {length} at offset {offset} does not fit the remaining data")]
    InvalidLength { length: i64, offset: usize },

    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("document is empty")]
    EmptyDocument,

    #[error("decompression failed: {0}")]
    Decompress(String),
}

/// Inflate gzip or zlib input; anything else is returned untouched.
pub fn inflate(bytes: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    let mut out = Vec::new();
    match bytes {
        [0x1f, 0x8b, ..] => {
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|e| DecodeError::Decompress(e.to_string()))?;
        }
        [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] => {
            ZlibDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|e| DecodeError::Decompress(e.to_string()))?;
        }
        _ => return Ok(Cow::Borrowed(bytes)),
    }
    Ok(Cow::Owned(out))
}

/// Decode an uncompressed, big-endian tag document into its root tag.
/// Bytes after the root tag are ignored.
pub fn decode(bytes: &[u8]) -> Result<NamedTag, DecodeError> {
    let mut reader = Reader::new(bytes);
    let kind = reader.read_kind()?;
    if kind == TagKind::End {
        return Err(DecodeError::EmptyDocument);
    }
    let name = reader.read_string()?;
    let tag = reader.read_payload(kind, 0)?;
    Ok(NamedTag { name, tag })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    fn read_kind(&mut self) -> Result<TagKind, DecodeError> {
        let offset = self.pos;
        let [byte] = self.read_array::<1>()?;
        TagKind::from_byte(byte).ok_or(DecodeError::UnknownKind { kind: byte, offset })
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = u16::from_be_bytes(self.read_array()?) as usize;
        let bytes = self.read_bytes(len)?;
        Ok(decode_modified_utf8(bytes))
    }

    /// Read a signed element count and check that `count` elements of at
    /// least `width` bytes each can still be present.
    fn read_count(&mut self, width: usize) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let length = self.read_i32()?;
        let fits = usize::try_from(length)
            .ok()
            .filter(|&count| {
                count
                    .checked_mul(width)
                    .is_some_and(|total| total <= self.remaining())
            });
        fits.ok_or(DecodeError::InvalidLength {
            length: i64::from(length),
            offset,
        })
    }

    fn read_payload(&mut self, kind: TagKind, depth: usize) -> Result<Tag, DecodeError> {
        Ok(match kind {
            TagKind::End => Tag::End,
            TagKind::Byte => Tag::Byte(self.read_i8()?),
            TagKind::Short => Tag::Short(self.read_i16()?),
            TagKind::Int => Tag::Int(self.read_i32()?),
            TagKind::Long => Tag::Long(self.read_i64()?),
            TagKind::Float => Tag::Float(self.read_f32()?),
            TagKind::Double => Tag::Double(self.read_f64()?),
            TagKind::String => Tag::String(self.read_string()?),
            TagKind::ByteArray => {
                let count = self.read_count(1)?;
                let bytes = self.read_bytes(count)?;
                Tag::ByteArray(bytes.iter().map(|&b| b as i8).collect())
            }
            TagKind::IntArray => {
                let count = self.read_count(4)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.read_i32()?);
                }
                Tag::IntArray(values)
            }
            TagKind::LongArray => {
                let count = self.read_count(8)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.read_i64()?);
                }
                Tag::LongArray(values)
            }
            TagKind::List => {
                let depth = Self::descend(depth)?;
                let child = self.read_kind()?;
                let offset = self.pos;
                let count = self.read_count(child.min_payload_width())?;
                if child == TagKind::End && count > 0 {
                    return Err(DecodeError::InvalidLength {
                        length: count as i64,
                        offset,
                    });
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_payload(child, depth)?);
                }
                Tag::List(child, items)
            }
            TagKind::Compound => {
                let depth = Self::descend(depth)?;
                let mut entries = Vec::new();
                loop {
                    let child = self.read_kind()?;
                    if child == TagKind::End {
                        break;
                    }
                    let name = self.read_string()?;
                    let tag = self.read_payload(child, depth)?;
                    entries.push((name, tag));
                }
                Tag::Compound(entries)
            }
        })
    }

    fn descend(depth: usize) -> Result<usize, DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(depth + 1)
    }
}

/// Decode Java's modified UTF-8 (`C0 80` for NUL, surrogate pairs for
/// supplementary characters). Plain UTF-8 takes the fast path.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_owned();
    }

    let continuation = |i: usize| -> Option<u16> {
        bytes
            .get(i)
            .filter(|&&b| b & 0xC0 == 0x80)
            .map(|&b| u16::from(b & 0x3F))
    };

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            match continuation(i + 1) {
                Some(low) => {
                    units.push((u16::from(b & 0x1F) << 6) | low);
                    i += 2;
                }
                None => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else if b & 0xF0 == 0xE0 {
            match (continuation(i + 1), continuation(i + 2)) {
                (Some(mid), Some(low)) => {
                    units.push((u16::from(b & 0x0F) << 12) | (mid << 6) | low);
                    i += 3;
                }
                _ => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::testing::{encode, gzip};

    fn player() -> NamedTag {
        NamedTag {
            name: String::new(),
            tag: Tag::Compound(vec![
                (
                    "Pos".into(),
                    Tag::List(
                        TagKind::Double,
                        vec![Tag::Double(12.5), Tag::Double(64.0), Tag::Double(-8.25)],
                    ),
                ),
                ("Health".into(), Tag::Float(20.0)),
                ("foodLevel".into(), Tag::Int(17)),
                ("Dimension".into(), Tag::String("minecraft:overworld".into())),
                ("Seed".into(), Tag::Long(-4_172_144_997_902_289_642)),
                ("Flags".into(), Tag::Byte(-1)),
                ("Air".into(), Tag::Short(300)),
                ("Blob".into(), Tag::ByteArray(vec![1, -2, 3])),
                ("UUID".into(), Tag::IntArray(vec![1, -2, 3, 4])),
                ("Heights".into(), Tag::LongArray(vec![i64::MIN, 0])),
                ("Empty".into(), Tag::List(TagKind::End, vec![])),
                (
                    "Inventory".into(),
                    Tag::List(
                        TagKind::Compound,
                        vec![Tag::Compound(vec![
                            ("id".into(), Tag::String("minecraft:stone".into())),
                            ("Count".into(), Tag::Byte(64)),
                        ])],
                    ),
                ),
            ]),
        }
    }

    #[test]
    fn test_decode_every_kind() {
        let doc = player();
        let decoded = decode(&encode(&doc)).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_decode_gzip_and_zlib() {
        let doc = player();
        let raw = encode(&doc);
        assert_eq!(decode(&inflate(&gzip(&raw)).unwrap()).unwrap(), doc);

        let mut zlib = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut zlib, &raw).unwrap();
        let zlib = zlib.finish().unwrap();
        assert_eq!(decode(&inflate(&zlib).unwrap()).unwrap(), doc);

        assert!(matches!(inflate(&raw).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncated_gzip_fails() {
        let mut bytes = gzip(&encode(&player()));
        bytes.truncate(bytes.len() / 2);
        let result = inflate(&bytes).and_then(|raw| decode(&raw));
        assert!(result.is_err());
    }

    #[test]
    fn test_every_truncation_fails() {
        let raw = encode(&player());
        for len in 0..raw.len() {
            let err = decode(&raw[..len]).unwrap_err();
            assert!(
                matches!(
                    err,
                    DecodeError::UnexpectedEof { .. } | DecodeError::InvalidLength { .. }
                ),
                "prefix of {len} bytes gave {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_kind() {
        // compound "" { kind 0x2a ... }
        let bytes = [10, 0, 0, 0x2a, 0, 1, b'x'];
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnknownKind { kind: 0x2a, offset: 3 })
        ));
    }

    #[test]
    fn test_length_larger_than_buffer() {
        // int array claiming a billion elements
        let mut bytes = vec![11, 0, 0];
        bytes.extend_from_slice(&1_000_000_000i32.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 1]);
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::InvalidLength { length: 1_000_000_000, .. })
        ));

        let mut negative = vec![7, 0, 0];
        negative.extend_from_slice(&(-1i32).to_be_bytes());
        assert!(matches!(
            decode(&negative),
            Err(DecodeError::InvalidLength { length: -1, .. })
        ));
    }

    #[test]
    fn test_list_of_end_with_elements_is_rejected() {
        let mut bytes = vec![9, 0, 0, 0];
        bytes.extend_from_slice(&3i32.to_be_bytes());
        assert!(matches!(decode(&bytes), Err(DecodeError::InvalidLength { .. })));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(decode(&[0]), Err(DecodeError::EmptyDocument)));
        assert!(matches!(decode(&[]), Err(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let mut tag = Tag::Compound(vec![]);
        for _ in 0..MAX_DEPTH {
            tag = Tag::List(TagKind::Compound, vec![tag]);
        }
        let doc = NamedTag { name: "deep".into(), tag };
        assert!(matches!(
            decode(&encode(&doc)),
            Err(DecodeError::TooDeep { limit: MAX_DEPTH })
        ));
    }

    #[test]
    fn test_modified_utf8() {
        assert_eq!(decode_modified_utf8(b"Steve"), "Steve");
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\0b");
        // U+1F600 as a CESU-8 surrogate pair
        let smile = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smile), "\u{1F600}");
        assert_eq!(decode_modified_utf8(&[b'a', 0xFF]), "a\u{FFFD}");
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut raw = encode(&player());
        raw.extend_from_slice(&[0xde, 0xad]);
        assert_eq!(decode(&raw).unwrap(), player());
    }
}
