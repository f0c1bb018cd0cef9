use serde::ser::{Serialize, SerializeMap, Serializer};

/// One-byte kind discriminator that prefixes every named tag and every list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::End,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::ByteArray,
            8 => Self::String,
            9 => Self::List,
            10 => Self::Compound,
            11 => Self::IntArray,
            12 => Self::LongArray,
            _ => return None,
        })
    }

    /// Name used in the wrapped `{type, value}` representation.
    pub fn name(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::ByteArray => "byteArray",
            Self::String => "string",
            Self::List => "list",
            Self::Compound => "compound",
            Self::IntArray => "intArray",
            Self::LongArray => "longArray",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        (0u8..=12)
            .filter_map(Self::from_byte)
            .find(|kind| kind.name() == name)
    }

    /// Smallest number of bytes one payload of this kind can occupy.
    /// Used to reject counts that cannot fit in the remaining buffer.
    pub(crate) fn min_payload_width(self) -> usize {
        match self {
            Self::End => 0,
            Self::Byte | Self::Compound => 1,
            Self::Short | Self::String => 2,
            Self::Int | Self::Float | Self::ByteArray | Self::IntArray | Self::LongArray => 4,
            Self::List => 5,
            Self::Long | Self::Double => 8,
        }
    }
}

/// A decoded tag payload. Compound entries keep their on-disk order.
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(TagKind, Vec<Tag>),
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::End => TagKind::End,
            Tag::Byte(_) => TagKind::Byte,
            Tag::Short(_) => TagKind::Short,
            Tag::Int(_) => TagKind::Int,
            Tag::Long(_) => TagKind::Long,
            Tag::Float(_) => TagKind::Float,
            Tag::Double(_) => TagKind::Double,
            Tag::ByteArray(_) => TagKind::ByteArray,
            Tag::String(_) => TagKind::String,
            Tag::List(_, _) => TagKind::List,
            Tag::Compound(_) => TagKind::Compound,
            Tag::IntArray(_) => TagKind::IntArray,
            Tag::LongArray(_) => TagKind::LongArray,
        }
    }
}

/// The root of a document: a single named tag.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

struct Entries<'a>(&'a [(String, Tag)]);

impl Serialize for Entries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, tag)| (name, tag)))
    }
}

// Serializes as the wrapped `{"type": <kind>, "value": <payload>}` shape.
impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.kind().name())?;
        match self {
            Tag::End => map.serialize_entry("value", &())?,
            Tag::Byte(v) => map.serialize_entry("value", v)?,
            Tag::Short(v) => map.serialize_entry("value", v)?,
            Tag::Int(v) => map.serialize_entry("value", v)?,
            Tag::Long(v) => map.serialize_entry("value", v)?,
            Tag::Float(v) => map.serialize_entry("value", v)?,
            Tag::Double(v) => map.serialize_entry("value", v)?,
            Tag::ByteArray(v) => map.serialize_entry("value", v)?,
            Tag::String(v) => map.serialize_entry("value", v)?,
            Tag::List(_, items) => map.serialize_entry("value", items)?,
            Tag::Compound(entries) => map.serialize_entry("value", &Entries(entries))?,
            Tag::IntArray(v) => map.serialize_entry("value", v)?,
            Tag::LongArray(v) => map.serialize_entry("value", v)?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for byte in 0u8..=12 {
            let kind = TagKind::from_byte(byte).unwrap();
            assert_eq!(kind as u8, byte);
            assert_eq!(TagKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TagKind::from_byte(13), None);
        assert_eq!(TagKind::from_name("Compound"), None);
    }

    #[test]
    fn test_wrapped_serialization() {
        let tag = Tag::Compound(vec![
            ("Health".into(), Tag::Float(20.0)),
            (
                "Pos".into(),
                Tag::List(TagKind::Double, vec![Tag::Double(1.5), Tag::Double(-2.0)]),
            ),
        ]);
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "compound",
                "value": {
                    "Health": { "type": "float", "value": 20.0 },
                    "Pos": {
                        "type": "list",
                        "value": [
                            { "type": "double", "value": 1.5 },
                            { "type": "double", "value": -2.0 }
                        ]
                    }
                }
            })
        );
    }
}
