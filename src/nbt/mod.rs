//! Reader for the binary tag-tree format used by Minecraft save files.
//!
//! `decode` produces a typed [`Tag`] tree; `normalize_tag` strips the kinds
//! and leaves a plain `serde_json::Value` suitable for field lookups.

mod decode;
mod normalize;
mod tag;

pub use decode::{decode, inflate, DecodeError, MAX_DEPTH};
pub use normalize::{normalize, normalize_tag};
pub use tag::{NamedTag, Tag, TagKind};

/// Inflate (if compressed), decode and normalize a whole document.
pub fn parse(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    let raw = inflate(bytes)?;
    let root = decode(&raw)?;
    Ok(normalize_tag(&root.tag))
}


#[cfg(test)]
mod tests {
    use super::testing::player_file;
    use super::*;

    #[test]
    fn test_parse_gzipped_player() {
        let value = parse(&player_file(&[12.5, 64.0, -8.25])).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "Health": 20.0, "Pos": [12.5, 64.0, -8.25] })
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let bytes = player_file(&[1.0, 2.0, 3.0]);
        assert_eq!(parse(&bytes).unwrap(), parse(&bytes).unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse(b"not a save file").is_err());
    }
}
