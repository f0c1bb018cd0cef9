use std::fmt::Write;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;
use crate::nbt;

/// Decode a player file and render either a short summary or, with
/// `full`, the whole normalized tree as pretty JSON.
pub fn inspect_file(path: &Path, full: bool) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let tree = nbt::parse(&bytes)?;
    if full {
        return Ok(pretty(&tree));
    }
    Ok(summarize(&tree))
}

pub fn summarize(tree: &Value) -> String {
    let field = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|key| tree.get(*key).filter(|v| !v.is_null()))
            .map(Value::to_string)
            .unwrap_or_else(|| "(missing)".to_string())
    };

    let mut out = String::new();
    let _ = writeln!(out, "=== Player summary ===");
    let _ = writeln!(out, "Position (Pos): {}", field(&["Pos", "pos"]));
    let _ = writeln!(out, "Rotation (Rotation): {}", field(&["Rotation"]));
    let _ = writeln!(out, "Dimension (Dimension): {}", field(&["Dimension"]));
    let _ = writeln!(out, "Health (Health): {}", field(&["Health"]));
    let _ = writeln!(out, "Food (FoodLevel): {}", field(&["foodLevel", "FoodLevel"]));
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Inventory ===");
    let _ = write!(
        out,
        "{}",
        tree.get("Inventory")
            .map(pretty)
            .unwrap_or_else(|| "(missing)".to_string())
    );
    out
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
