pub mod document;

use std::path::Path;

use crate::error::Result;
use crate::models::schema::ThemeSchema;

pub use document::schema_from_value;

/// Reads a YAML (or JSON) schema document from disk.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<ThemeSchema> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let schema = parse_schema_str(&content)?;

    tracing::info!(
        "Loaded schema from {}: {} themes, {} sub-themes, {} keywords",
        path.display(),
        schema.themes.len(),
        schema.subtheme_count(),
        schema.keyword_count()
    );

    Ok(schema)
}

pub fn parse_schema_str(content: &str) -> Result<ThemeSchema> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    schema_from_value(&doc)
}
