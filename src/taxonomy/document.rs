use std::collections::HashSet;

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::models::schema::{SchemaMeta, Subtheme, Theme, ThemeSchema};

/// Walks a parsed schema document into a `ThemeSchema`.
///
/// Two layouts are understood:
/// - nested mappings, `themes: { theme: { sub_theme: [keywords] } }`, or the
///   same mapping at the document root;
/// - listed records, `themes: [{ theme_id, theme_name, subthemes: [{
///   subtheme_id, subtheme_name, keywords }] }]`.
pub fn schema_from_value(doc: &Value) -> Result<ThemeSchema> {
    let root = doc
        .as_mapping()
        .ok_or_else(|| Error::schema("document root", "expected a mapping of themes"))?;

    let meta = match root.get("meta") {
        Some(value) => parse_meta(value)?,
        None => SchemaMeta::default(),
    };

    let themes = match root.get("themes") {
        Some(Value::Sequence(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_listed_theme(i, entry))
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Mapping(themes)) => parse_nested_themes(themes)?,
        Some(_) => return Err(Error::schema("themes", "expected a list or a mapping")),
        None => {
            let themes: Mapping = root
                .iter()
                .filter(|(k, _)| k.as_str() != Some("meta"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            parse_nested_themes(&themes)?
        }
    };

    if themes.is_empty() {
        return Err(Error::schema("themes", "schema defines no themes"));
    }

    Ok(ThemeSchema { themes, meta })
}

fn parse_meta(value: &Value) -> Result<SchemaMeta> {
    let Some(meta) = value.as_mapping() else {
        return Err(Error::schema("meta", "expected a mapping"));
    };

    Ok(SchemaMeta {
        match_fields: string_list(meta.get("match_fields"), "meta.match_fields")?,
        id_fields: string_list(meta.get("id_fields"), "meta.id_fields")?,
    })
}

fn parse_nested_themes(themes: &Mapping) -> Result<Vec<Theme>> {
    let mut parsed = Vec::with_capacity(themes.len());

    for (key, value) in themes {
        let name = scalar_name(key).ok_or_else(|| {
            Error::schema("themes", format!("theme name {:?} is not a string", key))
        })?;
        let location = format!("theme '{}'", name);

        let subthemes = match value {
            Value::Mapping(subthemes) => subthemes
                .iter()
                .map(|(st_key, keywords)| {
                    let st_name = scalar_name(st_key).ok_or_else(|| {
                        Error::schema(&location, format!("sub-theme name {:?} is not a string", st_key))
                    })?;
                    let st_location = format!("{} / sub-theme '{}'", location, st_name);
                    Ok(Subtheme {
                        id: None,
                        keywords: keyword_list(keywords, &st_location)?,
                        name: st_name,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Null => Vec::new(),
            _ => return Err(Error::schema(location, "expected a mapping of sub-themes")),
        };

        parsed.push(finish_theme(None, name, subthemes)?);
    }

    Ok(parsed)
}

fn parse_listed_theme(index: usize, entry: &Value) -> Result<Theme> {
    let position = format!("themes[{}]", index);
    let record = entry
        .as_mapping()
        .ok_or_else(|| Error::schema(&position, "expected a theme record"))?;

    let id = optional_name(record, &["theme_id", "id"]);
    let name = optional_name(record, &["theme_name", "name"])
        .or_else(|| id.clone())
        .ok_or_else(|| Error::schema(&position, "theme has no theme_name"))?;
    let location = format!("theme '{}'", name);

    let subthemes = match record.get("subthemes") {
        Some(Value::Sequence(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, st)| parse_listed_subtheme(&location, i, st))
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(Error::schema(location, "subthemes must be a list")),
    };

    finish_theme(id, name, subthemes)
}

fn parse_listed_subtheme(theme_location: &str, index: usize, entry: &Value) -> Result<Subtheme> {
    let position = format!("{} / subthemes[{}]", theme_location, index);
    let record = entry
        .as_mapping()
        .ok_or_else(|| Error::schema(&position, "expected a sub-theme record"))?;

    let id = optional_name(record, &["subtheme_id", "id"]);
    let name = optional_name(record, &["subtheme_name", "name"])
        .or_else(|| id.clone())
        .ok_or_else(|| Error::schema(&position, "sub-theme has no subtheme_name"))?;
    let location = format!("{} / sub-theme '{}'", theme_location, name);

    let keywords = match record.get("keywords") {
        Some(value) => keyword_list(value, &location)?,
        None => return Err(Error::schema(location, "missing keywords")),
    };

    Ok(Subtheme { id, name, keywords })
}

fn finish_theme(id: Option<String>, name: String, subthemes: Vec<Subtheme>) -> Result<Theme> {
    let mut seen = HashSet::new();
    for st in &subthemes {
        if !seen.insert(st.name.as_str()) {
            return Err(Error::schema(
                format!("theme '{}'", name),
                format!("duplicate sub-theme '{}'", st.name),
            ));
        }
    }

    if subthemes.is_empty() {
        tracing::warn!("Theme '{}' declares no sub-themes", name);
    }

    Ok(Theme { id, name, subthemes })
}

/// Keywords must be strings with visible content. The phrase itself is kept
/// verbatim, surrounding whitespace included.
fn keyword_list(value: &Value, location: &str) -> Result<Vec<String>> {
    let entries = match value {
        Value::Sequence(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(Error::schema(location, "keywords must be a list")),
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::String(keyword) if keyword.trim().is_empty() => {
                Err(Error::schema(location, format!("keyword #{} is empty", i + 1)))
            }
            Value::String(keyword) => Ok(keyword.clone()),
            other => Err(Error::schema(
                location,
                format!("keyword #{} is not a string: {:?}", i + 1, other),
            )),
        })
        .collect()
}

fn string_list(value: Option<&Value>, location: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries
            .iter()
            .map(|e| {
                e.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::schema(location, format!("{:?} is not a string", e)))
            })
            .collect(),
        Some(_) => Err(Error::schema(location, "expected a list of column names")),
    }
}

fn optional_name(record: &Mapping, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| record.get(*k).and_then(scalar_name))
}

/// Names may be written as bare numbers in YAML (`1.2:`), so scalars are stringified.
fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
