use crate::error::{Error, Result};
use crate::models::schema::SchemaMeta;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TEXT_COLUMNS: &[&str] = &["Article Title", "Abstract", "Author Keywords", "Keywords Plus"];

pub const DEFAULT_ID_COLUMNS: &[&str] = &["UT (Unique WOS ID)", "UT", "Accession Number", "DOI"];

pub const DEFAULT_SEPARATOR: &str = " ";

#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit text columns; `None` defers to the schema's `meta.match_fields`.
    pub text_columns: Option<Vec<String>>,
    /// Explicit id columns; `None` defers to the schema's `meta.id_fields`.
    pub id_columns: Option<Vec<String>>,
    pub separator: String,
    pub output_dir: PathBuf,
    pub database_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let text_columns = match env::var("THEMESCAN_TEXT_COLUMNS") {
            Ok(raw) => Some(parse_column_list(&raw, "THEMESCAN_TEXT_COLUMNS")?),
            Err(_) => None,
        };

        let id_columns = match env::var("THEMESCAN_ID_COLUMNS") {
            Ok(raw) => Some(parse_column_list(&raw, "THEMESCAN_ID_COLUMNS")?),
            Err(_) => None,
        };

        let separator = env::var("THEMESCAN_SEPARATOR")
            .unwrap_or_else(|_| DEFAULT_SEPARATOR.to_string());

        let output_dir = env::var("THEMESCAN_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("out"));

        let database_path = env::var("THEMESCAN_DATABASE").ok().map(PathBuf::from);

        Ok(Self {
            text_columns,
            id_columns,
            separator,
            output_dir,
            database_path,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_columns: None,
            id_columns: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            output_dir: PathBuf::from("out"),
            database_path: None,
        }
    }
}

/// Column settings consumed when turning row records into papers.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub text_columns: Vec<String>,
    pub id_columns: Vec<String>,
    pub separator: String,
}

impl MatchConfig {
    /// Explicit config wins, then the schema's declared fields, then the
    /// built-in defaults.
    pub fn resolve(config: &Config, meta: &SchemaMeta) -> Self {
        let mut resolved = Self::from(config);
        if config.text_columns.is_none() && !meta.match_fields.is_empty() {
            resolved.text_columns = meta.match_fields.clone();
        }
        if config.id_columns.is_none() && !meta.id_fields.is_empty() {
            resolved.id_columns = meta.id_fields.clone();
        }
        resolved
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            text_columns: config
                .text_columns
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLUMNS.iter().map(|s| s.to_string()).collect()),
            id_columns: config
                .id_columns
                .clone()
                .unwrap_or_else(|| DEFAULT_ID_COLUMNS.iter().map(|s| s.to_string()).collect()),
            separator: config.separator.clone(),
        }
    }
}

/// Splits a comma-separated column list, dropping blank entries.
pub fn parse_column_list(raw: &str, source: &str) -> Result<Vec<String>> {
    let columns: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        return Err(Error::Config(format!("{} lists no column names", source)));
    }
    Ok(columns)
}
