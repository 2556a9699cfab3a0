use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error at {location}: {message}")]
    Schema { location: String, message: String },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Errors caused by the user's schema or corpus rather than the environment.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            Error::Schema { .. } | Error::Corpus(_) | Error::UnsupportedFormat(_) | Error::Yaml(_)
        )
    }
}
