pub mod config;
pub mod error;
pub mod models;
pub mod taxonomy;
pub mod corpus;
pub mod analysis;
pub mod storage;

pub use config::{Config, MatchConfig};
pub use error::{Error, Result};
pub use taxonomy::load_schema;
pub use corpus::{build_papers, load_corpus};
pub use analysis::{aggregate, Aggregator, ClassificationPipeline, CompiledPattern, CompiledSchema};
pub use storage::{ReportWriter, Storage};
