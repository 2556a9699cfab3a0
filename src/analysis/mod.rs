pub mod matcher;
pub mod aggregator;
pub mod pipeline;

pub use matcher::{CompiledPattern, CompiledSchema};
pub use aggregator::{aggregate, Aggregator};
pub use pipeline::{ClassificationPipeline, RunOutcome};
