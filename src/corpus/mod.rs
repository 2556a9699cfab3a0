pub mod builder;
pub mod reader;

pub use builder::{build_papers, PaperBuilder};
pub use reader::{load_corpus, CorpusFormat};
