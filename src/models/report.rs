use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the sub-theme counts table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubthemeCount {
    pub theme: String,
    pub sub_theme: String,
    /// Distinct papers with at least one keyword hit.
    pub paper_count: usize,
    pub keyword_count: usize,
}

/// One keyword occurring in one paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubthemeMatch {
    pub paper_id: String,
    pub theme: String,
    pub sub_theme: String,
    pub keyword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperFlags {
    pub paper_id: String,
    pub flags: Vec<bool>,
}

/// Paper × sub-theme boolean table; `flags[i]` lines up with `columns[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PaperFlagsWide {
    pub columns: Vec<String>,
    pub rows: Vec<PaperFlags>,
}

impl PaperFlagsWide {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows with the given column set.
    pub fn column_total(&self, column: usize) -> usize {
        self.rows
            .iter()
            .filter(|r| r.flags.get(column).copied().unwrap_or(false))
            .count()
    }
}

/// The three derived tables of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Report {
    pub counts: Vec<SubthemeCount>,
    pub hits: Vec<SubthemeMatch>,
    pub flags: PaperFlagsWide,
    pub papers_processed: usize,
    /// Ids seen on more than one input row, in order of first collision.
    pub duplicate_ids: Vec<String>,
}

impl Report {
    pub fn summary(&self) -> RunSummary {
        let matched_papers = self
            .flags
            .rows
            .iter()
            .filter(|r| r.flags.iter().any(|f| *f))
            .count();

        RunSummary {
            generated_at: Utc::now(),
            papers_processed: self.papers_processed,
            distinct_papers: self.flags.rows.len(),
            matched_papers,
            duplicate_ids: self.duplicate_ids.len(),
            total_hits: self.hits.len(),
            counts: self.counts.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub papers_processed: usize,
    pub distinct_papers: usize,
    pub matched_papers: usize,
    pub duplicate_ids: usize,
    pub total_hits: usize,
    pub counts: Vec<SubthemeCount>,
}
