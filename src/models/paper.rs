use serde::{Deserialize, Serialize};

/// Rows of a tabular corpus sharing one column header.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    columns: Vec<String>,
    rows: Vec<RowRecord>,
}

/// One input row; values are positional against the corpus columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    values: Vec<Option<String>>,
}

impl Corpus {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a corpus from `(column, value)` rows, unioning columns in first-seen order.
    pub fn from_pairs<I, R, K>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let mut corpus = Corpus::default();
        for row in rows {
            let pairs: Vec<(String, Option<String>)> =
                row.into_iter().map(|(k, v)| (k.into(), v)).collect();
            corpus.push_pairs(pairs);
        }
        corpus
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, mut values: Vec<Option<String>>) {
        values.resize(self.columns.len(), None);
        self.rows.push(RowRecord { values });
    }

    pub(crate) fn push_pairs(&mut self, pairs: Vec<(String, Option<String>)>) {
        let mut values = vec![None; self.columns.len()];
        for (key, value) in pairs {
            let idx = match self.column_index(&key) {
                Some(idx) => idx,
                None => {
                    self.columns.push(key);
                    for row in &mut self.rows {
                        row.values.push(None);
                    }
                    values.push(None);
                    self.columns.len() - 1
                }
            };
            values[idx] = value;
        }
        self.rows.push(RowRecord { values });
    }
}

impl RowRecord {
    /// Value at a resolved column position; `None` for null or short rows.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// The one case fold applied to both paper text and keywords.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// A corpus row reduced to what the matcher needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    /// Zero-based position in the input.
    pub ordinal: usize,
    pub paper_id: String,
    /// Case-folded concatenation of the configured text fields.
    pub text: String,
}

impl Paper {
    pub fn new(ordinal: usize, paper_id: impl Into<String>, text: &str) -> Self {
        Self {
            ordinal,
            paper_id: paper_id.into(),
            text: fold_case(text),
        }
    }
}
