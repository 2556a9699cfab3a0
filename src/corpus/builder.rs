use crate::config::MatchConfig;
use crate::error::{Error, Result};
use crate::models::paper::{Corpus, Paper, RowRecord};

/// Column positions resolved once against a corpus header.
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    text_columns: Vec<usize>,
    id_columns: Vec<usize>,
    separator: String,
}

impl PaperBuilder {
    /// Fails when none of the configured text columns exist. Missing some of
    /// them, or every id column, only warns.
    pub fn new(columns: &[String], config: &MatchConfig) -> Result<Self> {
        let position = |name: &String| columns.iter().position(|c| c == name);

        let (present, missing): (Vec<&String>, Vec<&String>) =
            config.text_columns.iter().partition(|c| position(*c).is_some());

        if present.is_empty() {
            return Err(Error::Corpus(format!(
                "none of the text columns {:?} are present. Found columns: {:?}",
                config.text_columns, columns
            )));
        }
        if !missing.is_empty() {
            tracing::warn!("Text columns {:?} are missing; treating them as empty", missing);
        }

        let id_columns: Vec<usize> = config.id_columns.iter().filter_map(position).collect();
        if id_columns.is_empty() {
            tracing::warn!(
                "None of the id columns {:?} are present; using row position as paper_id",
                config.id_columns
            );
        }

        Ok(Self {
            text_columns: present.into_iter().filter_map(position).collect(),
            id_columns,
            separator: config.separator.clone(),
        })
    }

    pub fn build(&self, ordinal: usize, row: &RowRecord) -> Paper {
        Paper::new(ordinal, self.resolve_id(ordinal, row), &self.concat_text(row))
    }

    pub fn build_all(&self, corpus: &Corpus) -> Vec<Paper> {
        let papers: Vec<Paper> = corpus
            .rows()
            .iter()
            .enumerate()
            .map(|(ordinal, row)| self.build(ordinal, row))
            .collect();

        if !self.id_columns.is_empty() {
            let fallbacks = corpus
                .rows()
                .iter()
                .filter(|row| self.stable_id(row).is_none())
                .count();
            if fallbacks > 0 {
                tracing::warn!("{} rows have no stable id; using row position instead", fallbacks);
            }
        }

        papers
    }

    /// First candidate id column with a non-blank value.
    fn stable_id<'r>(&self, row: &'r RowRecord) -> Option<&'r str> {
        self.id_columns
            .iter()
            .filter_map(|&idx| row.get(idx))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    fn resolve_id(&self, ordinal: usize, row: &RowRecord) -> String {
        match self.stable_id(row) {
            Some(id) => id.to_string(),
            None => ordinal.to_string(),
        }
    }

    fn concat_text(&self, row: &RowRecord) -> String {
        self.text_columns
            .iter()
            .map(|&idx| row.get(idx).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

/// Resolves columns and builds one paper per corpus row.
pub fn build_papers(corpus: &Corpus, config: &MatchConfig) -> Result<Vec<Paper>> {
    let builder = PaperBuilder::new(corpus.columns(), config)?;
    Ok(builder.build_all(corpus))
}
