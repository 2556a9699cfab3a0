use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::paper::Corpus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
}

impl CorpusFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(CorpusFormat::Csv),
            "tsv" | "tab" => Ok(CorpusFormat::Tsv),
            "json" => Ok(CorpusFormat::Json),
            "jsonl" | "ndjson" => Ok(CorpusFormat::JsonLines),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} (expected .csv, .tsv, .json, .jsonl or .ndjson)",
                path.display()
            ))),
        }
    }
}

pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let format = CorpusFormat::from_path(path)?;
    let file = std::fs::File::open(path)?;

    let corpus = match format {
        CorpusFormat::Csv => read_delimited(file, b',')?,
        CorpusFormat::Tsv => read_delimited(file, b'\t')?,
        CorpusFormat::Json => read_json(file)?,
        CorpusFormat::JsonLines => read_json_lines(BufReader::new(file))?,
    };

    tracing::info!(
        "Loaded {} rows with {} columns from {}",
        corpus.len(),
        corpus.columns().len(),
        path.display()
    );

    Ok(corpus)
}

/// Reads a delimited table with a header row. Empty cells are null.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Corpus> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut corpus = Corpus::new(columns);
    for record in reader.records() {
        let record = record?;
        corpus.push_row(
            record
                .iter()
                .map(|cell| if cell.is_empty() { None } else { Some(cell.to_string()) })
                .collect(),
        );
    }

    Ok(corpus)
}

/// Reads a JSON array of objects.
pub fn read_json<R: Read>(reader: R) -> Result<Corpus> {
    let doc: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = doc else {
        return Err(Error::Corpus("JSON corpus must be an array of objects".to_string()));
    };

    let mut corpus = Corpus::default();
    for (i, item) in items.into_iter().enumerate() {
        corpus.push_pairs(object_pairs(item, i)?);
    }
    Ok(corpus)
}

/// Reads one JSON object per line; blank lines are skipped.
pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    let mut row = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: Value = serde_json::from_str(&line)?;
        corpus.push_pairs(object_pairs(item, row)?);
        row += 1;
    }
    Ok(corpus)
}

fn object_pairs(item: Value, row: usize) -> Result<Vec<(String, Option<String>)>> {
    let Value::Object(fields) = item else {
        return Err(Error::Corpus(format!("row {} is not a JSON object", row)));
    };

    Ok(fields
        .into_iter()
        .map(|(key, value)| (key, cell_text(value)))
        .collect())
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
