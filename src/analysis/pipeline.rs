use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::analysis::aggregator::Aggregator;
use crate::analysis::matcher::CompiledSchema;
use crate::config::{Config, MatchConfig};
use crate::corpus::{load_corpus, PaperBuilder};
use crate::error::Result;
use crate::models::{Report, RunSummary};
use crate::storage::{ReportWriter, Storage};
use crate::taxonomy::load_schema;

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub summary: RunSummary,
    pub written: Vec<PathBuf>,
    pub run_id: Option<i64>,
}

/// Load schema and corpus, match, then write the report tables.
///
/// Every fatal schema, corpus or database-open problem surfaces before the
/// first output file is touched.
pub struct ClassificationPipeline {
    config: Config,
    show_progress: bool,
}

impl ClassificationPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn run(&self, input: &Path, schema_path: &Path) -> Result<RunOutcome> {
        // Step 1: Load and compile the schema
        let schema = load_schema(schema_path)?;
        let compiled = CompiledSchema::compile(&schema)?;

        // Step 2: Load the corpus and resolve its columns
        let corpus = load_corpus(input)?;
        let match_config = MatchConfig::resolve(&self.config, &schema.meta);
        tracing::debug!("Text columns: {:?}", match_config.text_columns);
        let builder = PaperBuilder::new(corpus.columns(), &match_config)?;

        // Step 3: Build papers and match them
        let papers = builder.build_all(&corpus);
        if papers.is_empty() {
            tracing::warn!("Corpus {} has no rows", input.display());
        }
        let report = Aggregator::new(&compiled)
            .with_progress(self.progress_bar(papers.len()))
            .run(&papers);

        // Step 4: Open the database before touching the output directory
        let storage = match &self.config.database_path {
            Some(db_path) => Some(Storage::new(db_path)?),
            None => None,
        };

        // Step 5: Write outputs
        let written = ReportWriter::new(&self.config.output_dir).write(&report)?;

        let run_id = match storage {
            Some(storage) => Some(storage.save_report(
                &report,
                &input.display().to_string(),
                &schema_path.display().to_string(),
            )?),
            None => None,
        };

        let summary = report.summary();
        Ok(RunOutcome {
            report,
            summary,
            written,
            run_id,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} papers")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::report_writer::{COUNTS_FILE, FLAGS_FILE, HITS_FILE};
    use std::fs;

    const SCHEMA: &str = "themes:\n  Theme A:\n    Sub1: [resilience]\n    Sub2: [flood risk]\n";

    fn config(out: &Path) -> Config {
        Config {
            text_columns: Some(vec!["Article Title".to_string(), "Abstract".to_string()]),
            output_dir: out.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_end_to_end_golden_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.csv");
        let schema = dir.path().join("schema.yaml");
        let out = dir.path().join("out");
        fs::write(
            &input,
            "DOI,Article Title,Abstract\nP1,Urban resilience,and flood risk management\nP2,Unrelated topic,\n",
        )
        .unwrap();
        fs::write(&schema, SCHEMA).unwrap();

        let outcome = ClassificationPipeline::new(config(&out)).run(&input, &schema).unwrap();

        assert_eq!(outcome.written.len(), 3);
        assert_eq!(outcome.summary.papers_processed, 2);
        assert_eq!(outcome.summary.matched_papers, 1);
        assert_eq!(outcome.summary.total_hits, 2);
        assert_eq!(outcome.run_id, None);
        assert_eq!(
            fs::read_to_string(out.join(FLAGS_FILE)).unwrap(),
            "paper_id,Sub1,Sub2\nP1,true,true\nP2,false,false\n"
        );
    }

    #[test]
    fn test_schema_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.csv");
        let schema = dir.path().join("schema.yaml");
        let out = dir.path().join("out");
        fs::write(&input, "DOI,Abstract\nP1,text\n").unwrap();
        fs::write(&schema, "themes:\n  A:\n    S: [\"\"]\n").unwrap();

        let err = ClassificationPipeline::new(config(&out)).run(&input, &schema).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_text_columns_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.csv");
        let schema = dir.path().join("schema.yaml");
        let out = dir.path().join("out");
        fs::write(&input, "DOI,Notes\nP1,text\n").unwrap();
        fs::write(&schema, SCHEMA).unwrap();

        let err = ClassificationPipeline::new(config(&out)).run(&input, &schema).unwrap_err();
        assert!(matches!(err, Error::Corpus(_)));
        assert!(!out.join(COUNTS_FILE).exists());
        assert!(!out.join(HITS_FILE).exists());
    }

    #[test]
    fn test_schema_match_fields_used_without_override() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.jsonl");
        let schema = dir.path().join("schema.yaml");
        let out = dir.path().join("out");
        fs::write(
            &input,
            "{\"DOI\": \"10.1/a\", \"Summary\": \"Flood RISK\"}\n{\"DOI\": null, \"Summary\": null}\n",
        )
        .unwrap();
        fs::write(&schema, format!("meta:\n  match_fields: [Summary]\n{}", SCHEMA)).unwrap();

        let config = Config {
            output_dir: out.clone(),
            ..Config::default()
        };
        let outcome = ClassificationPipeline::new(config).run(&input, &schema).unwrap();

        let counts: Vec<_> = outcome.summary.counts.iter().map(|c| c.paper_count).collect();
        assert_eq!(counts, vec![0, 1]);
        assert_eq!(
            fs::read_to_string(out.join(FLAGS_FILE)).unwrap(),
            "paper_id,Sub1,Sub2\n10.1/a,false,true\n1,false,false\n"
        );
    }

    #[test]
    fn test_run_persists_to_database() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.csv");
        let schema = dir.path().join("schema.yaml");
        let db = dir.path().join("runs.db");
        fs::write(&input, "DOI,Abstract\nP1,resilience\n").unwrap();
        fs::write(&schema, SCHEMA).unwrap();

        let config = Config {
            text_columns: Some(vec!["Abstract".to_string()]),
            output_dir: dir.path().join("out"),
            database_path: Some(db.clone()),
            ..Config::default()
        };
        let outcome = ClassificationPipeline::new(config).run(&input, &schema).unwrap();
        let run_id = outcome.run_id.unwrap();

        let storage = Storage::new(&db).unwrap();
        assert_eq!(storage.get_counts(run_id).unwrap(), outcome.report.counts);
    }

    #[test]
    fn test_unopenable_database_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("papers.csv");
        let schema = dir.path().join("schema.yaml");
        let out = dir.path().join("out");
        fs::write(&input, "DOI,Abstract\nP1,resilience\n").unwrap();
        fs::write(&schema, SCHEMA).unwrap();

        let config = Config {
            text_columns: Some(vec!["Abstract".to_string()]),
            output_dir: out.clone(),
            database_path: Some(dir.path().join("missing_dir").join("runs.db")),
            ..Config::default()
        };
        let err = ClassificationPipeline::new(config).run(&input, &schema).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(!out.join(COUNTS_FILE).exists());
        assert!(!out.join(HITS_FILE).exists());
        assert!(!out.join(FLAGS_FILE).exists());
    }
}
