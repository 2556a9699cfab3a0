use std::collections::hash_map::Entry;
use std::collections::HashMap;

use indicatif::ProgressBar;

use crate::analysis::matcher::CompiledSchema;
use crate::error::Result;
use crate::models::paper::Paper;
use crate::models::report::{PaperFlags, PaperFlagsWide, Report, SubthemeCount, SubthemeMatch};
use crate::models::schema::ThemeSchema;

/// Runs every compiled sub-theme over every paper and collects the report tables.
pub struct Aggregator<'a> {
    schema: &'a CompiledSchema,
    progress: ProgressBar,
}

impl<'a> Aggregator<'a> {
    pub fn new(schema: &'a CompiledSchema) -> Self {
        Self {
            schema,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// One pass over `papers`. Rows of the wide table are keyed by paper id:
    /// a repeated id keeps its first row and ORs later flags into it, while
    /// every keyword hit stays in the long table.
    pub fn run(&self, papers: &[Paper]) -> Report {
        let subthemes = self.schema.subthemes();
        let mut flags = PaperFlagsWide::new(self.schema.column_labels());
        let mut row_by_id: HashMap<&str, usize> = HashMap::with_capacity(papers.len());
        let mut duplicate_ids: Vec<String> = Vec::new();
        let mut hits = Vec::new();

        self.progress.set_length(papers.len() as u64);

        for paper in papers {
            let row = match row_by_id.entry(paper.paper_id.as_str()) {
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        "Duplicate paper id '{}' at row {}; merging its flags with the earlier row",
                        paper.paper_id,
                        paper.ordinal
                    );
                    if !duplicate_ids.contains(&paper.paper_id) {
                        duplicate_ids.push(paper.paper_id.clone());
                    }
                    *existing.get()
                }
                Entry::Vacant(slot) => {
                    flags.rows.push(PaperFlags {
                        paper_id: paper.paper_id.clone(),
                        flags: vec![false; subthemes.len()],
                    });
                    *slot.insert(flags.rows.len() - 1)
                }
            };

            for (column, st) in subthemes.iter().enumerate() {
                let matched = st.pattern.find_matches_folded(&paper.text);
                if matched.is_empty() {
                    continue;
                }

                hits.extend(matched.into_iter().map(|keyword| SubthemeMatch {
                    paper_id: paper.paper_id.clone(),
                    theme: st.theme.clone(),
                    sub_theme: st.sub_theme.clone(),
                    keyword: keyword.to_string(),
                }));
                flags.rows[row].flags[column] = true;
            }

            self.progress.inc(1);
        }

        self.progress.finish_and_clear();

        // One row per distinct id, so each paper counts at most once per sub-theme.
        let counts = subthemes
            .iter()
            .enumerate()
            .map(|(column, st)| SubthemeCount {
                theme: st.theme.clone(),
                sub_theme: st.sub_theme.clone(),
                paper_count: flags.column_total(column),
                keyword_count: st.keyword_count,
            })
            .collect();

        if !duplicate_ids.is_empty() {
            tracing::warn!(
                "{} paper ids occurred on more than one row; wide flags were OR-combined",
                duplicate_ids.len()
            );
        }

        tracing::info!(
            "Matched {} papers against {} sub-themes: {} keyword hits",
            papers.len(),
            subthemes.len(),
            hits.len()
        );

        Report {
            counts,
            hits,
            flags,
            papers_processed: papers.len(),
            duplicate_ids,
        }
    }
}

/// Compiles `schema` and aggregates `papers` against it.
pub fn aggregate(papers: &[Paper], schema: &ThemeSchema) -> Result<Report> {
    let compiled = CompiledSchema::compile(schema)?;
    Ok(Aggregator::new(&compiled).run(papers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{Subtheme, Theme};

    fn golden_schema() -> ThemeSchema {
        ThemeSchema::new(vec![Theme::new(
            "Theme A",
            vec![
                Subtheme::new("Sub1", &["resilience"]),
                Subtheme::new("Sub2", &["flood risk"]),
            ],
        )])
    }

    fn hit(paper: &str, theme: &str, sub: &str, keyword: &str) -> SubthemeMatch {
        SubthemeMatch {
            paper_id: paper.into(),
            theme: theme.into(),
            sub_theme: sub.into(),
            keyword: keyword.into(),
        }
    }

    #[test]
    fn test_golden_scenario() {
        let papers = vec![
            Paper::new(0, "P1", "Urban resilience and flood risk management"),
            Paper::new(1, "P2", "Unrelated topic"),
        ];

        let report = aggregate(&papers, &golden_schema()).unwrap();

        let counts: Vec<_> = report
            .counts
            .iter()
            .map(|c| (c.theme.as_str(), c.sub_theme.as_str(), c.paper_count))
            .collect();
        assert_eq!(counts, vec![("Theme A", "Sub1", 1), ("Theme A", "Sub2", 1)]);

        assert_eq!(
            report.hits,
            vec![
                hit("P1", "Theme A", "Sub1", "resilience"),
                hit("P1", "Theme A", "Sub2", "flood risk"),
            ]
        );

        assert_eq!(report.flags.columns, vec!["Sub1", "Sub2"]);
        assert_eq!(report.flags.rows[0], PaperFlags { paper_id: "P1".into(), flags: vec![true, true] });
        assert_eq!(report.flags.rows[1], PaperFlags { paper_id: "P2".into(), flags: vec![false, false] });
        assert!(report.duplicate_ids.is_empty());
    }

    #[test]
    fn test_non_ascii_keyword_hits_paper_text() {
        let schema = ThemeSchema::new(vec![Theme::new(
            "Cities",
            vec![Subtheme::new("Turkey", &["İstanbul"])],
        )]);
        let papers = vec![Paper::new(0, "P1", "Transit in İstanbul")];

        let report = aggregate(&papers, &schema).unwrap();
        assert_eq!(report.hits, vec![hit("P1", "Cities", "Turkey", "İstanbul")]);
        assert_eq!(report.counts[0].paper_count, 1);
        assert_eq!(report.flags.rows[0].flags, vec![true]);
    }

    #[test]
    fn test_counts_are_over_papers_not_keywords() {
        let schema = ThemeSchema::new(vec![Theme::new(
            "Water",
            vec![Subtheme::new("Supply", &["water", "aqueduct", "reservoir"])],
        )]);
        let papers = vec![Paper::new(0, "P1", "Water from the reservoir via aqueduct")];

        let report = aggregate(&papers, &schema).unwrap();
        assert_eq!(report.counts[0].paper_count, 1);
        assert_eq!(report.counts[0].keyword_count, 3);

        let keywords: Vec<_> = report.hits.iter().map(|h| h.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["water", "aqueduct", "reservoir"]);
    }

    #[test]
    fn test_shape_fixed_by_schema_and_corpus() {
        let schema = ThemeSchema::new(vec![
            Theme::new("A", vec![Subtheme::new("Never", &["zzz"]), Subtheme::new("Empty", &[])]),
            Theme::new("B", vec![Subtheme::new("Hit", &["city"])]),
        ]);
        let papers = vec![
            Paper::new(0, "P1", "city"),
            Paper::new(1, "P2", ""),
        ];

        let report = aggregate(&papers, &schema).unwrap();
        assert_eq!(report.counts.len(), 3);
        assert_eq!(report.counts[0].paper_count, 0);
        assert_eq!(report.counts[1].paper_count, 0);
        assert_eq!(report.counts[2].paper_count, 1);
        assert_eq!(report.flags.columns.len(), 3);
        assert_eq!(report.flags.rows.len(), 2);
        assert_eq!(report.flags.rows[1].flags, vec![false, false, false]);
    }

    #[test]
    fn test_duplicate_ids_or_combine_flags_and_keep_hits() {
        let papers = vec![
            Paper::new(0, "P1", "resilience"),
            Paper::new(1, "P2", "nothing here"),
            Paper::new(2, "P1", "flood risk"),
        ];

        let report = aggregate(&papers, &golden_schema()).unwrap();
        assert_eq!(report.duplicate_ids, vec!["P1"]);
        assert_eq!(report.papers_processed, 3);
        assert_eq!(report.flags.rows.len(), 2);
        assert_eq!(report.flags.rows[0].paper_id, "P1");
        assert_eq!(report.flags.rows[0].flags, vec![true, true]);
        assert_eq!(report.hits.len(), 2);
        assert_eq!(report.counts[0].paper_count, 1);
        assert_eq!(report.counts[1].paper_count, 1);
    }

    #[test]
    fn test_duplicate_id_hit_in_both_rows_counts_once() {
        let papers = vec![
            Paper::new(0, "P1", "resilience"),
            Paper::new(1, "P1", "more resilience"),
        ];

        let report = aggregate(&papers, &golden_schema()).unwrap();
        assert_eq!(report.hits.len(), 2);
        assert_eq!(report.counts[0].paper_count, 1);
    }

    #[test]
    fn test_flags_agree_with_hits_and_counts() {
        let schema = ThemeSchema::new(vec![
            Theme::new("Mobility", vec![Subtheme::new("Transit", &["bus", "metro"]), Subtheme::new("Walking", &["pedestrian"])]),
            Theme::new("Climate", vec![Subtheme::new("Heat", &["heat island", "Urban Heat"])]),
        ]);
        let papers = vec![
            Paper::new(0, "a", "Metro and BUS networks"),
            Paper::new(1, "b", "Pedestrian safety and the urban heat island"),
            Paper::new(2, "c", "Soil chemistry"),
            Paper::new(3, "d", "Bus stops for pedestrians"),
        ];

        let report = aggregate(&papers, &schema).unwrap();

        for row in &report.flags.rows {
            for (column, flag) in row.flags.iter().enumerate() {
                let (theme, sub) = (&report.counts[column].theme, &report.counts[column].sub_theme);
                let has_hit = report
                    .hits
                    .iter()
                    .any(|h| h.paper_id == row.paper_id && &h.theme == theme && &h.sub_theme == sub);
                assert_eq!(*flag, has_hit, "paper {} column {}", row.paper_id, column);
            }
        }

        for (column, count) in report.counts.iter().enumerate() {
            assert_eq!(count.paper_count, report.flags.column_total(column));
        }
        assert_eq!(
            report.counts.iter().map(|c| c.paper_count).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
    }

    #[test]
    fn test_run_is_deterministic() {
        let papers = vec![
            Paper::new(0, "P1", "Urban resilience and flood risk management"),
            Paper::new(1, "P2", "flood risk"),
        ];
        let compiled = CompiledSchema::compile(&golden_schema()).unwrap();
        let aggregator = Aggregator::new(&compiled);

        assert_eq!(aggregator.run(&papers), aggregator.run(&papers));
    }
}
