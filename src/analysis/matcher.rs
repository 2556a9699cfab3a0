//! Literal, case-insensitive keyword matching.
//!
//! Each sub-theme's keyword list compiles into one `RegexSet` of escaped
//! phrases. A single scan of a paper's text reports every keyword that
//! occurs in it, so a sub-theme costs one pass per paper regardless of how
//! many phrases it lists.
//!
//! Keywords and text go through the same [`fold_case`] before matching, so
//! the regex itself runs case-sensitive.

use std::collections::{HashMap, HashSet};

use regex::{RegexSet, RegexSetBuilder};

use crate::error::{Error, Result};
use crate::models::paper::fold_case;
use crate::models::schema::ThemeSchema;

const PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Compiled form of one sub-theme's keyword list.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Distinct keywords in schema order, as written; index `i` is pattern
    /// `i` of `set`.
    keywords: Vec<String>,
    set: RegexSet,
}

impl CompiledPattern {
    pub fn compile(keywords: &[String]) -> Result<Self> {
        Self::compile_at("keyword list", keywords)
    }

    /// Like [`CompiledPattern::compile`], naming `location` in errors and warnings.
    pub fn compile_at(location: &str, keywords: &[String]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut distinct = Vec::with_capacity(keywords.len());
        let mut folded = Vec::with_capacity(keywords.len());

        for (i, keyword) in keywords.iter().enumerate() {
            if keyword.trim().is_empty() {
                return Err(Error::schema(location, format!("keyword #{} is empty", i + 1)));
            }
            let key = fold_case(keyword);
            if seen.insert(key.clone()) {
                distinct.push(keyword.clone());
                folded.push(key);
            } else {
                tracing::debug!("{}: ignoring repeated keyword '{}'", location, keyword);
            }
        }

        if distinct.is_empty() {
            tracing::warn!("{}: empty keyword list, nothing will match", location);
            return Ok(Self {
                keywords: distinct,
                set: RegexSet::empty(),
            });
        }

        let set = RegexSetBuilder::new(folded.iter().map(|k| regex::escape(k)))
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()?;

        Ok(Self {
            keywords: distinct,
            set,
        })
    }

    /// Keywords occurring anywhere in `text`, in schema order, each at most once.
    pub fn find_matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.find_matches_folded(&fold_case(text))
    }

    /// [`CompiledPattern::find_matches`] for text already passed through
    /// [`fold_case`], such as [`Paper::text`](crate::models::Paper).
    pub fn find_matches_folded<'a>(&'a self, text: &str) -> Vec<&'a str> {
        if self.keywords.is_empty() {
            return Vec::new();
        }
        // SetMatches iterates pattern indices in ascending order.
        self.set
            .matches(text)
            .into_iter()
            .map(|i| self.keywords[i].as_str())
            .collect()
    }

    pub fn is_match(&self, text: &str) -> bool {
        !self.keywords.is_empty() && self.set.is_match(&fold_case(text))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// One sub-theme with its compiled pattern and wide-table column label.
#[derive(Debug, Clone)]
pub struct CompiledSubtheme {
    pub theme: String,
    pub sub_theme: String,
    pub label: String,
    /// Size of the keyword list as declared, repeats included.
    pub keyword_count: usize,
    pub pattern: CompiledPattern,
}

/// Immutable, fully compiled schema, built once per run.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    subthemes: Vec<CompiledSubtheme>,
}

impl CompiledSchema {
    pub fn compile(schema: &ThemeSchema) -> Result<Self> {
        let mut name_uses: HashMap<&str, usize> = HashMap::new();
        for (_, st) in schema.subthemes() {
            *name_uses.entry(st.name.as_str()).or_insert(0) += 1;
        }

        let mut subthemes = Vec::with_capacity(schema.subtheme_count());
        for (theme, st) in schema.subthemes() {
            let location = format!("theme '{}' / sub-theme '{}'", theme.name, st.name);
            let pattern = CompiledPattern::compile_at(&location, &st.keywords)?;

            let label = if st.id.is_none() && name_uses.get(st.name.as_str()).copied().unwrap_or(0) > 1 {
                format!("{} / {}", theme.name, st.name)
            } else {
                st.column_label()
            };

            subthemes.push(CompiledSubtheme {
                theme: theme.name.clone(),
                sub_theme: st.name.clone(),
                label,
                keyword_count: st.keywords.len(),
                pattern,
            });
        }

        tracing::debug!("Compiled {} sub-theme patterns", subthemes.len());
        Ok(Self { subthemes })
    }

    pub fn subthemes(&self) -> &[CompiledSubtheme] {
        &self.subthemes
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.subthemes.iter().map(|st| st.label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{Subtheme, Theme};

    fn pattern(keywords: &[&str]) -> CompiledPattern {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        CompiledPattern::compile(&keywords).unwrap()
    }

    #[test]
    fn test_case_insensitive_both_sides() {
        let p = pattern(&["Urban Mobility"]);
        assert_eq!(p.find_matches("studies of urban MOBILITY in Quito"), vec!["Urban Mobility"]);
        assert_eq!(p.find_matches("URBAN mobility"), vec!["Urban Mobility"]);
        assert!(p.find_matches("urban-mobility").is_empty());
    }

    #[test]
    fn test_non_ascii_keyword_matches_its_own_text() {
        let p = pattern(&["İstanbul", "ÉCOLE"]);
        assert_eq!(p.find_matches("Transit in İstanbul"), vec!["İstanbul"]);
        assert_eq!(p.find_matches("une école urbaine"), vec!["ÉCOLE"]);
        assert_eq!(p.find_matches_folded(&fold_case("İSTANBUL école")), vec!["İstanbul", "ÉCOLE"]);
    }

    #[test]
    fn test_repeats_differing_only_in_case_collapse() {
        let p = pattern(&["Flood", "flood"]);
        assert_eq!(p.keywords(), &["Flood".to_string()]);
        assert_eq!(p.find_matches("FLOOD"), vec!["Flood"]);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let p = pattern(&["water (reuse)", "c++", "co2.emissions"]);
        assert_eq!(p.find_matches("Grey WATER (REUSE) systems"), vec!["water (reuse)"]);
        assert_eq!(p.find_matches("written in C++"), vec!["c++"]);
        assert!(p.find_matches("water reuse").is_empty());
        assert!(p.find_matches("co2 emissions").is_empty());
    }

    #[test]
    fn test_matches_follow_schema_order() {
        let p = pattern(&["flood", "resilience", "risk"]);
        let hits = p.find_matches("risk and resilience after the flood");
        assert_eq!(hits, vec!["flood", "resilience", "risk"]);
    }

    #[test]
    fn test_overlapping_keywords_all_reported() {
        let p = pattern(&["flood risk", "risk"]);
        assert_eq!(p.find_matches("flood risk maps"), vec!["flood risk", "risk"]);
    }

    #[test]
    fn test_substring_not_word_anchored() {
        let p = pattern(&["resilien"]);
        assert!(p.is_match("resilience"));

        let anchored = pattern(&[" ai "]);
        assert!(anchored.is_match("uses ai for triage"));
        assert!(!anchored.is_match("rainfall"));
    }

    #[test]
    fn test_repeated_keyword_reported_once() {
        let p = pattern(&["flood", "flood"]);
        assert_eq!(p.keywords().len(), 1);
        assert_eq!(p.find_matches("flood"), vec!["flood"]);
    }

    #[test]
    fn test_empty_list_never_matches() {
        let p = CompiledPattern::compile(&[]).unwrap();
        assert!(p.find_matches("anything at all").is_empty());
        assert!(!p.is_match(""));
    }

    #[test]
    fn test_blank_keyword_fails() {
        let err = CompiledPattern::compile(&["ok".to_string(), "  ".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(pattern(&["resilience"]).find_matches("unrelated topic").is_empty());
    }

    #[test]
    fn test_compiled_schema_labels() {
        let mut with_id = Subtheme::new("Energy", &["solar"]);
        with_id.id = Some("3.1".to_string());

        let schema = ThemeSchema::new(vec![
            Theme::new("A", vec![Subtheme::new("Governance", &["policy"]), with_id]),
            Theme::new("B", vec![Subtheme::new("Governance", &["law"]), Subtheme::new("Water", &["river"])]),
        ]);

        let compiled = CompiledSchema::compile(&schema).unwrap();
        assert_eq!(
            compiled.column_labels(),
            vec!["A / Governance", "3.1__Energy", "B / Governance", "Water"]
        );
    }

    #[test]
    fn test_compiled_schema_error_names_subtheme() {
        let schema = ThemeSchema::new(vec![Theme::new("A", vec![Subtheme::new("S", &[""])])]);
        let err = CompiledSchema::compile(&schema).unwrap_err();
        assert!(err.to_string().contains("theme 'A' / sub-theme 'S'"));
    }
}
