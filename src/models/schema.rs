use serde::{Deserialize, Serialize};

/// Theme → sub-theme → keyword hierarchy, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThemeSchema {
    pub themes: Vec<Theme>,
    pub meta: SchemaMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub id: Option<String>,
    pub name: String,
    pub subthemes: Vec<Subtheme>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtheme {
    pub id: Option<String>,
    pub name: String,
    pub keywords: Vec<String>,
}

/// Optional schema-level defaults for the corpus columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchemaMeta {
    pub match_fields: Vec<String>,
    pub id_fields: Vec<String>,
}

impl ThemeSchema {
    pub fn new(themes: Vec<Theme>) -> Self {
        Self {
            themes,
            meta: SchemaMeta::default(),
        }
    }

    /// Every (theme, sub-theme) pair in schema order.
    pub fn subthemes(&self) -> impl Iterator<Item = (&Theme, &Subtheme)> {
        self.themes
            .iter()
            .flat_map(|theme| theme.subthemes.iter().map(move |st| (theme, st)))
    }

    pub fn subtheme_count(&self) -> usize {
        self.themes.iter().map(|t| t.subthemes.len()).sum()
    }

    pub fn keyword_count(&self) -> usize {
        self.subthemes().map(|(_, st)| st.keywords.len()).sum()
    }
}

impl Theme {
    pub fn new(name: impl Into<String>, subthemes: Vec<Subtheme>) -> Self {
        Self {
            id: None,
            name: name.into(),
            subthemes,
        }
    }
}

impl Subtheme {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            id: None,
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Header used for this sub-theme's column in the wide flags table.
    pub fn column_label(&self) -> String {
        match &self.id {
            Some(id) => format!("{}__{}", id, self.name),
            None => self.name.clone(),
        }
    }
}
