use std::collections::HashMap;

/// One page of a wiki, keyed by its source filename in [`WikiStructure::pages`].
#[derive(Debug, Clone)]
pub struct WikiPage {
    pub filename: String,
    pub title: String,
    pub raw_content: String,
    pub is_special: bool,
    pub is_home: bool,
}

/// A sidebar section: a heading and the ordered pages beneath it.
#[derive(Debug, Clone)]
pub struct WikiSection {
    pub name: String,
    pub order: usize,
    pub page_filenames: Vec<String>,
}

/// The parsed shape of a cloned GitHub-style wiki, per spec §3/§4.6.
#[derive(Debug, Clone, Default)]
pub struct WikiStructure {
    pub sections: Vec<WikiSection>,
    pub pages: HashMap<String, WikiPage>,
    pub has_sidebar: bool,
}

impl WikiStructure {
    /// Invariant check: every filename referenced by a section must exist in
    /// `pages`.
    pub fn is_consistent(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|s| s.page_filenames.iter())
            .all(|f| self.pages.contains_key(f))
    }
}
