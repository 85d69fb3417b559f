//! Idea and RefinedIdea text blobs, and title-based selection.

use serde::{Deserialize, Serialize};

/// Label prefix that opens every idea and refined idea.
pub const TITLE_PREFIX: &str = "Title:";

/// Raw brainstormed text from the generation stage.
///
/// Opaque apart from the expectation that it opens with a `Title:` marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Idea(String);

impl Idea {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Idea text enhanced and restructured by the evaluation stage into five
/// labeled sections. The first line, stripped of its `Title:` prefix, is the
/// display title — the only field selection relies on structurally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RefinedIdea(String);

impl RefinedIdea {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// The display title: first line with the `Title:` prefix stripped.
    pub fn display_title(&self) -> &str {
        let first_line = self.0.lines().next().unwrap_or("").trim();
        first_line
            .strip_prefix(TITLE_PREFIX)
            .unwrap_or(first_line)
            .trim()
    }
}

/// Filter refined ideas down to those whose display title appears in the
/// user's selection, preserving the refined-idea order.
pub fn select_by_titles(refined: &[RefinedIdea], titles: &[String]) -> Vec<RefinedIdea> {
    refined
        .iter()
        .filter(|r| titles.iter().any(|t| t == r.display_title()))
        .cloned()
        .collect()
}
