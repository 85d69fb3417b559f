//! IdeaBrief and the strict five-section parser.
//!
//! The grammar: five labeled sections, in fixed order, each label at the
//! start of a line, content running until the next label. Anything before
//! `Title:`, a missing label, a duplicate, or an out-of-order label is a
//! parse error — the parser never scrapes fields out of unstructured prose.
//! That burden belongs to the repair call, which receives the literal
//! expected shape and rewrites malformed text into it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The five section labels, in required order.
pub const FIELD_LABELS: [&str; 5] = [
    "Title:",
    "Description:",
    "Justification:",
    "Methodology:",
    "Datasets/Sources:",
];

/// The literal shape supplied to the repair call.
pub const EXPECTED_SCHEMA: &str = "\
Title: [Enhanced title for the idea]
Description: [Detailed description of the idea, including the lede, newsworthy hooks, target audience, and why they should care]
Justification: [Justification for selecting this idea]
Methodology: [Methodology for producing this idea, including feasibility within a 2-week timeline]
Datasets/Sources: [Datasets, sources, technologies, and tools needed to accomplish this idea]";

/// Fully parsed five-field structured record, the terminal pipeline output.
///
/// All five fields are always present and non-null; individual fields may be
/// empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdeaBrief {
    pub title: String,
    pub description: String,
    pub justification: String,
    pub methodology: String,
    pub datasets_sources: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BriefParseError {
    #[error("empty input")]
    Empty,
    #[error("text before the '{0}' label")]
    LeadingText(&'static str),
    #[error("missing required label '{0}'")]
    MissingLabel(&'static str),
    #[error("duplicate label '{0}'")]
    DuplicateLabel(&'static str),
}

/// Parse free text as the five-section grammar.
pub fn parse_brief(text: &str) -> Result<IdeaBrief, BriefParseError> {
    if text.trim().is_empty() {
        return Err(BriefParseError::Empty);
    }

    // bodies[i] collects the lines of section i; `started` is the number of
    // sections opened so far, so FIELD_LABELS[started] is the next expected
    // label.
    let mut bodies: [Vec<&str>; 5] = Default::default();
    let mut started = 0usize;

    for line in text.lines() {
        if let Some(idx) = FIELD_LABELS.iter().position(|l| line.starts_with(l)) {
            if idx < started {
                return Err(BriefParseError::DuplicateLabel(FIELD_LABELS[idx]));
            }
            if idx > started {
                return Err(BriefParseError::MissingLabel(FIELD_LABELS[started]));
            }
            let rest = &line[FIELD_LABELS[idx].len()..];
            bodies[idx].push(rest);
            started += 1;
        } else if started == 0 {
            if !line.trim().is_empty() {
                return Err(BriefParseError::LeadingText(FIELD_LABELS[0]));
            }
        } else {
            bodies[started - 1].push(line);
        }
    }

    if started < FIELD_LABELS.len() {
        return Err(BriefParseError::MissingLabel(FIELD_LABELS[started]));
    }

    let mut fields = bodies.iter().map(|lines| lines.join("\n").trim().to_string());

    Ok(IdeaBrief {
        title: fields.next().unwrap_or_default(),
        description: fields.next().unwrap_or_default(),
        justification: fields.next().unwrap_or_default(),
        methodology: fields.next().unwrap_or_default(),
        datasets_sources: fields.next().unwrap_or_default(),
    })
}
