//! EndNote (`%X value`) citation parsing.
//!
//! Example export:
//!
//! ```text
//! %0 Journal Article
//! %T Theoretical studies on anatase and less common TiO2 phases
//! %A De Angelis, Filippo
//! %A Di Valentin, Cristiana
//! %J Chemical reviews
//! %V 114
//! %N 19
//! %P 9708-9753
//! %@ 0009-2665
//! %D 2014
//! %I ACS Publications
//! ```

use serde::{Deserialize, Serialize};

/// Prefix marking a tagged line.
const TAG_SENTINEL: char = '%';

/// Structured citation metadata parsed from an EndNote export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(rename = "number", default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

/// Citation field a tag writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CitationField {
    Kind,
    Title,
    Author,
    Journal,
    Volume,
    Issue,
    Pages,
    Year,
    Publisher,
}

/// EndNote tag table. Tags not listed here are ignored.
const TAG_TABLE: &[(&str, CitationField)] = &[
    ("0", CitationField::Kind),
    ("T", CitationField::Title),
    ("A", CitationField::Author),
    ("J", CitationField::Journal),
    ("V", CitationField::Volume),
    ("N", CitationField::Issue),
    ("P", CitationField::Pages),
    ("D", CitationField::Year),
    ("I", CitationField::Publisher),
];

impl CitationField {
    fn for_tag(tag: &str) -> Option<Self> {
        TAG_TABLE
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, field)| *field)
    }

    fn apply(self, citation: &mut Citation, value: &str) {
        match self {
            Self::Kind => citation.kind = Some(value.to_string()),
            Self::Title => citation.title = Some(value.trim().to_string()),
            Self::Author => citation.authors.push(value.trim().to_string()),
            Self::Journal => citation.journal = Some(value.to_string()),
            Self::Volume => citation.volume = Some(value.to_string()),
            Self::Issue => citation.issue = Some(value.to_string()),
            Self::Pages => citation.pages = Some(value.to_string()),
            Self::Year => citation.year = Some(value.to_string()),
            Self::Publisher => citation.publisher = Some(value.to_string()),
        }
    }
}

/// Parse an EndNote export. Never fails; unknown or malformed lines are skipped.
pub fn parse_endnote(text: &str) -> Citation {
    let mut citation = Citation::default();

    for line in text.lines() {
        let Some(tagged) = line.strip_prefix(TAG_SENTINEL) else {
            continue;
        };
        let Some((tag, value)) = tagged.split_once(' ') else {
            continue;
        };
        if let Some(field) = CitationField::for_tag(tag) {
            field.apply(&mut citation, value);
        }
    }

    citation
}
