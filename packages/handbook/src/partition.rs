//! Splits a combined answer into public and company parts.
//!
//! Well-formed answers follow the grammar in [`crate::engine::prompts`].
//! Anything else degrades to an unsectioned reply: the whole text becomes
//! both parts and neither is marked found.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::document::Document;

/// Source entry shown next to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub page: Option<u32>,
    pub content: String,
}

impl From<&Document> for SourceMetadata {
    fn from(doc: &Document) -> Self {
        Self {
            source: doc.metadata.source_url.clone(),
            kind: doc.metadata.kind.as_str().to_string(),
            title: doc.metadata.title.clone(),
            page: doc.metadata.page,
            content: doc.content.clone(),
        }
    }
}

/// The answer split by audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionedAnswer {
    pub public_response: String,
    pub public_found: bool,
    pub public_metadata: Vec<SourceMetadata>,
    pub private_response: String,
    pub private_found: bool,
    pub private_metadata: Vec<SourceMetadata>,
}

/// Prose of one section with its found marker removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub text: String,
    pub found: bool,
}

static PUBLIC_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\*\*public-doc\*\*:(.*?)\*\*company-doc\*\*:").expect("public section pattern")
});

static COMPANY_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*company-doc\*\*:(.*)").expect("company section pattern"));

static FOUND_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Found:\s*(Yes|No)\]").expect("found marker pattern"));

/// Extract the two sections, or `None` if either header is missing.
pub fn parse_sections(answer: &str) -> Option<(Section, Section)> {
    let public = PUBLIC_SECTION.captures(answer)?.get(1)?.as_str();
    let company = COMPANY_SECTION.captures(answer)?.get(1)?.as_str();
    Some((clean_section(public), clean_section(company)))
}

/// Strip found markers. A section is found only if its last marker says Yes.
fn clean_section(raw: &str) -> Section {
    let found = FOUND_MARKER
        .captures_iter(raw)
        .last()
        .and_then(|c| c.get(1))
        .is_some_and(|m| m.as_str() == "Yes");
    let text = FOUND_MARKER.replace_all(raw, "");
    Section {
        text: text.trim().trim_end_matches("---").trim().to_string(),
        found,
    }
}

/// Split `answer` and the documents it was generated from.
///
/// Documents whose company equals `company` exactly are private; all others
/// are public.
pub fn partition_answer(answer: &str, documents: &[Document], company: &str) -> PartitionedAnswer {
    let company = company.trim();
    let (private_docs, public_docs): (Vec<&Document>, Vec<&Document>) = documents
        .iter()
        .partition(|d| !company.is_empty() && d.metadata.company.as_deref() == Some(company));

    let (public, private) = parse_sections(answer).unwrap_or_else(|| {
        let whole = Section {
            text: answer.to_string(),
            found: false,
        };
        (whole.clone(), whole)
    });

    PartitionedAnswer {
        public_response: public.text,
        public_found: public.found,
        public_metadata: public_docs.into_iter().map(SourceMetadata::from).collect(),
        private_response: private.text,
        private_found: private.found,
        private_metadata: private_docs.into_iter().map(SourceMetadata::from).collect(),
    }
}
