//! Documents produced by the crawler and the chunks stored from them.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding a record's text in the vector store.
pub const TEXT_KEY: &str = "text";

/// How a document was obtained. Each kind has its own splitting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Html,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }
}

/// Metadata carried by a document and every chunk cut from it.
///
/// Field names on the wire follow what the answer metadata exposes
/// (`type`, `source`, `title`, `page`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "type")]
    pub kind: DocumentKind,

    #[serde(rename = "source")]
    pub source_url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub namespace: String,

    /// Owning company for company-uploaded material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// 0-based page index, PDF only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Character offset of a chunk inside its HTML parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
}

impl DocumentMetadata {
    pub fn html(source_url: impl Into<String>, title: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Html,
            source_url: source_url.into(),
            title: title.into(),
            namespace: namespace.into(),
            company: None,
            page: None,
            start_offset: None,
        }
    }

    pub fn pdf(source_url: impl Into<String>, page: u32, namespace: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Pdf,
            source_url: source_url.into(),
            title: String::new(),
            namespace: namespace.into(),
            company: None,
            page: Some(page),
            start_offset: None,
        }
    }

    /// Attach a company. Blank names are treated as absent.
    pub fn with_company(mut self, company: Option<&str>) -> Self {
        self.company = company
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// A crawled page (HTML) or page of a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Flatten into the metadata map stored alongside a vector.
    pub fn to_record_metadata(&self) -> Map<String, Value> {
        let mut map = match serde_json::to_value(&self.metadata) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(TEXT_KEY.to_string(), Value::String(self.content.clone()));
        map
    }

    /// Rebuild a document from stored record metadata.
    pub fn from_record_metadata(metadata: &Map<String, Value>) -> serde_json::Result<Self> {
        let content = metadata
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut rest = metadata.clone();
        rest.remove(TEXT_KEY);
        let metadata: DocumentMetadata = serde_json::from_value(Value::Object(rest))?;
        Ok(Self { content, metadata })
    }

    /// Render as a `DocMetadata: ...\nDocContent: ...` block for prompts.
    pub fn serialize_for_prompt(&self) -> String {
        let metadata = serde_json::to_string(&self.metadata).unwrap_or_default();
        format!("DocMetadata: {}\nDocContent: {}", metadata, self.content)
    }
}

/// Join documents into one prompt blob, blocks separated by a blank line.
pub fn serialize_documents(docs: &[Document]) -> String {
    docs.iter()
        .map(Document::serialize_for_prompt)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A bounded excerpt of one document. The unit stored in the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,

    /// Character range inside the parent document.
    pub span: Range<usize>,
}

impl Chunk {
    pub fn as_document(&self) -> Document {
        Document::new(self.content.clone(), self.metadata.clone())
    }
}
