//! Seed manifests listing the public sources to crawl.
//!
//! ```json
//! {
//!   "General": [{"url": "https://www.canada.ca/..."}],
//!   "provinces": [{"name": "Ontario", "docs": [{"url": "https://www.ontario.ca/..."}]}]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{HandbookError, Result};
use crate::types::config::GENERAL_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedDoc {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceSeeds {
    pub name: String,
    #[serde(default)]
    pub docs: Vec<SeedDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedManifest {
    #[serde(rename = "General", default)]
    pub general: Vec<SeedDoc>,

    #[serde(default)]
    pub provinces: Vec<ProvinceSeeds>,
}

/// One seed URL and the namespace its documents go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEntry {
    pub url: String,
    pub namespace: String,
}

impl SeedManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| HandbookError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// General seeds first, then provinces in manifest order.
    pub fn entries(&self) -> Vec<SeedEntry> {
        let general = self.general.iter().map(|d| SeedEntry {
            url: d.url.clone(),
            namespace: GENERAL_NAMESPACE.to_string(),
        });
        let provinces = self.provinces.iter().flat_map(|p| {
            p.docs.iter().map(|d| SeedEntry {
                url: d.url.clone(),
                namespace: p.name.clone(),
            })
        });
        general.chain(provinces).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_in_manifest_order() {
        let manifest = SeedManifest::from_json(
            r#"{
                "General": [{"url": "https://www.canada.ca/en/services/jobs.html"}],
                "provinces": [
                    {"name": "Ontario", "docs": [{"url": "https://www.ontario.ca/esa"}]},
                    {"name": "Alberta", "docs": [{"url": "https://www.alberta.ca/es"}, {"url": "https://www.alberta.ca/code.pdf"}]}
                ]
            }"#,
        )
        .unwrap();

        let entries = manifest.entries();
        let namespaces: Vec<&str> = entries.iter().map(|e| e.namespace.as_str()).collect();
        assert_eq!(namespaces, vec!["General", "Ontario", "Alberta", "Alberta"]);
        assert_eq!(entries[3].url, "https://www.alberta.ca/code.pdf");
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let manifest = SeedManifest::from_json("{}").unwrap();
        assert!(manifest.entries().is_empty());
    }
}
