//! Input file loading (`definitions/input.json` by default).
//!
//! A missing file is replaced by an example and reported as
//! [`LitReviewError::ExampleCreated`] so the caller can stop and let the user
//! edit it.

use crate::error::{LitReviewError, Result};
use crate::filters::{IeeeFilters, ScopusFilters, SearchFilters, WosFilters};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_INPUT_FILE: &str = "definitions/input.json";

/// Keywords plus the shared year range and one filter section per provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
    #[serde(default)]
    pub scopus: ScopusFilters,
    #[serde(default)]
    pub ieee: IeeeFilters,
    #[serde(default)]
    pub wos: WosFilters,
}

impl InputConfig {
    /// Load and normalise `path`, writing an example first if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Input file not found: {:?}", path);
            write_example(path)?;
            return Err(LitReviewError::ExampleCreated(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        info!(
            "Loaded {} keywords from {:?}",
            config.keywords.len(),
            path
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)?;
        config.normalise()?;
        Ok(config)
    }

    /// Top-level year range
    pub fn years(&self) -> SearchFilters {
        SearchFilters::new(self.year_from, self.year_to)
    }

    fn normalise(&mut self) -> Result<()> {
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let removed = dedupe(&mut self.keywords);
        if removed > 0 {
            warn!("Removed {} duplicate keyword(s)", removed);
        }
        if self.keywords.is_empty() {
            return Err(LitReviewError::Config(
                "input file has no keywords".to_string(),
            ));
        }

        let years = self.years();
        self.scopus.years = self.scopus.years.or(years);
        self.ieee.years = self.ieee.years.or(years);
        self.wos.years = self.wos.years.or(years);

        for (section, range) in [
            ("top level", years),
            ("scopus", self.scopus.years),
            ("ieee", self.ieee.years),
            ("wos", self.wos.years),
        ] {
            if range.is_inverted() {
                warn!(
                    "Year range in {} is inverted ({}); passing it through unchanged",
                    section,
                    range.describe()
                );
            }
        }

        dedupe(&mut self.scopus.doc_types);
        dedupe(&mut self.scopus.subject_areas);
        dedupe(&mut self.ieee.content_types);
        dedupe(&mut self.wos.document_types);

        let unknown = self.scopus.unknown_codes();
        if !unknown.is_empty() {
            warn!("Unknown Scopus codes: {}", unknown.join(", "));
        }
        Ok(())
    }
}

/// Drop repeated items, keeping first occurrences in order; returns how many went.
fn dedupe<T: PartialEq>(items: &mut Vec<T>) -> usize {
    let before = items.len();
    let mut kept: Vec<T> = Vec::with_capacity(before);
    for item in items.drain(..) {
        if !kept.contains(&item) {
            kept.push(item);
        }
    }
    *items = kept;
    before - items.len()
}

/// Write the example input file, creating its directory.
pub fn write_example(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let example = json!({
        "keywords": ["CSIRT", "risk management", "Security Operations Center"],
        "year_from": 2020,
        "year_to": 2025,
        "scopus": {
            "doc_types": ["ar", "re", "cp"],
            "subject_areas": ["COMP", "ENGI"]
        },
        "ieee": {
            "content_types": ["Journals", "Conferences"]
        },
        "wos": {
            "database": "WOS",
            "edition": null,
            "document_types": ["Article", "Review"],
            "sort_field": "LD+D"
        }
    });
    std::fs::write(path, serde_json::to_string_pretty(&example)?)?;
    info!("Example input written to {:?}", path);
    Ok(())
}
