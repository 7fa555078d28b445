//! Scopus (Elsevier) Search API adapter.
//!
//! Year bounds and facets are folded into the boolean query text:
//! `(term) AND PUBYEAR > 2019 AND PUBYEAR < 2026`, then document types and
//! subject areas as OR-groups of `DOCTYPE(..)` / `SUBJAREA(..)` predicates.
//! Pagination is a zero-based `start` offset; the key travels in `X-ELS-APIKey`.

use crate::error::Result;
use crate::filters::ScopusFilters;
use crate::provider::{
    as_entry_list, collect_title, strip_error_singleton, value_as_u64, Adapter, Credential,
    ProviderConfig,
};
use serde_json::Value;
use url::Url;

pub struct ScopusAdapter {
    config: ProviderConfig,
    credential: Credential,
}

impl ScopusAdapter {
    pub fn new(config: ProviderConfig, credential: Credential) -> Self {
        Self { config, credential }
    }
}

/// Build the boolean query with year and facet constraints.
pub fn build_full_query(term: &str, filters: &ScopusFilters) -> String {
    let mut query = match (filters.years.year_from, filters.years.year_to) {
        (Some(from), Some(to)) => format!(
            "({}) AND PUBYEAR > {} AND PUBYEAR < {}",
            term,
            from.saturating_sub(1),
            to.saturating_add(1)
        ),
        (Some(from), None) => format!("({}) AND PUBYEAR > {}", term, from.saturating_sub(1)),
        (None, Some(to)) => format!("({}) AND PUBYEAR < {}", term, to.saturating_add(1)),
        (None, None) => term.to_string(),
    };

    if !filters.doc_types.is_empty() {
        query = format!("({}) AND ({})", query, or_group("DOCTYPE", &filters.doc_types));
    }

    if !filters.subject_areas.is_empty() {
        query = format!(
            "({}) AND ({})",
            query,
            or_group("SUBJAREA", &filters.subject_areas)
        );
    }

    query
}

fn or_group(tag: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("{}({})", tag, v))
        .collect::<Vec<_>>()
        .join(" OR ")
}

impl Adapter for ScopusAdapter {
    type Filters = ScopusFilters;

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn render_query_url(
        &self,
        term: &str,
        filters: &ScopusFilters,
        page_size: usize,
        cursor: usize,
    ) -> Result<Url> {
        let mut url = self.config.base_url()?;
        url.query_pairs_mut()
            .append_pair("query", &build_full_query(term, filters))
            .append_pair("count", &self.clamp_page_size(page_size).to_string())
            .append_pair("start", &cursor.to_string())
            .append_pair("view", "STANDARD")
            .append_pair("sort", "-citedby-count");
        Ok(url)
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![("X-ELS-APIKey", self.credential.expose().to_string())]
    }

    fn parse_total_count(&self, response: &Value) -> u64 {
        response
            .pointer("/search-results/opensearch:totalResults")
            .and_then(value_as_u64)
            .unwrap_or(0)
    }

    fn parse_entries(&self, response: &Value) -> Vec<Value> {
        strip_error_singleton(as_entry_list(response.pointer("/search-results/entry")))
    }

    fn extract_titles(&self, entries: &[Value]) -> Vec<String> {
        let mut titles = Vec::new();
        for entry in entries {
            collect_title(&mut titles, entry.get("dc:title").and_then(Value::as_str));
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SearchFilters;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;

    fn adapter() -> ScopusAdapter {
        ScopusAdapter::new(
            ProviderConfig::new(crate::provider::Provider::Scopus, Path::new("out")),
            Credential::new("scopus-test-key-0001"),
        )
    }

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_full_query_year_variants() {
        let mut filters = ScopusFilters::default();
        assert_eq!(build_full_query("\"csirt\"", &filters), "\"csirt\"");

        filters.years = SearchFilters::new(Some(2020), Some(2025));
        assert_eq!(
            build_full_query("\"csirt\"", &filters),
            "(\"csirt\") AND PUBYEAR > 2019 AND PUBYEAR < 2026"
        );

        filters.years = SearchFilters::new(Some(2020), None);
        assert_eq!(build_full_query("x", &filters), "(x) AND PUBYEAR > 2019");

        filters.years = SearchFilters::new(None, Some(2021));
        assert_eq!(build_full_query("x", &filters), "(x) AND PUBYEAR < 2022");
    }

    #[test]
    fn test_full_query_extreme_years_saturate() {
        let filters = ScopusFilters {
            years: SearchFilters::new(Some(i32::MIN), Some(i32::MAX)),
            ..Default::default()
        };
        assert_eq!(
            build_full_query("x", &filters),
            format!("(x) AND PUBYEAR > {} AND PUBYEAR < {}", i32::MIN, i32::MAX)
        );
    }

    #[test]
    fn test_full_query_facets() {
        let filters = ScopusFilters {
            years: SearchFilters::new(Some(2020), None),
            doc_types: vec!["ar".into(), "re".into()],
            subject_areas: vec!["COMP".into()],
        };
        assert_eq!(
            build_full_query("x", &filters),
            "(((x) AND PUBYEAR > 2019) AND (DOCTYPE(ar) OR DOCTYPE(re))) AND (SUBJAREA(COMP))"
        );
    }

    #[test]
    fn test_render_query_url_decodes_to_inputs() {
        let filters = ScopusFilters {
            years: SearchFilters::new(Some(2020), Some(2021)),
            doc_types: vec!["cp".into()],
            subject_areas: vec![],
        };
        let url = adapter()
            .render_query_url("\"risk management\"", &filters, 500, 50)
            .expect("url");
        let p = params(&url);

        assert_eq!(url.path(), "/content/search/scopus");
        assert_eq!(p["query"], build_full_query("\"risk management\"", &filters));
        assert_eq!(p["count"], "25");
        assert_eq!(p["start"], "50");
        assert_eq!(p["view"], "STANDARD");
        assert_eq!(p["sort"], "-citedby-count");
        assert!(!p.contains_key("apikey"));
    }

    #[test]
    fn test_credential_travels_in_header() {
        let headers = adapter().auth_headers();
        assert_eq!(headers[0].0, "X-ELS-APIKey");
        assert_eq!(headers[0].1, "scopus-test-key-0001");
        assert_eq!(adapter().masked_param(), None);
    }

    #[test]
    fn test_parse_envelope() {
        let response = json!({
            "search-results": {
                "opensearch:totalResults": "1523",
                "entry": [
                    {"dc:title": "Incident response teams"},
                    {"dc:title": "  "},
                    {"dc:title": "SOC maturity"}
                ]
            }
        });
        let a = adapter();
        assert_eq!(a.parse_total_count(&response), 1523);
        let entries = a.parse_entries(&response);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            a.extract_titles(&entries),
            vec!["Incident response teams", "SOC maturity"]
        );
    }

    #[test]
    fn test_empty_result_marker_is_no_results() {
        let response = json!({
            "search-results": {
                "opensearch:totalResults": "0",
                "entry": [{"@_fa": "true", "error": "Result set was empty"}]
            }
        });
        let a = adapter();
        assert_eq!(a.parse_total_count(&response), 0);
        assert!(a.parse_entries(&response).is_empty());
        assert_eq!(a.parse_total_count(&json!({})), 0);
    }
}
