//! IEEE Xplore Metadata API adapter.
//!
//! API Details:
//! - The key travels in the URL (`apikey`), so logged URLs are masked
//! - Year bounds are separate `start_year` / `end_year` parameters
//! - Only one `content_type` is accepted per request
//! - `start_record` is one-based, at most 200 records per request

use crate::error::Result;
use crate::filters::IeeeFilters;
use crate::provider::{
    as_entry_list, collect_title, strip_error_singleton, value_as_u64, Adapter, Credential,
    ProviderConfig,
};
use serde_json::Value;
use url::Url;

pub struct IeeeAdapter {
    config: ProviderConfig,
    credential: Credential,
}

impl IeeeAdapter {
    pub fn new(config: ProviderConfig, credential: Credential) -> Self {
        Self { config, credential }
    }
}

impl Adapter for IeeeAdapter {
    type Filters = IeeeFilters;

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn render_query_url(
        &self,
        term: &str,
        filters: &IeeeFilters,
        page_size: usize,
        cursor: usize,
    ) -> Result<Url> {
        let mut url = self.config.base_url()?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("apikey", self.credential.expose());
            params.append_pair("querytext", term);
            params.append_pair("max_records", &self.clamp_page_size(page_size).to_string());
            params.append_pair("start_record", &cursor.max(1).to_string());

            if let Some(from) = filters.years.year_from {
                params.append_pair("start_year", &from.to_string());
            }
            if let Some(to) = filters.years.year_to {
                params.append_pair("end_year", &to.to_string());
            }
            if let Some(content_type) = filters.active_content_type() {
                params.append_pair("content_type", content_type.as_str());
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn masked_param(&self) -> Option<&'static str> {
        Some("apikey")
    }

    fn parse_total_count(&self, response: &Value) -> u64 {
        response
            .get("total_records")
            .and_then(value_as_u64)
            .unwrap_or(0)
    }

    fn parse_entries(&self, response: &Value) -> Vec<Value> {
        strip_error_singleton(as_entry_list(response.get("articles")))
    }

    fn extract_titles(&self, entries: &[Value]) -> Vec<String> {
        let mut titles = Vec::new();
        for entry in entries {
            collect_title(&mut titles, entry.get("title").and_then(Value::as_str));
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{IeeeContentType, SearchFilters};
    use crate::provider::Provider;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;

    fn adapter() -> IeeeAdapter {
        IeeeAdapter::new(
            ProviderConfig::new(Provider::Ieee, Path::new("out")),
            Credential::new("ieee-secret-abcdef123456"),
        )
    }

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_render_query_url_decodes_to_inputs() {
        let filters = IeeeFilters {
            years: SearchFilters::new(Some(2020), Some(2025)),
            content_types: vec![IeeeContentType::EarlyAccess, IeeeContentType::Journals],
        };
        let term = "\"CSIRT\" AND \"risk management\"";
        let url = adapter().render_query_url(term, &filters, 25, 26).expect("url");
        let p = params(&url);

        assert_eq!(p["apikey"], "ieee-secret-abcdef123456");
        assert_eq!(p["querytext"], term);
        assert_eq!(p["max_records"], "25");
        assert_eq!(p["start_record"], "26");
        assert_eq!(p["start_year"], "2020");
        assert_eq!(p["end_year"], "2025");
        assert_eq!(p["content_type"], "Early Access");
        assert_eq!(url.query_pairs().filter(|(k, _)| k == "content_type").count(), 1);
    }

    #[test]
    fn test_open_filters_omit_parameters() {
        let url = adapter()
            .render_query_url("x", &IeeeFilters::default(), 1000, 0)
            .expect("url");
        let p = params(&url);
        assert_eq!(p["max_records"], "200");
        assert_eq!(p["start_record"], "1");
        assert!(!p.contains_key("start_year"));
        assert!(!p.contains_key("end_year"));
        assert!(!p.contains_key("content_type"));
    }

    #[test]
    fn test_credential_travels_in_url() {
        let a = adapter();
        assert!(a.auth_headers().is_empty());
        assert_eq!(a.masked_param(), Some("apikey"));
    }

    #[test]
    fn test_parse_envelope() {
        let response = json!({
            "total_records": 42,
            "total_searched": 6000000,
            "articles": [{"title": "Cyber ranges"}, {"article_number": "1"}]
        });
        let a = adapter();
        assert_eq!(a.parse_total_count(&response), 42);
        let entries = a.parse_entries(&response);
        assert_eq!(entries.len(), 2);
        assert_eq!(a.extract_titles(&entries), vec!["Cyber ranges"]);

        assert_eq!(a.parse_total_count(&json!({"total_records": "7"})), 7);
        assert!(a.parse_entries(&json!({"total_records": 0})).is_empty());
    }
}
