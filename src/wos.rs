//! Web of Science (Clarivate) Expanded API adapter.
//!
//! WoS queries are written with field tags (`TS=`, `TI=`, `AU=`, `DT=` ...).
//! Bare terms are wrapped in a topic search, boolean expressions get every
//! operand wrapped individually, and anything that already uses a field tag
//! is sent untouched. Year bounds go in `publishTimeSpan`, not in the query.
//!
//! Response shapes differ between the Expanded API (`QueryResult` / `Data`)
//! and the Starter API (`metadata` / `hits`); both are accepted.

use crate::error::{LitReviewError, Result};
use crate::filters::WosFilters;
use crate::provider::{
    as_entry_list, collect_title, strip_error_singleton, value_as_u64, Adapter, Credential,
    ProviderConfig,
};
use chrono::Datelike;
use regex::Regex;
use serde_json::Value;
use url::Url;

/// Lower bound used when only `year_to` is configured
const EARLIEST_YEAR: i32 = 1900;

pub struct WosAdapter {
    config: ProviderConfig,
    credential: Credential,
    operator_split: Regex,
}

impl WosAdapter {
    pub fn new(config: ProviderConfig, credential: Credential) -> Result<Self> {
        let operator_split = Regex::new(r"\s+(AND|OR)\s+")
            .map_err(|e| LitReviewError::Validation(e.to_string()))?;
        Ok(Self {
            config,
            credential,
            operator_split,
        })
    }

    /// Rewrite a free-text term into WoS field-tag syntax.
    pub fn translate_term(&self, term: &str) -> String {
        if term.contains('=') && !term.starts_with('"') {
            return term.to_string();
        }

        if !term.contains(" AND ") && !term.contains(" OR ") {
            return format!("TS=({})", term);
        }

        let mut parts = Vec::new();
        let mut last = 0;
        for caps in self.operator_split.captures_iter(term) {
            let (Some(whole), Some(op)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            parts.push(topic(&term[last..whole.start()]));
            parts.push(op.as_str().to_string());
            last = whole.end();
        }
        parts.push(topic(&term[last..]));
        parts.join(" ")
    }

    /// Translated term plus the document-type constraint.
    pub fn build_full_query(&self, term: &str, filters: &WosFilters) -> String {
        let query = self.translate_term(term);
        if filters.document_types.is_empty() {
            return query;
        }
        let types = filters
            .document_types
            .iter()
            .map(|dt| format!("DT=(\"{}\")", dt))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("{} AND ({})", query, types)
    }
}

fn topic(operand: &str) -> String {
    format!("TS=({})", operand.trim().trim_matches('"'))
}

/// `YYYY-01-01+YYYY-12-31`, open bounds defaulting to 1900 and the current year.
pub fn publish_time_span(filters: &WosFilters) -> Option<String> {
    let years = filters.years;
    if years.year_from.is_none() && years.year_to.is_none() {
        return None;
    }
    let from = years.year_from.unwrap_or(EARLIEST_YEAR);
    let to = years.year_to.unwrap_or_else(|| chrono::Local::now().year());
    Some(format!("{}-01-01+{}-12-31", from, to))
}

impl Adapter for WosAdapter {
    type Filters = WosFilters;

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn render_query_url(
        &self,
        term: &str,
        filters: &WosFilters,
        page_size: usize,
        cursor: usize,
    ) -> Result<Url> {
        let mut url = self.config.base_url()?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("usrQuery", &self.build_full_query(term, filters));
            params.append_pair("count", &self.clamp_page_size(page_size).to_string());
            params.append_pair("firstRecord", &cursor.max(1).to_string());
            params.append_pair("sortField", filters.sort_field.as_str());
            params.append_pair("databaseId", filters.database.as_str());
            if let Some(edition) = filters.edition {
                params.append_pair("edition", &edition.as_param());
            }
            if let Some(span) = publish_time_span(filters) {
                params.append_pair("publishTimeSpan", &span);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![("X-ApiKey", self.credential.expose().to_string())]
    }

    fn parse_total_count(&self, response: &Value) -> u64 {
        let found = response
            .pointer("/QueryResult/RecordsFound")
            .and_then(value_as_u64);
        match found {
            Some(n) if n > 0 => n,
            _ => response
                .pointer("/metadata/total")
                .and_then(value_as_u64)
                .or(found)
                .unwrap_or(0),
        }
    }

    fn parse_entries(&self, response: &Value) -> Vec<Value> {
        let entries = match response.pointer("/Data/Records") {
            Some(Value::Object(records)) if !records.is_empty() => match records.get("records") {
                Some(Value::Object(inner)) => as_entry_list(inner.get("REC")),
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            _ => as_entry_list(response.get("hits")),
        };
        strip_error_singleton(entries)
    }

    fn extract_titles(&self, entries: &[Value]) -> Vec<String> {
        let mut titles = Vec::new();
        for entry in entries {
            let nested = match entry.pointer("/static_data/summary/titles/title") {
                Some(Value::Array(list)) => list
                    .iter()
                    .find(|t| t.get("type").and_then(Value::as_str) == Some("item"))
                    .and_then(|t| t.get("content"))
                    .and_then(Value::as_str),
                Some(single @ Value::Object(_)) => {
                    single.get("content").and_then(Value::as_str)
                }
                _ => None,
            };
            let title = nested
                .filter(|t| !t.trim().is_empty())
                .or_else(|| entry.get("title").and_then(Value::as_str));
            collect_title(&mut titles, title);
        }
        titles
    }
}
