//! The provider contract shared by the Scopus, IEEE Xplore and Web of Science adapters.
//!
//! A [`Provider`] tag selects the adapter; the [`Adapter`] trait is the
//! uniform render/parse/paginate surface the search engine drives. Each adapter
//! names its own filter variant as an associated type, so a filter set can only
//! ever be paired with the provider it was written for.

use crate::error::{LitReviewError, Result};
use crate::filters::FilterSet;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// The closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Scopus,
    Ieee,
    Wos,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Scopus, Provider::Ieee, Provider::Wos];

    /// Short id used in file names and report tables
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Scopus => "scopus",
            Provider::Ieee => "ieee",
            Provider::Wos => "wos",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Scopus => "Scopus",
            Provider::Ieee => "IEEE Xplore",
            Provider::Wos => "Web of Science",
        }
    }

    /// Pagination base: Scopus counts from 0, the others from record 1.
    pub fn first_cursor(&self) -> usize {
        match self {
            Provider::Scopus => 0,
            Provider::Ieee | Provider::Wos => 1,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Immutable per-provider descriptor, built once at startup.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub base_url: String,
    pub env_var: &'static str,
    /// Provider ceiling on records per request
    pub max_per_request: usize,
    pub counts_file: PathBuf,
    pub results_file: PathBuf,
    /// Fixed pause after every request
    pub request_delay: Duration,
}

impl ProviderConfig {
    pub fn new(provider: Provider, output_dir: &Path) -> Self {
        let (base_url, env_var, max_per_request, delay_ms) = match provider {
            Provider::Scopus => (
                "https://api.elsevier.com/content/search/scopus",
                "SCOPUS_API_KEY",
                25,
                250,
            ),
            Provider::Ieee => (
                "https://ieeexploreapi.ieee.org/api/v1/search/articles",
                "IEEE_API_KEY",
                200,
                500,
            ),
            Provider::Wos => (
                "https://wos-api.clarivate.com/api/wos/",
                "WOS_API_KEY",
                100,
                500,
            ),
        };

        Self {
            provider,
            base_url: base_url.to_string(),
            env_var,
            max_per_request,
            counts_file: output_dir.join(format!("{}_counts.json", provider.id())),
            results_file: output_dir.join(format!("{}_results.json", provider.id())),
            request_delay: Duration::from_millis(delay_ms),
        }
    }

    /// Point the provider at another endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }
}

/// An API key. `Debug` and `Display` only ever show the masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the provider's credential from its environment variable.
    pub fn from_env(config: &ProviderConfig) -> Result<Self> {
        std::env::var(config.env_var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
            .ok_or_else(|| LitReviewError::MissingCredential {
                provider: config.provider.display_name().to_string(),
                env_var: config.env_var.to_string(),
            })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// First 8 and last 4 characters visible; anything too short to elide is hidden.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len().max(3));
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Per-provider query rendering, envelope parsing and pagination.
///
/// Parsing is total: absent fields read as zero/empty so a malformed success
/// response degrades to "no results" instead of failing the run.
pub trait Adapter {
    type Filters: FilterSet;

    fn config(&self) -> &ProviderConfig;

    /// Fully-qualified request URL for one page of `term`.
    fn render_query_url(
        &self,
        term: &str,
        filters: &Self::Filters,
        page_size: usize,
        cursor: usize,
    ) -> Result<Url>;

    /// Headers carrying the credential, if it does not travel in the URL.
    fn auth_headers(&self) -> Vec<(&'static str, String)>;

    /// Query parameter holding the credential, masked when URLs are logged.
    fn masked_param(&self) -> Option<&'static str> {
        None
    }

    fn parse_total_count(&self, response: &Value) -> u64;

    fn parse_entries(&self, response: &Value) -> Vec<Value>;

    fn extract_titles(&self, entries: &[Value]) -> Vec<String>;

    fn provider(&self) -> Provider {
        self.config().provider
    }

    fn first_cursor(&self) -> usize {
        self.provider().first_cursor()
    }

    fn next_cursor(&self, cursor: usize, page_size: usize) -> usize {
        cursor + page_size
    }

    /// Requested page size clamped to the provider ceiling (never zero).
    fn clamp_page_size(&self, page_size: usize) -> usize {
        page_size.clamp(1, self.config().max_per_request)
    }
}

/// Read a count that may be encoded as a JSON number or a numeric string.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A result list whose only element is an error marker means "no results".
pub fn strip_error_singleton(entries: Vec<Value>) -> Vec<Value> {
    match entries.as_slice() {
        [only] if only.get("error").is_some() => Vec::new(),
        _ => entries,
    }
}

/// Take a JSON array, treating a bare object as a one-element list.
pub fn as_entry_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

/// Error marker embedded in a 2xx body, if any.
pub fn envelope_error(response: &Value) -> Option<String> {
    let marker = response
        .get("error")
        .or_else(|| response.get("service-error"))?;
    Some(match marker {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Push non-empty titles, trimmed.
pub(crate) fn collect_title(titles: &mut Vec<String>, title: Option<&str>) {
    if let Some(t) = title.map(str::trim).filter(|t| !t.is_empty()) {
        titles.push(t.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_cursor_bases() {
        assert_eq!(Provider::Scopus.first_cursor(), 0);
        assert_eq!(Provider::Ieee.first_cursor(), 1);
        assert_eq!(Provider::Wos.first_cursor(), 1);
    }

    #[test]
    fn test_provider_config_ceilings() {
        let out = Path::new("outputs");
        assert_eq!(ProviderConfig::new(Provider::Scopus, out).max_per_request, 25);
        assert_eq!(ProviderConfig::new(Provider::Ieee, out).max_per_request, 200);
        let wos = ProviderConfig::new(Provider::Wos, out);
        assert_eq!(wos.max_per_request, 100);
        assert_eq!(wos.counts_file, out.join("wos_counts.json"));
        assert_eq!(wos.env_var, "WOS_API_KEY");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh12345678wxyz"), "abcdefgh...wxyz");
        assert_eq!(mask_secret("short"), "*****");
        let credential = Credential::new("abcdefgh12345678wxyz");
        assert_eq!(format!("{:?}", credential), "Credential(abcdefgh...wxyz)");
        assert!(!credential.to_string().contains("12345678"));
    }

    #[test]
    fn test_value_as_u64() {
        assert_eq!(value_as_u64(&json!("1234")), Some(1234));
        assert_eq!(value_as_u64(&json!(56)), Some(56));
        assert_eq!(value_as_u64(&json!(null)), None);
        assert_eq!(value_as_u64(&json!("n/a")), None);
    }

    #[test]
    fn test_strip_error_singleton() {
        let empty = vec![json!({"@_fa": "true", "error": "Result set was empty"})];
        assert!(strip_error_singleton(empty).is_empty());

        let real = vec![json!({"title": "a"}), json!({"error": "x"})];
        assert_eq!(strip_error_singleton(real).len(), 2);
    }

    #[test]
    fn test_envelope_error() {
        assert_eq!(
            envelope_error(&json!({"error": "quota"})),
            Some("quota".to_string())
        );
        assert!(envelope_error(&json!({"service-error": {"status": {}}})).is_some());
        assert_eq!(envelope_error(&json!({"total_records": 3})), None);
    }
}
