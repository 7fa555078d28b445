//! End-to-end runs against a local mock HTTP server.

use mockito::Matcher;
use rustlitreview::engine::SearchEngine;
use rustlitreview::filters::{FilterSet, IeeeFilters, ScopusFilters, SearchFilters};
use rustlitreview::ieee::IeeeAdapter;
use rustlitreview::input::InputConfig;
use rustlitreview::provider::{Credential, Provider, ProviderConfig};
use rustlitreview::report::{self, ReportMeta};
use rustlitreview::scopus::ScopusAdapter;
use rustlitreview::sink::LogSink;
use rustlitreview::transport::HttpTransport;
use rustlitreview::wos::WosAdapter;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const WOS_KEY: &str = "wos-integration-key-0001";
const IEEE_KEY: &str = "ieee-integration-key-0001";

fn config(provider: Provider, base_url: String, output_dir: &Path) -> ProviderConfig {
    ProviderConfig::new(provider, output_dir)
        .with_base_url(base_url)
        .with_request_delay(Duration::ZERO)
}

#[tokio::test]
async fn wos_count_mode_writes_reports() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/api/wos/".to_string()))
        .match_header("x-apikey", WOS_KEY)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("databaseId".into(), "WOS".into()),
            Matcher::UrlEncoded("publishTimeSpan".into(), "2020-01-01+2021-12-31".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "QueryResult": {"QueryID": 1, "RecordsSearched": 90000000, "RecordsFound": 7},
                "Data": {"Records": {"records": {"REC": {
                    "UID": "WOS:000000000000001",
                    "static_data": {"summary": {"titles": {"title": [
                        {"type": "source", "content": "COMPUTERS & SECURITY"},
                        {"type": "item", "content": "Incident response in practice"}
                    ]}}}
                }}}}
            }"#,
        )
        .expect(5)
        .create_async()
        .await;

    let out = TempDir::new().unwrap();
    let input = InputConfig::from_json(
        r#"{"keywords": ["CSIRT", "risk management", "SOC"], "year_from": 2020, "year_to": 2021}"#,
    )
    .unwrap();
    let adapter = WosAdapter::new(
        config(Provider::Wos, format!("{}/api/wos/", server.url()), out.path()),
        Credential::new(WOS_KEY),
    )
    .unwrap();
    let transport = HttpTransport::new().unwrap();

    let sink = LogSink::create(&out.path().join("logs"), Provider::Wos, "count").unwrap();
    let mut engine = SearchEngine::new(&transport, sink);
    let run = engine
        .run_count_mode(&adapter, &input.keywords, &input.wos, true)
        .await;
    let log_file = engine.finish().unwrap().unwrap();
    mock.assert_async().await;

    assert_eq!(run.individual_total(), 21);
    assert_eq!(run.combinations.len(), 1);
    assert_eq!(run.combinations[0].count, Some(7));
    assert_eq!(
        run.combinations[0].documents,
        vec!["Incident response in practice"]
    );

    let document = report::counts_document(&run, &input.wos, "input.json", "now").unwrap();
    report::write_json(&adapter_counts_file(out.path()), &document).unwrap();
    let saved: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(adapter_counts_file(out.path())).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["documents_by_key"][0]["count"], 7);
    assert_eq!(saved["filters"]["year_from"], 2020);

    let meta = ReportMeta {
        input_file: "input.json".into(),
        keyword_count: input.keywords.len(),
        years: input.years(),
        generated_at: chrono::Local::now(),
    };
    let consolidated = report::write_consolidated(out.path(), &[run], &meta).unwrap();
    let text = std::fs::read_to_string(consolidated).unwrap();
    assert!(text.contains("[WOS] TOP 30 COMBINATIONS"));
    assert!(text.contains("Incident response in practice"));

    let log = std::fs::read_to_string(log_file).unwrap();
    assert!(log.contains("TOP 30 COMBINATIONS BY RESULT COUNT"));
    assert!(!log.contains(WOS_KEY));
}

fn adapter_counts_file(dir: &Path) -> std::path::PathBuf {
    ProviderConfig::new(Provider::Wos, dir).counts_file
}

#[tokio::test]
async fn ieee_rate_limit_is_diagnosed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/api/v1/search/articles".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("apikey".into(), IEEE_KEY.into()),
            Matcher::UrlEncoded("max_records".into(), "1".into()),
        ]))
        .with_status(429)
        .with_header("X-RateLimit-Remaining", "0")
        .with_header("X-Mashery-Error-Code", "ERR_403_DEVELOPER_OVER_QPS")
        .with_body("<h1>Developer Over Qps</h1>")
        .expect(1)
        .create_async()
        .await;

    let out = TempDir::new().unwrap();
    let adapter = IeeeAdapter::new(
        config(
            Provider::Ieee,
            format!("{}/api/v1/search/articles", server.url()),
            out.path(),
        ),
        Credential::new(IEEE_KEY),
    );
    let transport = HttpTransport::new().unwrap();
    let mut engine = SearchEngine::new(&transport, LogSink::quiet());

    let count = engine
        .count_results(&adapter, "\"CSIRT\"", &IeeeFilters::default())
        .await;
    mock.assert_async().await;

    assert_eq!(count, None);
    let lines = engine.sink().lines();
    assert!(lines.iter().any(|l| l.contains("429")));
    assert!(lines.iter().any(|l| l.contains("x-ratelimit-remaining: 0")));
    assert!(lines.iter().any(|l| l.contains("Developer Over Qps")));
    assert!(lines.iter().any(|l| l.contains("Request quota exceeded")));
}

#[tokio::test]
async fn scopus_invalid_body_counts_as_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/content/search/scopus".to_string()))
        .match_header("x-els-apikey", "scopus-integration-key")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let out = TempDir::new().unwrap();
    let adapter = ScopusAdapter::new(
        config(
            Provider::Scopus,
            format!("{}/content/search/scopus", server.url()),
            out.path(),
        ),
        Credential::new("scopus-integration-key"),
    );
    let transport = HttpTransport::new().unwrap();
    let mut engine = SearchEngine::new(&transport, LogSink::quiet());

    let count = engine
        .count_results(&adapter, "\"SOC\"", &ScopusFilters::default())
        .await;
    mock.assert_async().await;
    assert_eq!(count, None);
    assert!(engine
        .sink()
        .lines()
        .iter()
        .any(|l| l.contains("Invalid JSON body")));
}

#[tokio::test]
async fn scopus_extended_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/content/search/scopus".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("count".into(), "10".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded(
                "query".into(),
                "(machine learning) AND PUBYEAR > 2022".into(),
            ),
        ]))
        .with_status(200)
        .with_body(
            r#"{"search-results": {
                "opensearch:totalResults": "2",
                "entry": [{"dc:title": "First"}, {"dc:title": "Second"}]
            }}"#,
        )
        .create_async()
        .await;

    let out = TempDir::new().unwrap();
    let adapter = ScopusAdapter::new(
        config(
            Provider::Scopus,
            format!("{}/content/search/scopus", server.url()),
            out.path(),
        ),
        Credential::new("scopus-integration-key"),
    );
    let filters = ScopusFilters::default().with_year_overrides(SearchFilters::new(Some(2023), None));
    let transport = HttpTransport::new().unwrap();
    let mut engine = SearchEngine::new(&transport, LogSink::quiet());

    let response = engine
        .search_page(&adapter, "machine learning", &filters, 10, true)
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(response["search-results"]["entry"][1]["dc:title"], "Second");
    assert!(engine.sink().lines().iter().any(|l| l.starts_with("URL: ")));
}
