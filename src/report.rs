//! Report rendering: per-provider JSON documents, fixed-width tables for the
//! run log, and the consolidated cross-provider text report.

use crate::engine::{CombinationResult, ProviderRun, COMBINATION_SIZE, TOP_N};
use crate::error::Result;
use crate::filters::{FilterSet, SearchFilters};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of the consolidated report file name
pub const CONSOLIDATED_PREFIX: &str = "output_consolidated";

const REPORT_WIDTH: usize = 100;

// ============================================================================
// Formatting helpers
// ============================================================================

/// 1234567 -> "1,234,567"
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// First `max` characters of `s`, with "..." appended when cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

fn rule(ch: char, width: usize) -> String {
    ch.to_string().repeat(width)
}

fn count_cell(count: Option<u64>) -> String {
    count.map_or_else(|| "ERROR".to_string(), thousands)
}

// ============================================================================
// Run log tables
// ============================================================================

pub fn individual_header() -> Vec<String> {
    vec![
        format!("{:<50} | {:>15}", "Keyword", "Publications"),
        rule('-', 70),
    ]
}

pub fn individual_row(keyword: &str, count: Option<u64>) -> String {
    format!("{:<50} | {:>15}", keyword, count_cell(count))
}

pub fn individual_footer(total: u64) -> Vec<String> {
    vec![
        rule('-', 70),
        format!("{:<50} | {:>15}", "INDIVIDUAL TOTAL (sum)", thousands(total)),
    ]
}

/// Progress entry for one combination request.
pub fn combination_entry(index: usize, combination: &CombinationResult) -> Vec<String> {
    let status = match combination.count {
        Some(n) => format!("{:3}. Results: {}", index, thousands(n)),
        None => format!("{:3}. ERROR", index),
    };
    vec![
        String::new(),
        status,
        format!(
            "     Keywords: [{}] AND [{}] AND [{}]",
            combination.keywords[0], combination.keywords[1], combination.keywords[2]
        ),
        format!("     Query sent: {}", combination.query),
    ]
}

/// TOP 30 table as written to the run log.
pub fn top_table(ranked: &[&CombinationResult]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{:<6} | {:>12} | {:<25} | {:<25} | {:<25}",
            "Key", "Results", "Keyword 1", "Keyword 2", "Keyword 3"
        ),
        rule('-', 102),
    ];
    for (i, r) in ranked.iter().enumerate() {
        lines.push(format!(
            "{:<6} | {:>12} | {:<25} | {:<25} | {:<25}",
            i + 1,
            count_cell(r.count),
            truncate_chars(&r.keywords[0], 24),
            truncate_chars(&r.keywords[1], 24),
            truncate_chars(&r.keywords[2], 24),
        ));
    }
    lines.push(rule('-', 102));
    lines
}

/// Documents per key as written to the run log.
pub fn documents_by_key_lines(ranked: &[&CombinationResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, r) in ranked.iter().enumerate() {
        lines.push(rule('=', 80));
        lines.push(format!("KEY {} - {} document(s)", i + 1, r.documents.len()));
        lines.push(format!("Keywords: {}", r.keywords.join(" AND ")));
        lines.push(rule('=', 80));
        if r.documents.is_empty() {
            lines.push("  (no documents retrieved)".to_string());
        } else {
            for (n, title) in r.documents.iter().enumerate() {
                lines.push(format!("  {:3}. {}", n + 1, ellipsize(title, 120)));
            }
        }
        lines.push(String::new());
    }
    lines
}

/// Closing block of a count-mode run log.
pub fn final_summary_lines(
    run: &ProviderRun,
    keyword_count: usize,
    counts_file: &Path,
    log_file: Option<&Path>,
) -> Vec<String> {
    let mut lines = vec![
        format!("Keywords analysed: {}", keyword_count),
        format!("Individual total: {}", thousands(run.individual_total())),
    ];
    if !run.combinations.is_empty() {
        lines.push(format!("Combinations (triples): {}", run.combinations.len()));
        lines.push(format!(
            "Combination total: {}",
            thousands(run.combination_total())
        ));
    }
    lines.push(String::new());
    lines.push(format!("Results saved to: {}", counts_file.display()));
    if let Some(log) = log_file {
        lines.push(format!("Log saved to: {}", log.display()));
    }
    lines
}

// ============================================================================
// JSON documents
// ============================================================================

/// The `<provider>_counts.json` document.
pub fn counts_document<F: FilterSet>(
    run: &ProviderRun,
    filters: &F,
    input_file: &str,
    timestamp: &str,
) -> Result<Value> {
    let documents_by_key = run
        .ranked()
        .enumerate()
        .map(|(i, r)| {
            json!({
                "rank": i + 1,
                "keywords": r.keywords,
                "query": r.query,
                "count": r.count,
                "documents": r.documents,
            })
        })
        .collect::<Vec<_>>();

    Ok(json!({
        "api": run.provider.id(),
        "mode": "count",
        "timestamp": timestamp,
        "input_file": input_file,
        "filters": serde_json::to_value(filters)?,
        "individual_results": {
            "keywords": serde_json::to_value(&run.individual)?,
            "total": run.individual_total(),
        },
        "combination_results": {
            "combination_size": COMBINATION_SIZE,
            "total_combinations": run.combinations.len(),
            "combinations": serde_json::to_value(&run.combinations)?,
            "total": run.combination_total(),
        },
        "documents_by_key": documents_by_key,
    }))
}

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!("Saved {:?}", path);
    Ok(())
}

// ============================================================================
// Consolidated report
// ============================================================================

/// Run-wide facts echoed at the top of the consolidated report.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub input_file: String,
    pub keyword_count: usize,
    pub years: SearchFilters,
    pub generated_at: chrono::DateTime<chrono::Local>,
}

pub fn consolidated_report(runs: &[ProviderRun], meta: &ReportMeta) -> String {
    let heavy = rule('=', REPORT_WIDTH);
    let providers = runs
        .iter()
        .map(|r| r.provider.id())
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        heavy.clone(),
        format!(
            "  TOP {} COMBINATIONS BY RESULT COUNT - CONSOLIDATED REPORT",
            TOP_N
        ),
        heavy.clone(),
        String::new(),
        format!(
            "Date and time: {}",
            meta.generated_at.format("%Y-%m-%d %H:%M:%S")
        ),
        format!("Input file: {}", meta.input_file),
        format!("APIs executed: {}", providers),
        format!("Keywords: {}", meta.keyword_count),
        format!("Year range: {}", meta.years.describe()),
        String::new(),
    ];

    for run in runs {
        let name = run.provider.id().to_uppercase();
        let ranked: Vec<&CombinationResult> = run.ranked().collect();

        lines.push(heavy.clone());
        lines.push(format!("  [{}] TOP {} COMBINATIONS", name, TOP_N));
        lines.push(heavy.clone());
        lines.push(String::new());
        lines.push(format!(
            "Combinations with results: {}",
            run.with_results()
        ));
        lines.push(String::new());

        if ranked.is_empty() {
            lines.push("  (no combinations with results)".to_string());
            lines.push(String::new());
            continue;
        }

        lines.push(format!(
            "{:<6} | {:>12} | {:<28} | {:<28} | {:<28}",
            "Rank", "Results", "Keyword 1", "Keyword 2", "Keyword 3"
        ));
        lines.push(rule('-', 110));
        for (i, r) in ranked.iter().enumerate() {
            lines.push(format!(
                "{:<6} | {:>12} | {:<28} | {:<28} | {:<28}",
                i + 1,
                count_cell(r.count),
                truncate_chars(&r.keywords[0], 27),
                truncate_chars(&r.keywords[1], 27),
                truncate_chars(&r.keywords[2], 27),
            ));
        }
        lines.push(rule('-', 110));
        lines.push(String::new());

        lines.push("Queries sent:".to_string());
        for (i, r) in ranked.iter().enumerate() {
            lines.push(format!("  {:2}. {}", i + 1, r.query));
        }
        lines.push(String::new());

        if ranked.iter().any(|r| !r.documents.is_empty()) {
            lines.push(String::new());
            lines.push(heavy.clone());
            lines.push(format!("  [{}] DOCUMENTS PER KEY (TOP {})", name, TOP_N));
            lines.push(heavy.clone());
            for (i, r) in ranked.iter().enumerate() {
                lines.push(String::new());
                lines.push(format!(
                    "--- KEY {} ({} results) ---",
                    i + 1,
                    count_cell(r.count)
                ));
                lines.push(format!("Keywords: {}", r.keywords.join(" AND ")));
                if r.documents.is_empty() {
                    lines.push("  (no documents retrieved)".to_string());
                }
                for (n, title) in r.documents.iter().enumerate() {
                    lines.push(format!("  {:3}. {}", n + 1, ellipsize(title, 115)));
                }
            }
        }
        lines.push(String::new());
    }

    if runs.len() > 1 {
        lines.extend(global_leaderboard(runs));
    }

    lines.push(heavy.clone());
    lines.push("  END OF REPORT".to_string());
    lines.push(heavy);
    lines.join("\n")
}

/// Cross-provider TOP 30 over every combination with results.
fn global_leaderboard(runs: &[ProviderRun]) -> Vec<String> {
    let mut all: Vec<(&str, &CombinationResult)> = runs
        .iter()
        .flat_map(|run| {
            run.combinations
                .iter()
                .filter(|c| c.count.unwrap_or(0) > 0)
                .map(move |c| (run.provider.id(), c))
        })
        .collect();
    all.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    let mut lines = vec![
        rule('=', REPORT_WIDTH),
        format!("  GLOBAL TOP {} (ALL APIs)", TOP_N),
        rule('=', REPORT_WIDTH),
        String::new(),
        format!(
            "{:<6} | {:<8} | {:>12} | {:<25} | {:<25} | {:<25}",
            "Rank", "API", "Results", "Keyword 1", "Keyword 2", "Keyword 3"
        ),
        rule('-', 115),
    ];
    for (i, (api, c)) in all.iter().take(TOP_N).enumerate() {
        lines.push(format!(
            "{:<6} | {:<8} | {:>12} | {:<25} | {:<25} | {:<25}",
            i + 1,
            api,
            count_cell(c.count),
            truncate_chars(&c.keywords[0], 24),
            truncate_chars(&c.keywords[1], 24),
            truncate_chars(&c.keywords[2], 24),
        ));
    }
    lines.push(rule('-', 115));
    lines.push(String::new());
    lines
}

/// Write the consolidated report to `<output_dir>/output_consolidated_<timestamp>.txt`.
pub fn write_consolidated(
    output_dir: &Path,
    runs: &[ProviderRun],
    meta: &ReportMeta,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!(
        "{}_{}.txt",
        CONSOLIDATED_PREFIX,
        meta.generated_at.format("%Y%m%d_%H%M%S")
    ));
    std::fs::write(&path, consolidated_report(runs, meta))?;
    info!("Consolidated report written to {:?}", path);
    Ok(path)
}

/// Console preview: top 5 per provider.
pub fn console_preview(runs: &[ProviderRun]) -> Vec<String> {
    let mut lines = Vec::new();
    for run in runs {
        let name = run.provider.id().to_uppercase();
        let ranked: Vec<&CombinationResult> = run.ranked().take(5).collect();
        lines.push(String::new());
        if ranked.is_empty() {
            lines.push(format!("[{}] No combinations with results", name));
            continue;
        }
        lines.push(format!(
            "[{}] TOP 5 (of {} with results):",
            name,
            run.with_results()
        ));
        for (i, r) in ranked.iter().enumerate() {
            lines.push(format!(
                "  {:2}. {} results - {}",
                i + 1,
                count_cell(r.count),
                r.keywords.join(" AND ")
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{rank_combinations, SearchResult};
    use crate::filters::WosFilters;
    use crate::provider::Provider;
    use tempfile::TempDir;

    fn combo(keywords: [&str; 3], count: Option<u64>) -> CombinationResult {
        CombinationResult {
            keywords: keywords.map(String::from),
            query: format!(
                "\"{}\" AND \"{}\" AND \"{}\"",
                keywords[0], keywords[1], keywords[2]
            ),
            count,
            error: count.is_none(),
            documents: Vec::new(),
        }
    }

    fn run(provider: Provider, combinations: Vec<CombinationResult>) -> ProviderRun {
        let top = rank_combinations(&combinations, TOP_N);
        ProviderRun {
            provider,
            individual: vec![SearchResult {
                keyword: "soc".into(),
                query: "\"soc\"".into(),
                count: Some(1200),
                error: false,
            }],
            combinations,
            top,
        }
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            input_file: "definitions/input.json".into(),
            keyword_count: 3,
            years: SearchFilters::new(Some(2020), Some(2025)),
            generated_at: chrono::Local::now(),
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_truncation_counts_characters() {
        let long = "gestión de riesgos de ciberseguridad en salud";
        assert_eq!(truncate_chars(long, 7), "gestión");
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("ñandú ñandú", 5), "ñandú...");
    }

    #[test]
    fn test_top_table_row_layout() {
        let c = combo(["a very long keyword that overflows", "b", "c"], Some(1500));
        let lines = top_table(&[&c]);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[2],
            format!(
                "{:<6} | {:>12} | {:<25} | {:<25} | {:<25}",
                1, "1,500", "a very long keyword that", "b", "c"
            )
        );
    }

    #[test]
    fn test_counts_document_shape() {
        let mut combinations = vec![
            combo(["a", "b", "c"], Some(7)),
            combo(["a", "b", "d"], None),
            combo(["a", "c", "d"], Some(0)),
        ];
        combinations[0].documents = vec!["Title".into()];
        let r = run(Provider::Wos, combinations);
        let filters = WosFilters {
            document_types: vec!["Article".into()],
            ..Default::default()
        };

        let doc = counts_document(&r, &filters, "definitions/input.json", "2025-01-01 00:00:00")
            .unwrap();
        assert_eq!(doc["api"], "wos");
        assert_eq!(doc["filters"]["document_types"][0], "Article");
        assert_eq!(doc["filters"]["database"], "WOS");
        assert_eq!(doc["individual_results"]["total"], 1200);
        assert_eq!(doc["combination_results"]["combination_size"], 3);
        assert_eq!(doc["combination_results"]["total_combinations"], 3);
        assert_eq!(doc["combination_results"]["total"], 7);
        assert_eq!(doc["combination_results"]["combinations"][1]["error"], true);
        assert!(doc["combination_results"]["combinations"][1]["count"].is_null());

        let keys = doc["documents_by_key"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["rank"], 1);
        assert_eq!(keys[0]["documents"][0], "Title");
    }

    #[test]
    fn test_consolidated_single_provider_has_no_global_section() {
        let runs = vec![run(Provider::Scopus, vec![combo(["a", "b", "c"], Some(3))])];
        let text = consolidated_report(&runs, &meta());
        assert!(text.contains("[SCOPUS] TOP 30 COMBINATIONS"));
        assert!(text.contains("Year range: 2020 - 2025"));
        assert!(text.contains("  1. \"a\" AND \"b\" AND \"c\""));
        assert!(!text.contains("GLOBAL TOP"));
        assert!(text.ends_with(&rule('=', REPORT_WIDTH)));
    }

    #[test]
    fn test_global_leaderboard_merges_providers() {
        let runs = vec![
            run(
                Provider::Scopus,
                vec![combo(["a", "b", "c"], Some(10)), combo(["a", "b", "d"], Some(40))],
            ),
            run(Provider::Ieee, vec![combo(["a", "b", "c"], Some(25))]),
            run(Provider::Wos, vec![combo(["a", "b", "c"], None)]),
        ];
        let text = consolidated_report(&runs, &meta());
        assert!(text.contains("GLOBAL TOP 30 (ALL APIs)"));
        assert!(text.contains("[WOS] TOP 30 COMBINATIONS"));
        assert!(text.contains("  (no combinations with results)"));

        let rows: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.contains("GLOBAL TOP"))
            .filter(|l| l.starts_with(|c: char| c.is_ascii_digit()))
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("scopus") && rows[0].contains("40"));
        assert!(rows[1].contains("ieee") && rows[1].contains("25"));
        assert!(rows[2].contains("scopus") && rows[2].contains("10"));
    }

    #[test]
    fn test_write_consolidated_file_name() {
        let dir = TempDir::new().unwrap();
        let runs = vec![run(Provider::Ieee, vec![])];
        let path = write_consolidated(dir.path(), &runs, &meta()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("output_consolidated_"));
        assert!(name.ends_with(".txt"));
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("APIs executed: ieee"));
    }

    #[test]
    fn test_console_preview() {
        let runs = vec![
            run(Provider::Scopus, vec![combo(["a", "b", "c"], Some(2500))]),
            run(Provider::Ieee, vec![]),
        ];
        let lines = console_preview(&runs);
        assert!(lines.contains(&"[SCOPUS] TOP 5 (of 1 with results):".to_string()));
        assert!(lines.contains(&"   1. 2,500 results - a AND b AND c".to_string()));
        assert!(lines.contains(&"[IEEE] No combinations with results".to_string()));
    }
}
