//! Search orchestration for one provider run.
//!
//! A count-mode run walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Configured -> IndividualSearch -> CombinationSearch
//!      -> [TitleBackfill] -> Reported -> Idle
//! ```
//!
//! Requests are strictly sequential and every request is followed by the
//! provider's fixed delay. A failed request never aborts the run: it is
//! recorded as `count: None, error: true` and diagnosed in the run log.

use crate::error::{LitReviewError, Result, TransportError};
use crate::filters::FilterSet;
use crate::provider::{envelope_error, Adapter, Provider};
use crate::report;
use crate::sink::LogSink;
use crate::transport::{ApiRequest, Transport};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Combinations kept in the ranking and backfilled with titles
pub const TOP_N: usize = 30;

/// Keywords per combination
pub const COMBINATION_SIZE: usize = 3;

/// Upper bound on titles fetched per ranked combination
const TITLES_PER_KEY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Configured,
    IndividualSearch,
    CombinationSearch,
    TitleBackfill,
    Reported,
}

impl RunPhase {
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Configured)
                | (Configured, IndividualSearch)
                | (IndividualSearch, CombinationSearch)
                | (CombinationSearch, TitleBackfill)
                | (CombinationSearch, Reported)
                | (TitleBackfill, Reported)
                | (Reported, Idle)
        )
    }
}

/// Count for a single keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub keyword: String,
    /// Exact query sent
    pub query: String,
    pub count: Option<u64>,
    pub error: bool,
}

/// Count for an unordered 3-keyword combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinationResult {
    pub keywords: [String; COMBINATION_SIZE],
    pub query: String,
    pub count: Option<u64>,
    pub error: bool,
    /// Titles, filled only for ranked combinations
    pub documents: Vec<String>,
}

/// Everything a count-mode run produced for one provider.
#[derive(Debug, Clone)]
pub struct ProviderRun {
    pub provider: Provider,
    pub individual: Vec<SearchResult>,
    pub combinations: Vec<CombinationResult>,
    /// Indices into `combinations`, best first, at most [`TOP_N`]
    pub top: Vec<usize>,
}

impl ProviderRun {
    pub fn individual_total(&self) -> u64 {
        self.individual.iter().filter_map(|r| r.count).sum()
    }

    pub fn combination_total(&self) -> u64 {
        self.combinations.iter().filter_map(|r| r.count).sum()
    }

    /// Combinations with at least one result (ranked or not).
    pub fn with_results(&self) -> usize {
        self.combinations
            .iter()
            .filter(|c| c.count.unwrap_or(0) > 0)
            .count()
    }

    pub fn ranked(&self) -> impl Iterator<Item = &CombinationResult> + '_ {
        self.top.iter().filter_map(|&i| self.combinations.get(i))
    }
}

/// Every unordered 3-subset of `items`, in lexicographic generation order.
pub fn triples<T: Clone>(items: &[T]) -> Vec<[T; 3]> {
    let n = items.len();
    let mut out = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                out.push([items[i].clone(), items[j].clone(), items[k].clone()]);
            }
        }
    }
    out
}

/// Indices of the combinations with results, by count descending.
///
/// The sort is stable, so ties keep generation order.
pub fn rank_combinations(results: &[CombinationResult], limit: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.count.unwrap_or(0) > 0)
        .map(|(i, _)| i)
        .collect();
    ranked.sort_by(|a, b| results[*b].count.cmp(&results[*a].count));
    ranked.truncate(limit);
    ranked
}

fn quoted(keyword: &str) -> String {
    format!("\"{}\"", keyword)
}

pub struct SearchEngine<'a, T: Transport> {
    transport: &'a T,
    sink: LogSink,
    phase: RunPhase,
}

impl<'a, T: Transport> SearchEngine<'a, T> {
    pub fn new(transport: &'a T, sink: LogSink) -> Self {
        Self {
            transport,
            sink,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut LogSink {
        &mut self.sink
    }

    fn advance(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "Run phase");
        self.phase = next;
    }

    /// Close the run and flush the log; returns the log file path.
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        if self.phase == RunPhase::Reported {
            self.advance(RunPhase::Idle);
        }
        self.sink.finish()
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    async fn fetch<A: Adapter>(
        &self,
        adapter: &A,
        query: &str,
        filters: &A::Filters,
        page_size: usize,
        cursor: usize,
        verbose: bool,
    ) -> Result<Value> {
        let request = ApiRequest {
            url: adapter.render_query_url(query, filters, page_size, cursor)?,
            headers: adapter.auth_headers(),
            verbose,
            masked_param: adapter.masked_param(),
        };
        Ok(self.transport.get(&request).await?)
    }

    async fn pause<A: Adapter>(&self, adapter: &A) {
        let delay = adapter.config().request_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Write transport diagnostics to the run log.
    fn report_failure(&mut self, provider: Provider, query: &str, err: &LitReviewError) {
        warn!(provider = %provider, query = query, error = %err, "Request failed");
        self.sink.write_line(format!("  Request failed: {}", err));

        if let LitReviewError::Transport(TransportError::Status(failure)) = err {
            for (name, value) in &failure.headers {
                self.sink.write_line(format!("    {}: {}", name, value));
            }
            if let Some(remaining) = failure.header("X-RateLimit-Remaining") {
                self.sink
                    .write_line(format!("    Remaining quota: {}", remaining));
            }
            if let Some(status) = failure.header("X-ELS-Status") {
                self.sink.write_line(format!("    Elsevier status: {}", status));
            }
            if !failure.body_excerpt.is_empty() {
                self.sink
                    .write_line(format!("    Body: {}", failure.body_excerpt));
            }
            for hint in failure.hints() {
                self.sink.write_line(format!("    -> {}", hint));
            }
        }
    }

    /// Total hits for `query`, or `None` when the request failed or the
    /// provider flagged the response as an error.
    pub async fn count_results<A: Adapter>(
        &mut self,
        adapter: &A,
        query: &str,
        filters: &A::Filters,
    ) -> Option<u64> {
        match self
            .fetch(adapter, query, filters, 1, adapter.first_cursor(), false)
            .await
        {
            Ok(response) => {
                if let Some(marker) = envelope_error(&response) {
                    warn!(provider = %adapter.provider(), query = query, "Provider anomaly: {}", marker);
                    self.sink
                        .write_line(format!("  Provider reported an error: {}", marker));
                    return None;
                }
                Some(adapter.parse_total_count(&response))
            }
            Err(e) => {
                self.report_failure(adapter.provider(), query, &e);
                None
            }
        }
    }

    /// Titles from the first page of `query`.
    pub async fn get_document_titles<A: Adapter>(
        &mut self,
        adapter: &A,
        query: &str,
        filters: &A::Filters,
    ) -> Vec<String> {
        let page_size = TITLES_PER_KEY.min(adapter.config().max_per_request);
        match self
            .fetch(adapter, query, filters, page_size, adapter.first_cursor(), false)
            .await
        {
            Ok(response) if envelope_error(&response).is_none() => {
                adapter.extract_titles(&adapter.parse_entries(&response))
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                self.report_failure(adapter.provider(), query, &e);
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Count mode
    // ------------------------------------------------------------------------

    pub async fn search_individual<A: Adapter>(
        &mut self,
        adapter: &A,
        keywords: &[String],
        filters: &A::Filters,
    ) -> Vec<SearchResult> {
        self.sink.header("INDIVIDUAL RESULTS");
        for line in report::individual_header() {
            self.sink.write_line(line);
        }

        let mut results = Vec::with_capacity(keywords.len());
        let mut total = 0u64;
        for keyword in keywords {
            let query = quoted(keyword);
            let count = self.count_results(adapter, &query, filters).await;
            self.sink.write_line(report::individual_row(keyword, count));
            total += count.unwrap_or(0);
            results.push(SearchResult {
                keyword: keyword.clone(),
                query,
                count,
                error: count.is_none(),
            });
            self.pause(adapter).await;
        }

        for line in report::individual_footer(total) {
            self.sink.write_line(line);
        }
        info!(provider = %adapter.provider(), keywords = keywords.len(), total, "Individual search done");
        results
    }

    pub async fn search_combinations<A: Adapter>(
        &mut self,
        adapter: &A,
        keywords: &[String],
        filters: &A::Filters,
    ) -> Vec<CombinationResult> {
        let combos = triples(keywords);
        if combos.is_empty() {
            self.sink.write_line("");
            self.sink.write_line(format!(
                "NOTE: at least {} keywords are needed to build combinations.",
                COMBINATION_SIZE
            ));
            return Vec::new();
        }

        self.sink.header("3-KEYWORD COMBINATIONS (TRIPLES)");
        self.sink
            .write_line(format!("Possible combinations: {}", combos.len()));

        let mut results = Vec::with_capacity(combos.len());
        for (idx, keywords) in combos.into_iter().enumerate() {
            let query = keywords
                .iter()
                .map(|k| quoted(k))
                .collect::<Vec<_>>()
                .join(" AND ");
            let count = self.count_results(adapter, &query, filters).await;
            let result = CombinationResult {
                keywords,
                query,
                count,
                error: count.is_none(),
                documents: Vec::new(),
            };
            for line in report::combination_entry(idx + 1, &result) {
                self.sink.write_line(line);
            }
            results.push(result);
            self.pause(adapter).await;
        }
        results
    }

    /// Fill `documents` for the ranked combinations.
    pub async fn backfill_titles<A: Adapter>(
        &mut self,
        adapter: &A,
        combinations: &mut [CombinationResult],
        top: &[usize],
        filters: &A::Filters,
    ) {
        self.sink.write_line("");
        self.sink
            .write_line(format!("Fetching document titles for the TOP {}...", TOP_N));
        for (rank, &idx) in top.iter().enumerate() {
            let Some(query) = combinations.get(idx).map(|c| c.query.clone()) else {
                continue;
            };
            let titles = self.get_document_titles(adapter, &query, filters).await;
            self.sink.write_line(format!(
                "  Key {}: {} documents retrieved",
                rank + 1,
                titles.len()
            ));
            if let Some(c) = combinations.get_mut(idx) {
                c.documents = titles;
            }
            self.pause(adapter).await;
        }
    }

    fn echo_config<F: FilterSet>(&mut self, keywords: &[String], filters: &F) {
        self.sink.header("LOADED CONFIGURATION");
        self.sink.write_line(format!("Keywords: {}", keywords.len()));
        for (i, keyword) in keywords.iter().enumerate() {
            self.sink.write_line(format!("  {}. {}", i + 1, keyword));
        }
        self.sink.write_line("");
        self.sink.write_line("Filters:");
        for (label, value) in filters.describe() {
            self.sink.write_line(format!("  {}: {}", label, value));
        }
    }

    fn write_summary(&mut self, combinations: &[CombinationResult], top: &[usize]) {
        let total: u64 = combinations.iter().filter_map(|c| c.count).sum();
        let with_results = combinations
            .iter()
            .filter(|c| c.count.unwrap_or(0) > 0)
            .count();

        self.sink.header("COMBINATION SUMMARY");
        self.sink
            .write_line(format!("Total combinations: {}", combinations.len()));
        self.sink
            .write_line(format!("Sum of results: {}", report::thousands(total)));
        self.sink.write_line(format!(
            "Combinations with at least 1 result: {}",
            with_results
        ));

        let ranked: Vec<&CombinationResult> =
            top.iter().filter_map(|&i| combinations.get(i)).collect();
        if ranked.is_empty() {
            return;
        }

        self.sink
            .header(&format!("TOP {} COMBINATIONS BY RESULT COUNT", TOP_N));
        self.sink.write_line("");
        for line in report::top_table(&ranked) {
            self.sink.write_line(line);
        }
        self.sink.write_line("");
        self.sink.write_line("Queries sent:");
        for (i, r) in ranked.iter().enumerate() {
            self.sink.write_line(format!("  {:2}. {}", i + 1, r.query));
        }

        if ranked.iter().any(|r| !r.documents.is_empty()) {
            self.sink
                .header(&format!("DOCUMENTS FOUND PER KEY (TOP {})", TOP_N));
            self.sink.write_line("");
            for line in report::documents_by_key_lines(&ranked) {
                self.sink.write_line(line);
            }
        }
    }

    /// Individual counts, combination counts, ranking and optional title backfill.
    pub async fn run_count_mode<A: Adapter>(
        &mut self,
        adapter: &A,
        keywords: &[String],
        filters: &A::Filters,
        fetch_titles: bool,
    ) -> ProviderRun {
        let provider = adapter.provider();
        self.advance(RunPhase::Configured);
        self.sink.header(&format!(
            "COUNT MODE - {}",
            provider.display_name().to_uppercase()
        ));
        self.echo_config(keywords, filters);

        self.advance(RunPhase::IndividualSearch);
        let individual = self.search_individual(adapter, keywords, filters).await;

        self.advance(RunPhase::CombinationSearch);
        let mut combinations = self.search_combinations(adapter, keywords, filters).await;
        let top = rank_combinations(&combinations, TOP_N);

        if fetch_titles && !top.is_empty() {
            self.advance(RunPhase::TitleBackfill);
            self.backfill_titles(adapter, &mut combinations, &top, filters)
                .await;
        }

        if !combinations.is_empty() {
            self.write_summary(&combinations, &top);
        }
        self.advance(RunPhase::Reported);

        ProviderRun {
            provider,
            individual,
            combinations,
            top,
        }
    }

    // ------------------------------------------------------------------------
    // Extended mode
    // ------------------------------------------------------------------------

    /// One page of results starting at the first cursor.
    pub async fn search_page<A: Adapter>(
        &mut self,
        adapter: &A,
        query: &str,
        filters: &A::Filters,
        page_size: usize,
        verbose: bool,
    ) -> Result<Value> {
        if verbose {
            let url = adapter.render_query_url(query, filters, page_size, adapter.first_cursor())?;
            self.sink.header("REQUEST");
            self.sink.write_line(format!(
                "URL: {}",
                crate::transport::mask_credential(&url, adapter.masked_param())
            ));
        }
        let result = self
            .fetch(adapter, query, filters, page_size, adapter.first_cursor(), verbose)
            .await;
        if let Err(e) = &result {
            self.report_failure(adapter.provider(), query, e);
        }
        result
    }

    /// Page through `query` until the results run out, the reported total is
    /// reached, `max_results` is reached, or a request fails.
    pub async fn search_all<A: Adapter>(
        &mut self,
        adapter: &A,
        query: &str,
        filters: &A::Filters,
        max_results: usize,
    ) -> Vec<Value> {
        let mut entries: Vec<Value> = Vec::new();
        if max_results == 0 {
            return entries;
        }

        self.sink.header("PAGINATED SEARCH");
        self.sink.write_line(format!("Query: {}", query));
        self.sink
            .write_line(format!("Maximum results: {}", max_results));

        let mut cursor = adapter.first_cursor();
        let mut target: Option<usize> = None;
        let mut page = 0usize;

        loop {
            let remaining = max_results.saturating_sub(entries.len());
            if remaining == 0 {
                break;
            }
            let page_size = adapter.config().max_per_request.min(remaining);

            let response = match self
                .fetch(adapter, query, filters, page_size, cursor, false)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    self.sink
                        .write_line(format!("Error on page {}:", page + 1));
                    self.report_failure(adapter.provider(), query, &e);
                    break;
                }
            };
            if let Some(marker) = envelope_error(&response) {
                self.sink
                    .write_line(format!("Error on page {}: {}", page + 1, marker));
                break;
            }

            let limit = match target {
                Some(limit) => limit,
                None => {
                    let total = adapter.parse_total_count(&response);
                    self.sink
                        .write_line(format!("Total available: {}", report::thousands(total)));
                    let limit = usize::try_from(total)
                        .unwrap_or(usize::MAX)
                        .min(max_results);
                    target = Some(limit);
                    limit
                }
            };

            let page_entries = adapter.parse_entries(&response);
            if page_entries.is_empty() {
                break;
            }
            page += 1;
            let received = page_entries.len();
            entries.extend(page_entries);
            self.sink.write_line(format!(
                "  Page {}: {} records (accumulated: {})",
                page,
                received,
                entries.len()
            ));

            if entries.len() >= limit {
                break;
            }
            cursor = adapter.next_cursor(cursor, page_size);
            self.pause(adapter).await;
        }

        entries.truncate(max_results);
        self.sink.write_line("");
        self.sink
            .write_line(format!("Total retrieved: {}", entries.len()));
        entries
    }
}
