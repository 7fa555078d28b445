//! # rustlitreview
//!
//! Keyword and keyword-combination counts across Scopus, IEEE Xplore and
//! Web of Science, for scoping a systematic literature review.
//!
//! ## Modules
//!
//! - [`provider`] - Provider tags, configuration and the [`provider::Adapter`] contract
//! - [`scopus`], [`ieee`], [`wos`] - Per-provider query rendering and response parsing
//! - [`transport`] - HTTP transport with diagnostics and credential masking
//! - [`engine`] - Counting, 3-keyword combinations, ranking and pagination
//! - [`report`] - JSON documents and the consolidated text report
//! - [`input`] - Input file loading
//! - [`sink`] - Per-run log file
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustlitreview::engine::SearchEngine;
//! use rustlitreview::ieee::IeeeAdapter;
//! use rustlitreview::input::InputConfig;
//! use rustlitreview::provider::{Credential, Provider, ProviderConfig};
//! use rustlitreview::sink::LogSink;
//! use rustlitreview::transport::HttpTransport;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let input = InputConfig::load(Path::new("definitions/input.json"))?;
//!     let config = ProviderConfig::new(Provider::Ieee, Path::new("outputs"));
//!     let adapter = IeeeAdapter::new(config.clone(), Credential::from_env(&config)?);
//!     let transport = HttpTransport::new()?;
//!
//!     let mut engine = SearchEngine::new(&transport, LogSink::quiet());
//!     let run = engine
//!         .run_count_mode(&adapter, &input.keywords, &input.ieee, true)
//!         .await;
//!     println!("{} combinations with results", run.with_results());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod filters;
pub mod ieee;
pub mod input;
pub mod provider;
pub mod report;
pub mod scopus;
pub mod sink;
pub mod transport;
pub mod wos;

pub use error::{LitReviewError, Result};
