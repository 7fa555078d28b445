//! Line-oriented run report written to the console and a per-run log file.
//!
//! This is the human-readable progress log (tables, queries, documents per
//! key). Structured diagnostics go through `tracing` instead.

use crate::error::Result;
use crate::provider::Provider;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Width of separators and headers
pub const LINE_WIDTH: usize = 80;

pub struct LogSink {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    echo: bool,
    /// Lines kept in memory when there is no file (tests)
    captured: Vec<String>,
}

impl LogSink {
    /// Open `<log_dir>/<provider>_<mode>_<timestamp>.log` and write the banner.
    pub fn create(log_dir: &Path, provider: Provider, mode: &str) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let now = chrono::Local::now();
        let path = log_dir.join(format!(
            "{}_{}_{}.log",
            provider.id(),
            mode,
            now.format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&path)?;
        info!("Logging run to {:?}", path);

        let mut sink = Self {
            file: Some(BufWriter::new(file)),
            path: Some(path),
            echo: true,
            captured: Vec::new(),
        };
        sink.header(&format!(
            "{} API LOG - Mode: {}",
            provider.id().to_uppercase(),
            mode
        ));
        sink.write_line(format!("Timestamp: {}", now.format("%Y-%m-%d %H:%M:%S")));
        sink.separator('=');
        Ok(sink)
    }

    /// In-memory sink without console echo.
    pub fn quiet() -> Self {
        Self {
            file: None,
            path: None,
            echo: false,
            captured: Vec::new(),
        }
    }

    pub fn write_line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if self.echo {
            println!("{}", line);
        }
        match self.file.as_mut() {
            Some(file) => {
                if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                    warn!("Log file write failed, continuing on console only: {}", e);
                    self.file = None;
                }
            }
            None => self.captured.push(line.to_string()),
        }
    }

    pub fn separator(&mut self, ch: char) {
        self.write_line(ch.to_string().repeat(LINE_WIDTH));
    }

    pub fn header(&mut self, title: &str) {
        self.write_line("");
        self.separator('=');
        self.write_line(format!("  {}", title));
        self.separator('=');
    }

    /// Lines written to an in-memory sink.
    pub fn lines(&self) -> &[String] {
        &self.captured
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush the log file and return its path.
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(self.path.take())
    }
}
