//! Routing path list loaded from a text file
//!
//! One path per line in `host:port:user:pass` form. Blank lines are
//! ignored; malformed lines are logged and skipped.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use swarm_bench_core::{RoutingPath, RoutingPathSource, SessionError};
use thiserror::Error;

/// Routing list loading error.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The file could not be read.
    #[error("failed to read routing file {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line did not match `host:port:user:pass`.
    #[error("line {line}: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// No valid paths were found.
    #[error("no valid routing paths found in {0}")]
    Empty(PathBuf),
}

/// Parse one `host:port:user:pass` line.
pub fn parse_line(line: usize, text: &str) -> Result<RoutingPath, RoutingError> {
    let invalid = |reason: String| RoutingError::InvalidLine { line, reason };

    let parts: Vec<&str> = text.split(':').collect();
    let [host, port, username, password] = parts.as_slice() else {
        return Err(invalid(format!(
            "expected host:port:user:pass, found {} fields",
            parts.len()
        )));
    };

    if host.is_empty() {
        return Err(invalid("empty host".into()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| invalid(format!("invalid port '{port}'")))?;

    Ok(RoutingPath::new(*host, port, *username, *password))
}

/// Read-only list of routing paths, selected at random.
#[derive(Debug, Clone, Default)]
pub struct ProxyList {
    paths: Vec<RoutingPath>,
}

impl ProxyList {
    /// Create a list from already-parsed paths.
    pub fn new(paths: Vec<RoutingPath>) -> Self {
        Self { paths }
    }

    /// Load a routing file.
    ///
    /// Fails when the file cannot be read or yields no valid lines.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoutingError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RoutingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::parse(&contents);
        if list.paths.is_empty() {
            return Err(RoutingError::Empty(path.to_path_buf()));
        }

        tracing::info!(count = list.paths.len(), file = %path.display(), "Loaded routing paths");
        Ok(list)
    }

    /// Parse file contents, skipping blank and malformed lines.
    pub fn parse(contents: &str) -> Self {
        let paths = contents
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = raw.trim();
                if text.is_empty() {
                    return None;
                }
                match parse_line(i + 1, text) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping invalid routing path");
                        None
                    }
                }
            })
            .collect();

        Self { paths }
    }

    /// All loaded paths.
    pub fn paths(&self) -> &[RoutingPath] {
        &self.paths
    }
}

impl RoutingPathSource for ProxyList {
    fn select(&self) -> Result<RoutingPath, SessionError> {
        self.paths
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(SessionError::RoutingPathExhausted)
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}
