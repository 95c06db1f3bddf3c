use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Joins diagnostics for one record into a single `; `-separated message.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Failures surfaced by the corpus store.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// No catalog entry with this id
    #[error("Corpus not found: {id}")]
    NotFound { id: String },

    /// Reading or writing a corpus file failed
    #[error("I/O failure on corpus '{name}' ({}): {source}", path.display())]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The catalog file exists but could not be read or decoded
    #[error("Catalog '{}' is unreadable: {message}", path.display())]
    Catalog { path: PathBuf, message: String },
}

impl CorpusError {
    pub(crate) fn io(name: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            name: name.into(),
            path: path.into(),
            source,
        }
    }
}

pub type CorpusResult<T> = Result<T, CorpusError>;

/// Failures of a single search request. Sent back as a tagged response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid corpus path pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Search panicked: {0}")]
    Panicked(String),

    #[error("Query worker is no longer running")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_joins_and_resets() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("Malformed header: [Site");
        accumulator.push("Malformed header: [Date");

        assert_eq!(
            accumulator.take().as_deref(),
            Some("Malformed header: [Site; Malformed header: [Date")
        );
        assert!(accumulator.is_empty());
    }

    #[test]
    fn test_catalog_error_names_file() {
        let err = CorpusError::Catalog {
            path: PathBuf::from("/data/catalog.json"),
            message: "expected value at line 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Catalog '/data/catalog.json' is unreadable: expected value at line 1"
        );
    }

    #[test]
    fn test_corpus_io_error_keeps_source() {
        use std::error::Error as _;

        let err = CorpusError::io("x", "/x.pgn", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("gone"));
    }

    #[test]
    fn test_query_error_messages() {
        let err = QueryError::Pattern {
            pattern: "/a/***".to_string(),
            message: "wildcards are either regular `*` or recursive `**`".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid corpus path pattern '/a/***': "));
        assert_eq!(QueryError::Panicked("boom".to_string()).to_string(), "Search panicked: boom");
        assert_eq!(QueryError::Disconnected.to_string(), "Query worker is no longer running");
    }

    #[test]
    fn test_corpus_io_error_names_corpus_and_path() {
        let err = CorpusError::io(
            "Najdorf prep",
            "/data/corpora/najdorf.pgn",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("'Najdorf prep'"));
        assert!(message.contains("/data/corpora/najdorf.pgn"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_not_found_message() {
        let err = CorpusError::NotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Corpus not found: abc");
    }
}
