use serde::{Deserialize, Serialize};

/// A file the pipeline could not ingest, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Statistics about an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Files selected by the scanner
    pub files_scanned: usize,

    /// Files parsed and written to the sink
    pub files_parsed: usize,

    /// Files whose content hash matched the sink's copy
    pub files_unchanged: usize,

    /// Files that failed to read, parse or finish in time
    pub files_failed: usize,

    /// Entity records written
    pub entities: usize,

    /// Relationship records written
    pub relationships: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Per-file failures, in scan order
    pub failures: Vec<FileFailure>,

    /// Files rejected by the scanner (outside the root, too large)
    pub skipped: Vec<FileFailure>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parsed(&mut self, entities: usize, relationships: usize) {
        self.files_parsed += 1;
        self.entities += entities;
        self.relationships += relationships;
    }

    pub fn add_unchanged(&mut self) {
        self.files_unchanged += 1;
    }

    pub fn add_failure(&mut self, path: impl Into<String>, error: impl ToString) {
        self.files_failed += 1;
        self.failures.push(FileFailure {
            path: path.into(),
            error: error.to_string(),
        });
    }

    pub fn add_skipped(&mut self, path: impl Into<String>, reason: impl ToString) {
        self.skipped.push(FileFailure {
            path: path.into(),
            error: reason.to_string(),
        });
    }
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files scanned: {} parsed, {} unchanged, {} failed, {} skipped; {} entities, {} relationships in {} ms",
            self.files_scanned,
            self.files_parsed,
            self.files_unchanged,
            self.files_failed,
            self.skipped.len(),
            self.entities,
            self.relationships,
            self.time_ms
        )
    }
}
