use crate::config::IngestionConfig;
use crate::error::{IngestError, Result};
use crate::scanner::{FileScanner, ScannedFile};
use crate::stats::IngestStats;
use atlas_extractor::{content_hash, ParsedFile, PythonParser};
use atlas_graph::GraphSink;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What happened to one file inside a worker
enum FileOutcome {
    Parsed(ParsedFile),
    /// Content hash matched the version already in the sink
    Unchanged,
}

/// Walks a source tree and feeds every file's records into a [`GraphSink`]
pub struct IngestionPipeline {
    root: PathBuf,
    config: IngestionConfig,
    scanner: FileScanner,
}

impl IngestionPipeline {
    pub fn new(root: impl AsRef<Path>, config: IngestionConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(IngestError::InvalidPath(format!(
                "Path does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(IngestError::InvalidPath(format!(
                "Not a directory: {}",
                root.display()
            )));
        }
        config.validate()?;

        let scanner = FileScanner::new(&root, &config)?;
        Ok(Self {
            root,
            config,
            scanner,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Ingest every matching file under the root.
    ///
    /// Files are parsed in windows of `max_concurrency` blocking workers; the
    /// sink is only touched from this task, one file at a time, in scan order.
    /// A file that fails to read, parse or finish before `file_timeout_ms` is
    /// recorded in [`IngestStats::failures`] and the run continues. Sink
    /// errors abort the run.
    pub async fn ingest<S: GraphSink + ?Sized>(&self, sink: &mut S) -> Result<IngestStats> {
        let start = Instant::now();
        let mut stats = IngestStats::new();

        let scan = self.scanner.scan();
        for skipped in &scan.skipped {
            let relative = skipped
                .path
                .strip_prefix(&self.root)
                .unwrap_or(&skipped.path)
                .to_string_lossy()
                .replace('\\', "/");
            stats.add_skipped(relative, &skipped.reason);
        }
        stats.files_scanned = scan.files.len();

        for window in scan.files.chunks(self.config.max_concurrency) {
            let mut tasks = Vec::with_capacity(window.len());
            for file in window {
                let known_hash = sink.content_hash(&file.relative_path);
                let previously_stored = known_hash.is_some();
                let task = tokio::spawn(run_file(
                    file.clone(),
                    known_hash,
                    self.config.file_timeout_ms,
                ));
                tasks.push((file, previously_stored, task));
            }

            for (file, previously_stored, task) in tasks {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(IngestError::Other(format!("Task panicked: {e}"))),
                };

                match outcome {
                    Ok(FileOutcome::Unchanged) => {
                        log::debug!("Unchanged: {}", file.relative_path);
                        stats.add_unchanged();
                    }
                    Ok(FileOutcome::Parsed(parsed)) => {
                        if previously_stored {
                            sink.remove_file(&file.relative_path)?;
                        }
                        self.write_file(sink, &parsed)?;
                        stats.add_parsed(parsed.entities.len(), parsed.relationships.len());
                    }
                    Err(e) => {
                        log::warn!("Failed to ingest {}: {e}", file.relative_path);
                        stats.add_failure(&file.relative_path, e);
                    }
                }
            }
        }

        stats.time_ms = start.elapsed().as_millis() as u64;
        if stats.time_ms == 0 {
            stats.time_ms = 1;
        }
        log::info!("Ingested {}: {stats}", self.root.display());
        Ok(stats)
    }

    fn write_file<S: GraphSink + ?Sized>(&self, sink: &mut S, parsed: &ParsedFile) -> Result<()> {
        for batch in parsed.entities.chunks(self.config.batch_size) {
            sink.upsert_entities(batch)?;
        }
        for batch in parsed.relationships.chunks(self.config.batch_size) {
            sink.upsert_relationships(batch)?;
        }
        Ok(())
    }
}

/// Parse one file on the blocking pool, bounded by the optional deadline.
///
/// On timeout the worker is detached; its result is discarded.
async fn run_file(
    file: ScannedFile,
    known_hash: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<FileOutcome> {
    let work = tokio::task::spawn_blocking(move || {
        parse_file(&file.path, &file.relative_path, known_hash.as_deref())
    });

    let joined = match timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), work)
            .await
            .map_err(|_| IngestError::Timeout(ms))?,
        None => work.await,
    };

    match joined {
        Ok(outcome) => outcome,
        Err(e) => Err(IngestError::Other(format!("Task panicked: {e}"))),
    }
}

fn parse_file(path: &Path, relative_path: &str, known_hash: Option<&str>) -> Result<FileOutcome> {
    let source = std::fs::read_to_string(path)?;
    if known_hash.is_some_and(|hash| hash == content_hash(&source)) {
        return Ok(FileOutcome::Unchanged);
    }

    let mut parser = PythonParser::new()?;
    let parsed = parser.parse_source(relative_path, &source)?;
    Ok(FileOutcome::Parsed(parsed))
}
