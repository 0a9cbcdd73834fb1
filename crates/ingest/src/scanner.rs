use crate::config::IngestionConfig;
use crate::error::{IngestError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Source file selected for ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Root-relative, `/`-separated; becomes the file's qualified name
    pub relative_path: String,
}

/// File matched by the patterns but rejected by the scanner
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: IngestError,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// Sorted by relative path
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Scanner for finding source files under an ingestion root (.gitignore aware)
pub struct FileScanner {
    root: PathBuf,
    canonical_root: PathBuf,
    patterns: GlobSet,
    follow_symlinks: bool,
    max_file_size: u64,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, config: &IngestionConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let canonical_root = root.canonicalize().map_err(|e| {
            IngestError::InvalidPath(format!("{}: {e}", root.display()))
        })?;

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| IngestError::InvalidConfig(format!("bad glob '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let patterns = builder
            .build()
            .map_err(|e| IngestError::InvalidConfig(format!("bad glob set: {e}")))?;

        Ok(Self {
            root,
            canonical_root,
            patterns,
            follow_symlinks: config.follow_symlinks,
            max_file_size: config.max_file_size_bytes(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and collect every matching file
    pub fn scan(&self) -> ScanResult {
        let mut result = ScanResult::default();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // do not ingest hidden files by default
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(self.follow_symlinks);

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let relative_path = self.normalize_path(path);
            if !self.patterns.is_match(&relative_path) {
                continue;
            }

            if let Err(reason) = self.check_contained(path) {
                log::warn!("Skipping {}: {reason}", path.display());
                result.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason,
                });
                continue;
            }

            if let Ok(meta) = entry.metadata() {
                if meta.len() > self.max_file_size {
                    log::debug!(
                        "Skipping large file {} ({} bytes > {})",
                        path.display(),
                        meta.len(),
                        self.max_file_size
                    );
                    result.skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        reason: IngestError::Other(format!(
                            "file exceeds size limit ({} > {} bytes)",
                            meta.len(),
                            self.max_file_size
                        )),
                    });
                    continue;
                }
            }

            result.files.push(ScannedFile {
                path: path.to_path_buf(),
                relative_path,
            });
        }

        result
            .files
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        log::info!(
            "Found {} source files ({} skipped)",
            result.files.len(),
            result.skipped.len()
        );
        result
    }

    /// Reject paths whose real location is outside the root
    fn check_contained(&self, path: &Path) -> Result<()> {
        let canonical = path.canonicalize()?;
        if canonical.starts_with(&self.canonical_root) {
            Ok(())
        } else {
            Err(IngestError::Security(path.to_path_buf()))
        }
    }

    fn normalize_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut normalized = relative.to_string_lossy().to_string();
        if normalized.contains('\\') {
            normalized = normalized.replace('\\', "/");
        }
        normalized
    }
}
