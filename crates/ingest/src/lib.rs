//! # Atlas Ingest
//!
//! Batch ingestion of a Python source tree into a knowledge graph.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware, root-contained)
//!     │      └─> Source files (sorted, root-relative)
//!     │
//!     ├──> PythonParser (blocking workers, optional per-file deadline)
//!     │      └─> ParsedFile { entities, relationships }
//!     │
//!     └──> GraphSink (batched upserts, unchanged files skipped by hash)
//!            └─> IngestStats
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use atlas_graph::CodeGraph;
//! use atlas_ingest::{load_config, IngestionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> atlas_ingest::Result<()> {
//!     let config = load_config(None, None)?;
//!     let pipeline = IngestionPipeline::new("/path/to/project", config.ingestion)?;
//!
//!     let mut graph = CodeGraph::new();
//!     let stats = pipeline.ingest(&mut graph).await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pipeline;
mod scanner;
mod stats;

pub use config::{
    expand_env_vars, find_config_file, generate_config_template, load_config, load_config_file,
    AtlasConfig, IngestionConfig, LogFormat, LoggingConfig, TemplateFormat, CONFIG_FILE_NAMES,
};
pub use error::{IngestError, Result};
pub use pipeline::IngestionPipeline;
pub use scanner::{FileScanner, ScanResult, ScannedFile, SkippedFile};
pub use stats::{FileFailure, IngestStats};
