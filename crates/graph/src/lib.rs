//! # Atlas Graph
//!
//! In-memory knowledge graph that receives extraction output file by file.
//!
//! ## Features
//!
//! - **Upsert by qualified name** - re-ingesting a file replaces its records
//! - **Unresolved placeholders** - edges may point at symbols no file defined yet
//! - **Edge deduplication** - one edge per (source, target, type) with an occurrence count
//! - **Change detection** - per-file content hashes for skipping unchanged files
//!
//! ## Architecture
//!
//! ```text
//! ParsedFile { entities, relationships }
//!     │
//!     └──> GraphSink (trait)
//!            │
//!            └─ CodeGraph (petgraph StableDiGraph)
//!                 ├─ Nodes: Entity | Unresolved(qualified name)
//!                 ├─ Edges: CONTAINS, IMPORTS, CALLS, INHERITS, OVERRIDES
//!                 └─ GraphDocument (serializable dump)
//! ```

mod error;
mod graph;
mod sink;
mod types;

pub use error::{GraphError, Result};
pub use graph::CodeGraph;
pub use sink::GraphSink;
pub use types::{DocumentEdge, DocumentNode, GraphDocument, GraphEdge, GraphNode};
