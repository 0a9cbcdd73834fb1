use crate::error::Result;
use crate::graph::CodeGraph;
use atlas_extractor::{Entity, Relationship};

/// Storage collaborator receiving one file's records at a time.
///
/// Implementations key entities by qualified name and relationships by
/// (source, target, type); writing the same records twice must leave the
/// store unchanged apart from bookkeeping.
pub trait GraphSink {
    /// Insert or update entities; returns how many changed the store
    fn upsert_entities(&mut self, entities: &[Entity]) -> Result<usize>;

    /// Insert relationships; returns how many created a new edge
    fn upsert_relationships(&mut self, relationships: &[Relationship]) -> Result<usize>;

    /// Content hash of the version of `file_path` currently stored
    fn content_hash(&self, file_path: &str) -> Option<String>;

    /// Forget what a file contributed before it is re-ingested
    fn remove_file(&mut self, file_path: &str) -> Result<usize>;
}

impl GraphSink for CodeGraph {
    fn upsert_entities(&mut self, entities: &[Entity]) -> Result<usize> {
        Ok(entities
            .iter()
            .filter(|entity| self.upsert_entity(entity))
            .count())
    }

    fn upsert_relationships(&mut self, relationships: &[Relationship]) -> Result<usize> {
        Ok(relationships
            .iter()
            .filter(|rel| self.upsert_relationship(rel))
            .count())
    }

    fn content_hash(&self, file_path: &str) -> Option<String> {
        self.file_hash(file_path).map(str::to_string)
    }

    fn remove_file(&mut self, file_path: &str) -> Result<usize> {
        Ok(self.remove_file_entities(file_path))
    }
}
