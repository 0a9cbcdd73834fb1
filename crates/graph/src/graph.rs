use crate::error::{GraphError, Result};
use crate::types::{DocumentEdge, DocumentNode, GraphDocument, GraphEdge, GraphNode};
use atlas_extractor::{Entity, NodeType, Relationship, RelationshipType};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// In-memory knowledge graph keyed by qualified name
#[derive(Debug, Default)]
pub struct CodeGraph {
    /// Directed graph (qualified name -> qualified name with relationships)
    graph: StableDiGraph<GraphNode, GraphEdge>,

    /// Qualified name -> NodeIndex mapping for fast lookup
    symbol_index: HashMap<String, NodeIndex>,

    /// File path -> content hash of the last ingested version
    file_hashes: HashMap<String, String>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find node by qualified name
    pub fn find_node(&self, qualified_name: &str) -> Option<NodeIndex> {
        self.symbol_index.get(qualified_name).copied()
    }

    /// Get node data
    pub fn get_node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    /// Entity record stored under a qualified name
    pub fn entity(&self, qualified_name: &str) -> Option<&Entity> {
        self.find_node(qualified_name)
            .and_then(|idx| self.get_node(idx))
            .and_then(GraphNode::entity)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|node| (idx, node)))
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes that are relationship endpoints without an entity record
    pub fn unresolved_count(&self) -> usize {
        self.nodes().filter(|(_, node)| !node.is_resolved()).count()
    }

    /// Targets of outgoing edges of one type
    pub fn outgoing(&self, qualified_name: &str, rel_type: RelationshipType) -> Result<Vec<&str>> {
        self.neighbors(qualified_name, rel_type, Direction::Outgoing)
    }

    /// Sources of incoming edges of one type
    pub fn incoming(&self, qualified_name: &str, rel_type: RelationshipType) -> Result<Vec<&str>> {
        self.neighbors(qualified_name, rel_type, Direction::Incoming)
    }

    fn neighbors(
        &self,
        qualified_name: &str,
        rel_type: RelationshipType,
        direction: Direction,
    ) -> Result<Vec<&str>> {
        let idx = self
            .find_node(qualified_name)
            .ok_or_else(|| GraphError::NodeNotFound(qualified_name.to_string()))?;

        let mut found: Vec<&str> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| e.weight().relationship == rel_type)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.get_node(other).map(GraphNode::qualified_name)
            })
            .collect();
        found.sort_unstable();
        Ok(found)
    }

    /// Edge data for one (source, target, type) triple
    pub fn edge(&self, source: &str, target: &str, rel_type: RelationshipType) -> Option<&GraphEdge> {
        let from = self.find_node(source)?;
        let to = self.find_node(target)?;
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.target() == to && e.weight().relationship == rel_type)
            .map(|e| e.weight())
    }

    /// Content hash recorded for a file by its last File entity
    pub fn file_hash(&self, file_path: &str) -> Option<&str> {
        self.file_hashes.get(file_path).map(String::as_str)
    }

    /// Node for a qualified name, creating an unresolved placeholder if needed
    fn ensure_node(&mut self, qualified_name: &str) -> NodeIndex {
        if let Some(idx) = self.find_node(qualified_name) {
            return idx;
        }
        let idx = self
            .graph
            .add_node(GraphNode::Unresolved(qualified_name.to_string()));
        self.symbol_index.insert(qualified_name.to_string(), idx);
        idx
    }

    /// Insert or replace an entity. Returns false when the store kept its
    /// existing record.
    ///
    /// Modules are shared by every importing file, so the first Module record
    /// for a name stays; any entity replaces an unresolved placeholder.
    pub fn upsert_entity(&mut self, entity: &Entity) -> bool {
        if let Some(info) = entity.as_file() {
            self.file_hashes
                .insert(entity.file_path.clone(), info.content_hash.clone());
        }

        let idx = self.ensure_node(&entity.qualified_name);
        let Some(node) = self.graph.node_weight_mut(idx) else {
            return false;
        };
        let keep_existing =
            entity.node_type() == NodeType::Module && node.is_resolved();
        if keep_existing {
            return false;
        }
        *node = GraphNode::Entity(entity.clone());
        true
    }

    /// Insert a relationship. Returns true when a new edge was created;
    /// repeated triples bump the edge's occurrence count instead.
    pub fn upsert_relationship(&mut self, relationship: &Relationship) -> bool {
        let from = self.ensure_node(&relationship.source_id);
        let to = self.ensure_node(&relationship.target_id);

        let existing = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.target() == to && e.weight().relationship == relationship.rel_type)
            .map(|e| e.id());

        match existing.and_then(|id| self.graph.edge_weight_mut(id)) {
            Some(edge) => {
                edge.occurrences += 1;
                edge.properties = relationship.properties.clone();
                false
            }
            None => {
                self.graph.add_edge(
                    from,
                    to,
                    GraphEdge {
                        relationship: relationship.rel_type,
                        properties: relationship.properties.clone(),
                        occurrences: 1,
                    },
                );
                true
            }
        }
    }

    /// Drop everything one file contributed: its File node, its classes and
    /// functions, the unresolved callers named under `file_path::`, and their
    /// outgoing edges. Modules stay since other files may
    /// import them. A dropped entity that other files still point at turns
    /// back into an unresolved placeholder. Returns the number of entities
    /// removed.
    pub fn remove_file_entities(&mut self, file_path: &str) -> usize {
        self.file_hashes.remove(file_path);

        let owned: BTreeSet<NodeIndex> = self
            .nodes()
            .filter(|(_, node)| {
                node.entity().is_some_and(|e| {
                    e.file_path == file_path && e.node_type() != NodeType::Module
                })
            })
            .map(|(idx, _)| idx)
            .collect();
        // callers nested in this file's functions only exist as placeholders
        let prefix = format!("{file_path}::");
        let scoped: BTreeSet<NodeIndex> = self
            .nodes()
            .filter(|(_, node)| !node.is_resolved() && node.qualified_name().starts_with(&prefix))
            .map(|(idx, _)| idx)
            .collect();
        if owned.is_empty() && scoped.is_empty() {
            return 0;
        }

        let outgoing: Vec<_> = owned
            .iter()
            .chain(&scoped)
            .flat_map(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| (e.id(), e.target()))
            })
            .collect();
        let mut touched: BTreeSet<NodeIndex> = BTreeSet::new();
        for (edge, target) in outgoing {
            self.graph.remove_edge(edge);
            touched.insert(target);
        }

        for &idx in &owned {
            let still_referenced = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .next()
                .is_some();
            if still_referenced {
                if let Some(node) = self.graph.node_weight_mut(idx) {
                    let name = node.qualified_name().to_string();
                    *node = GraphNode::Unresolved(name);
                }
            } else {
                self.remove_node(idx);
            }
        }

        // placeholders that only this file pointed at
        for idx in touched.into_iter().chain(scoped) {
            if owned.contains(&idx) {
                continue;
            }
            let orphan = self.graph.node_weight(idx).is_some_and(|n| !n.is_resolved())
                && self.graph.edges_directed(idx, Direction::Incoming).next().is_none()
                && self.graph.edges_directed(idx, Direction::Outgoing).next().is_none();
            if orphan {
                self.remove_node(idx);
            }
        }

        log::debug!("{file_path}: removed {} entities", owned.len());
        owned.len()
    }

    fn remove_node(&mut self, idx: NodeIndex) {
        if let Some(node) = self.graph.remove_node(idx) {
            self.symbol_index.remove(node.qualified_name());
        }
    }

    /// Serializable node/edge dump, nodes in insertion order
    pub fn to_document(&self) -> GraphDocument {
        let nodes = self
            .nodes()
            .map(|(_, node)| DocumentNode {
                qualified_name: node.qualified_name().to_string(),
                entity: node.entity().cloned(),
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let source = self.get_node(e.source())?;
                let target = self.get_node(e.target())?;
                Some(DocumentEdge {
                    source: source.qualified_name().to_string(),
                    target: target.qualified_name().to_string(),
                    rel_type: e.weight().relationship,
                    occurrences: e.weight().occurrences,
                    properties: e.weight().properties.clone(),
                })
            })
            .collect();

        GraphDocument { nodes, edges }
    }

    /// Pretty-printed JSON of [`CodeGraph::to_document`]
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_extractor::{ClassInfo, EntityKind, ModuleInfo};

    fn class(file: &str, name: &str) -> Entity {
        Entity::new(
            format!("{file}::{name}"),
            name,
            file,
            1,
            2,
            EntityKind::Class(ClassInfo {
                docstring: None,
                is_abstract: false,
                complexity: 1,
            }),
        )
    }

    fn module(file: &str, name: &str) -> Entity {
        Entity::new(
            name,
            name,
            file,
            1,
            1,
            EntityKind::Module(ModuleInfo {
                is_external: true,
                package: None,
            }),
        )
    }

    #[test]
    fn test_placeholder_is_replaced_by_entity() {
        let mut graph = CodeGraph::new();
        graph.upsert_relationship(&Relationship::new(
            "b.py::B",
            "a.py::A",
            RelationshipType::Inherits,
        ));
        assert_eq!(graph.unresolved_count(), 2);

        assert!(graph.upsert_entity(&class("a.py", "A")));
        assert_eq!(graph.unresolved_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.entity("a.py::A").is_some());
        assert_eq!(
            graph.incoming("a.py::A", RelationshipType::Inherits).unwrap(),
            vec!["b.py::B"]
        );
    }

    #[test]
    fn test_first_module_record_is_kept() {
        let mut graph = CodeGraph::new();
        assert!(graph.upsert_entity(&module("a.py", "os")));
        assert!(!graph.upsert_entity(&module("b.py", "os")));
        assert_eq!(graph.entity("os").unwrap().file_path, "a.py");
    }

    #[test]
    fn test_repeated_relationship_counts_occurrences() {
        let mut graph = CodeGraph::new();
        let call = Relationship::new("m.py::f", "print", RelationshipType::Calls);
        assert!(graph.upsert_relationship(&call.clone().with_property("line", 2)));
        assert!(!graph.upsert_relationship(&call.with_property("line", 3)));

        assert_eq!(graph.edge_count(), 1);
        let edge = graph
            .edge("m.py::f", "print", RelationshipType::Calls)
            .unwrap();
        assert_eq!(edge.occurrences, 2);
        assert_eq!(edge.properties["line"], serde_json::json!(3));
    }

    #[test]
    fn test_unknown_node_lookup_fails() {
        let graph = CodeGraph::new();
        assert!(matches!(
            graph.outgoing("nope", RelationshipType::Calls),
            Err(GraphError::NodeNotFound(_))
        ));
    }
}
