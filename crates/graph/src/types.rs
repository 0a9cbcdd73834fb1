use atlas_extractor::{Entity, Properties, RelationshipType};
use serde::{Deserialize, Serialize};

/// Node in the code graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    /// Entity record received from an extraction
    Entity(Entity),

    /// Relationship endpoint with no entity record yet (external or dynamic symbol)
    Unresolved(String),
}

impl GraphNode {
    pub fn qualified_name(&self) -> &str {
        match self {
            GraphNode::Entity(entity) => &entity.qualified_name,
            GraphNode::Unresolved(name) => name,
        }
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            GraphNode::Entity(entity) => Some(entity),
            GraphNode::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, GraphNode::Entity(_))
    }
}

/// Edge in the code graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Type of relationship
    pub relationship: RelationshipType,

    /// Properties of the most recent write
    pub properties: Properties,

    /// How many times this (source, target, type) triple was written
    pub occurrences: u32,
}

/// Serializable dump of a graph: nodes in insertion order, then edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<DocumentEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub qualified_name: String,

    /// Missing for unresolved placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEdge {
    pub source: String,
    pub target: String,
    pub rel_type: RelationshipType,
    pub occurrences: u32,
    #[serde(default)]
    pub properties: Properties,
}
