use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open attribute bag carried by a relationship
pub type Properties = Map<String, Value>;

/// Entity variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    File,
    Module,
    Class,
    Function,
}

impl NodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::File => "File",
            NodeType::Module => "Module",
            NodeType::Class => "Class",
            NodeType::Function => "Function",
        }
    }
}

/// A structural code element extracted from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Globally unique identity (e.g. "pkg/mod.py::Service.run")
    pub qualified_name: String,

    /// Simple/local name (e.g. "run")
    pub name: String,

    /// Originating file
    pub file_path: String,

    /// Start line (1-indexed)
    pub line_start: usize,

    /// End line (1-indexed, inclusive, never before `line_start`)
    pub line_end: usize,

    /// Variant-specific fields
    #[serde(flatten)]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node_type")]
pub enum EntityKind {
    File(FileInfo),
    Module(ModuleInfo),
    Class(ClassInfo),
    Function(FunctionInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub language: String,
    /// Non-blank line count
    pub loc: usize,
    /// SHA-256 of the source text, lowercase hex
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub is_external: bool,
    /// Dotted parent ("os" for "os.path")
    pub package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub docstring: Option<String>,
    pub is_abstract: bool,
    pub complexity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub docstring: Option<String>,
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
    pub complexity: u32,
    pub is_async: bool,
}

impl Entity {
    /// Create an entity; an end line before the start line degrades to the start line
    pub fn new(
        qualified_name: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        kind: EntityKind,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            name: name.into(),
            file_path: file_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            kind,
        }
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self.kind {
            EntityKind::File(_) => NodeType::File,
            EntityKind::Module(_) => NodeType::Module,
            EntityKind::Class(_) => NodeType::Class,
            EntityKind::Function(_) => NodeType::Function,
        }
    }

    /// Complexity score for classes and functions
    #[must_use]
    pub const fn complexity(&self) -> Option<u32> {
        match &self.kind {
            EntityKind::Class(info) => Some(info.complexity),
            EntityKind::Function(info) => Some(info.complexity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_file(&self) -> Option<&FileInfo> {
        match &self.kind {
            EntityKind::File(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_module(&self) -> Option<&ModuleInfo> {
        match &self.kind {
            EntityKind::Module(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_class(&self) -> Option<&ClassInfo> {
        match &self.kind {
            EntityKind::Class(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.kind {
            EntityKind::Function(info) => Some(info),
            _ => None,
        }
    }
}

/// Type of relationship between two qualified names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// File contains entity
    Contains,

    /// File imports module or module member
    Imports,

    /// Function calls callee
    Calls,

    /// Class inherits from base
    Inherits,

    /// Method overrides a base class method
    Overrides,
}

impl RelationshipType {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::Imports => "IMPORTS",
            RelationshipType::Calls => "CALLS",
            RelationshipType::Inherits => "INHERITS",
            RelationshipType::Overrides => "OVERRIDES",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed, typed edge between two qualified names.
///
/// `target_id` may name a symbol with no extracted entity (external or dynamic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub rel_type: RelationshipType,
    #[serde(default)]
    pub properties: Properties,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        rel_type: RelationshipType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            rel_type,
            properties: Properties::new(),
        }
    }

    /// Builder: set a property
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Identity used by consumers to treat relationships as a set
    #[must_use]
    pub fn key(&self) -> (&str, &str, RelationshipType) {
        (&self.source_id, &self.target_id, self.rel_type)
    }
}

/// Everything extracted from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub file_path: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl ParsedFile {
    /// The File entity of this parse
    #[must_use]
    pub fn file_entity(&self) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.node_type() == NodeType::File)
    }

    /// Find entity by qualified name
    #[must_use]
    pub fn entity(&self, qualified_name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.qualified_name == qualified_name)
    }

    /// All relationships of one type
    pub fn relationships_of(
        &self,
        rel_type: RelationshipType,
    ) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.rel_type == rel_type)
    }

    /// Check whether an edge exists
    #[must_use]
    pub fn has_relationship(&self, source: &str, target: &str, rel_type: RelationshipType) -> bool {
        self.relationships
            .iter()
            .any(|r| r.key() == (source, target, rel_type))
    }
}
