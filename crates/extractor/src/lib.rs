//! # Atlas Extractor
//!
//! Turns one Python source file into a self-consistent set of graph records:
//! File, Module, Class and Function entities plus CONTAINS, IMPORTS, CALLS,
//! INHERITS and OVERRIDES relationships between their qualified names.
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Tree-sitter Parsing → SyntaxTree (syntax errors abort the file)
//!     │
//!     ├──> Entity Extraction
//!     │    ├─> File entity (path, loc, content hash)
//!     │    ├─> Class / Function entities (scope stack, complexity, docstrings)
//!     │    └─> Module entities (module-level imports)
//!     │
//!     └──> Relationship Extraction (ResolutionContext)
//!          ├─> IMPORTS   file → module / module member
//!          ├─> CALLS     caller → first local match or raw callee text
//!          ├─> INHERITS  class → local class or raw base name
//!          ├─> OVERRIDES method → in-file base class method
//!          └─> CONTAINS  file → every other entity
//! ```
//!
//! ## Example
//!
//! ```rust
//! use atlas_extractor::{PythonParser, RelationshipType};
//!
//! let mut parser = PythonParser::new().unwrap();
//! let code = "class A:\n    def f(self): pass\n\nclass B(A):\n    def f(self): pass\n";
//!
//! let parsed = parser.parse_source("m.py", code).unwrap();
//! assert!(parsed.has_relationship("m.py::B", "m.py::A", RelationshipType::Inherits));
//! assert!(parsed.has_relationship("m.py::B.f", "m.py::A.f", RelationshipType::Overrides));
//! ```

mod calls;
mod complexity;
mod context;
mod error;
mod imports;
mod inheritance;
mod language;
mod parser;
mod scope;
mod syntax;
mod types;

pub use complexity::cyclomatic_complexity;
pub use context::ResolutionContext;
pub use error::{ExtractError, Result};
pub use language::Language;
pub use parser::{content_hash, count_loc, PythonParser};
pub use scope::ScopeStack;
pub use syntax::SyntaxTree;
pub use types::{
    ClassInfo, Entity, EntityKind, FileInfo, FunctionInfo, ModuleInfo, NodeType, ParsedFile,
    Properties, Relationship, RelationshipType,
};
