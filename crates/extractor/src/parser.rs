use crate::calls::extract_calls;
use crate::complexity::cyclomatic_complexity;
use crate::context::ResolutionContext;
use crate::error::{ExtractError, Result};
use crate::imports::{extract_imports, extract_modules};
use crate::inheritance::{base_nodes, extract_inheritance, extract_overrides};
use crate::language::Language;
use crate::scope::ScopeStack;
use crate::syntax::{
    definition_name, docstring, end_line, is_async, positional_parameters, start_line,
    strip_parens, SyntaxKind, SyntaxTree,
};
use crate::types::{
    ClassInfo, Entity, EntityKind, FileInfo, FunctionInfo, NodeType, ParsedFile, Relationship,
    RelationshipType,
};
use sha2::{Digest, Sha256};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// SHA-256 of the source text as lowercase hex
pub fn content_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Number of lines containing anything other than whitespace
pub fn count_loc(source: &str) -> usize {
    source.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Entity and relationship extractor for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a parser for Python
    pub fn new() -> Result<Self> {
        Self::for_language(Language::Python)
    }

    /// Create a parser for a declared language; only Python is extractable
    pub fn for_language(language: Language) -> Result<Self> {
        if !language.supports_extraction() {
            return Err(ExtractError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ExtractError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse source text. Any syntax error aborts the whole file.
    pub fn parse(&mut self, source: &str, file_path: &str) -> Result<SyntaxTree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::parse(file_path, "parser produced no tree"))?;

        let root = tree.root_node();
        if let Some(node) = first_error(root) {
            let line = start_line(node);
            let column = node.start_position().column + 1;
            let message = match node.kind() {
                "print_statement" | "exec_statement" => format!(
                    "Python 2 '{}' statement at line {line}, column {column}",
                    node.kind().trim_end_matches("_statement")
                ),
                _ if node.is_missing() => {
                    format!("missing '{}' at line {line}, column {column}", node.kind())
                }
                _ => format!("invalid syntax at line {line}, column {column}"),
            };
            return Err(ExtractError::parse(file_path, message));
        }
        if root.has_error() {
            return Err(ExtractError::parse(file_path, "invalid syntax"));
        }

        Ok(SyntaxTree::new(tree, source.to_string(), file_path.to_string()))
    }

    /// File, Class, Function and Module entities of a parsed file
    pub fn extract_entities(&self, tree: &SyntaxTree) -> Vec<Entity> {
        let mut entities = vec![file_entity(tree)];

        let mut collector = DefinitionCollector {
            tree,
            scope: ScopeStack::new(),
            out: &mut entities,
        };
        collector.visit(tree.root());

        entities.extend(extract_modules(tree));
        entities
    }

    /// IMPORTS, CALLS, INHERITS, OVERRIDES and CONTAINS edges of a parsed file
    pub fn extract_relationships(&self, tree: &SyntaxTree, entities: &[Entity]) -> Vec<Relationship> {
        let ctx = ResolutionContext::new(tree, entities);
        let mut relationships = Vec::new();

        extract_imports(&ctx, &mut relationships);
        extract_calls(&ctx, &mut relationships);
        extract_inheritance(&ctx, &mut relationships);
        extract_overrides(&ctx, &mut relationships);

        let file = tree.file_path();
        relationships.extend(
            entities
                .iter()
                .filter(|e| e.node_type() != NodeType::File)
                .map(|e| Relationship::new(file, &e.qualified_name, RelationshipType::Contains)),
        );

        relationships
    }

    /// Parse and extract in one step
    pub fn parse_source(&mut self, file_path: &str, source: &str) -> Result<ParsedFile> {
        let tree = self.parse(source, file_path)?;
        let entities = self.extract_entities(&tree);
        let relationships = self.extract_relationships(&tree, &entities);

        log::debug!(
            "{file_path}: {} entities, {} relationships",
            entities.len(),
            relationships.len()
        );

        Ok(ParsedFile {
            file_path: file_path.to_string(),
            entities,
            relationships,
        })
    }

    /// Read a file from disk and extract it under its own path
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<ParsedFile> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let file_path = path.to_string_lossy();
        self.parse_source(&file_path, &source)
    }
}

/// First node that makes the tree invalid Python 3. The grammar also
/// accepts Python 2 `print` and `exec` statements; those count as errors.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if matches!(node.kind(), "print_statement" | "exec_statement") {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn file_entity(tree: &SyntaxTree) -> Entity {
    let file_path = tree.file_path();
    let name = file_path.rsplit(['/', '\\']).next().unwrap_or(file_path);
    let loc = count_loc(tree.source());
    Entity::new(
        file_path,
        name,
        file_path,
        1,
        loc.max(1),
        EntityKind::File(FileInfo {
            language: Language::Python.as_str().to_string(),
            loc,
            content_hash: content_hash(tree.source()),
        }),
    )
}

/// Preorder walk emitting a Class or Function entity per definition
struct DefinitionCollector<'a> {
    tree: &'a SyntaxTree,
    scope: ScopeStack,
    out: &'a mut Vec<Entity>,
}

impl DefinitionCollector<'_> {
    fn visit(&mut self, node: Node<'_>) {
        match SyntaxKind::of(node) {
            SyntaxKind::ClassDef => self.visit_class(node),
            SyntaxKind::FunctionDef => self.visit_function(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn visit_class(&mut self, node: Node<'_>) {
        let tree = self.tree;
        let Some(name) = definition_name(tree, node) else {
            self.visit_children(node);
            return;
        };

        let is_abstract = base_nodes(node).into_iter().any(|base| {
            let base = strip_parens(base);
            SyntaxKind::of(base) == SyntaxKind::Identifier && tree.text(base) == "ABC"
        });

        self.out.push(Entity::new(
            ScopeStack::class_name(tree.file_path(), name),
            name,
            tree.file_path(),
            start_line(node),
            end_line(node),
            EntityKind::Class(ClassInfo {
                docstring: docstring(tree, node),
                is_abstract,
                complexity: cyclomatic_complexity(node),
            }),
        ));

        let previous = self.scope.enter_class(name);
        self.visit_children(node);
        self.scope.exit_class(previous);
    }

    fn visit_function(&mut self, node: Node<'_>) {
        let tree = self.tree;
        let Some(name) = definition_name(tree, node) else {
            self.visit_children(node);
            return;
        };

        self.out.push(Entity::new(
            self.scope.declared_function(tree.file_path(), name),
            name,
            tree.file_path(),
            start_line(node),
            end_line(node),
            EntityKind::Function(FunctionInfo {
                docstring: docstring(tree, node),
                parameters: positional_parameters(tree, node),
                return_type: node
                    .child_by_field_name("return_type")
                    .map(|annotation| tree.text(annotation).to_string()),
                complexity: cyclomatic_complexity(node),
                is_async: is_async(node),
            }),
        ));

        self.scope.push_function(name);
        self.visit_children(node);
        self.scope.pop_function();
    }
}
