use crate::scope::ScopeStack;
use crate::syntax::{block_definitions, definition_name, start_line, SyntaxKind, SyntaxTree};
use crate::types::Entity;
use std::collections::{HashMap, HashSet, VecDeque};
use tree_sitter::Node;

/// One class definition as seen by the inheritance and override passes
#[derive(Debug, Clone)]
pub(crate) struct ClassEntry<'t> {
    pub name: String,
    pub line: usize,
    pub node: Node<'t>,
    /// Method name -> method qualified name, first-definition order
    pub methods: Vec<(String, String)>,
}

/// Every class definition in the file, breadth-first: all top-level classes
/// before any nested one.
///
/// Lookups by simple name see the last definition of that name, while
/// iteration over names keeps the position of the first one.
#[derive(Debug, Default)]
pub(crate) struct ClassTable<'t> {
    classes: Vec<ClassEntry<'t>>,
    latest_by_name: HashMap<String, usize>,
    name_order: Vec<String>,
}

impl<'t> ClassTable<'t> {
    pub fn build(tree: &'t SyntaxTree) -> Self {
        let mut table = Self::default();
        let mut queue = VecDeque::from([tree.root()]);
        while let Some(node) = queue.pop_front() {
            if SyntaxKind::of(node) == SyntaxKind::ClassDef {
                table.insert(tree, node);
            }
            queue.extend(statement_children(node));
        }
        table
    }

    fn insert(&mut self, tree: &'t SyntaxTree, node: Node<'t>) {
        let Some(name) = definition_name(tree, node) else {
            return;
        };
        let mut methods: Vec<(String, String)> = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for def in block_definitions(body) {
                if SyntaxKind::of(def) != SyntaxKind::FunctionDef {
                    continue;
                }
                let Some(method) = definition_name(tree, def) else {
                    continue;
                };
                if methods.iter().any(|(existing, _)| existing == method) {
                    continue;
                }
                let qualified = format!("{}::{name}.{method}", tree.file_path());
                methods.push((method.to_string(), qualified));
            }
        }

        let index = self.classes.len();
        self.classes.push(ClassEntry {
            name: name.to_string(),
            line: start_line(node),
            node,
            methods,
        });
        if !self.latest_by_name.contains_key(name) {
            self.name_order.push(name.to_string());
        }
        self.latest_by_name.insert(name.to_string(), index);
    }

    /// All class definitions, duplicates included
    pub fn all(&self) -> &[ClassEntry<'t>] {
        &self.classes
    }

    /// Last definition of each class name, ordered by first appearance
    pub fn distinct(&self) -> impl Iterator<Item = &ClassEntry<'t>> {
        self.name_order
            .iter()
            .filter_map(|name| self.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry<'t>> {
        self.latest_by_name
            .get(name)
            .and_then(|&index| self.classes.get(index))
    }
}

/// Named children one nesting level down. Wrappers with no statement of
/// their own (blocks, decorated definitions, `else` and `finally` clauses)
/// are looked through so depth follows statement nesting.
fn statement_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let mut children = Vec::new();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "block" | "decorated_definition" | "else_clause" | "finally_clause" => {
                children.extend(statement_children(child))
            }
            _ => children.push(child),
        }
    }
    children
}

/// Per-parse lookup state handed explicitly to every relationship pass
pub struct ResolutionContext<'t> {
    tree: &'t SyntaxTree,
    entities: &'t [Entity],
    classes: ClassTable<'t>,
    local_class_names: HashSet<String>,
}

impl<'t> ResolutionContext<'t> {
    pub fn new(tree: &'t SyntaxTree, entities: &'t [Entity]) -> Self {
        let classes = ClassTable::build(tree);
        let local_class_names = classes.all().iter().map(|c| c.name.clone()).collect();
        Self {
            tree,
            entities,
            classes,
            local_class_names,
        }
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn file_path(&self) -> &'t str {
        self.tree.file_path()
    }

    pub(crate) fn classes(&self) -> &ClassTable<'t> {
        &self.classes
    }

    pub fn is_local_class(&self, name: &str) -> bool {
        self.local_class_names.contains(name)
    }

    /// Fresh scope stack for a traversal
    pub fn scope(&self) -> ScopeStack {
        ScopeStack::new()
    }

    /// Bind a callee name to a local entity.
    ///
    /// The first entity whose simple name equals the callee, or whose
    /// qualified name ends with `::callee`, wins. Unmatched names come back
    /// unchanged.
    pub fn resolve_callee(&self, callee: &str) -> String {
        let suffix = format!("::{callee}");
        let mut matches = self
            .entities
            .iter()
            .filter(|e| e.name == callee || e.qualified_name.ends_with(&suffix));

        match matches.next() {
            Some(entity) => {
                if log::log_enabled!(log::Level::Debug) {
                    let others = matches
                        .filter(|e| e.qualified_name != entity.qualified_name)
                        .count();
                    if others > 0 {
                        log::debug!(
                            "{}: call to '{callee}' is ambiguous ({} candidates), using {}",
                            self.file_path(),
                            others + 1,
                            entity.qualified_name
                        );
                    }
                }
                entity.qualified_name.clone()
            }
            None => callee.to_string(),
        }
    }

    /// Target of an inheritance edge for a reduced base name
    pub fn resolve_base(&self, base: &str) -> String {
        if self.is_local_class(base) {
            ScopeStack::class_name(self.file_path(), base)
        } else {
            base.to_string()
        }
    }
}
