use crate::context::ResolutionContext;
use crate::syntax::{dotted_name, start_line, SyntaxKind, SyntaxTree};
use crate::types::{Entity, EntityKind, ModuleInfo, Relationship, RelationshipType};
use std::collections::HashSet;
use tree_sitter::Node;

/// One name brought in by an import statement
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportedName {
    name: String,
    alias: Option<String>,
}

/// Module-level import statement, normalized across the three syntactic forms
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportStatement {
    /// `import a.b [as c], d`
    Plain {
        line: usize,
        names: Vec<ImportedName>,
    },
    /// `from [.]*m import n [as a]`; `module` is empty for `from . import x`
    From {
        line: usize,
        module: String,
        level: usize,
        names: Vec<ImportedName>,
    },
}

/// Module-level imports only; imports nested in functions, classes or
/// conditional blocks are not structural dependencies
fn module_imports(tree: &SyntaxTree) -> Vec<ImportStatement> {
    tree.module_statements()
        .into_iter()
        .filter_map(|node| read_import(tree, node))
        .collect()
}

fn read_import(tree: &SyntaxTree, node: Node<'_>) -> Option<ImportStatement> {
    let line = start_line(node);
    match SyntaxKind::of(node) {
        SyntaxKind::Import => Some(ImportStatement::Plain {
            line,
            names: imported_names(tree, node),
        }),
        SyntaxKind::ImportFrom => {
            let (module, level) = match node.child_by_field_name("module_name") {
                Some(module) if module.kind() == "relative_import" => relative_module(tree, module),
                Some(module) => (dotted_name(tree, module), 0),
                None => (String::new(), 0),
            };
            let mut names = imported_names(tree, node);
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "wildcard_import")
            {
                names.push(ImportedName {
                    name: "*".to_string(),
                    alias: None,
                });
            }
            Some(ImportStatement::From {
                line,
                module,
                level,
                names,
            })
        }
        SyntaxKind::FutureImport => Some(ImportStatement::From {
            line,
            module: "__future__".to_string(),
            level: 0,
            names: imported_names(tree, node),
        }),
        _ => None,
    }
}

/// `..pkg` -> ("pkg", 2); `.` -> ("", 1)
fn relative_module(tree: &SyntaxTree, node: Node<'_>) -> (String, usize) {
    let mut level = 0;
    let mut module = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_prefix" => level += tree.text(child).matches('.').count(),
            "dotted_name" => module = dotted_name(tree, child),
            _ => {}
        }
    }
    (module, level)
}

fn imported_names(tree: &SyntaxTree, node: Node<'_>) -> Vec<ImportedName> {
    let mut cursor = node.walk();
    let names: Vec<ImportedName> = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|child| match child.kind() {
            "aliased_import" => {
                let name = child.child_by_field_name("name")?;
                Some(ImportedName {
                    name: dotted_name(tree, name),
                    alias: child
                        .child_by_field_name("alias")
                        .map(|alias| tree.text(alias).to_string()),
                })
            }
            "dotted_name" => Some(ImportedName {
                name: dotted_name(tree, child),
                alias: None,
            }),
            _ => None,
        })
        .collect();
    names
}

/// Parent package of a dotted module path (`os.path` -> `os`)
pub(crate) fn package_of(module: &str) -> Option<String> {
    module.rsplit_once('.').map(|(parent, _)| parent.to_string())
}

fn module_entity(tree: &SyntaxTree, module: &str, line: usize) -> Entity {
    let name = module.rsplit('.').next().unwrap_or(module);
    Entity::new(
        module,
        name,
        tree.file_path(),
        line,
        line,
        EntityKind::Module(ModuleInfo {
            is_external: true,
            package: package_of(module),
        }),
    )
}

/// Module entities for every imported module, deduplicated by qualified name
pub(crate) fn extract_modules(tree: &SyntaxTree) -> Vec<Entity> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    for statement in module_imports(tree) {
        let mut add = |module: &str, line: usize| {
            if !module.is_empty() && seen.insert(module.to_string()) {
                modules.push(module_entity(tree, module, line));
            }
        };
        match &statement {
            ImportStatement::Plain { line, names } => {
                for imported in names {
                    add(&imported.name, *line);
                }
            }
            ImportStatement::From { line, module, .. } => add(module, *line),
        }
    }
    modules
}

/// IMPORTS edges from the file to each imported module or module member
pub(crate) fn extract_imports(ctx: &ResolutionContext<'_>, out: &mut Vec<Relationship>) {
    let file = ctx.file_path();
    for statement in module_imports(ctx.tree()) {
        match statement {
            ImportStatement::Plain { line, names } => {
                for imported in names {
                    out.push(
                        Relationship::new(file, &imported.name, RelationshipType::Imports)
                            .with_property("alias", imported.alias)
                            .with_property("line", line),
                    );
                }
            }
            ImportStatement::From {
                line,
                module,
                level,
                names,
            } => {
                for imported in names {
                    let target = if module.is_empty() {
                        imported.name.clone()
                    } else {
                        format!("{module}.{}", imported.name)
                    };
                    out.push(
                        Relationship::new(file, target, RelationshipType::Imports)
                            .with_property("alias", imported.alias)
                            .with_property("from_module", module.as_str())
                            .with_property("imported_name", imported.name)
                            .with_property("relative_level", level)
                            .with_property("line", line),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("os.path").as_deref(), Some("os"));
        assert_eq!(package_of("a.b.c").as_deref(), Some("a.b"));
        assert_eq!(package_of("sys"), None);
    }
}
