use crate::context::{ClassEntry, ResolutionContext};
use crate::scope::ScopeStack;
use crate::syntax::{attribute_chain, strip_parens, SyntaxKind, SyntaxTree};
use crate::types::{Relationship, RelationshipType};
use tree_sitter::Node;

/// Reduce a base class expression to a name.
///
/// `Base` and `pkg.Base` keep their text, `Generic[T]` reduces to `Generic`.
/// Calls, starred bases and other expressions have no name.
pub(crate) fn base_name(tree: &SyntaxTree, base: Node<'_>) -> Option<String> {
    let base = strip_parens(base);
    let name = match SyntaxKind::of(base) {
        SyntaxKind::Identifier => tree.text(base).to_string(),
        SyntaxKind::Attribute => attribute_chain(tree, base),
        SyntaxKind::Subscript => return base_name(tree, base.child_by_field_name("value")?),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

/// Positional base expressions of a class; keyword arguments such as
/// `metaclass=` are not bases
pub(crate) fn base_nodes(class: Node<'_>) -> Vec<Node<'_>> {
    let Some(arguments) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    let bases: Vec<_> = arguments
        .named_children(&mut cursor)
        .filter(|c| !matches!(c.kind(), "keyword_argument" | "comment"))
        .collect();
    bases
}

/// Reduced names of every base of a class, in declaration order
pub(crate) fn base_names(tree: &SyntaxTree, class: Node<'_>) -> Vec<String> {
    base_nodes(class)
        .into_iter()
        .filter_map(|base| base_name(tree, base))
        .collect()
}

/// INHERITS edges for every class definition in the file
pub(crate) fn extract_inheritance(ctx: &ResolutionContext<'_>, out: &mut Vec<Relationship>) {
    let file = ctx.file_path();
    for class in ctx.classes().all() {
        let child = ScopeStack::class_name(file, &class.name);
        for base in base_names(ctx.tree(), class.node) {
            out.push(
                Relationship::new(&child, ctx.resolve_base(&base), RelationshipType::Inherits)
                    .with_property("base_class", base)
                    .with_property("line", class.line),
            );
        }
    }
}

fn is_dunder(name: &str) -> bool {
    name.starts_with("__") && name.ends_with("__")
}

/// OVERRIDES edges between methods of classes related by in-file inheritance.
///
/// Only the last definition of a class name takes part, and dunder methods
/// are skipped.
pub(crate) fn extract_overrides(ctx: &ResolutionContext<'_>, out: &mut Vec<Relationship>) {
    let classes = ctx.classes();
    for child in classes.distinct() {
        for base in base_names(ctx.tree(), child.node) {
            let Some(parent) = classes.get(&base) else {
                continue;
            };
            push_overrides(child, parent, &base, out);
        }
    }
}

fn push_overrides(
    child: &ClassEntry<'_>,
    parent: &ClassEntry<'_>,
    parent_name: &str,
    out: &mut Vec<Relationship>,
) {
    for (method, child_method) in &child.methods {
        if is_dunder(method) {
            continue;
        }
        let Some((_, parent_method)) = parent.methods.iter().find(|(name, _)| name == method)
        else {
            continue;
        };
        out.push(
            Relationship::new(child_method, parent_method, RelationshipType::Overrides)
                .with_property("method_name", method.as_str())
                .with_property("child_class", child.name.as_str())
                .with_property("parent_class", parent_name),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dunder_detection() {
        assert!(is_dunder("__init__"));
        assert!(is_dunder("__eq__"));
        assert!(!is_dunder("_private"));
        assert!(!is_dunder("__mangled"));
    }
}
