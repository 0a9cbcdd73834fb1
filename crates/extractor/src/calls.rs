use crate::context::ResolutionContext;
use crate::scope::ScopeStack;
use crate::syntax::{attribute_chain, definition_name, start_line, strip_parens, SyntaxKind, SyntaxTree};
use crate::types::{Relationship, RelationshipType};
use tree_sitter::Node;

/// Textual callee of a call expression: `foo` for `foo()`, `a.b.c` for
/// `a.b.c()`. Anything else (`f()()`, `xs[0]()`) has no name.
pub(crate) fn call_name(tree: &SyntaxTree, call: Node<'_>) -> Option<String> {
    let function = strip_parens(call.child_by_field_name("function")?);
    match SyntaxKind::of(function) {
        SyntaxKind::Identifier => Some(tree.text(function).to_string()),
        SyntaxKind::Attribute => Some(attribute_chain(tree, function)),
        _ => None,
    }
}

/// CALLS edges for every call made from inside a function
pub(crate) fn extract_calls(ctx: &ResolutionContext<'_>, out: &mut Vec<Relationship>) {
    let mut walker = CallWalker {
        ctx,
        scope: ctx.scope(),
        out,
    };
    walker.visit(ctx.tree().root());
}

struct CallWalker<'a, 't> {
    ctx: &'a ResolutionContext<'t>,
    scope: ScopeStack,
    out: &'a mut Vec<Relationship>,
}

impl CallWalker<'_, '_> {
    fn visit(&mut self, node: Node<'_>) {
        match SyntaxKind::of(node) {
            SyntaxKind::Decorated => {
                // decorators run in the scope of the definition they decorate
                match node.child_by_field_name("definition") {
                    Some(definition) => {
                        let mut cursor = node.walk();
                        let decorators: Vec<_> = node
                            .named_children(&mut cursor)
                            .filter(|c| c.kind() == "decorator")
                            .collect();
                        self.visit_definition(definition, &decorators);
                    }
                    None => self.visit_children(node),
                }
            }
            SyntaxKind::ClassDef | SyntaxKind::FunctionDef => self.visit_definition(node, &[]),
            SyntaxKind::Call => {
                self.record(node);
                self.visit_children(node);
            }
            SyntaxKind::Identifier
            | SyntaxKind::Attribute
            | SyntaxKind::Subscript
            | SyntaxKind::Parenthesized
            | SyntaxKind::If
            | SyntaxKind::Elif
            | SyntaxKind::While
            | SyntaxKind::For
            | SyntaxKind::ExceptHandler
            | SyntaxKind::With
            | SyntaxKind::Assert
            | SyntaxKind::BoolOp
            | SyntaxKind::Import
            | SyntaxKind::ImportFrom
            | SyntaxKind::FutureImport
            | SyntaxKind::Other => self.visit_children(node),
        }
    }

    fn visit_definition(&mut self, definition: Node<'_>, decorators: &[Node<'_>]) {
        let tree = self.ctx.tree();
        let name = definition_name(tree, definition).unwrap_or_default();
        match SyntaxKind::of(definition) {
            SyntaxKind::ClassDef => {
                let previous = self.scope.enter_class(name);
                self.visit_all(decorators);
                self.visit_children(definition);
                self.scope.exit_class(previous);
            }
            _ => {
                self.scope.push_function(name);
                self.visit_all(decorators);
                self.visit_children(definition);
                self.scope.pop_function();
            }
        }
    }

    fn visit_all(&mut self, nodes: &[Node<'_>]) {
        for node in nodes {
            self.visit(*node);
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn record(&mut self, call: Node<'_>) {
        let file = self.ctx.file_path();
        let Some(caller) = self.scope.caller(file) else {
            return;
        };
        let Some(callee) = call_name(self.ctx.tree(), call) else {
            return;
        };
        let target = self.ctx.resolve_callee(&callee);
        self.out.push(
            Relationship::new(caller, target, RelationshipType::Calls)
                .with_property("line", start_line(call))
                .with_property("call_name", callee),
        );
    }
}
