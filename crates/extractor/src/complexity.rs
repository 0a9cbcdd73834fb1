use crate::syntax::{decorators, is_async, SyntaxKind};
use tree_sitter::Node;

/// Cyclomatic complexity of a class or function definition.
///
/// Starts at 1 and adds one per `if`/`elif`, `while`, `for`, exception
/// handler, `with` and `assert` found anywhere in the definition (decorators
/// included). A boolean operator chain adds one as a decision point and
/// `operands - 1` more for its operators. `async for` and `async with` are
/// not counted.
pub fn cyclomatic_complexity(definition: Node<'_>) -> u32 {
    let mut complexity = 1;
    let mut stack = decorators(definition);
    stack.push(definition);

    while let Some(node) = stack.pop() {
        complexity += decision_weight(node);

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }

    complexity
}

fn decision_weight(node: Node<'_>) -> u32 {
    match SyntaxKind::of(node) {
        SyntaxKind::If
        | SyntaxKind::Elif
        | SyntaxKind::While
        | SyntaxKind::ExceptHandler
        | SyntaxKind::Assert => 1,
        SyntaxKind::For | SyntaxKind::With => u32::from(!is_async(node)),
        SyntaxKind::BoolOp => {
            if is_chain_root(node) {
                let operands = chain_operands(node);
                1 + (operands - 1)
            } else {
                0
            }
        }
        SyntaxKind::ClassDef
        | SyntaxKind::FunctionDef
        | SyntaxKind::Decorated
        | SyntaxKind::Call
        | SyntaxKind::Identifier
        | SyntaxKind::Attribute
        | SyntaxKind::Subscript
        | SyntaxKind::Parenthesized
        | SyntaxKind::Import
        | SyntaxKind::ImportFrom
        | SyntaxKind::FutureImport
        | SyntaxKind::Other => 0,
    }
}

fn operator(node: Node<'_>) -> Option<&'static str> {
    node.child_by_field_name("operator").map(|op| op.kind())
}

/// Same-operator chains are a single expression (`a and b and c`)
fn continues_chain(child: Node<'_>, op: Option<&'static str>) -> bool {
    SyntaxKind::of(child) == SyntaxKind::BoolOp && operator(child) == op
}

fn is_chain_root(node: Node<'_>) -> bool {
    match node.parent() {
        Some(parent) => !continues_chain(parent, operator(node)),
        None => true,
    }
}

fn chain_operands(node: Node<'_>) -> u32 {
    let op = operator(node);
    ["left", "right"]
        .iter()
        .filter_map(|field| node.child_by_field_name(field))
        .map(|side| {
            if continues_chain(side, op) {
                chain_operands(side)
            } else {
                1
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn first_definition_complexity(code: &str) -> u32 {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(code, None).unwrap();
        let root = tree.root_node();
        let mut cursor = root.walk();
        let def = root
            .named_children(&mut cursor)
            .map(|n| n.child_by_field_name("definition").unwrap_or(n))
            .find(|n| matches!(n.kind(), "function_definition" | "class_definition"))
            .unwrap();
        cyclomatic_complexity(def)
    }

    #[test]
    fn test_straight_line_function() {
        assert_eq!(first_definition_complexity("def f():\n    return 1\n"), 1);
    }

    #[test]
    fn test_two_sequential_ifs() {
        let code = "def f(x):\n    if x:\n        pass\n    if not x:\n        pass\n";
        assert_eq!(first_definition_complexity(code), 3);
    }

    #[test]
    fn test_elif_counts_as_if() {
        let code = "def f(x):\n    if x == 1:\n        pass\n    elif x == 2:\n        pass\n    else:\n        pass\n";
        assert_eq!(first_definition_complexity(code), 3);
    }

    #[test]
    fn test_loops_handlers_with_assert() {
        let code = r#"
def f(items):
    for item in items:
        while item:
            item -= 1
    try:
        pass
    except ValueError:
        pass
    except KeyError:
        pass
    with open("x") as fh:
        pass
    assert items
"#;
        // 1 + for + while + 2 handlers + with + assert
        assert_eq!(first_definition_complexity(code), 7);
    }

    #[test]
    fn test_boolean_chain_counts_decision_and_operators() {
        // chain of three operands: +1 decision point, +2 operators
        let code = "def f(a, b, c):\n    return a and b and c\n";
        assert_eq!(first_definition_complexity(code), 4);
    }

    #[test]
    fn test_mixed_operators_are_separate_chains() {
        // `a or (b and c)` in Python terms: Or[a, And[b, c]]
        let code = "def f(a, b, c):\n    return a or b and c\n";
        assert_eq!(first_definition_complexity(code), 5);
    }

    #[test]
    fn test_async_loops_are_not_decision_points() {
        let code = "async def f(xs):\n    async for x in xs:\n        pass\n    async with xs:\n        pass\n";
        assert_eq!(first_definition_complexity(code), 1);
    }

    #[test]
    fn test_comprehensions_and_ternaries_are_not_counted() {
        let code = "def f(xs):\n    ys = [x for x in xs if x]\n    return ys if ys else None\n";
        assert_eq!(first_definition_complexity(code), 1);
    }

    #[test]
    fn test_class_complexity_includes_methods() {
        let code = "class A:\n    def f(self, x):\n        if x:\n            pass\n    def g(self):\n        while True:\n            break\n";
        assert_eq!(first_definition_complexity(code), 3);
    }
}
