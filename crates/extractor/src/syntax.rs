//! Syntax tree wrapper and the closed set of node kinds the extractors dispatch on.

use tree_sitter::{Node, Tree};

/// Parsed source file: tree-sitter tree plus the text and path it came from
pub struct SyntaxTree {
    tree: Tree,
    source: String,
    file_path: String,
}

impl SyntaxTree {
    pub(crate) fn new(tree: Tree, source: String, file_path: String) -> Self {
        Self {
            tree,
            source,
            file_path,
        }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Source text covered by a node
    pub(crate) fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }

    /// Statements directly in the module body
    pub(crate) fn module_statements(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect()
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("file_path", &self.file_path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Node kinds the extraction passes care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyntaxKind {
    ClassDef,
    FunctionDef,
    Decorated,
    Call,
    Identifier,
    Attribute,
    Subscript,
    Parenthesized,
    If,
    Elif,
    While,
    For,
    ExceptHandler,
    With,
    Assert,
    BoolOp,
    Import,
    ImportFrom,
    FutureImport,
    Other,
}

impl SyntaxKind {
    pub(crate) fn of(node: Node<'_>) -> Self {
        match node.kind() {
            "class_definition" => SyntaxKind::ClassDef,
            "function_definition" => SyntaxKind::FunctionDef,
            "decorated_definition" => SyntaxKind::Decorated,
            "call" => SyntaxKind::Call,
            "identifier" => SyntaxKind::Identifier,
            "attribute" => SyntaxKind::Attribute,
            "subscript" => SyntaxKind::Subscript,
            "parenthesized_expression" => SyntaxKind::Parenthesized,
            "if_statement" => SyntaxKind::If,
            "elif_clause" => SyntaxKind::Elif,
            "while_statement" => SyntaxKind::While,
            "for_statement" => SyntaxKind::For,
            "except_clause" | "except_group_clause" => SyntaxKind::ExceptHandler,
            "with_statement" => SyntaxKind::With,
            "assert_statement" => SyntaxKind::Assert,
            "boolean_operator" => SyntaxKind::BoolOp,
            "import_statement" => SyntaxKind::Import,
            "import_from_statement" => SyntaxKind::ImportFrom,
            "future_import_statement" => SyntaxKind::FutureImport,
            _ => SyntaxKind::Other,
        }
    }
}

/// 1-based start line
pub(crate) fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// 1-based end line
pub(crate) fn end_line(node: Node<'_>) -> usize {
    node.end_position().row + 1
}

/// `async def`, `async for`, `async with`
pub(crate) fn is_async(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

/// Name of a class or function definition
pub(crate) fn definition_name<'t>(tree: &'t SyntaxTree, node: Node<'_>) -> Option<&'t str> {
    node.child_by_field_name("name").map(|n| tree.text(n))
}

/// Decorators attached to a definition (empty for undecorated ones)
pub(crate) fn decorators(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if SyntaxKind::of(parent) != SyntaxKind::Decorated {
        return Vec::new();
    }
    let mut cursor = parent.walk();
    let found: Vec<_> = parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .collect();
    found
}

/// Class and function definitions directly inside a block, unwrapping decorators
pub(crate) fn block_definitions(block: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = block.walk();
    let mut defs = Vec::new();
    for child in block.named_children(&mut cursor) {
        match SyntaxKind::of(child) {
            SyntaxKind::ClassDef | SyntaxKind::FunctionDef => defs.push(child),
            SyntaxKind::Decorated => {
                if let Some(def) = child.child_by_field_name("definition") {
                    defs.push(def);
                }
            }
            _ => {}
        }
    }
    defs
}

/// Python ASTs have no parenthesis nodes; look through them
pub(crate) fn strip_parens(mut node: Node<'_>) -> Node<'_> {
    while SyntaxKind::of(node) == SyntaxKind::Parenthesized {
        let inner = {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find(|c| c.kind() != "comment");
            found
        };
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Rebuild a dotted name from an attribute chain (`a.b.c`).
///
/// Walks from the outermost attribute down to the root; a root that is not an
/// identifier contributes nothing, so `x().y.z` yields `y.z`.
pub(crate) fn attribute_chain(tree: &SyntaxTree, node: Node<'_>) -> String {
    let mut parts = Vec::new();
    let mut current = strip_parens(node);
    while SyntaxKind::of(current) == SyntaxKind::Attribute {
        if let Some(attr) = current.child_by_field_name("attribute") {
            parts.push(tree.text(attr));
        }
        match current.child_by_field_name("object") {
            Some(object) => current = strip_parens(object),
            None => break,
        }
    }
    if SyntaxKind::of(current) == SyntaxKind::Identifier {
        parts.push(tree.text(current));
    }
    parts.reverse();
    parts.join(".")
}

/// Normalized text of a `dotted_name` (`os . path` -> `os.path`)
pub(crate) fn dotted_name(tree: &SyntaxTree, node: Node<'_>) -> String {
    if node.kind() != "dotted_name" {
        return tree.text(node).to_string();
    }
    let mut cursor = node.walk();
    let parts: Vec<&str> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .map(|c| tree.text(c))
        .collect();
    parts.join(".")
}

/// Docstring of a class or function body, cleaned like `inspect.cleandoc`
pub(crate) fn docstring(tree: &SyntaxTree, definition: Node<'_>) -> Option<String> {
    let body = definition.child_by_field_name("body")?;
    let first = {
        let mut cursor = body.walk();
        let found = body.named_children(&mut cursor).find(|c| c.kind() != "comment");
        found
    }?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = {
        let mut cursor = first.walk();
        let mut named = first.named_children(&mut cursor).filter(|c| c.kind() != "comment");
        let literal = named.next()?;
        if named.next().is_some() {
            return None;
        }
        literal
    };

    let raw = match literal.kind() {
        "string" => string_value(tree, literal)?,
        "concatenated_string" => {
            let mut cursor = literal.walk();
            let parts: Option<Vec<String>> = literal
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "string")
                .map(|part| string_value(tree, part))
                .collect();
            parts?.concat()
        }
        _ => return None,
    };
    Some(clean_doc(&raw))
}

/// Value of a plain string literal; `None` for bytes and f-strings
fn string_value(tree: &SyntaxTree, node: Node<'_>) -> Option<String> {
    let text = tree.text(node);
    let quote_at = text.find(['"', '\''])?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let quoted = &text[quote_at..];
    let delimiter = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    if quoted.len() < delimiter * 2 {
        return None;
    }
    let body = &quoted[delimiter..quoted.len() - delimiter];
    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Decode the common backslash escapes; unknown escapes are kept verbatim
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Strip the first line's leading whitespace, the common indentation of the
/// remaining lines, and blank lines at both ends
pub(crate) fn clean_doc(doc: &str) -> String {
    let expanded = expand_tabs(doc);
    let lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start().to_string());
    }
    for line in lines.iter().skip(1) {
        let cut = margin.min(line.len() - line.trim_start().len());
        cleaned.push(line[cut..].to_string());
    }

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|l| l.trim().is_empty()).count();
    cleaned.drain(..leading);
    cleaned.join("\n")
}

fn expand_tabs(text: &str) -> String {
    const TAB: usize = 8;
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = TAB - column % TAB;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Positional-or-keyword parameter names (Python's `args.args`)
pub(crate) fn positional_parameters(tree: &SyntaxTree, definition: Node<'_>) -> Vec<String> {
    let Some(params) = definition.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(tree.text(child).to_string()),
            "typed_parameter" => {
                let mut inner_cursor = child.walk();
                let first = child.named_children(&mut inner_cursor).next();
                match first {
                    Some(ident) if ident.kind() == "identifier" => {
                        names.push(tree.text(ident).to_string());
                    }
                    _ => break,
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = child.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push(tree.text(name).to_string());
                    }
                }
            }
            // everything before `/` is positional-only
            "positional_separator" => names.clear(),
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => break,
            _ => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_doc_strips_common_indent() {
        let raw = "Summary line.\n\n        Details here.\n          nested.\n    ";
        assert_eq!(clean_doc(raw), "Summary line.\n\nDetails here.\n  nested.");
    }

    #[test]
    fn test_clean_doc_leading_blank_lines() {
        let raw = "\n    Text starts here.\n    ";
        assert_eq!(clean_doc(raw), "Text starts here.");
    }

    #[test]
    fn test_unescape_known_sequences() {
        assert_eq!(unescape(r"a\tb\\c\q"), "a\tb\\c\\q");
    }
}
