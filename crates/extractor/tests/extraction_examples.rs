use atlas_extractor::{NodeType, ParsedFile, PythonParser, RelationshipType};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn parse(path: &str, code: &str) -> ParsedFile {
    let mut parser = PythonParser::new().expect("python parser");
    parser.parse_source(path, code).expect("extraction failed")
}

fn edges(parsed: &ParsedFile, rel_type: RelationshipType) -> Vec<(&str, &str)> {
    parsed
        .relationships_of(rel_type)
        .map(|r| (r.source_id.as_str(), r.target_id.as_str()))
        .collect()
}

fn names_of(parsed: &ParsedFile, node_type: NodeType) -> Vec<&str> {
    parsed
        .entities
        .iter()
        .filter(|e| e.node_type() == node_type)
        .map(|e| e.qualified_name.as_str())
        .collect()
}

#[test]
fn subclass_method_overrides_base_method() {
    let code = r"
class A:
    def f(self):
        pass

class B(A):
    def f(self):
        pass
";
    let parsed = parse("m.py", code);

    assert_eq!(names_of(&parsed, NodeType::Class), vec!["m.py::A", "m.py::B"]);
    assert_eq!(
        names_of(&parsed, NodeType::Function),
        vec!["m.py::A.f", "m.py::B.f"]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Inherits),
        vec![("m.py::B", "m.py::A")]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Overrides),
        vec![("m.py::B.f", "m.py::A.f")]
    );

    let inherits = parsed
        .relationships_of(RelationshipType::Inherits)
        .next()
        .unwrap();
    assert_eq!(inherits.property("base_class"), Some(&json!("A")));
    assert_eq!(inherits.property("line"), Some(&json!(6)));

    let overrides = parsed
        .relationships_of(RelationshipType::Overrides)
        .next()
        .unwrap();
    assert_eq!(overrides.property("method_name"), Some(&json!("f")));
    assert_eq!(overrides.property("child_class"), Some(&json!("B")));
    assert_eq!(overrides.property("parent_class"), Some(&json!("A")));
}

#[test]
fn dotted_import_creates_module_with_package() {
    let parsed = parse("n.py", "import os.path\n");

    let module = parsed.entity("os.path").expect("module entity");
    assert_eq!(module.node_type(), NodeType::Module);
    assert_eq!(module.name, "path");
    assert_eq!(module.file_path, "n.py");
    assert_eq!((module.line_start, module.line_end), (1, 1));
    let info = module.as_module().unwrap();
    assert!(info.is_external);
    assert_eq!(info.package.as_deref(), Some("os"));

    assert_eq!(
        edges(&parsed, RelationshipType::Imports),
        vec![("n.py", "os.path")]
    );
    let import = parsed
        .relationships_of(RelationshipType::Imports)
        .next()
        .unwrap();
    assert_eq!(import.property("alias"), Some(&Value::Null));
    assert_eq!(import.property("line"), Some(&json!(1)));
}

#[test]
fn pure_relative_import_has_no_module_entity() {
    let parsed = parse("p.py", "from . import sibling\n");

    assert!(names_of(&parsed, NodeType::Module).is_empty());
    assert_eq!(
        edges(&parsed, RelationshipType::Imports),
        vec![("p.py", "sibling")]
    );
    let import = parsed
        .relationships_of(RelationshipType::Imports)
        .next()
        .unwrap();
    assert_eq!(import.property("relative_level"), Some(&json!(1)));
    assert_eq!(import.property("from_module"), Some(&json!("")));
    assert_eq!(import.property("imported_name"), Some(&json!("sibling")));
}

#[test]
fn two_sequential_ifs_have_complexity_three() {
    let code = r"
def check(x):
    if x > 0:
        return 1
    if x < 0:
        return -1
    return 0
";
    let parsed = parse("d.py", code);
    let check = parsed.entity("d.py::check").unwrap();
    assert_eq!(check.complexity(), Some(3));
}

#[test]
fn from_imports_record_alias_and_level() {
    let code = r"
from os.path import join as j
from ..pkg.mod import thing
from typing import *
from __future__ import annotations
";
    let parsed = parse("i.py", code);

    assert_eq!(
        names_of(&parsed, NodeType::Module),
        vec!["os.path", "pkg.mod", "typing", "__future__"]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Imports),
        vec![
            ("i.py", "os.path.join"),
            ("i.py", "pkg.mod.thing"),
            ("i.py", "typing.*"),
            ("i.py", "__future__.annotations"),
        ]
    );

    let imports: Vec<_> = parsed.relationships_of(RelationshipType::Imports).collect();
    assert_eq!(imports[0].property("alias"), Some(&json!("j")));
    assert_eq!(imports[0].property("imported_name"), Some(&json!("join")));
    assert_eq!(imports[0].property("relative_level"), Some(&json!(0)));
    assert_eq!(imports[0].property("line"), Some(&json!(2)));
    assert_eq!(imports[1].property("from_module"), Some(&json!("pkg.mod")));
    assert_eq!(imports[1].property("relative_level"), Some(&json!(2)));
}

#[test]
fn nested_imports_are_ignored() {
    let code = r"
import sys

def load():
    import json
    return json

if sys.version_info > (3,):
    import pathlib
";
    let parsed = parse("lazy.py", code);
    assert_eq!(names_of(&parsed, NodeType::Module), vec!["sys"]);
    assert_eq!(
        edges(&parsed, RelationshipType::Imports),
        vec![("lazy.py", "sys")]
    );
}

#[test]
fn calls_bind_to_local_entities_or_stay_raw() {
    let code = r#"
def helper():
    return 1

def main():
    helper()
    print("x")
    os.path.join("a", "b")

main()
"#;
    let parsed = parse("m.py", code);

    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![
            ("m.py::main", "m.py::helper"),
            ("m.py::main", "print"),
            ("m.py::main", "os.path.join"),
        ]
    );
    let first = parsed
        .relationships_of(RelationshipType::Calls)
        .next()
        .unwrap();
    assert_eq!(first.property("line"), Some(&json!(6)));
    assert_eq!(first.property("call_name"), Some(&json!("helper")));
}

#[test]
fn method_calls_through_self_stay_unresolved() {
    let code = r"
class Service:
    def run(self):
        self.step()

    def step(self):
        pass
";
    let parsed = parse("svc.py", code);
    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![("svc.py::Service.run", "self.step")]
    );
}

#[test]
fn class_body_calls_have_no_caller() {
    let code = "class Config:\n    value = compute()\n";
    let parsed = parse("c.py", code);
    assert!(edges(&parsed, RelationshipType::Calls).is_empty());
}

#[test]
fn nested_functions_are_flat_entities_with_joined_callers() {
    let code = r"
def outer():
    def inner():
        helper()
    inner()

def helper():
    pass
";
    let parsed = parse("m.py", code);

    assert_eq!(
        names_of(&parsed, NodeType::Function),
        vec!["m.py::outer", "m.py::inner", "m.py::helper"]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![
            ("m.py::outer.inner", "m.py::helper"),
            ("m.py::outer", "m.py::inner"),
        ]
    );
}

#[test]
fn class_inside_function_joins_function_stack_for_callers() {
    let code = r"
def factory():
    class Local:
        def method(self):
            helper()
    return Local

def helper():
    pass
";
    let parsed = parse("f.py", code);

    assert!(parsed.entity("f.py::Local").is_some());
    assert!(parsed.entity("f.py::Local.method").is_some());
    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![("f.py::Local.factory.method", "f.py::helper")]
    );
    assert!(parsed.entity("f.py::Local.factory.method").is_none());
}

#[test]
fn decorator_calls_belong_to_decorated_method() {
    let code = r"
import functools

class Cache:
    @functools.lru_cache(maxsize=None)
    def compute(self, x):
        return x
";
    let parsed = parse("cache.py", code);

    let compute = parsed.entity("cache.py::Cache.compute").unwrap();
    assert_eq!(compute.line_start, 6);
    assert_eq!(compute.line_end, 7);
    assert_eq!(compute.complexity(), Some(1));

    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![("cache.py::Cache.compute", "functools.lru_cache")]
    );
    let call = parsed
        .relationships_of(RelationshipType::Calls)
        .next()
        .unwrap();
    assert_eq!(call.property("line"), Some(&json!(5)));
}

#[test]
fn function_signature_details() {
    let code = r#"
async def fetch(url: str, retries: int = 3, *args, timeout=5, **kw) -> bytes:
    """Fetch a URL.

    Retries on failure.
    """
    return b""

def positional(a, /, b, c=1):
    return a
"#;
    let parsed = parse("net.py", code);

    let fetch = parsed.entity("net.py::fetch").unwrap().as_function().unwrap();
    assert!(fetch.is_async);
    assert_eq!(fetch.parameters, vec!["url", "retries"]);
    assert_eq!(fetch.return_type.as_deref(), Some("bytes"));
    assert_eq!(
        fetch.docstring.as_deref(),
        Some("Fetch a URL.\n\nRetries on failure.")
    );

    let positional = parsed
        .entity("net.py::positional")
        .unwrap()
        .as_function()
        .unwrap();
    assert!(!positional.is_async);
    assert_eq!(positional.parameters, vec!["b", "c"]);
    assert_eq!(positional.return_type, None);
    assert_eq!(positional.docstring, None);
}

#[test]
fn abstract_base_class_and_external_bases() {
    let code = r#"
from abc import ABC, abstractmethod

class Base(ABC):
    """Base type."""

    @abstractmethod
    def run(self):
        ...

class Box(typing.Generic[T], metaclass=Meta):
    pass
"#;
    let parsed = parse("m.py", code);

    let base = parsed.entity("m.py::Base").unwrap().as_class().unwrap();
    assert!(base.is_abstract);
    assert_eq!(base.docstring.as_deref(), Some("Base type."));
    assert!(!parsed.entity("m.py::Box").unwrap().as_class().unwrap().is_abstract);

    assert_eq!(
        edges(&parsed, RelationshipType::Inherits),
        vec![("m.py::Base", "ABC"), ("m.py::Box", "typing.Generic")]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Imports),
        vec![("m.py", "abc.ABC"), ("m.py", "abc.abstractmethod")]
    );
    assert!(edges(&parsed, RelationshipType::Calls).is_empty());
}

#[test]
fn later_class_definition_wins_for_overrides() {
    let code = r"
class A:
    def f(self):
        pass

class A:
    def g(self):
        pass

class B(A):
    def f(self):
        pass

    def g(self):
        pass
";
    let parsed = parse("m.py", code);

    assert_eq!(
        names_of(&parsed, NodeType::Class),
        vec!["m.py::A", "m.py::A", "m.py::B"]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Overrides),
        vec![("m.py::B.g", "m.py::A.g")]
    );
}

#[test]
fn nested_class_seen_last_wins_breadth_first() {
    let code = r"
class Holder:
    class Base:
        def stop(self):
            pass

class Base:
    def run(self):
        pass

class Child(Base):
    def run(self):
        pass

    def stop(self):
        pass
";
    let parsed = parse("m.py", code);

    // top-level classes come before the nested one, so `Base` means Holder's
    assert_eq!(
        edges(&parsed, RelationshipType::Overrides),
        vec![("m.py::Child.stop", "m.py::Base.stop")]
    );
    assert_eq!(
        edges(&parsed, RelationshipType::Inherits),
        vec![("m.py::Child", "m.py::Base")]
    );
}

#[test]
fn return_annotation_is_kept_as_written() {
    let code = "def f() -> \"Foo\":\n    pass\n\ndef g() -> dict[str,  int]:\n    pass\n";
    let parsed = parse("m.py", code);

    let f = parsed.entity("m.py::f").unwrap().as_function().unwrap();
    assert_eq!(f.return_type.as_deref(), Some("\"Foo\""));
    let g = parsed.entity("m.py::g").unwrap().as_function().unwrap();
    assert_eq!(g.return_type.as_deref(), Some("dict[str,  int]"));
}

#[test]
fn dunder_methods_are_not_overrides() {
    let code = r"
class A:
    def __init__(self):
        pass

    def run(self):
        pass

class B(A):
    def __init__(self):
        pass

    def run(self):
        pass
";
    let parsed = parse("m.py", code);
    assert_eq!(
        edges(&parsed, RelationshipType::Overrides),
        vec![("m.py::B.run", "m.py::A.run")]
    );
}

#[test]
fn every_entity_is_contained_by_the_file() {
    let code = r"
import json

class Outer:
    class Inner:
        def method(self):
            pass

def top():
    pass
";
    let parsed = parse("pkg/mod.py", code);

    let file = parsed.file_entity().unwrap();
    assert_eq!(file.qualified_name, "pkg/mod.py");
    assert_eq!(file.name, "mod.py");
    assert_eq!(parsed.entities[0].node_type(), NodeType::File);

    let contained: Vec<&str> = parsed
        .relationships_of(RelationshipType::Contains)
        .inspect(|r| assert_eq!(r.source_id, "pkg/mod.py"))
        .map(|r| r.target_id.as_str())
        .collect();
    assert_eq!(
        contained,
        vec![
            "pkg/mod.py::Outer",
            "pkg/mod.py::Inner",
            "pkg/mod.py::Inner.method",
            "pkg/mod.py::top",
            "json",
        ]
    );
}

#[test]
fn relationship_sources_are_local_entities() {
    let code = r"
import os

class A:
    def f(self):
        return os.getcwd()

class B(A):
    def f(self):
        return helper()

def helper():
    return A()
";
    let parsed = parse("m.py", code);
    for rel in &parsed.relationships {
        assert!(
            parsed.entity(&rel.source_id).is_some(),
            "dangling source in {rel:?}"
        );
    }
}

#[test]
fn parsing_is_deterministic() {
    let code = r"
import os
from . import x

class A(object):
    def f(self, a, b):
        if a and b or not a:
            return os.sep
        return None
";
    assert_eq!(parse("same.py", code), parse("same.py", code));
}

#[test]
fn file_entity_tracks_loc_and_hash() {
    let code = "import os\n\n\nx = 1\n";
    let parsed = parse("loc.py", code);
    let file = parsed.file_entity().unwrap();
    let info = file.as_file().unwrap();
    assert_eq!(info.loc, 2);
    assert_eq!(info.language, "python");
    assert_eq!(info.content_hash, atlas_extractor::content_hash(code));
    assert_eq!((file.line_start, file.line_end), (1, 2));
}

#[test]
fn malformed_source_is_a_parse_error() {
    let mut parser = PythonParser::new().unwrap();
    let err = parser.parse_source("bad.py", "class :\n    pass\n").unwrap_err();
    assert!(err.is_parse_error(), "unexpected error: {err}");
}

#[test]
fn python2_statements_are_parse_errors() {
    let mut parser = PythonParser::new().unwrap();
    for code in [
        "def f():\n    print \"hi\"\n",
        "exec \"a = 1\"\n",
        "class A:\n    def f(self):\n        print self, 1\n",
    ] {
        let err = parser.parse_source("py2.py", code).unwrap_err();
        assert!(err.is_parse_error(), "unexpected error for {code:?}: {err}");
        assert!(err.to_string().contains("Python 2"), "{err}");
    }

    // call syntax is plain Python 3
    let parsed = parse("py3.py", "def f():\n    print(\"hi\")\n    exec(\"a = 1\")\n");
    assert_eq!(
        edges(&parsed, RelationshipType::Calls),
        vec![("py3.py::f", "print"), ("py3.py::f", "exec")]
    );
}

#[test]
fn parse_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tool.py");
    std::fs::write(&path, "def run():\n    pass\n").unwrap();

    let mut parser = PythonParser::new().unwrap();
    let parsed = parser.parse_file(&path).unwrap();
    let file_path = path.to_string_lossy().to_string();
    assert_eq!(parsed.file_path, file_path);
    assert!(parsed.entity(&format!("{file_path}::run")).is_some());

    let missing = parser.parse_file(dir.path().join("missing.py")).unwrap_err();
    assert!(matches!(missing, atlas_extractor::ExtractError::IoError(_)));
}
