//! Tree-sitter based Python symbol extraction.
//!
//! Produces the flat symbol list the sync protocol carries: top-level
//! functions, classes, and their methods (named `Class.method` so names
//! stay unique within a file), each with its `def`/`class` header as the
//! signature and the ordered list of call targets in its body.

use async_trait::async_trait;
use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::types::{Symbol, SymbolKind};

use super::{ExtractError, ExtractResult, ExtractorReadiness, SymbolExtractor};

#[derive(Debug, Default)]
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract symbols from Python source text.
    pub fn extract_source(&self, path: &Path, source: &str) -> ExtractResult<Vec<Symbol>> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ExtractError::Parse {
                path: path.to_path_buf(),
                reason: format!("failed to load Python grammar: {e}"),
            })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::Parse {
                path: path.to_path_buf(),
                reason: "parser returned no tree".to_string(),
            })?;

        let mut symbols = Vec::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            collect_top_level(child, source, &mut symbols);
        }
        Ok(symbols)
    }
}

#[async_trait]
impl SymbolExtractor for PythonExtractor {
    fn readiness(&self) -> ExtractorReadiness {
        ExtractorReadiness::Ready
    }

    async fn extract(&self, path: &Path) -> ExtractResult<Vec<Symbol>> {
        let source =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ExtractError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        self.extract_source(path, &source)
    }
}

fn collect_top_level(node: Node, source: &str, symbols: &mut Vec<Symbol>) {
    match node.kind() {
        "function_definition" => {
            if let Some(symbol) = definition_symbol(node, source, SymbolKind::Function, None) {
                symbols.push(symbol);
            }
        }
        "class_definition" => {
            let Some(class_name) = node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source.as_bytes()).ok())
            else {
                return;
            };
            if let Some(symbol) = definition_symbol(node, source, SymbolKind::Class, None) {
                symbols.push(symbol);
            }
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for member in body.children(&mut cursor) {
                    // Decorated methods wrap the function_definition
                    let def = if member.kind() == "decorated_definition" {
                        member.child_by_field_name("definition").unwrap_or(member)
                    } else {
                        member
                    };
                    if def.kind() == "function_definition"
                        && let Some(symbol) =
                            definition_symbol(def, source, SymbolKind::Method, Some(class_name))
                    {
                        symbols.push(symbol);
                    }
                }
            }
        }
        "decorated_definition" => {
            if let Some(def) = node.child_by_field_name("definition") {
                collect_top_level(def, source, symbols);
            }
        }
        _ => {}
    }
}

/// Build a symbol from a `function_definition` or `class_definition`.
fn definition_symbol(
    node: Node,
    source: &str,
    kind: SymbolKind,
    class_name: Option<&str>,
) -> Option<Symbol> {
    let name = node
        .child_by_field_name("name")?
        .utf8_text(source.as_bytes())
        .ok()?;
    let qualified = match class_name {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    };

    let signature = header_text(node, source);
    let line_start = node.start_position().row as u32 + 1;
    let line_end = node.end_position().row as u32 + 1;

    let calls = match kind {
        SymbolKind::Class => Vec::new(),
        _ => node
            .child_by_field_name("body")
            .map(|body| collect_calls(body, source))
            .unwrap_or_default(),
    };

    Some(
        Symbol::new(qualified, kind, signature)
            .with_lines(line_start, line_end)
            .with_calls(calls),
    )
}

/// The `def ...:` / `class ...:` header, without the trailing colon or
/// the body.
fn header_text(node: Node, source: &str) -> String {
    let start = node.start_byte();
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or(node.end_byte());
    source[start..end]
        .trim_end()
        .trim_end_matches(':')
        .trim_end()
        .to_string()
}

/// Call targets in source order, first occurrence only. An attribute
/// call like `obj.method()` records `method`.
fn collect_calls(body: Node, source: &str) -> Vec<String> {
    let mut calls = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        // Depth-first in source order
        for child in children.into_iter().rev() {
            stack.push(child);
        }

        if node.kind() == "call"
            && let Some(function) = node.child_by_field_name("function")
        {
            let target = match function.kind() {
                "identifier" => function.utf8_text(source.as_bytes()).ok().map(String::from),
                "attribute" => function
                    .child_by_field_name("attribute")
                    .and_then(|a| a.utf8_text(source.as_bytes()).ok())
                    .map(String::from),
                _ => None,
            };
            if let Some(target) = target
                && !calls.contains(&target)
            {
                calls.push(target);
            }
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extract(source: &str) -> Vec<Symbol> {
        PythonExtractor::new()
            .extract_source(&PathBuf::from("test.py"), source)
            .unwrap()
    }

    #[test]
    fn test_extracts_functions_and_classes() {
        let symbols = extract(
            r#"
def helper(x):
    return x + 1

class Greeter:
    def greet(self, name):
        return format_name(name)

def main():
    g = Greeter()
    print(g.greet("world"))
"#,
        );

        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["helper", "Greeter", "Greeter.greet", "main"]);

        let greeter = &symbols[1];
        assert_eq!(greeter.kind, SymbolKind::Class);

        let greet = &symbols[2];
        assert_eq!(greet.kind, SymbolKind::Method);
        assert_eq!(greet.signature, "def greet(self, name)");
        assert_eq!(greet.calls, vec!["format_name"]);
    }

    #[test]
    fn test_calls_in_source_order_without_duplicates() {
        let symbols = extract(
            r#"
def pipeline(data):
    cleaned = clean(data)
    validated = validate(cleaned)
    clean(validated)
    return store(validated)
"#,
        );
        assert_eq!(symbols[0].calls, vec!["clean", "validate", "store"]);
    }

    #[test]
    fn test_attribute_call_records_method_name() {
        let symbols = extract("def f():\n    conn.execute(q)\n");
        assert_eq!(symbols[0].calls, vec!["execute"]);
    }

    #[test]
    fn test_line_numbers_one_based() {
        let symbols = extract("\n\ndef f():\n    pass\n");
        assert_eq!(symbols[0].line_start, 3);
        assert_eq!(symbols[0].line_end, 4);
    }

    #[test]
    fn test_empty_module_yields_no_symbols() {
        assert!(extract("x = 1\n").is_empty());
    }

    #[test]
    fn test_decorated_definitions() {
        let symbols = extract(
            r#"
@cached
def expensive():
    return compute()

class Api:
    @staticmethod
    def ping():
        return pong()
"#,
        );
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["expensive", "Api", "Api.ping"]);
    }
}
