//! C5 — Call extractor.
//!
//! Faithful to what's written: no built-in filtering here (that's C8's
//! graph-building policy). A plain identifier callee yields
//! `receiver=None, is_method=false`; a member-expression callee yields the
//! property as `callee_name` and the object-as-written as `receiver`.

use crate::language::LanguageSpec;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub callee_name: String,
    pub receiver: Option<String>,
    pub is_method: bool,
    pub is_dynamic: bool,
    pub line: u32,
}

const ANONYMOUS_CALLEE: &str = "<anonymous>";
const DYNAMIC_RECEIVER: &str = "<call_result>";

/// Call sites within a single chunk's node, scoped to that subtree (the
/// orchestrator runs this once per chunk so `line` stays chunk-local context
/// but is recorded as an absolute file line).
pub fn extract(node: Node, spec: &LanguageSpec, src: &[u8]) -> Vec<CallSite> {
    let mut out = Vec::new();
    walk(node, spec, src, &mut out);
    out
}

fn walk(node: Node, spec: &LanguageSpec, src: &[u8], out: &mut Vec<CallSite>) {
    if spec.call_expr_kinds.contains(&node.kind()) {
        if let Some(site) = classify_call(node, spec, src) {
            out.push(site);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, spec, src, out);
    }
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn classify_call(node: Node, spec: &LanguageSpec, src: &[u8]) -> Option<CallSite> {
    let line = node.start_position().row as u32 + 1;
    let callee_node = node.child_by_field_name(spec.call_callee_field);

    // Python/JS/TS/Rust/Go/C/C++/C#: the callee is a separate member-expression
    // node (`attribute`/`member_expression`/`field_expression`/
    // `selector_expression`/`member_access_expression`) hanging off the call
    // node's callee field; object/property fields live on that node.
    if let Some(callee) = callee_node {
        if spec.member_expr_kinds.contains(&callee.kind()) {
            if let Some(site) = member_call_site(callee, spec, src, line) {
                return Some(site);
            }
        }
    }

    // Java/Ruby/PHP: the grammar fuses receiver and call into one node, so
    // the object/property fields sit directly on the call node itself.
    if node.child_by_field_name(spec.member_object_field).is_some() {
        if let Some(site) = member_call_site(node, spec, src, line) {
            return Some(site);
        }
    }

    match callee_node {
        Some(callee) if is_identifier_like(callee.kind()) => Some(CallSite {
            callee_name: text(callee, src).to_string(),
            receiver: None,
            is_method: false,
            is_dynamic: false,
            line,
        }),
        _ => Some(CallSite {
            callee_name: ANONYMOUS_CALLEE.to_string(),
            receiver: None,
            is_method: false,
            is_dynamic: true,
            line,
        }),
    }
}

/// Shared object/property extraction for a member-expression-shaped node —
/// either the callee's own member node, or the call node itself when the
/// grammar fuses receiver and call onto one node kind.
fn member_call_site(member_node: Node, spec: &LanguageSpec, src: &[u8], line: u32) -> Option<CallSite> {
    let object = member_node.child_by_field_name(spec.member_object_field)?;
    let property = member_node
        .child_by_field_name(spec.member_property_field)
        .map(|n| text(n, src).to_string())
        .or_else(|| member_node.child_by_field_name(spec.call_callee_field).map(|n| text(n, src).to_string()))?;

    if spec.call_expr_kinds.contains(&object.kind()) {
        return Some(CallSite {
            callee_name: property,
            receiver: Some(DYNAMIC_RECEIVER.to_string()),
            is_method: true,
            is_dynamic: true,
            line,
        });
    }

    let object_text = text(object, src).to_string();
    let receiver = if spec.self_keywords.contains(&object_text.as_str()) {
        spec.self_keywords.first().map(|s| s.to_string())
    } else {
        Some(object_text)
    };

    Some(CallSite { callee_name: property, receiver, is_method: true, is_dynamic: false, line })
}

fn is_identifier_like(kind: &str) -> bool {
    matches!(kind, "identifier" | "field_identifier" | "constant" | "scoped_identifier")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;
    use std::path::Path;
    use tree_sitter::Parser;

    fn parse(src: &str, path: &str) -> (tree_sitter::Tree, &'static language::LanguageSpec) {
        let spec = language::spec_for_path(Path::new(path)).unwrap();
        let mut parser = Parser::new();
        parser.set_language(&(spec.grammar)()).unwrap();
        (parser.parse(src, None).unwrap(), spec)
    }

    #[test]
    fn plain_call_has_no_receiver() {
        let src = "fn main() { add(1, 2); }";
        let (tree, spec) = parse(src, "m.rs");
        let calls = extract(tree.root_node(), spec, src.as_bytes());
        assert!(calls.iter().any(|c| c.callee_name == "add" && c.receiver.is_none() && !c.is_method));
    }

    #[test]
    fn member_call_captures_receiver() {
        let src = "fn main() { logger.info(\"hi\"); }";
        let (tree, spec) = parse(src, "m.rs");
        let calls = extract(tree.root_node(), spec, src.as_bytes());
        let call = calls.iter().find(|c| c.callee_name == "info").expect("info call");
        assert_eq!(call.receiver.as_deref(), Some("logger"));
        assert!(call.is_method);
    }

    #[test]
    fn self_receiver_normalizes() {
        let src = "class Foo:\n    def bar(self):\n        self.baz()\n";
        let (tree, spec) = parse(src, "m.py");
        let calls = extract(tree.root_node(), spec, src.as_bytes());
        let call = calls.iter().find(|c| c.callee_name == "baz").expect("baz call");
        assert_eq!(call.receiver.as_deref(), Some("self"));
    }
}
