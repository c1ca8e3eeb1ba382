//! C1 — Language registry.
//!
//! A single table-driven registry maps a file extension to a tree-sitter
//! grammar plus the node-kind lists every other component needs: which kinds
//! are functions/classes/methods/interfaces, which carry the declared name,
//! which are comments, and the language's import/export surface shape. No
//! other module hardcodes a language name or a grammar node kind — they all
//! go through `LanguageSpec`.
//!
//! New languages register by adding a row to `REGISTRY`.

use std::path::Path;
use tree_sitter::Language;

/// How an import path is written in this language's source, used by
/// `extract::symbols` to pull the right child text out of an import
/// statement node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportShape {
    /// `from X import ...` / `import X` — the module path is a dotted name
    /// or plain identifier preceding the first `{` or `import` keyword.
    Dotted,
    /// The source module is a quoted string literal (JS/TS `import ... from "m"`).
    QuotedString,
    /// Go-style import group: one or more quoted paths inside `import (...)`.
    QuotedGroup,
    /// Rust `use a::b::{c, d};` — path up to the first `{`.
    UsePath,
    /// C/C++ `#include <foo.h>` / `#include "foo.h"`.
    IncludeHeader,
    /// Ruby `require`/`require_relative` call arguments.
    RequireCall,
    /// No import statements in this language surface (e.g. none modeled).
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    pub grammar: fn() -> Language,

    pub function_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub method_kinds: &'static [&'static str],
    pub interface_kinds: &'static [&'static str],

    pub import_kinds: &'static [&'static str],
    pub export_kinds: &'static [&'static str],
    pub import_shape: ImportShape,

    pub line_comment_kinds: &'static [&'static str],
    pub block_comment_kinds: &'static [&'static str],
    pub doc_comment_kinds: &'static [&'static str],

    /// Field carrying the declared identifier on a semantic-unit node.
    pub name_field: &'static str,
    /// C/C++ quirk: the name sits behind a `declarator` chain rather than a
    /// flat named field.
    pub uses_declarator_name: bool,

    /// Call-expression node kind(s) and the field names for callee/receiver,
    /// used by the call extractor (C5).
    pub call_expr_kinds: &'static [&'static str],
    pub call_callee_field: &'static str,
    pub member_expr_kinds: &'static [&'static str],
    pub member_object_field: &'static str,
    pub member_property_field: &'static str,

    /// Self-reference keyword(s) this language normalizes receivers to
    /// (`this` for C-family, `self`/`cls` for Python).
    pub self_keywords: &'static [&'static str],
}

macro_rules! lang {
    ($id:expr) => {
        LanguageSpec {
            id: $id,
            extensions: &[],
            grammar: || unreachable!(),
            function_kinds: &[],
            class_kinds: &[],
            method_kinds: &[],
            interface_kinds: &[],
            import_kinds: &[],
            export_kinds: &[],
            import_shape: ImportShape::None,
            line_comment_kinds: &[],
            block_comment_kinds: &[],
            doc_comment_kinds: &[],
            name_field: "name",
            uses_declarator_name: false,
            call_expr_kinds: &[],
            call_callee_field: "function",
            member_expr_kinds: &[],
            member_object_field: "object",
            member_property_field: "property",
            self_keywords: &[],
        }
    };
}

pub static REGISTRY: &[LanguageSpec] = &[
    LanguageSpec {
        extensions: &["py", "pyi"],
        grammar: tree_sitter_python_grammar,
        function_kinds: &["function_definition"],
        class_kinds: &["class_definition"],
        method_kinds: &["function_definition"],
        interface_kinds: &[],
        import_kinds: &["import_statement", "import_from_statement"],
        export_kinds: &[],
        import_shape: ImportShape::Dotted,
        line_comment_kinds: &["comment"],
        block_comment_kinds: &[],
        doc_comment_kinds: &["expression_statement"],
        call_expr_kinds: &["call"],
        call_callee_field: "function",
        member_expr_kinds: &["attribute"],
        member_object_field: "object",
        member_property_field: "attribute",
        self_keywords: &["self", "cls"],
        ..lang!("python")
    },
    LanguageSpec {
        extensions: &["ts", "mts", "cts"],
        grammar: tree_sitter_typescript_grammar,
        function_kinds: &["function_declaration", "arrow_function", "function_expression", "generator_function_declaration"],
        class_kinds: &["class_declaration"],
        method_kinds: &["method_definition", "public_field_definition"],
        interface_kinds: &["interface_declaration", "type_alias_declaration"],
        import_kinds: &["import_statement"],
        export_kinds: &["export_statement"],
        import_shape: ImportShape::QuotedString,
        line_comment_kinds: &["comment"],
        block_comment_kinds: &[],
        doc_comment_kinds: &[],
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["member_expression"],
        member_object_field: "object",
        member_property_field: "property",
        self_keywords: &["this"],
        ..lang!("typescript")
    },
    LanguageSpec {
        extensions: &["tsx"],
        grammar: tree_sitter_tsx_grammar,
        function_kinds: &["function_declaration", "arrow_function", "function_expression", "generator_function_declaration"],
        class_kinds: &["class_declaration"],
        method_kinds: &["method_definition", "public_field_definition"],
        interface_kinds: &["interface_declaration", "type_alias_declaration"],
        import_kinds: &["import_statement"],
        export_kinds: &["export_statement"],
        import_shape: ImportShape::QuotedString,
        line_comment_kinds: &["comment"],
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["member_expression"],
        member_object_field: "object",
        member_property_field: "property",
        self_keywords: &["this"],
        ..lang!("tsx")
    },
    LanguageSpec {
        extensions: &["js", "jsx", "mjs", "cjs"],
        grammar: tree_sitter_javascript_grammar,
        function_kinds: &["function_declaration", "arrow_function", "function_expression", "generator_function_declaration"],
        class_kinds: &["class_declaration", "class"],
        method_kinds: &["method_definition"],
        interface_kinds: &[],
        import_kinds: &["import_statement"],
        export_kinds: &["export_statement"],
        import_shape: ImportShape::QuotedString,
        line_comment_kinds: &["comment"],
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["member_expression"],
        member_object_field: "object",
        member_property_field: "property",
        self_keywords: &["this"],
        ..lang!("javascript")
    },
    LanguageSpec {
        extensions: &["rs"],
        grammar: tree_sitter_rust_grammar,
        function_kinds: &["function_item"],
        class_kinds: &["struct_item", "enum_item", "impl_item", "trait_item"],
        method_kinds: &["function_item"],
        interface_kinds: &[],
        import_kinds: &["use_declaration"],
        export_kinds: &[],
        import_shape: ImportShape::UsePath,
        line_comment_kinds: &["line_comment", "block_comment"],
        doc_comment_kinds: &["line_comment"],
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["field_expression"],
        member_object_field: "value",
        member_property_field: "field",
        self_keywords: &["self"],
        ..lang!("rust")
    },
    LanguageSpec {
        extensions: &["go"],
        grammar: tree_sitter_go_grammar,
        function_kinds: &["function_declaration"],
        class_kinds: &["type_declaration"],
        method_kinds: &["method_declaration"],
        interface_kinds: &[],
        import_kinds: &["import_declaration"],
        export_kinds: &[],
        import_shape: ImportShape::QuotedGroup,
        line_comment_kinds: &["comment"],
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["selector_expression"],
        member_object_field: "operand",
        member_property_field: "field",
        self_keywords: &[],
        ..lang!("go")
    },
    LanguageSpec {
        extensions: &["java"],
        grammar: tree_sitter_java_grammar,
        function_kinds: &[],
        class_kinds: &["class_declaration", "interface_declaration", "enum_declaration"],
        method_kinds: &["method_declaration", "constructor_declaration"],
        interface_kinds: &[],
        import_kinds: &["import_declaration"],
        export_kinds: &[],
        import_shape: ImportShape::Dotted,
        line_comment_kinds: &["line_comment", "block_comment"],
        doc_comment_kinds: &["block_comment"],
        call_expr_kinds: &["method_invocation"],
        call_callee_field: "name",
        member_expr_kinds: &["method_invocation"],
        member_object_field: "object",
        member_property_field: "name",
        self_keywords: &["this"],
        ..lang!("java")
    },
    LanguageSpec {
        extensions: &["c", "h"],
        grammar: tree_sitter_c_grammar,
        function_kinds: &["function_definition"],
        class_kinds: &["struct_specifier", "union_specifier", "enum_specifier"],
        method_kinds: &[],
        interface_kinds: &[],
        import_kinds: &["preproc_include"],
        export_kinds: &[],
        import_shape: ImportShape::IncludeHeader,
        line_comment_kinds: &["comment"],
        doc_comment_kinds: &["comment"],
        name_field: "declarator",
        uses_declarator_name: true,
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["field_expression"],
        member_object_field: "argument",
        member_property_field: "field",
        self_keywords: &[],
        ..lang!("c")
    },
    LanguageSpec {
        extensions: &["cpp", "hpp", "cc", "cxx"],
        grammar: tree_sitter_cpp_grammar,
        function_kinds: &["function_definition"],
        class_kinds: &["class_specifier", "struct_specifier", "enum_specifier"],
        method_kinds: &["function_definition"],
        interface_kinds: &[],
        import_kinds: &["preproc_include"],
        export_kinds: &[],
        import_shape: ImportShape::IncludeHeader,
        line_comment_kinds: &["comment"],
        doc_comment_kinds: &["comment"],
        name_field: "declarator",
        uses_declarator_name: true,
        call_expr_kinds: &["call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["field_expression"],
        member_object_field: "argument",
        member_property_field: "field",
        self_keywords: &["this"],
        ..lang!("cpp")
    },
    LanguageSpec {
        extensions: &["cs"],
        grammar: tree_sitter_csharp_grammar,
        function_kinds: &[],
        class_kinds: &["class_declaration", "interface_declaration", "struct_declaration", "enum_declaration"],
        method_kinds: &["method_declaration", "constructor_declaration"],
        interface_kinds: &[],
        import_kinds: &["using_directive"],
        export_kinds: &[],
        import_shape: ImportShape::Dotted,
        line_comment_kinds: &["comment"],
        doc_comment_kinds: &["comment"],
        call_expr_kinds: &["invocation_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["member_access_expression"],
        member_object_field: "expression",
        member_property_field: "name",
        self_keywords: &["this"],
        ..lang!("csharp")
    },
    LanguageSpec {
        extensions: &["rb"],
        grammar: tree_sitter_ruby_grammar,
        function_kinds: &["method", "singleton_method"],
        class_kinds: &["class", "module"],
        method_kinds: &["method", "singleton_method"],
        interface_kinds: &[],
        import_kinds: &["call"],
        export_kinds: &[],
        import_shape: ImportShape::RequireCall,
        line_comment_kinds: &["comment"],
        call_expr_kinds: &["call", "method_call"],
        call_callee_field: "method",
        member_expr_kinds: &["call"],
        member_object_field: "receiver",
        member_property_field: "method",
        self_keywords: &["self"],
        ..lang!("ruby")
    },
    LanguageSpec {
        extensions: &["php"],
        grammar: tree_sitter_php_grammar,
        function_kinds: &["function_definition"],
        class_kinds: &["class_declaration", "interface_declaration", "trait_declaration"],
        method_kinds: &["method_declaration"],
        interface_kinds: &[],
        import_kinds: &["namespace_use_declaration"],
        export_kinds: &[],
        import_shape: ImportShape::Dotted,
        line_comment_kinds: &["comment"],
        doc_comment_kinds: &["comment"],
        call_expr_kinds: &["function_call_expression", "member_call_expression"],
        call_callee_field: "function",
        member_expr_kinds: &["member_call_expression"],
        member_object_field: "object",
        member_property_field: "name",
        self_keywords: &["this"],
        ..lang!("php")
    },
];

fn tree_sitter_rust_grammar() -> Language {
    tree_sitter_rust::LANGUAGE.into()
}

fn tree_sitter_typescript_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn tree_sitter_tsx_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TSX.into()
}

fn tree_sitter_javascript_grammar() -> Language {
    tree_sitter_javascript::LANGUAGE.into()
}

fn tree_sitter_python_grammar() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

#[cfg(feature = "lang-go")]
fn tree_sitter_go_grammar() -> Language {
    tree_sitter_go::LANGUAGE.into()
}
#[cfg(not(feature = "lang-go"))]
fn tree_sitter_go_grammar() -> Language {
    unreachable!("built without lang-go feature")
}

#[cfg(feature = "lang-java")]
fn tree_sitter_java_grammar() -> Language {
    tree_sitter_java::LANGUAGE.into()
}
#[cfg(not(feature = "lang-java"))]
fn tree_sitter_java_grammar() -> Language {
    unreachable!("built without lang-java feature")
}

#[cfg(feature = "lang-c")]
fn tree_sitter_c_grammar() -> Language {
    tree_sitter_c::LANGUAGE.into()
}
#[cfg(not(feature = "lang-c"))]
fn tree_sitter_c_grammar() -> Language {
    unreachable!("built without lang-c feature")
}

#[cfg(feature = "lang-cpp")]
fn tree_sitter_cpp_grammar() -> Language {
    tree_sitter_cpp::LANGUAGE.into()
}
#[cfg(not(feature = "lang-cpp"))]
fn tree_sitter_cpp_grammar() -> Language {
    unreachable!("built without lang-cpp feature")
}

#[cfg(feature = "lang-csharp")]
fn tree_sitter_csharp_grammar() -> Language {
    tree_sitter_c_sharp::LANGUAGE.into()
}
#[cfg(not(feature = "lang-csharp"))]
fn tree_sitter_csharp_grammar() -> Language {
    unreachable!("built without lang-csharp feature")
}

#[cfg(feature = "lang-ruby")]
fn tree_sitter_ruby_grammar() -> Language {
    tree_sitter_ruby::LANGUAGE.into()
}
#[cfg(not(feature = "lang-ruby"))]
fn tree_sitter_ruby_grammar() -> Language {
    unreachable!("built without lang-ruby feature")
}

#[cfg(feature = "lang-php")]
fn tree_sitter_php_grammar() -> Language {
    tree_sitter_php::LANGUAGE_PHP.into()
}
#[cfg(not(feature = "lang-php"))]
fn tree_sitter_php_grammar() -> Language {
    unreachable!("built without lang-php feature")
}

fn ext_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Look up the language spec for a path by extension. Returns `None` for
/// extensions with no registered grammar (data files, unsupported
/// languages); the chunker falls back to line-based chunking for those.
pub fn spec_for_path(path: &Path) -> Option<&'static LanguageSpec> {
    let ext = ext_of(path)?;
    REGISTRY.iter().find(|spec| spec.extensions.contains(&ext.as_str()))
}

pub fn spec_by_id(id: &str) -> Option<&'static LanguageSpec> {
    REGISTRY.iter().find(|spec| spec.id == id)
}

/// Every extension §6 names as "indexable source" plus documentation/data/
/// shell, independent of whether a `LanguageSpec` (AST grammar) exists for it.
pub const INDEXABLE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "pyi", "rs", "go", "c", "cpp", "h", "hpp", "java", "kt", "scala",
    "cs", "fs", "rb", "php", "swift", "md", "json", "yaml", "yml", "toml", "sh", "bash",
];

pub fn is_indexable_extension(path: &Path) -> bool {
    match ext_of(path) {
        Some(ext) => INDEXABLE_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_extension_resolves() {
        let spec = spec_for_path(Path::new("src/main.rs")).expect("rust spec");
        assert_eq!(spec.id, "rust");
        assert!(spec.class_kinds.contains(&"impl_item"));
    }

    #[test]
    fn unregistered_extension_is_none() {
        assert!(spec_for_path(Path::new("README.md")).is_none());
        assert!(is_indexable_extension(Path::new("README.md")));
    }

    #[test]
    fn c_uses_declarator_name_quirk() {
        let spec = spec_for_path(Path::new("foo.c")).expect("c spec");
        assert!(spec.uses_declarator_name);
        assert_eq!(spec.name_field, "declarator");
    }
}
