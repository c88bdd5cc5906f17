//! Per-language capability table: grammar, tag query, and structural flags.
//!
//! Tag queries use the capture naming convention shared by most tag tooling:
//! `@name.definition.<type>` / `@name.reference.<type>` mark the identifier,
//! and the enclosing `@definition.<type>` / `@reference.<type>` capture marks
//! the whole construct.

use std::collections::HashMap;
use std::sync::LazyLock;

use tree_sitter::Query;

use crate::walker::Language;

const PYTHON_TAGS: &str = r#"
(class_definition
  name: (identifier) @name.definition.class) @definition.class

(function_definition
  name: (identifier) @name.definition.function) @definition.function

(call
  function: [
      (identifier) @name.reference.call
      (attribute
        attribute: (identifier) @name.reference.call)
  ]) @reference.call
"#;

const JAVA_TAGS: &str = r#"
(class_declaration
  name: (identifier) @name.definition.class) @definition.class

(enum_declaration
  name: (identifier) @name.definition.class) @definition.class

(interface_declaration
  name: (identifier) @name.definition.interface) @definition.interface

(method_declaration
  name: (identifier) @name.definition.method) @definition.method

(method_invocation
  name: (identifier) @name.reference.method) @reference.method

(object_creation_expression
  type: (type_identifier) @name.reference.class) @reference.class

(superclass
  (type_identifier) @name.reference.class) @reference.class

(type_list
  (type_identifier) @name.reference.interface) @reference.interface

(field_declaration
  type: (type_identifier) @name.reference.class) @reference.class

(formal_parameter
  type: (type_identifier) @name.reference.class) @reference.class

(local_variable_declaration
  type: (type_identifier) @name.reference.class) @reference.class
"#;

const JAVASCRIPT_TAGS: &str = r#"
(class_declaration
  name: (identifier) @name.definition.class) @definition.class

(method_definition
  name: (property_identifier) @name.definition.method) @definition.method

(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(lexical_declaration
  (variable_declarator
    name: (identifier) @name.definition.function
    value: (arrow_function)) @definition.function)

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (member_expression
    property: (property_identifier) @name.reference.call)) @reference.call

(new_expression
  constructor: (identifier) @name.reference.class) @reference.class
"#;

const TYPESCRIPT_TAGS: &str = r#"
(class_declaration
  name: (type_identifier) @name.definition.class) @definition.class

(interface_declaration
  name: (type_identifier) @name.definition.interface) @definition.interface

(method_definition
  name: (property_identifier) @name.definition.method) @definition.method

(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(lexical_declaration
  (variable_declarator
    name: (identifier) @name.definition.function
    value: (arrow_function)) @definition.function)

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (member_expression
    property: (property_identifier) @name.reference.call)) @reference.call

(new_expression
  constructor: (identifier) @name.reference.class) @reference.class

(type_annotation
  (type_identifier) @name.reference.type) @reference.type
"#;

const RUST_TAGS: &str = r#"
(struct_item
  name: (type_identifier) @name.definition.class) @definition.class

(enum_item
  name: (type_identifier) @name.definition.class) @definition.class

(trait_item
  name: (type_identifier) @name.definition.interface) @definition.interface

(function_item
  name: (identifier) @name.definition.function) @definition.function

(function_signature_item
  name: (identifier) @name.definition.function) @definition.function

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (field_expression
    field: (field_identifier) @name.reference.call)) @reference.call

(call_expression
  function: (scoped_identifier
    name: (identifier) @name.reference.call)) @reference.call

(macro_invocation
  macro: (identifier) @name.reference.call) @reference.call

(impl_item
  trait: (type_identifier) @name.reference.implementation) @reference.implementation

(impl_item
  type: (type_identifier) @name.reference.implementation) @reference.implementation
"#;

const GO_TAGS: &str = r#"
(function_declaration
  name: (identifier) @name.definition.function) @definition.function

(method_declaration
  name: (field_identifier) @name.definition.method) @definition.method

(type_declaration
  (type_spec
    name: (type_identifier) @name.definition.class
    type: (struct_type))) @definition.class

(type_declaration
  (type_spec
    name: (type_identifier) @name.definition.interface
    type: (interface_type))) @definition.interface

(call_expression
  function: (identifier) @name.reference.call) @reference.call

(call_expression
  function: (selector_expression
    field: (field_identifier) @name.reference.call)) @reference.call

(composite_literal
  type: (type_identifier) @name.reference.class) @reference.class
"#;

// C and C++ carry definitions only; references come from the identifier fallback.
const C_TAGS: &str = r#"
(struct_specifier
  name: (type_identifier) @name.definition.class
  body: (_)) @definition.class

(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name.definition.function)) @definition.function

(type_definition
  declarator: (type_identifier) @name.definition.type) @definition.type

(enum_specifier
  name: (type_identifier) @name.definition.type) @definition.type
"#;

const CPP_TAGS: &str = r#"
(struct_specifier
  name: (type_identifier) @name.definition.class
  body: (_)) @definition.class

(class_specifier
  name: (type_identifier) @name.definition.class) @definition.class

(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name.definition.function)) @definition.function

(function_definition
  declarator: (function_declarator
    declarator: (field_identifier) @name.definition.function)) @definition.function

(function_definition
  declarator: (function_declarator
    declarator: (qualified_identifier
      name: (identifier) @name.definition.method))) @definition.method
"#;

const RUBY_TAGS: &str = r#"
(class
  name: (constant) @name.definition.class) @definition.class

(module
  name: (constant) @name.definition.module) @definition.module

(method
  name: (identifier) @name.definition.method) @definition.method

(singleton_method
  name: (identifier) @name.definition.method) @definition.method

(call
  method: (identifier) @name.reference.call) @reference.call
"#;

/// How a language's calls name their receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverField {
    /// Node kind of the call expression, e.g. `method_invocation`.
    pub call_kind: &'static str,
    /// Field on the call node holding the receiver, e.g. `object`.
    pub field: &'static str,
}

/// Static capabilities of one supported language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    /// The language this entry describes.
    pub language: Language,
    /// Tag query source.
    pub tags_query: &'static str,
    /// When set, call references are qualified as `receiver.name`.
    pub receiver: Option<ReceiverField>,
    /// Definitions are delimited by `{ }` and can be re-derived by brace matching.
    pub brace_scoped: bool,
}

static SPECS: [LanguageSpec; 9] = [
    LanguageSpec {
        language: Language::Rust,
        tags_query: RUST_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::Python,
        tags_query: PYTHON_TAGS,
        receiver: None,
        brace_scoped: false,
    },
    LanguageSpec {
        language: Language::TypeScript,
        tags_query: TYPESCRIPT_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::JavaScript,
        tags_query: JAVASCRIPT_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::Go,
        tags_query: GO_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::Java,
        tags_query: JAVA_TAGS,
        receiver: Some(ReceiverField {
            call_kind: "method_invocation",
            field: "object",
        }),
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::C,
        tags_query: C_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::Cpp,
        tags_query: CPP_TAGS,
        receiver: None,
        brace_scoped: true,
    },
    LanguageSpec {
        language: Language::Ruby,
        tags_query: RUBY_TAGS,
        receiver: None,
        brace_scoped: false,
    },
];

static COMPILED: LazyLock<HashMap<Language, Query>> = LazyLock::new(|| {
    let mut compiled = HashMap::new();
    for spec in &SPECS {
        let Some(grammar) = spec.language.tree_sitter_language() else {
            continue;
        };
        match Query::new(&grammar, spec.tags_query) {
            Ok(query) => {
                compiled.insert(spec.language, query);
            }
            Err(e) => log::warn!("invalid {} tag query: {e}", spec.language.name()),
        }
    }
    compiled
});

impl Language {
    /// Capabilities for this language, or `None` when it has no grammar.
    ///
    /// # Examples
    ///
    /// ```
    /// use codemap_repomap::walker::Language;
    ///
    /// let java = Language::Java.spec().unwrap();
    /// assert!(java.brace_scoped);
    /// assert_eq!(java.receiver.unwrap().field, "object");
    /// assert!(Language::Python.spec().unwrap().receiver.is_none());
    /// assert!(Language::Unknown.spec().is_none());
    /// ```
    pub fn spec(&self) -> Option<&'static LanguageSpec> {
        SPECS.iter().find(|s| s.language == *self)
    }

    /// The compiled tag query, shared across threads and built once.
    pub fn tags_query(&self) -> Option<&'static Query> {
        COMPILED.get(self)
    }
}
