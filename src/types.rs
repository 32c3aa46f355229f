//! Core domain types: the declaration tree recovered from source text and
//! the classification attached to each source file.

use serde::Serialize;

/// Access modifier written in front of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// `internal`
    Internal,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `public`
    Public,
}

impl AccessLevel {
    /// Map the keyword captured by a declaration pattern. Anything the
    /// patterns cannot produce falls back to `Private`.
    pub fn from_keyword(keyword: &str) -> Self {
        return match keyword {
            "internal" => Self::Internal,
            "protected" => Self::Protected,
            "public" => Self::Public,
            _ => Self::Private,
        };
    }
}

/// One recovered invocation inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdge {
    /// `receiver.method` for member calls, `None` for constructors.
    pub chain_key: Option<String>,
    /// Which pattern produced the edge.
    pub kind: CallKind,
    /// Object the method is invoked on, `None` for constructors.
    pub receiver: Option<String>,
    /// Invoked method name, or constructed type name.
    pub target: String,
}

/// Shape of the call expression an edge was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// `a.b.Method(`
    Chain,
    /// `new Type(`
    Constructor,
    /// `a.Method(`
    Instance,
}

/// Result of matching a file path against the classification rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Category label of the first matching rule, or `other`.
    pub category: String,
    /// Output document the rule routes the file to.
    pub doc_file: Option<String>,
    /// Title of that output document.
    pub doc_title: Option<String>,
}

impl Classification {
    /// Fallback when no rule matches.
    pub fn other() -> Self {
        return Self {
            category: "other".to_string(),
            doc_file: None,
            doc_title: None,
        };
    }
}

/// Everything recovered from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// First namespace declared in the file.
    pub namespace: Option<String>,
    /// Path the caller supplied, forward slashes.
    pub path: String,
    /// Type declarations in source order.
    pub types: Vec<TypeRecord>,
}

/// Members found inside one type's balanced-brace body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Members {
    /// Method declarations in source order.
    pub methods: Vec<MethodRecord>,
    /// Property and field declarations, first occurrence per name.
    pub properties: Vec<PropertyRecord>,
}

/// A method declaration with its isolated body and call edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRecord {
    /// Access modifier.
    pub access_level: AccessLevel,
    /// Text between the method's braces, empty when it has none.
    pub body_text: String,
    /// Invocations recovered from the body.
    pub call_edges: Vec<CallEdge>,
    /// Whether `async` was written in the signature.
    pub is_async: bool,
    /// One-based line of the declaration.
    pub line_number: u32,
    /// Method name.
    pub name: String,
    /// Parsed parameter list.
    pub parameters: Vec<Parameter>,
    /// Declared return type, trimmed.
    pub return_type: String,
    /// `ReturnType Name(params)` as written.
    pub signature_text: String,
}

/// One `(type, name)` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Parameter name, empty when the token had no whitespace boundary.
    pub name: String,
    /// Parameter type including modifiers such as `params` or `this`.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A property or field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRecord {
    /// Access modifier.
    pub access_level: AccessLevel,
    /// Declared type, trimmed.
    pub declared_type: String,
    /// One-based line of the declaration.
    pub line_number: u32,
    /// Property name; always starts with an uppercase letter.
    pub name: String,
}

/// Kind keyword of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// `class`
    Class,
    /// `enum`
    Enum,
    /// `interface`
    Interface,
    /// `record`
    Record,
}

impl TypeKind {
    /// Map the keyword captured by the type-declaration pattern.
    pub fn from_keyword(keyword: &str) -> Self {
        return match keyword {
            "enum" => Self::Enum,
            "interface" => Self::Interface,
            "record" => Self::Record,
            _ => Self::Class,
        };
    }
}

/// A type declaration and the members of its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRecord {
    /// Access modifier.
    pub access_level: AccessLevel,
    /// First non-interface entry of the base list.
    pub base_type: Option<String>,
    /// Remaining base-list entries.
    pub implemented_interfaces: Vec<String>,
    /// `class`, `interface`, `record` or `enum`.
    pub kind: TypeKind,
    /// One-based line of the declaration.
    pub line_number: u32,
    /// Members of the body; empty when the braces never balance.
    pub members: Members,
    /// Modifiers between the access keyword and the kind keyword.
    pub modifiers: Vec<String>,
    /// Type name without generic parameters.
    pub name: String,
}
