use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Whether a specifier points into the project or at a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Starts with `.` or `/`; resolved against the discovered file set
    Local,
    /// Bare package name; never enters the dependency graph
    External,
}

impl ReferenceKind {
    pub fn from_specifier(specifier: &str) -> Self {
        if specifier.starts_with('.') || specifier.starts_with('/') {
            ReferenceKind::Local
        } else {
            ReferenceKind::External
        }
    }
}

/// Syntactic form a module reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportForm {
    /// `import x from '...'`, `import { a } from '...'`, `import * as n from '...'`
    Static,
    /// `import '...'`
    SideEffect,
    /// `export ... from '...'`
    ReExport,
    /// `require('...')`
    Require,
    /// `import('...')`
    Dynamic,
}

/// A module specifier found in a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportReference {
    /// Raw specifier text between the quotes
    pub specifier: String,

    /// Byte offset of the statement that contains the specifier
    pub offset: usize,

    /// 1-based line of the statement
    pub line: usize,

    pub kind: ReferenceKind,

    pub form: ImportForm,
}

impl ImportReference {
    pub fn is_local(&self) -> bool {
        self.kind == ReferenceKind::Local
    }
}

/// How an identifier is bound by an import statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Default,
    Namespace,
    Named,
}

/// A local identifier introduced by an import statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportBinding {
    /// Name the binding is visible under in this file
    pub local: String,

    /// Exported name when it differs from the local name (`a as b`)
    pub imported: Option<String>,

    pub kind: BindingKind,

    /// `import type ...` or `import { type X }`
    pub type_only: bool,
}

/// An ES import statement together with the identifiers it binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub specifier: String,

    /// Byte range of the whole statement
    pub span: Range<usize>,

    pub line: usize,

    pub type_only: bool,

    pub bindings: Vec<ImportBinding>,
}

/// Everything an extractor finds in one file
#[derive(Debug, Clone, Default)]
pub struct ExtractedImports {
    /// Module references in source order
    pub references: Vec<ImportReference>,

    /// Binding statements in source order
    pub statements: Vec<ImportStatement>,
}

/// Extracts module references from source text.
///
/// The graph, reachability and cache layers only see this trait, so a
/// tokenizer or AST based extractor can replace [`super::LexicalExtractor`]
/// without touching them.
pub trait ImportExtractor: Send + Sync {
    /// Extract references and binding statements from a file
    fn extract(&self, path: &Path, text: &str) -> ExtractedImports;

    /// Module references only, in source order
    fn references(&self, path: &Path, text: &str) -> Vec<ImportReference> {
        self.extract(path, text).references
    }
}

/// 1-based line number of a byte offset
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Check for a valid JavaScript identifier (ASCII subset plus `$` and `_`)
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
