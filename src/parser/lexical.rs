//! Pattern-based import extraction.
//!
//! Scans raw text instead of building a syntax tree. Statements are matched
//! at line starts or right after a `;`, so commented-out `// import ...`
//! lines are skipped, but a specifier inside a template literal or block
//! comment can still match.

use super::common::{
    is_identifier, line_of, BindingKind, ExtractedImports, ImportBinding, ImportExtractor,
    ImportForm, ImportReference, ImportStatement, ReferenceKind,
};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

struct Patterns {
    static_import: Regex,
    side_effect: Regex,
    re_export: Regex,
    require: Regex,
    dynamic: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        static_import: Regex::new(
            r#"(?m)(?:^|;)[ \t]*(?P<kw>import)[ \t]+(?P<type>type[ \t]+)?(?P<clause>[^'";]+?)[ \t\r\n]*\bfrom[ \t\r\n]*['"](?P<spec>[^'"\r\n]+)['"]"#,
        )
        .expect("static import pattern"),
        side_effect: Regex::new(r#"(?m)(?:^|;)[ \t]*(?P<kw>import)[ \t]*['"](?P<spec>[^'"\r\n]+)['"]"#)
            .expect("side-effect import pattern"),
        re_export: Regex::new(
            r#"(?m)(?:^|;)[ \t]*(?P<kw>export)[ \t]+(?:type[ \t]+)?(?:\*(?:[ \t]+as[ \t]+[\w$]+)?|\{[^}]*\})[ \t\r\n]*from[ \t\r\n]*['"](?P<spec>[^'"\r\n]+)['"]"#,
        )
        .expect("re-export pattern"),
        require: Regex::new(r#"\brequire[ \t]*\([ \t]*['"](?P<spec>[^'"\r\n]+)['"][ \t]*\)"#)
            .expect("require pattern"),
        dynamic: Regex::new(r#"\bimport[ \t]*\([ \t]*['"](?P<spec>[^'"\r\n]+)['"][ \t]*\)"#)
            .expect("dynamic import pattern"),
    })
}

/// Regex-driven [`ImportExtractor`] for JavaScript and TypeScript sources
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalExtractor;

impl LexicalExtractor {
    pub fn new() -> Self {
        Self
    }

    fn push_reference(
        references: &mut Vec<ImportReference>,
        text: &str,
        offset: usize,
        specifier: &str,
        form: ImportForm,
    ) {
        references.push(ImportReference {
            specifier: specifier.to_string(),
            offset,
            line: line_of(text, offset),
            kind: ReferenceKind::from_specifier(specifier),
            form,
        });
    }
}

impl ImportExtractor for LexicalExtractor {
    fn extract(&self, _path: &Path, text: &str) -> ExtractedImports {
        let p = patterns();
        let mut result = ExtractedImports::default();

        for caps in p.static_import.captures_iter(text) {
            let (Some(whole), Some(keyword), Some(spec), Some(clause)) =
                (caps.get(0), caps.name("kw"), caps.name("spec"), caps.name("clause"))
            else {
                continue;
            };
            let type_only = caps.name("type").is_some();
            let bindings = parse_clause(clause.as_str(), type_only);

            // The statement runs from its keyword through an optional `;`
            let start = keyword.start();
            Self::push_reference(&mut result.references, text, start, spec.as_str(), ImportForm::Static);
            result.statements.push(ImportStatement {
                specifier: spec.as_str().to_string(),
                span: start..statement_end(text, whole.end()),
                line: line_of(text, start),
                type_only,
                bindings,
            });
        }

        let simple = [
            (&p.side_effect, ImportForm::SideEffect),
            (&p.re_export, ImportForm::ReExport),
            (&p.require, ImportForm::Require),
            (&p.dynamic, ImportForm::Dynamic),
        ];
        for (regex, form) in simple {
            for caps in regex.captures_iter(text) {
                let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
                    continue;
                };
                let start = caps.name("kw").map_or(whole.start(), |kw| kw.start());
                Self::push_reference(&mut result.references, text, start, spec.as_str(), form);
            }
        }

        result.references.sort_by_key(|r| r.offset);
        result.references.dedup_by(|a, b| a.offset == b.offset && a.specifier == b.specifier);
        result
    }
}

/// Extend a match over trailing blanks and one `;`, if present
fn statement_end(text: &str, end: usize) -> usize {
    let rest = &text[end..];
    let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    if rest[blanks..].starts_with(';') {
        end + blanks + 1
    } else {
        end
    }
}

/// Parse the part of an import statement between `import` and `from`
fn parse_clause(clause: &str, statement_type_only: bool) -> Vec<ImportBinding> {
    let clause = clause.trim();
    let (head, named) = match clause.find('{') {
        Some(open) => {
            let close = clause.rfind('}').filter(|&c| c > open).unwrap_or(clause.len());
            (&clause[..open], &clause[open + 1..close])
        }
        None => (clause, ""),
    };

    let mut bindings = Vec::new();

    for part in head.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(rest) = part.strip_prefix('*') {
            let alias = rest.trim().strip_prefix("as").map(str::trim).unwrap_or("");
            if is_identifier(alias) {
                bindings.push(ImportBinding {
                    local: alias.to_string(),
                    imported: None,
                    kind: BindingKind::Namespace,
                    type_only: statement_type_only,
                });
            }
        } else if is_identifier(part) {
            bindings.push(ImportBinding {
                local: part.to_string(),
                imported: None,
                kind: BindingKind::Default,
                type_only: statement_type_only,
            });
        }
    }

    for item in named.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let (item, inline_type) = match item.strip_prefix("type ") {
            Some(rest) => (rest.trim(), true),
            None => (item, false),
        };
        let tokens: Vec<&str> = item.split_whitespace().collect();
        let (imported, local) = match tokens.as_slice() {
            [name] => (None, *name),
            [name, "as", alias] => (Some(name.trim_matches(|c: char| c == '"' || c == '\'')), *alias),
            _ => continue,
        };
        if !is_identifier(local) {
            continue;
        }
        bindings.push(ImportBinding {
            local: local.to_string(),
            imported: imported.map(str::to_string),
            kind: BindingKind::Named,
            type_only: statement_type_only || inline_type,
        });
    }

    bindings
}
