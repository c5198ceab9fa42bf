use crate::analysis::{Analyzer, IssueKind, IssueRecord};
use crate::parser::{is_identifier, ImportExtractor, LexicalExtractor};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Flags import bindings that are never referenced elsewhere in their file.
///
/// Usage is a whole-word search over the file text with the binding's own
/// import statement cut out. It does not understand scopes, so a shadowed
/// name or a match inside a string or comment counts as a use.
pub struct UnusedImportDetector {
    extractor: Arc<dyn ImportExtractor>,
    check_type_imports: bool,
}

impl UnusedImportDetector {
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(LexicalExtractor::new()),
            check_type_imports: true,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ImportExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Whether `import type` bindings are reported
    pub fn check_type_imports(mut self, enabled: bool) -> Self {
        self.check_type_imports = enabled;
        self
    }
}

impl Default for UnusedImportDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for UnusedImportDetector {
    fn name(&self) -> &str {
        "unused-import"
    }

    fn analyze(&self, text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        let extracted = self.extractor.extract(path, text);
        let mut issues = Vec::new();

        for statement in &extracted.statements {
            let before = &text[..statement.span.start.min(text.len())];
            let after = &text[statement.span.end.min(text.len())..];

            for binding in &statement.bindings {
                if binding.type_only && !self.check_type_imports {
                    continue;
                }
                if !is_identifier(&binding.local) {
                    continue;
                }

                if contains_word(before, &binding.local) || contains_word(after, &binding.local) {
                    continue;
                }

                trace!("Unused import '{}' in {}", binding.local, path.display());

                let mut issue = IssueRecord::new(
                    IssueKind::UnusedImport,
                    path,
                    format!("'{}' is imported but never used", binding.local),
                )
                .with_line(statement.line)
                .with_symbol(binding.local.clone());

                if binding.type_only {
                    issue = issue.with_flavor("typescript");
                }
                issues.push(issue);
            }
        }

        Ok(issues)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Whole-word occurrence of `word` in `content`
fn contains_word(content: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let bytes = content.as_bytes();
    let wbytes = word.as_bytes();
    let wlen = wbytes.len();
    let clen = bytes.len();
    let mut i = 0usize;

    while i + wlen <= clen {
        if bytes[i..i + wlen] == *wbytes {
            let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
            let after_ok = i + wlen >= clen || !is_ident_byte(bytes[i + wlen]);
            if before_ok && after_ok {
                return true;
            }
            i += wlen;
        } else {
            i += 1;
        }
    }
    false
}
