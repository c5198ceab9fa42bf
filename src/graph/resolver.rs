//! Node-style relative module resolution against the discovered file set.
//!
//! Only the parts of Node's algorithm that need no package metadata are
//! implemented: literal path, extension probing and directory index files.
//! Path aliases and `exports` maps are not consulted.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::parser::ReferenceKind;

/// Extensions tried, in order, for extensionless specifiers
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "jsx"];

/// Extensions that mark a specifier as already naming a concrete file
const EXPLICIT_EXTENSIONS: &[&str] = &[
    "js", "mjs", "cjs", "ts", "mts", "cts", "tsx", "jsx", "json", "vue", "svelte", "css", "scss",
];

/// Resolves local specifiers to files in a known set
pub struct ModuleResolver<'a> {
    known: &'a HashSet<PathBuf>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(known: &'a HashSet<PathBuf>) -> Self {
        Self { known }
    }

    /// Resolve `specifier` as written in `importing_file`.
    ///
    /// Returns `None` for external specifiers and for local ones that match
    /// nothing in the known set.
    pub fn resolve(&self, specifier: &str, importing_file: &Path) -> Option<PathBuf> {
        if ReferenceKind::from_specifier(specifier) != ReferenceKind::Local {
            return None;
        }

        let base = importing_file.parent()?;
        let target = normalize_path(&base.join(specifier));

        if has_explicit_extension(&target) {
            return self.known.contains(&target).then_some(target);
        }

        if self.known.contains(&target) {
            return Some(target);
        }

        for ext in RESOLVE_EXTENSIONS {
            let candidate = append_extension(&target, ext);
            if self.known.contains(&candidate) {
                return Some(candidate);
            }
        }

        for ext in RESOLVE_EXTENSIONS {
            let candidate = target.join(format!("index.{ext}"));
            if self.known.contains(&candidate) {
                return Some(candidate);
            }
        }

        None
    }
}

fn has_explicit_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXPLICIT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// `./a.service` + `ts` → `./a.service.ts` (never replaces an existing suffix)
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
