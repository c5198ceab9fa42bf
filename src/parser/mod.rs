mod common;
mod lexical;

pub use common::{
    is_identifier, line_of, BindingKind, ExtractedImports, ImportBinding, ImportExtractor,
    ImportForm, ImportReference, ImportStatement, ReferenceKind,
};
pub use lexical::LexicalExtractor;
