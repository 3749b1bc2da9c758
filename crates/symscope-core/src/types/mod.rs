//! # Types
//!
//! Value types shared by the ELF, DWARF and MAP parsers and the analyzer.
//!
//! All of them are plain data: parsers produce them once and callers receive
//! clones, so they can be handed across threads freely.

pub mod section;
pub mod symbol;

// Re-export all public types
pub use section::Section;
pub(crate) use symbol::sort_by_size_desc;
pub use symbol::{SourceLocation, Symbol, SymbolKind, SymbolLanguage};
