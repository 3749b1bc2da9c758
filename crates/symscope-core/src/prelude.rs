//! Common module for library exports

pub use crate::analyzer::{AnalyzerBuilder, SymbolAnalyzer};
pub use crate::dwarf::{LineRow, LineTable};
pub use crate::elf::ElfFile;
pub use crate::error::{Error, Result};
pub use crate::map::MapFile;
pub use crate::types::{Section, SourceLocation, Symbol, SymbolKind, SymbolLanguage};
