//! # symscope-core
//!
//! Symbol-size analysis for embedded firmware images.
//!
//! This crate answers "where did my flash and RAM go?" for a linked firmware
//! image. It provides:
//! - An ELF32/ELF64 little-endian decoder for sections and symbol tables
//! - A DWARF 2-4 `.debug_line` decoder mapping addresses to `file:line`
//! - A heuristic GNU ld MAP file reader for object-file attribution
//! - [`SymbolAnalyzer`], which merges the three into one query surface
//!
//! All decoding is done in-crate over byte slices; no platform APIs and no
//! `unsafe` are involved.
//!
//! ## Example
//!
//! ```rust,no_run
//! use symscope_core::prelude::*;
//!
//! fn main() -> Result<()>
//! {
//!     let analyzer = SymbolAnalyzer::builder().elf_path("build/rtthread.elf").build()?;
//!     for section in analyzer.sections_with_symbols()? {
//!         println!("{section}");
//!     }
//!     if let Some(symbol) = analyzer.symbol_with_debug_info("main")? {
//!         println!("{symbol} at {:?}", symbol.source_location());
//!     }
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod dwarf;
pub mod elf;
pub mod error;
pub mod map;
pub mod prelude;
mod reader;
pub mod types;

pub use analyzer::{AnalyzerBuilder, SymbolAnalyzer};
// Re-export commonly used types
pub use error::{Error, Result};
pub use types::{Section, SourceLocation, Symbol, SymbolKind, SymbolLanguage};
