//! # Symbol Analyzer
//!
//! Query facade over an optional ELF image and an optional linker MAP file.
//!
//! The ELF image is authoritative for sections, symbol types and source
//! lines; the MAP file contributes object-file attribution and symbols the
//! ELF symbol table does not carry. Either input may be absent, and queries
//! that need the missing one return [`Error::ElfNotLoaded`] or
//! [`Error::NothingLoaded`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use symscope_core::analyzer::SymbolAnalyzer;
//!
//! fn main() -> symscope_core::Result<()>
//! {
//!     let analyzer = SymbolAnalyzer::builder()
//!         .elf_path("build/rtthread.elf")
//!         .map_path("build/rtthread.map")
//!         .build()?;
//!
//!     for symbol in analyzer.all_symbols()?.iter().take(10) {
//!         println!("{:>8} {} {}", symbol.size, symbol.name, symbol.object.as_deref().unwrap_or("-"));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::elf::ElfFile;
use crate::error::{Error, Result};
use crate::map::MapFile;
use crate::types::{Section, SourceLocation, Symbol, SymbolKind};

/// Combines ELF and MAP data into symbol-size queries.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Default)]
pub struct SymbolAnalyzer
{
    elf: Option<ElfFile>,
    map: Option<MapFile>,
}

impl SymbolAnalyzer
{
    pub fn new(elf: Option<ElfFile>, map: Option<MapFile>) -> Self
    {
        debug!(elf = elf.is_some(), map = map.is_some(), "creating symbol analyzer");
        Self { elf, map }
    }

    /// Start configuring an analyzer from paths or in-memory inputs.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder
    {
        AnalyzerBuilder::default()
    }

    #[must_use]
    pub fn has_elf(&self) -> bool
    {
        self.elf.is_some()
    }

    #[must_use]
    pub fn has_map(&self) -> bool
    {
        self.map.is_some()
    }

    /// The loaded ELF image, if any.
    #[must_use]
    pub fn elf(&self) -> Option<&ElfFile>
    {
        self.elf.as_ref()
    }

    /// The loaded MAP file, if any.
    #[must_use]
    pub fn map(&self) -> Option<&MapFile>
    {
        self.map.as_ref()
    }

    /// Named sections of the ELF image, in table order.
    ///
    /// ## Errors
    ///
    /// Returns `Error::ElfNotLoaded` without an ELF image.
    pub fn sections(&self) -> Result<Vec<Section>>
    {
        Ok(self.require_elf()?.sections())
    }

    /// Sections that own at least one symbol, in table order.
    ///
    /// ## Errors
    ///
    /// Returns `Error::ElfNotLoaded` without an ELF image, or
    /// `Error::NoSymbolTable` when the image has no symbol table.
    pub fn sections_with_symbols(&self) -> Result<Vec<Section>>
    {
        let elf = self.require_elf()?;
        let owners: HashSet<&str> = elf
            .symbols()?
            .iter()
            .filter_map(|symbol| symbol.section.as_deref())
            .collect();
        Ok(elf
            .sections()
            .into_iter()
            .filter(|section| owners.contains(section.name.as_str()))
            .collect())
    }

    /// ELF symbols placed in section `name`, largest first.
    ///
    /// ## Errors
    ///
    /// Returns `Error::ElfNotLoaded` without an ELF image, or
    /// `Error::NoSymbolTable` when the image has no symbol table.
    pub fn symbols_in_section(&self, name: &str) -> Result<Vec<Symbol>>
    {
        self.require_elf()?.symbols_in_section(name)
    }

    /// Every known symbol, largest first.
    ///
    /// With both inputs the lists are merged on `(name, address)`, keeping
    /// the ELF entry and filling in its object from the MAP file.
    ///
    /// ## Errors
    ///
    /// Returns `Error::NothingLoaded` when neither input is present, or
    /// `Error::NoSymbolTable` when the ELF image has no symbol table.
    pub fn all_symbols(&self) -> Result<Vec<Symbol>>
    {
        match (&self.elf, &self.map) {
            (Some(elf), Some(map)) => Ok(map.merge_with_elf_symbols(elf.symbols()?)),
            (Some(elf), None) => Ok(elf.symbols()?.to_vec()),
            (None, Some(map)) => Ok(map.symbols().to_vec()),
            (None, None) => Err(Error::NothingLoaded),
        }
    }

    /// Symbols attributed to `object`, largest first.
    ///
    /// ## Errors
    ///
    /// Without a MAP file this filters [`SymbolAnalyzer::all_symbols`] and
    /// shares its errors.
    pub fn symbols_for_object(&self, object: &str) -> Result<Vec<Symbol>>
    {
        if let Some(map) = &self.map {
            return Ok(map.symbols_for_object(object));
        }

        Ok(self
            .all_symbols()?
            .into_iter()
            .filter(|symbol| symbol.object.as_deref() == Some(object))
            .collect())
    }

    /// Distinct object files known from the MAP file, ordered by their largest symbol.
    #[must_use]
    pub fn objects(&self) -> Vec<String>
    {
        self.map.as_ref().map(MapFile::objects).unwrap_or_default()
    }

    /// Source location of the line-table row covering symbol `name`.
    ///
    /// `None` when there is no ELF image, the symbol is unknown or is an ELF
    /// `Object`, or no row covers its address. Symbols known only from the
    /// MAP file have no ELF type and are looked up like code.
    #[must_use]
    pub fn symbol_debug_info(&self, name: &str) -> Option<SourceLocation>
    {
        let elf = self.elf.as_ref()?;
        let symbols = match self.all_symbols() {
            Ok(symbols) => symbols,
            Err(err) => {
                debug!(symbol = name, %err, "debug info lookup failed");
                return None;
            }
        };
        let symbol = symbols.iter().find(|symbol| symbol.name == name)?;
        source_for(elf, symbol)
    }

    /// Symbol `name` with its source file and line filled in when resolvable.
    ///
    /// Returns `Ok(None)` for unknown names. Symbols typed `Object` in the ELF
    /// symbol table are returned without source fields. MAP-only symbols are
    /// `SymbolKind::Unknown` and get the nearest row at or below their address,
    /// even when they live in RAM.
    ///
    /// ## Errors
    ///
    /// Shares the errors of [`SymbolAnalyzer::all_symbols`].
    pub fn symbol_with_debug_info(&self, name: &str) -> Result<Option<Symbol>>
    {
        let symbols = self.all_symbols()?;
        let Some(symbol) = symbols.into_iter().find(|symbol| symbol.name == name) else {
            return Ok(None);
        };

        let location = self.elf.as_ref().and_then(|elf| source_for(elf, &symbol));
        Ok(Some(match location {
            Some(location) => symbol.with_source(location),
            None => symbol,
        }))
    }

    fn require_elf(&self) -> Result<&ElfFile>
    {
        self.elf.as_ref().ok_or(Error::ElfNotLoaded)
    }
}

/// ELF `Object` symbols never carry a source location.
fn source_for(elf: &ElfFile, symbol: &Symbol) -> Option<SourceLocation>
{
    if symbol.kind == SymbolKind::Object {
        return None;
    }
    elf.line_info(symbol.address).map(|row| row.location())
}

#[derive(Debug, Clone)]
enum Input<T>
{
    Path(PathBuf),
    Memory(T),
}

/// Builder for [`SymbolAnalyzer`].
///
/// Each input may be given as a path or as in-memory contents; the last
/// call for an input wins.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder
{
    elf: Option<Input<Vec<u8>>>,
    map: Option<Input<String>>,
}

impl AnalyzerBuilder
{
    #[must_use]
    pub fn elf_path(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.elf = Some(Input::Path(path.into()));
        self
    }

    #[must_use]
    pub fn map_path(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.map = Some(Input::Path(path.into()));
        self
    }

    #[must_use]
    pub fn elf_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self
    {
        self.elf = Some(Input::Memory(bytes.into()));
        self
    }

    #[must_use]
    pub fn map_text(mut self, text: impl Into<String>) -> Self
    {
        self.map = Some(Input::Memory(text.into()));
        self
    }

    /// Load and parse the configured inputs.
    ///
    /// ## Errors
    ///
    /// Propagates I/O failures and ELF format errors. Building with no
    /// inputs succeeds; queries then report `Error::NothingLoaded`.
    pub fn build(self) -> Result<SymbolAnalyzer>
    {
        let elf = match self.elf {
            Some(Input::Path(path)) => Some(ElfFile::open(path)?),
            Some(Input::Memory(bytes)) => Some(ElfFile::parse(bytes)?),
            None => None,
        };
        let map = match self.map {
            Some(Input::Path(path)) => Some(MapFile::open(path)?),
            Some(Input::Memory(text)) => Some(MapFile::parse(&text)),
            None => None,
        };
        Ok(SymbolAnalyzer::new(elf, map))
    }
}
