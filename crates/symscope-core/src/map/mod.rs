//! # Linker MAP Files
//!
//! Best-effort reader for GNU ld `-Map` reports.
//!
//! The MAP format is not formally specified, so parsing is a line-shape
//! heuristic: once a heading mentioning both `Symbol` and `File` is seen,
//! object header lines (`.text.foo 0x… 0x… build/foo.o`) set the current
//! object, and `name 0xADDR 0xSIZE` lines become symbols attributed to it.
//! Lines in any other shape are ignored; a file that never matches simply
//! yields no symbols.
//!
//! When the same `(name, address)` appears more than once the larger size
//! wins. Visually ambiguous lines can still be mis-attributed; that is a
//! property of the input format.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::types::{sort_by_size_desc, Symbol, SymbolKind};

/// `.section.name   0xADDR   0xSIZE   path/to/object.o`
static OBJECT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\..*?\s+0x[0-9a-f]+\s+0x[0-9a-f]+\s+(.+\.o)").expect("valid object regex"));

/// Indented `   name   0xADDR   0xSIZE`
static SYMBOL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s+(\S+)\s+0x([0-9a-f]+)\s+0x([0-9a-f]+)").expect("valid symbol regex"));

/// Unindented `name 0xADDR 0xSIZE`
static BARE_SYMBOL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([.\w]+)\s+0x([0-9a-f]+)\s+0x([0-9a-f]+)").expect("valid bare symbol regex"));

/// Symbols recovered from a linker MAP file. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct MapFile
{
    /// Insertion order is kept so equal-size symbols sort deterministically.
    symbols: Vec<Symbol>,
}

impl MapFile
{
    /// Read and parse a MAP file from disk.
    ///
    /// ## Errors
    ///
    /// Returns `Error::Io` if the file cannot be read. Content never fails to parse.
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading MAP file");
        let bytes = fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Parse MAP text.
    #[must_use]
    pub fn parse(content: &str) -> Self
    {
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut index: HashMap<(String, u64), usize> = HashMap::new();
        let mut in_symbol_section = false;
        let mut current_object: Option<String> = None;

        for line in content.lines() {
            if line.contains("Symbol") && line.contains("File") {
                in_symbol_section = true;
                continue;
            }
            if !in_symbol_section {
                continue;
            }

            if let Some(caps) = OBJECT_LINE.captures(line) {
                let object = caps[1].to_string();
                trace!(object = %object, "MAP object");
                current_object = Some(object);
            }

            let entry = match SYMBOL_LINE.captures(line) {
                Some(caps) => parse_entry(&caps[1], &caps[2], &caps[3]),
                None => BARE_SYMBOL_LINE
                    .captures(line)
                    .filter(|caps| !caps[1].starts_with('.'))
                    .and_then(|caps| parse_entry(&caps[1], &caps[2], &caps[3])),
            };
            let Some((name, address, size)) = entry else {
                continue;
            };
            if size == 0 {
                continue;
            }

            let mut symbol = Symbol::new(name, SymbolKind::Unknown, address, size, None);
            symbol.object.clone_from(&current_object);

            match index.get(&(symbol.name.clone(), address)) {
                Some(&slot) => {
                    if symbols[slot].size < size {
                        symbols[slot] = symbol;
                    }
                }
                None => {
                    index.insert((symbol.name.clone(), address), symbols.len());
                    symbols.push(symbol);
                }
            }
        }

        sort_by_size_desc(&mut symbols);
        debug!(symbols = symbols.len(), in_symbol_section, "parsed MAP file");
        Self { symbols }
    }

    /// All symbols, largest first.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol]
    {
        &self.symbols
    }

    /// Symbols attributed to `object`, largest first. Unknown objects yield an empty list.
    #[must_use]
    pub fn symbols_for_object(&self, object: &str) -> Vec<Symbol>
    {
        self.symbols
            .iter()
            .filter(|symbol| symbol.object.as_deref() == Some(object))
            .cloned()
            .collect()
    }

    /// Distinct object files that own at least one symbol, ordered by their largest symbol.
    #[must_use]
    pub fn objects(&self) -> Vec<String>
    {
        let mut seen = HashSet::new();
        self.symbols
            .iter()
            .filter_map(|symbol| symbol.object.as_deref())
            .filter(|object| seen.insert(*object))
            .map(str::to_string)
            .collect()
    }

    /// Union of `elf_symbols` and the MAP symbols keyed by `(name, address)`.
    ///
    /// The ELF entry wins (it has the real type and section). Its `object`
    /// is taken from the MAP twin only when it has none, so merging the same
    /// MAP twice changes nothing. MAP-only symbols are added unchanged.
    /// The result is sorted largest first.
    #[must_use]
    pub fn merge_with_elf_symbols(&self, elf_symbols: &[Symbol]) -> Vec<Symbol>
    {
        let mut merged: Vec<Symbol> = Vec::with_capacity(elf_symbols.len() + self.symbols.len());
        let mut index: HashMap<(&str, u64), usize> = HashMap::new();

        for symbol in elf_symbols {
            match index.get(&(symbol.name.as_str(), symbol.address)) {
                Some(&slot) => merged[slot] = symbol.clone(),
                None => {
                    index.insert((symbol.name.as_str(), symbol.address), merged.len());
                    merged.push(symbol.clone());
                }
            }
        }

        for symbol in &self.symbols {
            match index.get(&(symbol.name.as_str(), symbol.address)) {
                Some(&slot) => {
                    if let (None, Some(object)) = (&merged[slot].object, &symbol.object) {
                        merged[slot] = merged[slot].with_object(object.as_str());
                    }
                }
                None => {
                    index.insert((symbol.name.as_str(), symbol.address), merged.len());
                    merged.push(symbol.clone());
                }
            }
        }

        sort_by_size_desc(&mut merged);
        merged
    }
}

fn parse_entry(name: &str, address: &str, size: &str) -> Option<(String, u64, u64)>
{
    let address = u64::from_str_radix(address, 16).ok()?;
    let size = u64::from_str_radix(size, 16).ok()?;
    Some((name.to_string(), address, size))
}
