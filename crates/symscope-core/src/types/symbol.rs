//! Symbol and source location types.

use std::cmp::Reverse;
use std::fmt;

use rustc_demangle::try_demangle;

/// ELF symbol type (`STT_*`, the low nibble of `st_info`).
///
/// Symbols recovered only from a linker MAP file carry [`SymbolKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind
{
    /// `STT_NOTYPE`
    NoType,
    /// `STT_OBJECT`: variables, arrays, constant tables.
    Object,
    /// `STT_FUNC`
    Func,
    /// `STT_SECTION`
    Section,
    /// `STT_FILE`
    File,
    /// `STT_COMMON`
    Common,
    /// `STT_TLS`
    Tls,
    /// Any other value, or no ELF information at all.
    Unknown,
}

impl SymbolKind
{
    /// Decode the type nibble of an ELF `st_info` byte.
    #[must_use]
    pub fn from_st_info(info: u8) -> Self
    {
        match info & 0xf {
            0 => SymbolKind::NoType,
            1 => SymbolKind::Object,
            2 => SymbolKind::Func,
            3 => SymbolKind::Section,
            4 => SymbolKind::File,
            5 => SymbolKind::Common,
            6 => SymbolKind::Tls,
            _ => SymbolKind::Unknown,
        }
    }
}

impl fmt::Display for SymbolKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolKind::NoType => "NOTYPE",
            SymbolKind::Object => "OBJECT",
            SymbolKind::Func => "FUNC",
            SymbolKind::Section => "SECTION",
            SymbolKind::File => "FILE",
            SymbolKind::Common => "COMMON",
            SymbolKind::Tls => "TLS",
            SymbolKind::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Programming language associated with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    /// Rust symbol (detected via mangling).
    Rust,
    /// C++ symbol (Itanium mangling without Rust extensions).
    Cpp,
    /// C symbol or unmangled global.
    C,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
        };
        write!(f, "{label}")
    }
}

/// Source code location resolved from the DWARF line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// Path as recorded in the line-program file table (`dir/name` when a directory is known).
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl fmt::Display for SourceLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A sized symbol from the ELF symbol table, the MAP file, or both.
///
/// Values are never edited after a parser produces them; merging and
/// debug-info resolution build new values through [`Symbol::with_object`]
/// and [`Symbol::with_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol
{
    /// Raw (possibly mangled) linkage name.
    pub name: String,
    /// ELF symbol type.
    pub kind: SymbolKind,
    /// Link-time address.
    pub address: u64,
    /// Size in bytes, always non-zero.
    pub size: u64,
    /// Name of the section the symbol lives in.
    pub section: Option<String>,
    /// Object file the linker attributed the symbol to (MAP files only).
    pub object: Option<String>,
    /// Source file of the line-table row covering `address`.
    pub source_file: Option<String>,
    /// Source line of the line-table row covering `address`.
    pub source_line: Option<u32>,
}

impl Symbol
{
    /// Symbol with no object or source attribution.
    pub fn new(name: impl Into<String>, kind: SymbolKind, address: u64, size: u64, section: Option<String>) -> Self
    {
        Self {
            name: name.into(),
            kind,
            address,
            size,
            section,
            object: None,
            source_file: None,
            source_line: None,
        }
    }

    /// Copy of this symbol attributed to `object`.
    #[must_use]
    pub fn with_object(&self, object: impl Into<String>) -> Self
    {
        Self {
            object: Some(object.into()),
            ..self.clone()
        }
    }

    /// Copy of this symbol carrying `location`.
    #[must_use]
    pub fn with_source(&self, location: SourceLocation) -> Self
    {
        Self {
            source_file: Some(location.file),
            source_line: Some(location.line),
            ..self.clone()
        }
    }

    /// Address formatted the way size reports print it, e.g. `0x8000134`.
    #[must_use]
    pub fn hex_address(&self) -> String
    {
        format!("0x{:x}", self.address)
    }

    /// Source location, when both file and line were resolved.
    #[must_use]
    pub fn source_location(&self) -> Option<SourceLocation>
    {
        match (&self.source_file, self.source_line) {
            (Some(file), Some(line)) => Some(SourceLocation { file: file.clone(), line }),
            _ => None,
        }
    }

    /// Demangled name if the symbol is a mangled Rust name.
    #[must_use]
    pub fn demangled(&self) -> Option<String>
    {
        // `{:#}` drops the trailing hash
        try_demangle(&self.name).ok().map(|d| format!("{d:#}"))
    }

    /// Preferred presentation (demangled fallback to raw).
    #[must_use]
    pub fn display_name(&self) -> String
    {
        self.demangled().unwrap_or_else(|| self.name.clone())
    }

    /// Language classification from the mangling scheme.
    #[must_use]
    pub fn language(&self) -> SymbolLanguage
    {
        let raw = self.name.as_str();
        if raw.starts_with("_R") || (raw.starts_with("_ZN") && try_demangle(raw).is_ok()) {
            SymbolLanguage::Rust
        } else if raw.starts_with("_Z") {
            SymbolLanguage::Cpp
        } else {
            SymbolLanguage::C
        }
    }
}

impl fmt::Display for Symbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({}, {} bytes @ {})", self.display_name(), self.kind, self.size, self.hex_address())
    }
}

/// Sort symbols largest first, keeping the incoming order among equal sizes.
pub(crate) fn sort_by_size_desc(symbols: &mut [Symbol])
{
    symbols.sort_by_key(|symbol| Reverse(symbol.size));
}
