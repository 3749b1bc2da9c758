//! # ELF Images
//!
//! Decoder for little-endian ELF32 and ELF64 firmware images: file header,
//! section header table, and the first `.symtab`/`.dynsym` symbol table.
//!
//! Everything except the DWARF line table is decoded by [`ElfFile::parse`].
//! A header, section table or symbol table that does not fit in the buffer
//! fails the whole parse with [`Error::Format`]; no partially decoded image
//! is ever returned. The line table is built from `.debug_line` on the first
//! debug-info query and cached for the lifetime of the image.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use symscope_core::elf::ElfFile;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let elf = ElfFile::open("build/rtthread.elf")?;
//!     for symbol in elf.symbols_in_section(".text")?.iter().take(5) {
//!         println!("{:>8} {}", symbol.size, symbol.name);
//!     }
//!     Ok(())
//! }
//! ```

mod header;
mod section;

use std::fs;
use std::ops::Range;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

pub use self::header::{ElfClass, ElfHeader, ELF_MAGIC};
use self::header::truncated;
pub use self::section::{SectionHeader, SHT_DYNSYM, SHT_SYMTAB};
use crate::dwarf::{LineRow, LineTable};
use crate::error::{Error, Result};
use crate::reader::{string_at, ByteReader};
use crate::types::section::{SHF_ALLOC, SHT_NOBITS};
use crate::types::{sort_by_size_desc, Section, Symbol, SymbolKind};

const DEBUG_LINE: &str = ".debug_line";

/// A parsed ELF image. Immutable after construction.
#[derive(Debug)]
pub struct ElfFile
{
    data: Vec<u8>,
    header: ElfHeader,
    section_headers: Vec<SectionHeader>,
    /// Names resolved through `.shstrtab`, parallel to `section_headers`.
    section_names: Vec<String>,
    /// Sized, named symbols, largest first. `None` when the image has no symbol table.
    symbols: Option<Vec<Symbol>>,
    line_table: OnceCell<LineTable>,
}

impl ElfFile
{
    /// Read and parse an ELF image from disk.
    ///
    /// ## Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, otherwise see [`ElfFile::parse`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading ELF image");
        Self::parse(fs::read(path)?)
    }

    /// Parse an ELF image held in memory.
    ///
    /// ## Errors
    ///
    /// Returns `Error::Format` when:
    /// - the buffer does not start with `\x7fELF` (checked before any other read)
    /// - `EI_CLASS` is not 32- or 64-bit, or the image is big-endian
    /// - the section header table, the section name table, the symbol table
    ///   or its string table lies outside the buffer
    pub fn parse(data: Vec<u8>) -> Result<Self>
    {
        let header = ElfHeader::parse(&data)?;
        let section_headers = read_section_headers(&data, &header)?;

        let shstrtab = match section_headers.get(usize::from(header.shstrndx)) {
            Some(strtab) => Some(strtab.file_range(data.len()).ok_or_else(|| {
                Error::Format(format!("section name table (index {}) out of bounds", header.shstrndx))
            })?),
            None => None,
        };
        let section_names = section_headers
            .iter()
            .map(|sh| {
                shstrtab
                    .as_ref()
                    .map(|range| string_at(&data[range.clone()], sh.name as usize))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();

        let symbols = match locate_symbol_table(&data, &section_headers)? {
            Some((table, strings)) => Some(decode_symbols(
                &data[table],
                &data[strings],
                header.class,
                &section_headers,
                &section_names,
            )?),
            None => None,
        };

        debug!(
            class = %header.class,
            machine = header.machine,
            sections = section_headers.len(),
            symbols = symbols.as_ref().map_or(0, Vec::len),
            "parsed ELF image"
        );

        Ok(Self {
            data,
            header,
            section_headers,
            section_names,
            symbols,
            line_table: OnceCell::new(),
        })
    }

    /// The decoded file header.
    #[must_use]
    pub fn header(&self) -> &ElfHeader
    {
        &self.header
    }

    #[must_use]
    pub fn is_64bit(&self) -> bool
    {
        self.header.class == ElfClass::Elf64
    }

    /// Raw section headers in table order, including the null entry.
    #[must_use]
    pub fn section_headers(&self) -> &[SectionHeader]
    {
        &self.section_headers
    }

    /// Every section with a non-empty name, in table order.
    #[must_use]
    pub fn sections(&self) -> Vec<Section>
    {
        self.section_headers
            .iter()
            .zip(&self.section_names)
            .filter(|(_, name)| !name.is_empty())
            .map(|(sh, name)| Section {
                name: name.clone(),
                address: sh.addr,
                size: sh.size,
                needs_load: sh.flags & SHF_ALLOC != 0,
                section_type: sh.section_type,
                flags: sh.flags,
            })
            .collect()
    }

    /// All sized symbols, largest first (table order among equal sizes).
    ///
    /// ## Errors
    ///
    /// Returns `Error::NoSymbolTable` if the image has no `.symtab` or `.dynsym`.
    pub fn symbols(&self) -> Result<&[Symbol]>
    {
        self.symbols.as_deref().ok_or(Error::NoSymbolTable)
    }

    /// Symbols whose section is `name`, largest first. Unknown sections yield an empty list.
    ///
    /// ## Errors
    ///
    /// Returns `Error::NoSymbolTable` if the image has no symbol table.
    pub fn symbols_in_section(&self, name: &str) -> Result<Vec<Symbol>>
    {
        Ok(self
            .symbols()?
            .iter()
            .filter(|symbol| symbol.section.as_deref() == Some(name))
            .cloned()
            .collect())
    }

    /// Contents of the first section called `name`.
    ///
    /// `None` for missing sections, `SHT_NOBITS` sections and sections whose
    /// range lies outside the file.
    #[must_use]
    pub fn section_data(&self, name: &str) -> Option<&[u8]>
    {
        let (sh, _) = self
            .section_headers
            .iter()
            .zip(&self.section_names)
            .find(|(_, section_name)| section_name.as_str() == name)?;
        if sh.section_type == SHT_NOBITS {
            return None;
        }
        let range = sh.file_range(self.data.len());
        if range.is_none() {
            warn!(section = name, offset = sh.offset, size = sh.size, "section contents out of bounds");
        }
        range.map(|range| &self.data[range])
    }

    /// Line table decoded from `.debug_line`, empty when the image has none.
    ///
    /// Decoded on first use and cached.
    pub fn line_table(&self) -> &LineTable
    {
        self.line_table.get_or_init(|| match self.section_data(DEBUG_LINE) {
            Some(bytes) => LineTable::parse(bytes),
            None => {
                debug!("no .debug_line section, source lookups disabled");
                LineTable::default()
            }
        })
    }

    /// Line-table row covering `address`, if any.
    #[must_use]
    pub fn line_info(&self, address: u64) -> Option<&LineRow>
    {
        self.line_table().lookup(address)
    }
}

fn read_section_headers(data: &[u8], header: &ElfHeader) -> Result<Vec<SectionHeader>>
{
    if header.shnum == 0 {
        return Ok(Vec::new());
    }

    let entry_size = usize::from(header.shentsize);
    if entry_size < header.class.section_header_size() {
        return Err(Error::Format(format!(
            "e_shentsize {entry_size} is smaller than a {} section header",
            header.class
        )));
    }
    let table_start = usize::try_from(header.shoff)
        .map_err(|_| Error::Format(format!("e_shoff 0x{:x} out of range", header.shoff)))?;

    (0..usize::from(header.shnum))
        .map(|index| {
            let offset = index
                .checked_mul(entry_size)
                .and_then(|rel| table_start.checked_add(rel))
                .ok_or_else(|| Error::Format(format!("section header {index} out of range")))?;
            let mut reader = ByteReader::at(data, offset).map_err(truncated)?;
            SectionHeader::parse(&mut reader, header.class).map_err(truncated)
        })
        .collect()
}

/// File ranges of the first symbol table and its linked string table.
fn locate_symbol_table(data: &[u8], headers: &[SectionHeader]) -> Result<Option<(Range<usize>, Range<usize>)>>
{
    let Some(symtab) = headers.iter().find(|sh| sh.is_symbol_table()) else {
        return Ok(None);
    };

    let table = symtab
        .file_range(data.len())
        .ok_or_else(|| Error::Format("symbol table out of bounds".to_string()))?;
    let strtab = headers
        .get(symtab.link as usize)
        .ok_or_else(|| Error::Format(format!("symbol string table index {} out of range", symtab.link)))?;
    let strings = strtab
        .file_range(data.len())
        .ok_or_else(|| Error::Format("symbol string table out of bounds".to_string()))?;

    Ok(Some((table, strings)))
}

fn decode_symbols(
    table: &[u8],
    strings: &[u8],
    class: ElfClass,
    headers: &[SectionHeader],
    section_names: &[String],
) -> Result<Vec<Symbol>>
{
    let mut symbols = Vec::new();
    for entry in table.chunks_exact(class.symbol_entry_size()) {
        let mut reader = ByteReader::new(entry);
        let name = reader.u32()?;
        let (value, size, info, shndx) = match class {
            ElfClass::Elf32 => {
                let value = u64::from(reader.u32()?);
                let size = u64::from(reader.u32()?);
                let info = reader.u8()?;
                let _other = reader.u8()?;
                (value, size, info, reader.u16()?)
            }
            ElfClass::Elf64 => {
                let info = reader.u8()?;
                let _other = reader.u8()?;
                let shndx = reader.u16()?;
                (reader.u64()?, reader.u64()?, info, shndx)
            }
        };

        if size == 0 {
            continue;
        }
        let name = string_at(strings, name as usize);
        if name.is_empty() {
            continue;
        }

        // SHN_UNDEF and the reserved SHN_LORESERVE.. range resolve to nothing
        let section = match usize::from(shndx) {
            0 => None,
            index if index < headers.len() => Some(section_names[index].clone()).filter(|s| !s.is_empty()),
            _ => None,
        };

        symbols.push(Symbol::new(name, SymbolKind::from_st_info(info), value, size, section));
    }

    sort_by_size_desc(&mut symbols);
    Ok(symbols)
}
