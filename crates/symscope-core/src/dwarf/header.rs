//! Line-number program header (DWARF versions 2 through 4).

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// Oldest `.debug_line` version we decode.
pub(crate) const MIN_VERSION: u16 = 2;
/// Newest `.debug_line` version we decode. Version 5 replaced the directory
/// and file tables with `DW_LNCT_*` content descriptions.
pub(crate) const MAX_VERSION: u16 = 4;

/// Extent of one compilation unit's contribution to `.debug_line`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UnitBounds
{
    /// Offset of the `unit_length` field.
    pub(crate) start: usize,
    /// Offset of the `version` field.
    pub(crate) body_start: usize,
    /// One past the last byte of the unit.
    pub(crate) end: usize,
    /// 64-bit DWARF (`unit_length` escape `0xffffffff`).
    pub(crate) dwarf64: bool,
}

impl UnitBounds
{
    /// Read the `unit_length` field at `offset`.
    ///
    /// Returns `None` when the length is zero or claims more bytes than the
    /// section holds; no later unit boundary can be trusted after that.
    pub(crate) fn read(section: &[u8], offset: usize) -> Result<Option<Self>>
    {
        let mut reader = ByteReader::at(section, offset)?;
        let mut length = u64::from(reader.u32()?);
        let dwarf64 = length == 0xffff_ffff;
        if dwarf64 {
            length = reader.u64()?;
        }
        let body_start = reader.position();
        let end = usize::try_from(length)
            .ok()
            .and_then(|len| body_start.checked_add(len))
            .filter(|end| *end <= section.len());
        match end {
            Some(end) if length > 0 => Ok(Some(Self {
                start: offset,
                body_start,
                end,
                dwarf64,
            })),
            _ => Ok(None),
        }
    }
}

/// Decoded line-program header of a single compilation unit.
///
/// Only lives while its unit is being decoded. The target address width is
/// not part of a version 2-4 header; it comes from the operand length of each
/// `DW_LNE_set_address`.
#[derive(Debug, Clone)]
pub(crate) struct LineProgramHeader
{
    pub(crate) version: u16,
    pub(crate) minimum_instruction_length: u8,
    pub(crate) maximum_operations_per_instruction: u8,
    pub(crate) default_is_stmt: bool,
    pub(crate) line_base: i8,
    pub(crate) line_range: u8,
    pub(crate) opcode_base: u8,
    /// Operand counts for standard opcodes `1..opcode_base`, index 0 is opcode 1.
    pub(crate) standard_opcode_lengths: Vec<u8>,
    pub(crate) include_directories: Vec<String>,
    /// Entries of the file table, already joined with their directory.
    pub(crate) file_names: Vec<String>,
    /// Offset of the first opcode.
    pub(crate) program_start: usize,
}

/// Why a unit was passed over without decoding its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason
{
    UnsupportedVersion(u16),
    ZeroLineRange,
}

impl LineProgramHeader
{
    /// Decode the header of the unit described by `bounds`.
    ///
    /// `unit` must end at `bounds.end` so no read can spill into the next unit.
    pub(crate) fn parse(unit: &[u8], bounds: &UnitBounds) -> Result<std::result::Result<Self, SkipReason>>
    {
        let mut reader = ByteReader::at(unit, bounds.body_start)?;

        let version = reader.u16()?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Ok(Err(SkipReason::UnsupportedVersion(version)));
        }

        let header_length = if bounds.dwarf64 {
            reader.u64()?
        } else {
            u64::from(reader.u32()?)
        };
        let header_start = reader.position();
        let program_start = usize::try_from(header_length)
            .ok()
            .and_then(|len| header_start.checked_add(len))
            .filter(|start| *start <= unit.len())
            .ok_or(Error::Truncated { offset: header_start })?;

        let minimum_instruction_length = reader.u8()?;
        let maximum_operations_per_instruction = if version >= 4 { reader.u8()? } else { 1 };
        let default_is_stmt = reader.u8()? != 0;
        let line_base = reader.i8()?;
        let line_range = reader.u8()?;
        let opcode_base = reader.u8()?;

        let mut standard_opcode_lengths = Vec::with_capacity(usize::from(opcode_base.saturating_sub(1)));
        for _ in 1..opcode_base {
            standard_opcode_lengths.push(reader.u8()?);
        }

        if line_range == 0 {
            return Ok(Err(SkipReason::ZeroLineRange));
        }

        let include_directories = read_string_list(&mut reader)?;

        let mut file_names = Vec::new();
        loop {
            if reader.peek() == Some(0) {
                reader.skip(1)?;
                break;
            }
            let name = reader.cstr()?;
            let directory = reader.uleb128()?;
            let _mtime = reader.uleb128()?;
            let _length = reader.uleb128()?;
            file_names.push(join_directory(&include_directories, directory, name));
        }

        Ok(Ok(Self {
            version,
            minimum_instruction_length,
            maximum_operations_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
            include_directories,
            file_names,
            program_start,
        }))
    }

    /// File table entry for a 1-based `DW_LNS_set_file` index.
    pub(crate) fn file(&self, index: u64) -> Option<&str>
    {
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        self.file_names.get(index).map(String::as_str)
    }

    /// Declared operand count of a standard opcode, 0 when undeclared.
    pub(crate) fn operand_count(&self, opcode: u8) -> u8
    {
        usize::from(opcode)
            .checked_sub(1)
            .and_then(|index| self.standard_opcode_lengths.get(index))
            .copied()
            .unwrap_or(0)
    }
}

/// Sequence of NUL-terminated strings ending with an empty string.
fn read_string_list(reader: &mut ByteReader<'_>) -> Result<Vec<String>>
{
    let mut list = Vec::new();
    loop {
        if reader.peek() == Some(0) {
            reader.skip(1)?;
            return Ok(list);
        }
        list.push(reader.cstr()?);
    }
}

/// Directory index 0 is the compilation directory, which the line table does
/// not name; entries keep their bare file name in that case.
fn join_directory(directories: &[String], index: u64, name: String) -> String
{
    let directory = usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| directories.get(i));
    match directory {
        Some(dir) => format!("{dir}/{name}"),
        None => name,
    }
}
