//! Section header table entries.

use std::ops::Range;

use super::header::ElfClass;
use crate::error::Result;
use crate::reader::ByteReader;

pub const SHT_SYMTAB: u32 = 2;
pub const SHT_DYNSYM: u32 = 11;

/// Raw section header (`Elf32_Shdr` / `Elf64_Shdr`) with class-specific fields widened to `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader
{
    /// Offset into the section header string table.
    pub name: u32,
    pub section_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

impl SectionHeader
{
    pub(crate) fn parse(reader: &mut ByteReader<'_>, class: ElfClass) -> Result<Self>
    {
        let name = reader.u32()?;
        let section_type = reader.u32()?;
        Ok(match class {
            ElfClass::Elf32 => Self {
                name,
                section_type,
                flags: u64::from(reader.u32()?),
                addr: u64::from(reader.u32()?),
                offset: u64::from(reader.u32()?),
                size: u64::from(reader.u32()?),
                link: reader.u32()?,
                info: reader.u32()?,
                addralign: u64::from(reader.u32()?),
                entsize: u64::from(reader.u32()?),
            },
            ElfClass::Elf64 => Self {
                name,
                section_type,
                flags: reader.u64()?,
                addr: reader.u64()?,
                offset: reader.u64()?,
                size: reader.u64()?,
                link: reader.u32()?,
                info: reader.u32()?,
                addralign: reader.u64()?,
                entsize: reader.u64()?,
            },
        })
    }

    pub fn is_symbol_table(&self) -> bool
    {
        self.section_type == SHT_SYMTAB || self.section_type == SHT_DYNSYM
    }

    /// File range of the section contents, if it lies inside a file of `file_len` bytes.
    pub(crate) fn file_range(&self, file_len: usize) -> Option<Range<usize>>
    {
        let start = usize::try_from(self.offset).ok()?;
        let end = start.checked_add(usize::try_from(self.size).ok()?)?;
        (end <= file_len).then_some(start..end)
    }
}
