//! ELF file header.

use std::fmt;

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// `\x7fELF`
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

/// Word size of the image (`EI_CLASS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass
{
    /// ELF32, typical for Cortex-M and RISC-V 32 firmware.
    Elf32,
    /// ELF64
    Elf64,
}

impl ElfClass
{
    /// Size of a section header entry.
    #[must_use]
    pub fn section_header_size(self) -> usize
    {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of a symbol table entry.
    #[must_use]
    pub fn symbol_entry_size(self) -> usize
    {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    fn file_header_size(self) -> usize
    {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }
}

impl fmt::Display for ElfClass
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ElfClass::Elf32 => write!(f, "ELF32"),
            ElfClass::Elf64 => write!(f, "ELF64"),
        }
    }
}

/// Decoded ELF file header. Address-sized fields are widened to `u64` for ELF32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfHeader
{
    pub class: ElfClass,
    /// `EI_DATA`, always `ELFDATA2LSB` once parsed.
    pub data_encoding: u8,
    pub version: u8,
    pub os_abi: u8,
    pub abi_version: u8,
    /// `e_type`: relocatable, executable, shared object, core.
    pub object_type: u16,
    /// `e_machine`, e.g. 40 for ARM, 243 for RISC-V.
    pub machine: u16,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader
{
    /// Validate the identification bytes and decode the file header.
    ///
    /// The magic is checked before anything else is read.
    pub fn parse(data: &[u8]) -> Result<Self>
    {
        if data.len() < ELF_MAGIC.len() || data[..4] != ELF_MAGIC {
            return Err(Error::Format("missing \\x7fELF magic".to_string()));
        }

        let mut reader = ByteReader::at(data, 4).map_err(truncated)?;
        let class = match reader.u8().map_err(truncated)? {
            ELFCLASS32 => ElfClass::Elf32,
            ELFCLASS64 => ElfClass::Elf64,
            other => return Err(Error::Format(format!("unsupported EI_CLASS {other}"))),
        };
        let data_encoding = reader.u8().map_err(truncated)?;
        if data_encoding != ELFDATA2LSB {
            return Err(Error::Format(format!(
                "unsupported EI_DATA {data_encoding}, only little-endian images are supported"
            )));
        }
        if data.len() < class.file_header_size() {
            return Err(Error::Format(format!("file header truncated at {} bytes", data.len())));
        }

        Self::decode(&mut reader, class, data_encoding).map_err(truncated)
    }

    fn decode(reader: &mut ByteReader<'_>, class: ElfClass, data_encoding: u8) -> Result<Self>
    {
        let version = reader.u8()?;
        let os_abi = reader.u8()?;
        let abi_version = reader.u8()?;
        reader.seek(16)?;
        let object_type = reader.u16()?;
        let machine = reader.u16()?;
        let _e_version = reader.u32()?;
        let (entry, phoff, shoff) = match class {
            ElfClass::Elf32 => (
                u64::from(reader.u32()?),
                u64::from(reader.u32()?),
                u64::from(reader.u32()?),
            ),
            ElfClass::Elf64 => (reader.u64()?, reader.u64()?, reader.u64()?),
        };

        Ok(Self {
            class,
            data_encoding,
            version,
            os_abi,
            abi_version,
            object_type,
            machine,
            entry,
            phoff,
            shoff,
            flags: reader.u32()?,
            ehsize: reader.u16()?,
            phentsize: reader.u16()?,
            phnum: reader.u16()?,
            shentsize: reader.u16()?,
            shnum: reader.u16()?,
            shstrndx: reader.u16()?,
        })
    }
}

/// Header-level truncation means the image is unusable.
pub(crate) fn truncated(err: Error) -> Error
{
    match err {
        Error::Truncated { offset } => Error::Format(format!("unexpected end of file at offset 0x{offset:x}")),
        other => other,
    }
}
