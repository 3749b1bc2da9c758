//! Section summary type.

use std::fmt;

/// `SHF_ALLOC`: the section occupies memory at run time.
pub const SHF_ALLOC: u64 = 0x2;

/// `SHT_NOBITS`: the section occupies no file space (`.bss`).
pub const SHT_NOBITS: u32 = 8;

/// A named ELF section as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section
{
    /// Name resolved through the section header string table.
    pub name: String,
    /// Link-time address (`sh_addr`).
    pub address: u64,
    /// Size in bytes (`sh_size`).
    pub size: u64,
    /// `true` when `SHF_ALLOC` is set.
    pub needs_load: bool,
    /// Raw `sh_type`.
    pub section_type: u32,
    /// Raw `sh_flags`.
    pub flags: u64,
}

impl Section
{
    /// `true` for sections that take flash/file space as well as memory.
    #[must_use]
    pub fn occupies_file(&self) -> bool
    {
        self.section_type != SHT_NOBITS
    }
}

impl fmt::Display for Section
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} @ 0x{:x} ({} bytes)", self.name, self.address, self.size)
    }
}
