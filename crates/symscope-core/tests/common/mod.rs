//! Hand-assembled ELF images, line programs and MAP text shared by the integration tests.

#![allow(dead_code)]

use gimli::leb128;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_DYNSYM: u32 = 11;

pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;

pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;

pub const TEXT_ADDR: u64 = 0x0800_0000;
pub const DATA_ADDR: u64 = 0x2000_0000;
pub const BSS_ADDR: u64 = 0x2000_0100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class
{
    Elf32,
    Elf64,
}

impl Class
{
    fn is_64(self) -> bool
    {
        self == Class::Elf64
    }
}

#[derive(Debug, Clone)]
struct RawSection
{
    name: String,
    sh_type: u32,
    flags: u64,
    addr: u64,
    data: Vec<u8>,
    /// Only used for `SHT_NOBITS`.
    size: u64,
    link: u32,
    info: u32,
    entsize: u64,
}

impl RawSection
{
    fn new(name: &str, sh_type: u32, flags: u64, addr: u64, data: Vec<u8>) -> Self
    {
        Self {
            name: name.to_string(),
            sh_type,
            flags,
            addr,
            size: data.len() as u64,
            data,
            link: 0,
            info: 0,
            entsize: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct RawSymbol
{
    name: String,
    value: u64,
    size: u64,
    st_type: u8,
    /// Section name, or `None` for `SHN_UNDEF`.
    section: Option<String>,
    /// Explicit `st_shndx`, overriding `section`.
    shndx: Option<u16>,
}

/// Builder for little-endian ELF images.
///
/// Layout: file header, section contents (8-byte aligned), section header
/// table. `.symtab`, `.strtab` and `.shstrtab` are appended automatically.
#[derive(Debug, Clone)]
pub struct ElfFixture
{
    class: Class,
    sections: Vec<RawSection>,
    symbols: Vec<RawSymbol>,
    with_symtab: bool,
    dynamic_symbols: bool,
}

impl ElfFixture
{
    pub fn new(class: Class) -> Self
    {
        Self {
            class,
            sections: Vec::new(),
            symbols: Vec::new(),
            with_symtab: true,
            dynamic_symbols: false,
        }
    }

    /// `.text`, `.data`, `.bss` and a `.comment` section with a small RT-Thread style symbol set.
    pub fn firmware(class: Class) -> Self
    {
        Self::new(class)
            .section(".text", SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR, TEXT_ADDR, vec![0xbf; 0x300])
            .section(".data", SHT_PROGBITS, SHF_ALLOC | SHF_WRITE, DATA_ADDR, vec![0; 0x10])
            .nobits(".bss", BSS_ADDR, 0x200)
            .section(".comment", SHT_PROGBITS, 0, 0, b"GCC: (GNU Arm Embedded) 10.3.1\0".to_vec())
            .symbol("_stext", TEXT_ADDR, 0, STT_NOTYPE, ".text")
            .symbol("main", TEXT_ADDR + 0x100, 0x40, STT_FUNC, ".text")
            .symbol("rt_thread_init", TEXT_ADDR + 0x200, 0x7c, STT_FUNC, ".text")
            .symbol("rt_tick", DATA_ADDR, 0x4, STT_OBJECT, ".data")
            .symbol("rt_object_container", BSS_ADDR, 0x80, STT_OBJECT, ".bss")
            .symbol("rt_hw_console_output", TEXT_ADDR + 0x2c0, 0x40, STT_FUNC, ".text")
            .symbol("", TEXT_ADDR + 0x10, 0x8, STT_FUNC, ".text")
    }

    pub fn section(mut self, name: &str, sh_type: u32, flags: u64, addr: u64, data: Vec<u8>) -> Self
    {
        self.sections.push(RawSection::new(name, sh_type, flags, addr, data));
        self
    }

    pub fn nobits(mut self, name: &str, addr: u64, size: u64) -> Self
    {
        let mut section = RawSection::new(name, SHT_NOBITS, SHF_ALLOC | SHF_WRITE, addr, Vec::new());
        section.size = size;
        self.sections.push(section);
        self
    }

    pub fn debug_line(self, bytes: Vec<u8>) -> Self
    {
        self.section(".debug_line", SHT_PROGBITS, 0, 0, bytes)
    }

    pub fn symbol(mut self, name: &str, value: u64, size: u64, st_type: u8, section: &str) -> Self
    {
        self.symbols.push(RawSymbol {
            name: name.to_string(),
            value,
            size,
            st_type,
            section: Some(section.to_string()),
            shndx: None,
        });
        self
    }

    pub fn symbol_with_shndx(mut self, name: &str, value: u64, size: u64, shndx: u16) -> Self
    {
        self.symbols.push(RawSymbol {
            name: name.to_string(),
            value,
            size,
            st_type: STT_OBJECT,
            section: None,
            shndx: Some(shndx),
        });
        self
    }

    pub fn without_symtab(mut self) -> Self
    {
        self.with_symtab = false;
        self
    }

    /// Emit the symbols as `.dynsym`/`.dynstr` instead of `.symtab`/`.strtab`.
    pub fn dynamic_symbols(mut self) -> Self
    {
        self.dynamic_symbols = true;
        self
    }

    pub fn build(&self) -> Vec<u8>
    {
        let is_64 = self.class.is_64();
        let ehsize: usize = if is_64 { 64 } else { 52 };
        let shentsize: usize = if is_64 { 64 } else { 40 };
        let symsize: usize = if is_64 { 24 } else { 16 };

        let mut all = vec![RawSection::new("", 0, 0, 0, Vec::new())];
        all.extend(self.sections.iter().cloned());

        if self.with_symtab {
            let symtab_index = all.len();
            let mut strtab = vec![0u8];
            let mut symtab = vec![0u8; symsize];
            for symbol in &self.symbols {
                let name_offset = if symbol.name.is_empty() {
                    0
                } else {
                    let offset = strtab.len();
                    strtab.extend_from_slice(symbol.name.as_bytes());
                    strtab.push(0);
                    offset
                };
                let shndx = symbol.shndx.unwrap_or_else(|| {
                    symbol
                        .section
                        .as_ref()
                        .and_then(|name| all.iter().position(|s| &s.name == name))
                        .map_or(0, |i| i as u16)
                });
                let info = (1 << 4) | symbol.st_type;
                write_symbol(&mut symtab, is_64, name_offset as u32, symbol.value, symbol.size, info, shndx);
            }

            let (table_name, string_name, table_type) = if self.dynamic_symbols {
                (".dynsym", ".dynstr", SHT_DYNSYM)
            } else {
                (".symtab", ".strtab", SHT_SYMTAB)
            };
            let mut section = RawSection::new(table_name, table_type, 0, 0, symtab);
            section.link = (symtab_index + 1) as u32;
            section.info = 1;
            section.entsize = symsize as u64;
            all.push(section);
            all.push(RawSection::new(string_name, SHT_STRTAB, 0, 0, strtab));
        }

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(all.len() + 1);
        for section in all.iter().map(|s| s.name.as_str()).chain([".shstrtab"]) {
            if section.is_empty() {
                name_offsets.push(0u32);
            } else {
                name_offsets.push(shstrtab.len() as u32);
                shstrtab.extend_from_slice(section.as_bytes());
                shstrtab.push(0);
            }
        }
        all.push(RawSection::new(".shstrtab", SHT_STRTAB, 0, 0, shstrtab));
        let shstrndx = all.len() - 1;

        let mut out = vec![0u8; ehsize];
        let mut offsets = vec![0u64; all.len()];
        for (index, section) in all.iter().enumerate().skip(1) {
            align(&mut out, 8);
            offsets[index] = out.len() as u64;
            if section.sh_type != SHT_NOBITS {
                out.extend_from_slice(&section.data);
            }
        }
        align(&mut out, 8);
        let shoff = out.len() as u64;

        for (index, section) in all.iter().enumerate() {
            let offset = if index == 0 { 0 } else { offsets[index] };
            put_u32(&mut out, name_offsets[index]);
            put_u32(&mut out, section.sh_type);
            put_word(&mut out, is_64, section.flags);
            put_word(&mut out, is_64, section.addr);
            put_word(&mut out, is_64, offset);
            put_word(&mut out, is_64, section.size);
            put_u32(&mut out, section.link);
            put_u32(&mut out, section.info);
            put_word(&mut out, is_64, if index == 0 { 0 } else { 4 });
            put_word(&mut out, is_64, section.entsize);
        }

        let mut header = Vec::with_capacity(ehsize);
        header.extend_from_slice(&[0x7f, b'E', b'L', b'F', if is_64 { 2 } else { 1 }, 1, 1, 0]);
        header.resize(16, 0);
        put_u16(&mut header, 2); // ET_EXEC
        put_u16(&mut header, if is_64 { 62 } else { 40 });
        put_u32(&mut header, 1);
        put_word(&mut header, is_64, TEXT_ADDR + 0x101);
        put_word(&mut header, is_64, 0);
        put_word(&mut header, is_64, shoff);
        put_u32(&mut header, 0x0500_0200);
        put_u16(&mut header, ehsize as u16);
        put_u16(&mut header, 0);
        put_u16(&mut header, 0);
        put_u16(&mut header, shentsize as u16);
        put_u16(&mut header, all.len() as u16);
        put_u16(&mut header, shstrndx as u16);
        assert_eq!(header.len(), ehsize);
        out[..ehsize].copy_from_slice(&header);

        out
    }
}

fn write_symbol(out: &mut Vec<u8>, is_64: bool, name: u32, value: u64, size: u64, info: u8, shndx: u16)
{
    put_u32(out, name);
    if is_64 {
        out.push(info);
        out.push(0);
        put_u16(out, shndx);
        put_u64(out, value);
        put_u64(out, size);
    } else {
        put_u32(out, value as u32);
        put_u32(out, size as u32);
        out.push(info);
        out.push(0);
        put_u16(out, shndx);
    }
}

fn align(out: &mut Vec<u8>, to: usize)
{
    while out.len() % to != 0 {
        out.push(0);
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16)
{
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32)
{
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, value: u64)
{
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_word(out: &mut Vec<u8>, is_64: bool, value: u64)
{
    if is_64 {
        put_u64(out, value);
    } else {
        put_u32(out, value as u32);
    }
}

/// Standard opcode operand counts for `opcode_base` 13.
const STANDARD_OPCODE_LENGTHS: [u8; 12] = [0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1];

/// Assembles one `.debug_line` unit.
#[derive(Debug, Clone)]
pub struct LineProgramBuilder
{
    version: u16,
    dwarf64: bool,
    address_size: usize,
    minimum_instruction_length: u8,
    line_base: i8,
    line_range: u8,
    opcode_lengths: Vec<u8>,
    directories: Vec<String>,
    files: Vec<(String, u64)>,
    program: Vec<u8>,
}

impl LineProgramBuilder
{
    pub fn new(version: u16) -> Self
    {
        Self {
            version,
            dwarf64: false,
            address_size: 4,
            minimum_instruction_length: 1,
            line_base: -5,
            line_range: 14,
            opcode_lengths: STANDARD_OPCODE_LENGTHS.to_vec(),
            directories: Vec::new(),
            files: Vec::new(),
            program: Vec::new(),
        }
    }

    pub fn dwarf64(mut self) -> Self
    {
        self.dwarf64 = true;
        self
    }

    pub fn address_size(mut self, size: usize) -> Self
    {
        self.address_size = size;
        self
    }

    pub fn minimum_instruction_length(mut self, length: u8) -> Self
    {
        self.minimum_instruction_length = length;
        self
    }

    pub fn line_range(mut self, range: u8) -> Self
    {
        self.line_range = range;
        self
    }

    /// Replace the standard opcode table; `opcode_base` becomes `lengths.len() + 1`.
    pub fn opcode_lengths(mut self, lengths: Vec<u8>) -> Self
    {
        self.opcode_lengths = lengths;
        self
    }

    pub fn directory(mut self, dir: &str) -> Self
    {
        self.directories.push(dir.to_string());
        self
    }

    pub fn file(mut self, name: &str, dir: u64) -> Self
    {
        self.files.push((name.to_string(), dir));
        self
    }

    fn opcode_base(&self) -> u8
    {
        self.opcode_lengths.len() as u8 + 1
    }

    pub fn set_address(mut self, address: u64) -> Self
    {
        self.program.push(0);
        leb128::write::unsigned(&mut self.program, self.address_size as u64 + 1).unwrap();
        self.program.push(2);
        self.program
            .extend_from_slice(&address.to_le_bytes()[..self.address_size]);
        self
    }

    pub fn end_sequence(mut self) -> Self
    {
        self.program.extend_from_slice(&[0, 1, 1]);
        self
    }

    /// `DW_LNE_define_file`, which the decoder skips.
    pub fn define_file(mut self, name: &str) -> Self
    {
        let mut operands = name.as_bytes().to_vec();
        operands.extend_from_slice(&[0, 0, 0, 0]);
        self.program.push(0);
        leb128::write::unsigned(&mut self.program, operands.len() as u64 + 1).unwrap();
        self.program.push(3);
        self.program.extend_from_slice(&operands);
        self
    }

    pub fn copy(mut self) -> Self
    {
        self.program.push(1);
        self
    }

    pub fn advance_pc(mut self, delta: u64) -> Self
    {
        self.program.push(2);
        leb128::write::unsigned(&mut self.program, delta).unwrap();
        self
    }

    pub fn advance_line(mut self, delta: i64) -> Self
    {
        self.program.push(3);
        leb128::write::signed(&mut self.program, delta).unwrap();
        self
    }

    pub fn set_file(mut self, file: u64) -> Self
    {
        self.program.push(4);
        leb128::write::unsigned(&mut self.program, file).unwrap();
        self
    }

    pub fn set_column(mut self, column: u64) -> Self
    {
        self.program.push(5);
        leb128::write::unsigned(&mut self.program, column).unwrap();
        self
    }

    pub fn negate_stmt(mut self) -> Self
    {
        self.program.push(6);
        self
    }

    pub fn const_add_pc(mut self) -> Self
    {
        self.program.push(8);
        self
    }

    pub fn fixed_advance_pc(mut self, delta: u16) -> Self
    {
        self.program.push(9);
        self.program.extend_from_slice(&delta.to_le_bytes());
        self
    }

    /// Special opcode advancing the address by `address_advance` operations and the line by `line_advance`.
    pub fn special(mut self, address_advance: u8, line_advance: i8) -> Self
    {
        let opcode = i32::from(line_advance - self.line_base)
            + i32::from(self.line_range) * i32::from(address_advance)
            + i32::from(self.opcode_base());
        assert!((i32::from(self.opcode_base())..=255).contains(&opcode), "special opcode out of range");
        self.program.push(opcode as u8);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self
    {
        self.program.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8>
    {
        let mut header = vec![self.minimum_instruction_length];
        if self.version >= 4 {
            header.push(1);
        }
        header.push(1);
        header.push(self.line_base as u8);
        header.push(self.line_range);
        header.push(self.opcode_base());
        header.extend_from_slice(&self.opcode_lengths);
        for dir in &self.directories {
            header.extend_from_slice(dir.as_bytes());
            header.push(0);
        }
        header.push(0);
        for (name, dir) in &self.files {
            header.extend_from_slice(name.as_bytes());
            header.push(0);
            leb128::write::unsigned(&mut header, *dir).unwrap();
            header.extend_from_slice(&[0, 0]);
        }
        header.push(0);

        let mut body = self.version.to_le_bytes().to_vec();
        if self.dwarf64 {
            body.extend_from_slice(&(header.len() as u64).to_le_bytes());
        } else {
            body.extend_from_slice(&(header.len() as u32).to_le_bytes());
        }
        body.extend_from_slice(&header);
        body.extend_from_slice(&self.program);

        let mut unit = Vec::new();
        if self.dwarf64 {
            unit.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
            unit.extend_from_slice(&(body.len() as u64).to_le_bytes());
        } else {
            unit.extend_from_slice(&(body.len() as u32).to_le_bytes());
        }
        unit.extend_from_slice(&body);
        unit
    }
}

/// Line table for [`ElfFixture::firmware`]: `main` in `src/main.c`, `rt_thread_init` in `kernel/thread.c`.
pub fn firmware_debug_line() -> Vec<u8>
{
    LineProgramBuilder::new(3)
        .directory("src")
        .directory("kernel")
        .file("main.c", 1)
        .file("thread.c", 2)
        .set_address(TEXT_ADDR + 0x100)
        .advance_line(41)
        .copy()
        .special(8, 1)
        .advance_pc(0x38)
        .end_sequence()
        .set_file(2)
        .set_address(TEXT_ADDR + 0x200)
        .advance_line(99)
        .copy()
        .advance_pc(0x7c)
        .end_sequence()
        .build()
}

/// MAP text attributing the firmware symbols to object files.
pub const FIRMWARE_MAP: &str = "\
Archive member included to satisfy reference by file (symbol)

    ignored_before_heading     0x08000000       0x10

Memory Configuration

Name             Origin             Length             Attributes
FLASH            0x08000000         0x00080000         xr

Symbol                                            File

.text.main     0x08000100       0x40 build/applications/main.o
                main                0x08000100       0x40
.text.rt_thread_init 0x08000200       0x7c build/kernel/thread.o
                rt_thread_init      0x08000200       0x7c
                rt_thread_helper    0x08000280       0x20
.data.rt_tick  0x20000000       0x4 build/kernel/clock.o
                rt_tick             0x20000000       0x4
rt_hw_stack_top 0x20001000 0x200
                empty_marker        0x20002000       0x0
                rt_thread_helper    0x08000280       0x10
";
