//! Line-number program state machine.

use std::collections::BTreeMap;

use super::header::LineProgramHeader;
use super::LineRow;
use crate::error::Result;
use crate::reader::ByteReader;

// Standard opcodes
const DW_LNS_COPY: u8 = 1;
const DW_LNS_ADVANCE_PC: u8 = 2;
const DW_LNS_ADVANCE_LINE: u8 = 3;
const DW_LNS_SET_FILE: u8 = 4;
const DW_LNS_SET_COLUMN: u8 = 5;
const DW_LNS_NEGATE_STMT: u8 = 6;
const DW_LNS_SET_BASIC_BLOCK: u8 = 7;
const DW_LNS_CONST_ADD_PC: u8 = 8;
const DW_LNS_FIXED_ADVANCE_PC: u8 = 9;

// Extended opcodes
const DW_LNE_END_SEQUENCE: u8 = 1;
const DW_LNE_SET_ADDRESS: u8 = 2;

/// State machine registers.
#[derive(Debug, Clone)]
struct Registers
{
    address: u64,
    file: u64,
    line: i64,
    column: u64,
    is_stmt: bool,
    basic_block: bool,
    end_sequence: bool,
}

impl Registers
{
    fn new(default_is_stmt: bool) -> Self
    {
        Self {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
        }
    }
}

/// Executes one unit's program, appending rows to a shared table.
pub(crate) struct LineProgram<'h>
{
    header: &'h LineProgramHeader,
    regs: Registers,
    emitted: usize,
}

impl<'h> LineProgram<'h>
{
    pub(crate) fn new(header: &'h LineProgramHeader) -> Self
    {
        Self {
            header,
            regs: Registers::new(header.default_is_stmt),
            emitted: 0,
        }
    }

    /// Rows appended so far.
    pub(crate) fn emitted(&self) -> usize
    {
        self.emitted
    }

    /// Run opcodes until `reader` is exhausted.
    ///
    /// `reader` must start at the first opcode and end at the unit end. Rows
    /// emitted before a truncation error stay in `rows`.
    pub(crate) fn run(&mut self, reader: &mut ByteReader<'_>, rows: &mut BTreeMap<u64, LineRow>) -> Result<()>
    {
        while !reader.is_empty() {
            let opcode = reader.u8()?;
            if opcode == 0 {
                self.extended(reader, rows)?;
            } else if opcode < self.header.opcode_base {
                self.standard(opcode, reader, rows)?;
            } else {
                self.special(opcode, rows);
            }
        }
        Ok(())
    }

    fn extended(&mut self, reader: &mut ByteReader<'_>, rows: &mut BTreeMap<u64, LineRow>) -> Result<()>
    {
        let length = reader.uleb128()?;
        if length == 0 {
            return Ok(());
        }
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        let sub_opcode = reader.u8()?;
        let operand_start = reader.position();
        let operand_len = length - 1;

        match sub_opcode {
            DW_LNE_END_SEQUENCE => {
                self.regs.end_sequence = true;
                self.emit(rows);
                self.regs = Registers::new(self.header.default_is_stmt);
            }
            DW_LNE_SET_ADDRESS => {
                self.regs.address = reader.address(operand_len)?;
            }
            // DW_LNE_define_file and vendor extensions carry nothing we keep
            _ => {}
        }

        reader.seek(operand_start.saturating_add(operand_len))
    }

    fn standard(&mut self, opcode: u8, reader: &mut ByteReader<'_>, rows: &mut BTreeMap<u64, LineRow>) -> Result<()>
    {
        let min_inst = u64::from(self.header.minimum_instruction_length);
        match opcode {
            DW_LNS_COPY => {
                self.emit(rows);
                self.regs.basic_block = false;
            }
            DW_LNS_ADVANCE_PC => {
                let advance = reader.uleb128()?;
                self.regs.address = self.regs.address.wrapping_add(advance.wrapping_mul(min_inst));
            }
            DW_LNS_ADVANCE_LINE => {
                let delta = reader.sleb128()?;
                self.regs.line = self.regs.line.wrapping_add(delta);
            }
            DW_LNS_SET_FILE => self.regs.file = reader.uleb128()?,
            DW_LNS_SET_COLUMN => self.regs.column = reader.uleb128()?,
            DW_LNS_NEGATE_STMT => self.regs.is_stmt = !self.regs.is_stmt,
            DW_LNS_SET_BASIC_BLOCK => self.regs.basic_block = true,
            DW_LNS_CONST_ADD_PC => {
                let adjusted = u64::from(255 - self.header.opcode_base);
                let step = adjusted / u64::from(self.header.line_range);
                self.regs.address = self.regs.address.wrapping_add(step * min_inst);
            }
            DW_LNS_FIXED_ADVANCE_PC => {
                let advance = reader.u16()?;
                self.regs.address = self.regs.address.wrapping_add(u64::from(advance));
            }
            _ => {
                for _ in 0..self.header.operand_count(opcode) {
                    reader.uleb128()?;
                }
            }
        }
        Ok(())
    }

    fn special(&mut self, opcode: u8, rows: &mut BTreeMap<u64, LineRow>)
    {
        let adjusted = opcode - self.header.opcode_base;
        let line_range = self.header.line_range;
        let step = u64::from(adjusted / line_range) * u64::from(self.header.minimum_instruction_length);
        let line_delta = i64::from(self.header.line_base) + i64::from(adjusted % line_range);

        self.regs.address = self.regs.address.wrapping_add(step);
        self.regs.line = self.regs.line.wrapping_add(line_delta);
        self.emit(rows);
        self.regs.basic_block = false;
    }

    /// Append a row for the current registers. Rows whose file index is not
    /// in the file table are dropped, a later row at the same address wins.
    fn emit(&mut self, rows: &mut BTreeMap<u64, LineRow>)
    {
        let Some(file) = self.header.file(self.regs.file) else {
            return;
        };
        let row = LineRow {
            address: self.regs.address,
            file: file.to_string(),
            line: u32::try_from(self.regs.line).unwrap_or(0),
            column: u32::try_from(self.regs.column).unwrap_or(u32::MAX),
            is_stmt: self.regs.is_stmt,
            basic_block: self.regs.basic_block,
            end_sequence: self.regs.end_sequence,
        };
        rows.insert(row.address, row);
        self.emitted += 1;
    }
}
