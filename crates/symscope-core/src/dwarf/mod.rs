//! # DWARF Line Tables
//!
//! Decoder for the `.debug_line` section: runs every compilation unit's
//! line-number program and keeps the resulting rows in one address-ordered
//! table.
//!
//! ## Supported input
//!
//! - DWARF versions 2, 3 and 4, in both the 32-bit and 64-bit DWARF formats
//! - Little-endian targets only
//!
//! Units with another version (including DWARF 5, whose file and directory
//! tables use `DW_LNCT_*` content descriptions) are skipped. A unit that ends
//! in the middle of an opcode keeps the rows it produced before the fault and
//! decoding resumes at the next unit.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use symscope_core::dwarf::LineTable;
//!
//! # let debug_line: Vec<u8> = Vec::new();
//! let table = LineTable::parse(&debug_line);
//! if let Some(row) = table.lookup(0x0800_0134) {
//!     println!("{}:{}", row.file, row.line);
//! }
//! ```

mod header;
mod program;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use self::header::{LineProgramHeader, SkipReason, UnitBounds};
use self::program::LineProgram;
use crate::error::Result;
use crate::reader::ByteReader;
use crate::types::SourceLocation;

/// One row of the line-number matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRow
{
    /// First address covered by this row.
    pub address: u64,
    /// Source file, joined with its include directory when one is recorded.
    pub file: String,
    /// 1-based source line (0 when the program drove it below 1).
    pub line: u32,
    /// 1-based column, 0 when unknown.
    pub column: u32,
    /// Recommended breakpoint location.
    pub is_stmt: bool,
    /// Start of a basic block.
    pub basic_block: bool,
    /// First address past the end of a sequence.
    pub end_sequence: bool,
}

impl LineRow
{
    /// File and line of this row.
    #[must_use]
    pub fn location(&self) -> SourceLocation
    {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
        }
    }
}

/// Address-to-source table decoded from `.debug_line`.
#[derive(Debug, Clone, Default)]
pub struct LineTable
{
    rows: BTreeMap<u64, LineRow>,
}

impl LineTable
{
    /// Decode every compilation unit of a `.debug_line` section.
    ///
    /// Never fails: unsupported or truncated units are skipped and logged.
    #[must_use]
    pub fn parse(section: &[u8]) -> Self
    {
        let mut rows = BTreeMap::new();
        let mut decoded = 0usize;
        let mut skipped = 0usize;
        let mut offset = 0usize;

        while offset < section.len() {
            let bounds = match UnitBounds::read(section, offset) {
                Ok(Some(bounds)) => bounds,
                Ok(None) => {
                    debug!(offset, "line table unit length is zero or out of range, stopping");
                    break;
                }
                Err(err) => {
                    debug!(offset, %err, "trailing bytes after last line table unit");
                    break;
                }
            };

            match decode_unit(&section[..bounds.end], &bounds, &mut rows) {
                Ok(Ok(())) => decoded += 1,
                Ok(Err(reason)) => {
                    skipped += 1;
                    debug!(offset = bounds.start, ?reason, "skipping line table unit");
                }
                Err(err) => {
                    skipped += 1;
                    warn!(offset = bounds.start, %err, "line table unit truncated");
                }
            }
            offset = bounds.end;
        }

        debug!(decoded, skipped, rows = rows.len(), "decoded .debug_line");
        Self { rows }
    }

    /// Row covering `address`: an exact match, else the row with the greatest
    /// address below it.
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<&LineRow>
    {
        self.rows.range(..=address).next_back().map(|(_, row)| row)
    }

    /// All rows in ascending address order.
    pub fn rows(&self) -> impl Iterator<Item = &LineRow>
    {
        self.rows.values()
    }

    /// Number of distinct row addresses.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.rows.len()
    }

    /// `true` when no row was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.rows.is_empty()
    }
}

fn decode_unit(
    unit: &[u8],
    bounds: &UnitBounds,
    rows: &mut BTreeMap<u64, LineRow>,
) -> Result<std::result::Result<(), SkipReason>>
{
    let header = match LineProgramHeader::parse(unit, bounds)? {
        Ok(header) => header,
        Err(reason) => return Ok(Err(reason)),
    };

    let mut reader = ByteReader::at(unit, header.program_start)?;
    let mut program = LineProgram::new(&header);
    let outcome = program.run(&mut reader, rows);

    debug!(
        offset = bounds.start,
        version = header.version,
        max_ops = header.maximum_operations_per_instruction,
        directories = header.include_directories.len(),
        files = header.file_names.len(),
        rows = program.emitted(),
        "line program unit"
    );
    outcome.map(Ok)
}
