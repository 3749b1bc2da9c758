//! # Error Types
//!
//! General error handling for symbol analysis.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for parsing and querying firmware images
///
/// Only faults that leave a table unusable are errors. Input that merely
/// fails to match a known shape (an unsupported DWARF unit, a MAP line in an
/// unexpected layout, a symbol with no line-program row) is skipped silently
/// and surfaces as `None` or an empty list.
///
/// ## Error Categories
///
/// 1. **Format errors**: Format (bad magic, class or data encoding, headers out of bounds)
/// 2. **Missing sources**: ElfNotLoaded, NothingLoaded, NoSymbolTable
/// 3. **Decode errors**: Truncated (a read ran off the end of a buffer)
/// 4. **I/O errors**: Io (reading ELF or MAP files from disk)
#[derive(Error, Debug)]
pub enum Error
{
    /// The buffer is not an ELF image this crate can decode
    ///
    /// This happens when:
    /// - The first four bytes are not `7F 45 4C 46`
    /// - `EI_CLASS` is neither 32-bit nor 64-bit
    /// - The image is big-endian
    /// - A section header or the symbol table lies outside the buffer
    #[error("Invalid ELF file: {0}")]
    Format(String),

    /// The query needs an ELF image but the analyzer was built without one
    #[error("ELF file not loaded")]
    ElfNotLoaded,

    /// The analyzer was built with neither an ELF image nor a MAP file
    #[error("No ELF or MAP file loaded")]
    NothingLoaded,

    /// The ELF image has neither `.symtab` nor `.dynsym`
    ///
    /// Fully stripped firmware images hit this. Sections can still be listed.
    #[error("ELF file has no symbol table")]
    NoSymbolTable,

    /// A fixed-width or LEB128 read ran past the end of its buffer
    ///
    /// Inside `.debug_line` this only aborts the current compilation unit.
    #[error("Unexpected end of data at offset 0x{offset:x}")]
    Truncated
    {
        /// Offset (relative to the start of the buffer) where the read began
        offset: usize,
    },

    /// I/O error (for file operations, etc.)
    ///
    /// This is a standard Rust `std::io::Error` converted to our error type.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, Error>`
///
/// ```rust
/// use symscope_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
