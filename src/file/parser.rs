//! Low-level byte stream parser for control block and section decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used to read Windows structures out of raw section bytes and target memory dumps. It
//! offers bounds-checked access to little-endian data, pointer-width aware reads, and the two
//! string encodings found in these structures (NUL-terminated ANSI and UTF-16LE).
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_ptr`] - Read a pointer-width value
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a run of bytes
//!
//! ## String Methods
//! - [`crate::file::parser::Parser::read_string_utf8`] - NUL-terminated narrow strings
//! - [`crate::file::parser::Parser::read_string_utf16`] - Fixed-length UTF-16LE strings
//!
//! # Usage Examples
//!
//! ```rust
//! use winscope::{Parser, PointerWidth};
//!
//! let data = [0x03, 0x00, 0x00, 0x00, 0x00, 0x10, 0x40, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let tag = parser.read_le::<u32>()?;
//! let base = parser.read_ptr(PointerWidth::Bits32)?;
//! assert_eq!(tag, 3);
//! assert_eq!(base, 0x0040_1000);
//! # Ok::<(), winscope::Error>(())
//! ```

use widestring::U16Str;

use crate::{
    file::io::{read_le_at, read_le_at_ptr, ByteIO},
    layout::PointerWidth,
    Result,
};

/// A generic binary data parser for reading Windows structures.
///
/// `Parser` provides a cursor-based interface for reading little-endian binary data. The
/// parser maintains an internal position cursor and checks bounds before every access, so
/// truncated or corrupted sections produce errors instead of over-reads.
///
/// # Examples
///
/// ```rust
/// use winscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// let last_bytes = parser.read_le::<u16>()?;
/// assert_eq!(last_bytes, 0x0807);
/// # Ok::<(), winscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Arguments
    /// * `pos` - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Peek at a value of type `T` in little-endian format without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn peek_le<T: ByteIO>(&self) -> Result<T> {
        let mut temp_position = self.position;
        read_le_at::<T>(self.data, &mut temp_position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a pointer-width value and advance the position by 4 or 8 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_ptr(&mut self, width: PointerWidth) -> Result<u64> {
        read_le_at_ptr(self.data, &mut self.position, width)
    }

    /// Borrow `length` bytes starting at the cursor and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(length) else {
            return Err(out_of_bounds_error!());
        };
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a NUL-terminated narrow string.
    ///
    /// Reading stops at the first NUL byte or at the end of the buffer, whichever comes first;
    /// a missing terminator is not an error. Invalid UTF-8 sequences are replaced.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is already at the end of the data.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        if self.position > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let start = self.position;
        let end = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.data.len(), |nul| start + nul);

        let string_data = &self.data[start..end];
        self.position = if end < self.data.len() { end + 1 } else { end };

        Ok(String::from_utf8_lossy(string_data).into_owned())
    }

    /// Read `length` bytes as a UTF-16LE string.
    ///
    /// The string ends at the first NUL code unit inside the range, if any. Unpaired surrogates
    /// are replaced; a trailing odd byte is rejected so that half a code unit is never decoded.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain, or
    /// [`crate::Error::Malformed`] if `length` is odd.
    pub fn read_string_utf16(&mut self, length: usize) -> Result<String> {
        if length % 2 != 0 {
            return Err(malformed_error!("Invalid UTF-16 length - {}", length));
        }

        let bytes = self.read_bytes(length)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();

        Ok(U16Str::from_slice(&units).to_string_lossy())
    }
}
