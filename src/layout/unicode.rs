//! `UNICODE_STRING` descriptors and UTF-16LE text decoding.
//!
//! A `UNICODE_STRING` is a counted string: a byte length, a capacity, and a pointer to a
//! UTF-16LE buffer living elsewhere in the target's address space. The pointer sits at offset
//! `pointer_bytes` because of alignment padding after the two 16-bit counts on 64-bit targets.

use widestring::U16Str;

use crate::{
    file::{io::read_le_at, parser::Parser},
    layout::PointerWidth,
    Result,
};

/// Size in bytes of a `UNICODE_STRING` descriptor (8 or 16).
#[must_use]
pub const fn descriptor_size(width: PointerWidth) -> usize {
    2 * width.bytes()
}

/// A decoded `UNICODE_STRING` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeStringRef {
    /// Length of the string in bytes, without a terminator
    pub length: u16,
    /// Capacity of the buffer in bytes
    pub max_length: u16,
    /// Target address of the UTF-16LE buffer
    pub buffer_address: u64,
}

impl UnicodeStringRef {
    /// Decode a descriptor from its raw bytes.
    ///
    /// # Arguments
    /// * `data` - At least [`descriptor_size`] bytes
    /// * `width` - Target pointer width
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
    pub fn parse(data: &[u8], width: PointerWidth) -> Result<Self> {
        let mut offset = 0;
        let length = read_le_at::<u16>(data, &mut offset)?;
        let max_length = read_le_at::<u16>(data, &mut offset)?;

        let mut parser = Parser::new(data);
        parser.advance_by(width.bytes())?;
        let buffer_address = parser.read_ptr(width)?;

        Ok(UnicodeStringRef {
            length,
            max_length,
            buffer_address,
        })
    }

    /// `true` if the descriptor names no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Decode UTF-16LE bytes into host text.
///
/// Decoding uses the longest even-length prefix of `bytes` and ends at the first NUL code unit.
/// Unpaired surrogates are replaced with U+FFFD.
#[must_use]
pub fn utf16le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();

    U16Str::from_slice(&units).to_string_lossy()
}

/// Encode host text as UTF-16LE bytes without a terminator.
#[must_use]
pub fn string_to_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
