//! Static byte-layout catalog for the Windows process control blocks.
//!
//! Every structure this crate decodes out of a live process or a dump has one fixed layout per
//! pointer width. This module is the single place where those offsets live, so that the chain
//! walker in [`crate::process`] and the section scanner in [`crate::dump`] never disagree about
//! where a field sits.
//!
//! # Key Components
//!
//! - [`crate::layout::PointerWidth`] - 32-bit or 64-bit target, selects every other table
//! - [`crate::layout::LayoutOffsets`] - TIB → PEB → process parameters offsets
//! - [`crate::layout::offsets_for`] - Lookup of the offsets for one width
//! - [`crate::layout::tib`] - Thread Information Block slot catalog
//! - [`crate::layout::unicode`] - `UNICODE_STRING` descriptor decoding
//! - [`crate::layout::exception`] - `EXCEPTION_RECORD` shapes, codes and flags
//!
//! # Examples
//!
//! ```rust
//! use winscope::{offsets_for, PointerWidth};
//!
//! let offsets = offsets_for(PointerWidth::Bits64);
//! assert_eq!(offsets.peb_offset_in_tib, 96);
//! assert_eq!(offsets.command_line_offset, 112);
//!
//! let width = PointerWidth::try_from(32_u32)?;
//! assert_eq!(width.bytes(), 4);
//! # Ok::<(), winscope::Error>(())
//! ```

pub mod exception;
pub mod tib;
pub mod unicode;

use std::fmt;

use crate::{file::io::read_le_at_ptr, Error::NotSupported, Result};

/// Pointer width of the debugged target.
///
/// Fixed once per target architecture and never mixed within one decode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    /// 32-bit target (x86, or WOW64 processes)
    Bits32,
    /// 64-bit target (x86-64, AArch64)
    Bits64,
}

impl PointerWidth {
    /// Size of a pointer in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }

    /// Size of a pointer in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            PointerWidth::Bits32 => 32,
            PointerWidth::Bits64 => 64,
        }
    }

    /// Format `value` as a zero-padded hex string with two digits per pointer byte.
    ///
    /// Values wider than the pointer are printed in full.
    #[must_use]
    pub fn hex(self, value: u64) -> String {
        format!("{:0width$x}", value, width = self.bytes() * 2)
    }
}

impl TryFrom<u32> for PointerWidth {
    type Error = crate::Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            32 => Ok(PointerWidth::Bits32),
            64 => Ok(PointerWidth::Bits64),
            _ => Err(NotSupported),
        }
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Byte offsets of the fields the chain walker follows.
///
/// One instance exists per [`PointerWidth`]; both are compile-time constants matching the
/// documented `NT_TIB`, `PEB` and `RTL_USER_PROCESS_PARAMETERS` layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOffsets {
    /// Offset of the PEB pointer inside the TIB
    pub peb_offset_in_tib: u64,
    /// Offset of the `ProcessParameters` pointer inside the PEB
    pub process_parameters_offset_in_peb: u64,
    /// Offset of the `CommandLine` `UNICODE_STRING` inside the process parameters
    pub command_line_offset: u64,
    /// Offset of the `CurrentDirectory.DosPath` `UNICODE_STRING` inside the process parameters
    pub cwd_offset: u64,
    /// Offset of the `ImagePathName` `UNICODE_STRING` inside the process parameters
    pub exe_path_offset: u64,
    /// Offset of the `ImageBaseAddress` pointer inside the PEB
    pub image_base_offset: u64,
}

const LAYOUT32: LayoutOffsets = LayoutOffsets {
    peb_offset_in_tib: 48,
    process_parameters_offset_in_peb: 16,
    command_line_offset: 64,
    cwd_offset: 36,
    exe_path_offset: 56,
    image_base_offset: 8,
};

const LAYOUT64: LayoutOffsets = LayoutOffsets {
    peb_offset_in_tib: 96,
    process_parameters_offset_in_peb: 32,
    command_line_offset: 112,
    cwd_offset: 56,
    exe_path_offset: 96,
    image_base_offset: 16,
};

/// Returns the control block offsets for `width`.
#[must_use]
pub const fn offsets_for(width: PointerWidth) -> LayoutOffsets {
    match width {
        PointerWidth::Bits32 => LAYOUT32,
        PointerWidth::Bits64 => LAYOUT64,
    }
}

/// Extract a little-endian pointer-width integer from the start of `bytes`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `bytes` is shorter than one pointer.
pub fn read_pointer(bytes: &[u8], width: PointerWidth) -> Result<u64> {
    let mut offset = 0;
    read_le_at_ptr(bytes, &mut offset, width)
}
