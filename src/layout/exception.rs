//! `EXCEPTION_RECORD` shapes, exception codes and flags.
//!
//! An exception record exists in two on-disk shapes. The 32-bit shape is 80 bytes with 4-byte
//! pointers; the 64-bit shape is 152 bytes with 8-byte pointers and a 4-byte pad after the
//! parameter count. Dumps always carry the 64-bit shape, so a 32-bit target needs a
//! down-conversion that keeps the low half of every pointer-sized field.
//!
//! # Key Components
//!
//! - [`crate::layout::exception::RecordShape`] - Raw record bytes tagged with their shape
//! - [`crate::layout::exception::ExceptionRecord`] - Decoded, width-independent record
//! - [`crate::layout::exception::ExceptionCode`] - Named NTSTATUS exception codes
//! - [`crate::layout::exception::ExceptionFlags`] - `EXCEPTION_*` flag bits
//! - [`crate::layout::exception::ViolationType`] - Access violation kinds
//!
//! # Examples
//!
//! ```rust
//! use winscope::{ExceptionCode, RecordShape};
//!
//! let mut raw = [0u8; 152];
//! raw[0..4].copy_from_slice(&0xC000_0005_u32.to_le_bytes());
//! raw[16..24].copy_from_slice(&0x0040_1000_u64.to_le_bytes());
//!
//! let narrow = RecordShape::from_bytes(&raw)?.down_convert();
//! let record = narrow.decode()?;
//! assert_eq!(record.kind(), Some(ExceptionCode::AccessViolation));
//! assert_eq!(record.address, 0x0040_1000);
//! # Ok::<(), winscope::Error>(())
//! ```

use std::fmt;

use bitflags::bitflags;
use strum::{EnumIter, FromRepr, IntoStaticStr};

use crate::{file::parser::Parser, layout::PointerWidth, Result};

/// Maximum number of parameters an exception record carries.
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

/// Size of the 32-bit `EXCEPTION_RECORD`.
pub const EXCEPTION_RECORD32_SIZE: usize = 80;

/// Size of the 64-bit `EXCEPTION_RECORD64`.
pub const EXCEPTION_RECORD64_SIZE: usize = 152;

/// Named exception codes.
///
/// The string form of each variant is the name a debugger prints for it, without the
/// `EXCEPTION_`/`STATUS_` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ExceptionCode {
    FatalAppExit = 0x4000_0015,
    #[strum(serialize = "WX86_SINGLE_STEP")]
    Wx86SingleStep = 0x4000_001E,
    #[strum(serialize = "WX86_BREAKPOINT")]
    Wx86Breakpoint = 0x4000_001F,
    DbgControlC = 0x4001_0005,
    DbgControlBreak = 0x4001_0008,
    DatatypeMisalignment = 0x8000_0002,
    Breakpoint = 0x8000_0003,
    SingleStep = 0x8000_0004,
    AccessViolation = 0xC000_0005,
    InPageError = 0xC000_0006,
    IllegalInstruction = 0xC000_001D,
    NoncontinuableException = 0xC000_0025,
    InvalidDisposition = 0xC000_0026,
    ArrayBoundsExceeded = 0xC000_008C,
    FloatDenormalOperand = 0xC000_008D,
    FloatDivideByZero = 0xC000_008E,
    FloatInexactResult = 0xC000_008F,
    FloatInvalidOperation = 0xC000_0090,
    FloatOverflow = 0xC000_0091,
    FloatStackCheck = 0xC000_0092,
    FloatUnderflow = 0xC000_0093,
    IntegerDivideByZero = 0xC000_0094,
    IntegerOverflow = 0xC000_0095,
    PrivInstruction = 0xC000_0096,
    StackOverflow = 0xC000_00FD,
    FastFail = 0xC000_0409,
}

impl ExceptionCode {
    /// Look up a raw code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// The raw NTSTATUS value.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Printable name of the code.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// `ExceptionFlags` field of an exception record
    pub struct ExceptionFlags: u32 {
        /// Execution cannot continue after this exception
        const NONCONTINUABLE = 0x0001;
        /// The stack is being unwound
        const UNWINDING = 0x0002;
        /// The unwind is caused by a process exit
        const EXIT_UNWIND = 0x0004;
        /// The stack was found outside its limits
        const STACK_INVALID = 0x0008;
        /// Raised inside an exception handler
        const NESTED_CALL = 0x0010;
        /// The target frame of an unwind was reached
        const TARGET_UNWIND = 0x0020;
        /// Collided with another unwind
        const COLLIDED_UNWIND = 0x0040;
    }
}

/// Kind of memory access that caused an access violation.
///
/// Carried in parameter 0 of an `ACCESS_VIOLATION` or `IN_PAGE_ERROR` record; parameter 1 is
/// the faulting data address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum ViolationType {
    /// Read from an inaccessible address
    Read = 0,
    /// Write to an inaccessible address
    Write = 1,
    /// Execution blocked by data execution prevention
    Dep = 8,
}

/// A raw exception record tagged with its on-disk shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordShape {
    /// 80-byte record with 4-byte pointers
    Record32([u8; EXCEPTION_RECORD32_SIZE]),
    /// 152-byte record with 8-byte pointers
    Record64([u8; EXCEPTION_RECORD64_SIZE]),
}

impl RecordShape {
    /// Tag raw bytes with their shape based on their length.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `data` is neither 80 nor 152 bytes long.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if let Ok(record) = <[u8; EXCEPTION_RECORD64_SIZE]>::try_from(data) {
            return Ok(RecordShape::Record64(record));
        }
        if let Ok(record) = <[u8; EXCEPTION_RECORD32_SIZE]>::try_from(data) {
            return Ok(RecordShape::Record32(record));
        }

        Err(malformed_error!(
            "Exception record has invalid size - {}",
            data.len()
        ))
    }

    /// Pointer width of this shape.
    #[must_use]
    pub fn width(&self) -> PointerWidth {
        match self {
            RecordShape::Record32(_) => PointerWidth::Bits32,
            RecordShape::Record64(_) => PointerWidth::Bits64,
        }
    }

    /// The raw record bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RecordShape::Record32(record) => record,
            RecordShape::Record64(record) => record,
        }
    }

    /// Convert to the 32-bit shape.
    ///
    /// Viewing the 64-bit record as 38 little-endian words, the code, flags and the low half of
    /// the record pointer are kept in place; after that every 8-byte slot from the fault address
    /// onwards is compacted to its low 4 bytes. A 32-bit record is returned unchanged.
    #[must_use]
    pub fn down_convert(&self) -> RecordShape {
        let RecordShape::Record64(wide) = self else {
            return self.clone();
        };

        let word = |index: usize| -> [u8; 4] {
            let start = index * 4;
            [wide[start], wide[start + 1], wide[start + 2], wide[start + 3]]
        };

        let mut narrow = [0u8; EXCEPTION_RECORD32_SIZE];
        for index in 0..3 {
            narrow[index * 4..index * 4 + 4].copy_from_slice(&word(index));
        }
        for slot in 2..EXCEPTION_RECORD64_SIZE / 8 {
            let target = (slot + 1) * 4;
            narrow[target..target + 4].copy_from_slice(&word(slot * 2));
        }

        RecordShape::Record32(narrow)
    }

    /// Borrow up to `length` bytes starting at `offset`.
    ///
    /// Reads are clamped to the end of the record, so a read starting exactly at the end
    /// returns an empty slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies past the end of the record.
    pub fn read(&self, offset: usize, length: usize) -> Result<&[u8]> {
        let bytes = self.as_bytes();
        if offset > bytes.len() {
            return Err(out_of_bounds_error!());
        }

        let length = length.min(bytes.len() - offset);
        Ok(&bytes[offset..offset + length])
    }

    /// Decode the record into its typed form.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated, which cannot happen
    /// for a well-formed shape.
    pub fn decode(&self) -> Result<ExceptionRecord> {
        let width = self.width();
        let mut parser = Parser::new(self.as_bytes());

        let code = parser.read_le::<u32>()?;
        let flags = ExceptionFlags::from_bits_retain(parser.read_le::<u32>()?);
        let record = parser.read_ptr(width)?;
        let address = parser.read_ptr(width)?;
        let parameter_count = parser.read_le::<u32>()?;
        if width == PointerWidth::Bits64 {
            parser.advance_by(4)?;
        }

        let count = (parameter_count as usize).min(EXCEPTION_MAXIMUM_PARAMETERS);
        let mut parameters = Vec::with_capacity(count);
        for _ in 0..count {
            parameters.push(parser.read_ptr(width)?);
        }

        Ok(ExceptionRecord {
            code,
            flags,
            record,
            address,
            parameter_count,
            parameters,
        })
    }
}

/// A decoded exception record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord {
    /// Raw exception code
    pub code: u32,
    /// Exception flags, unknown bits retained
    pub flags: ExceptionFlags,
    /// Address of a chained exception record, 0 if none
    pub record: u64,
    /// Address where the exception occurred
    pub address: u64,
    /// Parameter count as stored, possibly larger than [`EXCEPTION_MAXIMUM_PARAMETERS`]
    pub parameter_count: u32,
    /// Parameters, at most [`EXCEPTION_MAXIMUM_PARAMETERS`]
    pub parameters: Vec<u64>,
}

impl ExceptionRecord {
    /// The named code, if known.
    #[must_use]
    pub fn kind(&self) -> Option<ExceptionCode> {
        ExceptionCode::from_code(self.code)
    }

    /// Access kind and data address of an access violation or in-page error.
    ///
    /// Returns `None` for other codes, for records with fewer than two parameters, and for
    /// unknown access kinds.
    #[must_use]
    pub fn violation(&self) -> Option<(ViolationType, u64)> {
        match self.kind() {
            Some(ExceptionCode::AccessViolation | ExceptionCode::InPageError) => {}
            _ => return None,
        }

        let [kind, address, ..] = self.parameters.as_slice() else {
            return None;
        };
        let kind = ViolationType::from_repr(u8::try_from(*kind).ok()?)?;
        Some((kind, *address))
    }
}

impl fmt::Display for ExceptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{} (0x{:08x})", kind, self.code)?,
            None => write!(f, "0x{:08x}", self.code)?,
        }
        write!(f, " at 0x{:x}", self.address)?;

        if let Some((kind, address)) = self.violation() {
            let kind: &'static str = kind.into();
            write!(f, ", {} of 0x{:x}", kind, address)?;
        }

        Ok(())
    }
}
