//! Low-level byte order and safe reading/writing utilities for Windows control block decoding.
//!
//! Every structure this crate touches (TIB, PEB, process parameters, exception records, core
//! dump sections, PE import directories) is stored little-endian. This module provides the
//! bounds-checked primitives all decoders are built on.
//!
//! # Key Components
//!
//! - [`crate::file::io::ByteIO`] - Trait defining endian-aware conversion for primitive types
//! - [`crate::file::io::read_le`] - Read values from buffer start in little-endian format
//! - [`crate::file::io::read_le_at`] - Read values at specific offset with auto-advance
//! - [`crate::file::io::read_le_at_ptr`] - Read a pointer-width value (4 or 8 bytes)
//! - [`crate::file::io::write_le_at`] - Write values at specific offset with auto-advance
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use winscope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_le_at(&data, &mut offset)?; // offset: 2 -> 4
//! let third: u32 = read_le_at(&data, &mut offset)?;  // offset: 4 -> 8
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! # Ok::<(), winscope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] if there are insufficient bytes in the
//! buffer. The check happens before any byte is copied.

use crate::{layout::PointerWidth, Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait ByteIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8 => 1, u16 => 2, u32 => 4, u64 => 8, i32 => 4, i64 => 8);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the size of `T` on success and left untouched on failure.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads a pointer-sized value (4 bytes for 32-bit targets, 8 bytes for 64-bit targets).
///
/// 32-bit values are zero-extended.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at_ptr(data: &[u8], offset: &mut usize, width: PointerWidth) -> Result<u64> {
    let res = match width {
        PointerWidth::Bits32 => u64::from(read_le_at::<u32>(data, offset)?),
        PointerWidth::Bits64 => read_le_at::<u64>(data, offset)?,
    };

    Ok(res)
}

/// Safely writes a value of type `T` in little-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
pub fn write_le_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_le_bytes().as_ref());
    *offset = end;

    Ok(())
}
