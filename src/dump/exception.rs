//! The exception record stored in a dump.
//!
//! Dumps always store the record in its 64-bit shape, even for 32-bit processes. Readers of a
//! 32-bit target expect the 32-bit shape, so the record is down-converted before any byte
//! range is served.

use crate::{
    layout::{
        exception::{RecordShape, EXCEPTION_RECORD32_SIZE, EXCEPTION_RECORD64_SIZE},
        PointerWidth,
    },
    target::SectionSource,
    Error, Result,
};

/// Name of the exception record section.
pub const CORE_EXCEPTION_SECTION: &str = ".coreexception";

/// Name of the section holding the load address of the main executable.
pub const CORE_BASE_SECTION: &str = ".corebase";

fn exception_section<S: SectionSource + ?Sized>(sections: &S) -> Result<&[u8]> {
    sections
        .section_by_name(CORE_EXCEPTION_SECTION)
        .ok_or_else(|| Error::NotFound(CORE_EXCEPTION_SECTION.to_string()))
}

/// The exception record in the shape a `width` target expects.
///
/// # Errors
/// Returns [`crate::Error::NotFound`] if the dump has no exception record and
/// [`crate::Error::Malformed`] if the stored record is not the 64-bit size.
pub fn exception_record<S: SectionSource + ?Sized>(
    sections: &S,
    width: PointerWidth,
) -> Result<RecordShape> {
    let data = exception_section(sections)?;
    if data.len() != EXCEPTION_RECORD64_SIZE {
        return Err(malformed_error!(
            "Exception record section has invalid size - {}",
            data.len()
        ));
    }

    let record = RecordShape::from_bytes(data)?;
    Ok(match width {
        PointerWidth::Bits32 => record.down_convert(),
        PointerWidth::Bits64 => record,
    })
}

/// Read `length` bytes at `offset` of the exception record as a `width` target sees it.
///
/// For 32-bit targets the read is served from the down-converted record and clamped to its
/// end. For 64-bit targets the stored bytes are returned as-is and the whole range must exist.
///
/// # Errors
/// Returns [`crate::Error::NotFound`] without a record, [`crate::Error::Malformed`] if a 32-bit
/// target's record has the wrong size, and [`crate::Error::OutOfBounds`] for reads outside the
/// record.
pub fn xfer_siginfo<S: SectionSource + ?Sized>(
    sections: &S,
    width: PointerWidth,
    offset: usize,
    length: usize,
) -> Result<Vec<u8>> {
    match width {
        PointerWidth::Bits32 => {
            if offset > EXCEPTION_RECORD32_SIZE {
                return Err(out_of_bounds_error!());
            }
            let record = exception_record(sections, width)?;
            Ok(record.read(offset, length)?.to_vec())
        }
        PointerWidth::Bits64 => {
            let data = exception_section(sections)?;
            let end = offset
                .checked_add(length)
                .filter(|&end| end <= data.len())
                .ok_or(out_of_bounds_error!())?;
            Ok(data[offset..end].to_vec())
        }
    }
}

/// Load address of the main executable as recorded in the dump.
///
/// Returns `None` if the section is absent or shorter than 8 bytes.
pub fn read_core_base<S: SectionSource + ?Sized>(sections: &S) -> Option<u64> {
    let data = sections.section_by_name(CORE_BASE_SECTION)?;
    let bytes: [u8; 8] = data.get(..8)?.try_into().ok()?;

    Some(u64::from_le_bytes(bytes))
}
