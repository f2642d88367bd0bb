//! Dump section payloads.

use crate::{
    dump::{CORE_EXCEPTION_SECTION, NOTE_INFO_MODULE64},
    layout::exception::EXCEPTION_RECORD64_SIZE,
    target::SectionMap,
};

/// A fixed binary module record; the base is 8 bytes wide for `MODULE64` only.
pub fn module_record(tag: u32, base: u64, name: &[u8]) -> Vec<u8> {
    let mut record = tag.to_le_bytes().to_vec();
    if tag == NOTE_INFO_MODULE64 {
        record.extend_from_slice(&base.to_le_bytes());
    } else {
        record.extend_from_slice(&(base as u32).to_le_bytes());
    }
    record.extend_from_slice(&(name.len() as u32).to_le_bytes());
    record.extend_from_slice(name);

    record
}

/// A 64-bit exception record with the given parameters.
pub fn exception_record64(code: u32, address: u64, parameters: &[u64]) -> Vec<u8> {
    assert!(parameters.len() <= 15);

    let mut record = vec![0u8; EXCEPTION_RECORD64_SIZE];
    record[0..4].copy_from_slice(&code.to_le_bytes());
    record[16..24].copy_from_slice(&address.to_le_bytes());
    record[24..28].copy_from_slice(&(parameters.len() as u32).to_le_bytes());
    for (index, parameter) in parameters.iter().enumerate() {
        let start = 32 + index * 8;
        record[start..start + 8].copy_from_slice(&parameter.to_le_bytes());
    }

    record
}

/// Sections of a dump holding only an exception record.
pub fn exception_sections(record: &[u8]) -> SectionMap {
    SectionMap::new().with_section(CORE_EXCEPTION_SECTION, record.to_vec())
}
