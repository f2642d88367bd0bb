//! Module notes stored in dump sections.
//!
//! Two conventions exist. Older dumps store one `.module*` section per module holding a small
//! fixed binary record:
//!
//! | Offset | `MODULE32` (tag 3) | `MODULE64` (tag 4) |
//! |--------|--------------------|--------------------|
//! | 0      | tag: u32           | tag: u32           |
//! | 4      | base: u32          | base: u64          |
//! | 8      | name size: u32     |                    |
//! | 12     | name               | name size: u32     |
//! | 16     |                    | name               |
//!
//! Newer dumps store the module name as raw UTF-16 in a `.coremodule/<hex-address>` section and
//! keep the load address in the section name (see [`crate::dump::symbols::ModuleSectionName`]).

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::{file::parser::Parser, layout::unicode::utf16le_to_string, Result};

/// Prefix of fixed binary module sections.
pub const MODULE_SECTION_PREFIX: &str = ".module";

/// Tag of a module record with a 32-bit base.
pub const NOTE_INFO_MODULE: u32 = 3;

/// Tag of a module record with a 64-bit base.
pub const NOTE_INFO_MODULE64: u32 = 4;

/// A module found in a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Module path as stored in the dump, or as resolved by a symbol locator
    pub name: String,
    /// Load address
    pub address: u64,
}

/// Decode a fixed binary module record.
///
/// The name ends at the first NUL within its declared size; invalid UTF-8 is replaced.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for an unknown tag or a declared name size that does not
/// fit the section, and [`crate::Error::OutOfBounds`] if the section is shorter than its header.
pub fn decode_module_record(data: &[u8]) -> Result<ModuleEntry> {
    let mut parser = Parser::new(data);

    let address = match parser.read_le::<u32>()? {
        NOTE_INFO_MODULE => u64::from(parser.read_le::<u32>()?),
        NOTE_INFO_MODULE64 => parser.read_le::<u64>()?,
        tag => return Err(malformed_error!("Unknown module record tag - {}", tag)),
    };

    let name_size = parser.read_le::<u32>()? as usize;
    if name_size > parser.remaining() {
        return Err(malformed_error!(
            "Module name size {} exceeds section - {} bytes left",
            name_size,
            parser.remaining()
        ));
    }

    let raw = parser.read_bytes(name_size)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());

    Ok(ModuleEntry {
        name: String::from_utf8_lossy(&raw[..end]).into_owned(),
        address,
    })
}

/// Decode the payload of an indexed module section.
#[must_use]
pub fn decode_module_name(data: &[u8]) -> String {
    utf16le_to_string(data)
}

/// Render modules as a library list document.
///
/// ```rust
/// use winscope::dump::{library_list_xml, ModuleEntry};
///
/// let xml = library_list_xml(&[ModuleEntry { name: "a&b.dll".into(), address: 0x2000 }]);
/// assert_eq!(
///     xml,
///     "<library-list>\n<library name=\"a&amp;b.dll\"><segment address=\"0x2000\"/></library></library-list>\n"
/// );
/// ```
#[must_use]
pub fn library_list_xml(modules: &[ModuleEntry]) -> String {
    let mut xml = String::from("<library-list>\n");
    for module in modules {
        let _ = write!(
            xml,
            "<library name=\"{}\"><segment address=\"0x{:x}\"/></library>",
            escape(module.name.as_str()),
            module.address
        );
    }
    xml.push_str("</library-list>\n");

    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::module_record, Error};

    #[test]
    fn record_32() {
        let data = module_record(NOTE_INFO_MODULE, 0x7700_0000, b"C:\\Windows\\ntdll.dll\0");
        let entry = decode_module_record(&data).unwrap();

        assert_eq!(entry.address, 0x7700_0000);
        assert_eq!(entry.name, "C:\\Windows\\ntdll.dll");
    }

    #[test]
    fn record_64() {
        let data = module_record(NOTE_INFO_MODULE64, 0x7ffb_1234_0000, b"kernel32.dll\0junk");
        let entry = decode_module_record(&data).unwrap();

        assert_eq!(entry.address, 0x7ffb_1234_0000);
        assert_eq!(entry.name, "kernel32.dll");
    }

    #[test]
    fn record_without_nul() {
        let data = module_record(NOTE_INFO_MODULE, 0x1000, b"a.dll");
        assert_eq!(decode_module_record(&data).unwrap().name, "a.dll");
    }

    #[test]
    fn rejected_records() {
        assert!(matches!(
            decode_module_record(&[3, 0]),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            decode_module_record(&[4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            decode_module_record(&module_record(9, 0x1000, b"x\0")),
            Err(Error::Malformed { .. })
        ));

        let mut oversized = module_record(NOTE_INFO_MODULE, 0x1000, b"x.dll\0");
        oversized[8] = 0xff;
        assert!(matches!(
            decode_module_record(&oversized),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn indexed_name() {
        let payload: Vec<u8> = "lib.dll\0"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        assert_eq!(decode_module_name(&payload), "lib.dll");
        assert_eq!(decode_module_name(&[]), "");
    }

    #[test]
    fn empty_list() {
        assert_eq!(library_list_xml(&[]), "<library-list>\n</library-list>\n");
    }

    #[test]
    fn escaped_names() {
        let xml = library_list_xml(&[
            ModuleEntry {
                name: "<odd>\"name\".dll".into(),
                address: 0x7ff0_0000,
            },
            ModuleEntry {
                name: "b.dll".into(),
                address: 0x10,
            },
        ]);

        assert!(xml.contains("name=\"&lt;odd&gt;&quot;name&quot;.dll\""));
        assert!(xml.contains("<segment address=\"0x7ff00000\"/>"));
        assert!(xml.ends_with("<library name=\"b.dll\"><segment address=\"0x10\"/></library></library-list>\n"));
    }
}
