//! Import directory walker for PE images.
//!
//! Finding out whether an executable is a Cygwin program only needs its import directory: a
//! program linked against `cygwin1.dll` names it in one of the 20-byte import descriptors at
//! the start of `.idata`. The walker here reads those descriptors straight from the section
//! bytes and checks every offset against the section before touching it, so a damaged or
//! hostile image can make the answer `false` but never cause an out-of-bounds read.
//!
//! # Import descriptor layout
//!
//! | Offset | Field                 |
//! |--------|-----------------------|
//! | 0      | Import lookup table   |
//! | 4      | Timestamp             |
//! | 8      | Forwarder chain       |
//! | 12     | Name RVA              |
//! | 16     | Import address table  |
//!
//! An all-zero descriptor terminates the table.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winscope::{imports_named_library, PeFile};
//! use std::path::Path;
//!
//! let file = PeFile::from_file(Path::new("bash.exe"))?;
//! if imports_named_library(&file, "cygwin1.dll") {
//!     println!("bash.exe is a Cygwin program");
//! }
//! # Ok::<(), winscope::Error>(())
//! ```

use crate::{
    file::parser::Parser,
    target::{ImageHeaders, SectionSource},
    Result,
};

/// Name of the import section.
pub const IMPORT_SECTION: &str = ".idata";

/// Name of the Cygwin runtime DLL.
pub const CYGWIN_DLL_NAME: &str = "cygwin1.dll";

/// One import descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportDirectoryEntry {
    /// RVA of the import lookup table
    pub import_lookup_table: u32,
    /// Bind timestamp, 0 if not bound
    pub timestamp: u32,
    /// Index of the first forwarder reference
    pub forwarder_chain: u32,
    /// RVA of the NUL-terminated DLL name
    pub name_rva: u32,
    /// RVA of the import address table
    pub import_address_table: u32,
}

impl ImportDirectoryEntry {
    /// Size of a descriptor in bytes.
    pub const SIZE: usize = 20;

    /// Read a descriptor at the parser's position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 20 bytes remain.
    pub fn read(parser: &mut Parser<'_>) -> Result<Self> {
        Ok(ImportDirectoryEntry {
            import_lookup_table: parser.read_le::<u32>()?,
            timestamp: parser.read_le::<u32>()?,
            forwarder_chain: parser.read_le::<u32>()?,
            name_rva: parser.read_le::<u32>()?,
            import_address_table: parser.read_le::<u32>()?,
        })
    }

    /// `true` for the all-zero terminator.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == ImportDirectoryEntry::default()
    }
}

/// A descriptor together with its DLL name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLibrary {
    /// The raw descriptor
    pub entry: ImportDirectoryEntry,
    /// DLL name, `None` if it runs off the end of the section
    pub name: Option<String>,
}

struct ImportDescriptor<'a> {
    entry: ImportDirectoryEntry,
    // Section bytes from the name onwards
    name_tail: &'a [u8],
}

impl ImportDescriptor<'_> {
    fn names(&self, library: &str) -> bool {
        let wanted = library.as_bytes();
        match self.name_tail.get(..=wanted.len()) {
            Some(candidate) => candidate[..wanted.len()] == *wanted && candidate[wanted.len()] == 0,
            None => false,
        }
    }

    fn name(&self) -> Option<String> {
        let end = self.name_tail.iter().position(|&b| b == 0)?;
        Some(String::from_utf8_lossy(&self.name_tail[..end]).into_owned())
    }
}

/// Descriptors of `binary` up to the terminator or the first bounds violation.
fn import_descriptors<'a, B>(binary: &'a B) -> Vec<ImportDescriptor<'a>>
where
    B: SectionSource + ImageHeaders + ?Sized,
{
    let mut descriptors = Vec::new();

    let Some(data) = binary.section_by_name(IMPORT_SECTION) else {
        return descriptors;
    };
    let Some(section_vma) = binary.section_vma(IMPORT_SECTION) else {
        return descriptors;
    };

    let image_base = binary.image_base();
    let Some(section_rva) = section_vma.checked_sub(image_base) else {
        log::warn!(
            "{IMPORT_SECTION} section at 0x{section_vma:x} lies below the image base 0x{image_base:x}"
        );
        return descriptors;
    };

    let section_offset = |rva: u64| -> Option<usize> {
        let offset = usize::try_from(rva.checked_sub(section_rva)?).ok()?;
        (offset < data.len()).then_some(offset)
    };

    let import_rva = binary.import_table_rva().unwrap_or(0);
    let Some(start) = section_offset(import_rva) else {
        log::warn!(
            "import table at RVA 0x{import_rva:x} lies outside the {IMPORT_SECTION} section"
        );
        return descriptors;
    };

    let mut parser = Parser::new(data);
    if parser.seek(start).is_err() {
        return descriptors;
    }

    loop {
        let Ok(entry) = ImportDirectoryEntry::read(&mut parser) else {
            log::warn!("unexpected end of {IMPORT_SECTION} section");
            break;
        };
        if entry.is_null() {
            break;
        }

        let Some(name_offset) = section_offset(u64::from(entry.name_rva)) else {
            log::warn!(
                "import name at RVA 0x{:x} lies outside the {IMPORT_SECTION} section",
                entry.name_rva
            );
            break;
        };

        descriptors.push(ImportDescriptor {
            entry,
            name_tail: &data[name_offset..],
        });
    }

    descriptors
}

/// `true` if `binary` imports a DLL called exactly `library`.
///
/// Names are compared case-sensitively. A descriptor whose name would run past the end of the
/// section never matches.
pub fn imports_named_library<B>(binary: &B, library: &str) -> bool
where
    B: SectionSource + ImageHeaders + ?Sized,
{
    import_descriptors(binary)
        .iter()
        .any(|descriptor| descriptor.names(library))
}

/// `true` if `binary` imports `cygwin1.dll`.
pub fn is_linked_with_cygwin_dll<B>(binary: &B) -> bool
where
    B: SectionSource + ImageHeaders + ?Sized,
{
    imports_named_library(binary, CYGWIN_DLL_NAME)
}

/// Every descriptor of `binary` with its DLL name.
///
/// The walk ends at the terminator or at the first descriptor that cannot be read safely.
pub fn import_directory_entries<B>(binary: &B) -> Vec<ImportedLibrary>
where
    B: SectionSource + ImageHeaders + ?Sized,
{
    import_descriptors(binary)
        .iter()
        .map(|descriptor| ImportedLibrary {
            entry: descriptor.entry,
            name: descriptor.name(),
        })
        .collect()
}
