//! PE executable access and low-level binary reading.
//!
//! This module provides the byte-level building blocks every decoder in this crate uses, and a
//! goblin-backed view of a PE executable that plugs into the collaborator traits in
//! [`crate::target`]. It abstracts over different data sources (files, memory) through the
//! [`crate::file::Backend`] trait.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::PeFile`] - Parsed PE image implementing [`crate::target::SectionSource`]
//!   and [`crate::target::ImageHeaders`]
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Cursor-based reader for control blocks and sections
//! - [`crate::file::io`] - Low-level little-endian read/write primitives
//!
//! ## Backend Implementations
//! - `Physical` - Memory-mapped file backend for disk access
//! - `Memory` - In-memory buffer backend
//!
//! # Examples
//!
//! ```rust,no_run
//! use winscope::{is_linked_with_cygwin_dll, ImageHeaders, PeFile};
//! use std::path::Path;
//!
//! let file = PeFile::from_file(Path::new("program.exe"))?;
//! println!("Image base: 0x{:x}", file.imagebase());
//! println!("Entry point RVA: 0x{:x}", file.entry_point_rva());
//!
//! if is_linked_with_cygwin_dll(&file) {
//!     println!("Cygwin program");
//! }
//! # Ok::<(), winscope::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    layout::PointerWidth,
    target::{ImageHeaders, SectionSource},
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{data_directories::DataDirectoryType, section_table::SectionTable, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of PE data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Name of a section header, preferring the long name from the string table when present.
fn section_name(section: &SectionTable) -> String {
    if let Some(real_name) = &section.real_name {
        return real_name.clone();
    }

    String::from_utf8_lossy(&section.name)
        .trim_end_matches('\0')
        .to_string()
}

/// File range holding the initialised contents of a section.
///
/// A non-zero virtual size smaller than the raw size marks file alignment padding, which is not
/// part of the section.
fn section_range(section: &SectionTable) -> (usize, usize) {
    let raw_size = section.size_of_raw_data;
    let size = if section.virtual_size != 0 {
        section.virtual_size.min(raw_size)
    } else {
        raw_size
    };

    (section.pointer_to_raw_data as usize, size as usize)
}

#[self_referencing]
/// A loaded PE executable.
///
/// `PeFile` wraps the goblin-parsed PE together with the buffer it borrows from, and exposes
/// the pieces the debugger-side decoders need: the section table by name, the link-time image
/// base, the entry point and the import directory location.
///
/// # Examples
///
/// ```rust,no_run
/// use winscope::{ImageHeaders, PeFile, SectionSource};
/// use std::fs;
///
/// let data = fs::read("program.exe")?;
/// let file = PeFile::from_mem(data)?;
///
/// println!("{} bytes, image base 0x{:x}", file.len(), file.image_base());
/// if let Some(idata) = file.section_by_name(".idata") {
///     println!(".idata holds {} bytes", idata.len());
/// }
/// # Ok::<(), winscope::Error>(())
/// ```
pub struct PeFile {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl PeFile {
    /// Loads a PE file from the given path.
    ///
    /// The file is memory-mapped for efficient access.
    ///
    /// # Arguments
    ///
    /// * `file` - Path to the PE file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or opened
    /// - The file is not a valid PE format or lacks an optional header
    /// - The file is empty
    pub fn from_file(file: &Path) -> Result<PeFile> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a PE file from a memory buffer.
    ///
    /// # Arguments
    ///
    /// * `data` - The bytes of the PE file.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, is not a valid PE, or lacks an optional header.
    pub fn from_mem(data: Vec<u8>) -> Result<PeFile> {
        let input = Memory::new(data);

        Self::load(input)
    }

    /// Internal loader for any backend.
    fn load<T: Backend + 'static>(data: T) -> Result<PeFile> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        PeFile::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => {
                if pe.header.optional_header.is_none() {
                    Err(malformed_error!("File does not have an OptionalHeader"))
                } else {
                    Ok(pe)
                }
            }
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.borrow_data().data()
    }

    /// Returns the image base address of the loaded PE file.
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.with_pe(|pe| pe.image_base)
    }

    /// Pointer width of the image, from the optional header magic.
    #[must_use]
    pub fn pointer_width(&self) -> PointerWidth {
        if self.with_pe(|pe| pe.is_64) {
            PointerWidth::Bits64
        } else {
            PointerWidth::Bits32
        }
    }

    /// Returns an iterator over the section headers of the PE file.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Returns the RVA and size of a specific data directory entry.
    ///
    /// Returns `None` if the directory doesn't exist or has a zero address or size.
    #[must_use]
    pub fn get_data_directory(&self, dir_type: DataDirectoryType) -> Option<(u32, u32)> {
        self.with_pe(|pe| {
            pe.header.optional_header.and_then(|optional_header| {
                optional_header
                    .data_directories
                    .dirs()
                    .find(|(directory_type, directory)| {
                        *directory_type == dir_type
                            && directory.virtual_address != 0
                            && directory.size != 0
                    })
                    .map(|(_, directory)| (directory.virtual_address, directory.size))
            })
        })
    }

    /// Convert a relative virtual address to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        for section in self.sections() {
            let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
            else {
                return Err(malformed_error!(
                    "Section malformed, causing integer overflow - {} + {}",
                    section.virtual_address,
                    section.virtual_size
                ));
            };

            let rva_u32 = u32::try_from(rva)
                .map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;
            if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                return Ok(rva - section.virtual_address as usize
                    + section.pointer_to_raw_data as usize);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - {}",
            rva
        ))
    }
}

impl SectionSource for PeFile {
    fn section_by_name(&self, name: &str) -> Option<&[u8]> {
        let (offset, len) = self
            .sections()
            .find(|section| section_name(section) == name)
            .map(section_range)?;

        self.borrow_data().data_slice(offset, len).ok()
    }

    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8])) {
        for section in self.sections() {
            let (offset, len) = section_range(section);
            let Ok(data) = self.borrow_data().data_slice(offset, len) else {
                log::debug!(
                    "section {} lies outside the file, skipping",
                    section_name(section)
                );
                continue;
            };

            visit(&section_name(section), data);
        }
    }
}

impl ImageHeaders for PeFile {
    fn image_base(&self) -> u64 {
        self.imagebase()
    }

    fn entry_point_rva(&self) -> u64 {
        self.with_pe(|pe| {
            pe.header
                .optional_header
                .map_or(0, |optional_header| {
                    u64::from(optional_header.standard_fields.address_of_entry_point)
                })
        })
    }

    fn import_table_rva(&self) -> Option<u64> {
        self.get_data_directory(DataDirectoryType::ImportTable)
            .map(|(rva, _)| u64::from(rva))
    }

    fn section_vma(&self, name: &str) -> Option<u64> {
        let base = self.imagebase();
        self.sections()
            .find(|section| section_name(section) == name)
            .map(|section| base.wrapping_add(u64::from(section.virtual_address)))
    }
}
