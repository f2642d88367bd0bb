//! Collaborator interfaces between the decoders and the debugger.
//!
//! The decoders in this crate never talk to a process, a dump reader or an executable loader
//! directly. They go through the three traits defined here, which keeps them testable against
//! synthetic data and lets the embedding debugger plug in whatever backend it has.
//!
//! # Key Components
//!
//! - [`crate::target::TargetMemory`] - Reads from a live process or a dump's memory
//! - [`crate::target::SectionSource`] - Named sections of a dump or executable container
//! - [`crate::target::ImageHeaders`] - Header fields of the main executable image
//! - [`crate::target::SectionMap`] - In-memory [`crate::target::SectionSource`]
//! - [`crate::target::MemoryImage`] - Sparse in-memory [`crate::target::TargetMemory`]

mod memory;
mod sections;

pub use memory::MemoryImage;
pub use sections::SectionMap;

use crate::Result;

/// Access to the memory of the debugged process or of a dump.
pub trait TargetMemory {
    /// Read exactly `length` bytes at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unreadable`] if any byte of the range cannot be read.
    fn read_memory(&self, address: u64, length: usize) -> Result<Vec<u8>>;

    /// Thread local base (TIB address) of a thread.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if the thread is unknown to the target.
    fn thread_local_base(&self, thread_id: u64) -> Result<u64>;

    /// `true` if a process is currently executing, `false` for dumps and detached targets.
    fn has_execution(&self) -> bool;
}

/// Named sections of a binary container.
///
/// Dumps expose their notes as sections (`.coremodule/...`, `.corethread/...`); executables
/// expose their regular PE sections (`.text`, `.idata`).
pub trait SectionSource {
    /// Contents of the first section called `name`.
    fn section_by_name(&self, name: &str) -> Option<&[u8]>;

    /// Size of the section called `name`, 0 if absent.
    fn section_size(&self, name: &str) -> usize {
        self.section_by_name(name).map_or(0, <[u8]>::len)
    }

    /// Visit every section in discovery order.
    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8]));
}

/// Header fields of an executable image.
pub trait ImageHeaders {
    /// Link-time preferred load address.
    fn image_base(&self) -> u64;

    /// `AddressOfEntryPoint` from the optional header.
    fn entry_point_rva(&self) -> u64;

    /// Virtual address of the import directory from the data directories, if present.
    fn import_table_rva(&self) -> Option<u64>;

    /// Absolute virtual address (image base included) of the section called `name`.
    fn section_vma(&self, name: &str) -> Option<u64>;
}

impl<T: TargetMemory + ?Sized> TargetMemory for &T {
    fn read_memory(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        (**self).read_memory(address, length)
    }

    fn thread_local_base(&self, thread_id: u64) -> Result<u64> {
        (**self).thread_local_base(thread_id)
    }

    fn has_execution(&self) -> bool {
        (**self).has_execution()
    }
}

impl<T: SectionSource + ?Sized> SectionSource for &T {
    fn section_by_name(&self, name: &str) -> Option<&[u8]> {
        (**self).section_by_name(name)
    }

    fn section_size(&self, name: &str) -> usize {
        (**self).section_size(name)
    }

    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8])) {
        (**self).for_each_section(visit);
    }
}
