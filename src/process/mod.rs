//! Live chain walker for Windows process control blocks.
//!
//! Starting from a thread's local base, the walker follows the chain the loader sets up in every
//! Windows process:
//!
//! ```text
//! TIB ──peb_offset_in_tib──▶ PEB ──process_parameters_offset_in_peb──▶ RTL_USER_PROCESS_PARAMETERS
//!                             │                                        ├─ CommandLine  (UNICODE_STRING)
//!                             └─ image_base_offset ─▶ image base       ├─ CurrentDirectory
//!                                                                      └─ ImagePathName
//! ```
//!
//! Every hop is a read through [`crate::target::TargetMemory`]; a failed hop makes the fields
//! behind it unavailable without failing the query.
//!
//! # Key Components
//!
//! - [`crate::process::ChainWalker`] - Follows the chain for one target
//! - [`crate::process::ProcessInfo`] - Result of a command line / cwd / exe query
//! - [`crate::process::entry`] - Executable base resolution and the entry point breakpoint
//!
//! # Examples
//!
//! ```rust,no_run
//! use winscope::{ChainWalker, MemoryImage, PointerWidth, ProcessInfoKind};
//!
//! # fn snapshot() -> MemoryImage { MemoryImage::new() }
//! let memory = snapshot();
//! let walker = ChainWalker::new(&memory, PointerWidth::Bits64);
//!
//! let info = walker.query_process_info(1, true, ProcessInfoKind::All, None)?;
//! for line in info.lines() {
//!     println!("{line}");
//! }
//! # Ok::<(), winscope::Error>(())
//! ```

pub mod entry;

use crate::{
    layout::{
        offsets_for, read_pointer,
        tib::{tib_read_size, ThreadInformationBlock},
        unicode::{descriptor_size, utf16le_to_string, UnicodeStringRef},
        LayoutOffsets, PointerWidth,
    },
    target::TargetMemory,
    Error::{ArgumentsNotSupported, NoCurrentProcess},
    Result,
};

/// Which process parameters an `info proc`-style query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessInfoKind {
    /// Default selection, same fields as [`ProcessInfoKind::All`]
    Minimal,
    /// Only the command line
    CmdLine,
    /// Only the working directory
    Cwd,
    /// Only the executable path
    Exe,
    /// Command line, working directory and executable path
    All,
}

impl ProcessInfoKind {
    fn wants_cmdline(self) -> bool {
        matches!(
            self,
            ProcessInfoKind::Minimal | ProcessInfoKind::CmdLine | ProcessInfoKind::All
        )
    }

    fn wants_cwd(self) -> bool {
        matches!(
            self,
            ProcessInfoKind::Minimal | ProcessInfoKind::Cwd | ProcessInfoKind::All
        )
    }

    fn wants_exe(self) -> bool {
        matches!(
            self,
            ProcessInfoKind::Minimal | ProcessInfoKind::Exe | ProcessInfoKind::All
        )
    }
}

/// One requested field of a [`ProcessInfo`].
///
/// `None` means the field was requested but could not be read.
type Field = Option<Option<String>>;

/// Result of a process parameters query.
///
/// Each field is tracked separately: not requested, requested and read, or requested and
/// unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    cmdline: Field,
    cwd: Field,
    exe: Field,
}

impl ProcessInfo {
    /// The command line, if requested and readable.
    #[must_use]
    pub fn cmdline(&self) -> Option<&str> {
        self.cmdline.as_ref()?.as_deref()
    }

    /// The working directory, if requested and readable.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_ref()?.as_deref()
    }

    /// The executable path, if requested and readable.
    #[must_use]
    pub fn exe(&self) -> Option<&str> {
        self.exe.as_ref()?.as_deref()
    }

    fn fields(&self) -> [(&'static str, &Field); 3] {
        [
            ("cmdline", &self.cmdline),
            ("cwd", &self.cwd),
            ("exe", &self.exe),
        ]
    }

    /// Names of the requested fields that could not be read.
    #[must_use]
    pub fn unavailable(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, field)| matches!(field, Some(None)))
            .map(|(name, _)| name)
            .collect()
    }

    /// Printable `name = 'value'` lines for the fields that were read.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.fields()
            .into_iter()
            .filter_map(|(name, field)| {
                let value = field.as_ref()?.as_ref()?;
                Some(format!("{name} = '{value}'"))
            })
            .collect()
    }
}

/// Walks the TIB → PEB → process parameters chain of one target.
pub struct ChainWalker<'a, M: TargetMemory + ?Sized> {
    memory: &'a M,
    width: PointerWidth,
    offsets: LayoutOffsets,
}

impl<'a, M: TargetMemory + ?Sized> ChainWalker<'a, M> {
    /// Create a walker over `memory` for a target of the given pointer width.
    #[must_use]
    pub fn new(memory: &'a M, width: PointerWidth) -> Self {
        ChainWalker {
            memory,
            width,
            offsets: offsets_for(width),
        }
    }

    /// Pointer width the walker decodes with.
    #[must_use]
    pub fn width(&self) -> PointerWidth {
        self.width
    }

    /// `true` if the walked target is an executing process.
    #[must_use]
    pub fn has_execution(&self) -> bool {
        self.memory.has_execution()
    }

    /// Read one pointer-sized value from target memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unreadable`] if the target refuses the read.
    pub fn read_pointer_at(&self, address: u64) -> Result<u64> {
        let bytes = self.memory.read_memory(address, self.width.bytes())?;
        read_pointer(&bytes, self.width)
    }

    /// Read a `UNICODE_STRING` at `address` and decode its buffer.
    ///
    /// Returns `None` if the descriptor or its buffer cannot be read, or if the string is empty.
    /// Text is never returned partially. A trailing odd byte is dropped.
    #[must_use]
    pub fn read_unicode_string(&self, address: u64) -> Option<String> {
        let descriptor = self
            .memory
            .read_memory(address, descriptor_size(self.width))
            .ok()?;
        let string = UnicodeStringRef::parse(&descriptor, self.width).ok()?;

        if string.is_empty() {
            return None;
        }

        let buffer = self
            .memory
            .read_memory(string.buffer_address, usize::from(string.length))
            .ok()?;

        Some(utf16le_to_string(&buffer))
    }

    /// Address of the PEB of the process owning `thread_id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if the thread has no known local base, or
    /// [`crate::Error::Unreadable`] if the TIB cannot be read.
    pub fn peb_address(&self, thread_id: u64) -> Result<u64> {
        let tib = self.memory.thread_local_base(thread_id)?;
        self.read_pointer_at(tib.wrapping_add(self.offsets.peb_offset_in_tib))
    }

    /// Address of the `RTL_USER_PROCESS_PARAMETERS` block.
    ///
    /// # Errors
    /// Fails like [`ChainWalker::peb_address`], or with [`crate::Error::Unreadable`] if the
    /// PEB cannot be read.
    pub fn process_parameters(&self, thread_id: u64) -> Result<u64> {
        let peb = self.peb_address(thread_id)?;
        self.read_pointer_at(peb.wrapping_add(self.offsets.process_parameters_offset_in_peb))
    }

    /// Load address of the main executable, as recorded in the PEB.
    ///
    /// # Errors
    /// Fails like [`ChainWalker::peb_address`], or with [`crate::Error::Unreadable`] if the
    /// PEB cannot be read.
    pub fn image_base(&self, thread_id: u64) -> Result<u64> {
        let peb = self.peb_address(thread_id)?;
        self.read_pointer_at(peb.wrapping_add(self.offsets.image_base_offset))
    }

    /// Query command line, working directory and executable path of the current process.
    ///
    /// Fields that cannot be read are reported as unavailable in the result and logged as
    /// `unable to read <field>` warnings; they never fail the query.
    ///
    /// # Arguments
    /// * `thread_id` - Any thread of the process, used to locate the TIB
    /// * `core_attached` - `true` if a dump is loaded
    /// * `what` - Fields to read
    /// * `args` - Process selector; only the current process (no selector) is supported
    ///
    /// # Errors
    /// Returns [`crate::Error::ArgumentsNotSupported`] if `args` is non-empty, or
    /// [`crate::Error::NoCurrentProcess`] if no process is executing and no dump is attached.
    pub fn query_process_info(
        &self,
        thread_id: u64,
        core_attached: bool,
        what: ProcessInfoKind,
        args: Option<&str>,
    ) -> Result<ProcessInfo> {
        if args.is_some_and(|args| !args.is_empty()) {
            return Err(ArgumentsNotSupported);
        }
        if !self.memory.has_execution() && !core_attached {
            return Err(NoCurrentProcess);
        }

        let parameters = match self.process_parameters(thread_id) {
            Ok(parameters) => Some(parameters),
            Err(error) => {
                log::debug!("cannot locate process parameters: {error}");
                None
            }
        };

        let read = |wanted: bool, offset: u64| -> Field {
            if !wanted {
                return None;
            }
            Some(parameters.and_then(|base| self.read_unicode_string(base.wrapping_add(offset))))
        };

        let info = ProcessInfo {
            cmdline: read(what.wants_cmdline(), self.offsets.command_line_offset),
            cwd: read(what.wants_cwd(), self.offsets.cwd_offset),
            exe: read(what.wants_exe(), self.offsets.exe_path_offset),
        };

        for field in info.unavailable() {
            log::warn!("unable to read {field}");
        }

        Ok(info)
    }

    /// Read the thread information block of `thread_id`.
    ///
    /// # Arguments
    /// * `thread_id` - Thread whose block to read
    /// * `show_all` - Read the full 4 KiB block and keep non-zero undocumented slots
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if the thread local base is unknown, or
    /// [`crate::Error::Unreadable`] if the block cannot be read.
    pub fn read_tib(&self, thread_id: u64, show_all: bool) -> Result<ThreadInformationBlock> {
        let address = self.memory.thread_local_base(thread_id)?;
        let data = self
            .memory
            .read_memory(address, tib_read_size(self.width, show_all))?;

        ThreadInformationBlock::parse(address, &data, self.width)
    }
}
