//! Per-target debugging state.
//!
//! A [`crate::Session`] owns what the decoders would otherwise keep as process-wide globals:
//! the cached shared library list of a dump and the entry point breakpoint of a live process.
//! Both belong to one address space and both are reset when the debugger reports that the
//! process was (re)created.
//!
//! # Examples
//!
//! ```rust
//! use winscope::{dump::CoreDump, target::SectionMap, Session, TargetConfig};
//!
//! let utf16 = |text: &str| -> Vec<u8> { text.encode_utf16().flat_map(u16::to_le_bytes).collect() };
//! let sections = SectionMap::new()
//!     .with_section(".coremodule/400000", utf16("app.exe"))
//!     .with_section(".coremodule/7ff00000", utf16("ntdll.dll"));
//!
//! let mut session = Session::new(TargetConfig::windows32());
//! let dump = CoreDump::new(&sections, *session.config());
//!
//! let head = session.xfer_shared_libraries(&dump, 0, 15);
//! assert_eq!(head, b"<library-list>\n");
//! assert!(session.xfer_shared_libraries(&dump, 4096, 16).is_empty());
//! ```

use crate::{
    dump::CoreDump,
    layout::tib::ThreadInformationBlock,
    process::{
        entry::{
            resolve_exec_base_and_entry, AddressSpaceId, BreakpointHost, BreakpointId,
            EntryPointBreakpoint, ExecutableEntry, ImageRebaser, OnHit, ResetLocation,
            StopDecision,
        },
        ChainWalker,
    },
    signals::{signal_to_target, Signal},
    target::{ImageHeaders, SectionSource, TargetMemory},
    Result, TargetConfig,
};

/// State of one debugged address space.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: TargetConfig,
    library_list: Option<String>,
    executable: Option<ExecutableEntry>,
    entry_breakpoint: Option<EntryPointBreakpoint>,
}

impl Session {
    /// Create a session for a target described by `config`.
    #[must_use]
    pub fn new(config: TargetConfig) -> Self {
        Session {
            config,
            ..Session::default()
        }
    }

    /// The target configuration.
    #[must_use]
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// A chain walker over `memory` using this session's pointer width.
    pub fn walker<'m, M: TargetMemory + ?Sized>(&self, memory: &'m M) -> ChainWalker<'m, M> {
        ChainWalker::new(memory, self.config.width)
    }

    /// Read the thread information block of `thread_id`.
    ///
    /// The whole 4 KiB block is decoded when the configuration asks for every slot.
    ///
    /// # Errors
    /// See [`ChainWalker::read_tib`].
    pub fn read_tib<M: TargetMemory + ?Sized>(
        &self,
        memory: &M,
        thread_id: u64,
    ) -> Result<ThreadInformationBlock> {
        self.walker(memory).read_tib(thread_id, self.config.show_all_tib)
    }

    /// Target number of `signal` under this session's ABI.
    #[must_use]
    pub fn signal_to_target(&self, signal: Signal) -> Option<i32> {
        signal_to_target(self.config.abi, signal)
    }

    /// Base and entry point resolved by the last process creation event.
    #[must_use]
    pub fn executable(&self) -> Option<ExecutableEntry> {
        self.executable
    }

    /// The entry point breakpoint, once a live process reported its entry point.
    #[must_use]
    pub fn entry_breakpoint(&self) -> Option<&EntryPointBreakpoint> {
        self.entry_breakpoint.as_ref()
    }

    /// Drop the cached shared library list.
    pub fn invalidate_library_list(&mut self) {
        self.library_list = None;
    }

    /// React to the process being created or re-created.
    ///
    /// Resolves the executable's load address, rebases its symbols if it moved and, for an
    /// executing process, installs the entry point breakpoint or moves the existing one. The
    /// cached library list is dropped in every case.
    ///
    /// # Arguments
    /// * `memory` - Memory of the new process or of the dump
    /// * `thread_id` - Any thread of the process
    /// * `dump` - Sections of the attached dump, if any
    /// * `image` - Headers of the main executable
    /// * `rebaser` - Symbol subsystem
    /// * `host` - Breakpoint subsystem
    ///
    /// # Errors
    /// Returns the breakpoint subsystem's error if the breakpoint cannot be installed or moved.
    pub fn on_process_created<M: TargetMemory + ?Sized>(
        &mut self,
        memory: &M,
        thread_id: u64,
        dump: Option<&dyn SectionSource>,
        image: &dyn ImageHeaders,
        rebaser: &mut dyn ImageRebaser,
        host: &mut dyn BreakpointHost,
    ) -> Result<ExecutableEntry> {
        self.invalidate_library_list();

        let walker = self.walker(memory);
        let executable = resolve_exec_base_and_entry(&walker, thread_id, dump, image, rebaser);
        self.executable = Some(executable);

        if let Some(entry) = executable.entry {
            match self.entry_breakpoint.as_mut() {
                Some(breakpoint) => {
                    breakpoint.reset_location(host, entry)?;
                }
                None => {
                    self.entry_breakpoint = Some(EntryPointBreakpoint::create(host, entry)?);
                }
            }
        }

        Ok(executable)
    }

    /// Decide what a hit of breakpoint `id` in `space` means.
    ///
    /// Only the entry point breakpoint is handled here; any other breakpoint stops.
    pub fn on_breakpoint_hit(
        &self,
        id: BreakpointId,
        host: &mut dyn BreakpointHost,
        space: AddressSpaceId,
    ) -> StopDecision {
        match &self.entry_breakpoint {
            Some(breakpoint) if breakpoint.id() == id => breakpoint.on_hit(host, space),
            _ => StopDecision::Stop,
        }
    }

    /// The shared library list of `dump`, built on first use.
    pub fn library_list<S: SectionSource + ?Sized>(&mut self, dump: &CoreDump<'_, S>) -> &str {
        self.library_list
            .get_or_insert_with(|| dump.enumerate_modules())
            .as_str()
    }

    /// Read up to `length` bytes of the library list starting at `offset`.
    ///
    /// Reads past the end return nothing.
    pub fn xfer_shared_libraries<S: SectionSource + ?Sized>(
        &mut self,
        dump: &CoreDump<'_, S>,
        offset: usize,
        length: usize,
    ) -> &[u8] {
        let text = self.library_list(dump).as_bytes();
        if offset >= text.len() {
            return &[];
        }

        let end = offset.saturating_add(length).min(text.len());
        &text[offset..end]
    }
}
