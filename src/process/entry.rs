//! Executable base resolution and the process entry breakpoint.
//!
//! When a process is created (or a dump is loaded) the debugger needs the address the main
//! executable was actually mapped at. For a live process that is the `ImageBaseAddress` field
//! of the PEB; for a dump it is the `.corebase` section. If ASLR moved the image, the symbols
//! must be rebased before anything else is computed from them.
//!
//! Windows resets the CPU debug registers when a new process reaches its entry point, which
//! silently drops every hardware breakpoint and watchpoint the user already set. The
//! [`crate::process::entry::EntryPointBreakpoint`] sits on the entry point, never stops, and
//! re-inserts those hardware locations whenever it is hit.

use std::fmt;

use crate::{
    dump::read_core_base, process::ChainWalker, target::ImageHeaders, target::SectionSource,
    target::TargetMemory, Result,
};

/// Identifier of a debugger address space (program space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AddressSpaceId(pub u64);

/// Identifier the breakpoint subsystem assigns to an installed breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BreakpointId(pub u64);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a breakpoint location is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// Patched instruction
    SoftwareBreakpoint,
    /// Debug register breakpoint
    HardwareBreakpoint,
    /// Debug register watchpoint
    HardwareWatchpoint,
}

impl LocationKind {
    /// `true` for kinds backed by CPU debug registers.
    #[must_use]
    pub fn is_hardware(self) -> bool {
        matches!(
            self,
            LocationKind::HardwareBreakpoint | LocationKind::HardwareWatchpoint
        )
    }
}

/// One location of a breakpoint, as tracked by the breakpoint subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointLocation {
    /// Breakpoint owning the location
    pub breakpoint: BreakpointId,
    /// Address space the location lives in
    pub space: AddressSpaceId,
    /// Target address
    pub address: u64,
    /// Implementation of the location
    pub kind: LocationKind,
    /// `true` if currently inserted into the target
    pub inserted: bool,
}

/// The debugger's breakpoint subsystem.
pub trait BreakpointHost {
    /// Install a new internal breakpoint at `address`.
    ///
    /// # Errors
    /// Returns an error if the breakpoint cannot be created.
    fn install_breakpoint(&mut self, address: u64) -> Result<BreakpointId>;

    /// Move an existing breakpoint to `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if `id` is unknown.
    fn relocate_breakpoint(&mut self, id: BreakpointId, address: u64) -> Result<()>;

    /// Every location of every breakpoint.
    fn locations(&self) -> Vec<BreakpointLocation>;

    /// Remove a location from the target.
    ///
    /// # Errors
    /// Returns an error if the target refuses the removal.
    fn remove_location(&mut self, location: &BreakpointLocation) -> Result<()>;

    /// Insert a location into the target.
    ///
    /// # Errors
    /// Returns an error if the target refuses the insertion.
    fn insert_location(&mut self, location: &BreakpointLocation) -> Result<()>;
}

/// The debugger's symbol subsystem, as far as rebasing the main image goes.
pub trait ImageRebaser {
    /// `true` if symbols for the main executable are loaded.
    fn has_main_image(&self) -> bool {
        true
    }

    /// Shift every address of the main image by `delta` (two's complement for downward moves).
    fn rebase_main_image(&mut self, delta: u64);
}

/// What to do after a breakpoint was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// Report the stop to the user
    Stop,
    /// Resume the target silently
    Continue,
}

/// Reaction of a breakpoint to being hit.
pub trait OnHit {
    /// Handle a hit in `space`.
    fn on_hit(&self, host: &mut dyn BreakpointHost, space: AddressSpaceId) -> StopDecision;
}

/// Recomputation of a breakpoint's location after symbols or the image base changed.
pub trait ResetLocation {
    /// Move the breakpoint to `address` if it is not already there.
    ///
    /// Returns `true` if a relocation happened.
    ///
    /// # Errors
    /// Returns an error if the breakpoint subsystem refuses the relocation.
    fn reset_location(&mut self, host: &mut dyn BreakpointHost, address: u64) -> Result<bool>;
}

/// Internal breakpoint on the process entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointBreakpoint {
    id: BreakpointId,
    address: u64,
}

impl EntryPointBreakpoint {
    /// Install the breakpoint at `address`.
    ///
    /// # Errors
    /// Propagates the error of [`BreakpointHost::install_breakpoint`].
    pub fn create(host: &mut dyn BreakpointHost, address: u64) -> Result<Self> {
        let id = host.install_breakpoint(address)?;
        log::debug!("entry point breakpoint {id} installed at 0x{address:x}");

        Ok(EntryPointBreakpoint { id, address })
    }

    /// Identifier assigned by the breakpoint subsystem.
    #[must_use]
    pub fn id(&self) -> BreakpointId {
        self.id
    }

    /// Current address of the breakpoint.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }
}

impl OnHit for EntryPointBreakpoint {
    fn on_hit(&self, host: &mut dyn BreakpointHost, space: AddressSpaceId) -> StopDecision {
        let hardware = host
            .locations()
            .into_iter()
            .filter(|location| {
                location.inserted && location.space == space && location.kind.is_hardware()
            });

        for location in hardware {
            if let Err(error) = host.remove_location(&location) {
                log::debug!(
                    "cannot remove hardware location at 0x{:x}: {error}",
                    location.address
                );
                continue;
            }
            if let Err(error) = host.insert_location(&location) {
                log::warn!(
                    "cannot re-insert hardware location at 0x{:x}: {error}",
                    location.address
                );
            }
        }

        StopDecision::Continue
    }
}

impl ResetLocation for EntryPointBreakpoint {
    fn reset_location(&mut self, host: &mut dyn BreakpointHost, address: u64) -> Result<bool> {
        if self.address == address {
            return Ok(false);
        }

        host.relocate_breakpoint(self.id, address)?;
        log::debug!(
            "entry point breakpoint {} moved from 0x{:x} to 0x{address:x}",
            self.id,
            self.address
        );
        self.address = address;

        Ok(true)
    }
}

/// Base and entry point of the main executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutableEntry {
    /// Load address, 0 if unresolved
    pub base: u64,
    /// Entry point address, only resolved for executing processes
    pub entry: Option<u64>,
}

/// Resolve the load address of the main executable.
///
/// An executing process is asked through its PEB. If that yields nothing and a dump is
/// attached, the dump's `.corebase` section is used. 0 means unresolved.
pub fn resolve_exec_base<M: TargetMemory + ?Sized>(
    walker: &ChainWalker<'_, M>,
    thread_id: u64,
    dump: Option<&dyn SectionSource>,
) -> u64 {
    let mut base = 0;

    if walker.has_execution() {
        match walker.image_base(thread_id) {
            Ok(image_base) => base = image_base,
            Err(error) => log::debug!("cannot read image base from the PEB: {error}"),
        }
    }

    if base == 0 {
        if let Some(base_from_dump) = dump.and_then(read_core_base) {
            base = base_from_dump;
        }
    }

    base
}

/// Resolve base and entry point of the main executable, rebasing its symbols if ASLR moved it.
///
/// # Arguments
/// * `walker` - Chain walker over the target
/// * `thread_id` - Any thread of the process
/// * `dump` - Sections of the attached dump, if any
/// * `image` - Headers of the main executable
/// * `rebaser` - Symbol subsystem to notify of a moved image
pub fn resolve_exec_base_and_entry<M: TargetMemory + ?Sized>(
    walker: &ChainWalker<'_, M>,
    thread_id: u64,
    dump: Option<&dyn SectionSource>,
    image: &dyn ImageHeaders,
    rebaser: &mut dyn ImageRebaser,
) -> ExecutableEntry {
    let base = resolve_exec_base(walker, thread_id, dump);
    if base == 0 {
        return ExecutableEntry::default();
    }

    let link_base = image.image_base();
    if rebaser.has_main_image() && link_base != base {
        let delta = base.wrapping_sub(link_base);
        log::debug!("main image moved from 0x{link_base:x} to 0x{base:x}, rebasing");
        rebaser.rebase_main_image(delta);
    }

    let entry = walker
        .has_execution()
        .then(|| base.wrapping_add(image.entry_point_rva()));

    ExecutableEntry { base, entry }
}
