//! Recording fakes for the debugger subsystems

use crate::{
    process::entry::{
        AddressSpaceId, BreakpointHost, BreakpointId, BreakpointLocation, ImageRebaser,
        LocationKind,
    },
    Error, Result,
};

/// Breakpoint subsystem that records every request.
#[derive(Debug, Default)]
pub struct FakeBreakpoints {
    pub installed: Vec<u64>,
    pub relocations: Vec<(BreakpointId, u64)>,
    pub locations: Vec<BreakpointLocation>,
    pub removed: Vec<u64>,
    pub inserted: Vec<u64>,
    pub refuse_install: bool,
    pub refuse_removal_at: Option<u64>,
    next_id: u64,
}

impl FakeBreakpoints {
    /// A subsystem that rejects every new breakpoint.
    pub fn refusing_install() -> Self {
        FakeBreakpoints {
            refuse_install: true,
            ..FakeBreakpoints::default()
        }
    }

    fn next_id(&mut self) -> BreakpointId {
        self.next_id += 1;
        BreakpointId(self.next_id)
    }

    /// Add a location owned by a fresh user breakpoint.
    pub fn add_location(
        &mut self,
        space: AddressSpaceId,
        address: u64,
        kind: LocationKind,
        inserted: bool,
    ) {
        let breakpoint = self.next_id();
        self.locations.push(BreakpointLocation {
            breakpoint,
            space,
            address,
            kind,
            inserted,
        });
    }
}

impl BreakpointHost for FakeBreakpoints {
    fn install_breakpoint(&mut self, address: u64) -> Result<BreakpointId> {
        if self.refuse_install {
            return Err(Error::Unavailable("breakpoint"));
        }

        self.installed.push(address);
        Ok(self.next_id())
    }

    fn relocate_breakpoint(&mut self, id: BreakpointId, address: u64) -> Result<()> {
        if id.0 == 0 || id.0 > self.next_id {
            return Err(Error::NotFound(format!("breakpoint {id}")));
        }

        self.relocations.push((id, address));
        Ok(())
    }

    fn locations(&self) -> Vec<BreakpointLocation> {
        self.locations.clone()
    }

    fn remove_location(&mut self, location: &BreakpointLocation) -> Result<()> {
        self.removed.push(location.address);
        if self.refuse_removal_at == Some(location.address) {
            return Err(Error::Unavailable("debug register"));
        }

        Ok(())
    }

    fn insert_location(&mut self, location: &BreakpointLocation) -> Result<()> {
        self.inserted.push(location.address);
        Ok(())
    }
}

/// Symbol subsystem that records every rebase.
#[derive(Debug, Default)]
pub struct RecordingRebaser {
    pub deltas: Vec<u64>,
}

impl ImageRebaser for RecordingRebaser {
    fn rebase_main_image(&mut self, delta: u64) {
        self.deltas.push(delta);
    }
}
