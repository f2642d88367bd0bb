use std::collections::{BTreeMap, HashMap};

use super::TargetMemory;
use crate::{
    Error::{NotFound, Unreadable},
    Result,
};

/// Sparse in-memory snapshot of a target's address space.
///
/// Memory is a set of non-overlapping regions keyed by start address. A read succeeds only if
/// the whole range lies inside a single region, which mirrors how a dump stores memory ranges.
#[derive(Debug, Default, Clone)]
pub struct MemoryImage {
    regions: BTreeMap<u64, Vec<u8>>,
    thread_bases: HashMap<u64, u64>,
    live: bool,
}

impl MemoryImage {
    /// Create an empty image of a process that is not executing
    #[must_use]
    pub fn new() -> MemoryImage {
        MemoryImage::default()
    }

    /// Mark the image as a live, executing process.
    #[must_use]
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    /// Map `data` at `address`, replacing any region that starts at the same address.
    pub fn map(&mut self, address: u64, data: impl Into<Vec<u8>>) {
        self.regions.insert(address, data.into());
    }

    /// Builder form of [`MemoryImage::map`].
    #[must_use]
    pub fn with_region(mut self, address: u64, data: impl Into<Vec<u8>>) -> Self {
        self.map(address, data);
        self
    }

    /// Record the thread local base of `thread_id`.
    #[must_use]
    pub fn with_thread(mut self, thread_id: u64, thread_local_base: u64) -> Self {
        self.thread_bases.insert(thread_id, thread_local_base);
        self
    }

    /// Change whether the image counts as an executing process.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }
}

impl TargetMemory for MemoryImage {
    fn read_memory(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        let unreadable = || Unreadable { address, length };

        let (start, data) = self
            .regions
            .range(..=address)
            .next_back()
            .ok_or_else(unreadable)?;

        let offset = usize::try_from(address - start).map_err(|_| unreadable())?;
        let end = offset.checked_add(length).ok_or_else(unreadable)?;

        data.get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(unreadable)
    }

    fn thread_local_base(&self, thread_id: u64) -> Result<u64> {
        self.thread_bases
            .get(&thread_id)
            .copied()
            .ok_or_else(|| NotFound(format!("thread local base of thread {thread_id}")))
    }

    fn has_execution(&self) -> bool {
        self.live
    }
}
