//! Thread Information Block slot catalog.
//!
//! The documented part of the TIB (`NT_TIB` plus the first few TEB fields) is a run of 14
//! pointer-sized slots. The rest of the 4 KiB block is undocumented and is only shown when the
//! caller explicitly asks for every slot.

use std::fmt::Write;

use crate::{file::io::read_le_at_ptr, layout::PointerWidth, Result};

/// Names of the documented TIB slots, in memory order.
pub const TIB_FIELD_NAMES: [&str; 14] = [
    "current_seh",
    "current_top_of_stack",
    "current_bottom_of_stack",
    "sub_system_tib",
    "fiber_data",
    "arbitrary_data_slot",
    "linear_address_tib",
    "environment_pointer",
    "process_id",
    "current_thread_id",
    "active_rpc_handle",
    "thread_local_storage",
    "process_environment_block",
    "last_error_number",
];

/// Size of the complete thread information block, documented or not.
pub const FULL_TIB_SIZE: usize = 0x1000;

/// Size in bytes of the documented TIB slots for `width` (56 or 112).
#[must_use]
pub const fn tib_size(width: PointerWidth) -> usize {
    TIB_FIELD_NAMES.len() * width.bytes()
}

/// Number of bytes to read for a TIB display.
#[must_use]
pub const fn tib_read_size(width: PointerWidth, show_all: bool) -> usize {
    if show_all {
        FULL_TIB_SIZE
    } else {
        tib_size(width)
    }
}

/// One decoded slot of the thread information block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TibSlot {
    /// Byte offset of the slot from the start of the block
    pub offset: usize,
    /// Documented name, `None` for slots past the named region
    pub name: Option<&'static str>,
    /// Slot value, zero-extended on 32-bit targets
    pub value: u64,
}

/// A decoded thread information block.
///
/// Named slots are always present, whether zero or not. Unnamed slots only appear when the
/// block was decoded in show-all mode, and then only when non-zero.
#[derive(Debug, Clone)]
pub struct ThreadInformationBlock {
    /// Thread local base the block was read from
    pub address: u64,
    /// Pointer width used to decode the slots
    pub width: PointerWidth,
    /// Decoded slots in memory order
    pub slots: Vec<TibSlot>,
}

impl ThreadInformationBlock {
    /// Decode a block from raw bytes.
    ///
    /// # Arguments
    /// * `address` - Thread local base the bytes were read from
    /// * `data` - Block contents, at least [`tib_size`] bytes
    /// * `width` - Target pointer width
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` does not hold all named slots.
    pub fn parse(address: u64, data: &[u8], width: PointerWidth) -> Result<Self> {
        if data.len() < tib_size(width) {
            return Err(out_of_bounds_error!());
        }

        let mut slots = Vec::with_capacity(TIB_FIELD_NAMES.len());
        let mut offset = 0;
        let mut index = 0;
        while offset + width.bytes() <= data.len() {
            let slot_offset = offset;
            let value = read_le_at_ptr(data, &mut offset, width)?;
            let name = TIB_FIELD_NAMES.get(index).copied();

            if name.is_some() || value != 0 {
                slots.push(TibSlot {
                    offset: slot_offset,
                    name,
                    value,
                });
            }
            index += 1;
        }

        Ok(ThreadInformationBlock {
            address,
            width,
            slots,
        })
    }

    /// Value of a named slot.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.slots
            .iter()
            .find(|slot| slot.name == Some(name))
            .map(|slot| slot.value)
    }

    /// Render the block as printable text.
    ///
    /// The first line is `Thread Information Block <thread> at 0x<address>`, followed by one
    /// `<name> is 0x<value>` line per slot. Unnamed slots are labelled `TIB[0x<offset>]`.
    #[must_use]
    pub fn render(&self, thread: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Thread Information Block {} at 0x{:x}",
            thread, self.address
        );

        for slot in &self.slots {
            let value = self.width.hex(slot.value);
            let _ = match slot.name {
                Some(name) => writeln!(out, " {name:<28} is 0x{value}"),
                None => writeln!(out, "TIB[0x{:04x}] is 0x{value}", slot.offset),
            };
        }

        out
    }
}
