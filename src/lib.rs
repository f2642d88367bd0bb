// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # winscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/winscope.svg)](https://crates.io/crates/winscope)
//! [![Documentation](https://docs.rs/winscope/badge.svg)](https://docs.rs/winscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/winscope/blob/main/LICENSE-APACHE)
//!
//! Decoding of Windows and Cygwin process internals for debuggers. `winscope` knows where the
//! interesting pointers live inside the Thread Information Block, the Process Environment Block
//! and the process parameters of 32-bit and 64-bit processes, how Windows dumps store modules,
//! thread names and exception records as named sections, and how to tell a Cygwin program from
//! a native one by its imports.
//!
//! The crate never talks to a process or a dump file directly. Memory reads, section lookups,
//! breakpoints and symbol rebasing go through small collaborator traits in [`target`] and
//! [`process::entry`], so every decoder runs just as well against synthetic data.
//!
//! ## Features
//!
//! - **🧭 Control block walking** - TIB → PEB → process parameters for command line, working
//!   directory and executable path, with per-field failure reporting
//! - **📦 Dump section decoding** - Shared library list, main executable, thread names and the
//!   exception record, degrading gracefully on corrupt sections
//! - **🔁 Exception record down-conversion** - 64-bit records served in the 32-bit shape
//! - **🎯 Entry point handling** - ASLR rebasing and a silent entry breakpoint that restores
//!   hardware breakpoints Windows clears at process start
//! - **🔍 Import inspection** - Bounds-checked walk of `.idata` to detect `cygwin1.dll`
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! winscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust
//! use winscope::prelude::*;
//!
//! let offsets = offsets_for(PointerWidth::Bits64);
//! assert_eq!(offsets.peb_offset_in_tib, 96);
//! assert_eq!(signal_from_exception_code(0xC000_0005), Signal::Segv);
//! ```
//!
//! ### Process information
//!
//! ```rust
//! use winscope::{ChainWalker, MemoryImage, PointerWidth, ProcessInfoKind};
//!
//! // A dead target without a dump attached has nothing to report.
//! let memory = MemoryImage::new();
//! let walker = ChainWalker::new(&memory, PointerWidth::Bits32);
//! assert!(walker
//!     .query_process_info(1, false, ProcessInfoKind::All, None)
//!     .is_err());
//! ```
//!
//! ### Exception records
//!
//! ```rust
//! use winscope::{ExceptionCode, RecordShape};
//!
//! let mut raw = [0u8; 152];
//! raw[0..4].copy_from_slice(&0xC000_0005_u32.to_le_bytes());
//! raw[16..24].copy_from_slice(&0x401000_u64.to_le_bytes());
//!
//! let narrow = RecordShape::from_bytes(&raw)?.down_convert();
//! assert_eq!(narrow.as_bytes().len(), 80);
//! assert_eq!(narrow.decode()?.kind(), Some(ExceptionCode::AccessViolation));
//! # Ok::<(), winscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`layout`] - Pointer widths, control block offsets, TIB slots, `UNICODE_STRING` and
//!   exception record shapes
//! - [`process`] - The control block chain walker and entry point handling
//! - [`dump`] - Decoders for dump sections
//! - [`imports`] - The PE import directory walker
//! - [`signals`] - Signal numbering for Windows and Cygwin
//! - [`target`] - Collaborator traits and in-memory implementations
//! - [`Session`] - Per-address-space caches and event handlers
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! Recoverable problems (unreadable fields, bounds violations in `.idata`, symbol lookup misses)
//! are reported through the [`log`] facade. The library never installs a logger.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use winscope::prelude::*;
///
/// let config = TargetConfig::cygwin64();
/// assert_eq!(signal_to_target(config.abi, Signal::Abrt), Some(6));
/// ```
pub mod prelude;

/// Fixed layouts of Windows control blocks and records.
///
/// Every layout table is selected by [`layout::PointerWidth`]; there is no other source of
/// truth for offsets in this crate.
///
/// # Key Types
///
/// - [`layout::PointerWidth`] - 32 or 64-bit target
/// - [`layout::LayoutOffsets`] - TIB, PEB and process parameter field offsets
/// - [`layout::tib::ThreadInformationBlock`] - Decoded TIB with named slots
/// - [`layout::exception::RecordShape`] - Raw exception record of either width
///
/// # Examples
///
/// ```rust
/// use winscope::layout::{offsets_for, tib::tib_size, PointerWidth};
///
/// assert_eq!(offsets_for(PointerWidth::Bits32).image_base_offset, 8);
/// assert_eq!(tib_size(PointerWidth::Bits64), 112);
/// ```
pub mod layout;

/// Live process inspection.
///
/// [`process::ChainWalker`] follows the TIB → PEB → process parameters chain through a
/// [`target::TargetMemory`]; [`process::entry`] resolves the executable's load address and
/// manages the entry point breakpoint.
pub mod process;

/// Dump section decoders.
pub mod dump;

/// PE import directory walker.
pub mod imports;

pub mod signals;

/// Collaborator traits between the decoders and the debugger.
pub mod target;

mod config;
mod session;

/// `winscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use winscope::{PointerWidth, Result};
///
/// fn width_of(bits: u32) -> Result<PointerWidth> {
///     PointerWidth::try_from(bits)
/// }
///
/// assert!(width_of(16).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `winscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use winscope::{ChainWalker, Error, MemoryImage, PointerWidth, ProcessInfoKind};
///
/// let memory = MemoryImage::new();
/// let walker = ChainWalker::new(&memory, PointerWidth::Bits64);
/// match walker.query_process_info(1, false, ProcessInfoKind::All, Some("1234")) {
///     Err(Error::ArgumentsNotSupported) => println!("only the current process is supported"),
///     Err(e) => println!("Error: {}", e),
///     Ok(info) => println!("{:?}", info.lines()),
/// }
/// ```
pub use error::Error;

/// Loaded PE executable.
///
/// See [`file::PeFile`] for details.
pub use file::PeFile;

/// Cursor-based reader over a byte buffer.
///
/// # Example
///
/// ```rust
/// use winscope::Parser;
///
/// let mut parser = Parser::new(&[0x34, 0x12, 0x78, 0x56, 0x00, 0x00, 0x00, 0x00]);
/// assert_eq!(parser.read_le::<u16>()?, 0x1234);
/// assert_eq!(parser.read_le::<u16>()?, 0x5678);
/// # Ok::<(), winscope::Error>(())
/// ```
pub use file::parser::Parser;

pub use config::{TargetConfig, DEFAULT_THREAD_NAME_MAX_LEN};
pub use dump::{CoreDump, ModuleEntry, SymbolLocator, SymbolQuery};
pub use imports::{imports_named_library, is_linked_with_cygwin_dll, ImportDirectoryEntry};
pub use layout::{
    exception::{ExceptionCode, ExceptionFlags, ExceptionRecord, RecordShape},
    offsets_for,
    tib::ThreadInformationBlock,
    LayoutOffsets, PointerWidth,
};
pub use process::{
    entry::{BreakpointHost, EntryPointBreakpoint, ImageRebaser, OnHit, ResetLocation},
    ChainWalker, ProcessInfo, ProcessInfoKind,
};
pub use session::Session;
pub use signals::{signal_from_exception_code, signal_to_target, OsAbi, Signal};
pub use target::{ImageHeaders, MemoryImage, SectionMap, SectionSource, TargetMemory};
