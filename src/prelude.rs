//! # winscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the winscope library. Import this module to get quick access to the essential
//! types for inspecting Windows processes and dumps.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all winscope operations
pub use crate::Error;

/// The result type used throughout winscope
pub use crate::Result;

/// Target description
pub use crate::TargetConfig;

/// Per-address-space state
pub use crate::Session;

// ================================================================================================
// Layouts
// ================================================================================================

/// Pointer widths and control block offsets
pub use crate::layout::{offsets_for, LayoutOffsets, PointerWidth};

/// Thread information block
pub use crate::layout::tib::ThreadInformationBlock;

/// Exception records
pub use crate::layout::exception::{ExceptionCode, ExceptionRecord, RecordShape};

// ================================================================================================
// Collaborators
// ================================================================================================

/// Traits the debugger implements
pub use crate::target::{ImageHeaders, SectionSource, TargetMemory};

/// In-memory implementations
pub use crate::target::{MemoryImage, SectionMap};

/// Breakpoint and symbol subsystems
pub use crate::process::entry::{BreakpointHost, ImageRebaser};

// ================================================================================================
// Decoders
// ================================================================================================

/// Live process inspection
pub use crate::process::{ChainWalker, ProcessInfo, ProcessInfoKind};

/// Dump sections
pub use crate::dump::{CoreDump, ModuleEntry, SymbolLocator};

/// Import directory
pub use crate::imports::{imports_named_library, is_linked_with_cygwin_dll};

/// Executable files
pub use crate::{Parser, PeFile};

/// Signals
pub use crate::signals::{signal_from_exception_code, signal_to_target, OsAbi, Signal};
