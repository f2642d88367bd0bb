//! Target configuration
//!
//! Options that depend on the debugged target rather than on the data being decoded: its
//! pointer width and runtime flavor, and a few presentation knobs.

use crate::{layout::PointerWidth, signals::OsAbi};

/// Default display length of thread names read from dumps.
pub const DEFAULT_THREAD_NAME_MAX_LEN: usize = 79;

/// Configuration of one debugged target
///
/// The pointer width selects every layout table; the ABI only affects signal numbering. All
/// other fields tune output and optional lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig {
    /// Pointer width of the target architecture
    pub width: PointerWidth,

    /// Runtime flavor, selects the signal table
    pub abi: OsAbi,

    /// Decode the whole 4 KiB thread information block instead of the documented slots
    pub show_all_tib: bool,

    /// Maximum number of characters kept from a thread name (default: 79)
    pub thread_name_max_len: usize,

    /// Consult the symbol locator for modules found in dumps
    pub use_symbol_server: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            width: PointerWidth::Bits64,
            abi: OsAbi::Windows,
            show_all_tib: false,
            thread_name_max_len: DEFAULT_THREAD_NAME_MAX_LEN,
            use_symbol_server: false,
        }
    }
}

impl TargetConfig {
    /// 32-bit native Windows target
    #[must_use]
    pub fn windows32() -> Self {
        Self {
            width: PointerWidth::Bits32,
            ..Self::default()
        }
    }

    /// 64-bit native Windows target
    #[must_use]
    pub fn windows64() -> Self {
        Self::default()
    }

    /// 64-bit Cygwin target
    #[must_use]
    pub fn cygwin64() -> Self {
        Self {
            abi: OsAbi::Cygwin,
            ..Self::default()
        }
    }

    /// Same configuration with another pointer width
    #[must_use]
    pub fn with_width(self, width: PointerWidth) -> Self {
        Self { width, ..self }
    }

    /// Same configuration with the full TIB shown
    #[must_use]
    pub fn with_show_all_tib(self, show_all_tib: bool) -> Self {
        Self {
            show_all_tib,
            ..self
        }
    }

    /// Same configuration with symbol server lookups turned on or off
    #[must_use]
    pub fn with_symbol_server(self, use_symbol_server: bool) -> Self {
        Self {
            use_symbol_server,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let config = TargetConfig::windows32();
        assert_eq!(config.width, PointerWidth::Bits32);
        assert_eq!(config.abi, OsAbi::Windows);
        assert_eq!(config.thread_name_max_len, 79);
        assert!(!config.show_all_tib);

        assert_eq!(TargetConfig::windows64(), TargetConfig::default());
        assert_eq!(TargetConfig::cygwin64().abi, OsAbi::Cygwin);
        assert_eq!(TargetConfig::cygwin64().width, PointerWidth::Bits64);
    }

    #[test]
    fn builders() {
        let config = TargetConfig::cygwin64()
            .with_width(PointerWidth::Bits32)
            .with_show_all_tib(true)
            .with_symbol_server(true);

        assert_eq!(config.width, PointerWidth::Bits32);
        assert_eq!(config.abi, OsAbi::Cygwin);
        assert!(config.show_all_tib);
        assert!(config.use_symbol_server);
    }
}
