//! Decoders for the notes a Windows dump stores as named sections.
//!
//! A dump reader exposes the notes of a Windows minidump or Cygwin core file as sections
//! with well-known names. [`crate::dump::CoreDump`] walks those sections and answers the
//! questions a debugger asks about a dump: which shared libraries were loaded, what the main
//! executable was, what threads were called and which exception stopped the process.
//!
//! Every decoder here degrades instead of failing: a truncated or corrupt section makes that
//! single piece of information unavailable and the scan moves on to the next section.
//!
//! # Sections
//!
//! | Name                        | Contents                                          |
//! |-----------------------------|---------------------------------------------------|
//! | `.module*`                  | Fixed binary module record                        |
//! | `.coremodule/<hex>`         | UTF-16 module path, load address in the name      |
//! | `.corebuildid/<hex>`        | 20-byte build id of the module at `<hex>`         |
//! | `.corethread/<decimal>`     | UTF-16 thread name                                |
//! | `.coreexception`            | 64-bit exception record                           |
//! | `.corebase`                 | Load address of the main executable (u64)         |
//!
//! # Examples
//!
//! ```rust
//! use winscope::{dump::CoreDump, target::SectionMap, TargetConfig};
//!
//! let utf16 = |text: &str| -> Vec<u8> { text.encode_utf16().flat_map(u16::to_le_bytes).collect() };
//! let sections = SectionMap::new()
//!     .with_section(".coremodule/1000", utf16("app.exe"))
//!     .with_section(".coremodule/2000", utf16("lib.dll"));
//!
//! let dump = CoreDump::new(&sections, TargetConfig::windows64());
//! assert_eq!(dump.load_executable().as_deref(), Some("app.exe"));
//! assert_eq!(
//!     dump.enumerate_modules(),
//!     "<library-list>\n<library name=\"lib.dll\"><segment address=\"0x2000\"/></library></library-list>\n"
//! );
//! ```

mod exception;
mod modules;
mod symbols;
mod threads;

pub use exception::{
    exception_record, read_core_base, xfer_siginfo, CORE_BASE_SECTION, CORE_EXCEPTION_SECTION,
};
pub use modules::{
    decode_module_name, decode_module_record, library_list_xml, ModuleEntry,
    MODULE_SECTION_PREFIX, NOTE_INFO_MODULE, NOTE_INFO_MODULE64,
};
pub use symbols::{
    module_build_id, resolve_module_name, ModuleSectionName, SymbolLocator, SymbolQuery,
    BUILD_ID_SIZE, CORE_BUILD_ID_PREFIX, CORE_MODULE_PREFIX,
};
pub use threads::{pid_to_str, thread_name, thread_section_name, CORE_THREAD_PREFIX};

use crate::{
    layout::exception::{ExceptionRecord, RecordShape},
    target::SectionSource,
    Result, TargetConfig,
};

/// Section-level view of one dump.
pub struct CoreDump<'a, S: SectionSource + ?Sized> {
    sections: &'a S,
    config: TargetConfig,
    locator: Option<&'a dyn SymbolLocator>,
}

impl<'a, S: SectionSource + ?Sized> CoreDump<'a, S> {
    /// Create a view over `sections`.
    pub fn new(sections: &'a S, config: TargetConfig) -> Self {
        CoreDump {
            sections,
            config,
            locator: None,
        }
    }

    /// Resolve module names through `locator` when the configuration enables symbol lookups.
    #[must_use]
    pub fn with_locator(mut self, locator: &'a dyn SymbolLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// The underlying sections.
    pub fn sections(&self) -> &'a S {
        self.sections
    }

    /// The target configuration.
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    fn active_locator(&self) -> Option<&'a dyn SymbolLocator> {
        self.locator.filter(|_| self.config.use_symbol_server)
    }

    fn resolved_name(&self, module: &ModuleSectionName<'_>, data: &[u8]) -> String {
        let name = decode_module_name(data);
        match self.active_locator() {
            Some(locator) => resolve_module_name(self.sections, locator, module, name),
            None => name,
        }
    }

    fn indexed_module(&self, section: &str, data: &[u8], resolve: bool) -> Option<ModuleEntry> {
        let Some(module) = ModuleSectionName::parse(section) else {
            log::debug!("skipping module section with invalid address - {section}");
            return None;
        };

        let name = if resolve {
            self.resolved_name(&module, data)
        } else {
            decode_module_name(data)
        };

        Some(ModuleEntry {
            name,
            address: module.address,
        })
    }

    /// Every module in discovery order, main executable first.
    ///
    /// Only the modules after the main executable go through the symbol locator.
    pub fn modules(&self) -> Vec<ModuleEntry> {
        let mut modules = Vec::new();

        self.sections.for_each_section(&mut |section, data| {
            if section.starts_with(CORE_MODULE_PREFIX) {
                let resolve = !modules.is_empty();
                modules.extend(self.indexed_module(section, data, resolve));
            } else if section.starts_with(MODULE_SECTION_PREFIX) {
                match decode_module_record(data) {
                    Ok(module) => modules.push(module),
                    Err(error) => log::debug!("skipping module section {section}: {error}"),
                }
            }
        });

        modules
    }

    /// Shared libraries in discovery order.
    ///
    /// The first module found, whichever naming convention it uses, is the main executable and
    /// is left out.
    pub fn module_entries(&self) -> Vec<ModuleEntry> {
        let mut modules = self.modules();
        if !modules.is_empty() {
            modules.remove(0);
        }

        modules
    }

    /// The shared library list document.
    pub fn enumerate_modules(&self) -> String {
        library_list_xml(&self.module_entries())
    }

    /// Path of the main executable, taken from the first indexed module section.
    ///
    /// The name is read from the payload even when the section name carries no usable address.
    pub fn load_executable(&self) -> Option<String> {
        let mut executable = None;
        let mut seen = false;

        self.sections.for_each_section(&mut |section, data| {
            if seen || !section.starts_with(CORE_MODULE_PREFIX) {
                return;
            }
            seen = true;
            executable = Some(match ModuleSectionName::parse(section) {
                Some(module) => self.resolved_name(&module, data),
                None => decode_module_name(data),
            });
        });

        executable
    }

    /// Name of thread `thread_id`, cut to the configured length.
    pub fn thread_name(&self, thread_id: u64) -> Option<String> {
        thread_name(self.sections, thread_id, self.config.thread_name_max_len)
    }

    /// The exception record in the target's shape.
    ///
    /// # Errors
    /// See [`exception_record`].
    pub fn exception_record(&self) -> Result<RecordShape> {
        exception_record(self.sections, self.config.width)
    }

    /// The decoded exception record.
    ///
    /// # Errors
    /// See [`exception_record`].
    pub fn decode_exception_record(&self) -> Result<ExceptionRecord> {
        self.exception_record()?.decode()
    }

    /// Read part of the exception record as the target sees it.
    ///
    /// # Errors
    /// See [`xfer_siginfo`].
    pub fn xfer_siginfo(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        xfer_siginfo(self.sections, self.config.width, offset, length)
    }

    /// Load address of the main executable, if recorded.
    pub fn core_base(&self) -> Option<u64> {
        read_core_base(self.sections)
    }
}
