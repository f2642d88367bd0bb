//! Module section names and external symbol lookup.
//!
//! Indexed module sections carry more than the load address in their name. A full name looks
//! like `.coremodule/7ff6a0b40000;s=2d000;t=5f3e1a2b;v=10.0.19041.1` where `s` is the image
//! size and `t` the link timestamp (both hex), and `v` the file version as free text. Size and
//! timestamp (plus an optional 20-byte build id stored in `.corebuildid/<hex-address>`) are the
//! key a symbol server needs to find the matching binary.

use crate::target::SectionSource;

/// Prefix of indexed module sections.
pub const CORE_MODULE_PREFIX: &str = ".coremodule/";

/// Prefix of build id sections.
pub const CORE_BUILD_ID_PREFIX: &str = ".corebuildid/";

/// Size of a build id.
pub const BUILD_ID_SIZE: usize = 20;

/// Value of the leading hex digits of `text`, `None` if there are none or they overflow.
fn leading_hex(text: &str) -> Option<u64> {
    let end = text
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }

    u64::from_str_radix(&text[..end], 16).ok()
}

fn hex_attribute(name: &str, key: &str) -> Option<u32> {
    let start = name.find(key)? + key.len();
    leading_hex(&name[start..]).and_then(|value| u32::try_from(value).ok())
}

/// The decoded name of an indexed module section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSectionName<'a> {
    /// Load address of the module
    pub address: u64,
    /// Image size (`;s=`)
    pub size: Option<u32>,
    /// Link timestamp (`;t=`)
    pub timestamp: Option<u32>,
    /// File version (`;v=`), everything after the key
    pub version: Option<&'a str>,
}

impl<'a> ModuleSectionName<'a> {
    /// Decode a section name.
    ///
    /// Returns `None` if the name does not start with [`CORE_MODULE_PREFIX`] or no hex address
    /// follows it.
    #[must_use]
    pub fn parse(name: &'a str) -> Option<Self> {
        let rest = name.strip_prefix(CORE_MODULE_PREFIX)?;
        let address = leading_hex(rest)?;

        let version = name
            .find(";v=")
            .map(|start| &name[start + 3..]);

        Some(ModuleSectionName {
            address,
            size: hex_attribute(name, ";s="),
            timestamp: hex_attribute(name, ";t="),
            version,
        })
    }

    /// Name of the companion build id section.
    #[must_use]
    pub fn build_id_section(&self) -> String {
        format!("{CORE_BUILD_ID_PREFIX}{:x}", self.address)
    }
}

/// Everything known about a module when asking a symbol server for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolQuery<'a> {
    /// Module name as stored in the dump
    pub name: &'a str,
    /// Image size, 0 if unknown
    pub size: u32,
    /// Link timestamp, 0 if unknown
    pub timestamp: u32,
    /// Build id from the dump, if stored
    pub build_id: Option<&'a [u8; BUILD_ID_SIZE]>,
}

/// External lookup of module binaries, typically backed by a symbol server.
pub trait SymbolLocator {
    /// Local path of the binary matching `query`, `None` if it cannot be found.
    fn locate(&self, query: &SymbolQuery<'_>) -> Option<String>;
}

impl<F> SymbolLocator for F
where
    F: Fn(&SymbolQuery<'_>) -> Option<String>,
{
    fn locate(&self, query: &SymbolQuery<'_>) -> Option<String> {
        self(query)
    }
}

/// Build id of a module, if the dump stores one of the right size.
pub fn module_build_id<'s, S: SectionSource + ?Sized>(
    sections: &'s S,
    module: &ModuleSectionName<'_>,
) -> Option<&'s [u8; BUILD_ID_SIZE]> {
    sections
        .section_by_name(&module.build_id_section())
        .and_then(|data| <&[u8; BUILD_ID_SIZE]>::try_from(data).ok())
}

/// Resolve a module name through `locator`.
///
/// A miss is reported as a warning and the dump's own name is kept.
pub fn resolve_module_name<S: SectionSource + ?Sized>(
    sections: &S,
    locator: &dyn SymbolLocator,
    module: &ModuleSectionName<'_>,
    name: String,
) -> String {
    let query = SymbolQuery {
        name: &name,
        size: module.size.unwrap_or(0),
        timestamp: module.timestamp.unwrap_or(0),
        build_id: module_build_id(sections, module),
    };

    if let Some(path) = locator.locate(&query) {
        return path;
    }

    match module.version {
        Some(version) => log::warn!("Can't find '{name}' version {version}."),
        None => log::warn!("Can't find '{name}'."),
    }
    name
}
