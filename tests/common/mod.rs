//! Helpers shared by the integration tests.
#![allow(dead_code)]

use winscope::{
    offsets_for, BreakpointHost, ImageHeaders, ImageRebaser, MemoryImage, PointerWidth,
    SectionMap, SectionSource,
};
use winscope::process::entry::{BreakpointId, BreakpointLocation};

pub const THREAD: u64 = 4711;
pub const TIB: u64 = 0x7ffd_e000;
pub const PEB: u64 = 0x7ffd_f000;
pub const PARAMETERS: u64 = 0x0002_0000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn put(buffer: &mut [u8], offset: u64, value: u64, width: PointerWidth) {
    let offset = offset as usize;
    buffer[offset..offset + width.bytes()].copy_from_slice(&value.to_le_bytes()[..width.bytes()]);
}

/// A live process whose parameters hold `cmdline`, `cwd` and `exe` in that order.
pub fn live_process(
    width: PointerWidth,
    image_base: u64,
    strings: [Option<&str>; 3],
) -> MemoryImage {
    let offsets = offsets_for(width);

    let mut tib = vec![0u8; 14 * width.bytes()];
    put(&mut tib, offsets.peb_offset_in_tib, PEB, width);

    let mut peb = vec![0u8; 0x100];
    put(&mut peb, offsets.image_base_offset, image_base, width);
    put(&mut peb, offsets.process_parameters_offset_in_peb, PARAMETERS, width);

    let mut memory = MemoryImage::new().live().with_thread(THREAD, TIB);
    let mut parameters = vec![0u8; 0x200];
    let fields = [
        offsets.command_line_offset,
        offsets.cwd_offset,
        offsets.exe_path_offset,
    ];
    for (index, (offset, text)) in fields.into_iter().zip(strings).enumerate() {
        let Some(text) = text else { continue };
        let buffer = utf16(text);
        let address = 0x0010_0000 + index as u64 * 0x1000;

        let start = offset as usize;
        parameters[start..start + 2].copy_from_slice(&(buffer.len() as u16).to_le_bytes());
        parameters[start + 2..start + 4].copy_from_slice(&(buffer.len() as u16).to_le_bytes());
        put(&mut parameters, offset + width.bytes() as u64, address, width);
        memory.map(address, buffer);
    }

    memory
        .with_region(TIB, tib)
        .with_region(PEB, peb)
        .with_region(PARAMETERS, parameters)
}

/// A 64-bit exception record.
pub fn exception_record64(code: u32, address: u64, parameters: &[u64]) -> Vec<u8> {
    let mut record = vec![0u8; 152];
    record[0..4].copy_from_slice(&code.to_le_bytes());
    record[16..24].copy_from_slice(&address.to_le_bytes());
    record[24..28].copy_from_slice(&(parameters.len() as u32).to_le_bytes());
    for (index, parameter) in parameters.iter().enumerate() {
        record[32 + index * 8..40 + index * 8].copy_from_slice(&parameter.to_le_bytes());
    }
    record
}

/// A fixed binary module record.
pub fn module_record(tag: u32, base: u64, name: &str) -> Vec<u8> {
    let mut record = tag.to_le_bytes().to_vec();
    if tag == 4 {
        record.extend_from_slice(&base.to_le_bytes());
    } else {
        record.extend_from_slice(&(base as u32).to_le_bytes());
    }
    let mut name = name.as_bytes().to_vec();
    name.push(0);
    record.extend_from_slice(&(name.len() as u32).to_le_bytes());
    record.extend_from_slice(&name);
    record
}

/// An image described only by headers and sections.
pub struct Image {
    pub image_base: u64,
    pub entry_point_rva: u64,
    pub import_table_rva: Option<u64>,
    pub idata_rva: u64,
    pub sections: SectionMap,
}

impl Image {
    /// An image with an import section at `idata_rva` importing `libraries`.
    pub fn importing(image_base: u64, idata_rva: u32, libraries: &[&str]) -> Self {
        let table = (libraries.len() + 1) * 20;
        let mut idata = vec![0u8; table];
        let mut names = Vec::new();
        for (index, library) in libraries.iter().enumerate() {
            let name_rva = idata_rva + (table + names.len()) as u32;
            idata[index * 20 + 12..index * 20 + 16].copy_from_slice(&name_rva.to_le_bytes());
            names.extend_from_slice(library.as_bytes());
            names.push(0);
        }
        idata.extend_from_slice(&names);

        Image {
            image_base,
            entry_point_rva: 0x1000,
            import_table_rva: Some(u64::from(idata_rva)),
            idata_rva: u64::from(idata_rva),
            sections: SectionMap::new()
                .with_section(".text", vec![0xc3])
                .with_section(".idata", idata),
        }
    }
}

impl SectionSource for Image {
    fn section_by_name(&self, name: &str) -> Option<&[u8]> {
        self.sections.section_by_name(name)
    }

    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8])) {
        self.sections.for_each_section(visit);
    }
}

impl ImageHeaders for Image {
    fn image_base(&self) -> u64 {
        self.image_base
    }

    fn entry_point_rva(&self) -> u64 {
        self.entry_point_rva
    }

    fn import_table_rva(&self) -> Option<u64> {
        self.import_table_rva
    }

    fn section_vma(&self, name: &str) -> Option<u64> {
        (name == ".idata").then(|| self.image_base + self.idata_rva)
    }
}

/// Breakpoint subsystem keeping a plain list of locations.
#[derive(Default)]
pub struct Breakpoints {
    pub next: u64,
    pub addresses: Vec<(BreakpointId, u64)>,
    pub locations: Vec<BreakpointLocation>,
    pub reinserted: Vec<u64>,
}

impl BreakpointHost for Breakpoints {
    fn install_breakpoint(&mut self, address: u64) -> winscope::Result<BreakpointId> {
        self.next += 1;
        let id = BreakpointId(self.next);
        self.addresses.push((id, address));
        Ok(id)
    }

    fn relocate_breakpoint(&mut self, id: BreakpointId, address: u64) -> winscope::Result<()> {
        let slot = self
            .addresses
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .ok_or_else(|| winscope::Error::NotFound(format!("breakpoint {id}")))?;
        slot.1 = address;
        Ok(())
    }

    fn locations(&self) -> Vec<BreakpointLocation> {
        self.locations.clone()
    }

    fn remove_location(&mut self, _location: &BreakpointLocation) -> winscope::Result<()> {
        Ok(())
    }

    fn insert_location(&mut self, location: &BreakpointLocation) -> winscope::Result<()> {
        self.reinserted.push(location.address);
        Ok(())
    }
}

/// Symbol subsystem tracking the current image base.
pub struct Symbols {
    pub base: u64,
}

impl ImageRebaser for Symbols {
    fn rebase_main_image(&mut self, delta: u64) {
        self.base = self.base.wrapping_add(delta);
    }
}
