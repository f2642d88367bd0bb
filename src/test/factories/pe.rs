//! Minimal PE32 images and import sections.

use crate::{
    imports::IMPORT_SECTION,
    target::{ImageHeaders, SectionMap, SectionSource},
};

/// RVA of `.text` in [`pe32_image`].
pub const PE_TEXT_RVA: u32 = 0x1000;

/// RVA of `.idata` and of the import directory in [`pe32_image`].
pub const PE_IDATA_RVA: u32 = 0x2000;

const PE_HEADER_OFFSET: usize = 0x80;
const FILE_ALIGNMENT: usize = 0x200;
const TEXT_RAW_OFFSET: usize = 0x200;
const IDATA_RAW_OFFSET: usize = 0x400;

/// An import section at `section_rva` importing `libraries`.
///
/// Layout: the descriptor table with its terminator, one shared empty thunk table, then the
/// NUL-terminated names in order.
pub fn idata_section(section_rva: u32, libraries: &[&str]) -> Vec<u8> {
    let table_size = (libraries.len() + 1) * 20;
    let thunk_rva = section_rva + table_size as u32;
    let mut names = Vec::new();
    let mut descriptors = Vec::with_capacity(table_size);

    for library in libraries {
        let name_rva = thunk_rva + 8 + names.len() as u32;
        names.extend_from_slice(library.as_bytes());
        names.push(0);

        for field in [thunk_rva, 0, 0, name_rva, thunk_rva] {
            descriptors.extend_from_slice(&field.to_le_bytes());
        }
    }
    descriptors.resize(table_size, 0);

    let mut section = descriptors;
    section.extend_from_slice(&[0u8; 8]);
    section.extend_from_slice(&names);
    section
}

fn put_u16(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_section(
    buffer: &mut [u8],
    offset: usize,
    name: &[u8],
    virtual_size: u32,
    rva: u32,
    raw_size: u32,
    raw_offset: u32,
    characteristics: u32,
) {
    buffer[offset..offset + name.len()].copy_from_slice(name);
    put_u32(buffer, offset + 8, virtual_size);
    put_u32(buffer, offset + 12, rva);
    put_u32(buffer, offset + 16, raw_size);
    put_u32(buffer, offset + 20, raw_offset);
    put_u32(buffer, offset + 36, characteristics);
}

/// A loadable 32-bit PE image with `.text` and `.idata` sections.
pub fn pe32_image(image_base: u32, entry_rva: u32, libraries: &[&str]) -> Vec<u8> {
    let idata = idata_section(PE_IDATA_RVA, libraries);
    let idata_raw_size = idata.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
    let mut image = vec![0u8; IDATA_RAW_OFFSET + idata_raw_size];

    // DOS header
    image[0..2].copy_from_slice(b"MZ");
    put_u32(&mut image, 0x3c, PE_HEADER_OFFSET as u32);

    // COFF header
    let coff = PE_HEADER_OFFSET;
    image[coff..coff + 4].copy_from_slice(b"PE\0\0");
    put_u16(&mut image, coff + 4, 0x014c);
    put_u16(&mut image, coff + 6, 2);
    put_u16(&mut image, coff + 20, 224);
    put_u16(&mut image, coff + 22, 0x0102);

    // Optional header
    let optional = coff + 24;
    put_u16(&mut image, optional, 0x010b);
    put_u32(&mut image, optional + 4, 0x200);
    put_u32(&mut image, optional + 16, entry_rva);
    put_u32(&mut image, optional + 20, PE_TEXT_RVA);
    put_u32(&mut image, optional + 24, PE_IDATA_RVA);
    put_u32(&mut image, optional + 28, image_base);
    put_u32(&mut image, optional + 32, 0x1000);
    put_u32(&mut image, optional + 36, FILE_ALIGNMENT as u32);
    put_u16(&mut image, optional + 40, 4);
    put_u16(&mut image, optional + 48, 4);
    put_u32(&mut image, optional + 56, 0x3000);
    put_u32(&mut image, optional + 60, 0x200);
    put_u16(&mut image, optional + 68, 3);
    put_u32(&mut image, optional + 72, 0x0010_0000);
    put_u32(&mut image, optional + 76, 0x1000);
    put_u32(&mut image, optional + 80, 0x0010_0000);
    put_u32(&mut image, optional + 84, 0x1000);
    put_u32(&mut image, optional + 92, 16);

    // Import directory, data directory 1
    let directories = optional + 96;
    put_u32(&mut image, directories + 8, PE_IDATA_RVA);
    put_u32(&mut image, directories + 12, ((libraries.len() + 1) * 20) as u32);

    let sections = optional + 224;
    put_section(
        &mut image,
        sections,
        b".text",
        0x100,
        PE_TEXT_RVA,
        0x200,
        TEXT_RAW_OFFSET as u32,
        0x6000_0020,
    );
    put_section(
        &mut image,
        sections + 40,
        b".idata",
        idata.len() as u32,
        PE_IDATA_RVA,
        idata_raw_size as u32,
        IDATA_RAW_OFFSET as u32,
        0xc000_0040,
    );

    // ret
    image[TEXT_RAW_OFFSET] = 0xc3;
    image[IDATA_RAW_OFFSET..IDATA_RAW_OFFSET + idata.len()].copy_from_slice(&idata);

    image
}

/// Fixed header values for collaborators that only need [`ImageHeaders`].
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    pub image_base: u64,
    pub entry_point_rva: u64,
    pub import_table_rva: Option<u64>,
    pub section_vmas: Vec<(String, u64)>,
}

impl StaticHeaders {
    pub fn new(image_base: u64, entry_point_rva: u64) -> Self {
        StaticHeaders {
            image_base,
            entry_point_rva,
            ..StaticHeaders::default()
        }
    }
}

impl ImageHeaders for StaticHeaders {
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
        self.section_vmas
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, vma)| *vma)
    }
}

/// Headers plus sections, without a PE file behind them.
#[derive(Debug, Clone)]
pub struct TestImage {
    pub headers: StaticHeaders,
    pub sections: SectionMap,
}

impl TestImage {
    /// Rewrite the `.idata` bytes in place.
    pub fn patch_idata(&mut self, patch: impl FnOnce(&mut Vec<u8>)) {
        let mut idata = self
            .sections
            .section_by_name(IMPORT_SECTION)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        patch(&mut idata);
        self.sections = SectionMap::new().with_section(IMPORT_SECTION, idata);
    }
}

impl SectionSource for TestImage {
    fn section_by_name(&self, name: &str) -> Option<&[u8]> {
        self.sections.section_by_name(name)
    }

    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8])) {
        self.sections.for_each_section(visit);
    }
}

impl ImageHeaders for TestImage {
    fn image_base(&self) -> u64 {
        self.headers.image_base()
    }

    fn entry_point_rva(&self) -> u64 {
        self.headers.entry_point_rva()
    }

    fn import_table_rva(&self) -> Option<u64> {
        self.headers.import_table_rva()
    }

    fn section_vma(&self, name: &str) -> Option<u64> {
        self.headers.section_vma(name)
    }
}

/// An image whose `.idata` section sits at `idata_rva` and whose import directory starts there.
pub fn idata_image(image_base: u64, idata_rva: u32, libraries: &[&str]) -> TestImage {
    let headers = StaticHeaders {
        import_table_rva: Some(u64::from(idata_rva)),
        section_vmas: vec![(
            IMPORT_SECTION.to_string(),
            image_base + u64::from(idata_rva),
        )],
        ..StaticHeaders::new(image_base, 0x1000)
    };

    TestImage {
        headers,
        sections: SectionMap::new().with_section(IMPORT_SECTION, idata_section(idata_rva, libraries)),
    }
}
