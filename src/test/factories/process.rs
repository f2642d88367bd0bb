//! Live process images with a complete TIB → PEB → process parameters chain.

use crate::{
    layout::{
        offsets_for,
        tib::tib_size,
        unicode::{descriptor_size, string_to_utf16le},
        PointerWidth,
    },
    target::MemoryImage,
};

/// Thread every [`ProcessBuilder`] image knows about.
pub const TEST_THREAD: u64 = 0x1a2c;

const TIB_ADDRESS: u64 = 0x7ffd_e000;
const PEB_ADDRESS: u64 = 0x7ffd_f000;
const PEB_SIZE: usize = 0x100;
const PARAMETERS_ADDRESS: u64 = 0x0002_0000;
const PARAMETERS_SIZE: usize = 0x200;
const STRINGS_ADDRESS: u64 = 0x0003_0000;

/// Builds a live [`MemoryImage`] of one process.
///
/// Only the documented TIB slots are mapped. Strings that are not set leave an all-zero
/// `UNICODE_STRING` behind.
pub struct ProcessBuilder {
    width: PointerWidth,
    cmdline: Option<String>,
    cwd: Option<String>,
    exe: Option<String>,
    image_base: u64,
}

impl ProcessBuilder {
    pub fn new(width: PointerWidth) -> Self {
        ProcessBuilder {
            width,
            cmdline: None,
            cwd: None,
            exe: None,
            image_base: 0x0040_0000,
        }
    }

    pub fn cmdline(mut self, cmdline: &str) -> Self {
        self.cmdline = Some(cmdline.to_string());
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.cwd = Some(cwd.to_string());
        self
    }

    pub fn exe(mut self, exe: &str) -> Self {
        self.exe = Some(exe.to_string());
        self
    }

    pub fn image_base(mut self, image_base: u64) -> Self {
        self.image_base = image_base;
        self
    }

    fn put_pointer(&self, buffer: &mut [u8], offset: u64, value: u64) {
        let offset = offset as usize;
        let bytes = value.to_le_bytes();
        let size = self.width.bytes();
        buffer[offset..offset + size].copy_from_slice(&bytes[..size]);
    }

    pub fn build(self) -> MemoryImage {
        let offsets = offsets_for(self.width);
        let ptr = self.width.bytes();

        let mut tib = vec![0u8; tib_size(self.width)];
        // Self pointer and thread id, so the block looks like a real one.
        self.put_pointer(&mut tib, (6 * ptr) as u64, TIB_ADDRESS);
        self.put_pointer(&mut tib, (9 * ptr) as u64, TEST_THREAD);
        self.put_pointer(&mut tib, offsets.peb_offset_in_tib, PEB_ADDRESS);

        let mut peb = vec![0u8; PEB_SIZE];
        self.put_pointer(&mut peb, offsets.image_base_offset, self.image_base);
        self.put_pointer(
            &mut peb,
            offsets.process_parameters_offset_in_peb,
            PARAMETERS_ADDRESS,
        );

        let mut memory = MemoryImage::new()
            .live()
            .with_thread(TEST_THREAD, TIB_ADDRESS);

        let mut parameters = vec![0u8; PARAMETERS_SIZE];
        let strings = [
            (offsets.command_line_offset, &self.cmdline),
            (offsets.cwd_offset, &self.cwd),
            (offsets.exe_path_offset, &self.exe),
        ];
        for (index, (offset, text)) in strings.into_iter().enumerate() {
            let Some(text) = text else {
                continue;
            };

            let buffer = string_to_utf16le(text);
            let address = STRINGS_ADDRESS + index as u64 * 0x1000;
            let start = offset as usize;
            let length = buffer.len() as u16;

            parameters[start..start + 2].copy_from_slice(&length.to_le_bytes());
            parameters[start + 2..start + 4].copy_from_slice(&(length + 2).to_le_bytes());
            self.put_pointer(&mut parameters, offset + ptr as u64, address);
            debug_assert!(start + descriptor_size(self.width) <= PARAMETERS_SIZE);

            memory.map(address, buffer);
        }

        memory
            .with_region(TIB_ADDRESS, tib)
            .with_region(PEB_ADDRESS, peb)
            .with_region(PARAMETERS_ADDRESS, parameters)
    }
}
