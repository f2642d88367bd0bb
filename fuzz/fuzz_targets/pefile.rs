#![no_main]

use libfuzzer_sys::fuzz_target;
use winscope::{imports::import_directory_entries, is_linked_with_cygwin_dll, PeFile};

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = PeFile::from_mem(data.to_vec()) {
        let _ = is_linked_with_cygwin_dll(&file);
        let _ = import_directory_entries(&file);
    }
});
