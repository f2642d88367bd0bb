#![no_main]

use libfuzzer_sys::fuzz_target;
use winscope::{dump::CoreDump, SectionMap, TargetConfig};

fuzz_target!(|data: &[u8]| {
    let sections = SectionMap::new()
        .with_section(".module", data.to_vec())
        .with_section(".coremodule/400000;s=1000;v=1.0", data.to_vec())
        .with_section(".coreexception", data.to_vec())
        .with_section(".corethread/1", data.to_vec());

    for config in [TargetConfig::windows32(), TargetConfig::windows64()] {
        let dump = CoreDump::new(&sections, config);
        let _ = dump.enumerate_modules();
        let _ = dump.decode_exception_record();
        let _ = dump.xfer_siginfo(0, 160);
        let _ = dump.thread_name(1);
    }
});
