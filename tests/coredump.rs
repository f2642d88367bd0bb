mod common;

use common::{exception_record64, init_logging, module_record, utf16};
use winscope::{
    dump::{pid_to_str, CoreDump, SymbolQuery},
    Error, ExceptionCode, PointerWidth, SectionMap, Session, TargetConfig,
};

fn windows_dump() -> SectionMap {
    SectionMap::new()
        .with_section(".reg/4711", vec![0u8; 64])
        .with_section(".coremodule/400000;s=5000;t=5f000000", utf16("C:\\app\\app.exe"))
        .with_section(".coremodule/7ff80000;v=10.0.19041.1", utf16("C:\\Windows\\ntdll.dll"))
        .with_section(".corebuildid/7ff80000", vec![0xab; 20])
        .with_section(".coremodule/75000000", utf16("C:\\Windows\\kernel32.dll"))
        .with_section(".corethread/4711", utf16("main"))
        .with_section(".corethread/4712", Vec::new())
        .with_section(".corebase", 0x40_0000_u64.to_le_bytes())
        .with_section(
            ".coreexception",
            exception_record64(0xC000_0005, 0x40_1234, &[0, 0xdead_0000]),
        )
}

#[test]
fn two_module_scenario() {
    let sections = SectionMap::new()
        .with_section(".coremodule/1000", utf16("app.exe"))
        .with_section(".coremodule/2000", utf16("lib.dll"));
    let dump = CoreDump::new(&sections, TargetConfig::windows64());

    let modules = dump.module_entries();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "lib.dll");
    assert_eq!(modules[0].address, 0x2000);
    assert_eq!(
        dump.enumerate_modules(),
        "<library-list>\n<library name=\"lib.dll\"><segment address=\"0x2000\"/></library></library-list>\n"
    );
}

#[test]
fn full_dump() {
    let sections = windows_dump();
    let dump = CoreDump::new(&sections, TargetConfig::windows32());

    let names: Vec<_> = dump
        .module_entries()
        .into_iter()
        .map(|module| (module.name, module.address))
        .collect();
    assert_eq!(
        names,
        [
            ("C:\\Windows\\ntdll.dll".to_string(), 0x7ff8_0000),
            ("C:\\Windows\\kernel32.dll".to_string(), 0x7500_0000),
        ]
    );
    assert_eq!(dump.load_executable().as_deref(), Some("C:\\app\\app.exe"));
    assert_eq!(dump.thread_name(4711).as_deref(), Some("main"));
    assert_eq!(dump.thread_name(4712), None);
    assert_eq!(dump.core_base(), Some(0x40_0000));

    let record = dump.decode_exception_record().unwrap();
    assert_eq!(record.kind(), Some(ExceptionCode::AccessViolation));
    assert_eq!(record.address, 0x40_1234);
    assert_eq!(
        record.to_string(),
        "ACCESS_VIOLATION (0xc0000005) at 0x401234, READ of 0xdead0000"
    );

    assert_eq!(pid_to_str(1, 4711), "Thread 0x1267");
}

#[test]
fn siginfo_by_width() {
    let sections = windows_dump();

    let narrow = CoreDump::new(&sections, TargetConfig::windows32());
    assert_eq!(narrow.exception_record().unwrap().width(), PointerWidth::Bits32);
    assert_eq!(narrow.xfer_siginfo(0, 200).unwrap().len(), 80);
    assert_eq!(narrow.xfer_siginfo(24, 4).unwrap(), 0xdead_0000_u32.to_le_bytes());
    assert!(matches!(narrow.xfer_siginfo(84, 4), Err(Error::OutOfBounds)));

    let wide = CoreDump::new(&sections, TargetConfig::windows64());
    assert_eq!(wide.xfer_siginfo(0, 152).unwrap().len(), 152);
    assert_eq!(wide.xfer_siginfo(40, 8).unwrap(), 0xdead_0000_u64.to_le_bytes());
}

#[test]
fn legacy_and_indexed_modules() {
    let sections = SectionMap::new()
        .with_section(".module", module_record(3, 0x40_0000, "app.exe"))
        .with_section(".module", module_record(4, 0x7ff8_0000_0000, "ntdll.dll"))
        .with_section(".coremodule/10000000", utf16("zlib1.dll"));
    let dump = CoreDump::new(&sections, TargetConfig::default());

    let text = dump.enumerate_modules();
    assert!(!text.contains("app.exe"));
    assert!(text.contains("<library name=\"ntdll.dll\"><segment address=\"0x7ff800000000\"/></library>"));
    assert!(text.contains("<library name=\"zlib1.dll\"><segment address=\"0x10000000\"/></library>"));
}

#[test]
fn corrupt_dump_keeps_going() {
    init_logging();

    let sections = SectionMap::new()
        .with_section(".module", vec![4, 0, 0])
        .with_section(".coremodule/400000", utf16("app.exe"))
        .with_section(".module", module_record(7, 0x1000, "weird.dll"))
        .with_section(".coremodule/nothex", utf16("bogus.dll"))
        .with_section(".coremodule/2000", utf16("lib.dll"))
        .with_section(".coreexception", vec![0u8; 7]);
    let dump = CoreDump::new(&sections, TargetConfig::windows32());

    let modules = dump.module_entries();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "lib.dll");
    assert!(dump.decode_exception_record().is_err());
    assert!(dump.xfer_siginfo(0, 4).is_err());
}

#[test]
fn symbol_server_lookups() {
    init_logging();

    let sections = windows_dump();
    let locator = |query: &SymbolQuery<'_>| {
        if query.name.ends_with("ntdll.dll") {
            assert_eq!(query.build_id, Some(&[0xab; 20]));
            Some("/cache/ntdll.dll".to_string())
        } else {
            None
        }
    };

    let dump = CoreDump::new(&sections, TargetConfig::windows32().with_symbol_server(true))
        .with_locator(&locator);
    let modules = dump.module_entries();
    assert_eq!(modules[0].name, "/cache/ntdll.dll");
    assert_eq!(modules[1].name, "C:\\Windows\\kernel32.dll");
    assert_eq!(dump.load_executable().as_deref(), Some("C:\\app\\app.exe"));
}

#[test]
fn session_serves_library_list() {
    let sections = windows_dump();
    let dump = CoreDump::new(&sections, TargetConfig::windows32());
    let mut session = Session::new(TargetConfig::windows32());

    let mut text = Vec::new();
    let mut offset = 0;
    loop {
        let chunk = session.xfer_shared_libraries(&dump, offset, 16).to_vec();
        if chunk.is_empty() {
            break;
        }
        offset += chunk.len();
        text.extend(chunk);
    }

    assert_eq!(String::from_utf8(text).unwrap(), dump.enumerate_modules());
}
