//! Thread names and thread display strings.

use crate::{layout::unicode::utf16le_to_string, target::SectionSource};

/// Prefix of thread name sections; the decimal thread id follows the slash.
pub const CORE_THREAD_PREFIX: &str = ".corethread/";

/// Name of the section holding the name of thread `thread_id`.
#[must_use]
pub fn thread_section_name(thread_id: u64) -> String {
    format!("{CORE_THREAD_PREFIX}{thread_id}")
}

/// Name of thread `thread_id`, cut to `max_len` characters.
///
/// Thread 0 never has a name. An absent or empty section means the thread is unnamed.
pub fn thread_name<S: SectionSource + ?Sized>(
    sections: &S,
    thread_id: u64,
    max_len: usize,
) -> Option<String> {
    if thread_id == 0 {
        return None;
    }

    let data = sections.section_by_name(&thread_section_name(thread_id))?;
    if data.is_empty() {
        return None;
    }

    let name = utf16le_to_string(data);
    Some(match name.char_indices().nth(max_len) {
        Some((end, _)) => name[..end].to_string(),
        None => name,
    })
}

/// Display string of a process or thread.
///
/// ```rust
/// use winscope::dump::pid_to_str;
///
/// assert_eq!(pid_to_str(1234, 0x1a2c), "Thread 0x1a2c");
/// assert_eq!(pid_to_str(1234, 0), "process 1234");
/// ```
#[must_use]
pub fn pid_to_str(pid: u64, lwp: u64) -> String {
    if lwp != 0 {
        format!("Thread 0x{lwp:x}")
    } else {
        format!("process {pid}")
    }
}
