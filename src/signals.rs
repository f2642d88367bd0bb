//! Signal numbering for Windows and Cygwin targets.
//!
//! A debugger speaks in host-neutral signals; the target speaks either in MinGW-w64 C runtime
//! signal numbers, in Cygwin's POSIX-like numbers, or in NTSTATUS exception codes. This module
//! converts between the three.
//!
//! # Examples
//!
//! ```rust
//! use winscope::{signal_from_exception_code, signal_to_target, OsAbi, Signal};
//!
//! let signal = signal_from_exception_code(0xC000_0005);
//! assert_eq!(signal, Signal::Segv);
//! assert_eq!(signal_to_target(OsAbi::Windows, signal), Some(11));
//! assert_eq!(signal_to_target(OsAbi::Cygwin, Signal::Abrt), Some(6));
//! assert_eq!(signal_to_target(OsAbi::Windows, Signal::Abrt), Some(22));
//! ```

use strum::{Display, EnumIter};

use crate::layout::exception::ExceptionCode;

/// Debugger-neutral signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Signal {
    /// No signal
    #[strum(serialize = "0")]
    None,
    Hup,
    Int,
    Quit,
    Ill,
    Trap,
    Abrt,
    Emt,
    Fpe,
    Kill,
    Bus,
    Segv,
    Sys,
    Pipe,
    Alrm,
    Term,
    Urg,
    Stop,
    Tstp,
    Cont,
    Chld,
    Ttin,
    Ttou,
    Io,
    Xcpu,
    Xfsz,
    Vtalrm,
    Prof,
    Winch,
    Pwr,
    Usr1,
    Usr2,
    /// Anything without a mapping
    Unknown,
}

/// Flavor of the Windows runtime the target uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OsAbi {
    /// Native Windows with the MinGW-w64 C runtime
    #[default]
    Windows,
    /// Cygwin POSIX emulation
    Cygwin,
}

/// MinGW-w64 signal numbers.
#[allow(missing_docs)]
pub mod windows {
    pub const SIGHUP: i32 = 1;
    pub const SIGINT: i32 = 2;
    pub const SIGQUIT: i32 = 3;
    pub const SIGILL: i32 = 4;
    pub const SIGTRAP: i32 = 5;
    pub const SIGIOT: i32 = 6;
    pub const SIGEMT: i32 = 7;
    pub const SIGFPE: i32 = 8;
    pub const SIGKILL: i32 = 9;
    pub const SIGBUS: i32 = 10;
    pub const SIGSEGV: i32 = 11;
    pub const SIGSYS: i32 = 12;
    pub const SIGPIPE: i32 = 13;
    pub const SIGALRM: i32 = 14;
    pub const SIGTERM: i32 = 15;
    pub const SIGBREAK: i32 = 21;
    pub const SIGABRT: i32 = 22;
}

/// Cygwin signal numbers.
#[allow(missing_docs)]
pub mod cygwin {
    pub const SIGHUP: i32 = 1;
    pub const SIGINT: i32 = 2;
    pub const SIGQUIT: i32 = 3;
    pub const SIGILL: i32 = 4;
    pub const SIGTRAP: i32 = 5;
    pub const SIGABRT: i32 = 6;
    pub const SIGEMT: i32 = 7;
    pub const SIGFPE: i32 = 8;
    pub const SIGKILL: i32 = 9;
    pub const SIGBUS: i32 = 10;
    pub const SIGSEGV: i32 = 11;
    pub const SIGSYS: i32 = 12;
    pub const SIGPIPE: i32 = 13;
    pub const SIGALRM: i32 = 14;
    pub const SIGTERM: i32 = 15;
    pub const SIGURG: i32 = 16;
    pub const SIGSTOP: i32 = 17;
    pub const SIGTSTP: i32 = 18;
    pub const SIGCONT: i32 = 19;
    pub const SIGCHLD: i32 = 20;
    pub const SIGTTIN: i32 = 21;
    pub const SIGTTOU: i32 = 22;
    pub const SIGIO: i32 = 23;
    pub const SIGXCPU: i32 = 24;
    pub const SIGXFSZ: i32 = 25;
    pub const SIGVTALRM: i32 = 26;
    pub const SIGPROF: i32 = 27;
    pub const SIGWINCH: i32 = 28;
    pub const SIGLOST: i32 = 29;
    pub const SIGUSR1: i32 = 30;
    pub const SIGUSR2: i32 = 31;
}

fn windows_signal(signal: Signal) -> Option<i32> {
    use self::windows::*;

    let number = match signal {
        Signal::None => 0,
        Signal::Hup => SIGHUP,
        Signal::Int => SIGINT,
        Signal::Quit => SIGQUIT,
        Signal::Ill => SIGILL,
        Signal::Trap => SIGTRAP,
        Signal::Abrt => SIGABRT,
        Signal::Emt => SIGEMT,
        Signal::Fpe => SIGFPE,
        Signal::Kill => SIGKILL,
        Signal::Bus => SIGBUS,
        Signal::Segv => SIGSEGV,
        Signal::Sys => SIGSYS,
        Signal::Pipe => SIGPIPE,
        Signal::Alrm => SIGALRM,
        Signal::Term => SIGTERM,
        _ => return None,
    };

    Some(number)
}

fn cygwin_signal(signal: Signal) -> Option<i32> {
    use self::cygwin::*;

    let number = match signal {
        Signal::None => 0,
        Signal::Hup => SIGHUP,
        Signal::Int => SIGINT,
        Signal::Quit => SIGQUIT,
        Signal::Ill => SIGILL,
        Signal::Trap => SIGTRAP,
        Signal::Abrt => SIGABRT,
        Signal::Emt => SIGEMT,
        Signal::Fpe => SIGFPE,
        Signal::Kill => SIGKILL,
        Signal::Bus => SIGBUS,
        Signal::Segv => SIGSEGV,
        Signal::Sys => SIGSYS,
        Signal::Pipe => SIGPIPE,
        Signal::Alrm => SIGALRM,
        Signal::Term => SIGTERM,
        Signal::Urg => SIGURG,
        Signal::Stop => SIGSTOP,
        Signal::Tstp => SIGTSTP,
        Signal::Cont => SIGCONT,
        Signal::Chld => SIGCHLD,
        Signal::Ttin => SIGTTIN,
        Signal::Ttou => SIGTTOU,
        Signal::Io => SIGIO,
        Signal::Xcpu => SIGXCPU,
        Signal::Xfsz => SIGXFSZ,
        Signal::Vtalrm => SIGVTALRM,
        Signal::Prof => SIGPROF,
        Signal::Winch => SIGWINCH,
        Signal::Pwr => SIGLOST,
        Signal::Usr1 => SIGUSR1,
        Signal::Usr2 => SIGUSR2,
        Signal::Unknown => return None,
    };

    Some(number)
}

/// Target signal number of `signal`, `None` if the ABI has no equivalent.
#[must_use]
pub fn signal_to_target(abi: OsAbi, signal: Signal) -> Option<i32> {
    match abi {
        OsAbi::Windows => windows_signal(signal),
        OsAbi::Cygwin => cygwin_signal(signal),
    }
}

/// Signal a debugger reports for an exception code.
///
/// Code 0 means no exception and maps to [`Signal::None`]; codes without a mapping yield
/// [`Signal::Unknown`].
#[must_use]
pub fn signal_from_exception_code(code: u32) -> Signal {
    if code == 0 {
        return Signal::None;
    }

    let Some(code) = ExceptionCode::from_code(code) else {
        return Signal::Unknown;
    };

    match code {
        ExceptionCode::AccessViolation | ExceptionCode::StackOverflow => Signal::Segv,

        ExceptionCode::ArrayBoundsExceeded
        | ExceptionCode::FloatDenormalOperand
        | ExceptionCode::FloatDivideByZero
        | ExceptionCode::FloatInexactResult
        | ExceptionCode::FloatInvalidOperation
        | ExceptionCode::FloatOverflow
        | ExceptionCode::FloatStackCheck
        | ExceptionCode::FloatUnderflow
        | ExceptionCode::IntegerDivideByZero
        | ExceptionCode::IntegerOverflow => Signal::Fpe,

        ExceptionCode::Breakpoint | ExceptionCode::SingleStep => Signal::Trap,

        ExceptionCode::DbgControlC | ExceptionCode::DbgControlBreak => Signal::Int,

        ExceptionCode::IllegalInstruction
        | ExceptionCode::PrivInstruction
        | ExceptionCode::NoncontinuableException => Signal::Ill,

        ExceptionCode::FatalAppExit => Signal::Abrt,

        _ => Signal::Unknown,
    }
}
