use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most decoders in this crate never surface these errors to the caller directly: the section
/// scanner and the import walker degrade a failed piece to "unavailable" and keep going. The
/// errors are still produced internally so that each failure carries its cause, and they are
/// returned as-is by the lower level building blocks ([`crate::Parser`], the layout decoders and
/// the collaborator traits in [`crate::target`]).
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - A size or offset inside a section is inconsistent
/// - [`Error::OutOfBounds`] - A computed offset or pointer falls outside its buffer
/// - [`Error::NotSupported`] - Unsupported pointer width or record shape
/// - [`Error::Empty`] - Empty input provided
///
/// ## Target Errors
/// - [`Error::Unreadable`] - Target memory could not be read
/// - [`Error::NotFound`] - Thread local base, section or breakpoint is unknown
/// - [`Error::Unavailable`] - An optional piece of information could not be produced
///
/// ## Query Errors
/// - [`Error::NoCurrentProcess`] - Neither a live process nor a dump is attached
/// - [`Error::ArgumentsNotSupported`] - A target selector was passed where only the current
///   process is supported
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from goblin crate
///
/// # Examples
///
/// ```rust,no_run
/// use winscope::{Error, PeFile};
/// use std::path::Path;
///
/// match PeFile::from_file(Path::new("program.exe")) {
///     Ok(file) => println!("Image base: 0x{:x}", file.imagebase()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be decoded.
    ///
    /// Raised for size or offset inconsistencies inside a section or record. The error
    /// includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding.
    ///
    /// Every bounds check in this crate happens before the access it guards, so this error
    /// means the read was refused, not that it happened.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This pointer width, record shape or file type is not supported.
    #[error("This target layout is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The target refused a memory read.
    #[error("Cannot access memory at 0x{address:x} ({length} bytes)")]
    Unreadable {
        /// First address of the refused read
        address: u64,
        /// Number of bytes that were requested
        length: usize,
    },

    /// A thread, section or breakpoint the operation depends on does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A requested piece of optional information could not be produced.
    ///
    /// The payload names the piece (`"cmdline"`, `"exception record"`, ...).
    #[error("unable to read {0}")]
    Unavailable(&'static str),

    /// Neither an executing process nor a dump is attached.
    #[error("No current process")]
    NoCurrentProcess,

    /// A process selector was given, but only the current process is supported.
    #[error("Only supported for the current process")]
    ArgumentsNotSupported,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}
