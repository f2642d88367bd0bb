//! Synthetic input factories

mod dump;
mod pe;
mod process;

pub use dump::*;
pub use pe::*;
pub use process::*;
