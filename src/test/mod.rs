//! Shared test infrastructure
//!
//! Factories build synthetic process images, PE files and dump sections; helpers provide
//! recording fakes for the breakpoint and symbol subsystems.

mod factories;
mod helpers;

pub use factories::*;
pub use helpers::*;
