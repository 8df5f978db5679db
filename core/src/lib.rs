//! Core timing and observability primitives for the BK-0010 emulator.
//!
//! CPU time is counted in machine cycles of the processor clock. All timing
//! derives from this; wall-clock conversion goes through [`MasterClock`].

mod clock;
mod cycles;
mod observable;

pub use clock::MasterClock;
pub use cycles::Cycles;
pub use observable::{Observable, Value};
