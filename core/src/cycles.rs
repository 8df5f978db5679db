//! CPU time, counted in machine cycles.

use core::fmt;

/// A count of CPU machine cycles since reset.
///
/// This is the emulator's notion of time: monotonically non-decreasing,
/// advanced only by instruction execution, and carried to devices so they
/// can timestamp bus traffic. Conversion to wall-clock units goes through
/// [`crate::MasterClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cycles(u64);

impl Cycles {
    /// The moment of reset.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Cycles elapsed since an earlier point; zero if `earlier` is not
    /// actually earlier (monotonicity makes that a caller bug, not a
    /// panic).
    #[must_use]
    pub const fn since(self, earlier: Self) -> Self {
        Self(self.0.saturating_sub(earlier.0))
    }
}

/// Instruction costs are small cycle counts; let them add directly.
impl From<u32> for Cycles {
    fn from(count: u32) -> Self {
        Self(u64::from(count))
    }
}

impl fmt::Display for Cycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles", self.0)
    }
}

impl core::ops::Add for Cycles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        // A 64-bit cycle counter outlives any session; saturate anyway
        // so time never runs backwards.
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::ops::AddAssign for Cycles {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl core::ops::Sub for Cycles {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_never_goes_negative() {
        let early = Cycles::new(10);
        let late = Cycles::new(25);
        assert_eq!(late - early, Cycles::new(15));
        assert_eq!(early - late, Cycles::ZERO);
        assert_eq!(late.since(early).get(), 15);
    }

    #[test]
    fn instruction_costs_accumulate() {
        let mut total = Cycles::ZERO;
        total += Cycles::from(12u32);
        total += Cycles::from(24u32);
        assert_eq!(total, Cycles::new(36));
    }
}
