//! Simulation time.
//!
//! Simulated time is a dimensionless, finite floating point quantity. The
//! same type serves as an instant on the simulation timeline and as a delay
//! between instants, mirroring common discrete-event practice where the time
//! unit is chosen by the model author.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A timestamp or duration on the simulation timeline.
///
/// A `SimTime` always holds a finite value, which makes it totally ordered
/// and therefore usable as a scheduler queue key. Negative values are
/// representable so that differences behave as expected; scheduling
/// operations reject negative delays at the API boundary.
///
/// # Examples
///
/// ```
/// use corosim::time::SimTime;
///
/// let t = SimTime::new(1.5) + SimTime::new(0.5);
/// assert_eq!(t, 2.0);
/// assert!(t > SimTime::ZERO);
/// ```
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    /// The origin of the simulation timeline.
    pub const ZERO: Self = Self(0.0);

    /// Creates a simulation time from a number of time units.
    ///
    /// # Panics
    ///
    /// Panics if the value is infinite or NaN.
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "simulation time must be finite");

        Self(value)
    }

    /// Returns the time as a raw floating point value.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Whether the value lies strictly before the timeline origin.
    pub(crate) fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<i32> for SimTime {
    fn from(value: i32) -> Self {
        Self(value as f64)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialEq<f64> for SimTime {
    fn eq(&self, other: &f64) -> bool {
        self.0.total_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<f64> for SimTime {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        Some(self.0.total_cmp(other))
    }
}

impl Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.0 - rhs.0)
    }
}

impl SubAssign for SimTime {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        let a = SimTime::new(1.0);
        let b = SimTime::new(2.5);

        assert!(a < b);
        assert!(b > a);
        assert_eq!(a.max(b), b);
        assert_eq!(SimTime::ZERO.min(a), SimTime::ZERO);
    }

    #[test]
    fn arithmetic() {
        let mut t = SimTime::new(3.0);
        t += SimTime::new(2.0);

        assert_eq!(t, 5.0);
        assert_eq!(t - SimTime::new(7.0), -2.0);
    }

    #[test]
    #[should_panic(expected = "finite")]
    fn non_finite_times_are_rejected() {
        let _ = SimTime::new(f64::NAN);
    }
}
