use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BeatVizError, Result};

/// Loop length expressed as a fraction of a quarter note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopSize {
    numerator: u32,
    denominator: u32,
}

impl LoopSize {
    pub const QUARTER: LoopSize = LoopSize::new(1, 4);
    pub const HALF: LoopSize = LoopSize::new(1, 2);
    pub const ONE: LoopSize = LoopSize::new(1, 1);
    pub const TWO: LoopSize = LoopSize::new(2, 1);
    pub const FOUR: LoopSize = LoopSize::new(4, 1);
    pub const EIGHT: LoopSize = LoopSize::new(8, 1);
    pub const SIXTEEN: LoopSize = LoopSize::new(16, 1);

    /// Selectable loop sizes, shortest first.
    pub const ALL: [LoopSize; 7] = [
        Self::QUARTER,
        Self::HALF,
        Self::ONE,
        Self::TWO,
        Self::FOUR,
        Self::EIGHT,
        Self::SIXTEEN,
    ];

    const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Length in ticks at `resolution` ticks per quarter note. Never zero.
    pub fn ticks(&self, resolution: u32) -> u64 {
        let ticks = u64::from(resolution) * u64::from(self.numerator) / u64::from(self.denominator);
        ticks.max(1)
    }

    /// Beat-boundary predicate: does `gppqn` land on a multiple of this loop?
    pub fn is_beat(&self, gppqn: u64, resolution: u32) -> bool {
        gppqn % self.ticks(resolution) == 0
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|size| size == self)
            .unwrap_or(2)
    }
}

impl Default for LoopSize {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for LoopSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for LoopSize {
    type Err = BeatVizError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|size| size.to_string() == s.trim())
            .ok_or_else(|| BeatVizError::invalid_value("loop-size", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_beat_at_24_ppqn_fires_on_whole_beats() {
        let size = LoopSize::ONE;
        assert!(size.is_beat(0, 24));
        assert!(!size.is_beat(23, 24));
        assert!(size.is_beat(24, 24));
        assert!(size.is_beat(48, 24));
    }

    #[test]
    fn fractional_sizes_divide_the_beat() {
        assert_eq!(LoopSize::QUARTER.ticks(24), 6);
        assert_eq!(LoopSize::HALF.ticks(96), 48);
        assert_eq!(LoopSize::SIXTEEN.ticks(24), 384);
    }

    #[test]
    fn parses_labels() {
        assert_eq!("1/4".parse::<LoopSize>().unwrap(), LoopSize::QUARTER);
        assert_eq!("8".parse::<LoopSize>().unwrap(), LoopSize::EIGHT);
        assert!("3".parse::<LoopSize>().is_err());
    }
}
