//! Edge strength: a three-tier classification derived purely from frequency.

use serde::{Deserialize, Serialize};

/// Frequency at or above which an edge is [`Strength::Strong`].
pub const STRONG_THRESHOLD: u64 = 10;
/// Frequency at or above which an edge is at least [`Strength::Medium`].
pub const MEDIUM_THRESHOLD: u64 = 4;

/// Ordered `Weak < Medium < Strong`, so upgrades are plain comparisons.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum Strength {
  Weak,
  Medium,
  Strong,
}

impl Strength {
  /// Classify an aggregate frequency. Total over all non-negative integers.
  pub fn classify(frequency: u64) -> Self {
    if frequency >= STRONG_THRESHOLD {
      Self::Strong
    } else if frequency >= MEDIUM_THRESHOLD {
      Self::Medium
    } else {
      Self::Weak
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tier_boundaries() {
    assert_eq!(Strength::classify(0), Strength::Weak);
    assert_eq!(Strength::classify(3), Strength::Weak);
    assert_eq!(Strength::classify(4), Strength::Medium);
    assert_eq!(Strength::classify(9), Strength::Medium);
    assert_eq!(Strength::classify(10), Strength::Strong);
    assert_eq!(Strength::classify(u64::MAX), Strength::Strong);
  }

  #[test]
  fn classification_is_monotonic() {
    let mut previous = Strength::classify(0);
    for f in 1..=32 {
      let current = Strength::classify(f);
      assert!(current >= previous, "tier dropped at frequency {f}");
      previous = current;
    }
  }

  #[test]
  fn column_encoding_roundtrip() {
    for s in [Strength::Weak, Strength::Medium, Strength::Strong] {
      assert_eq!(s.as_ref().parse::<Strength>().unwrap(), s);
    }
    assert_eq!(Strength::Medium.as_ref(), "medium");
  }
}
