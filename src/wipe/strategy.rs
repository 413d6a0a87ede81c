//! Overwrite pass strategies
//!
//! A [`WipeMethod`] expands into a [`PassPlan`]: the ordered list of
//! [`PassPattern`]s the file wiper writes over a file. Patterns are
//! materialised one [`CHUNK_SIZE`] chunk at a time, so memory use does not
//! depend on file size.

use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::Serialize;
use std::fmt;

/// Size of one overwrite chunk in bytes
pub const CHUNK_SIZE: usize = 4096;

/// Fixed pass count of the secure (Gutmann) method
pub const SECURE_PASSES: u32 = 35;

/// Defined Gutmann patterns; secure passes past the end of this table are random
const GUTMANN_TABLE: [PassPattern; 23] = [
    PassPattern::Fill(0x55),
    PassPattern::Fill(0xAA),
    PassPattern::Repeat([0x92, 0x49, 0x24]),
    PassPattern::Repeat([0x49, 0x24, 0x92]),
    PassPattern::Repeat([0x24, 0x92, 0x49]),
    PassPattern::Fill(0x00),
    PassPattern::Fill(0x11),
    PassPattern::Fill(0x22),
    PassPattern::Fill(0x33),
    PassPattern::Fill(0x44),
    PassPattern::Fill(0x55),
    PassPattern::Fill(0x66),
    PassPattern::Fill(0x77),
    PassPattern::Fill(0x88),
    PassPattern::Fill(0x99),
    PassPattern::Fill(0xAA),
    PassPattern::Fill(0xBB),
    PassPattern::Fill(0xCC),
    PassPattern::Fill(0xDD),
    PassPattern::Fill(0xEE),
    PassPattern::Fill(0xFF),
    PassPattern::Fill(0x55),
    PassPattern::Fill(0xAA),
];

/// Source of overwrite randomness
///
/// Production code uses [`OsRandom`]. Tests substitute deterministic
/// sources to make pass content observable.
pub trait RandomSource: Send + Sync {
    /// Fill `buf` completely or fail; partial fills are not allowed
    fn fill(&self, buf: &mut [u8]) -> Result<(), String>;
}

/// Operating-system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), String> {
        OsRng.try_fill_bytes(buf).map_err(|e| e.to_string())
    }
}

/// Overwrite method selected by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WipeMethod {
    /// One pass of zeros
    Quick,
    /// N passes alternating random data and 0xFF
    Deep,
    /// 35 Gutmann passes
    Secure,
    /// Deep passes followed by the full secure sequence
    #[value(name = "multilayered", alias = "multi-layered")]
    #[serde(rename = "multilayered")]
    MultiLayered,
}

impl WipeMethod {
    /// Build the pass sequence for this method
    ///
    /// `passes` only matters for deep and multilayered. A value of 0 for deep
    /// yields an empty plan: the file is left untouched but still counts as
    /// wiped and is removed.
    pub fn plan(self, passes: u32) -> PassPlan {
        let patterns = match self {
            WipeMethod::Quick => vec![PassPattern::Fill(0x00)],
            WipeMethod::Deep => deep_patterns(passes),
            WipeMethod::Secure => secure_patterns(),
            WipeMethod::MultiLayered => {
                let mut patterns = deep_patterns(passes);
                patterns.extend(secure_patterns());
                patterns
            }
        };
        PassPlan {
            method: self,
            patterns,
        }
    }

    /// Whether the caller-supplied pass count is used by this method
    pub fn uses_pass_count(self) -> bool {
        matches!(self, WipeMethod::Deep | WipeMethod::MultiLayered)
    }

    /// Lowercase name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            WipeMethod::Quick => "quick",
            WipeMethod::Deep => "deep",
            WipeMethod::Secure => "secure",
            WipeMethod::MultiLayered => "multilayered",
        }
    }
}

impl fmt::Display for WipeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deep_patterns(passes: u32) -> Vec<PassPattern> {
    (0..passes)
        .map(|i| {
            if i % 2 == 0 {
                PassPattern::Random
            } else {
                PassPattern::Fill(0xFF)
            }
        })
        .collect()
}

fn secure_patterns() -> Vec<PassPattern> {
    (0..SECURE_PASSES as usize)
        .map(|i| GUTMANN_TABLE.get(i).copied().unwrap_or(PassPattern::Random))
        .collect()
}

/// Content rule for a single overwrite pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPattern {
    /// Every byte set to the same value
    Fill(u8),
    /// Three-byte pattern repeated, aligned to file offset 0
    Repeat([u8; 3]),
    /// Fresh random bytes for every chunk
    Random,
}

impl PassPattern {
    /// Fill `buf` with the bytes that belong at file offset `offset`
    ///
    /// Fixed patterns are idempotent for a given offset, so callers can skip
    /// refilling between chunks when [`PassPattern::is_constant`] holds.
    pub fn fill_chunk(
        &self,
        buf: &mut [u8],
        offset: u64,
        rng: &dyn RandomSource,
    ) -> Result<(), String> {
        match self {
            PassPattern::Fill(byte) => {
                buf.fill(*byte);
                Ok(())
            }
            PassPattern::Repeat(pattern) => {
                let phase = (offset % pattern.len() as u64) as usize;
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = pattern[(phase + i) % pattern.len()];
                }
                Ok(())
            }
            PassPattern::Random => rng.fill(buf),
        }
    }

    /// True when every chunk of a pass has identical content
    pub fn is_constant(&self) -> bool {
        matches!(self, PassPattern::Fill(_))
    }
}

/// Ordered list of passes for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    method: WipeMethod,
    patterns: Vec<PassPattern>,
}

impl PassPlan {
    /// Method this plan was built from
    pub fn method(&self) -> WipeMethod {
        self.method
    }

    /// Number of passes in the plan
    pub fn len(&self) -> u32 {
        self.patterns.len() as u32
    }

    /// True for a zero-pass plan
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over the passes in order
    pub fn iter(&self) -> impl Iterator<Item = &PassPattern> {
        self.patterns.iter()
    }

    /// Pattern for a zero-based pass index
    pub fn pattern(&self, pass: usize) -> Option<PassPattern> {
        self.patterns.get(pass).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingRandom;

    impl RandomSource for CountingRandom {
        fn fill(&self, buf: &mut [u8]) -> Result<(), String> {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = i as u8;
            }
            Ok(())
        }
    }

    #[test]
    fn test_quick_is_single_zero_pass() {
        for passes in [0, 1, 7] {
            let plan = WipeMethod::Quick.plan(passes);
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.pattern(0), Some(PassPattern::Fill(0x00)));
        }
    }

    #[test]
    fn test_deep_alternates_random_and_ones() {
        let plan = WipeMethod::Deep.plan(4);
        let patterns: Vec<_> = plan.iter().copied().collect();
        assert_eq!(
            patterns,
            vec![
                PassPattern::Random,
                PassPattern::Fill(0xFF),
                PassPattern::Random,
                PassPattern::Fill(0xFF),
            ]
        );
    }

    #[test]
    fn test_deep_zero_passes_is_empty() {
        let plan = WipeMethod::Deep.plan(0);
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn test_secure_ignores_pass_count() {
        for passes in [0, 3, 100] {
            assert_eq!(WipeMethod::Secure.plan(passes).len(), SECURE_PASSES);
        }
    }

    #[test]
    fn test_secure_table_then_random() {
        let plan = WipeMethod::Secure.plan(1);
        assert_eq!(plan.pattern(0), Some(PassPattern::Fill(0x55)));
        assert_eq!(plan.pattern(1), Some(PassPattern::Fill(0xAA)));
        assert_eq!(
            plan.pattern(2),
            Some(PassPattern::Repeat([0x92, 0x49, 0x24]))
        );
        assert_eq!(plan.pattern(5), Some(PassPattern::Fill(0x00)));
        assert_eq!(plan.pattern(20), Some(PassPattern::Fill(0xFF)));
        assert_eq!(plan.pattern(22), Some(PassPattern::Fill(0xAA)));
        for pass in 23..35 {
            assert_eq!(plan.pattern(pass), Some(PassPattern::Random));
        }
        assert_eq!(plan.pattern(35), None);
    }

    #[test]
    fn test_multilayered_is_deep_then_secure() {
        let plan = WipeMethod::MultiLayered.plan(2);
        assert_eq!(plan.len(), 2 + SECURE_PASSES);
        assert_eq!(plan.pattern(0), Some(PassPattern::Random));
        assert_eq!(plan.pattern(1), Some(PassPattern::Fill(0xFF)));
        assert_eq!(plan.pattern(2), Some(PassPattern::Fill(0x55)));
    }

    #[test]
    fn test_repeat_stays_aligned_across_chunks() {
        let pattern = PassPattern::Repeat([1, 2, 3]);
        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        pattern.fill_chunk(&mut first, 0, &OsRandom).unwrap();
        pattern.fill_chunk(&mut second, 4, &OsRandom).unwrap();
        assert_eq!(first, [1, 2, 3, 1]);
        assert_eq!(second, [2, 3, 1, 2]);
    }

    #[test]
    fn test_random_uses_injected_source() {
        let mut buf = [0xEEu8; 8];
        PassPattern::Random
            .fill_chunk(&mut buf, 0, &CountingRandom)
            .unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_os_random_fills_buffer() {
        let mut buf = [0u8; CHUNK_SIZE];
        OsRandom.fill(&mut buf).unwrap();
        // 4096 zero bytes from a CSPRNG would be astronomically unlikely
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(WipeMethod::MultiLayered.to_string(), "multilayered");
        assert!(WipeMethod::Deep.uses_pass_count());
        assert!(!WipeMethod::Secure.uses_pass_count());
    }
}
