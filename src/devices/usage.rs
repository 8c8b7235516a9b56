//! Seeded random usage sessions, turned into command scripts.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::SimError;
use crate::sim::script::CommandScript;
use crate::sim::time::SimTime;
use crate::sim::transition::DeviceFamily;

/// How a family is typically used: the command sequence of one session.
///
/// A session starts and ends in the rest state, so sessions can be chained.
pub trait UsagePattern: DeviceFamily {
    const SESSION: &'static [Self::Kind];
}

/// Random session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageProfile {
    /// Number of sessions to generate.
    pub sessions: usize,
    /// Minimum gap between two consecutive commands (seconds).
    pub min_gap_secs: u64,
    /// Maximum gap between two consecutive commands (seconds).
    pub max_gap_secs: u64,
}

impl UsageProfile {
    /// # Errors
    ///
    /// Returns `SimError::Configuration` if the gap range is empty or zero.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.min_gap_secs == 0 {
            return Err(SimError::Configuration(
                "usage min_gap_secs must be > 0".to_string(),
            ));
        }
        if self.max_gap_secs < self.min_gap_secs {
            return Err(SimError::Configuration(format!(
                "usage max_gap_secs ({}) is below min_gap_secs ({})",
                self.max_gap_secs, self.min_gap_secs
            )));
        }
        Ok(())
    }
}

/// Samples up to `profile.sessions` complete sessions between `start` and
/// `end` for family `F`.
///
/// Each command follows the previous one after a random gap drawn uniformly
/// from `[min_gap_secs, max_gap_secs]`. A session that would not finish by
/// `end` is dropped entirely, so the script always leaves the device in its
/// rest state.
///
/// # Errors
///
/// Returns `SimError::Configuration` for an invalid profile.
pub fn generate_sessions<F: UsagePattern>(
    profile: &UsageProfile,
    start: SimTime,
    end: SimTime,
    seed: u64,
) -> Result<CommandScript<F::Kind>, SimError> {
    profile.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut script = CommandScript::new();
    let mut cursor = start;

    'sessions: for _ in 0..profile.sessions {
        let mut planned = Vec::with_capacity(F::SESSION.len());
        let mut t = cursor;
        for kind in F::SESSION {
            let gap = rng.random_range(profile.min_gap_secs..=profile.max_gap_secs);
            t = t + Duration::from_secs(gap);
            if t > end {
                break 'sessions;
            }
            planned.push((t, *kind));
        }
        for (at, kind) in planned {
            script.push(at, kind);
        }
        cursor = t;
    }

    Ok(script)
}
