//! Trim operations and merging of trim history.
//!
//! Every trim the user issues is appended to the session history. The active
//! clip range is derived from that history by [`merge_trims`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CutlineError, Result};

/// A clip range in milliseconds, `start_ms <= end_ms`.
///
/// Decoding goes through [`Trim::new`], so a stored trim that breaks the
/// bounds is a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTrim")]
pub struct Trim {
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Deserialize)]
struct RawTrim {
    start_ms: i64,
    end_ms: i64,
}

impl TryFrom<RawTrim> for Trim {
    type Error = CutlineError;

    fn try_from(raw: RawTrim) -> Result<Self> {
        Self::new(raw.start_ms, raw.end_ms)
    }
}

impl Trim {
    /// Create a validated trim.
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self> {
        if start_ms < 0 || end_ms < 0 {
            return Err(CutlineError::InvalidParameter(format!(
                "Trim bounds must be non-negative, got {}..{}",
                start_ms, end_ms
            )));
        }
        if start_ms > end_ms {
            return Err(CutlineError::InvalidParameter(format!(
                "Trim start {} is after end {}",
                start_ms, end_ms
            )));
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Length of the range.
    #[inline]
    pub fn duration_ms(self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether the range fits inside a source of the given duration.
    #[inline]
    pub fn within(self, duration_ms: i64) -> bool {
        self.end_ms <= duration_ms
    }

    /// Start offset in seconds.
    pub fn start_seconds(self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    /// End offset in seconds.
    pub fn end_seconds(self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

impl fmt::Display for Trim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms..{}ms", self.start_ms, self.end_ms)
    }
}

impl std::str::FromStr for Trim {
    type Err = CutlineError;

    /// Parses `start:end` in milliseconds.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s.split_once(':').ok_or_else(|| {
            CutlineError::InvalidParameter(format!("Expected start:end, got '{}'", s))
        })?;
        let parse = |v: &str| {
            v.trim().parse::<i64>().map_err(|_| {
                CutlineError::InvalidParameter(format!("Invalid trim offset '{}'", v))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

/// Collapse a trim history into one effective range.
///
/// Each op after the first is applied as a delta against the op that preceded
/// it: `cur -= ops[i - 1] - ops[i]` on both bounds.
pub fn merge_trims(ops: &[Trim]) -> Option<Trim> {
    let (first, _) = ops.split_first()?;
    let mut current = *first;

    for pair in ops.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        current = Trim {
            start_ms: current.start_ms - (prev.start_ms - next.start_ms),
            end_ms: current.end_ms - (prev.end_ms - next.end_ms),
        };
    }

    Some(current)
}
