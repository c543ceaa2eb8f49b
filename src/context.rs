//! Execution-context keys identifying where a lane's values are scheduled.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key for the device/stream-equivalent domain a value lives in.
///
/// Contexts are resolved by construction; two contexts compare equal exactly
/// when they carry the same ordinal. The graph uses them only as cache keys
/// and for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionContext(u32);

impl ExecutionContext {
    /// Builds the context for the given scheduling domain ordinal.
    pub fn new(ordinal: u32) -> Self {
        ExecutionContext(ordinal)
    }

    /// Returns the scheduling domain ordinal.
    pub fn ordinal(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane:{}", self.0)
    }
}
